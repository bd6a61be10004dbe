//! Size LRU - walkthrough driver
//!
//! Replays a small workload against the cache and logs its state after each
//! phase: a few inserts, an idle period long enough for entries to go stale,
//! then a burst of small inserts that pushes the cache past its hard limit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use size_lru::{CacheConfig, Cleanable, LruCache};

/// Payload standing in for an externally owned resource.
#[derive(Debug)]
struct Element {
    id: u32,
    name: Mutex<String>,
    size: AtomicU64,
}

impl Element {
    fn new(id: u32, name: &str, size: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: Mutex::new(name.to_string()),
            size: AtomicU64::new(size),
        })
    }

    fn size(&self) -> u64 {
        self.size.load(Ordering::SeqCst)
    }
}

impl Cleanable for Element {
    fn cleanup(&self) {
        self.size.store(0, Ordering::SeqCst);
        self.name.lock().push_str(" cleaned");
    }
}

struct Walkthrough {
    cache: LruCache<u32, Element>,
    elements: Vec<Arc<Element>>,
    next_id: u32,
}

impl Walkthrough {
    fn insert(&mut self, name: &str, size: u64) -> Arc<Element> {
        self.next_id += 1;
        let element = Element::new(self.next_id, name, size);
        info!("{}({}) with size {}", name, element.id, size);
        self.cache.update(element.id, &element, element.size());
        self.elements.push(element.clone());
        element
    }

    fn dump_cache(&self) -> anyhow::Result<()> {
        info!("Cache state:");
        for row in self.cache.dump() {
            info!("  {}", row);
        }
        let stats = self.cache.stats();
        info!("Stats: {}", serde_json::to_string(&stats)?);
        info!("Hit rate: {:.2}", stats.hit_rate());
        Ok(())
    }
}

fn print_elements(elements: &[Arc<Element>]) {
    info!("Printing elements:");
    for element in elements {
        info!("  {} (size {})", element.name.lock(), element.size());
    }
}

/// Main entry point for the walkthrough.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (starting its sweeper when an interval is set)
/// 4. Run the workload, dumping the cache between phases
/// 5. Shut the sweeper down and print the final element states
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "size_lru=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    let cache: LruCache<u32, Element> = LruCache::new(config)?;
    info!(
        "Cache created with soft max size: {}, hard max size: {}, time threshold: {}s, and cleaning interval: {}ms",
        cache.soft_limit(),
        cache.hard_limit(),
        cache.time_threshold().as_secs(),
        cache.cleaning_interval().as_millis()
    );

    let mut run = Walkthrough {
        cache,
        elements: Vec::new(),
        next_id: 0,
    };
    run.dump_cache()?;

    run.insert("First element", 20);
    let second = run.insert("Second element", 20);
    run.insert("Third element", 25);

    run.dump_cache()?;
    print_elements(&run.elements);

    let idle = run.cache.time_threshold() + Duration::from_secs(1);
    info!("Sleeping for {} seconds", idle.as_secs());
    tokio::time::sleep(idle).await;

    run.dump_cache()?;
    print_elements(&run.elements);

    run.insert("Fourth element", 10);
    run.cache.update(second.id, &second, second.size());
    run.insert("Fifth element", 10);

    for name in ["Sixth element", "Seventh element", "Eighth element"] {
        tokio::time::sleep(Duration::from_secs(1)).await;
        run.insert(name, 10);
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    run.insert("Ninth element", 10);
    run.insert("Tenth element", 10);
    run.insert("Eleventh element", 10);

    run.cache.get(&second.id);
    run.cache.get(&0);
    run.dump_cache()?;

    info!("Sleeping for 1 second");
    tokio::time::sleep(Duration::from_secs(1)).await;

    run.dump_cache()?;

    let Walkthrough { cache, elements, .. } = run;
    cache.shutdown().await?;
    info!("Cache shut down");

    print_elements(&elements);

    Ok(())
}
