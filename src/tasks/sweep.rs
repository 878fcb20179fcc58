//! Periodic Sweep Task
//!
//! Background task that removes expired entries from a dictionary on a
//! fixed interval, independent of access.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ExpiringDict;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task holds only a weak reference to the dictionary and exits once the
/// last strong reference is dropped. Each sweep takes the dictionary's lock
/// for the duration of one pass; the lock is never held across an await.
///
/// # Arguments
/// * `cache` - Shared dictionary to sweep
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can also be used to abort it.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(ExpiringDict::new(1000, Duration::from_secs(300))?);
/// let sweep_handle = spawn_sweep_task(&cache, Duration::from_secs(1));
/// // Later:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<K, V>(cache: &Arc<ExpiringDict<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let cache = Arc::downgrade(cache);

    tokio::spawn(async move {
        info!(?interval, "Starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = match cache.upgrade() {
                Some(cache) => cache.sweep_expired(),
                None => {
                    debug!("Dictionary dropped, stopping expiry sweep task");
                    break;
                }
            };

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
