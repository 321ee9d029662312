//! Auto-update: polls the blacklist file's mtime on an interval and
//! hot-swaps a fresh parse into a shared `ArcSwap` when it changes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use tokio::time::interval;
use tracing::{error, info};

use crate::blacklist::{file_mtime, Blacklist};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns a background task that re-parses `path` and publishes the result
/// into `shared` whenever the file's mtime advances. The task runs until
/// the returned handle is aborted or dropped along with its runtime.
pub fn spawn_auto_update(
    path: PathBuf,
    shared: Arc<ArcSwap<Blacklist>>,
) -> tokio::task::JoinHandle<()> {
    spawn_auto_update_with_interval(path, shared, DEFAULT_POLL_INTERVAL)
}

pub fn spawn_auto_update_with_interval(
    path: PathBuf,
    shared: Arc<ArcSwap<Blacklist>>,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_seen: Option<SystemTime> = file_mtime(&path);
        let mut ticker = interval(poll_interval);

        loop {
            ticker.tick().await;

            let Some(mtime) = file_mtime(&path) else {
                continue;
            };
            if Some(mtime) == last_seen {
                continue;
            }

            match Blacklist::load_file(&path) {
                Ok(fresh) => {
                    let entries = fresh.len();
                    shared.store(Arc::new(fresh));
                    last_seen = Some(mtime);
                    info!(path = %path.display(), entries, "reloaded blacklist");
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to reload blacklist, keeping previous version");
                    last_seen = Some(mtime);
                }
            }
        }
    })
}
