//! Watch mode — change coalescing, schema polling, redeploy loop.
//!
//! Changes flow through a capacity-1 latest-wins signal built on
//! `tokio::sync::watch`: any burst of notifications collapses to at most
//! one pending wakeup. Notifications that arrive while a deploy is in
//! flight are dropped at the producer side, not queued; the watcher keeps
//! its last-seen fingerprint unchanged for dropped notifications, so the
//! next poll after the in-flight attempt completes re-detects the latest
//! on-disk state. Changes coalesce, none are permanently lost.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use morph_core::schema_digest;

use crate::error::DeployResult;
use crate::orchestrator::{DeployOptions, Orchestrator};
use crate::schema::load_schema;
use crate::session::DeployGuard;

/// Create a linked notifier/listener pair sharing the single-flight guard.
pub fn change_channel(guard: DeployGuard) -> (ChangeNotifier, ChangeListener) {
    let (tx, rx) = watch::channel(0u64);
    (ChangeNotifier { guard, tx }, ChangeListener { rx })
}

/// Producer side of the change signal.
pub struct ChangeNotifier {
    guard: DeployGuard,
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    /// Publish a change. Returns false when the notification was dropped
    /// because a deploy is in flight.
    pub fn notify(&self) -> bool {
        if self.guard.is_deploying() {
            debug!("deploy in flight, dropping change notification");
            return false;
        }
        self.tx.send_modify(|n| *n += 1);
        true
    }
}

/// Consumer side of the change signal.
pub struct ChangeListener {
    rx: watch::Receiver<u64>,
}

impl ChangeListener {
    /// Wait for the next coalesced change. Returns false once every
    /// notifier is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Polls the schema sources and notifies on content changes.
pub struct SchemaWatcher {
    path: PathBuf,
    interval: Duration,
}

impl SchemaWatcher {
    pub fn new(path: PathBuf, interval: Duration) -> Self {
        Self { path, interval }
    }

    /// Spawn the polling task. Returns a shutdown handle and the task
    /// handle; dropping the shutdown sender also stops the task.
    pub fn spawn(self, notifier: ChangeNotifier) -> (watch::Sender<bool>, JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        // Baseline before the task starts so changes racing the spawn are
        // still detected.
        let mut last = fingerprint(&self.path).ok();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(self.interval) => {
                        match fingerprint(&self.path) {
                            Ok(digest) => {
                                if last.as_deref() != Some(&digest) {
                                    debug!(digest = %&digest[..12], "schema change detected");
                                    // Keep the old fingerprint when the
                                    // notification is dropped so the next
                                    // poll re-detects the change.
                                    if notifier.notify() {
                                        last = Some(digest);
                                    }
                                }
                            }
                            Err(e) => warn!(error = %e, "schema scan failed"),
                        }
                    }
                }
            }
        });
        (shutdown_tx, handle)
    }
}

fn fingerprint(path: &Path) -> DeployResult<String> {
    Ok(schema_digest(&load_schema(path)?))
}

/// Redeploy once per coalesced change until every notifier is gone.
///
/// Errors during a re-deploy are logged and the loop continues; they never
/// terminate the watch subscription.
pub async fn run_watch_loop<F>(
    mut orchestrator: Orchestrator,
    opts: DeployOptions,
    mut listener: ChangeListener,
    load_schema_text: F,
) -> DeployResult<()>
where
    F: Fn() -> DeployResult<String>,
{
    while listener.changed().await {
        let guard = orchestrator.session().guard().clone();
        if !guard.try_acquire() {
            continue;
        }

        orchestrator.session_mut().reset_output();
        info!("schema changed, redeploying");
        let result = match load_schema_text() {
            Ok(schema) => orchestrator.deploy_once(&opts, &schema).await,
            Err(e) => Err(e),
        };
        guard.release();

        match result {
            Ok(outcome) => debug!(?outcome, "redeploy finished"),
            Err(e) => warn!(error = %e, "watch-mode deploy failed, still watching"),
        }
    }
    Ok(())
}
