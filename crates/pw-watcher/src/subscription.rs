//! Filesystem notification subscription.
//!
//! This module bridges the synchronous `notify` watcher to the async run
//! loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Blocking Thread (spawn_blocking)             │
//! │  ┌───────────────────┐    ┌────────────────────────────────┐    │
//! │  │ RecommendedWatcher│ -> │ Callback (ChangeEvent per path)│    │
//! │  │ (notify)          │    └──────────────┬─────────────────┘    │
//! │  └───────────────────┘                   │                      │
//! └──────────────────────────────────────────┼──────────────────────┘
//!                                            │ blocking_send
//!                                            ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ Subscription     │    │ mpsc::Receiver │ -> Watcher run loop │
//! │  │ (shutdown ctrl)  │    │ (events)       │                     │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The channel is bounded: while a render is running, undelivered events
//! queue up and eventually block the notify callback.

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecursiveMode, Watcher as _};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::WatchError;
use crate::events::ChangeEvent;

/// An active notification subscription rooted at one directory.
///
/// Events are forwarded unfiltered to the channel given to
/// [`Subscription::spawn`]. Call [`Subscription::shutdown`] to unsubscribe
/// and wait for the notify watcher to be released; dropping the value only
/// signals the shutdown.
pub struct Subscription {
    /// Shutdown signal sender. `None` once shutdown has been initiated.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking task owning the notify watcher.
    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    /// The canonical path being watched.
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Subscribes to changes under `path`, sending them to `event_tx`.
    ///
    /// Returns once the notify watcher is registered, so a failure to watch
    /// is reported here rather than at shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist, and
    /// [`WatchError::Notify`] if the watcher fails to initialize.
    pub async fn spawn(
        path: &Utf8Path,
        recursive: bool,
        event_tx: mpsc::Sender<ChangeEvent>,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }

        let watch_path = path.canonicalize_utf8()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task_path = watch_path.clone();
        let task_handle = tokio::task::spawn_blocking(move || {
            run_subscription(&task_path, recursive, event_tx, shutdown_rx, ready_tx)
        });

        let mut subscription = Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            watch_path,
        };

        match ready_rx.await {
            Ok(Ok(())) => Ok(subscription),
            Ok(Err(e)) => {
                // The task already returned; collect it.
                let _ = subscription.join().await;
                Err(e)
            }
            Err(_) => subscription.join().await.and(Err(WatchError::ChannelClosed)),
        }
    }

    /// Returns the canonical path being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` if the notify watcher is still registered.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Unsubscribes and waits for the notify watcher to be released.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher task panicked or failed.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the task has already exited
            let _ = tx.send(());
        }
        self.join().await
    }

    async fn join(&mut self) -> Result<(), WatchError> {
        self.shutdown_tx = None;
        match self.task_handle.take() {
            Some(handle) => handle.await.map_err(|_| WatchError::ChannelClosed)?,
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Owns the notify watcher for the lifetime of the subscription.
///
/// Runs on the blocking pool; returns after the shutdown signal once the
/// watcher has been unregistered and dropped.
fn run_subscription(
    path: &Utf8Path,
    recursive: bool,
    event_tx: mpsc::Sender<ChangeEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    ready_tx: oneshot::Sender<Result<(), WatchError>>,
) -> Result<(), WatchError> {
    let mut watcher = match notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        forward_event(res, &event_tx);
    }) {
        Ok(watcher) => watcher,
        Err(e) => {
            let _ = ready_tx.send(Err(e.into()));
            return Ok(());
        }
    };

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };

    if let Err(e) = watcher.watch(path.as_std_path(), mode) {
        let _ = ready_tx.send(Err(e.into()));
        return Ok(());
    }

    tracing::info!(path = %path, recursive, "Subscribed to file notifications");
    let _ = ready_tx.send(Ok(()));

    // Block until shutdown is requested or the handle is dropped.
    let _ = shutdown_rx.blocking_recv();

    if let Err(error) = watcher.unwatch(path.as_std_path()) {
        tracing::debug!(%error, "Failed to unwatch path during shutdown");
    }
    drop(watcher);

    tracing::info!(path = %path, "Unsubscribed from file notifications");
    Ok(())
}

fn forward_event(res: notify::Result<notify::Event>, tx: &mpsc::Sender<ChangeEvent>) {
    let event = match res {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(%error, "Notification error");
            return;
        }
    };

    for change in ChangeEvent::from_notify(event) {
        let change = match change {
            Ok(change) => change,
            Err(error) if error.is_fatal() => {
                tracing::warn!(%error, "Dropping notification");
                break;
            }
            Err(error) => {
                tracing::warn!(%error, "Skipping notification");
                continue;
            }
        };

        tracing::trace!(path = %change.path, kind = ?change.kind, "Notification");
        if tx.blocking_send(change).is_err() {
            tracing::debug!("Event channel closed, dropping notification");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_temp_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, path)
    }

    #[tokio::test]
    async fn test_subscription_path_not_found() {
        let (tx, _rx) = mpsc::channel(8);
        let missing = Utf8Path::new("/nonexistent/path/for/tests");
        let result = Subscription::spawn(missing, true, tx).await;
        assert!(matches!(result, Err(WatchError::PathNotFound(_))));
    }

    #[tokio::test]
    async fn test_subscription_starts_and_shuts_down() {
        let (_dir, path) = create_temp_dir();
        let (tx, _rx) = mpsc::channel(8);

        let subscription = Subscription::spawn(&path, true, tx)
            .await
            .expect("Failed to subscribe");
        assert!(subscription.is_running());
        assert!(!subscription.watch_path().as_str().is_empty());

        subscription.shutdown().await.expect("Shutdown failed");
    }

    #[tokio::test]
    async fn test_subscription_forwards_events() {
        let (dir, path) = create_temp_dir();
        let (tx, mut rx) = mpsc::channel(64);

        let subscription = Subscription::spawn(&path, true, tx)
            .await
            .expect("Failed to subscribe");

        fs::write(dir.path().join("diagram.pu"), "@startuml\n@enduml\n")
            .expect("Failed to write file");

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        subscription.shutdown().await.expect("Shutdown failed");

        // Timing-dependent on some CI filesystems; only check what arrived.
        if let Ok(Some(event)) = event {
            assert!(event.path.as_str().ends_with("diagram.pu"));
        }
    }

    #[test]
    fn test_forward_event_skips_errors() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_event(Err(notify::Error::generic("boom")), &tx);
        assert!(rx.try_recv().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_forward_event_skips_non_utf8_paths_only() {
        use notify::EventKind;
        use notify::event::ModifyKind;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        use std::path::PathBuf;

        let (tx, mut rx) = mpsc::channel(8);
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from(OsStr::from_bytes(b"/work/\xff.pu")))
            .add_path(PathBuf::from("/work/diagram.pu"));
        forward_event(Ok(event), &tx);

        let forwarded = rx.try_recv().expect("valid path should be forwarded");
        assert_eq!(forwarded.path, "/work/diagram.pu");
        assert!(rx.try_recv().is_err());
    }
}
