//! The watch session state machine.
//!
//! ```text
//! Idle ──start()──► Running ──cancel / stream end──► Stopping ──► Stopped
//! ```
//!
//! While `Running`, each notification is handled to completion (filter,
//! build the command, run the renderer, report) before the next one is
//! received. Cancellation is observed between events, so a render already in
//! flight always finishes. `Stopped` is terminal.

use std::fmt;
use std::io;
use std::sync::Arc;

use pw_core::EffectiveConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::command::{self, RenderInvocation};
use crate::error::{RenderError, WatchError};
use crate::events::ChangeEvent;
use crate::filter::SourceFilter;
use crate::report::{LineReporter, RenderResult, Reporter};
use crate::runner::{self, ProcessRunner, RenderRunner};
use crate::subscription::Subscription;

/// Capacity of the notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Lifecycle state of a [`Watcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatcherState {
    /// Constructed, not yet subscribed.
    Idle,
    /// Subscribed and handling notifications.
    Running,
    /// Tearing down the subscription.
    Stopping,
    /// Finished. Terminal.
    Stopped,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        })
    }
}

/// Watches a directory and re-renders modified sources.
///
/// A `Watcher` is bound to one [`EffectiveConfig`] and runs exactly one
/// watch session; it cannot be restarted once stopped.
///
/// # Examples
///
/// ```no_run
/// use pw_core::{ConfigLayer, ConfigResolver};
/// use pw_watcher::Watcher;
/// use tokio_util::sync::CancellationToken;
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConfigResolver::discover(Utf8Path::new("."))
///     .resolve(&ConfigLayer::default())?;
///
/// let mut watcher = Watcher::new(config);
/// watcher.start().await?;
///
/// let cancel = CancellationToken::new();
/// watcher.run(cancel).await?;
/// # Ok(())
/// # }
/// ```
pub struct Watcher {
    config: Arc<EffectiveConfig>,
    filter: SourceFilter,
    runner: Arc<dyn RenderRunner>,
    reporter: Box<dyn Reporter>,
    state: WatcherState,

    /// Notification stream; present only while `Running`.
    events: Option<mpsc::Receiver<ChangeEvent>>,

    /// The notify subscription feeding `events`.
    subscription: Option<Subscription>,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("watch_dir", &self.config.watch_dir)
            .field("extension", &self.config.extension)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates an idle watcher that launches the renderer as a child process
    /// and reports to stdout.
    #[must_use]
    pub fn new(config: EffectiveConfig) -> Self {
        let filter = SourceFilter::from_config(&config);
        Self {
            config: Arc::new(config),
            filter,
            runner: Arc::new(ProcessRunner),
            reporter: Box::new(LineReporter::stdout()),
            state: WatcherState::Idle,
            events: None,
            subscription: None,
        }
    }

    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: impl RenderRunner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    /// Replaces the reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> WatcherState {
        self.state
    }

    /// Subscribes to notifications under the watch directory.
    ///
    /// Transitions `Idle → Running`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidState`] unless the watcher is idle, and
    /// any subscription failure from [`Subscription::spawn`].
    pub async fn start(&mut self) -> Result<(), WatchError> {
        self.require_state("start", WatcherState::Idle)?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let subscription =
            Subscription::spawn(&self.config.watch_dir, self.config.recursive, event_tx).await?;

        self.log_session();
        self.enter_running(event_rx, Some(subscription));
        Ok(())
    }

    /// Handles notifications until `cancel` fires or the stream ends, then
    /// stops the watcher.
    ///
    /// Render failures are reported and never end the loop.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidState`] unless the watcher is running,
    /// and any error from tearing down the subscription.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), WatchError> {
        self.require_state("run", WatcherState::Running)?;
        let Some(mut events) = self.events.take() else {
            return Err(WatchError::ChannelClosed);
        };

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Cancellation requested");
                    break;
                }
                event = events.recv() => event,
            };

            let Some(event) = event else {
                warn!("Notification stream ended");
                break;
            };

            self.handle_event(event).await;
        }

        // Closing the receiver unblocks a notify callback waiting on a full
        // channel before the subscription is torn down.
        drop(events);
        self.stop().await
    }

    /// Stops the watcher, releasing the subscription.
    ///
    /// Transitions to `Stopped` from any state. Stopping a stopped watcher
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription task failed.
    pub async fn stop(&mut self) -> Result<(), WatchError> {
        if self.state == WatcherState::Stopped {
            return Ok(());
        }

        self.state = WatcherState::Stopping;
        self.events = None;
        let result = match self.subscription.take() {
            Some(subscription) => subscription.shutdown().await,
            None => Ok(()),
        };
        self.state = WatcherState::Stopped;

        info!(path = %self.config.watch_dir, "Watcher stopped");
        result
    }

    /// Filters one notification and, if accepted, renders it.
    ///
    /// Returns `None` for rejected notifications.
    async fn handle_event(&mut self, event: ChangeEvent) -> Option<RenderResult> {
        if !self.filter.accepts(&event) {
            trace!(path = %event.path, kind = ?event.kind, "Ignored notification");
            return None;
        }

        let invocation = RenderInvocation::build(&self.config, &event.path);
        let output_file =
            command::output_path(&event.path, &self.config.extension, self.config.format);

        self.reporter.processing(&invocation.source_file);
        let status = self.execute(invocation).await;

        let result = RenderResult {
            source_file: event.path,
            output_file,
            status,
        };
        if result.is_success() {
            debug!(output = %result.output_file, "Render finished");
        } else if let Err(error) = &result.status {
            debug!(path = %result.source_file, %error, "Render failed");
        }
        self.reporter.finished(&result);
        Some(result)
    }

    /// Runs the renderer on the blocking pool and waits for it to exit.
    async fn execute(&self, invocation: RenderInvocation) -> Result<(), RenderError> {
        debug!(command = %invocation, "Running renderer");

        let process = Arc::clone(&self.runner);
        match tokio::task::spawn_blocking(move || process.run(&invocation)).await {
            Ok(outcome) => runner::classify(outcome),
            Err(join_error) => Err(RenderError::Launch(io::Error::other(join_error))),
        }
    }

    fn enter_running(
        &mut self,
        events: mpsc::Receiver<ChangeEvent>,
        subscription: Option<Subscription>,
    ) {
        self.events = Some(events);
        self.subscription = subscription;
        self.state = WatcherState::Running;
    }

    fn require_state(
        &self,
        operation: &'static str,
        expected: WatcherState,
    ) -> Result<(), WatchError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WatchError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn log_session(&self) {
        info!(
            path = %self.config.watch_dir,
            extension = %self.filter.extension(),
            output = %self.config.output_dir,
            format = %self.config.format,
            "Watching for source modifications"
        );
        if self.config.verbose {
            info!(
                renderer = %self.config.renderer,
                interpreter = %self.config.interpreter,
                "Using renderer"
            );
        }
    }
}
