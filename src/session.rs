//! The async interaction session: one task that owns the controller.
//!
//! ## Why one task?
//!
//! The controller state has exactly one owner, the session task. Handles
//! send commands over an `mpsc` channel; the task applies them, and also
//! drives every timer-like thing in a single `tokio::select!` loop:
//!
//! ```text
//!            ┌──────────── commands (SessionHandle) ───────────┐
//!            ▼                                                  │
//!   ┌──────────────────┐  tick (200 ms)   ┌─────────────┐       │
//!   │  select! loop    │◀──────────────── │  ticker     │       │
//!   │  owns Controller │◀──── outcome ─── │  request    │       │
//!   │                  │◀──── elapsed ─── │  settle     │       │
//!   │                  │◀──── elapsed ─── │  copied ack │       │
//!   └────────┬─────────┘                  └─────────────┘       │
//!            └──── Snapshot (watch) ──▶ observers ──────────────┘
//! ```
//!
//! The ticker and the request are independent branches of the same loop.
//! The branch that handles the request outcome drops the ticker in the same
//! step, so a tick can never be applied after a terminal state. No locks are
//! needed because nothing else touches the controller.

use crate::clipboard::ClipboardSink;
use crate::config::SessionConfig;
use crate::controller::{Controller, ConversionTicket, Snapshot};
use crate::download::DownloadArtifact;
use crate::error::{ConvertError, RequestError};
use crate::file::SelectedFile;
use crate::format::OutputFormat;
use crate::requester::ConversionRequester;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

type Reply<T> = oneshot::Sender<Result<T, ConvertError>>;

enum Command {
    SelectFile(SelectedFile, oneshot::Sender<bool>),
    RejectFile(String, Reply<()>),
    SelectFormat(OutputFormat, oneshot::Sender<bool>),
    StartConversion(Reply<u64>),
    CopyResult(Reply<()>),
    Download(Reply<DownloadArtifact>),
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
}

/// A running session: its handle plus the task that owns the controller.
pub struct Session {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

impl Session {
    /// Spawn a session on the current tokio runtime.
    pub fn spawn(
        config: SessionConfig,
        requester: Arc<dyn ConversionRequester>,
        clipboard: Box<dyn ClipboardSink>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let controller = Controller::new(config);
        let (snap_tx, snap_rx) = watch::channel(controller.snapshot());

        let event_loop = EventLoop {
            controller,
            requester,
            clipboard,
            snapshots: snap_tx,
            ticker: None,
            request: None,
            settle: None,
            copied: None,
        };
        let task = tokio::spawn(event_loop.run(rx));
        info!("Conversion session started");

        Self {
            handle: SessionHandle {
                commands: tx,
                snapshots: snap_rx,
            },
            task,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Drop this session's handle and wait for the task to finish.
    ///
    /// The task ends once every other handle is dropped too; an in-flight
    /// request is abandoned at that point.
    pub async fn shutdown(self) {
        drop(self.handle);
        if let Err(e) = self.task.await {
            tracing::warn!("Session task ended abnormally: {}", e);
        }
    }
}

impl SessionHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified whenever the state changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// The state changes as a `Stream`, starting with the current snapshot.
    pub fn updates(&self) -> WatchStream<Snapshot> {
        WatchStream::new(self.snapshots.clone())
    }

    /// Select a file. `Ok(false)` means ignored because a conversion is running.
    pub async fn select_file(&self, file: SelectedFile) -> Result<bool, ConvertError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SelectFile(file, tx)).await?;
        rx.await.map_err(|_| ConvertError::SessionClosed)
    }

    /// Report a selection refused at the input boundary (not a PDF).
    pub async fn reject_file(&self, name: impl Into<String>) -> Result<(), ConvertError> {
        let name = name.into();
        self.request(|reply| Command::RejectFile(name, reply)).await
    }

    /// Change the output format. `false` means ignored while loading.
    pub async fn select_format(&self, format: OutputFormat) -> Result<bool, ConvertError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SelectFormat(format, tx)).await?;
        rx.await.map_err(|_| ConvertError::SessionClosed)
    }

    /// Start a conversion; returns the attempt number once `Loading` is entered.
    ///
    /// Does not wait for the result: observe snapshots or call
    /// [`SessionHandle::wait_until_ready`].
    pub async fn start_conversion(&self) -> Result<u64, ConvertError> {
        self.request(Command::StartConversion).await
    }

    /// Copy the current result to the session's clipboard.
    pub async fn copy_result(&self) -> Result<(), ConvertError> {
        self.request(Command::CopyResult).await
    }

    /// Build the download artifact for the current result.
    pub async fn download_artifact(&self) -> Result<DownloadArtifact, ConvertError> {
        self.request(Command::Download).await
    }

    /// Build the download artifact and save it into `dir`.
    pub async fn download(&self, dir: impl Into<PathBuf>) -> Result<PathBuf, ConvertError> {
        let artifact = self.download_artifact().await?;
        artifact.save_in(dir.into()).await
    }

    /// Wait until the loading flag is clear (after the settle delay).
    pub async fn wait_until_ready(&self) -> Result<Snapshot, ConvertError> {
        let mut rx = self.snapshots.clone();
        let snap = rx
            .wait_for(|s| !s.loading)
            .await
            .map_err(|_| ConvertError::SessionClosed)?;
        Ok(snap.clone())
    }

    /// Start a conversion and wait until it has settled.
    ///
    /// Resolves with the result text, or with the surfaced error as
    /// [`ConvertError::RequestFailed`].
    pub async fn convert(&self) -> Result<String, ConvertError> {
        self.start_conversion().await?;
        let snap = self.wait_until_ready().await?;
        match (snap.result, snap.error) {
            (Some(result), _) => Ok(result),
            (None, Some(message)) => Err(ConvertError::RequestFailed { message }),
            (None, None) => Err(ConvertError::Internal(
                "conversion settled without an outcome".into(),
            )),
        }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, ConvertError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| ConvertError::SessionClosed)?
    }

    async fn send(&self, cmd: Command) -> Result<(), ConvertError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| ConvertError::SessionClosed)
    }
}

// ── Event loop ───────────────────────────────────────────────────────────

struct InFlight {
    attempt: u64,
    future: BoxFuture<'static, Result<String, RequestError>>,
}

struct EventLoop {
    controller: Controller,
    requester: Arc<dyn ConversionRequester>,
    clipboard: Box<dyn ClipboardSink>,
    snapshots: watch::Sender<Snapshot>,
    ticker: Option<Interval>,
    request: Option<InFlight>,
    settle: Option<(u64, Pin<Box<Sleep>>)>,
    copied: Option<(u64, Pin<Box<Sleep>>)>,
}

impl EventLoop {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = next_tick(&mut self.ticker) => {
                    self.controller.tick();
                }
                (attempt, outcome) = in_flight(&mut self.request) => {
                    self.request = None;
                    self.ticker = None;
                    if self.controller.resolve(attempt, outcome) {
                        let delay = self.controller.config().settle_delay;
                        self.settle = Some((attempt, Box::pin(sleep(delay))));
                    }
                }
                attempt = elapsed(&mut self.settle) => {
                    self.settle = None;
                    self.controller.settle(attempt);
                }
                generation = elapsed(&mut self.copied) => {
                    self.copied = None;
                    self.controller.expire_copied(generation);
                }
            }
            self.publish();
        }
        debug!("Conversion session stopped");
    }

    /// Apply one command. The new state is published *before* the reply is
    /// sent, so a caller that reads snapshots after awaiting the reply never
    /// sees the state from before its own command.
    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::SelectFile(file, reply) => {
                let applied = self.controller.select_file(file);
                self.publish();
                let _ = reply.send(applied);
            }
            Command::RejectFile(name, reply) => {
                let err = self.controller.reject_file(&name);
                self.publish();
                let _ = reply.send(Err(err));
            }
            Command::SelectFormat(format, reply) => {
                let applied = self.controller.select_format(format);
                self.publish();
                let _ = reply.send(applied);
            }
            Command::StartConversion(reply) => {
                let outcome = self.controller.begin_conversion().map(|ticket| self.launch(ticket));
                self.publish();
                let _ = reply.send(outcome);
            }
            Command::CopyResult(reply) => {
                let outcome = self
                    .controller
                    .copy_result(self.clipboard.as_mut())
                    .map(|generation| {
                        let window = self.controller.config().copied_ack;
                        self.copied = Some((generation, Box::pin(sleep(window))));
                    });
                self.publish();
                let _ = reply.send(outcome);
            }
            Command::Download(reply) => {
                let _ = reply.send(self.controller.download_artifact());
            }
        }
    }

    /// Start the request and the progress ticker for a new attempt.
    fn launch(&mut self, ticket: ConversionTicket) -> u64 {
        let requester = Arc::clone(&self.requester);
        let attempt = ticket.attempt;
        debug!("Dispatching attempt #{} to {}", attempt, requester.name());
        self.request = Some(InFlight {
            attempt,
            future: Box::pin(async move { requester.convert(ticket.format, &ticket.file).await }),
        });

        let period = self.controller.config().tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        self.settle = None;
        self.copied = None;
        attempt
    }

    fn publish(&self) {
        let snapshot = self.controller.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

// Each helper stays pending forever when its slot is empty, so the matching
// `select!` branch simply never fires.

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn in_flight(request: &mut Option<InFlight>) -> (u64, Result<String, RequestError>) {
    match request {
        Some(r) => {
            let outcome = (&mut r.future).await;
            (r.attempt, outcome)
        }
        None => std::future::pending().await,
    }
}

async fn elapsed(slot: &mut Option<(u64, Pin<Box<Sleep>>)>) -> u64 {
    match slot {
        Some((id, timer)) => {
            timer.as_mut().await;
            *id
        }
        None => std::future::pending().await,
    }
}
