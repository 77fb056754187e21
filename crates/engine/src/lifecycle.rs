use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use common::EngineState;

use crate::cycle::{CycleWorker, MonitorDeps};
use crate::settings::MonitorSettings;

enum EngineCommand {
    Start { ack: oneshot::Sender<bool> },
    Stop { ack: oneshot::Sender<bool> },
}

/// Cloneable handle passed to other crates (Telegram, the binary).
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state: Arc<RwLock<EngineState>>,
}

impl EngineHandle {
    /// Launch the cycle worker. Returns false if it was already running.
    pub async fn start(&self) -> bool {
        let (ack, rx) = oneshot::channel();
        if self.command_tx.send(EngineCommand::Start { ack }).await.is_err() {
            warn!("Engine is gone, start ignored");
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Stop the cycle worker and wait until it has exited. Returns false if
    /// it was not running.
    pub async fn stop(&self) -> bool {
        let (ack, rx) = oneshot::channel();
        if self.command_tx.send(EngineCommand::Stop { ack }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }
}

/// Owns the monitoring lifecycle: at most one cycle worker at a time.
pub struct Engine {
    deps: MonitorDeps,
    settings: MonitorSettings,
    state: Arc<RwLock<EngineState>>,
    command_rx: mpsc::Receiver<EngineCommand>,
    worker: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Engine {
    pub fn new(deps: MonitorDeps, settings: MonitorSettings) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let state = Arc::new(RwLock::new(EngineState::Stopped));

        let handle = EngineHandle {
            command_tx,
            state: state.clone(),
        };

        let engine = Engine {
            deps,
            settings,
            state,
            command_rx,
            worker: None,
        };

        (engine, handle)
    }

    /// Process start/stop commands until every handle is dropped.
    /// Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("Engine initialized in Stopped state. Waiting for Start command.");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(EngineCommand::Start { ack }) => {
                        let started = self.start_worker().await;
                        let _ = ack.send(started);
                    }
                    Some(EngineCommand::Stop { ack }) => {
                        let stopped = self.stop_worker().await;
                        let _ = ack.send(stopped);
                    }
                    None => break,
                },
                exit = worker_exit(&mut self.worker) => self.on_worker_exit(exit).await,
            }
        }

        warn!("Engine command channel closed, shutting down");
        self.stop_worker().await;
    }

    async fn start_worker(&mut self) -> bool {
        if self.worker.is_some() {
            self.deps.sink.log("Monitoring is already running.");
            return false;
        }

        let cancel = CancellationToken::new();
        let worker = CycleWorker::new(self.deps.clone(), self.settings.clone(), cancel.clone());
        let join = tokio::spawn(worker.run());
        self.worker = Some((cancel, join));

        *self.state.write().await = EngineState::Running;
        self.deps.sink.log("Monitoring started.");
        true
    }

    async fn stop_worker(&mut self) -> bool {
        let Some((cancel, join)) = self.worker.take() else {
            self.deps.sink.log("Monitoring is already stopped.");
            return false;
        };

        info!("Engine stopping, waiting for cycle worker");
        cancel.cancel();
        if let Err(e) = join.await {
            error!(error = %e, "Cycle worker ended abnormally");
        }

        *self.state.write().await = EngineState::Stopped;
        self.deps.sink.reset_progress();
        self.deps.sink.log("Monitoring stopped.");
        true
    }

    /// The worker ended without being asked to (a panic in a collaborator).
    async fn on_worker_exit(&mut self, exit: Result<(), JoinError>) {
        self.worker = None;
        *self.state.write().await = EngineState::Stopped;
        self.deps.sink.reset_progress();

        let reason = match exit {
            Ok(()) => "worker exited".to_string(),
            Err(e) => e.to_string(),
        };
        error!(reason = %reason, "Cycle worker ended unexpectedly");
        self.deps.sink.log(&format!("Monitoring stopped unexpectedly: {reason}"));
    }
}

/// Resolves when the running worker's task ends. Pending while there is none.
async fn worker_exit(worker: &mut Option<(CancellationToken, JoinHandle<()>)>) -> Result<(), JoinError> {
    match worker {
        Some((_, join)) => join.await,
        None => std::future::pending().await,
    }
}
