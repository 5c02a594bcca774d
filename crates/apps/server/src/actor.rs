//! Session actor: the one task that owns a [`GameSession`].
//!
//! Commands arrive on an mpsc channel and are handled strictly in order.
//! Grid enumeration runs on the blocking pool and streams batches back to
//! the actor, which applies them only while their generation is current.

use foundation::bounds::ViewportBounds;
use foundation::coord::Coordinate;
use runtime::cancel::GenerationToken;
use territory::cell::Cell;
use territory::config::GameConfig;
use territory::error::ConfigError;
use territory::generator::{DetachedGeneration, GenerationReport};
use territory::protocol::ServerMessage;
use territory::sample::PositionSample;
use territory::session::{GameSession, SessionStats};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

const COMMAND_BUFFER: usize = 256;
const BATCH_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Viewport(ViewportBounds),
    Sample(PositionSample),
    Tap(Coordinate),
    TapPolygon(Vec<Coordinate>),
}

/// Handle held by the connection; dropping `commands` ends the session.
pub struct SessionHandle {
    pub commands: mpsc::Sender<SessionCommand>,
    pub task: JoinHandle<SessionStats>,
}

struct GeneratedBatch {
    token: GenerationToken,
    cells: Vec<Cell>,
}

/// Starts a session actor that reports to `outbound`.
pub fn spawn_session(
    config: GameConfig,
    outbound: mpsc::Sender<ServerMessage>,
) -> Result<SessionHandle, ConfigError> {
    let session = GameSession::new(config)?;
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run_session(session, rx, outbound));
    Ok(SessionHandle { commands, task })
}

async fn run_session(
    mut session: GameSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    outbound: mpsc::Sender<ServerMessage>,
) -> SessionStats {
    let (batch_tx, mut batch_rx) = mpsc::channel::<GeneratedBatch>(BATCH_BUFFER);
    let mut worker: Option<JoinHandle<GenerationReport>> = None;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                if let Some(reply) = handle_command(&mut session, command, &batch_tx, &mut worker) {
                    if outbound.send(reply).await.is_err() {
                        break;
                    }
                }
            }
            Some(batch) = batch_rx.recv() => {
                session.apply_generated(&batch.token, batch.cells);
            }
        }

        if !flush_events(&mut session, &outbound).await {
            break;
        }
    }

    // Closing the batch channel unblocks a worker stuck on a full buffer.
    session.cancel_generation();
    drop(batch_rx);
    if let Some(handle) = worker.take() {
        join_worker(handle).await;
    }
    session.stats()
}

fn handle_command(
    session: &mut GameSession,
    command: SessionCommand,
    batch_tx: &mpsc::Sender<GeneratedBatch>,
    worker: &mut Option<JoinHandle<GenerationReport>>,
) -> Option<ServerMessage> {
    match command {
        SessionCommand::Viewport(bounds) => match session.start_detached_generation(bounds) {
            Ok(job) => {
                let batch_size = session.config().generation.batch_size;
                let previous = worker.replace(spawn_worker(job, batch_size, batch_tx.clone()));
                if let Some(previous) = previous {
                    tokio::spawn(join_worker(previous));
                }
                None
            }
            Err(err) => Some(ServerMessage::error("viewport_refused", err)),
        },
        SessionCommand::Sample(sample) => session
            .push_sample(sample)
            .err()
            .map(|err| ServerMessage::error("sample_rejected", err)),
        SessionCommand::Tap(coordinate) => session
            .tap(coordinate)
            .err()
            .map(|err| ServerMessage::error("tap_failed", err)),
        SessionCommand::TapPolygon(points) => session
            .tap_polygon(&points)
            .err()
            .map(|err| ServerMessage::error("tap_failed", err)),
    }
}

fn spawn_worker(
    job: DetachedGeneration,
    batch_size: usize,
    batches: mpsc::Sender<GeneratedBatch>,
) -> JoinHandle<GenerationReport> {
    tokio::task::spawn_blocking(move || {
        let token = job.token().clone();
        job.run_batches(batch_size, |cells| {
            batches
                .blocking_send(GeneratedBatch {
                    token: token.clone(),
                    cells,
                })
                .is_ok()
        })
    })
}

async fn join_worker(handle: JoinHandle<GenerationReport>) {
    match handle.await {
        Ok(report) => debug!(
            generation = report.generation,
            visited = report.visited,
            emitted = report.emitted,
            cancelled = report.cancelled,
            "grid worker finished"
        ),
        Err(err) => error!("grid worker failed: {err}"),
    }
}

async fn flush_events(session: &mut GameSession, outbound: &mpsc::Sender<ServerMessage>) -> bool {
    for event in session.drain_events() {
        if outbound.send(ServerMessage::from(event)).await.is_err() {
            return false;
        }
    }
    true
}
