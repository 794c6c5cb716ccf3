//! # Dispatcher and Tile Workers
//!
//! ```text
//!                   ┌──────────────────────────────┐
//!   HostMessage ───>│          DISPATCHER          │───> EngineMessage
//!                   │  (owns RenderEngine, single  │     (Ready, Tile,
//!                   │   writer to the host)        │      Done, ...)
//!                   └──────┬─────────────▲─────────┘
//!                  TileTask│             │WorkerReport
//!                   [bounded queue]  [unbounded]
//!                   ┌──────▼─────────────┴─────────┐
//!                   │  worker 0 │ worker 1 │ ...   │
//!                   └──────────────────────────────┘
//! ```
//!
//! The dispatcher keeps the task queue topped up from the live session.
//! When a new request arrives it bumps the engine epoch and publishes it
//! in an atomic; workers skip queued tasks from older epochs without
//! rendering them, and anything already rendered is dropped by the
//! dispatcher. A tile that panics fails its session and the worker goes
//! on serving.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tilecast_core::SceneConfig;
use tilecast_protocol::{EngineMessage, HostMessage, SessionId};

use crate::channel::{render_channel, EngineEndpoint, RenderHost};
use crate::config::EngineConfig;
use crate::engine::{RenderEngine, TileVerdict};
use crate::error::{EngineError, EngineResult};
use crate::session::{RenderedTile, TileTask};

/// Counters for one engine, shared between the dispatcher and the handle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Sessions accepted.
    pub sessions_started: u64,
    /// Sessions that delivered every tile.
    pub sessions_completed: u64,
    /// Sessions abandoned for a newer request or at shutdown.
    pub sessions_cancelled: u64,
    /// Sessions ended with `Failed`.
    pub sessions_failed: u64,
    /// Requests answered with `Rejected`.
    pub requests_rejected: u64,
    /// Tiles forwarded to the host.
    pub tiles_emitted: u64,
    /// Rendered tiles dropped because their session was gone.
    pub tiles_discarded: u64,
    /// Queued tasks skipped before rendering.
    pub tasks_skipped: u64,
    /// Fallback pixels in forwarded tiles.
    pub pixels_substituted: u64,
}

/// What a worker reports back for each task it takes.
#[derive(Debug)]
enum WorkerReport {
    Finished(RenderedTile),
    Skipped,
    Panicked { session: SessionId, epoch: u64, message: String },
}

/// How a worker turns a task into pixels.
type RenderFn = fn(&TileTask) -> RenderedTile;

/// A running engine: the dispatcher thread plus its tile workers.
///
/// Dropping the handle shuts the engine down and joins every thread.
pub struct EngineHandle {
    stop: Option<Sender<()>>,
    dispatcher: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<Mutex<EngineStats>>,
}

impl EngineHandle {
    /// Starts an engine and returns it with the host end of its channel.
    pub fn spawn(config: EngineConfig) -> EngineResult<(Self, RenderHost)> {
        config.validate()?;
        let (host, endpoint) = render_channel(config.channel_capacity);
        let handle = Self::spawn_with_endpoint(config, endpoint)?;
        Ok((handle, host))
    }

    /// Starts an engine serving an existing endpoint.
    pub fn spawn_with_endpoint(config: EngineConfig, endpoint: EngineEndpoint) -> EngineResult<Self> {
        Self::start(config, endpoint, TileTask::render)
    }

    fn start(config: EngineConfig, endpoint: EngineEndpoint, render: RenderFn) -> EngineResult<Self> {
        config.validate()?;
        let worker_count = config.resolved_worker_threads();

        let (task_tx, task_rx) = bounded::<TileTask>(worker_count * 2);
        let (report_tx, report_rx) = unbounded::<WorkerReport>();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let epoch = Arc::new(AtomicU64::new(0));
        let stats = Arc::new(Mutex::new(EngineStats::default()));

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let tasks = task_rx.clone();
            let reports = report_tx.clone();
            let epoch = Arc::clone(&epoch);
            workers.push(spawn_named(format!("tilecast-worker-{index}"), move || {
                worker_loop(&tasks, &reports, &epoch, render);
            })?);
        }
        drop(report_tx);

        let dispatcher = Dispatcher {
            engine: RenderEngine::new(config),
            endpoint,
            tasks: task_tx,
            reports: Some(report_rx),
            stop: stop_rx,
            epoch,
            stats: Arc::clone(&stats),
        };
        let dispatcher = spawn_named("tilecast-dispatcher".to_string(), move || dispatcher.run())?;

        tracing::info!("Render engine started with {} tile workers", worker_count);
        Ok(Self { stop: Some(stop_tx), dispatcher: Some(dispatcher), workers, stats })
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats.lock().clone()
    }

    /// Number of tile workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops the engine and waits for every thread to exit.
    pub fn shutdown(mut self) -> EngineStats {
        self.stop_and_join();
        self.stats()
    }

    fn stop_and_join(&mut self) {
        // Disconnecting the stop channel wakes the dispatcher.
        drop(self.stop.take());
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                tracing::warn!("Dispatcher thread panicked");
            }
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("Tile worker panicked");
            }
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn spawn_named<F>(name: String, body: F) -> EngineResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(body)
        .map_err(|e| EngineError::Spawn { thread: name, message: e.to_string() })
}

fn worker_loop(
    tasks: &Receiver<TileTask>,
    reports: &Sender<WorkerReport>,
    epoch: &AtomicU64,
    render: RenderFn,
) {
    while let Ok(task) = tasks.recv() {
        let report = if task.epoch == epoch.load(Ordering::Acquire) {
            match panic::catch_unwind(AssertUnwindSafe(|| render(&task))) {
                Ok(rendered) => WorkerReport::Finished(rendered),
                Err(payload) => WorkerReport::Panicked {
                    session: task.session,
                    epoch: task.epoch,
                    message: panic_message(payload.as_ref()),
                },
            }
        } else {
            WorkerReport::Skipped
        };
        if reports.send(report).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tile worker panicked".to_string()
    }
}

/// Control flow after handling one event.
enum Flow {
    Continue,
    Stop,
}

struct Dispatcher {
    engine: RenderEngine,
    endpoint: EngineEndpoint,
    tasks: Sender<TileTask>,
    reports: Option<Receiver<WorkerReport>>,
    stop: Receiver<()>,
    epoch: Arc<AtomicU64>,
    stats: Arc<Mutex<EngineStats>>,
}

impl Dispatcher {
    fn run(mut self) {
        if matches!(self.deliver(EngineMessage::Ready), Flow::Stop) {
            return;
        }

        loop {
            let requests = self.endpoint.requests().clone();
            let reports = self.reports.clone().unwrap_or_else(never);
            let stop = self.stop.clone();
            let flow = select! {
                recv(requests) -> message => match message {
                    Ok(HostMessage::Render { session, config }) => self.begin(session, config),
                    Ok(HostMessage::Shutdown) | Err(_) => Flow::Stop,
                },
                recv(reports) -> report => match report {
                    Ok(report) => self.on_report(report),
                    Err(_) => self.workers_lost(),
                },
                recv(stop) -> _ => Flow::Stop,
            };
            if matches!(flow, Flow::Stop) {
                break;
            }
        }

        if let Some(session) = self.engine.cancel() {
            tracing::debug!("Session {} cancelled by shutdown", session);
            self.stats.lock().sessions_cancelled += 1;
        }
        self.publish_epoch();
        tracing::info!("Render engine stopped");
    }

    fn begin(&mut self, session: SessionId, config: SceneConfig) -> Flow {
        match self.engine.begin_render(session, config) {
            Ok(abandoned) => {
                self.publish_epoch();
                {
                    let mut stats = self.stats.lock();
                    stats.sessions_started += 1;
                    if abandoned.is_some() {
                        stats.sessions_cancelled += 1;
                    }
                }
                self.pump();
                Flow::Continue
            }
            Err(err) => {
                tracing::warn!("Rejected request {}: {}", session, err);
                self.stats.lock().requests_rejected += 1;
                self.deliver(EngineMessage::Rejected { session, reason: err.to_string() })
            }
        }
    }

    fn on_report(&mut self, report: WorkerReport) -> Flow {
        let flow = match report {
            WorkerReport::Skipped => {
                self.stats.lock().tasks_skipped += 1;
                Flow::Continue
            }
            WorkerReport::Finished(rendered) => match self.engine.accept_tile(rendered) {
                TileVerdict::Stale(_) => {
                    self.stats.lock().tiles_discarded += 1;
                    Flow::Continue
                }
                TileVerdict::Deliver { tile, finished } => {
                    {
                        let mut stats = self.stats.lock();
                        stats.tiles_emitted += 1;
                        stats.pixels_substituted += u64::from(tile.substituted);
                    }
                    if finished.is_some() {
                        self.publish_epoch();
                    }
                    match self.deliver(EngineMessage::Tile(tile)) {
                        Flow::Continue => match finished {
                            Some(session) => {
                                self.stats.lock().sessions_completed += 1;
                                self.deliver(EngineMessage::Done { session })
                            }
                            None => Flow::Continue,
                        },
                        Flow::Stop => Flow::Stop,
                    }
                }
            },
            WorkerReport::Panicked { session, epoch, message } => {
                if self.engine.is_current(epoch) && self.engine.fail_session(session) {
                    self.publish_epoch();
                    tracing::warn!("Session {} failed: {}", session, message);
                    self.stats.lock().sessions_failed += 1;
                    self.deliver(EngineMessage::Failed { session, reason: message })
                } else {
                    Flow::Continue
                }
            }
        };
        if matches!(flow, Flow::Continue) {
            self.pump();
        }
        flow
    }

    /// Every worker is gone; nothing more can be rendered.
    fn workers_lost(&mut self) -> Flow {
        self.reports = None;
        tracing::warn!("All tile workers exited");
        match self.engine.cancel() {
            Some(session) => {
                self.publish_epoch();
                self.stats.lock().sessions_failed += 1;
                self.deliver(EngineMessage::Failed {
                    session,
                    reason: "tile workers exited".to_string(),
                })
            }
            None => Flow::Continue,
        }
    }

    /// Moves tasks from the live session into the queue until it is full.
    fn pump(&mut self) {
        // The dispatcher is the only producer, so a queue that is not full
        // now cannot fill up before the send below.
        while !self.tasks.is_full() {
            let Some(task) = self.engine.next_task() else {
                break;
            };
            if self.tasks.send(task).is_err() {
                break;
            }
        }
    }

    fn publish_epoch(&self) {
        self.epoch.store(self.engine.epoch(), Ordering::Release);
    }

    /// Sends to the host unless the engine is told to stop first.
    fn deliver(&self, message: EngineMessage) -> Flow {
        select! {
            send(self.endpoint.events(), message) -> sent => {
                if sent.is_ok() {
                    Flow::Continue
                } else {
                    tracing::info!("Host endpoint closed");
                    Flow::Stop
                }
            },
            recv(self.stop) -> _ => Flow::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tilecast_core::Rgb8;
    use tilecast_protocol::PixelBuffer;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    /// Panics on the top-left tile of the first session.
    fn render_failing_first_session(task: &TileTask) -> RenderedTile {
        if task.session == SessionId(1) && task.rect.x == 0 && task.rect.y == 0 {
            panic!("tile exploded");
        }
        task.render()
    }

    /// Replaces every pixel with the fallback color, as for non-finite radiance.
    fn render_all_fallback(task: &TileTask) -> RenderedTile {
        let mut rendered = task.render();
        let rect = rendered.tile.rect;
        let mut pixels = PixelBuffer::with_capacity(rect.width, rect.height);
        for _ in 0..rect.area() {
            pixels.push(Rgb8::FALLBACK);
        }
        rendered.tile.pixels = pixels;
        rendered.tile.substituted = rect.width * rect.height;
        rendered
    }

    fn start(render: RenderFn) -> (EngineHandle, RenderHost) {
        let config = EngineConfig { worker_threads: 2, tile_size: 8, ..EngineConfig::preview() };
        let (host, endpoint) = render_channel(config.channel_capacity);
        let engine = EngineHandle::start(config, endpoint, render).unwrap();
        assert_eq!(host.recv_timeout(TIMEOUT).unwrap(), Some(EngineMessage::Ready));
        (engine, host)
    }

    fn terminal_message(host: &RenderHost) -> EngineMessage {
        loop {
            let message = host.recv_timeout(TIMEOUT).unwrap().expect("engine stalled");
            if message.is_terminal() {
                return message;
            }
        }
    }

    #[test]
    fn test_panicking_tile_fails_session_and_engine_recovers() {
        let (engine, mut host) = start(render_failing_first_session);
        let scene = SceneConfig { width: 24, height: 16, ..SceneConfig::default() };

        let first = host.request(scene).unwrap();
        assert_eq!(first, SessionId(1));
        match terminal_message(&host) {
            EngineMessage::Failed { session, reason } => {
                assert_eq!(session, first);
                assert_eq!(reason, "tile exploded");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        // Nothing else of the failed session reaches the host, Done included.
        assert_eq!(host.recv_unfiltered_timeout(Duration::from_millis(200)).unwrap(), None);

        let second = host.request(scene).unwrap();
        assert_eq!(terminal_message(&host), EngineMessage::Done { session: second });

        let stats = engine.shutdown();
        assert_eq!(stats.sessions_failed, 1);
        assert_eq!(stats.sessions_completed, 1);
    }

    #[test]
    fn test_substituted_pixels_reach_host_and_stats() {
        let (engine, mut host) = start(render_all_fallback);
        let scene = SceneConfig { width: 20, height: 10, ..SceneConfig::default() };
        let session = host.request(scene).unwrap();

        let mut substituted = 0u64;
        loop {
            match host.recv_timeout(TIMEOUT).unwrap().expect("engine stalled") {
                EngineMessage::Tile(tile) => {
                    assert!(tile.pixels.pixels().iter().all(|p| *p == Rgb8::FALLBACK));
                    substituted += u64::from(tile.substituted);
                }
                EngineMessage::Done { session: done } => {
                    assert_eq!(done, session);
                    break;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(substituted, 200);

        let stats = engine.shutdown();
        assert_eq!(stats.pixels_substituted, 200);
        assert_eq!(stats.sessions_completed, 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(payload.as_ref()), "tile worker panicked");
    }

    #[test]
    fn test_spawn_rejects_bad_config() {
        let config = EngineConfig { tile_size: 0, ..EngineConfig::preview() };
        assert!(matches!(EngineHandle::spawn(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_spawn_and_shutdown() {
        let config = EngineConfig { worker_threads: 2, ..EngineConfig::preview() };
        let (engine, host) = EngineHandle::spawn(config).unwrap();
        assert_eq!(engine.worker_count(), 2);
        assert_eq!(host.recv().unwrap(), EngineMessage::Ready);
        let stats = engine.shutdown();
        assert_eq!(stats, EngineStats::default());
        assert_eq!(host.recv(), Err(EngineError::TransportFailure));
    }
}
