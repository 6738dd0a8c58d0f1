// src/viewer.rs
use crate::drivers::buffer::DisplayBuffer;
use crate::drivers::handoff::SlotReceiver;
use crate::engine::AcquisitionStats;
use crate::types::DisplayPoint;
use crossbeam_channel::{never, select, tick, Receiver};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Draws the current display window. Called only from the display context.
pub trait Renderer {
    fn render(&mut self, channel_names: &[String], series: &[Vec<[f64; 2]>]);
}

// 显示端发给采集线程的指令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerCommand {
    Stop,
}

/// UI side of the pipeline: owns the display window and applies the points
/// handed over by the acquisition thread.
pub struct DisplayContext {
    buffer: DisplayBuffer,
    points: SlotReceiver<DisplayPoint>,
    refresh: Duration,
    shutdown: Arc<AtomicBool>,
    commands: Receiver<ViewerCommand>,
}

impl DisplayContext {
    pub fn new(
        buffer: DisplayBuffer,
        points: SlotReceiver<DisplayPoint>,
        refresh: Duration,
    ) -> Self {
        Self {
            buffer,
            points,
            refresh,
            shutdown: Arc::new(AtomicBool::new(false)),
            commands: never(),
        }
    }

    /// `Stop` on `commands` raises `shutdown`, the acquisition loop's flag.
    pub fn with_controls(
        mut self,
        shutdown: Arc<AtomicBool>,
        commands: Receiver<ViewerCommand>,
    ) -> Self {
        self.shutdown = shutdown;
        self.commands = commands;
        self
    }

    /// Event loop: apply points as they arrive, redraw on every refresh tick.
    ///
    /// Returns the final window once the acquisition thread has finished.
    /// A stop command only asks the worker to stop; the loop keeps drawing
    /// until the worker has actually let go of the slot.
    pub fn run<R: Renderer>(self, renderer: &mut R) -> DisplayBuffer {
        let DisplayContext {
            mut buffer,
            points,
            refresh,
            shutdown,
            commands,
        } = self;
        let ticker = tick(refresh);
        let mut commands_open = true;
        loop {
            let command_rx = if commands_open { commands.clone() } else { never() };
            select! {
                recv(points.receiver()) -> msg => match msg {
                    Ok(point) => apply(&mut buffer, point),
                    Err(_) => break,
                },
                recv(ticker) -> _ => renderer.render(buffer.channel_names(), &buffer.snapshot()),
                recv(command_rx) -> cmd => match cmd {
                    Ok(ViewerCommand::Stop) => {
                        if !shutdown.swap(true, Ordering::AcqRel) {
                            info!("⏹ Stop requested, waiting for acquisition to finish");
                        }
                    }
                    Err(_) => {
                        debug!("command channel closed");
                        commands_open = false;
                    }
                },
            }
        }
        // 最后一帧
        if !buffer.is_empty() {
            renderer.render(buffer.channel_names(), &buffer.snapshot());
        }
        if let Some(last) = buffer.latest() {
            debug!("last displayed point: {last:?}");
        }
        info!("display closed, {} points superseded before delivery", points.superseded());
        buffer
    }
}

fn apply(buffer: &mut DisplayBuffer, point: DisplayPoint) {
    if let Err(err) = buffer.push(point.time_ms, &point.values) {
        warn!("display point at {} ms rejected: {err}", point.time_ms);
    }
}

/// Headless renderer: logs the newest value of each channel every few frames.
pub struct LogRenderer {
    every: u64,
    frames: u64,
    stats: Option<Arc<AcquisitionStats>>,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
            stats: None,
        }
    }

    /// Also report the acquisition counters on each logged frame.
    pub fn with_stats(mut self, stats: Arc<AcquisitionStats>) -> Self {
        self.stats = Some(stats);
        self
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, channel_names: &[String], series: &[Vec<[f64; 2]>]) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }
        let line: Vec<String> = channel_names
            .iter()
            .zip(series)
            .filter_map(|(name, points)| points.last().map(|p| format!("{name}={:.2}", p[1])))
            .collect();
        if let Some(t) = series.first().and_then(|s| s.last()).map(|p| p[0]) {
            info!("t={t:.2}s {}", line.join(" "));
        }
        if let Some(stats) = &self.stats {
            let s = stats.snapshot();
            info!(
                "decoded={} logged={} malformed={} log_failures={}",
                s.decoded, s.logged, s.malformed, s.log_failures
            );
        }
    }
}
