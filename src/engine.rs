// src/engine.rs
use crate::drivers::handoff::SlotSender;
use crate::drivers::packet::PacketDecoder;
use crate::drivers::scheduler::Downsampler;
use crate::drivers::source::{PacketReader, ReadOutcome};
use crate::drivers::PipelineError;
use crate::recorder::SampleLog;
use crate::types::*;
use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Counters shared between the acquisition thread and whoever watches it.
#[derive(Debug, Default)]
pub struct AcquisitionStats {
    decoded: AtomicU64,
    logged: AtomicU64,
    forwarded: AtomicU64,
    malformed: AtomicU64,
    log_failures: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub decoded: u64,
    pub logged: u64,
    pub forwarded: u64,
    pub malformed: u64,
    pub log_failures: u64,
}

impl AcquisitionStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            decoded: self.decoded.load(Ordering::Relaxed),
            logged: self.logged.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            log_failures: self.log_failures.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcquisitionReport {
    pub reason: StopReason,
    pub stats: StatsSnapshot,
}

/// Background loop: byte stream -> decoder -> log + scheduler -> display slot.
pub struct AcquisitionLoop<R, W = File> {
    reader: PacketReader<R>,
    decoder: PacketDecoder,
    log: SampleLog<W>,
    scheduler: Downsampler,
    display: SlotSender<DisplayPoint>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<AcquisitionStats>,
    max_malformed_retries: u32,
    consecutive_malformed: u32,
}

impl<R: Read, W: Write> AcquisitionLoop<R, W> {
    pub fn new(
        stream: R,
        decoder: PacketDecoder,
        log: SampleLog<W>,
        scheduler: Downsampler,
        display: SlotSender<DisplayPoint>,
    ) -> Self {
        Self {
            reader: PacketReader::new(stream, decoder.packet_len()),
            decoder,
            log,
            scheduler,
            display,
            shutdown: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(AcquisitionStats::default()),
            max_malformed_retries: 16,
            consecutive_malformed: 0,
        }
    }

    pub fn with_malformed_limit(mut self, retries: u32) -> Self {
        self.max_malformed_retries = retries;
        self
    }

    /// Raise the returned flag to stop the loop before its next packet.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn stats(&self) -> Arc<AcquisitionStats> {
        Arc::clone(&self.stats)
    }

    /// Runs until shutdown, end of stream, or a fatal error.
    pub fn run(mut self) -> Result<AcquisitionReport, PipelineError> {
        info!(
            "⚙️ Acquisition started: {} channels, {}-byte packets, display every {} samples",
            self.decoder.channel_count(),
            self.decoder.packet_len(),
            self.scheduler.stride()
        );
        let mut state = AcquisitionState::WaitingForData;
        loop {
            state = match state {
                AcquisitionState::Stopped(reason) => {
                    let stats = self.stats.snapshot();
                    info!("🛑 Acquisition stopped ({reason:?}): {stats:?}");
                    if let Some(path) = self.log.path() {
                        info!("💾 {} rows saved to {}", self.log.rows_written(), path.display());
                    }
                    debug!("{} display points superseded", self.display.superseded());
                    return Ok(AcquisitionReport { reason, stats });
                }
                other => match self.step(other) {
                    Ok(next) => next,
                    Err(err) => {
                        error!("❌ Acquisition aborted: {err}");
                        return Err(err);
                    }
                },
            };
        }
    }

    /// Advances the state machine by one transition.
    pub fn step(&mut self, state: AcquisitionState) -> Result<AcquisitionState, PipelineError> {
        match state {
            AcquisitionState::WaitingForData => {
                if self.shutdown.load(Ordering::Acquire) {
                    return Ok(AcquisitionState::Stopped(StopReason::Shutdown));
                }
                Ok(match self.reader.read_packet()? {
                    ReadOutcome::Packet => AcquisitionState::Decoding(self.reader.packet_len()),
                    ReadOutcome::Partial(n) => AcquisitionState::Decoding(n),
                    ReadOutcome::Idle => AcquisitionState::WaitingForData,
                    ReadOutcome::Stalled(n) => {
                        debug!("packet stalled after {n} bytes, still waiting");
                        AcquisitionState::WaitingForData
                    }
                    ReadOutcome::Closed => AcquisitionState::Stopped(StopReason::StreamClosed),
                })
            }
            AcquisitionState::Decoding(len) => match self.decoder.decode(self.reader.bytes(len)) {
                Ok(sample) => {
                    self.consecutive_malformed = 0;
                    AcquisitionStats::bump(&self.stats.decoded);
                    Ok(AcquisitionState::Dispatching(sample))
                }
                Err(err @ PipelineError::MalformedPacket { .. }) => self.on_malformed(err),
                Err(err) => Err(err),
            },
            AcquisitionState::Dispatching(sample) => {
                self.dispatch(sample);
                Ok(AcquisitionState::WaitingForData)
            }
            stopped @ AcquisitionState::Stopped(_) => Ok(stopped),
        }
    }

    // 丢弃当前包, 回到等待状态; 连续失败超过上限才终止
    fn on_malformed(&mut self, err: PipelineError) -> Result<AcquisitionState, PipelineError> {
        AcquisitionStats::bump(&self.stats.malformed);
        self.consecutive_malformed += 1;
        if self.consecutive_malformed > self.max_malformed_retries {
            return Err(PipelineError::MalformedLimit {
                attempts: self.consecutive_malformed,
            });
        }
        warn!(
            "dropping packet ({err}), attempt {}/{}",
            self.consecutive_malformed, self.max_malformed_retries
        );
        Ok(AcquisitionState::WaitingForData)
    }

    fn dispatch(&mut self, sample: Sample) {
        // 1. 每个样本都写入日志
        match self.log.append(&sample) {
            Ok(()) if self.log.is_enabled() => AcquisitionStats::bump(&self.stats.logged),
            Ok(()) => {}
            Err(err) => {
                AcquisitionStats::bump(&self.stats.log_failures);
                warn!("sample at {} ms not logged: {err}", sample.timestamp_ms);
            }
        }
        // 2. 降频后送往显示线程
        if let Some(point) = self.scheduler.offer(&sample) {
            if self.display.send(point) {
                AcquisitionStats::bump(&self.stats.forwarded);
            } else {
                debug!("display context gone, point dropped");
            }
        }
    }
}

pub fn spawn_acquisition<R, W>(
    acquisition: AcquisitionLoop<R, W>,
) -> std::io::Result<JoinHandle<Result<AcquisitionReport, PipelineError>>>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    thread::Builder::new()
        .name("acquisition".to_owned())
        .spawn(move || acquisition.run())
}
