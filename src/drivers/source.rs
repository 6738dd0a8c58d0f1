use std::io::{ErrorKind, Read};
use std::thread;
use std::time::Duration;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serialport::SerialPort;
use crate::drivers::packet::{encode_packet, packet_len_for};
use crate::drivers::PipelineError;
/// Opens the instrument's serial port.
///
/// `timeout` bounds every blocking read so the acquisition loop can notice a
/// shutdown request while the rig is silent.
pub fn open_serial(
    port: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, PipelineError> {
    let handle = serialport::new(port, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|source| PipelineError::TransportOpen {
            port: port.to_string(),
            source,
        })?;
    info!("opened {port} at {baud_rate} baud");
    Ok(handle)
}
/// Names of the serial ports currently visible to the OS.
pub fn available_ports() -> Vec<String> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .unwrap_or_default()
}
/// Result of one attempt to read a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A full packet is in the buffer.
    Packet,
    /// The read timed out before any byte arrived.
    Idle,
    /// The read timed out mid-packet. The bytes are kept and the next call
    /// continues filling the same packet.
    Stalled(usize),
    /// End of stream after only this many bytes of a packet.
    Partial(usize),
    /// End of stream on a packet boundary.
    Closed,
}
/// Frames a byte stream into fixed-length packets.
///
/// The stream is assumed to start aligned to a packet boundary. A timeout
/// never discards received bytes, so a packet whose tail is late still
/// decodes whole and the stream stays aligned.
pub struct PacketReader<R> {
    inner: R,
    buf: Vec<u8>,
    filled: usize,
}
impl<R: Read> PacketReader<R> {
    pub fn new(inner: R, packet_len: usize) -> Self {
        Self {
            inner,
            buf: vec![0u8; packet_len],
            filled: 0,
        }
    }
    pub fn packet_len(&self) -> usize {
        self.buf.len()
    }
    pub fn read_packet(&mut self) -> Result<ReadOutcome, PipelineError> {
        while self.filled < self.buf.len() {
            match self.inner.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    let got = std::mem::take(&mut self.filled);
                    return Ok(if got == 0 {
                        ReadOutcome::Closed
                    } else {
                        ReadOutcome::Partial(got)
                    });
                }
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(match self.filled {
                        0 => ReadOutcome::Idle,
                        n => ReadOutcome::Stalled(n),
                    });
                }
                Err(e) => return Err(PipelineError::Transport(e)),
            }
        }
        self.filled = 0;
        Ok(ReadOutcome::Packet)
    }
    /// First `len` bytes of the last completed or abandoned packet.
    pub fn bytes(&self, len: usize) -> &[u8] {
        &self.buf[..len.min(self.buf.len())]
    }
}
/// Stand-in for the rig: produces well-formed packets with slowly varying
/// readings and a little noise.
pub struct SimulatedInstrument {
    channel_count: usize,
    sensor_rate_ms: u32,
    timestamp_ms: u32,
    phase: f32,
    rng: StdRng,
    pending: Vec<u8>,
    cursor: usize,
    remaining: Option<u64>,
    paced: bool,
}
impl SimulatedInstrument {
    pub fn new(channel_count: usize, sensor_rate_ms: u32) -> Self {
        Self {
            channel_count,
            sensor_rate_ms,
            timestamp_ms: 0,
            phase: 0.0,
            rng: StdRng::seed_from_u64(0x5eed),
            pending: Vec::with_capacity(packet_len_for(channel_count)),
            cursor: 0,
            remaining: None,
            paced: false,
        }
    }
    /// End the stream after `packets` packets.
    pub fn with_limit(mut self, packets: u64) -> Self {
        self.remaining = Some(packets);
        self
    }
    /// Sleep one sensor period before each packet, like the real firmware.
    pub fn paced(mut self) -> Self {
        self.paced = true;
        self
    }
    fn next_packet(&mut self) {
        if self.paced {
            thread::sleep(Duration::from_millis(u64::from(self.sensor_rate_ms)));
        }
        self.timestamp_ms = self.timestamp_ms.wrapping_add(self.sensor_rate_ms);
        self.phase += 0.05;
        let values: Vec<f32> = (0..self.channel_count)
            .map(|i| {
                let base = 10.0 * (i as f32 + 1.0);
                let wave = (self.phase * (i as f32 * 0.1 + 1.0)).sin() * 2.0;
                base + wave + self.rng.gen_range(-0.05f32..0.05)
            })
            .collect();
        self.pending = encode_packet(self.timestamp_ms, &values);
        self.cursor = 0;
    }
}
impl Read for SimulatedInstrument {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.cursor >= self.pending.len() {
            match self.remaining {
                Some(0) => {
                    debug!("simulated instrument exhausted");
                    return Ok(0);
                }
                Some(ref mut left) => *left -= 1,
                None => {}
            }
            self.next_packet();
        }
        let n = buf.len().min(self.pending.len() - self.cursor);
        buf[..n].copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}
