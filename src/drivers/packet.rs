//! Fixed-width binary packet layout shared with the rig firmware.
//!
//! ```text
//! offset  width  type  meaning
//! 0       4      u32   timestamp, ms
//! 4+4i    4      f32   channel i
//! ```
//! All fields are little-endian. The reference instrument sends five
//! channels, so one packet is 24 bytes.
use crate::drivers::PipelineError;
use crate::types::Sample;
pub const TIMESTAMP_WIDTH: usize = 4;
pub const FIELD_WIDTH: usize = 4;
/// Channel count of the reference rig (PT1, PT2, FM, TC1, TC2).
pub const REFERENCE_CHANNELS: usize = 5;
pub const REFERENCE_PACKET_LEN: usize = packet_len_for(REFERENCE_CHANNELS);
pub const fn packet_len_for(channel_count: usize) -> usize {
    TIMESTAMP_WIDTH + FIELD_WIDTH * channel_count
}
/// Turns raw packets into samples for a fixed channel count.
#[derive(Clone, Copy, Debug)]
pub struct PacketDecoder {
    channel_count: usize,
}
impl PacketDecoder {
    pub fn new(channel_count: usize) -> Self {
        Self { channel_count }
    }
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }
    pub fn packet_len(&self) -> usize {
        packet_len_for(self.channel_count)
    }
    pub fn decode(&self, raw: &[u8]) -> Result<Sample, PipelineError> {
        let expected = self.packet_len();
        if raw.len() != expected {
            return Err(PipelineError::MalformedPacket {
                expected,
                actual: raw.len(),
            });
        }
        let (stamp, body) = raw.split_at(TIMESTAMP_WIDTH);
        let timestamp_ms = u32::from_le_bytes([stamp[0], stamp[1], stamp[2], stamp[3]]);
        let channels = body
            .chunks_exact(FIELD_WIDTH)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Sample::new(u64::from(timestamp_ms), channels))
    }
}
/// Builds a packet in the firmware's wire layout.
pub fn encode_packet(timestamp_ms: u32, channels: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packet_len_for(channels.len()));
    out.extend_from_slice(&timestamp_ms.to_le_bytes());
    for value in channels {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}
