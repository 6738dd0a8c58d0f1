// src/types.rs

/// One decoded packet: device timestamp plus one value per configured channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub timestamp_ms: u64,
    pub channels: Vec<f32>,
}

impl Sample {
    pub fn new(timestamp_ms: u64, channels: Vec<f32>) -> Self {
        Self {
            timestamp_ms,
            channels,
        }
    }
}

/// A sample the scheduler decided to show, with the display time attached.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayPoint {
    pub time_ms: u64,
    pub values: Vec<f32>,
}

// 采集线程状态机
#[derive(Clone, Debug, PartialEq)]
pub enum AcquisitionState {
    WaitingForData,
    // 读到的字节数 (可能是不完整的包)
    Decoding(usize),
    Dispatching(Sample),
    Stopped(StopReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown flag was raised between packets.
    Shutdown,
    /// The byte stream reported end-of-file on a packet boundary.
    StreamClosed,
}
