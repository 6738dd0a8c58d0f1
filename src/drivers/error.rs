use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to open serial port {port}: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial read failed: {0}")]
    Transport(#[source] std::io::Error),
    #[error("malformed packet: expected {expected} bytes, got {actual}")]
    MalformedPacket { expected: usize, actual: usize },
    #[error("gave up after {attempts} consecutive malformed packets")]
    MalformedLimit { attempts: u32 },
    #[error("failed to open sample log {}: {source}", path.display())]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append sample to log: {0}")]
    LogWrite(#[source] std::io::Error),
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
