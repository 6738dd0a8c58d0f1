use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::drivers::packet::{packet_len_for, FIELD_WIDTH, REFERENCE_PACKET_LEN, TIMESTAMP_WIDTH};
use crate::drivers::PipelineError;
/// Leading channel name meaning "the instrument supplies its own timestamp".
pub const DEVICE_TIME_MARKER: &str = "time (ms)";
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Serial,
    Simulated,
}
/// Everything needed to build one acquisition session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub channels: Vec<String>,
    pub source: SourceKind,
    pub port: String,
    pub baud_rate: u32,
    /// Display refresh interval.
    pub update_rate_ms: u64,
    /// Interval at which the instrument emits packets.
    pub sensor_rate_ms: u64,
    /// Points kept per displayed series.
    pub max_size: usize,
    pub write_to_file: bool,
    /// Defaults to `data_<local time>.csv`.
    pub file_name: Option<String>,
    pub file_directory: PathBuf,
    pub packet_len: usize,
    pub read_timeout_ms: u64,
    pub max_malformed_retries: u32,
    /// Simulated source only: end the stream after this many packets.
    pub simulated_packets: Option<u64>,
    /// Stop the session after this long. `None` runs until `q` on stdin.
    pub run_for_secs: Option<u64>,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channels: [
                DEVICE_TIME_MARKER,
                "PT1 (barg)",
                "PT2 (barg)",
                "FM (g/s)",
                "TC1 (degC)",
                "TC2 (degC)",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            source: SourceKind::Serial,
            port: "/dev/ttyACM0".to_owned(),
            baud_rate: 115_200,
            update_rate_ms: 50,
            sensor_rate_ms: 50,
            max_size: 250,
            write_to_file: true,
            file_name: None,
            file_directory: PathBuf::from("csv_files"),
            packet_len: REFERENCE_PACKET_LEN,
            read_timeout_ms: 100,
            max_malformed_retries: 16,
            simulated_packets: None,
            run_for_secs: None,
        }
    }
}
impl PipelineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
    /// True when the first channel entry is [`DEVICE_TIME_MARKER`].
    pub fn device_timestamps(&self) -> bool {
        self.channels
            .first()
            .map(|c| c == DEVICE_TIME_MARKER)
            .unwrap_or(false)
    }
    /// Data channel names, without the timestamp marker.
    pub fn channel_names(&self) -> Vec<String> {
        let skip = usize::from(self.device_timestamps());
        self.channels.iter().skip(skip).cloned().collect()
    }
    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_secs.map(Duration::from_secs)
    }
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
    pub fn validate(&self) -> Result<(), PipelineError> {
        let names = self.channel_names();
        if names.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one data channel is required".into(),
            ));
        }
        if self.update_rate_ms == 0 || self.sensor_rate_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "update and sensor rates must be greater than zero".into(),
            ));
        }
        if self.max_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_size must be greater than zero".into(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "read_timeout_ms must be greater than zero".into(),
            ));
        }
        let payload = self.packet_len.checked_sub(TIMESTAMP_WIDTH).ok_or_else(|| {
            PipelineError::InvalidConfig(format!(
                "packet_len {} is shorter than the timestamp field",
                self.packet_len
            ))
        })?;
        if payload % FIELD_WIDTH != 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "packet_len {} is not a timestamp plus whole 4-byte fields",
                self.packet_len
            )));
        }
        if packet_len_for(names.len()) != self.packet_len {
            return Err(PipelineError::ChannelCountMismatch {
                expected: payload / FIELD_WIDTH,
                actual: names.len(),
            });
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_describe_the_reference_rig() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert!(config.device_timestamps());
        assert_eq!(config.channel_names().len(), 5);
        assert_eq!(config.channel_names()[0], "PT1 (barg)");
    }
    #[test]
    fn partial_json_falls_back_to_defaults() {
        let text = r#"{ "port": "COM4", "update_rate_ms": 25, "sensor_rate_ms": 10,
                         "source": "simulated", "simulated_packets": 40 }"#;
        let config = PipelineConfig::from_json_str(text).unwrap();
        assert_eq!(config.port, "COM4");
        assert_eq!(config.update_rate_ms, 25);
        assert_eq!(config.source, SourceKind::Simulated);
        assert_eq!(config.max_size, 250);
        assert!(config.write_to_file);
        assert_eq!(config.simulated_packets, Some(40));
        assert_eq!(config.run_for(), None);
    }
    #[test]
    fn channel_names_without_marker_use_host_clock() {
        let config = PipelineConfig {
            channels: vec!["FM (slm)".into()],
            packet_len: 8,
            ..Default::default()
        };
        config.validate().unwrap();
        assert!(!config.device_timestamps());
        assert_eq!(config.channel_names(), vec!["FM (slm)".to_string()]);
    }
    #[test]
    fn packet_width_must_match_channel_list() {
        let config = PipelineConfig {
            channels: vec![DEVICE_TIME_MARKER.into(), "PT1".into(), "PT2".into()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ChannelCountMismatch {
                expected: 5,
                actual: 2
            }
        ));
    }
    #[test]
    fn ragged_packet_len_is_invalid() {
        let config = PipelineConfig {
            packet_len: 23,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(PipelineError::ConfigParse(_))
        ));
    }
}
