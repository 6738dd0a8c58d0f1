use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use log::info;
use crate::config::PipelineConfig;
use crate::drivers::PipelineError;
use crate::types::Sample;

/// Append-only CSV log of every decoded sample.
///
/// Each row goes to the writer in one `write_all` and is flushed before
/// `append` returns. Nothing is buffered between rows, so a row that failed
/// is never written later by accident.
#[derive(Debug)]
pub struct SampleLog<W = File> {
    writer: Option<W>,
    path: Option<PathBuf>,
    rows_written: u64,
}

impl SampleLog<File> {
    /// A log that accepts samples and writes nothing.
    pub fn disabled() -> Self {
        Self { writer: None, path: None, rows_written: 0 }
    }

    /// Creates (or truncates) `path` and writes the header row.
    pub fn open(path: &Path, header: &[String]) -> Result<Self, PipelineError> {
        let open_err = |source: io::Error| PipelineError::LogOpen {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(open_err)?;
        }
        let file = File::create(path).map_err(open_err)?;
        let mut log = Self::with_writer(file, header).map_err(open_err)?;
        log.path = Some(path.to_path_buf());
        info!("💾 Recording to {}", path.display());
        Ok(log)
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        if !config.write_to_file {
            return Ok(Self::disabled());
        }
        let file_name = config.file_name.clone().unwrap_or_else(default_file_name);
        Self::open(&config.file_directory.join(file_name), &config.channel_names())
    }
}

impl<W: Write> SampleLog<W> {
    /// Logs to an already-open writer. The header row is written immediately.
    pub fn with_writer(mut writer: W, header: &[String]) -> io::Result<Self> {
        // 表头: time, 通道名...
        let mut line = String::from("time");
        for name in header {
            let _ = write!(line, ",{}", name);
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(Self { writer: Some(writer), path: None, rows_written: 0 })
    }

    pub fn append(&mut self, sample: &Sample) -> Result<(), PipelineError> {
        let Some(w) = &mut self.writer else {
            return Ok(());
        };
        let mut row = sample.timestamp_ms.to_string();
        for val in &sample.channels {
            let _ = write!(row, ",{}", val);
        }
        row.push('\n');
        w.write_all(row.as_bytes())
            .and_then(|()| w.flush())
            .map_err(PipelineError::LogWrite)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

/// `data_%Y-%m-%d,%H-%M-%S.csv` in local time.
pub fn default_file_name() -> String {
    chrono::Local::now().format("data_%Y-%m-%d,%H-%M-%S.csv").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        vec!["PT1 (barg)".into(), "FM (g/s)".into()]
    }

    #[test]
    fn rows_survive_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut log = SampleLog::open(&path, &header()).unwrap();
        for i in 0..7u64 {
            log.append(&Sample::new(i * 10, vec![i as f32 + 0.5, -1.25])).unwrap();
        }
        assert_eq!(log.rows_written(), 7);
        // Read back without dropping the writer, as if the process had died.
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,PT1 (barg),FM (g/s)"));
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0], "0,0.5,-1.25");
        assert_eq!(rows[6], "60,6.5,-1.25");
    }

    #[test]
    fn reopening_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut first = SampleLog::open(&path, &header()).unwrap();
        first.append(&Sample::new(1, vec![1.0, 2.0])).unwrap();
        drop(first);
        SampleLog::open(&path, &header()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn disabled_log_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            write_to_file: false,
            file_directory: dir.path().join("csv_files"),
            ..Default::default()
        };
        let mut log = SampleLog::from_config(&config).unwrap();
        log.append(&Sample::new(0, vec![0.0; 5])).unwrap();
        assert!(!log.is_enabled());
        assert_eq!(log.rows_written(), 0);
        assert!(!config.file_directory.exists());
    }

    #[test]
    fn from_config_creates_directory_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            file_name: Some("bench.csv".into()),
            file_directory: dir.path().join("nested").join("csv_files"),
            ..Default::default()
        };
        let log = SampleLog::from_config(&config).unwrap();
        let path = log.path().unwrap().to_path_buf();
        assert_eq!(path, config.file_directory.join("bench.csv"));
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(
            text.trim_end(),
            "time,PT1 (barg),PT2 (barg),FM (g/s),TC1 (degC),TC2 (degC)"
        );
    }

    #[test]
    fn unwritable_destination_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let err = SampleLog::open(dir.path(), &header()).unwrap_err();
        assert!(matches!(err, PipelineError::LogOpen { .. }));
    }

    /// In-memory disk whose listed write calls fail.
    struct Flaky<'a> {
        out: &'a mut Vec<u8>,
        fail_on: &'a [usize],
        calls: usize,
    }

    impl Write for Flaky<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on.contains(&call) {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            self.out.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_row_never_reaches_the_file() {
        let mut out = Vec::new();
        let disk = Flaky { out: &mut out, fail_on: &[2], calls: 0 };
        let mut log = SampleLog::with_writer(disk, &header()).unwrap();
        log.append(&Sample::new(0, vec![1.0, 2.0])).unwrap();
        let err = log.append(&Sample::new(10, vec![3.0, 4.0])).unwrap_err();
        assert!(matches!(err, PipelineError::LogWrite(_)));
        log.append(&Sample::new(20, vec![5.0, 6.0])).unwrap();
        assert_eq!(log.rows_written(), 2);
        drop(log);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "time,PT1 (barg),FM (g/s)
0,1,2
20,5,6
"
        );
    }

    #[test]
    fn default_name_follows_timestamp_pattern() {
        let name = default_file_name();
        assert!(name.starts_with("data_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "data_2024-01-01,00-00-00.csv".len());
    }
}
