//! Append-only position log.
//!
//! One line per report that moved a robot:
//!
//! ```text
//! time_us id x_cm y_cm theta_deg [covariance]
//! 1718000000123456 7 12 -40 95 0.010000,0.000000,...
//! ```
//!
//! The covariance column is present only when the robot sent one; it holds the
//! 25 values of the row-major 5×5 matrix separated by commas.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::types::{RobotId, RobotPose};
use crate::error::Result;
use crate::messages::COVARIANCE_LEN;

/// Header written at the top of every new log.
pub const POSITION_LOG_HEADER: &str = "time_us id x_cm y_cm theta_deg [covariance]";

/// Position log writer over any byte sink.
pub struct PositionLog {
    writer: Box<dyn Write + Send>,
    records: u64,
}

impl PositionLog {
    /// Create a log file (and its parent directory), truncating any previous log.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        log::info!("Position log: {}", path.display());
        Self::from_writer(BufWriter::new(file))
    }

    /// Wrap an arbitrary sink and write the header.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Result<Self> {
        let mut writer: Box<dyn Write + Send> = Box::new(writer);
        writeln!(writer, "{}", POSITION_LOG_HEADER)?;
        Ok(Self { writer, records: 0 })
    }

    /// Append a record stamped with the current wall-clock time.
    pub fn record(
        &mut self,
        id: RobotId,
        pose: &RobotPose,
        covariance: Option<&[f32; COVARIANCE_LEN]>,
    ) -> Result<()> {
        self.record_at(now_us(), id, pose, covariance)
    }

    /// Append a record with an explicit timestamp (microseconds since the epoch).
    pub fn record_at(
        &mut self,
        time_us: u64,
        id: RobotId,
        pose: &RobotPose,
        covariance: Option<&[f32; COVARIANCE_LEN]>,
    ) -> Result<()> {
        write!(
            self.writer,
            "{} {} {} {} {}",
            time_us, id, pose.position.x, pose.position.y, pose.heading
        )?;
        if let Some(values) = covariance {
            write!(self.writer, " {}", format_covariance(values))?;
        }
        writeln!(self.writer)?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Records written so far.
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl std::fmt::Debug for PositionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionLog")
            .field("writer", &"...")
            .field("records", &self.records)
            .finish()
    }
}

fn format_covariance(values: &[f32; COVARIANCE_LEN]) -> String {
    values
        .iter()
        .map(|v| format!("{:.6}", v))
        .collect::<Vec<_>>()
        .join(",")
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that keeps everything written, shared with the test.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_header_and_record() {
        let buffer = SharedBuffer::default();
        let mut log = PositionLog::from_writer(buffer.clone()).unwrap();

        let mut pose = RobotPose::new(0, 0, 90);
        pose.position.x = 12;
        pose.position.y = -40;
        pose.heading = 95;
        log.record_at(1_000_000, 7, &pose, None).unwrap();

        let text = buffer.contents();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec![POSITION_LOG_HEADER, "1000000 7 12 -40 95"]);
        assert_eq!(log.records(), 1);
    }

    #[test]
    fn test_record_with_covariance() {
        let buffer = SharedBuffer::default();
        let mut log = PositionLog::from_writer(buffer.clone()).unwrap();

        let mut covariance = [0.0f32; COVARIANCE_LEN];
        covariance[0] = 0.5;
        covariance[24] = 1.25;
        log.record_at(5, 1, &RobotPose::new(3, 4, 0), Some(&covariance))
            .unwrap();

        let text = buffer.contents();
        let record = text.lines().nth(1).unwrap();
        let fields: Vec<_> = record.split(' ').collect();
        assert_eq!(&fields[..5], &["5", "1", "3", "4", "0"]);

        let values: Vec<_> = fields[5].split(',').collect();
        assert_eq!(values.len(), COVARIANCE_LEN);
        assert_eq!(values[0], "0.500000");
        assert_eq!(values[24], "1.250000");
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("positions.csv");

        let mut log = PositionLog::create(&path).unwrap();
        log.record(2, &RobotPose::new(1, 1, 45), None).unwrap();
        log.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(" 2 1 1 45"));
    }
}
