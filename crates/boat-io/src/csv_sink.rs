//! Flat sink: append-only CSV log consumed by the dashboard.
//!
//! Layout is fixed for downstream readers: the timestamp is split into a
//! `DD Mon, YYYY` date and a `HH:MM AM/PM` time, counters are truncated to
//! integers (a charge below 1 % still reads 1), voltage keeps two decimals
//! and temperature one.

use crate::error::SinkError;
use boat_core::{tags, PersistenceError, Recorder, Sample};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SINK_NAME: &str = "flat";

pub const DATE_FORMAT: &str = "%d %b, %Y";
pub const TIME_FORMAT: &str = "%I:%M %p";

/// Header row in column order.
pub fn header() -> Vec<&'static str> {
    let mut columns = vec!["date", "time"];
    columns.extend(tags::CHANNELS.iter().map(|t| t.header));
    columns
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub date: String,
    pub time: String,
    #[serde(rename = "speedKPH")]
    pub speed_kph: i64,
    pub rpm: i64,
    #[serde(rename = "batteryVoltage")]
    pub battery_voltage: f64,
    #[serde(rename = "batteryPercentage")]
    pub battery_percentage: i64,
    #[serde(rename = "windSpeed")]
    pub wind_speed: i64,
    pub temp: f64,
}

impl From<&Sample> for FlatRow {
    fn from(sample: &Sample) -> Self {
        Self {
            date: sample.timestamp.format(DATE_FORMAT).to_string(),
            time: sample.timestamp.format(TIME_FORMAT).to_string(),
            speed_kph: sample.speed_kph.trunc() as i64,
            rpm: sample.rpm.trunc() as i64,
            battery_voltage: round_to(sample.battery_voltage, 2),
            battery_percentage: sample.whole_battery_percent(),
            wind_speed: sample.wind_speed.trunc() as i64,
            temp: round_to(sample.temperature, 1),
        }
    }
}

impl FlatRow {
    /// Recover the minute-resolution timestamp from the split columns.
    pub fn timestamp(&self) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(
            &format!("{} {}", self.date, self.time),
            &format!("{} {}", DATE_FORMAT, TIME_FORMAT),
        )
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Backing file of the flat log.
///
/// A row is appended in one piece; a failed append is cut back to the length
/// the file had before it.
pub trait LogFile: Write + Send {
    fn size(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&self) -> io::Result<()>;
}

impl LogFile for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }
}

pub struct FlatSink<F: LogFile = File> {
    file: F,
    path: PathBuf,
    row: Vec<u8>,
}

impl FlatSink<File> {
    /// Open for append; the header is written only into an empty file and
    /// must already lead a non-empty one.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = LogFile::size(&file)? == 0;
        if !fresh {
            check_header(path)?;
        }

        let mut sink = Self::with_file(file, path);
        if fresh {
            let mut line = Vec::new();
            {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(&mut line);
                writer.write_record(header())?;
                writer.flush()?;
            }
            sink.file.write_all(&line)?;
            sink.file.sync()?;
        }

        info!(path = %path.display(), fresh, "Flat sink ready");
        Ok(sink)
    }
}

impl<F: LogFile> FlatSink<F> {
    fn with_file(file: F, path: &Path) -> Self {
        Self {
            file,
            path: path.to_path_buf(),
            row: Vec::with_capacity(128),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&mut self, sample: &Sample) -> Result<(), csv::Error> {
        self.row.clear();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.row);
        writer.serialize(FlatRow::from(sample))?;
        writer.flush()?;
        Ok(())
    }

    fn append(&mut self) -> io::Result<()> {
        let before = self.file.size()?;
        let written = self
            .file
            .write_all(&self.row)
            .and_then(|()| self.file.flush())
            .and_then(|()| self.file.sync());
        if let Err(e) = written {
            if let Err(cut) = self.file.truncate(before) {
                warn!(error = %cut, len = before, "Failed to cut back partial row");
            }
            return Err(e);
        }
        Ok(())
    }
}

fn check_header(path: &Path) -> Result<(), SinkError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let found = match reader.records().next() {
        Some(record) => record?.iter().collect::<Vec<_>>().join(","),
        None => String::new(),
    };
    if found != header().join(",") {
        return Err(SinkError::HeaderMismatch {
            path: path.to_path_buf(),
            found,
        });
    }
    Ok(())
}

impl<F: LogFile> Recorder for FlatSink<F> {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    fn record(&mut self, sample: &Sample) -> Result<(), PersistenceError> {
        self.encode(sample)
            .map_err(|e| PersistenceError::backend(SINK_NAME, e))?;
        self.append().map_err(|source| PersistenceError::Io {
            sink: SINK_NAME,
            source,
        })
    }
}

/// Parse a flat log back into rows.
pub fn read_rows(path: &Path) -> Result<Vec<FlatRow>, SinkError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use std::io::Read;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// In-memory log whose next write stores half the bytes and then fails.
    #[derive(Clone, Default)]
    struct FlakyFile {
        data: Arc<Mutex<Vec<u8>>>,
        fail_next: bool,
    }

    impl Write for FlakyFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut data = self.data.lock().unwrap();
            if self.fail_next {
                self.fail_next = false;
                data.extend_from_slice(&buf[..buf.len() / 2]);
                return Err(io::Error::other("disk full"));
            }
            data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogFile for FlakyFile {
        fn size(&self) -> io::Result<u64> {
            Ok(self.data.lock().unwrap().len() as u64)
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            self.data.lock().unwrap().truncate(len as usize);
            Ok(())
        }

        fn sync(&self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sample() -> Sample {
        Sample {
            timestamp: NaiveDate::from_ymd_opt(2025, 2, 5)
                .unwrap()
                .and_hms_opt(14, 27, 41)
                .unwrap(),
            speed_kph: 39.87,
            rpm: 2990.25,
            battery_voltage: 339.8764,
            battery_percentage: 99.98,
            wind_speed: 5.93,
            temperature: 28.46,
        }
    }

    #[test]
    fn header_matches_dashboard_layout() {
        assert_eq!(
            header(),
            vec![
                "date",
                "time",
                "speedKPH",
                "rpm",
                "batteryVoltage",
                "batteryPercentage",
                "windSpeed",
                "temp"
            ]
        );
    }

    #[test]
    fn row_uses_fixed_formatting() {
        let row = FlatRow::from(&sample());
        assert_eq!(row.date, "05 Feb, 2025");
        assert_eq!(row.time, "02:27 PM");
        assert_eq!(row.speed_kph, 39);
        assert_eq!(row.rpm, 2990);
        assert_eq!(row.battery_voltage, 339.88);
        assert_eq!(row.battery_percentage, 99);
        assert_eq!(row.wind_speed, 5);
        assert_eq!(row.temp, 28.5);
    }

    #[test]
    fn writes_header_once_and_quotes_date() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boat_log.csv");
        {
            let mut sink = FlatSink::open(&path).unwrap();
            sink.record(&sample()).unwrap();
        }
        {
            let mut sink = FlatSink::open(&path).unwrap();
            sink.record(&sample()).unwrap();
        }

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "date,time,speedKPH,rpm,batteryVoltage,batteryPercentage,windSpeed,temp"
        );
        assert_eq!(lines[1], "\"05 Feb, 2025\",02:27 PM,39,2990,339.88,99,5,28.5");
        assert_eq!(lines[1], lines[2]);
    }

    #[test]
    fn rows_parse_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("boat_log.csv");
        let mut sink = FlatSink::open(&path).unwrap();

        let mut written = Vec::new();
        for minute in 0..3 {
            let mut s = sample();
            s.timestamp += chrono::Duration::minutes(minute);
            s.battery_percentage -= minute as f64 * 0.4;
            sink.record(&s).unwrap();
            written.push(s);
        }

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        for (row, s) in rows.iter().zip(&written) {
            assert_eq!(row, &FlatRow::from(s));
            let stamp = row.timestamp().unwrap();
            assert_eq!(stamp, s.timestamp.with_second(0).unwrap());
        }
    }

    #[test]
    fn failed_row_is_not_replayed_into_next_tick() {
        let file = FlakyFile {
            fail_next: true,
            ..FlakyFile::default()
        };
        let data = Arc::clone(&file.data);
        let mut sink = FlatSink::with_file(file, Path::new("flaky.csv"));

        let first = sample();
        let mut second = sample();
        second.timestamp += chrono::Duration::minutes(1);

        assert!(sink.record(&first).is_err());
        assert!(data.lock().unwrap().is_empty());

        sink.record(&second).unwrap();
        let content = String::from_utf8(data.lock().unwrap().clone()).unwrap();
        assert_eq!(content, "\"05 Feb, 2025\",02:28 PM,39,2990,339.88,99,5,28.5\n");
    }

    #[test]
    fn nearly_empty_battery_reads_one_percent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boat_log.csv");
        let mut sink = FlatSink::open(&path).unwrap();

        let mut low = sample();
        low.battery_percentage = 0.5;
        let mut empty = sample();
        empty.battery_percentage = 0.0;
        empty.rpm = 0.0;
        sink.record(&low).unwrap();
        sink.record(&empty).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!((rows[0].battery_percentage, rows[0].rpm), (1, 2990));
        assert_eq!((rows[1].battery_percentage, rows[1].rpm), (0, 0));
    }

    #[test]
    fn refuses_file_with_foreign_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("boat_log.csv");
        std::fs::write(&path, "when,what\n1,2\n").unwrap();

        match FlatSink::open(&path) {
            Err(SinkError::HeaderMismatch { found, .. }) => assert_eq!(found, "when,what"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("foreign file accepted"),
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "when,what\n1,2\n");
    }
}
