//! Relational sink: one row per sample in a local SQLite table.

use crate::error::SinkError;
use boat_core::{PersistenceError, Recorder, Sample};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const TABLE: &str = "boat_telemetry";

const SINK_NAME: &str = "structured";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS boat_telemetry (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        speedKPH REAL NOT NULL,
        rpm REAL NOT NULL,
        batteryVoltage REAL NOT NULL,
        batteryPercentage INTEGER NOT NULL,
        windSpeed REAL NOT NULL,
        temperature REAL NOT NULL
    );
";

const INSERT_SQL: &str = "
    INSERT INTO boat_telemetry
        (timestamp, speedKPH, rpm, batteryVoltage, batteryPercentage, windSpeed, temperature)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";

/// A row as stored, identity key included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSample {
    pub id: i64,
    pub timestamp: String,
    pub speed_kph: f64,
    pub rpm: f64,
    pub battery_voltage: f64,
    pub battery_percentage: i64,
    pub wind_speed: f64,
    pub temperature: f64,
}

pub struct StructuredSink {
    conn: Connection,
    path: PathBuf,
}

impl StructuredSink {
    /// Open or create the database and make sure the table exists.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(1_000))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %path.display(), table = TABLE, "Structured sink ready");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<StoredSample>, SinkError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, speedKPH, rpm, batteryVoltage, batteryPercentage, windSpeed, temperature
             FROM boat_telemetry ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredSample {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                speed_kph: row.get(2)?,
                rpm: row.get(3)?,
                battery_voltage: row.get(4)?,
                battery_percentage: row.get(5)?,
                wind_speed: row.get(6)?,
                temperature: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl Recorder for StructuredSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    fn record(&mut self, sample: &Sample) -> Result<(), PersistenceError> {
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_SQL)
            .map_err(|e| PersistenceError::backend(SINK_NAME, e))?;
        stmt.execute(params![
            sample.timestamp_text(),
            sample.speed_kph,
            sample.rpm,
            sample.battery_voltage,
            sample.whole_battery_percent(),
            sample.wind_speed,
            sample.temperature,
        ])
        .map_err(|e| PersistenceError::backend(SINK_NAME, e))?;
        Ok(())
    }
}
