//! Daily CSV log.
//!
//! One append-only file per calendar day, `<data_dir>/MM-DD-YYYY.csv`.
//! The header is written once, when the file is new or empty, so a
//! restart mid-day keeps appending to the same file without a second
//! header. The open handle rotates when a row's date differs from the
//! date of the open file.
//!
//! Logging is best-effort: a failed open or write drops the handle (the
//! next row reopens) and is reported to the caller, which keeps acquiring.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::{debug, info};

use crate::error::PersistenceError;
use crate::sensors::ChannelKind;

/// Exact column header of every daily file.
pub const CSV_HEADER: &str = "Time, Temp 1A [F], Temp 1B [F], Accel 1K_X [m/s^2], Accel1K_Y [m/s^2], Accel1K_Z [m/s^2], Pres 1U [psi], Temp 2A [F], Temp 2B [F], Accel 2K_X [m/s^2], Accel2K_Y [m/s^2], Accel2K_Z [m/s^2], Pres 2U [psi]";

/// One joined row: latest value of all twelve channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRow {
    pub at: NaiveDateTime,
    /// `[facility 1, facility 2]`, each in [`ChannelKind`] order.
    pub values: [[f64; ChannelKind::COUNT]; 2],
}

impl LogRow {
    fn record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(1 + 2 * ChannelKind::COUNT);
        record.push(format_time(self.at));
        record.extend(self.values.iter().flatten().map(|v| format!("{v:.2}")));
        record
    }
}

/// `HH:MM:SS.ss` (centiseconds).
pub fn format_time(at: NaiveDateTime) -> String {
    let centis = at.nanosecond() % 1_000_000_000 / 10_000_000;
    format!("{}.{:02}", at.format("%H:%M:%S"), centis)
}

/// `MM-DD-YYYY.csv` inside `dir`.
pub fn daily_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.csv", date.format("%m-%d-%Y")))
}

struct OpenLog {
    date: NaiveDate,
    path: PathBuf,
    writer: csv::Writer<File>,
}

/// Append target for the current day.
pub struct DailyLog {
    dir: PathBuf,
    open: Option<OpenLog>,
    rows_written: u64,
}

impl DailyLog {
    /// Nothing is opened until the first row.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open: None,
            rows_written: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the currently open file, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.open.as_ref().map(|o| o.path.as_path())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append one row, rotating to the row's date first if needed.
    pub fn append_row(&mut self, row: &LogRow) -> Result<(), PersistenceError> {
        let date = row.at.date();
        if self.open.as_ref().is_none_or(|o| o.date != date) {
            self.rotate(date)?;
        }

        let result = self.write_record(row);
        if result.is_err() {
            // Reopen on the next row.
            self.open = None;
        } else {
            self.rows_written += 1;
        }
        result
    }

    /// Flush and close the open file.
    pub fn close(&mut self) {
        if let Some(mut open) = self.open.take() {
            if let Err(e) = open.writer.flush() {
                debug!("CSV: flush on close failed: {}", e);
            }
        }
    }

    fn write_record(&mut self, row: &LogRow) -> Result<(), PersistenceError> {
        let Some(open) = self.open.as_mut() else {
            return Err(PersistenceError::Open(io::ErrorKind::NotFound));
        };
        open.writer.write_record(row.record())?;
        open.writer
            .flush()
            .map_err(|e| PersistenceError::Write(e.kind()))
    }

    fn rotate(&mut self, date: NaiveDate) -> Result<(), PersistenceError> {
        self.close();

        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::Open(e.kind()))?;
        let path = daily_path(&self.dir, date);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PersistenceError::Open(e.kind()))?;

        let len = file
            .metadata()
            .map_err(|e| PersistenceError::Open(e.kind()))?
            .len();
        if len == 0 {
            writeln!(file, "{CSV_HEADER}").map_err(|e| PersistenceError::Write(e.kind()))?;
            info!("CSV: started {}", path.display());
        } else {
            info!("CSV: appending to {}", path.display());
        }

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        self.open = Some(OpenLog { date, path, writer });
        Ok(())
    }
}

impl Drop for DailyLog {
    fn drop(&mut self) {
        self.close();
    }
}
