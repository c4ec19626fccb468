use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::io::config::LoggerConfig;

/// One row of the results log. Fields that do not apply to an event are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub event: String,
    pub actual_tre: Option<f64>,
    pub fre: Option<f64>,
    pub expected_tre: Option<f64>,
    pub expected_fre: Option<f64>,
    pub mean_fle: Option<f64>,
    pub no_fids: Option<usize>,
    pub state: Option<String>,
    pub score: Option<f64>,
}

/// CSV log of registration results and game scores.
///
/// Without a logger configuration every call is a no-op.
pub struct ResultLogger {
    writer: Option<Writer<File>>,
}

impl ResultLogger {
    pub fn disabled() -> Self {
        ResultLogger { writer: None }
    }

    pub fn new(config: Option<&LoggerConfig>) -> Result<Self> {
        let Some(config) = config else {
            return Ok(Self::disabled());
        };

        let path = &config.log_file_name;
        let file = if config.overwrite_existing {
            File::create(path)
        } else {
            OpenOptions::new().create(true).append(true).open(path)
        }
        .with_context(|| format!("failed to open log file {:?}", path))?;

        let needs_header = file
            .metadata()
            .with_context(|| format!("failed to stat log file {:?}", path))?
            .len()
            == 0;

        let writer = WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        log::info!("logging registration results to {:?}", path);
        Ok(ResultLogger {
            writer: Some(writer),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    fn write(&mut self, record: &LogRecord) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .serialize(record)
                .context("failed to write log record")?;
            writer.flush().context("failed to flush log file")?;
        }
        Ok(())
    }

    pub fn log_result(
        &mut self,
        actual_tre: f64,
        fre: f64,
        expected_tre: f64,
        expected_fre: f64,
        mean_fle: f64,
        no_fids: usize,
    ) -> Result<()> {
        self.write(&LogRecord {
            event: "registration".to_string(),
            actual_tre: Some(actual_tre),
            fre: Some(fre),
            expected_tre: Some(expected_tre),
            expected_fre: Some(expected_fre),
            mean_fle: Some(mean_fle),
            no_fids: Some(no_fids),
            ..LogRecord::default()
        })
    }

    pub fn log_score(&mut self, state: &str, score: f64) -> Result<()> {
        self.write(&LogRecord {
            event: "score".to_string(),
            state: Some(state.to_string()),
            score: Some(score),
            ..LogRecord::default()
        })
    }
}

/// Reads every record of a results log written by [`ResultLogger`].
pub fn read_log<P: AsRef<Path>>(path: P) -> Result<Vec<LogRecord>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open log file {:?}", path))?;
    rdr.deserialize::<LogRecord>()
        .enumerate()
        .map(|(i, record)| {
            record.with_context(|| format!("bad record {} in log file {:?}", i + 1, path))
        })
        .collect()
}
