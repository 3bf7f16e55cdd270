//! Ingestion progress reporting.
//!
//! Progress goes to **stderr** so the stdout summary of `qlab ingest` stays
//! parseable for scripts.

use std::io::Write;

/// A single progress event emitted by the ingest pipeline.
#[derive(Clone, Debug)]
pub enum IngestProgressEvent {
    /// Connector is listing files; total unknown.
    Scanning { connector: String },
    /// One file has been handled.
    Document {
        connector: String,
        n: u64,
        total: u64,
        filename: String,
        status: &'static str,
    },
}

pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly lines: `ingest filesystem  12 / 1,040  FOMCpresconf20180613.json  inserted`.
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Scanning { connector } => {
                format!("ingest {}  scanning...\n", connector)
            }
            IngestProgressEvent::Document {
                connector,
                n,
                total,
                filename,
                status,
            } => format!(
                "ingest {}  {} / {}  {}  {}\n",
                connector,
                format_number(*n),
                format_number(*total),
                filename,
                status
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = match &event {
            IngestProgressEvent::Scanning { connector } => serde_json::json!({
                "event": "progress",
                "connector": connector,
                "phase": "scanning"
            }),
            IngestProgressEvent::Document {
                connector,
                n,
                total,
                filename,
                status,
            } => serde_json::json!({
                "event": "progress",
                "connector": connector,
                "phase": "ingesting",
                "n": n,
                "total": total,
                "filename": filename,
                "status": status
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_345), "12,345");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
