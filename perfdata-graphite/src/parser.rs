//! Parsing of render API payloads into flat metric records.
//!
//! Two wire shapes are supported:
//!
//! - **JSON**: `[{"target": "...", "datapoints": [[value, timestamp], ...]}, ...]`,
//!   decoded in one go.
//! - **CSV**: `path,timestamp,value` rows, decoded one line at a time while
//!   the body is still streaming in.
//!
//! Malformed CSV rows are skipped, never fatal.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use perfdata_types::{MetricRecord, SeriesKind};

use crate::GraphiteError;

/// One `[value, timestamp]` pair of a JSON render target.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Datapoint(pub Option<f64>, pub i64);

impl Datapoint {
    pub fn value(&self) -> Option<f64> {
        self.0
    }

    pub fn timestamp(&self) -> i64 {
        self.1
    }
}

/// A single series of a JSON render response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderTarget {
    /// Full dotted path, e.g. `icinga2.web.host.hostalive.perfdata.rta.value`.
    pub target: String,
    #[serde(default)]
    pub datapoints: Vec<Datapoint>,
}

impl RenderTarget {
    /// Flatten this target into records. Empty if the path is not a
    /// `<metric>.<kind>` path.
    pub fn records(&self) -> impl Iterator<Item = MetricRecord> + '_ {
        let split = split_target(&self.target);
        self.datapoints.iter().filter_map(move |point| {
            let (metric, kind) = split?;
            Some(MetricRecord::new(kind, metric, point.timestamp(), point.value()))
        })
    }
}

/// Decode a JSON render response. A `null` body decodes to no targets.
pub fn parse_json(body: &[u8]) -> Result<Vec<RenderTarget>, GraphiteError> {
    let targets: Option<Vec<RenderTarget>> =
        serde_json::from_slice(body).map_err(|e| GraphiteError::Parse(e.to_string()))?;
    Ok(targets.unwrap_or_default())
}

/// Split a series path into its metric name and series kind, taken from
/// the last two path segments.
///
/// Returns `None` for paths with fewer than two segments or whose last
/// segment is not `value`, `warn` or `crit`.
pub fn split_target(path: &str) -> Option<(&str, SeriesKind)> {
    let (rest, kind) = path.rsplit_once('.')?;
    let kind = kind.parse().ok()?;
    let metric = rest.rsplit('.').next().unwrap_or(rest);
    if metric.is_empty() {
        return None;
    }
    Some((metric, kind))
}

/// Streaming reader of CSV render rows.
///
/// Owns the underlying reader; the HTTP body it wraps is released when
/// this value is dropped, whether the scan ran to the end, stopped on a
/// read error, or was abandoned half way.
#[derive(Debug)]
pub struct CsvRecords<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
}

impl<R> CsvRecords<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Next well-formed record, or `None` at the end of the body.
    ///
    /// Fails only when the body itself cannot be read.
    pub async fn next_record(&mut self) -> Result<Option<MetricRecord>, GraphiteError> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|e| GraphiteError::Connection(format!("reading render body: {}", e)))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            match parse_row(line) {
                Some(record) => return Ok(Some(record)),
                None => {
                    self.skipped += 1;
                    debug!(line = self.line_no, row = line, "skipping malformed render row");
                }
            }
        }
    }

    /// Number of non-blank rows skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Parse a single `path,timestamp,value` row.
pub fn parse_row(line: &str) -> Option<MetricRecord> {
    let fields = split_fields(line);
    let [path, timestamp, value] = fields.as_slice() else {
        return None;
    };

    let (metric, kind) = split_target(path)?;
    let timestamp = parse_timestamp(timestamp)?;
    let value = if value.is_empty() {
        None
    } else {
        Some(value.trim().parse::<f64>().ok()?)
    };

    Some(MetricRecord::new(kind, metric, timestamp, value))
}

// Graphite writes "YYYY-MM-DD HH:MM:SS" in the requested tz (we ask for UTC).
fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(epoch) = s.parse::<i64>() {
        return Some(epoch);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp())
}

// Comma separated fields; double quotes group a field and `""` inside
// quotes is a literal quote.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', _) => quoted = !quoted,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_target() {
        assert_eq!(
            split_target("icinga2.h.host.hostalive.perfdata.rta.value"),
            Some(("rta", SeriesKind::Value))
        );
        assert_eq!(split_target("load1.crit"), Some(("load1", SeriesKind::Crit)));
        assert_eq!(split_target("value"), None);
        assert_eq!(split_target("a.b.min"), None);
        assert_eq!(split_target(".warn"), None);
    }

    #[test]
    fn test_parse_json() {
        let body = br#"[
            {"target": "icinga2.h.host.hostalive.perfdata.rta.value", "datapoints": [[7, 1731848460], [null, 1731848520]]},
            {"target": "icinga2.h.host.hostalive.perfdata.rta.warn", "datapoints": [[3.5, 1731848460]]}
        ]"#;

        let targets = parse_json(body).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].datapoints[0], Datapoint(Some(7.0), 1731848460));
        assert_eq!(targets[0].datapoints[1].value(), None);

        let records: Vec<_> = targets.iter().flat_map(|t| t.records()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2], MetricRecord::new(SeriesKind::Warn, "rta", 1731848460, Some(3.5)));
    }

    #[test]
    fn test_parse_json_null_and_garbage() {
        assert!(parse_json(b"null").unwrap().is_empty());
        assert!(parse_json(b"[]").unwrap().is_empty());
        assert!(matches!(parse_json(b"<html>"), Err(GraphiteError::Parse(_))));
    }

    #[test]
    fn test_parse_row() {
        let record = parse_row("icinga2.h.services.load.load.perfdata.load1.value,2024-11-17 10:17:00,0.52")
            .unwrap();
        assert_eq!(record.kind, SeriesKind::Value);
        assert_eq!(record.metric, "load1");
        assert_eq!(record.timestamp, 1731838620);
        assert_eq!(record.value, Some(0.52));
    }

    #[test]
    fn test_parse_row_gap_and_quotes() {
        let record = parse_row(r#""a.b\,c.rta.crit","2024-11-17 10:17:00","""#).unwrap();
        assert_eq!(record.kind, SeriesKind::Crit);
        assert_eq!(record.value, None);

        let record = parse_row(r#""x,y.warn",1731838620,1"#).unwrap();
        assert_eq!(record.metric, "x,y");
        assert_eq!(record.timestamp, 1731838620);
    }

    #[test]
    fn test_parse_row_rejects_malformed() {
        assert!(parse_row("novalue,2024-11-17 10:17:00,1").is_none());
        assert!(parse_row("a.rta.value,yesterday,1").is_none());
        assert!(parse_row("a.rta.value,2024-11-17 10:17:00,abc").is_none());
        assert!(parse_row("a.rta.value,2024-11-17 10:17:00").is_none());
    }

    #[tokio::test]
    async fn test_csv_records_skip_noise() {
        let body = "\
a.rta.value,2024-11-17 10:17:00,7\r
garbage\r
\r
a.rta.value,2024-11-17 10:18:00,\r
";
        let mut rows = CsvRecords::new(body.as_bytes());

        let first = rows.next_record().await.unwrap().unwrap();
        assert_eq!(first.value, Some(7.0));

        let second = rows.next_record().await.unwrap().unwrap();
        assert_eq!(second.timestamp, 1731838680);
        assert_eq!(second.value, None);

        assert!(rows.next_record().await.unwrap().is_none());
        assert_eq!(rows.skipped(), 1);
    }
}
