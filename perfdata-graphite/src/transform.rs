//! Reshaping of parsed render payloads into datasets.
//!
//! Graphite returns `value`, `warn` and `crit` as three unrelated series.
//! Both payload shapes end up in the same output: one [`Dataset`] per
//! metric whose timestamp axis comes from the `value` series, with the
//! `warn`/`crit` series aligned to that axis by timestamp.

use std::collections::HashMap;

use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

use perfdata_types::{Dataset, MetricRecord, MetricSeries, Response, SeriesKind};

use crate::parser::{parse_json, CsvRecords, Datapoint, RenderTarget};
use crate::GraphiteError;

/// Check command whose metric names are mount points.
const DISK_CHECK_COMMAND: &str = "disk";

/// Segment separating the query prefix from the metric name.
const PERFDATA_SEGMENT: &str = ".perfdata.";

/// A render payload as delivered by the client.
#[derive(Debug)]
pub enum RawPayload<R> {
    /// Complete JSON body.
    Json(Vec<u8>),
    /// Streaming CSV rows.
    Csv(CsvRecords<R>),
}

/// Display title for a metric name.
///
/// The disk check reports mount points, which the Graphite writer stored
/// with `/` turned into `_`; those are turned back into `/`.
pub fn display_title(metric: &str, check_command: &str) -> String {
    if check_command == DISK_CHECK_COMMAND {
        metric.replace('_', "/")
    } else {
        metric.to_string()
    }
}

/// Display title for a full render target path.
///
/// Drops a trailing `.value` and everything up to and including the last
/// `.perfdata.` segment, then applies [`display_title`].
pub fn title_from_target(target: &str, check_command: &str) -> String {
    let path = target.strip_suffix(".value").unwrap_or(target);
    let stem = match path.rfind(PERFDATA_SEGMENT) {
        Some(i) => &path[i + PERFDATA_SEGMENT.len()..],
        None => path,
    };
    display_title(stem, check_command)
}

/// Turn a decoded JSON render response into datasets.
///
/// Only non-empty targets ending in `.value` start a dataset; the matching
/// `.warn` and `.crit` targets are attached to it when present and non-empty.
pub fn transform_json(targets: &[RenderTarget], check_command: &str) -> Response {
    let by_name: HashMap<&str, &RenderTarget> = targets
        .iter()
        .rev()
        .map(|t| (t.target.as_str(), t))
        .collect();

    let mut data = Vec::new();

    for target in targets {
        let Some(stem) = target.target.strip_suffix(".value") else {
            continue;
        };
        // No value points, no timestamp axis.
        if target.datapoints.is_empty() {
            continue;
        }

        let sibling = |kind: SeriesKind| -> Option<Vec<(i64, Option<f64>)>> {
            by_name
                .get(format!("{}.{}", stem, kind.wire_name()).as_str())
                .filter(|t| !t.datapoints.is_empty())
                .map(|t| t.datapoints.iter().map(point).collect())
        };

        let columns = Columns {
            value: target.datapoints.iter().map(point).collect(),
            warn: sibling(SeriesKind::Warn),
            crit: sibling(SeriesKind::Crit),
        };

        data.push(columns.into_dataset(title_from_target(&target.target, check_command)));
    }

    debug!(datasets = data.len(), "transformed json render payload");
    Response::from_datasets(data)
}

/// Group flat records by metric and emit one dataset per requested metric.
///
/// `requested` defines both which metrics are emitted and their order; a
/// requested metric without `value` records is left out.
pub fn transform_records<I>(records: I, requested: &[String], check_command: &str) -> Response
where
    I: IntoIterator<Item = MetricRecord>,
{
    let mut table = SeriesTable::new(requested);
    for record in records {
        table.push(record);
    }
    table.finish(check_command)
}

/// Streaming variant of [`transform_records`] over CSV rows.
///
/// Consumes `rows`, so the body is released when the scan ends or fails.
pub async fn transform_csv<R>(
    mut rows: CsvRecords<R>,
    requested: &[String],
    check_command: &str,
) -> Result<Response, GraphiteError>
where
    R: AsyncBufRead + Unpin,
{
    let mut table = SeriesTable::new(requested);
    while let Some(record) = rows.next_record().await? {
        table.push(record);
    }

    if rows.skipped() > 0 {
        warn!(skipped = rows.skipped(), "skipped malformed render rows");
    }
    Ok(table.finish(check_command))
}

/// Transform whichever payload shape the client returned.
///
/// An unparseable JSON body is "nothing to show", not an error.
pub async fn transform_payload<R>(
    payload: RawPayload<R>,
    requested: &[String],
    check_command: &str,
) -> Result<Response, GraphiteError>
where
    R: AsyncBufRead + Unpin,
{
    match payload {
        RawPayload::Json(body) => match parse_json(&body) {
            Ok(targets) => Ok(transform_json(&targets, check_command)),
            Err(e) => {
                warn!(error = %e, "discarding unparseable render payload");
                Ok(Response::empty())
            }
        },
        RawPayload::Csv(rows) => transform_csv(rows, requested, check_command).await,
    }
}

fn point(p: &Datapoint) -> (i64, Option<f64>) {
    (p.timestamp(), p.value())
}

/// Points of one metric, split by series kind.
#[derive(Debug, Default)]
struct Columns {
    value: Vec<(i64, Option<f64>)>,
    warn: Option<Vec<(i64, Option<f64>)>>,
    crit: Option<Vec<(i64, Option<f64>)>>,
}

impl Columns {
    fn push(&mut self, record: MetricRecord) {
        let point = (record.timestamp, record.value);
        match record.kind {
            SeriesKind::Value => self.value.push(point),
            SeriesKind::Warn => self.warn.get_or_insert_with(Vec::new).push(point),
            SeriesKind::Crit => self.crit.get_or_insert_with(Vec::new).push(point),
        }
    }

    fn into_dataset(self, title: String) -> Dataset {
        let (timestamps, values): (Vec<i64>, Vec<Option<f64>>) = self.value.into_iter().unzip();

        let mut dataset = Dataset::new(title, timestamps);
        dataset.series.push(MetricSeries::new(SeriesKind::Value, values));

        for (kind, points) in [(SeriesKind::Warn, self.warn), (SeriesKind::Crit, self.crit)] {
            if let Some(points) = points {
                let values = align(&dataset.timestamps, &points);
                dataset.series.push(MetricSeries::new(kind, values));
            }
        }

        debug_assert!(dataset.is_aligned());
        dataset
    }
}

// Values of `points` at each timestamp of `axis`; missing points are gaps.
fn align(axis: &[i64], points: &[(i64, Option<f64>)]) -> Vec<Option<f64>> {
    let lookup: HashMap<i64, Option<f64>> = points.iter().copied().collect();
    axis.iter()
        .map(|ts| lookup.get(ts).copied().flatten())
        .collect()
}

/// Per-metric accumulator for the tabular path.
///
/// Only requested metrics are kept, so memory stays bounded by what will
/// actually be emitted.
struct SeriesTable<'a> {
    requested: &'a [String],
    columns: HashMap<String, Columns>,
}

impl<'a> SeriesTable<'a> {
    fn new(requested: &'a [String]) -> Self {
        Self {
            requested,
            columns: HashMap::new(),
        }
    }

    fn push(&mut self, record: MetricRecord) {
        if let Some(columns) = self.columns.get_mut(&record.metric) {
            columns.push(record);
        } else if self.requested.iter().any(|m| *m == record.metric) {
            self.columns
                .entry(record.metric.clone())
                .or_default()
                .push(record);
        }
    }

    fn finish(mut self, check_command: &str) -> Response {
        let mut data = Vec::new();
        for metric in self.requested {
            let Some(columns) = self.columns.remove(metric) else {
                continue;
            };
            if columns.value.is_empty() {
                continue;
            }
            data.push(columns.into_dataset(display_title(metric, check_command)));
        }
        debug!(datasets = data.len(), "transformed tabular render payload");
        Response::from_datasets(data)
    }
}
