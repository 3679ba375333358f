//! Datasets - one metric's timestamp axis plus its aligned series.

use std::fmt;

use crate::SeriesKind;

/// A named sequence of values, index-aligned to its dataset's timestamps.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricSeries {
    /// `value`, `warning` or `critical`.
    pub name: SeriesKind,

    /// One entry per timestamp of the owning dataset; `None` is a gap.
    pub values: Vec<Option<f64>>,
}

impl MetricSeries {
    /// Create a new series.
    pub fn new(name: SeriesKind, values: Vec<Option<f64>>) -> Self {
        Self { name, values }
    }

    /// Number of points in the series.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series has no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Returned when a series does not match the dataset's timestamp axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLengthMismatch {
    pub series: SeriesKind,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for SeriesLengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "series '{}' has {} values, dataset has {} timestamps",
            self.series, self.actual, self.expected
        )
    }
}

impl std::error::Error for SeriesLengthMismatch {}

/// One chart: a metric's timestamps and its value/warning/critical series.
///
/// Series are stored in insertion order, which by convention is value,
/// then warning, then critical. Each is present only if the backend
/// supplied it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dataset {
    /// Display title derived from the metric name.
    pub title: String,

    /// Unit of the values. Empty when the backend does not report one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub unit: String,

    /// Unix timestamps in seconds, ascending as delivered by the backend.
    pub timestamps: Vec<i64>,

    /// Series aligned to `timestamps`.
    pub series: Vec<MetricSeries>,
}

impl Dataset {
    /// Create a dataset with a timestamp axis and no series.
    pub fn new(title: impl Into<String>, timestamps: Vec<i64>) -> Self {
        Self {
            title: title.into(),
            unit: String::new(),
            timestamps,
            series: Vec::new(),
        }
    }

    /// Append a series, checking it against the timestamp axis.
    pub fn push_series(&mut self, series: MetricSeries) -> Result<(), SeriesLengthMismatch> {
        if series.len() != self.timestamps.len() {
            return Err(SeriesLengthMismatch {
                series: series.name,
                expected: self.timestamps.len(),
                actual: series.len(),
            });
        }
        self.series.push(series);
        Ok(())
    }

    /// Builder-style variant of [`Dataset::push_series`].
    pub fn with_series(
        mut self,
        kind: SeriesKind,
        values: Vec<Option<f64>>,
    ) -> Result<Self, SeriesLengthMismatch> {
        self.push_series(MetricSeries::new(kind, values))?;
        Ok(self)
    }

    /// Get a series by kind.
    pub fn get(&self, kind: SeriesKind) -> Option<&MetricSeries> {
        self.series.iter().find(|s| s.name == kind)
    }

    /// Number of points on the timestamp axis.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the dataset has no points.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Check that every series has exactly one value per timestamp.
    pub fn is_aligned(&self) -> bool {
        self.series.iter().all(|s| s.len() == self.timestamps.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_series_in_insertion_order() {
        let dataset = Dataset::new("pl", vec![1, 2, 3])
            .with_series(SeriesKind::Value, vec![Some(0.0), Some(0.0), None])
            .unwrap()
            .with_series(SeriesKind::Crit, vec![Some(100.0), Some(100.0), None])
            .unwrap();

        let names: Vec<_> = dataset.series.iter().map(|s| s.name).collect();
        assert_eq!(names, vec![SeriesKind::Value, SeriesKind::Crit]);
        assert!(dataset.get(SeriesKind::Warn).is_none());
        assert!(dataset.is_aligned());
        assert_eq!(dataset.unit, "");
    }

    #[test]
    fn test_rejects_misaligned_series() {
        let err = Dataset::new("rta", vec![1, 2])
            .with_series(SeriesKind::Value, vec![Some(1.0)])
            .unwrap_err();

        assert_eq!(err.expected, 2);
        assert_eq!(err.actual, 1);
        assert_eq!(err.series, SeriesKind::Value);
        assert!(err.to_string().contains("'value'"));
    }

    #[test]
    fn test_empty_dataset_is_aligned() {
        let dataset = Dataset::new("empty", Vec::new());
        assert!(dataset.is_empty());
        assert!(dataset.is_aligned());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serializes_renderer_shape() {
        let dataset = Dataset::new("rta", vec![1731848460, 1731848520])
            .with_series(SeriesKind::Value, vec![Some(7.0), None])
            .unwrap();

        let json = serde_json::to_string(&dataset).unwrap();
        assert_eq!(
            json,
            r#"{"title":"rta","unit":"","timestamps":[1731848460,1731848520],"series":[{"name":"value","values":[7.0,null]}]}"#
        );
    }
}
