//! Flat records as parsed from a backend payload.

use core::fmt;
use core::str::FromStr;

/// The three series tracked per metric.
///
/// On the backend a series kind is the last path segment (`value`, `warn`,
/// `crit`); in the rendered output it is named `value`, `warning` or
/// `critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SeriesKind {
    #[cfg_attr(feature = "serde", serde(rename = "value"))]
    Value,
    #[cfg_attr(feature = "serde", serde(rename = "warning"))]
    Warn,
    #[cfg_attr(feature = "serde", serde(rename = "critical"))]
    Crit,
}

impl SeriesKind {
    /// All kinds, in dataset insertion order.
    pub const ALL: [SeriesKind; 3] = [SeriesKind::Value, SeriesKind::Warn, SeriesKind::Crit];

    /// Path segment used by the backend.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            SeriesKind::Value => "value",
            SeriesKind::Warn => "warn",
            SeriesKind::Crit => "crit",
        }
    }

    /// Name used for the series in a rendered dataset.
    pub const fn series_name(&self) -> &'static str {
        match self {
            SeriesKind::Value => "value",
            SeriesKind::Warn => "warning",
            SeriesKind::Crit => "critical",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.series_name())
    }
}

/// Error returned when a path segment is not a known series kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSeriesKind(pub String);

impl fmt::Display for UnknownSeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown series kind: {}", self.0)
    }
}

impl std::error::Error for UnknownSeriesKind {}

impl FromStr for SeriesKind {
    type Err = UnknownSeriesKind;

    /// Parses the backend segment name (`value`, `warn`, `crit`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(SeriesKind::Value),
            "warn" => Ok(SeriesKind::Warn),
            "crit" => Ok(SeriesKind::Crit),
            other => Err(UnknownSeriesKind(other.to_string())),
        }
    }
}

/// A single datapoint of a single series, as parsed from the backend.
///
/// `value` is `None` when the backend reported a gap; a gap is not zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricRecord {
    /// Which series this point belongs to.
    pub kind: SeriesKind,

    /// Metric name, e.g. `rta` or `load1`.
    pub metric: String,

    /// Unix timestamp in seconds.
    pub timestamp: i64,

    /// Measured value, `None` for a gap.
    pub value: Option<f64>,
}

impl MetricRecord {
    /// Create a new record.
    pub fn new(kind: SeriesKind, metric: impl Into<String>, timestamp: i64, value: Option<f64>) -> Self {
        Self {
            kind,
            metric: metric.into(),
            timestamp,
            value,
        }
    }
}
