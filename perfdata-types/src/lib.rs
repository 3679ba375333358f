//! # perfdata-types
//!
//! Core types for chart-ready performance data. A metrics backend returns
//! loosely shaped series; this crate defines the normalized shape a renderer
//! consumes: one [`Dataset`] per metric, each holding a shared timestamp axis
//! and index-aligned `value`/`warning`/`critical` series.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for the JSON contract
//! - **Aligned by construction**: A dataset rejects series whose length differs from its axis
//!
//! ## Example
//!
//! ```rust
//! use perfdata_types::{Dataset, Response, SeriesKind};
//!
//! let dataset = Dataset::new("rta", vec![1731848460, 1731848520])
//!     .with_series(SeriesKind::Value, vec![Some(7.0), None])
//!     .unwrap()
//!     .with_series(SeriesKind::Warn, vec![Some(3.0), None])
//!     .unwrap();
//!
//! let response = Response::from_datasets(vec![dataset]);
//! assert!(response.is_ok());
//! assert_eq!(response.data[0].series.len(), 2);
//! ```
//!
//! ## Wire Shape
//!
//! With the `serde` feature a [`Response`] serializes as
//! `{"errors": [..], "data": [{"title", "unit", "timestamps", "series": [{"name", "values"}]}]}`.

mod dataset;
mod record;
mod response;

pub use dataset::*;
pub use record::*;
pub use response::*;
