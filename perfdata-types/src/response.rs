//! Response - what a perfdata source hands to the renderer.

use crate::Dataset;

/// The result of one perfdata request.
///
/// A response carrying errors is incomplete by convention: the pipeline
/// stops at the first transport or configuration failure, so `data` is
/// empty in that case. Consumers must check [`Response::is_ok`] before
/// using `data`. An empty `data` with no errors means "nothing to show".
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    /// Terminal errors encountered while answering the request.
    #[cfg_attr(feature = "serde", serde(default))]
    pub errors: Vec<String>,

    /// One dataset per metric, in output order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub data: Vec<Dataset>,
}

impl Response {
    /// An empty, successful response.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A successful response with the given datasets.
    pub fn from_datasets(data: Vec<Dataset>) -> Self {
        Self {
            errors: Vec::new(),
            data,
        }
    }

    /// A failed response carrying a single error.
    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
            data: Vec::new(),
        }
    }

    /// Check if the request completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Find a dataset by title.
    pub fn get(&self, title: &str) -> Option<&Dataset> {
        self.data.iter().find(|d| d.title == title)
    }
}
