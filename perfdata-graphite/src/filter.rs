//! Include/exclude filtering of discovered metric names.

use glob::Pattern;
use tracing::warn;

/// Upper bound on the number of metrics rendered per request.
///
/// Every metric adds three series to the render payload, so discovery
/// results are truncated to this many names after filtering.
pub const MAX_METRICS: usize = 10;

/// Shell-style glob filter over metric names.
///
/// `*` matches any run of characters and `?` a single character.
/// A pattern that fails to compile is matched literally.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl MetricFilter {
    /// Compile the include and exclude pattern lists.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Self {
        Self {
            include: compile(include),
            exclude: compile(exclude),
        }
    }

    /// Check whether a single name passes both passes of the filter.
    pub fn matches(&self, name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| p.matches(name));
        included && !self.exclude.iter().any(|p| p.matches(name))
    }

    /// Keep the names that pass the filter, preserving input order.
    pub fn apply<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(Into::into)
            .filter(|name| self.matches(name))
            .collect()
    }
}

/// Filter `names` through include then exclude patterns.
pub fn filter_metrics<S: AsRef<str>>(names: &[S], include: &[S], exclude: &[S]) -> Vec<String> {
    MetricFilter::new(include, exclude).apply(names.iter().map(|n| n.as_ref().to_string()))
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Vec<Pattern> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Pattern::new(p).unwrap_or_else(|e| {
                warn!(pattern = p, error = %e, "invalid metric pattern, matching literally");
                // Escaped patterns always compile.
                Pattern::new(&Pattern::escape(p)).unwrap_or_default()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_and_exclude() {
        let names = ["foo", "bar", "foobar", "barfoo", "uptime", "excludeme"];
        let actual = filter_metrics(&names, &["uptime", "foo*"], &["bar*", "excludeme"]);
        assert_eq!(actual, vec!["foo", "foobar", "uptime"]);
    }

    #[test]
    fn test_exclude_only() {
        let names = ["exclude", "include", "excludealso", "removeme"];
        let actual = filter_metrics(&names, &[], &["exclude*", "removeme"]);
        assert_eq!(actual, vec!["include"]);
    }

    #[test]
    fn test_no_patterns_keeps_everything() {
        let names = ["rta", "pl"];
        let none: [&str; 0] = [];
        assert_eq!(filter_metrics(&names, &none, &none), vec!["rta", "pl"]);
    }

    #[test]
    fn test_no_matches_is_empty() {
        let names = ["rta", "pl"];
        assert!(filter_metrics(&names, &["load*"], &[]).is_empty());
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let names = ["load1", "load5", "load15"];
        assert_eq!(filter_metrics(&names, &["load?"], &[]), vec!["load1", "load5"]);
    }

    #[test]
    fn test_excluded_cannot_be_reincluded() {
        let filter = MetricFilter::new(&["rta"], &["rta"]);
        assert!(!filter.matches("rta"));
    }

    #[test]
    fn test_invalid_pattern_matches_literally() {
        let filter = MetricFilter::new(&["[oops"], &[]);
        assert!(filter.matches("[oops"));
        assert!(!filter.matches("oops"));
    }
}
