//! Printing responses and validation reports.

use std::io::Write;

use anyhow::Result;
use perfdata_graphite::ValidationReport;
use perfdata_types::Response;

/// Write `response` as one JSON document followed by a newline.
pub fn write_response<W: Write>(out: &mut W, response: &Response, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, response)?;
    } else {
        serde_json::to_writer(&mut *out, response)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Write a validation report as plain text, one line per output entry.
pub fn write_report<W: Write>(out: &mut W, backend: &str, report: &ValidationReport) -> Result<()> {
    let verdict = if report.ok { "OK" } else { "FAILED" };
    writeln!(out, "{} backend: {}", backend, verdict)?;
    for line in &report.output {
        writeln!(out, "  {}", line)?;
    }
    if let Some(error) = &report.error {
        writeln!(out, "  error: {}", error)?;
    }
    Ok(())
}
