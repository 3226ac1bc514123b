//! Output formatting: JSON, YAML, table.
//!
//! Renders data in the format selected by `--output`. Structured formats
//! go through serde; table uses `tabled` rows or a pre-formatted detail view.

use std::io::{self, Write};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single item. `detail_fn` provides the table view.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
    }
}

/// Render a single item whose table view is one `Tabled` row.
pub fn render_row<T, R>(
    format: OutputFormat,
    data: &T,
    to_row: impl Fn(&T) -> R,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    render_single(format, data, |d| render_table(&[to_row(d)]))
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Sample {
        vm: &'static str,
        changed: bool,
    }

    #[derive(Tabled)]
    struct SampleRow {
        #[tabled(rename = "VM")]
        vm: String,
    }

    fn sample() -> Sample {
        Sample {
            vm: "web-01",
            changed: true,
        }
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_single(OutputFormat::JsonCompact, &sample(), |_| String::new()).unwrap();
        assert_eq!(out, r#"{"vm":"web-01","changed":true}"#);
    }

    #[test]
    fn pretty_json_parses_back() {
        let out = render_single(OutputFormat::Json, &sample(), |_| String::new()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, json!({ "vm": "web-01", "changed": true }));
    }

    #[test]
    fn yaml_uses_field_names() {
        let out = render_single(OutputFormat::Yaml, &sample(), |_| String::new()).unwrap();
        assert!(out.contains("vm: web-01"));
        assert!(out.contains("changed: true"));
    }

    #[test]
    fn table_row_has_header_and_value() {
        let out = render_row(OutputFormat::Table, &sample(), |s| SampleRow {
            vm: s.vm.into(),
        })
        .unwrap();
        assert!(out.contains("VM"));
        assert!(out.contains("web-01"));
    }
}
