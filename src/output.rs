//! Result rendering for the CLI: aligned text tables or JSON.

use std::collections::BTreeSet;

use strum_macros::{Display, EnumString};

use crate::engine::Outcome;
use crate::storage::Row;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Format {
    Text,
    Json,
}

pub fn render(outcome: &Outcome, format: Format) -> String {
    match format {
        Format::Text => render_text(outcome),
        Format::Json => render_json(outcome),
    }
}

fn render_text(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Created | Outcome::Inserted => "ok".to_string(),
        Outcome::Dropped => "ok".to_string(),
        Outcome::Affected(n) => format!("{n} row(s) affected"),
        Outcome::Tables(names) => names.join("\n"),
        Outcome::Rows(rows) => render_table(rows),
    }
}

/// Field order inside a row is not significant, so the header takes the
/// sorted union of keys across all rows.
fn render_table(rows: &[Row]) -> String {
    if rows.is_empty() {
        return "(0 rows)".to_string();
    }
    let header: Vec<&str> = rows
        .iter()
        .flat_map(|row| row.keys())
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|col| row.get(*col).unwrap_or(&Value::Null).to_string())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|row| row[i].len())
                .chain([col.len()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let fmt_line = |fields: Vec<String>| {
        fields
            .iter()
            .zip(&widths)
            .map(|(field, &width)| format!("{field:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    out.push_str(&fmt_line(
        header.iter().map(|c| c.to_string()).collect(),
    ));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in cells {
        out.push('\n');
        out.push_str(&fmt_line(row));
    }
    out.push_str(&format!("\n({} rows)", rows.len()));
    out
}

fn render_json(outcome: &Outcome) -> String {
    let value = match outcome {
        Outcome::Created | Outcome::Inserted | Outcome::Dropped => {
            serde_json::json!({"status": "ok"})
        }
        Outcome::Affected(n) => serde_json::json!({"affected": n}),
        Outcome::Tables(names) => serde_json::json!(names),
        Outcome::Rows(rows) => serde_json::json!(rows),
    };
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "null".to_string())
}
