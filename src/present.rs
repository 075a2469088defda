//! Display formatting for summaries and raw tables.
//!
//! Metric cells are shown with at least two decimal places: a value whose
//! literal form has fewer than two decimals is padded (`87` -> `87.00`,
//! `1.5` -> `1.50`), anything with two or more is left untouched. Cells that
//! are not plain decimal literals (preserved scientific notation, free text)
//! are shown exactly as stored. Identifier cells are literal text and `NULL`
//! is an empty string.

use std::fmt::Write as _;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{aggregate::Summary, data::CellValue, store::ResultSet, table};

const MIN_METRIC_SCALE: u32 = 2;
const PAGE_TEMPLATE: &str = include_str!("../templates/index.html");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DisplayTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_text(&self) -> String {
        table::render_table(&self.headers, &self.rows)
    }

    /// HTML `<table>` fragment; empty when there are no columns at all.
    pub fn to_html(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }
        let mut html = String::from("<table><thead><tr>");
        for header in &self.headers {
            let _ = write!(html, "<th>{}</th>", escape_html(header));
        }
        html.push_str("</tr></thead><tbody>");
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                let _ = write!(html, "<td>{}</td>", escape_html(cell));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");
        html
    }
}

/// Pads a decimal literal to two decimal places when it has fewer.
pub fn format_metric_literal(literal: &str) -> String {
    let plain = !literal.is_empty()
        && literal
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));
    if !plain {
        return literal.to_string();
    }
    match Decimal::from_str(literal) {
        Ok(mut value) if value.scale() < MIN_METRIC_SCALE => {
            value.rescale(MIN_METRIC_SCALE);
            value.to_string()
        }
        _ => literal.to_string(),
    }
}

pub fn format_metric(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        other => format_metric_literal(&other.as_display()),
    }
}

fn format_row(cells: &[CellValue], metric_start: usize) -> Vec<String> {
    cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            if idx >= metric_start {
                format_metric(cell)
            } else {
                cell.as_display()
            }
        })
        .collect()
}

pub fn summary_table(summary: &Summary) -> DisplayTable {
    DisplayTable {
        headers: summary.headers.clone(),
        rows: summary
            .rows
            .iter()
            .map(|row| format_row(row, summary.identifier_count))
            .collect(),
    }
}

/// Formats a raw `SELECT *` result whose metric columns start at
/// `metric_start`.
pub fn raw_table(result: &ResultSet, metric_start: usize) -> DisplayTable {
    DisplayTable {
        headers: result.headers.clone(),
        rows: result
            .rows
            .iter()
            .map(|row| format_row(row, metric_start))
            .collect(),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Embeds a table fragment and an optional notice into the page template.
pub fn render_page(title: &str, table_html: &str, notice: Option<&str>) -> String {
    let notice_html = notice
        .map(|text| format!("<p class=\"notice\">{}</p>", escape_html(text)))
        .unwrap_or_default();
    PAGE_TEMPLATE
        .replace("{{ title }}", &escape_html(title))
        .replace("{{ notice }}", &notice_html)
        .replace("{{ table }}", table_html)
}
