//! Console rendering of run results.

use common::model::summary::{ImportSummary, RejectedRow};

const RULE: &str = "============";

pub fn render_summary(summary: &ImportSummary) -> String {
    let mut lines = vec![
        format!("Total processed rows: {}", summary.rows_processed),
        RULE.to_string(),
        format!("Total successful rows: {}", summary.rows_valid),
        RULE.to_string(),
        format!("Total error rows: {}", summary.rows_error),
        RULE.to_string(),
    ];
    if !summary.test_mode {
        lines.push(format!(
            "Inserted rows: {}, updated rows: {}",
            summary.rows_inserted, summary.rows_updated
        ));
    }
    if let Some(reason) = &summary.aborted {
        lines.push(format!("Import aborted: {reason}"));
    }
    terminate(lines)
}

/// Renders rejected rows as a plain text table: line, the file's own header
/// labels, then the rejection reason.
pub fn render_error_table(labels: &[String], rows: &[RejectedRow]) -> String {
    let mut header: Vec<String> = Vec::with_capacity(labels.len() + 2);
    header.push("line_id".to_string());
    header.extend(labels.iter().cloned());
    header.push("reason".to_string());

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(header.len());
            cells.push(row.line.to_string());
            for i in 0..labels.len() {
                cells.push(row.fields.get(i).cloned().unwrap_or_default());
            }
            cells.push(row.reason.clone());
            cells
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{separator}+");

    let mut lines = Vec::with_capacity(body.len() + 4);
    lines.push(separator.clone());
    lines.push(table_line(&header, &widths));
    lines.push(separator.clone());
    lines.extend(body.iter().map(|cells| table_line(cells, &widths)));
    lines.push(separator);
    terminate(lines)
}

fn table_line(cells: &[String], widths: &[usize]) -> String {
    let padded: String = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width - cell.chars().count();
            format!(" {}{} |", cell, " ".repeat(pad))
        })
        .collect();
    format!("|{padded}")
}

/// Joins `lines`, ending every one of them with a newline.
fn terminate(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
