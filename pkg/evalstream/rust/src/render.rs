// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Plain text rendering of a snapshot.

use std::fmt::Write;

use crate::dataset::DataSet;

const TIME_HEADER: &str = "time";
const MISSING: &str = "-";

/// Render the last `rows` lines of `data` as an aligned table.
pub fn render_table(data: &DataSet, rows: usize) -> String {
    let skip = data.len().saturating_sub(rows);
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(data.len() - skip + 1);

    let mut header = Vec::with_capacity(data.headers().len() + 1);
    header.push(TIME_HEADER.to_string());
    header.extend(data.headers().iter().cloned());
    cells.push(header);

    for line in &data.lines()[skip..] {
        let mut row = Vec::with_capacity(data.headers().len() + 1);
        row.push(line.timestamp.format("%Y-%m-%d %H:%M:%S").to_string());
        for h in data.headers() {
            row.push(match line.values.get(h) {
                Some(v) => format_value(*v),
                None => MISSING.to_string(),
            });
        }
        cells.push(row);
    }

    let mut widths = vec![0; cells[0].len()];
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in &cells {
        let mut line = String::new();
        for (i, (cell, w)) in row.iter().zip(widths.iter().copied()).enumerate() {
            if i == 0 {
                let _ = write!(line, "{cell:<w$}");
            } else {
                let _ = write!(line, "  {cell:>w$}");
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn format_value(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}
