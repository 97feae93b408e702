use std::fmt::Display;
use std::sync::LazyLock;
use std::time::Instant;

use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::table::{LinkCell, TaskRow, TaskTable};

const ANSI_BLUE: Style = Style::new().blue();

const HEADERS: [&str; 7] = [
    "id",
    "submitter",
    "target",
    "started",
    "progress",
    "finished",
    "asset",
];

pub(crate) static PROGRESS_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("Error setting progress bar template")
        .progress_chars("#>-")
});

pub(crate) fn step_bar(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(PROGRESS_STYLE.clone())
}

/// Blue `(+Nms)` suffix for timing log lines.
pub(crate) fn as_overhead(start: Instant) -> impl Display {
    let elapsed = start.elapsed().as_millis();
    ANSI_BLUE.apply_to(format!("(+{elapsed}ms)"))
}

fn row_cells(row: &TaskRow) -> [String; 7] {
    let text = |cell: &Option<LinkCell>| {
        cell.as_ref().map(|cell| cell.text.clone()).unwrap_or_default()
    };

    [
        row.id.clone(),
        text(&row.submitter),
        text(&row.target),
        row.start.display().unwrap_or_default().to_string(),
        row.progress.label.clone(),
        row.end.display().unwrap_or_default().to_string(),
        row.asset
            .as_ref()
            .map(|cell| cell.url.clone())
            .unwrap_or_default(),
    ]
}

/// Render the table as aligned, lightly styled text lines.
pub fn render_table(table: &TaskTable) -> String {
    let rows: Vec<[String; 7]> = table.rows().iter().map(row_cells).collect();

    let mut widths: [usize; 7] = HEADERS.map(str::len);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.len());
        }
    }

    let header = HEADERS
        .iter()
        .enumerate()
        .map(|(i, header)| format!("{header:<width$}", width = widths[i]))
        .collect::<Vec<_>>()
        .join("  ");

    let mut out = style(header).bold().to_string();
    out.push('\n');

    for (row, cells) in table.rows().iter().zip(&rows) {
        let line = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let padded = format!("{cell:<width$}", width = widths[i]);
                match i {
                    4 if row.progress.is_done() => style(padded).green().to_string(),
                    4 if row.progress.percent.is_none() => style(padded).dim().to_string(),
                    6 if !cell.is_empty() => style(padded).cyan().to_string(),
                    _ => padded,
                }
            })
            .collect::<Vec<_>>()
            .join("  ");

        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}
