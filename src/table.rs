use std::borrow::Cow;
use std::fmt::Write as _;

const COLUMN_GAP: &str = "  ";

/// Renders rows under a header line and a dashed rule, padding each column
/// to its widest cell. Cells beyond the header count are dropped.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count().max(1))
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(flatten(cell).chars().count());
        }
    }

    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let mut output = String::new();
    let _ = writeln!(output, "{}", render_line(headers, &widths));
    let _ = writeln!(output, "{}", render_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", render_line(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str(COLUMN_GAP);
        }
        let text = flatten(cell);
        line.push_str(&text);
        let padding = width.saturating_sub(text.chars().count());
        line.extend(std::iter::repeat(' ').take(padding));
    }
    line.truncate(line.trim_end().len());
    line
}

/// Keeps multi-line text cells on one terminal row.
fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
