use std::borrow::Cow;
use std::fmt::Write as _;

use crate::identifier::is_script_char;

const MIN_COLUMN_WIDTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Renders an elastic text table with every column left-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    render_aligned(headers, rows, &[])
}

/// Renders an elastic text table; columns without an entry in `aligns`
/// default to left alignment. Cells beyond the header count are dropped.
pub fn render_aligned(headers: &[String], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let widths = column_widths(headers, rows);
    let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();

    let mut output = String::new();
    push_line(&mut output, headers, &widths, &[]);
    push_line(&mut output, &rule, &widths, &[]);
    for row in rows {
        push_line(&mut output, row, &widths, aligns);
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = vec![MIN_COLUMN_WIDTH; headers.len()];
    for cells in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)) {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(display_width(&sanitize_cell(cell)));
        }
    }
    widths
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize], aligns: &[Align]) {
    let mut line = String::new();
    for (idx, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let text = sanitize_cell(cell);
        let fill = " ".repeat(width.saturating_sub(display_width(&text)));
        match aligns.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => {
                line.push_str(&text);
                line.push_str(&fill);
            }
            Align::Right => {
                line.push_str(&fill);
                line.push_str(&text);
            }
        }
    }
    let _ = writeln!(output, "{}", line.trim_end_matches(' '));
}

/// Terminal cell width: ANSI escapes take no space, CJK ideographs and
/// full-width forms take two columns.
pub fn display_width(value: &str) -> usize {
    let mut in_escape = false;
    value
        .chars()
        .map(|ch| match ch {
            '\u{1b}' => {
                in_escape = true;
                0
            }
            'm' if in_escape => {
                in_escape = false;
                0
            }
            _ if in_escape => 0,
            _ if is_wide(ch) => 2,
            _ => 1,
        })
        .sum()
}

fn is_wide(ch: char) -> bool {
    is_script_char(ch)
        || matches!(ch, '\u{3000}'..='\u{303F}' | '\u{FF01}'..='\u{FF60}' | '\u{FFE0}'..='\u{FFE6}')
}

/// Control whitespace would break the row layout.
fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        value.replace(['\n', '\r', '\t'], " ").into()
    } else {
        value.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn cjk_cells_count_double_width() {
        assert_eq!(display_width("准确率"), 6);
        assert_eq!(display_width("acc（%）"), 8);
        assert_eq!(display_width("\u{1b}[31mred\u{1b}[0m"), 3);
    }

    #[test]
    fn columns_are_padded_to_widest_cell() {
        let rendered = render_aligned(
            &strings(&["数据集", "score"]),
            &[strings(&["a", "87.00"]), strings(&["bb", "5.50"])],
            &[Align::Left, Align::Right],
        );
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "数据集  score");
        assert_eq!(lines[1], "------  -----");
        assert_eq!(lines[2], "a       87.00");
        assert_eq!(lines[3], "bb       5.50");
    }

    #[test]
    fn narrow_columns_keep_rule_aligned() {
        let rendered = render_table(&strings(&["a", "b"]), &[strings(&["x", "y\nz"])]);
        assert_eq!(rendered, "a    b\n---  ---\nx    y z\n");
    }
}
