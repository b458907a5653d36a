//! Terminal output utilities: colored notes and table rendering.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

/// A left-aligned table column.
pub struct Column {
    pub header: String,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self { header: header.into() }
    }
}

/// Width in terminal cells, counting chars rather than bytes so Devanagari
/// and Tamil names do not blow out the columns.
fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/// Render a table with given columns and rows.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| visible_width(&c.header)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(cell));
        }
    }

    let render_row = |cells: Vec<String>| format!("  {}  \n", cells.join("  "));

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad_cell(&col.header, *w))
        .collect();
    out.push_str(&format!("{BOLD}{}{RESET}", render_row(header)));
    out.push_str(&render_row(widths.iter().map(|w| "-".repeat(*w)).collect()));

    for row in rows {
        let cells = widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad_cell(row.get(i).map(String::as_str).unwrap_or(""), *w))
            .collect();
        out.push_str(&render_row(cells));
    }
    out
}

fn pad_cell(s: &str, width: usize) -> String {
    format!("{s}{}", " ".repeat(width.saturating_sub(visible_width(s))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_ansi() {
        let colored = format!("{GREEN}hello{RESET}");
        assert_eq!(strip_ansi(&colored), "hello");
    }

    #[test]
    fn renders_dose_table() {
        let cols = [Column::left("Medicine"), Column::left("When")];
        let rows = vec![
            vec!["Amoxicillin".to_string(), "Morning, Afternoon, Night".to_string()],
            vec!["पैन 40".to_string(), "Morning".to_string()],
        ];
        let table = render_table(&cols, &rows);
        assert!(table.contains("Amoxicillin"));
        assert!(table.contains("Morning, Afternoon, Night"));
    }

    #[test]
    fn pads_by_chars_not_bytes() {
        assert_eq!(pad_cell("दवा", 5), "दवा  ");
    }
}
