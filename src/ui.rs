use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Tables
// ============================================================================

/// Print rows under bold headers, columns padded to the widest cell
pub fn table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) {
    print!("{}", render_table(headers, rows, true));
}

fn render_table<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>], styled: bool) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.as_ref().chars().count());
        }
    }

    let mut out = String::new();
    let head = pad_line(headers, &widths);
    if styled {
        out.push_str(&head.bold().to_string());
    } else {
        out.push_str(&head);
    }
    out.push('\n');
    for row in rows {
        let cells: Vec<&str> = row.iter().map(|c| c.as_ref()).collect();
        out.push_str(&pad_line(&cells, &widths));
        out.push('\n');
    }
    out
}

fn pad_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    padded.join("  ").trim_end().to_string()
}

// ============================================================================
// Size Formatting
// ============================================================================

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format an optional retention limit; unset means unlimited
pub fn format_limit(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "unlimited".to_string(), |v| format!("{v} {unit}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024 * 100), "100.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024 * 2 + 1024 * 1024 * 512), "2.5 GB");
        assert_eq!(format_size(1024u64 * 1024 * 1024 * 1024 * 2), "2.00 TB");
    }

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(Some(30.0), "days"), "30 days");
        assert_eq!(format_limit(Some(1.5), "GB"), "1.5 GB");
        assert_eq!(format_limit(None, "days"), "unlimited");
    }

    #[test]
    fn test_render_table_pads_columns() {
        let rows = vec![
            vec!["t-1".to_string(), "deploy".to_string(), "ok".to_string()],
            vec!["token-22".to_string(), "ci".to_string(), String::new()],
        ];
        let out = render_table(&["Id", "Name", "Status"], &rows, false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Id        Name    Status");
        assert_eq!(lines[1], "t-1       deploy  ok");
        assert_eq!(lines[2], "token-22  ci");
    }

    #[test]
    fn test_render_table_empty() {
        let rows: Vec<Vec<String>> = Vec::new();
        let out = render_table(&["Name"], &rows, false);
        assert_eq!(out, "Name\n");
    }
}
