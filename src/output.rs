//! Table rendering
//!
//! Width-aligned plain-text table for the final result rows. Columns whose
//! data is entirely numeric are right-aligned, the rest left-aligned.

/// Render rows (header first) as an aligned text table.
pub fn render_table(rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, field) in row.iter().enumerate() {
            widths[i] = widths[i].max(field.chars().count());
        }
    }

    let numeric: Vec<bool> = (0..columns)
        .map(|i| {
            // header row excluded; empty data columns stay left-aligned
            let mut fields = rows.iter().skip(1).filter_map(|r| r.get(i));
            let mut any = false;
            let all = fields.all(|f| {
                any = true;
                f.parse::<f64>().is_ok()
            });
            any && all
        })
        .collect();

    let mut out = String::new();
    for row in rows {
        let mut line = String::new();
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            if numeric[i] {
                line.push_str(&format!("{field:>width$}", width = widths[i]));
            } else {
                line.push_str(&format!("{field:<width$}", width = widths[i]));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
