//! Bounded-prefix text rendering of local tables.

use super::LocalTable;

/// Row limit used by `Display` for `LocalTable`.
pub const DEFAULT_MAX_ROWS: usize = 10;

/// Marker printed in place of rows that were cut off.
pub const ELLIPSIS: &str = "⋮";

/// Render the column header. Key columns are marked with `*`.
pub fn render_header(table: &LocalTable) -> String {
    let keys = table.pkey_indices();
    table
        .schema()
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            if keys.contains(&i) {
                format!("{}*", field.name)
            } else {
                field.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Render one row as a `|`-separated line.
pub fn render_row(row: &[super::Value]) -> String {
    row.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Render the header and at most `max_rows` rows, followed by an ellipsis
/// line when rows were left out.
pub fn render(table: &LocalTable, max_rows: usize) -> String {
    let mut lines = vec![render_header(table)];
    lines.extend(table.rows().take(max_rows).map(|row| render_row(&row)));
    if table.num_rows() > max_rows {
        lines.push(format!(
            "{} ({} more rows)",
            ELLIPSIS,
            table.num_rows() - max_rows
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn numbers(n: i64) -> LocalTable {
        LocalTable::from_rows(
            &["id", "sq"],
            (1..=n).map(|i| vec![Value::Int(i), Value::Int(i * i)]).collect(),
            &["id"],
        )
        .unwrap()
    }

    #[test]
    fn test_render_without_truncation() {
        let out = render(&numbers(2), 5);
        assert_eq!(out, "id* | sq\n1 | 1\n2 | 4");
    }

    #[test]
    fn test_render_truncates_with_ellipsis() {
        let out = render(&numbers(12), 3);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3], "3 | 9");
        assert_eq!(lines[4], "⋮ (9 more rows)");
    }
}
