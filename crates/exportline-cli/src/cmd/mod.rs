pub mod build;
pub mod run;
pub mod sync;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

/// Two-column summary table on stderr
pub(crate) fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Comma-joined dates, or "-" for none
pub(crate) fn fmt_dates<T: std::fmt::Display>(dates: &[T]) -> String {
    match dates {
        [] => "-".to_string(),
        [one] => one.to_string(),
        [first, .., last] if dates.len() > 4 => {
            format!("{first} .. {last} ({} dates)", dates.len())
        }
        _ => dates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_dates_shapes() {
        let none: [&str; 0] = [];
        assert_eq!(fmt_dates(&none), "-");
        assert_eq!(fmt_dates(&["2024-01-01"]), "2024-01-01");
        assert_eq!(fmt_dates(&["2024-01-01", "2024-01-02"]), "2024-01-01, 2024-01-02");
        assert_eq!(
            fmt_dates(&["a", "b", "c", "d", "e"]),
            "a .. e (5 dates)"
        );
    }
}
