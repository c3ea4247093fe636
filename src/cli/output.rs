//! Output formatting for CLI

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(40));
}

/// Format a number with thousands separators
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i.is_multiple_of(3) {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:24} {}", format!("{key}:"), value);
}

/// Render a float series compactly, eliding the middle of long series.
pub fn format_series(values: &[f64], keep: usize) -> String {
    let fmt = |slice: &[f64]| {
        slice
            .iter()
            .map(|v| format!("{v:.3}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    if values.len() <= keep * 2 {
        format!("[{}]", fmt(values))
    } else {
        format!(
            "[{}, ... {}]",
            fmt(&values[..keep]),
            fmt(&values[values.len() - keep..])
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(100000), "100,000");
    }

    #[test]
    fn test_format_series_elides_middle() {
        assert_eq!(format_series(&[1.0, 2.0], 2), "[1.000, 2.000]");
        assert_eq!(
            format_series(&[1.0, 2.0, 3.0, 4.0, 5.0], 1),
            "[1.000, ... 5.000]"
        );
    }
}
