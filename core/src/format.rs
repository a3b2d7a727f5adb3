//! Display helpers for coin values.

const NA: &str = "N/A";

/// Insert thousands separators into a plain decimal string such as `1234567.89`.
fn with_commas(number: &str) -> String {
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn format_price(value: Option<f64>) -> String {
    match value {
        None => NA.to_string(),
        Some(v) if v < 0.01 => format!("${v:.8}"),
        Some(v) => format!("${}", with_commas(&format!("{v:.2}"))),
    }
}

pub fn format_change(value: Option<f64>) -> String {
    match value {
        None => NA.to_string(),
        Some(v) => format!("{v:+.2}%"),
    }
}

pub fn format_market_cap(value: Option<f64>) -> String {
    match value {
        None => NA.to_string(),
        Some(v) if v >= 1e9 => format!("${:.2}B", v / 1e9),
        Some(v) if v >= 1e6 => format!("${:.2}M", v / 1e6),
        Some(v) => format!("${}", with_commas(&format!("{v:.0}"))),
    }
}

/// `2024-05-01T12:30:00.000Z` -> `2024-05-01 12:30:00`
pub fn format_date(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.is_empty() => s.chars().take(19).collect::<String>().replace('T', " "),
        _ => NA.to_string(),
    }
}
