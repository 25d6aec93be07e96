/// Keep only ASCII digits from free-form amount input ("Rp 12.500" -> "12500").
pub fn strip_non_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format a digit string as Indonesian rupiah with no decimals,
/// e.g. "1500000" -> "Rp\u{a0}1.500.000". Empty input formats to "".
///
/// Grouping works on the digits directly, so amounts wider than `u64`
/// never overflow.
pub fn format_currency(digits: &str) -> String {
    let digits = strip_non_digits(digits);
    if digits.is_empty() {
        return String::new();
    }

    let significant = digits.trim_start_matches('0');
    let significant = if significant.is_empty() { "0" } else { significant };

    let mut grouped = String::with_capacity(significant.len() + significant.len() / 3);
    for (i, c) in significant.chars().enumerate() {
        if i > 0 && (significant.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    format!("Rp\u{a0}{grouped}")
}

/// Whether a stored digit string is below `minimum`. Values too wide for
/// `u64` are above any minimum.
pub fn is_below(digits: &str, minimum: u64) -> bool {
    let significant = digits.trim_start_matches('0');
    match significant.parse::<u64>() {
        Ok(value) => value < minimum,
        Err(_) if significant.is_empty() => 0 < minimum,
        Err(_) => false,
    }
}
