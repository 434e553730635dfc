//! Rupee formatting for replies.

/// Format an amount as `₹` with comma thousands separators and `decimals` fraction digits.
pub fn format_rupees(amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, amount.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}₹{}.{}", sign, grouped, f),
        None => format!("{}₹{}", sign, grouped),
    }
}
