//! Brazilian number formatting for user-facing alert text

/// Format an amount as Brazilian reais (`R$ 1.234,56`)
pub fn format_brl(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}R$ {}", sign, group_decimal(amount.abs(), 2))
}

/// Format a percentage with one decimal and a comma separator (`12,5%`)
pub fn format_percent(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}%", sign, group_decimal(value.abs(), 1))
}

fn group_decimal(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*ch);
    }

    match frac_part {
        Some(f) => format!("{},{}", grouped, f),
        None => grouped,
    }
}
