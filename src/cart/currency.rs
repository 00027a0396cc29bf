//! Price formatting helpers

/// Display symbol for a currency code
pub fn currency_symbol(currency: &str) -> Option<&'static str> {
    let symbol = match currency.to_ascii_uppercase().as_str() {
        "USD" => "$",
        "CAD" => "CA$",
        "AUD" => "A$",
        "NZD" => "NZ$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        _ => return None,
    };
    Some(symbol)
}

/// Number of minor-unit digits
fn decimals(currency: &str) -> u32 {
    match currency.to_ascii_uppercase().as_str() {
        "JPY" | "KRW" => 0,
        _ => 2,
    }
}

/// Format an amount in minor units, e.g. `1250, "usd"` → `$12.50`.
/// Currencies without a known symbol get the code as a suffix.
pub fn format_price(amount: u64, currency: &str) -> String {
    let digits = decimals(currency);
    let scale = 10u64.pow(digits);
    let whole = group_thousands(amount / scale);
    let number = if digits == 0 {
        whole
    } else {
        format!("{}.{:0width$}", whole, amount % scale, width = digits as usize)
    };

    match currency_symbol(currency) {
        Some(symbol) => format!("{}{}", symbol, number),
        None => format!("{} {}", number, currency.to_ascii_uppercase()),
    }
}

/// `$10.00` for equal bounds, `$10.00 - $25.00` otherwise
pub fn format_price_range(min: u64, max: u64, currency: &str) -> String {
    if min == max {
        format_price(min, currency)
    } else {
        format!("{} - {}", format_price(min, currency), format_price(max, currency))
    }
}

pub fn cents_to_units(cents: u64) -> f64 {
    cents as f64 / 100.0
}

/// Round to the nearest cent; negative amounts become zero
pub fn units_to_cents(units: f64) -> u64 {
    if units.is_finite() && units > 0.0 {
        (units * 100.0).round() as u64
    } else {
        0
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
