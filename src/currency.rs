use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Static approximate conversion rates to USD.
///
/// These are NOT live FX rates. They exist so that prices from different
/// auction centres can be compared on one axis, and every report that uses
/// them carries an approximation note in its metadata.
static APPROX_USD_RATES: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("INR", 0.012),
        ("LKR", 0.003),
        ("KES", 0.007),
        ("USD", 1.0),
    ])
});

/// Fallback rate applied when the currency code is unrecognized (INR rate,
/// matching the largest share of source documents).
const FALLBACK_RATE: f64 = 0.012;

/// Approximate USD rate for a currency code.
pub fn approx_usd_rate(currency: &str) -> f64 {
    APPROX_USD_RATES
        .get(currency.to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(FALLBACK_RATE)
}

/// Convert a price to approximate USD, rounded to cents.
pub fn to_approx_usd(price: f64, currency: &str) -> f64 {
    if !price.is_finite() || price <= 0.0 {
        return 0.0;
    }
    (price * approx_usd_rate(currency) * 100.0).round() / 100.0
}
