//! Promotional label decoding.
//!
//! Dutch supermarkets advertise multi-buy deals as short stickers such as
//! "1+1 GRATIS", "2e HALVE PRIJS" or "3 voor 5,00". The structured price on
//! the page is usually the single-unit price, so the sticker has to be
//! turned into an effective per-unit price before it can be stored.

use tracing::debug;

/// Known stickers after whitespace removal and lowercasing, with the share
/// of the base price a customer effectively pays.
const PROMOTIONS: &[(&str, f64)] = &[
    ("1+1gratis", 1.0 / 2.0),
    ("2+2gratis", 1.0 / 2.0),
    ("2+1gratis", 2.0 / 3.0),
    ("3+1gratis", 3.0 / 4.0),
    ("5+1gratis", 5.0 / 6.0),
    ("2ehalveprijs", 3.0 / 4.0),
    ("50%korting", 1.0 / 2.0),
    ("2eartikel70%", 0.85),
    ("15%korting", 0.85),
    ("1+1", 1.0 / 2.0),
    ("6=5", 5.0 / 6.0),
    ("2egratis", 1.0 / 2.0),
    ("2+3gratis", 0.4),
];

const VOOR: &str = "voor";

/// Effective price for `price` under the promotion described by `message`.
///
/// Table stickers yield a share of `price`. "N voor X" stickers yield
/// `X / N` and "voor X" yields `X`; those ignore `price` entirely.
/// Returns `None` when the message is not understood.
pub fn parse_promotion(message: &str, price: f64) -> Option<f64> {
    let sanitized: String = message
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    debug!(promotion = message, %sanitized, "parsing promotion");

    if let Some((_, share)) = PROMOTIONS.iter().find(|(phrase, _)| *phrase == sanitized) {
        return Some(share * price);
    }

    if sanitized.contains(VOOR) {
        let parsed = parse_quantity_for_price(&sanitized);
        if parsed.is_none() {
            debug!(%sanitized, "could not compute price from 'voor' promotion");
        }
        return parsed;
    }

    debug!(%sanitized, "promotion text did not match any known promotion");
    None
}

/// "3voor5" → 5/3, "voor10" → 10.
fn parse_quantity_for_price(sanitized: &str) -> Option<f64> {
    let mut parts = sanitized.split(VOOR);
    let quantity = parts.next()?;
    let total: f64 = parts.next()?.parse().ok()?;

    let price = if quantity.is_empty() {
        total
    } else {
        let quantity: f64 = quantity.parse().ok()?;
        if quantity == 0.0 {
            return None;
        }
        total / quantity
    };

    price.is_finite().then_some(price)
}
