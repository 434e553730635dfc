//! Field extractors: pull typed fields out of free-text driver messages.
//!
//! Every extractor tries an ordered list of patterns and keeps the first that
//! yields a usable value. A miss is a sentinel (empty string, `0.0`, `None`),
//! never an error.

use crate::driver::DriverStatus;
use crate::rng::RandomSource;
use crate::taxonomy::{contains_any, mentions, StatusWords};
use once_cell::sync::Lazy;
use regex::Regex;

/// Number with optional thousands separators and paise, e.g. `1,500.50`.
const NUM: &str = r"(\d+(?:,\d{3})*(?:\.\d{2})?)";

static AMOUNT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"₹\s*{NUM}"),
        format!(r"{NUM}\s*rupees?"),
        format!(r"rs\.?\s*{NUM}"),
        format!(r"amount\s*:?\s*{NUM}"),
        format!(r"paid\s*{NUM}"),
        format!(r"cost\s*{NUM}"),
        format!(r"expense\s+{NUM}"),
        format!(r"fee\s+{NUM}"),
        format!(r"(?:fuel|diesel|petrol)\s+{NUM}"),
        r"(?:^|\s)(\d{3,6})(?:\s|$)".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("amount pattern"))
    .collect()
});

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["at", "in", "from", "near"]
        .iter()
        .map(|prep| {
            Regex::new(&format!(r"(?i)\b{prep}\s+([a-z\s]+?)(?:\s|$|[,.!?;])"))
                .expect("location pattern")
        })
        .collect()
});

static RECEIPT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\breceipt\s*(?:number|no|#)?\s*:?\s*([a-z0-9]+)",
        r"(?i)\bbill\s*(?:number|no|#)?\s*:?\s*([a-z0-9]+)",
        r"(?i)\btransaction\s*(?:id|#)?\s*:?\s*([a-z0-9]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("receipt pattern"))
    .collect()
});

static VENDOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bfrom\s+([a-z\s&]+?)(?:\s+(?:pump|station|plaza|dhaba)|$)",
        r"(?i)\bat\s+([a-z\s&]+?)(?:\s+(?:pump|station|plaza|dhaba)|$)",
        r"(?i)\bvendor\s*:?\s*([a-z\s&]+?)(?:\s|$|,)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("vendor pattern"))
    .collect()
});

static ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfrom\s+([a-z][a-z\s]*?)\s+to\s+([a-z][a-z\s]*?)\s*(?:[,.!?]|\bfor\b|\bwith\b|$)")
        .expect("route pattern")
});

static SOURCE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfrom\s+([a-z]+)").expect("source pattern"));

static CAPACITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*tons?\b").expect("capacity pattern"));

/// Prefix of generated receipt identifiers.
pub const RECEIPT_PREFIX: &str = "EXP";

/// Extract a monetary amount. Returns `0.0` when no pattern yields a number.
pub fn extract_amount(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    for pattern in AMOUNT_PATTERNS.iter() {
        let Some(caps) = pattern.captures(&lowered) else {
            continue;
        };
        let Some(raw) = caps.get(1) else { continue };
        match raw.as_str().replace(',', "").parse::<f64>() {
            Ok(v) => return v,
            Err(_) => continue,
        }
    }
    0.0
}

/// Extract a place from "at X", "in X", "from X" or "near X", title-cased. Empty when none match.
pub fn extract_location(text: &str) -> String {
    first_capture(&LOCATION_PATTERNS, text)
        .map(|s| title_case(s.trim()))
        .unwrap_or_default()
}

/// Extract a receipt, bill or transaction number (lower-cased, as matched). Empty when none match.
pub fn extract_receipt(text: &str) -> String {
    first_capture(&RECEIPT_PATTERNS, text)
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// Synthetic receipt id: fixed prefix plus a random five digit suffix.
pub fn synthetic_receipt(rng: &RandomSource) -> String {
    format!("{}{}", RECEIPT_PREFIX, rng.between(10_000, 99_999))
}

/// Extract a vendor name ("from Indian Oil pump", "at Sharma dhaba", "vendor: Sharma").
///
/// Patterns are tried in order; a match longer than three characters stops the search,
/// a shorter one is kept only if no later pattern matches.
pub fn extract_vendor(text: &str) -> String {
    let mut vendor = String::new();
    for pattern in VENDOR_PATTERNS.iter() {
        if let Some(m) = pattern.captures(text).and_then(|c| c.get(1)) {
            vendor = title_case(m.as_str().trim());
            if vendor.chars().count() > 3 {
                break;
            }
        }
    }
    vendor
}

/// Status from keyword lists in priority order (available, busy, offline).
/// With no hit, on-job words mean busy; otherwise unknown.
pub fn extract_status(text: &str, words: &StatusWords) -> DriverStatus {
    let lowered = text.to_lowercase();
    if contains_any(&lowered, &words.available) {
        DriverStatus::Available
    } else if contains_any(&lowered, &words.busy) {
        DriverStatus::Busy
    } else if contains_any(&lowered, &words.offline) {
        DriverStatus::Offline
    } else if contains_any(&lowered, &words.on_job) {
        DriverStatus::Busy
    } else {
        DriverStatus::Unknown
    }
}

/// First vehicle type (in table order) mentioned in the text, lower-cased.
pub fn extract_vehicle_type(text: &str, vehicle_types: &[String]) -> Option<String> {
    let lowered = text.to_lowercase();
    vehicle_types
        .iter()
        .find(|v| mentions(&lowered, v))
        .map(|v| v.to_lowercase())
}

/// Requested capacity such as "15 tons".
pub fn extract_capacity(text: &str) -> Option<String> {
    CAPACITY
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| format!("{} tons", m.as_str()))
}

/// Source and destination from "from X to Y" (or just "from X"), title-cased. Misses are empty.
pub fn extract_route(text: &str) -> (String, String) {
    if let Some(caps) = ROUTE.captures(text) {
        let source = caps.get(1).map(|m| title_case(m.as_str().trim()));
        let destination = caps.get(2).map(|m| title_case(m.as_str().trim()));
        return (source.unwrap_or_default(), destination.unwrap_or_default());
    }
    let source = SOURCE_ONLY
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| title_case(m.as_str()))
        .unwrap_or_default();
    (source, String::new())
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest ("hp pump" -> "Hp Pump").
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<&'t str> {
    patterns
        .iter()
        .find_map(|p| p.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str()))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_currency_and_suffix_forms_agree() {
        assert_eq!(extract_amount("₹1,500"), 1500.0);
        assert_eq!(extract_amount("1500 rupees"), 1500.0);
        assert_eq!(extract_amount("Rs. 450 at dhaba"), 450.0);
        assert_eq!(extract_amount("paid ₹ 1,500.50"), 1500.5);
    }

    #[test]
    fn amount_labelled_forms() {
        assert_eq!(extract_amount("Fuel expense 2500 at Delhi"), 2500.0);
        assert_eq!(extract_amount("Parking fee 200 at Bangalore"), 200.0);
        assert_eq!(extract_amount("Diesel 3500 from Indian Oil pump"), 3500.0);
        assert_eq!(extract_amount("amount: 780"), 780.0);
    }

    #[test]
    fn amount_bare_number_fallback() {
        assert_eq!(extract_amount("tyre change 15000 today"), 15000.0);
        // two digit numbers are not amounts
        assert_eq!(extract_amount("gate 42"), 0.0);
        assert_eq!(extract_amount(""), 0.0);
    }

    #[test]
    fn location_prepositions_in_order() {
        assert_eq!(extract_location("Fuel expense 2500 at Delhi"), "Delhi");
        assert_eq!(extract_location("stuck in jaipur, traffic"), "Jaipur");
        assert_eq!(extract_location("Ready for work from Mumbai"), "Mumbai");
        assert_eq!(extract_location("I am available at Pune."), "Pune");
        assert_eq!(extract_location("I am busy with a trip"), "");
    }

    #[test]
    fn location_ignores_preposition_inside_words() {
        assert_eq!(extract_location("what a day"), "");
    }

    #[test]
    fn receipt_numbers() {
        assert_eq!(
            extract_receipt("Fuel expense ₹2,500 at Mumbai receipt ABC123"),
            "abc123"
        );
        assert_eq!(extract_receipt("bill no: 7781"), "7781");
        assert_eq!(extract_receipt("receipt number 55"), "55");
        assert_eq!(extract_receipt("toll 300"), "");
    }

    #[test]
    fn synthetic_receipt_shape() {
        let id = synthetic_receipt(&RandomSource::seeded(3));
        assert!(id.starts_with(RECEIPT_PREFIX));
        assert_eq!(id.len(), RECEIPT_PREFIX.len() + 5);
        assert!(id[RECEIPT_PREFIX.len()..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn vendor_names() {
        assert_eq!(extract_vendor("Diesel 3500 from Indian Oil pump"), "Indian Oil");
        assert_eq!(
            extract_vendor("Fuel expense 2500 at Mumbai HP Pump"),
            "Mumbai Hp"
        );
        assert_eq!(extract_vendor("vendor: Sharma, 400"), "Sharma");
        assert_eq!(extract_vendor("toll 300"), "");
    }

    #[test]
    fn status_priority_and_context() {
        let words = StatusWords::default();
        assert_eq!(extract_status("I am busy with a trip", &words), DriverStatus::Busy);
        assert_eq!(extract_status("free now, trip done", &words), DriverStatus::Available);
        assert_eq!(extract_status("Going offline for rest", &words), DriverStatus::Offline);
        assert_eq!(extract_status("on a delivery", &words), DriverStatus::Busy);
        assert_eq!(extract_status("hello", &words), DriverStatus::Unknown);
    }

    #[test]
    fn vehicle_and_capacity() {
        let types = vec!["truck".to_string(), "trailer".to_string()];
        assert_eq!(
            extract_vehicle_type("15 ton trailer from Pune", &types),
            Some("trailer".to_string())
        );
        assert_eq!(extract_vehicle_type("any loads?", &types), None);
        let configured = vec!["Container".to_string()];
        assert_eq!(
            extract_vehicle_type("Container loads", &configured),
            Some("container".to_string())
        );
        assert_eq!(
            extract_capacity("Need urgent loads for 20 ton truck"),
            Some("20 tons".to_string())
        );
        assert_eq!(extract_capacity("no weight here"), None);
    }

    #[test]
    fn route_from_to() {
        assert_eq!(
            extract_route("Looking for loads from Mumbai to Bangalore"),
            ("Mumbai".to_string(), "Bangalore".to_string())
        );
        assert_eq!(
            extract_route("loads from new delhi to pune for 10 ton truck"),
            ("New Delhi".to_string(), "Pune".to_string())
        );
        assert_eq!(
            extract_route("Searching loads for 15 ton trailer from Pune"),
            ("Pune".to_string(), String::new())
        );
        assert_eq!(extract_route("any loads"), (String::new(), String::new()));
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("new delhi"), "New Delhi");
        assert_eq!(title_case("HP-pump"), "Hp-Pump");
    }
}
