//! Keyword and category tables used by the classifier and the extractors.
//!
//! The tables are plain data: built once (defaults or from config), wrapped in an
//! `Arc`, and handed to every component that needs them. Nothing reads them from
//! global state, so tests can swap in a different taxonomy.

use serde::{Deserialize, Serialize};

/// All keyword tables for one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Taxonomy {
    /// Per-intent keyword lists scored by the intent classifier.
    pub intents: IntentKeywords,

    /// Expense categories in priority order. The last entry is the catch-all.
    pub expense_categories: Vec<ExpenseCategory>,

    /// Driver status word lists.
    pub status: StatusWords,

    /// Vehicle types recognised in free text, in priority order.
    pub vehicle_types: Vec<String>,
}

/// Keyword lists for the three routable intents plus the context fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentKeywords {
    pub availability: Vec<String>,
    pub load_search: Vec<String>,
    pub expense_tracking: Vec<String>,
    /// Words that turn an otherwise unclassified message into a load search.
    pub context: Vec<String>,
}

/// One expense category: its label, keywords and the ceiling above which an amount draws a warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategory {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub max_amount: f64,
}

/// Status word lists checked in priority order: available, busy, offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusWords {
    pub available: Vec<String>,
    pub busy: Vec<String>,
    pub offline: Vec<String>,
    /// Words implying the driver is on a job when none of the lists hit.
    pub on_job: Vec<String>,
}

/// Label of the catch-all expense category.
pub const OTHER_CATEGORY: &str = "other";

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for IntentKeywords {
    fn default() -> Self {
        Self {
            availability: words(&[
                "free", "available", "ready", "busy", "occupied", "offline", "rest", "break",
                "status", "working", "trip", "driving",
            ]),
            load_search: words(&[
                "load",
                "loads",
                "shipment",
                "cargo",
                "delivery",
                "transport",
                "from",
                "to",
                "route",
                "destination",
                "pickup",
                "booking",
            ]),
            expense_tracking: words(&[
                "expense",
                "cost",
                "fuel",
                "diesel",
                "toll",
                "parking",
                "maintenance",
                "repair",
                "bill",
                "receipt",
                "paid",
            ]),
            context: words(&["find", "search", "looking", "need"]),
        }
    }
}

impl Default for StatusWords {
    fn default() -> Self {
        Self {
            available: words(&["free", "available", "ready", "khali"]),
            busy: words(&["busy", "occupied", "trip"]),
            offline: words(&["offline", "rest", "break"]),
            on_job: words(&["delivery", "driving", "load"]),
        }
    }
}

fn category(name: &str, keywords: &[&str], max_amount: f64) -> ExpenseCategory {
    ExpenseCategory {
        name: name.to_string(),
        keywords: words(keywords),
        max_amount,
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            intents: IntentKeywords::default(),
            expense_categories: vec![
                category("fuel", &["fuel", "diesel", "petrol", "gas", "pump"], 50_000.0),
                category("toll", &["toll", "highway", "expressway", "plaza"], 5_000.0),
                category("parking", &["parking", "stand", "halt"], 1_000.0),
                category(
                    "maintenance",
                    &["repair", "service", "maintenance", "spare", "tyre"],
                    25_000.0,
                ),
                category(
                    "food",
                    &["food", "meal", "dhaba", "restaurant", "tea", "snacks"],
                    2_000.0,
                ),
                category(OTHER_CATEGORY, &[], 10_000.0),
            ],
            status: StatusWords::default(),
            vehicle_types: words(&["truck", "trailer", "tempo"]),
        }
    }
}

impl Taxonomy {
    /// Look up an expense category by label.
    pub fn expense_category(&self, name: &str) -> Option<&ExpenseCategory> {
        self.expense_categories.iter().find(|c| c.name == name)
    }

    /// Ceiling for a category; unknown labels fall back to the catch-all's ceiling.
    pub fn ceiling_for(&self, name: &str) -> f64 {
        self.expense_category(name)
            .or_else(|| self.expense_category(OTHER_CATEGORY))
            .map(|c| c.max_amount)
            .unwrap_or(f64::INFINITY)
    }
}

/// True if `keyword` occurs in `lowered`, ignoring the keyword's case.
///
/// Tables loaded from config may carry mixed-case entries; `lowered` must already be lower-cased.
pub fn mentions(lowered: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        false
    } else if keyword.chars().any(char::is_uppercase) {
        lowered.contains(keyword.to_lowercase().as_str())
    } else {
        lowered.contains(keyword)
    }
}

/// Number of distinct keywords from `keywords` occurring as substrings of `lowered`.
///
/// `lowered` must already be lower-cased. Each keyword counts once no matter how often it repeats.
pub fn keyword_score(lowered: &str, keywords: &[String]) -> usize {
    keywords.iter().filter(|k| mentions(lowered, k)).count()
}

/// True if any keyword occurs as a substring of `lowered`.
pub fn contains_any(lowered: &str, keywords: &[String]) -> bool {
    keyword_score(lowered, keywords) > 0
}
