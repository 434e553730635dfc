//! Intent classification by keyword counting.
//!
//! Matching is substring-based on the lower-cased message: no tokenising, no
//! stemming, so "cost" also hits "costume".

use crate::taxonomy::{contains_any, keyword_score, Taxonomy, OTHER_CATEGORY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The category a driver message is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Availability,
    LoadSearch,
    ExpenseTracking,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Availability => "availability",
            Self::LoadSearch => "load_search",
            Self::ExpenseTracking => "expense_tracking",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores messages against the taxonomy's intent keyword lists.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    taxonomy: Arc<Taxonomy>,
}

impl IntentClassifier {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    /// Classify a message. Never fails; unmatched text is `General`.
    ///
    /// Load search or expense tracking win only with a strictly higher score than both
    /// other intents. Anything else with a non-zero availability score is availability.
    /// With no winner, the context words decide between load search and general.
    pub fn classify(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();
        let kw = &self.taxonomy.intents;

        let availability = keyword_score(&lowered, &kw.availability);
        let load = keyword_score(&lowered, &kw.load_search);
        let expense = keyword_score(&lowered, &kw.expense_tracking);
        log::debug!(
            "intent scores: availability={} load_search={} expense_tracking={}",
            availability,
            load,
            expense
        );

        if load > availability && load > expense {
            Intent::LoadSearch
        } else if expense > availability && expense > load {
            Intent::ExpenseTracking
        } else if availability > 0 {
            Intent::Availability
        } else if contains_any(&lowered, &kw.context) {
            Intent::LoadSearch
        } else {
            Intent::General
        }
    }

    /// Pick the expense category with the strictly highest keyword count, earliest category first on ties.
    /// Returns the catch-all label when nothing matches.
    pub fn expense_category(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let mut best = OTHER_CATEGORY;
        let mut best_score = 0;
        for category in &self.taxonomy.expense_categories {
            let score = keyword_score(&lowered, &category.keywords);
            if score > best_score {
                best_score = score;
                best = category.name.as_str();
            }
        }
        best.to_string()
    }

    pub fn taxonomy(&self) -> &Arc<Taxonomy> {
        &self.taxonomy
    }
}
