//! Load listings and the read-only load board searched by the load-search pipeline.

use serde::{Deserialize, Serialize};

/// How soon a shipper needs the load moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Urgent,
    High,
    #[default]
    Normal,
}

impl Urgency {
    /// Profitability multiplier.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Urgent => 1.3,
            Self::High => 1.2,
            Self::Normal => 1.0,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Urgent => "🔥",
            Self::High => "⚡",
            Self::Normal => "📦",
        }
    }
}

/// One posted load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadListing {
    pub load_id: String,
    pub source: String,
    pub destination: String,
    pub material: String,
    pub weight_tons: f64,
    pub vehicle_type: String,
    /// Posted rate in rupees.
    pub rate: f64,
    pub loading_date: String,
    #[serde(default)]
    pub urgency: Urgency,
    pub company: String,
}

impl LoadListing {
    /// Rate per ton-hundredweight, scaled by urgency. Zero weight scores zero.
    pub fn profitability(&self) -> f64 {
        if self.weight_tons <= 0.0 {
            return 0.0;
        }
        self.rate / (self.weight_tons * 100.0) * self.urgency.multiplier()
    }
}

/// Immutable set of listings. Shared across invocations behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct LoadBoard {
    listings: Vec<LoadListing>,
}

impl LoadBoard {
    pub fn new(listings: Vec<LoadListing>) -> Self {
        Self { listings }
    }

    pub fn listings(&self) -> &[LoadListing] {
        &self.listings
    }

    /// Sample board used until a real load feed is wired in.
    pub fn sample() -> Self {
        #[allow(clippy::too_many_arguments)]
        fn listing(
            id: &str,
            route: (&str, &str),
            material: &str,
            weight_tons: f64,
            vehicle_type: &str,
            rate: f64,
            loading_date: &str,
            urgency: Urgency,
            company: &str,
        ) -> LoadListing {
            LoadListing {
                load_id: id.to_string(),
                source: route.0.to_string(),
                destination: route.1.to_string(),
                material: material.to_string(),
                weight_tons,
                vehicle_type: vehicle_type.to_string(),
                rate,
                loading_date: loading_date.to_string(),
                urgency,
                company: company.to_string(),
            }
        }

        Self::new(vec![
            listing(
                "LD001",
                ("Delhi", "Mumbai"),
                "Electronics",
                10.0,
                "truck",
                45_000.0,
                "2025-09-12",
                Urgency::Normal,
                "TechCorp Ltd",
            ),
            listing(
                "LD002",
                ("Mumbai", "Bangalore"),
                "Textiles",
                8.0,
                "truck",
                32_000.0,
                "2025-09-11",
                Urgency::Urgent,
                "Fashion House",
            ),
            listing(
                "LD003",
                ("Chennai", "Hyderabad"),
                "Auto Parts",
                12.0,
                "truck",
                28_000.0,
                "2025-09-13",
                Urgency::Normal,
                "AutoMakers Inc",
            ),
            listing(
                "LD004",
                ("Delhi", "Kolkata"),
                "FMCG Products",
                15.0,
                "truck",
                52_000.0,
                "2025-09-12",
                Urgency::High,
                "Consumer Goods Ltd",
            ),
            listing(
                "LD005",
                ("Pune", "Delhi"),
                "Machinery",
                20.0,
                "trailer",
                65_000.0,
                "2025-09-14",
                Urgency::Normal,
                "Heavy Industries",
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profitability_applies_urgency() {
        let board = LoadBoard::sample();
        let ld002 = &board.listings()[1];
        // 32000 / (8 * 100) * 1.3
        assert!((ld002.profitability() - 52.0).abs() < 1e-9);
        let ld001 = &board.listings()[0];
        assert!((ld001.profitability() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn zero_weight_scores_zero() {
        let mut l = LoadBoard::sample().listings()[0].clone();
        l.weight_tons = 0.0;
        assert_eq!(l.profitability(), 0.0);
    }
}
