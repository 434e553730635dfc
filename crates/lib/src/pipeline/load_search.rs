//! Load search pipeline: parse the query, pull candidates from the load board, rank by profitability, render.

use super::{Pipeline, PipelineError, PipelineInput, Stage};
use crate::extract::{extract_capacity, extract_route, extract_vehicle_type};
use crate::loads::{LoadBoard, LoadListing, Urgency};
use crate::money::format_rupees;
use crate::rng::RandomSource;
use crate::taxonomy::Taxonomy;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;

/// Vehicle type recorded when the query names none.
pub const ANY_VEHICLE: &str = "any";

const SOURCE_POINTS: u32 = 3;
const DESTINATION_POINTS: u32 = 3;
const VEHICLE_POINTS: u32 = 2;

const NO_LOADS_REPLY: &str =
    "❌ No loads found matching your criteria. Try different locations or vehicle types.";

/// Knobs for candidate selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    /// Chance that a listing with no match points is still offered.
    pub discovery_probability: f64,
    /// Candidates kept after match sorting.
    pub shortlist: usize,
    /// Loads rendered in the reply.
    pub presented: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            discovery_probability: 0.3,
            shortlist: 5,
            presented: 3,
        }
    }
}

/// A listing with its match points and, after ranking, its profitability.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLoad {
    pub listing: LoadListing,
    pub match_score: u32,
    /// Rounded to two decimals. Zero until ranked.
    pub profitability_score: f64,
}

#[derive(Debug, Clone)]
pub struct LoadSearchState {
    pub input: PipelineInput,
    pub source: String,
    pub destination: String,
    /// A vehicle type from the taxonomy, or [`ANY_VEHICLE`].
    pub vehicle_type: String,
    pub load_capacity: String,
    pub candidates: Vec<ScoredLoad>,
    pub ranked: Vec<ScoredLoad>,
    pub response: String,
}

impl LoadSearchState {
    pub fn new(input: PipelineInput) -> Self {
        Self {
            input,
            source: String::new(),
            destination: String::new(),
            vehicle_type: ANY_VEHICLE.to_string(),
            load_capacity: String::new(),
            candidates: Vec::new(),
            ranked: Vec::new(),
            response: String::new(),
        }
    }

    /// Ids of the loads shown in the reply, best first.
    pub fn presented_ids(&self, presented: usize) -> Vec<String> {
        self.ranked
            .iter()
            .take(presented)
            .map(|s| s.listing.load_id.clone())
            .collect()
    }
}

/// Match points of one listing against the parsed query.
pub fn match_score(listing: &LoadListing, source: &str, destination: &str, vehicle_type: &str) -> u32 {
    let mut score = 0;
    if !source.is_empty() && listing.source.to_lowercase().contains(&source.to_lowercase()) {
        score += SOURCE_POINTS;
    }
    if !destination.is_empty()
        && listing
            .destination
            .to_lowercase()
            .contains(&destination.to_lowercase())
    {
        score += DESTINATION_POINTS;
    }
    if vehicle_type != ANY_VEHICLE && vehicle_type == listing.vehicle_type {
        score += VEHICLE_POINTS;
    }
    score
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Score as shown to drivers: always at least one decimal ("45.0", "52.5").
fn display_score(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

struct ParseQuery {
    taxonomy: Arc<Taxonomy>,
}

#[async_trait]
impl Stage<LoadSearchState> for ParseQuery {
    fn name(&self) -> &'static str {
        "parse_query"
    }

    async fn run(&self, mut state: LoadSearchState) -> Result<LoadSearchState, PipelineError> {
        let text = &state.input.message;
        let (source, destination) = extract_route(text);
        state.source = source;
        state.destination = destination;
        state.vehicle_type = extract_vehicle_type(text, &self.taxonomy.vehicle_types)
            .unwrap_or_else(|| ANY_VEHICLE.to_string());
        state.load_capacity = extract_capacity(text).unwrap_or_default();
        log::info!(
            "load_search: source={:?} destination={:?} vehicle={} capacity={:?}",
            state.source,
            state.destination,
            state.vehicle_type,
            state.load_capacity
        );
        Ok(state)
    }
}

struct SearchCandidates {
    board: Arc<LoadBoard>,
    rng: Arc<RandomSource>,
    discovery_probability: f64,
    shortlist: usize,
}

#[async_trait]
impl Stage<LoadSearchState> for SearchCandidates {
    fn name(&self) -> &'static str {
        "search_candidates"
    }

    async fn run(&self, mut state: LoadSearchState) -> Result<LoadSearchState, PipelineError> {
        let mut candidates: Vec<ScoredLoad> = self
            .board
            .listings()
            .iter()
            .filter_map(|listing| {
                let score = match_score(
                    listing,
                    &state.source,
                    &state.destination,
                    &state.vehicle_type,
                );
                (score > 0 || self.rng.chance(self.discovery_probability)).then(|| ScoredLoad {
                    listing: listing.clone(),
                    match_score: score,
                    profitability_score: 0.0,
                })
            })
            .collect();
        // stable: equal keys keep board order
        candidates.sort_by(|a, b| {
            let key = |s: &ScoredLoad| (s.match_score, s.listing.urgency == Urgency::Urgent);
            key(b).cmp(&key(a))
        });
        log::info!("load_search: {} candidate loads", candidates.len());
        candidates.truncate(self.shortlist);
        state.candidates = candidates;
        Ok(state)
    }
}

struct RankCandidates;

#[async_trait]
impl Stage<LoadSearchState> for RankCandidates {
    fn name(&self) -> &'static str {
        "rank_candidates"
    }

    async fn run(&self, mut state: LoadSearchState) -> Result<LoadSearchState, PipelineError> {
        let mut ranked: Vec<ScoredLoad> = state
            .candidates
            .iter()
            .cloned()
            .map(|mut s| {
                s.profitability_score = round2(s.listing.profitability());
                s
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.profitability_score
                .partial_cmp(&a.profitability_score)
                .unwrap_or(Ordering::Equal)
        });
        state.ranked = ranked;
        Ok(state)
    }
}

struct ComposeReply {
    presented: usize,
}

impl ComposeReply {
    fn render(&self, ranked: &[ScoredLoad]) -> String {
        if ranked.is_empty() {
            return NO_LOADS_REPLY.to_string();
        }
        let mut out = String::from("🚛 **AVAILABLE LOADS FOUND:**\n\n");
        for (i, scored) in ranked.iter().take(self.presented).enumerate() {
            let load = &scored.listing;
            out.push_str(&format!("{} **Load #{}**\n", load.urgency.emoji(), i + 1));
            out.push_str(&format!(
                "📍 **Route:** {} → {}\n",
                load.source, load.destination
            ));
            out.push_str(&format!(
                "📦 **Material:** {} ({} tons)\n",
                load.material, load.weight_tons
            ));
            out.push_str(&format!("💰 **Rate:** {}\n", format_rupees(load.rate, 0)));
            out.push_str(&format!("📅 **Loading:** {}\n", load.loading_date));
            out.push_str(&format!("🏢 **Company:** {}\n", load.company));
            out.push_str(&format!(
                "⭐ **Score:** {}/10\n",
                display_score(scored.profitability_score)
            ));
            out.push_str(&"─".repeat(40));
            out.push_str("\n\n");
        }
        if ranked.len() > self.presented {
            out.push_str(&format!(
                "📋 *Found {} more loads. Contact for details.*\n\n",
                ranked.len() - self.presented
            ));
        }
        out.push_str("💡 **Next Steps:**\n");
        out.push_str("• Reply with load number to get contact details\n");
        out.push_str("• Say 'book Load #1' to reserve the trip\n");
        out.push_str("• Search again with different criteria anytime");
        out
    }
}

#[async_trait]
impl Stage<LoadSearchState> for ComposeReply {
    fn name(&self) -> &'static str {
        "compose_reply"
    }

    async fn run(&self, mut state: LoadSearchState) -> Result<LoadSearchState, PipelineError> {
        state.response = self.render(&state.ranked);
        Ok(state)
    }
}

/// parse_query → search_candidates → rank_candidates → compose_reply
pub struct LoadSearchPipeline {
    pipeline: Pipeline<LoadSearchState>,
    settings: SearchSettings,
}

impl LoadSearchPipeline {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        board: Arc<LoadBoard>,
        rng: Arc<RandomSource>,
        settings: SearchSettings,
    ) -> Self {
        let stages: Vec<Box<dyn Stage<LoadSearchState>>> = vec![
            Box::new(ParseQuery { taxonomy }),
            Box::new(SearchCandidates {
                board,
                rng,
                discovery_probability: settings.discovery_probability,
                shortlist: settings.shortlist,
            }),
            Box::new(RankCandidates),
            Box::new(ComposeReply {
                presented: settings.presented,
            }),
        ];
        Self {
            pipeline: Pipeline::new("load_search", stages),
            settings,
        }
    }

    pub fn settings(&self) -> SearchSettings {
        self.settings
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    pub async fn run(&self, message: &str, driver_id: &str) -> Result<LoadSearchState, PipelineError> {
        log::info!("load_search: processing query from {}", driver_id);
        let state = LoadSearchState::new(PipelineInput::new(message, driver_id));
        self.pipeline.run(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(discovery_probability: f64) -> SearchSettings {
        SearchSettings {
            discovery_probability,
            ..SearchSettings::default()
        }
    }

    fn pipeline_with(board: LoadBoard, discovery_probability: f64) -> LoadSearchPipeline {
        LoadSearchPipeline::new(
            Arc::new(Taxonomy::default()),
            Arc::new(board),
            Arc::new(RandomSource::seeded(7)),
            settings(discovery_probability),
        )
    }

    fn listing(id: &str, source: &str, rate: f64, urgency: Urgency) -> LoadListing {
        LoadListing {
            load_id: id.to_string(),
            source: source.to_string(),
            destination: "Mumbai".to_string(),
            material: "Steel".to_string(),
            weight_tons: 10.0,
            vehicle_type: "truck".to_string(),
            rate,
            loading_date: "2025-09-12".to_string(),
            urgency,
            company: "Acme".to_string(),
        }
    }

    #[test]
    fn match_points() {
        let l = listing("L1", "Delhi", 10_000.0, Urgency::Normal);
        assert_eq!(match_score(&l, "Delhi", "Mumbai", "truck"), 8);
        assert_eq!(match_score(&l, "delhi", "", ANY_VEHICLE), 3);
        assert_eq!(match_score(&l, "", "", "trailer"), 0);
        assert_eq!(match_score(&l, "", "", ANY_VEHICLE), 0);
    }

    #[test]
    fn stage_order_is_fixed() {
        let p = pipeline_with(LoadBoard::sample(), 0.0);
        assert_eq!(
            p.stage_names(),
            vec!["parse_query", "search_candidates", "rank_candidates", "compose_reply"]
        );
    }

    #[tokio::test]
    async fn route_query_finds_exact_match_first() {
        let p = pipeline_with(LoadBoard::sample(), 0.0);
        let state = p
            .run("Looking for loads from Mumbai to Bangalore", "d1")
            .await
            .expect("run");
        assert_eq!(state.source, "Mumbai");
        assert_eq!(state.destination, "Bangalore");
        assert_eq!(state.vehicle_type, ANY_VEHICLE);
        assert_eq!(state.candidates.len(), 1);
        assert_eq!(state.ranked[0].listing.load_id, "LD002");
        assert_eq!(state.ranked[0].match_score, 6);
        // 32000 / 800 * 1.3
        assert_eq!(state.ranked[0].profitability_score, 52.0);
        assert!(state.response.starts_with("🚛 **AVAILABLE LOADS FOUND:**"));
        assert!(state.response.contains("🔥 **Load #1**"));
        assert!(state.response.contains("📍 **Route:** Mumbai → Bangalore"));
        assert!(state.response.contains("💰 **Rate:** ₹32,000"));
        assert!(state.response.contains("⭐ **Score:** 52.0/10"));
        assert!(!state.response.contains("more loads"));
    }

    #[tokio::test]
    async fn vehicle_and_capacity_are_parsed() {
        let p = pipeline_with(LoadBoard::sample(), 0.0);
        let state = p
            .run("Searching loads for 15 ton trailer from Pune", "d1")
            .await
            .expect("run");
        assert_eq!(state.source, "Pune");
        assert_eq!(state.vehicle_type, "trailer");
        assert_eq!(state.load_capacity, "15 tons");
        assert_eq!(state.presented_ids(3), vec!["LD005".to_string()]);
    }

    #[tokio::test]
    async fn no_match_and_no_discovery_yields_canned_reply() {
        let p = pipeline_with(LoadBoard::sample(), 0.0);
        let state = p.run("any loads near Goa", "d1").await.expect("run");
        assert!(state.candidates.is_empty());
        assert_eq!(state.response, NO_LOADS_REPLY);
    }

    #[tokio::test]
    async fn full_discovery_shortlists_and_mentions_the_rest() {
        let p = pipeline_with(LoadBoard::sample(), 1.0);
        let state = p.run("any loads?", "d1").await.expect("run");
        assert_eq!(state.candidates.len(), 5);
        assert_eq!(state.ranked.len(), 5);
        let scores: Vec<f64> = state.ranked.iter().map(|s| s.profitability_score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(state.response.contains("Found 2 more loads"));
        assert!(state.response.contains("**Load #3**"));
        assert!(!state.response.contains("**Load #4**"));
    }

    #[tokio::test]
    async fn shortlist_prefers_match_score_then_urgency() {
        let p = LoadSearchPipeline::new(
            Arc::new(Taxonomy::default()),
            Arc::new(LoadBoard::new(vec![
                listing("A", "Nagpur", 10_000.0, Urgency::Normal),
                listing("B", "Delhi", 10_000.0, Urgency::Normal),
                listing("C", "Nagpur", 10_000.0, Urgency::Urgent),
            ])),
            Arc::new(RandomSource::seeded(1)),
            SearchSettings {
                discovery_probability: 1.0,
                shortlist: 2,
                presented: 3,
            },
        );
        let state = p.run("loads from Delhi", "d1").await.expect("run");
        let ids: Vec<&str> = state
            .candidates
            .iter()
            .map(|s| s.listing.load_id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn urgent_outranks_normal_at_equal_raw_profitability() {
        let board = LoadBoard::new(vec![
            listing("N", "Delhi", 20_000.0, Urgency::Normal),
            listing("U", "Delhi", 20_000.0, Urgency::Urgent),
        ]);
        let p = pipeline_with(board, 0.0);
        let state = p.run("loads from Delhi", "d1").await.expect("run");
        assert_eq!(state.ranked[0].listing.load_id, "U");
        assert_eq!(state.ranked[0].profitability_score, 26.0);
        assert_eq!(state.ranked[1].profitability_score, 20.0);
    }

    #[tokio::test]
    async fn same_seed_same_discovery() {
        let run = |seed| async move {
            let p = LoadSearchPipeline::new(
                Arc::new(Taxonomy::default()),
                Arc::new(LoadBoard::sample()),
                Arc::new(RandomSource::seeded(seed)),
                SearchSettings::default(),
            );
            p.run("any loads?", "d1").await.expect("run").presented_ids(5)
        };
        assert_eq!(run(42).await, run(42).await);
    }

    #[test]
    fn score_display_keeps_one_decimal() {
        assert_eq!(display_score(45.0), "45.0");
        assert_eq!(display_score(52.65), "52.65");
    }
}
