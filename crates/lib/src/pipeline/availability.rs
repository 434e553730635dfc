//! Availability pipeline: read the driver's status from the message, store it, reply, log the exchange.

use super::{timestamp_now, Pipeline, PipelineError, PipelineInput, Stage};
use crate::driver::DriverStatus;
use crate::extract::{extract_location, extract_status, extract_vehicle_type};
use crate::llm::{AvailabilityAnalysis, LlmAdapter, LlmError};
use crate::store::{write_outcome, DriverStatusRecord, DriverStore, InteractionRecord};
use crate::taxonomy::Taxonomy;
use async_trait::async_trait;
use std::sync::Arc;

/// Confidence assigned to keyword analysis.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const REASONING_FALLBACK: &str = "Fallback analysis due to AI error";
const REASONING_KEYWORDS: &str = "Keyword analysis";
const STORE_DEGRADED_NOTICE: &str =
    "⚠️ I couldn't save your status just now. Please send it again in a few minutes.";

#[derive(Debug, Clone)]
pub struct AvailabilityState {
    pub input: PipelineInput,
    pub status: DriverStatus,
    pub location: String,
    pub vehicle_type: String,
    /// 0.0..=1.0
    pub confidence: f64,
    pub reasoning: String,
    pub last_updated: String,
    /// Set when the status write failed.
    pub store_error: Option<String>,
    /// Set when logging the interaction failed.
    pub log_error: Option<String>,
    pub response: String,
}

impl AvailabilityState {
    pub fn new(input: PipelineInput) -> Self {
        Self {
            input,
            status: DriverStatus::Unknown,
            location: String::new(),
            vehicle_type: String::new(),
            confidence: 0.0,
            reasoning: String::new(),
            last_updated: String::new(),
            store_error: None,
            log_error: None,
            response: String::new(),
        }
    }
}

fn analysis_prompt(message: &str) -> String {
    format!(
        r#"You are an assistant for a logistics company in India. Analyze this driver message and extract availability information.

Driver Message: "{message}"

Extract:
1. status: "available", "busy" or "offline"
2. location: city or place mentioned, or empty string
3. vehicle_type: truck/trailer/tempo, or empty string
4. confidence: 0.0-1.0
5. reasoning: why you classified it this way

Indian logistics context: "free" and "khali" mean available; "load leke ja raha hun" and "trip pe hun" mean busy; "rest kar raha" means offline.

Respond only with JSON:
{{"status": "...", "location": "...", "vehicle_type": "...", "confidence": 0.8, "reasoning": "..."}}"#
    )
}

fn reply_prompt(state: &AvailabilityState) -> String {
    format!(
        "Write a reply to a truck driver in India.\n\
         Driver status: {}\nLocation: {}\nOriginal message: {}\n\
         Acknowledge the status clearly. Available: say we will find loads nearby. \
         Busy: wish a safe trip. Offline: acknowledge the break. \
         Mention the location if given. One or two sentences, Hindi and English mix.",
        state.status, state.location, state.input.message
    )
}

/// Canned reply per status.
pub fn canned_reply(status: DriverStatus, location: &str) -> String {
    match status {
        DriverStatus::Available if !location.is_empty() => format!(
            "✅ Great! Marked you as AVAILABLE at {}. We'll notify you of nearby loads.",
            location
        ),
        DriverStatus::Available => {
            "✅ Great! Marked you as AVAILABLE. We'll notify you when loads come up.".to_string()
        }
        DriverStatus::Busy => {
            "📍 Understood. Marked you as BUSY. Focus on your current trip safely!".to_string()
        }
        DriverStatus::Offline => {
            "😴 Got it. Marked you as OFFLINE. Take rest and message when ready for work."
                .to_string()
        }
        DriverStatus::Unknown => {
            "❓ I didn't understand your availability status. Try saying 'I'm free' or 'I'm busy'."
                .to_string()
        }
    }
}

struct Parse {
    llm: Arc<dyn LlmAdapter>,
    taxonomy: Arc<Taxonomy>,
}

impl Parse {
    fn apply_analysis(state: &mut AvailabilityState, analysis: AvailabilityAnalysis, status: DriverStatus) {
        state.status = status;
        state.location = analysis.location.trim().to_string();
        state.vehicle_type = analysis.vehicle_type.trim().to_lowercase();
        state.confidence = analysis.confidence.clamp(0.0, 1.0);
        state.reasoning = analysis.reasoning;
    }

    fn apply_keywords(&self, state: &mut AvailabilityState, reasoning: &str) {
        let text = &state.input.message;
        state.status = extract_status(text, &self.taxonomy.status);
        state.location = extract_location(text);
        state.vehicle_type =
            extract_vehicle_type(text, &self.taxonomy.vehicle_types).unwrap_or_default();
        state.confidence = FALLBACK_CONFIDENCE;
        state.reasoning = reasoning.to_string();
    }
}

#[async_trait]
impl Stage<AvailabilityState> for Parse {
    fn name(&self) -> &'static str {
        "parse"
    }

    async fn run(&self, mut state: AvailabilityState) -> Result<AvailabilityState, PipelineError> {
        let result = self.llm.analyze(&analysis_prompt(&state.input.message)).await;
        match result {
            Ok(analysis) => match analysis.status.parse::<DriverStatus>() {
                Ok(status) => Self::apply_analysis(&mut state, analysis, status),
                Err(e) => {
                    log::warn!("availability: llm analysis unusable ({}), using keywords", e);
                    self.apply_keywords(&mut state, REASONING_FALLBACK);
                }
            },
            Err(LlmError::Disabled) => self.apply_keywords(&mut state, REASONING_KEYWORDS),
            Err(e) => {
                log::warn!("availability: llm analysis failed ({}), using keywords", e);
                self.apply_keywords(&mut state, REASONING_FALLBACK);
            }
        }
        log::info!(
            "availability: driver {} status={} location={:?}",
            state.input.driver_id,
            state.status,
            state.location
        );
        Ok(state)
    }
}

struct UpdateStore {
    store: Arc<dyn DriverStore>,
}

#[async_trait]
impl Stage<AvailabilityState> for UpdateStore {
    fn name(&self) -> &'static str {
        "update_store"
    }

    async fn run(&self, mut state: AvailabilityState) -> Result<AvailabilityState, PipelineError> {
        state.last_updated = timestamp_now();
        let record = DriverStatusRecord {
            driver_id: state.input.driver_id.clone(),
            status: state.status,
            location: state.location.clone(),
            vehicle_type: state.vehicle_type.clone(),
            last_updated: state.last_updated.clone(),
        };
        if let Err(e) = write_outcome(self.store.upsert_driver_status(record).await) {
            log::warn!(
                "availability: status update for {} failed: {}",
                state.input.driver_id,
                e
            );
            state.store_error = Some(e);
        }
        Ok(state)
    }
}

struct ComposeReply {
    llm: Arc<dyn LlmAdapter>,
}

#[async_trait]
impl Stage<AvailabilityState> for ComposeReply {
    fn name(&self) -> &'static str {
        "compose_reply"
    }

    async fn run(&self, mut state: AvailabilityState) -> Result<AvailabilityState, PipelineError> {
        let reply = match self.llm.generate(&reply_prompt(&state)).await {
            Ok(text) => text,
            Err(LlmError::Disabled) => canned_reply(state.status, &state.location),
            Err(e) => {
                log::warn!("availability: reply generation failed ({}), using canned reply", e);
                canned_reply(state.status, &state.location)
            }
        };
        state.response = match state.store_error {
            Some(_) => format!("{}\n{}", STORE_DEGRADED_NOTICE, reply),
            None => reply,
        };
        Ok(state)
    }
}

struct LogInteraction {
    store: Arc<dyn DriverStore>,
}

#[async_trait]
impl Stage<AvailabilityState> for LogInteraction {
    fn name(&self) -> &'static str {
        "log_interaction"
    }

    async fn run(&self, mut state: AvailabilityState) -> Result<AvailabilityState, PipelineError> {
        let record = InteractionRecord {
            driver_id: state.input.driver_id.clone(),
            message: state.input.message.clone(),
            status: state.status,
            reply: state.response.clone(),
            timestamp: timestamp_now(),
        };
        if let Err(e) = write_outcome(self.store.record_interaction(record).await) {
            log::warn!("availability: interaction log failed: {}", e);
            state.log_error = Some(e);
        }
        Ok(state)
    }
}

/// parse → update_store → compose_reply → log_interaction
pub struct AvailabilityPipeline {
    pipeline: Pipeline<AvailabilityState>,
}

impl AvailabilityPipeline {
    pub fn new(
        taxonomy: Arc<Taxonomy>,
        llm: Arc<dyn LlmAdapter>,
        store: Arc<dyn DriverStore>,
    ) -> Self {
        let stages: Vec<Box<dyn Stage<AvailabilityState>>> = vec![
            Box::new(Parse {
                llm: llm.clone(),
                taxonomy,
            }),
            Box::new(UpdateStore {
                store: store.clone(),
            }),
            Box::new(ComposeReply { llm }),
            Box::new(LogInteraction { store }),
        ];
        Self {
            pipeline: Pipeline::new("availability", stages),
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    pub async fn run(&self, message: &str, driver_id: &str) -> Result<AvailabilityState, PipelineError> {
        log::info!("availability: processing message from {}", driver_id);
        let state = AvailabilityState::new(PipelineInput::new(message, driver_id));
        self.pipeline.run(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledLlm;
    use crate::store::{ExpenseRecord, MemoryStore, StoreError};

    struct DownStore;

    #[async_trait]
    impl DriverStore for DownStore {
        async fn upsert_driver_status(&self, _r: DriverStatusRecord) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn record_interaction(&self, _r: InteractionRecord) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn record_expense(&self, _r: ExpenseRecord) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn driver_status(&self, _id: &str) -> Result<Option<DriverStatusRecord>, StoreError> {
            Ok(None)
        }
    }

    struct ScriptedLlm {
        analysis: Result<AvailabilityAnalysis, String>,
        reply: Result<String, String>,
    }

    #[async_trait]
    impl LlmAdapter for ScriptedLlm {
        async fn analyze(&self, _prompt: &str) -> Result<AvailabilityAnalysis, LlmError> {
            self.analysis.clone().map_err(LlmError::Api)
        }
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.reply.clone().map_err(LlmError::Api)
        }
    }

    fn pipeline(llm: Arc<dyn LlmAdapter>, store: Arc<dyn DriverStore>) -> AvailabilityPipeline {
        AvailabilityPipeline::new(Arc::new(Taxonomy::default()), llm, store)
    }

    #[test]
    fn stage_order_is_fixed() {
        let p = pipeline(Arc::new(DisabledLlm), Arc::new(MemoryStore::new()));
        assert_eq!(
            p.stage_names(),
            vec!["parse", "update_store", "compose_reply", "log_interaction"]
        );
    }

    #[tokio::test]
    async fn keyword_path_marks_busy_and_stores() {
        let store = MemoryStore::new();
        let p = pipeline(Arc::new(DisabledLlm), Arc::new(store.clone()));
        let state = p.run("I am busy with a trip", "d2").await.expect("run");
        assert_eq!(state.status, DriverStatus::Busy);
        assert_eq!(state.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(state.reasoning, REASONING_KEYWORDS);
        assert!(state.response.contains("BUSY"));
        assert!(!state.last_updated.is_empty());

        let stored = store.driver_status("d2").await.unwrap().expect("stored");
        assert_eq!(stored.status, DriverStatus::Busy);
        assert_eq!(store.interactions_for("d2").await.len(), 1);
    }

    #[tokio::test]
    async fn available_with_location() {
        let p = pipeline(Arc::new(DisabledLlm), Arc::new(MemoryStore::new()));
        let state = p.run("I am free and available at Delhi", "d1").await.expect("run");
        assert_eq!(state.status, DriverStatus::Available);
        assert_eq!(state.location, "Delhi");
        assert!(state.response.contains("AVAILABLE at Delhi"));
    }

    #[tokio::test]
    async fn unknown_status_asks_again() {
        let p = pipeline(Arc::new(DisabledLlm), Arc::new(MemoryStore::new()));
        let state = p.run("status?", "d1").await.expect("run");
        assert_eq!(state.status, DriverStatus::Unknown);
        assert!(state.response.starts_with("❓"));
    }

    #[tokio::test]
    async fn llm_analysis_and_reply_are_used_when_available() {
        let llm = ScriptedLlm {
            analysis: Ok(AvailabilityAnalysis {
                status: "available".into(),
                location: "Chennai".into(),
                vehicle_type: "Truck".into(),
                confidence: 0.93,
                reasoning: "khali means available".into(),
            }),
            reply: Ok("Bahut badhiya! Chennai mein loads dhoondte hain.".into()),
        };
        let p = pipeline(Arc::new(llm), Arc::new(MemoryStore::new()));
        let state = p.run("Khali hun Chennai mein", "d9").await.expect("run");
        assert_eq!(state.status, DriverStatus::Available);
        assert_eq!(state.location, "Chennai");
        assert_eq!(state.vehicle_type, "truck");
        assert_eq!(state.confidence, 0.93);
        assert_eq!(state.response, "Bahut badhiya! Chennai mein loads dhoondte hain.");
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_keywords() {
        let llm = ScriptedLlm {
            analysis: Err("quota exceeded".into()),
            reply: Err("quota exceeded".into()),
        };
        let p = pipeline(Arc::new(llm), Arc::new(MemoryStore::new()));
        let state = p.run("Going offline for rest", "d3").await.expect("run");
        assert_eq!(state.status, DriverStatus::Offline);
        assert_eq!(state.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(state.reasoning, REASONING_FALLBACK);
        assert!(state.response.contains("OFFLINE"));
    }

    #[tokio::test]
    async fn unusable_llm_status_falls_back() {
        let llm = ScriptedLlm {
            analysis: Ok(AvailabilityAnalysis {
                status: "sleeping".into(),
                ..Default::default()
            }),
            reply: Err("down".into()),
        };
        let p = pipeline(Arc::new(llm), Arc::new(MemoryStore::new()));
        let state = p.run("ready for work", "d4").await.expect("run");
        assert_eq!(state.status, DriverStatus::Available);
        assert_eq!(state.reasoning, REASONING_FALLBACK);
    }

    #[tokio::test]
    async fn store_failure_degrades_reply_but_completes() {
        let p = pipeline(Arc::new(DisabledLlm), Arc::new(DownStore));
        let state = p.run("I am free", "d5").await.expect("run");
        assert_eq!(state.status, DriverStatus::Available);
        assert!(state.store_error.as_deref().unwrap().contains("connection refused"));
        assert!(state.log_error.is_some());
        assert!(state.response.starts_with(STORE_DEGRADED_NOTICE));
        assert!(state.response.contains("AVAILABLE"));
    }
}
