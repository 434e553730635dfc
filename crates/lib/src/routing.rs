//! Intent router: classify an inbound message, run the matching pipeline, wrap the result in an envelope.
//!
//! `route` never fails. A pipeline error or a panic inside a pipeline becomes an error envelope
//! that still carries the detected intent and the sender id.

use crate::config::{resolve_llm_base_url, Config};
use crate::envelope::Envelope;
use crate::intent::{Intent, IntentClassifier};
use crate::llm::{DisabledLlm, LlmAdapter, OllamaAdapter, OllamaClient};
use crate::loads::LoadBoard;
use crate::pipeline::load_search::SearchSettings;
use crate::pipeline::{AvailabilityPipeline, ExpensePipeline, LoadSearchPipeline, PipelineError};
use crate::rng::RandomSource;
use crate::store::{DriverStatusRecord, DriverStore, StoreError};
use crate::taxonomy::Taxonomy;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Everything a router is built from.
pub struct RouterParts {
    pub taxonomy: Arc<Taxonomy>,
    pub llm: Arc<dyn LlmAdapter>,
    pub store: Arc<dyn DriverStore>,
    pub board: Arc<LoadBoard>,
    pub rng: Arc<RandomSource>,
    pub search: SearchSettings,
    pub default_driver_id: String,
    pub apology: String,
}

pub struct IntentRouter {
    classifier: Arc<IntentClassifier>,
    availability: AvailabilityPipeline,
    load_search: LoadSearchPipeline,
    expense: ExpensePipeline,
    store: Arc<dyn DriverStore>,
    default_driver_id: String,
    apology: String,
}

impl IntentRouter {
    pub fn new(parts: RouterParts) -> Self {
        let classifier = Arc::new(IntentClassifier::new(parts.taxonomy.clone()));
        Self {
            availability: AvailabilityPipeline::new(
                parts.taxonomy.clone(),
                parts.llm,
                parts.store.clone(),
            ),
            load_search: LoadSearchPipeline::new(
                parts.taxonomy,
                parts.board,
                parts.rng.clone(),
                parts.search,
            ),
            expense: ExpensePipeline::new(classifier.clone(), parts.rng, parts.store.clone()),
            classifier,
            store: parts.store,
            default_driver_id: parts.default_driver_id,
            apology: parts.apology,
        }
    }

    /// Router over the sample load board with the configured tables, LLM and seed.
    pub fn from_config(config: &Config, store: Arc<dyn DriverStore>) -> Self {
        let llm: Arc<dyn LlmAdapter> = if config.llm.enabled {
            let client = OllamaClient::new(Some(resolve_llm_base_url(config)));
            log::info!(
                "llm enabled: model {} at {}",
                config.llm.model,
                client.base_url()
            );
            Arc::new(OllamaAdapter::new(client, config.llm.model.clone()))
        } else {
            Arc::new(DisabledLlm)
        };
        Self::new(RouterParts {
            taxonomy: Arc::new(config.taxonomy.clone()),
            llm,
            store,
            board: Arc::new(LoadBoard::sample()),
            rng: Arc::new(RandomSource::from_seed_option(config.load_search.seed)),
            search: config.load_search.settings(),
            default_driver_id: config.router.default_driver_id.clone(),
            apology: config.router.apology.clone(),
        })
    }

    pub fn classify(&self, message: &str) -> Intent {
        self.classifier.classify(message)
    }

    /// Route one message. A blank `driver_id` is replaced by the configured default.
    pub async fn route(&self, message: &str, driver_id: &str) -> Envelope {
        let driver_id = if driver_id.trim().is_empty() {
            self.default_driver_id.as_str()
        } else {
            driver_id
        };
        let intent = self.classify(message);
        log::info!("routing message from {} to {}", driver_id, intent);

        match AssertUnwindSafe(self.dispatch(intent, message, driver_id))
            .catch_unwind()
            .await
        {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(e)) => {
                log::error!("{} pipeline failed for {}: {}", intent, driver_id, e);
                Envelope::error(intent, driver_id, e.to_string(), &self.apology)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("{} pipeline panicked for {}: {}", intent, driver_id, message);
                Envelope::error(intent, driver_id, message, &self.apology)
            }
        }
    }

    /// Last stored status for a driver.
    pub async fn driver_status(&self, driver_id: &str) -> Result<Option<DriverStatusRecord>, StoreError> {
        self.store.driver_status(driver_id).await
    }

    pub fn default_driver_id(&self) -> &str {
        &self.default_driver_id
    }

    async fn dispatch(&self, intent: Intent, message: &str, driver_id: &str) -> Result<Envelope, PipelineError> {
        let envelope = match intent {
            Intent::Availability => {
                Envelope::availability(&self.availability.run(message, driver_id).await?)
            }
            Intent::LoadSearch => {
                let state = self.load_search.run(message, driver_id).await?;
                Envelope::load_search(&state, self.load_search.settings().presented)
            }
            Intent::ExpenseTracking => Envelope::expense(&self.expense.run(message, driver_id).await?),
            Intent::General => Envelope::general(message, driver_id),
        };
        Ok(envelope)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EnvelopeKind, Outcome};
    use crate::llm::{AvailabilityAnalysis, LlmError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct PanickingLlm;

    #[async_trait]
    impl LlmAdapter for PanickingLlm {
        async fn analyze(&self, _prompt: &str) -> Result<AvailabilityAnalysis, LlmError> {
            panic!("model exploded");
        }
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            panic!("model exploded");
        }
    }

    fn router_with(llm: Arc<dyn LlmAdapter>) -> IntentRouter {
        IntentRouter::new(RouterParts {
            taxonomy: Arc::new(Taxonomy::default()),
            llm,
            store: Arc::new(MemoryStore::new()),
            board: Arc::new(LoadBoard::sample()),
            rng: Arc::new(RandomSource::seeded(5)),
            search: SearchSettings {
                discovery_probability: 0.0,
                ..SearchSettings::default()
            },
            default_driver_id: "driver_123".to_string(),
            apology: "sorry".to_string(),
        })
    }

    #[tokio::test]
    async fn general_message_gets_capabilities() {
        let router = router_with(Arc::new(DisabledLlm));
        let env = router.route("Hello, how are you?", "d1").await;
        assert_eq!(env.kind, EnvelopeKind::General);
        assert_eq!(env.routed_to, Intent::General);
        assert_eq!(env.status, Outcome::Success);
        assert_eq!(env.driver_id, "d1");
    }

    #[tokio::test]
    async fn blank_driver_uses_default() {
        let router = router_with(Arc::new(DisabledLlm));
        let env = router.route("hello", "  ").await;
        assert_eq!(env.driver_id, "driver_123");
    }

    #[tokio::test]
    async fn panic_in_pipeline_becomes_error_envelope() {
        let router = router_with(Arc::new(PanickingLlm));
        let env = router.route("I am free", "d3").await;
        assert_eq!(env.kind, EnvelopeKind::Error);
        assert_eq!(env.status, Outcome::Error);
        assert_eq!(env.routed_to, Intent::Availability);
        assert_eq!(env.driver_id, "d3");
        assert_eq!(env.response, "sorry");
        assert_eq!(env.error.as_deref(), Some("model exploded"));
    }

    #[tokio::test]
    async fn availability_updates_status_lookup() {
        let router = router_with(Arc::new(DisabledLlm));
        router.route("Currently busy with delivery", "d4").await;
        let record = router.driver_status("d4").await.unwrap().expect("status");
        assert_eq!(record.status, crate::driver::DriverStatus::Busy);
        assert!(router.driver_status("nobody").await.unwrap().is_none());
    }

    #[test]
    fn from_config_defaults_to_disabled_llm() {
        let router = IntentRouter::from_config(&Config::default(), Arc::new(MemoryStore::new()));
        assert_eq!(router.default_driver_id(), "driver_123");
        assert_eq!(router.classify("Fuel expense 3000 rupees"), Intent::ExpenseTracking);
    }
}
