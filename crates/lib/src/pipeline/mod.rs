//! Stage pipelines: a fixed, linear list of stages threaded over one owned state value.
//!
//! ```text
//! availability:  parse → update_store → compose_reply → log_interaction
//! load_search:   parse_query → search_candidates → rank_candidates → compose_reply
//! expense:       parse → validate → persist → compose_reply
//! ```
//!
//! Each stage takes the state by value and hands back the next one. Stages that talk to
//! an adapter absorb its failures into the state; a stage only returns `Err` for a bug-level
//! condition, which aborts the run and surfaces as an error envelope at the router.

pub mod availability;
pub mod expense;
pub mod load_search;

pub use availability::{AvailabilityPipeline, AvailabilityState};
pub use expense::{ExpensePipeline, ExpenseState, ValidationStatus};
pub use load_search::{LoadSearchPipeline, LoadSearchState, ScoredLoad};

use async_trait::async_trait;
use std::time::Instant;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error("stage {stage} failed: {message}")]
    Stage { stage: &'static str, message: String },
}

/// The message a pipeline run was started for. Set once, never changed by stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInput {
    pub message: String,
    pub driver_id: String,
}

impl PipelineInput {
    pub fn new(message: impl Into<String>, driver_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            driver_id: driver_id.into(),
        }
    }
}

/// One step of a pipeline.
#[async_trait]
pub trait Stage<S: Send + 'static>: Send + Sync {
    /// Short stage name used in logs and errors (e.g. "parse").
    fn name(&self) -> &'static str;

    async fn run(&self, state: S) -> Result<S, PipelineError>;
}

/// Runs its stages in order, each consuming the previous stage's output.
pub struct Pipeline<S: Send + 'static> {
    name: &'static str,
    stages: Vec<Box<dyn Stage<S>>>,
}

impl<S: Send + 'static> Pipeline<S> {
    pub fn new(name: &'static str, stages: Vec<Box<dyn Stage<S>>>) -> Self {
        Self { name, stages }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, initial: S) -> Result<S, PipelineError> {
        let mut state = initial;
        for stage in &self.stages {
            let start = Instant::now();
            log::debug!("{}: stage {} starting", self.name, stage.name());
            state = stage.run(state).await.inspect_err(|e| {
                log::warn!("{}: {}", self.name, e);
            })?;
            log::debug!(
                "{}: stage {} done in {} ms",
                self.name,
                stage.name(),
                start.elapsed().as_millis()
            );
        }
        Ok(state)
    }
}

/// Local wall-clock time as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Push {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Stage<Vec<&'static str>> for Push {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, mut state: Vec<&'static str>) -> Result<Vec<&'static str>, PipelineError> {
            self.seen.lock().unwrap().push(self.name);
            state.push(self.name);
            Ok(state)
        }
    }

    struct Fail;

    #[async_trait]
    impl Stage<Vec<&'static str>> for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        async fn run(&self, _state: Vec<&'static str>) -> Result<Vec<&'static str>, PipelineError> {
            Err(PipelineError::Stage {
                stage: "fail",
                message: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn stages_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stage = |name| -> Box<dyn Stage<Vec<&'static str>>> {
            Box::new(Push {
                name,
                seen: seen.clone(),
            })
        };
        let p = Pipeline::new("test", vec![stage("a"), stage("b"), stage("c")]);
        assert_eq!(p.stage_names(), vec!["a", "b", "c"]);
        let out = p.run(Vec::new()).await.expect("run");
        assert_eq!(out, vec!["a", "b", "c"]);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn failing_stage_stops_the_run() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let p: Pipeline<Vec<&'static str>> = Pipeline::new(
            "test",
            vec![
                Box::new(Fail),
                Box::new(Push {
                    name: "after",
                    seen: seen.clone(),
                }),
            ],
        );
        let err = p.run(Vec::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "stage fail failed: boom");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn timestamp_format() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }
}
