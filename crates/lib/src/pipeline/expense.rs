//! Expense pipeline: parse an expense report, validate it against category ceilings, persist, reply.

use super::{timestamp_now, Pipeline, PipelineError, PipelineInput, Stage};
use crate::extract::{
    extract_amount, extract_location, extract_receipt, extract_vendor, synthetic_receipt, title_case,
};
use crate::intent::IntentClassifier;
use crate::money::format_rupees;
use crate::rng::RandomSource;
use crate::store::{write_outcome, DriverStore, ExpenseRecord};
use crate::taxonomy::{Taxonomy, OTHER_CATEGORY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

const SAMPLE_FORMAT: &str = "'Fuel expense ₹1500 at Delhi HP Pump'";

/// Categories where a missing location draws a warning.
const LOCATION_REQUIRED: [&str; 3] = ["fuel", "toll", "parking"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Passed,
    Warning,
    Failed,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseState {
    pub input: PipelineInput,
    pub expense_type: String,
    /// `0.0` when no amount was found.
    pub amount: f64,
    pub location: String,
    pub receipt_number: String,
    pub vendor_name: String,
    pub timestamp: String,
    pub trip_id: Option<String>,
    pub validation_status: ValidationStatus,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    /// 0.0..=100.0
    pub confidence_score: f64,
    /// Set once the record is persisted.
    pub expense_id: Option<String>,
    pub store_error: Option<String>,
    pub response: String,
}

impl ExpenseState {
    pub fn new(input: PipelineInput) -> Self {
        Self {
            input,
            expense_type: OTHER_CATEGORY.to_string(),
            amount: 0.0,
            location: String::new(),
            receipt_number: String::new(),
            vendor_name: String::new(),
            timestamp: String::new(),
            trip_id: None,
            validation_status: ValidationStatus::Pending,
            issues: Vec::new(),
            warnings: Vec::new(),
            confidence_score: 0.0,
            expense_id: None,
            store_error: None,
            response: String::new(),
        }
    }
}

/// Completeness score: amount 40, known category 20, receipt 15, location 15, vendor 10.
pub fn confidence_score(
    amount: f64,
    expense_type: &str,
    receipt_number: &str,
    location: &str,
    vendor_name: &str,
) -> f64 {
    let mut score = 0.0;
    if amount > 0.0 {
        score += 40.0;
    }
    if expense_type != OTHER_CATEGORY {
        score += 20.0;
    }
    if !receipt_number.is_empty() {
        score += 15.0;
    }
    if !location.is_empty() {
        score += 15.0;
    }
    if !vendor_name.is_empty() {
        score += 10.0;
    }
    score
}

fn expense_emoji(expense_type: &str) -> &'static str {
    match expense_type {
        "fuel" => "⛽",
        "toll" => "🛣️",
        "parking" => "🅿️",
        "maintenance" => "🔧",
        "food" => "🍽️",
        _ => "📝",
    }
}

struct Parse {
    classifier: Arc<IntentClassifier>,
    rng: Arc<RandomSource>,
}

#[async_trait]
impl Stage<ExpenseState> for Parse {
    fn name(&self) -> &'static str {
        "parse"
    }

    async fn run(&self, mut state: ExpenseState) -> Result<ExpenseState, PipelineError> {
        let text = &state.input.message;
        state.amount = extract_amount(text);
        state.expense_type = self.classifier.expense_category(text);
        state.location = extract_location(text);
        state.receipt_number = extract_receipt(text);
        if state.receipt_number.is_empty() && state.amount > 0.0 {
            state.receipt_number = synthetic_receipt(&self.rng);
        }
        state.vendor_name = extract_vendor(text);
        state.timestamp = timestamp_now();
        log::info!(
            "expense: type={} amount={} location={:?}",
            state.expense_type,
            state.amount,
            state.location
        );
        Ok(state)
    }
}

struct Validate {
    taxonomy: Arc<Taxonomy>,
}

#[async_trait]
impl Stage<ExpenseState> for Validate {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn run(&self, mut state: ExpenseState) -> Result<ExpenseState, PipelineError> {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        let kind = state.expense_type.as_str();

        if state.amount <= 0.0 {
            issues.push("Amount not found or invalid".to_string());
        } else if state.amount > self.taxonomy.ceiling_for(kind) {
            warnings.push(format!(
                "Amount seems high for {} ({})",
                kind,
                format_rupees(state.amount, 2)
            ));
        }
        if kind == "fuel" && state.amount < 100.0 {
            warnings.push("Fuel amount seems unusually low".to_string());
        }
        if kind == "toll" && state.amount > 2000.0 {
            warnings.push("Toll amount seems high - please verify".to_string());
        }
        if state.location.is_empty() && LOCATION_REQUIRED.contains(&kind) {
            warnings.push(
                "Location not specified - this may be required for reimbursement".to_string(),
            );
        }

        state.validation_status = if !issues.is_empty() {
            ValidationStatus::Failed
        } else if !warnings.is_empty() {
            ValidationStatus::Warning
        } else {
            ValidationStatus::Passed
        };
        state.confidence_score = confidence_score(
            state.amount,
            &state.expense_type,
            &state.receipt_number,
            &state.location,
            &state.vendor_name,
        );
        state.issues = issues;
        state.warnings = warnings;
        log::info!("expense: validation {}", state.validation_status);
        Ok(state)
    }
}

struct Persist {
    store: Arc<dyn DriverStore>,
}

#[async_trait]
impl Stage<ExpenseState> for Persist {
    fn name(&self) -> &'static str {
        "persist"
    }

    async fn run(&self, mut state: ExpenseState) -> Result<ExpenseState, PipelineError> {
        if state.validation_status == ValidationStatus::Failed {
            log::debug!("expense: validation failed, nothing to persist");
            return Ok(state);
        }
        let expense_id = format!("EXP_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let record = ExpenseRecord {
            expense_id: expense_id.clone(),
            driver_id: state.input.driver_id.clone(),
            expense_type: state.expense_type.clone(),
            amount: state.amount,
            location: state.location.clone(),
            vendor: state.vendor_name.clone(),
            receipt_number: state.receipt_number.clone(),
            timestamp: state.timestamp.clone(),
            trip_id: state.trip_id.clone(),
            validation_status: state.validation_status.to_string(),
            confidence_score: state.confidence_score,
        };
        match write_outcome(self.store.record_expense(record).await) {
            Ok(()) => {
                log::info!("expense: saved {}", expense_id);
                state.expense_id = Some(expense_id);
            }
            Err(e) => {
                log::warn!("expense: save for {} failed: {}", state.input.driver_id, e);
                state.store_error = Some(e);
            }
        }
        Ok(state)
    }
}

struct ComposeReply;

impl ComposeReply {
    fn failure(state: &ExpenseState) -> String {
        format!(
            "❌ **Expense Recording Failed**\n\nIssues found: {}\n\n\
             Please provide more details or try again with format:\n{}",
            state.issues.join(", "),
            SAMPLE_FORMAT
        )
    }

    fn success(state: &ExpenseState) -> String {
        let mut out = String::from("✅ **Expense Recorded Successfully!**\n\n");
        out.push_str(&format!(
            "{} **Type:** {}\n",
            expense_emoji(&state.expense_type),
            title_case(&state.expense_type)
        ));
        out.push_str(&format!("💰 **Amount:** {}\n", format_rupees(state.amount, 2)));
        if !state.location.is_empty() {
            out.push_str(&format!("📍 **Location:** {}\n", state.location));
        }
        if !state.vendor_name.is_empty() {
            out.push_str(&format!("🏪 **Vendor:** {}\n", state.vendor_name));
        }
        out.push_str(&format!("🧾 **Receipt #:** {}\n", state.receipt_number));
        out.push_str(&format!("⏰ **Time:** {}\n", state.timestamp));
        out.push_str(&format!("📊 **Confidence:** {:.1}%\n", state.confidence_score));
        if state.validation_status == ValidationStatus::Warning {
            out.push_str("\n⚠️ **Notices:**\n");
            for warning in &state.warnings {
                out.push_str(&format!("• {}\n", warning));
            }
        }
        if state.store_error.is_some() {
            out.push_str(
                "\n⚠️ Your expense could not be saved right now. Please send it again later.\n",
            );
        }
        out.push_str("\n💡 **Next Steps:**\n");
        out.push_str("• Expense added to your trip record\n");
        out.push_str("• Receipt will be processed for reimbursement\n");
        out.push_str("• Check monthly summary with 'expense report'");
        out
    }
}

#[async_trait]
impl Stage<ExpenseState> for ComposeReply {
    fn name(&self) -> &'static str {
        "compose_reply"
    }

    async fn run(&self, mut state: ExpenseState) -> Result<ExpenseState, PipelineError> {
        state.response = match state.validation_status {
            ValidationStatus::Failed => Self::failure(&state),
            ValidationStatus::Passed | ValidationStatus::Warning => Self::success(&state),
            ValidationStatus::Pending => {
                return Err(PipelineError::Stage {
                    stage: "compose_reply",
                    message: "expense reached reply without validation".to_string(),
                })
            }
        };
        Ok(state)
    }
}

/// parse → validate → persist → compose_reply
pub struct ExpensePipeline {
    pipeline: Pipeline<ExpenseState>,
}

impl ExpensePipeline {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        rng: Arc<RandomSource>,
        store: Arc<dyn DriverStore>,
    ) -> Self {
        let taxonomy = classifier.taxonomy().clone();
        let stages: Vec<Box<dyn Stage<ExpenseState>>> = vec![
            Box::new(Parse { classifier, rng }),
            Box::new(Validate { taxonomy }),
            Box::new(Persist { store }),
            Box::new(ComposeReply),
        ];
        Self {
            pipeline: Pipeline::new("expense", stages),
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    pub async fn run(&self, message: &str, driver_id: &str) -> Result<ExpenseState, PipelineError> {
        log::info!("expense: processing message from {}", driver_id);
        let state = ExpenseState::new(PipelineInput::new(message, driver_id));
        self.pipeline.run(state).await
    }
}
