//! Response envelope returned by the router for every message.
//!
//! Serialized field names are a stable contract with callers:
//! `type`, `status`, `response`, `routed_to`, `driver_id`, `timestamp`, an optional `error`,
//! and the category-specific fields flattened into the same object.

use crate::driver::DriverStatus;
use crate::intent::Intent;
use crate::pipeline::{timestamp_now, AvailabilityState, ExpenseState, LoadSearchState, ValidationStatus};
use serde::Serialize;

/// Value of the envelope's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Availability,
    LoadSearch,
    ExpenseTracking,
    General,
    Error,
}

impl From<Intent> for EnvelopeKind {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Availability => Self::Availability,
            Intent::LoadSearch => Self::LoadSearch,
            Intent::ExpenseTracking => Self::ExpenseTracking,
            Intent::General => Self::General,
        }
    }
}

/// Value of the envelope's `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityDetails {
    pub driver_status: DriverStatus,
    pub location: String,
    pub vehicle_type: String,
    pub confidence: f64,
    pub reasoning: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSearchDetails {
    pub query: String,
    pub source: String,
    pub destination: String,
    pub vehicle_type: String,
    pub loads_found: usize,
    /// Ids of the loads shown in the reply.
    pub loads: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseDetails {
    pub expense_type: String,
    pub amount: f64,
    pub location: String,
    pub vendor: String,
    pub receipt_number: String,
    pub validation_status: ValidationStatus,
    pub confidence_score: f64,
    pub warnings: Vec<String>,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_id: Option<String>,
}

/// Category-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Details {
    Availability(AvailabilityDetails),
    LoadSearch(LoadSearchDetails),
    Expense(ExpenseDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub status: Outcome,
    pub response: String,
    pub routed_to: Intent,
    pub driver_id: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: Option<Details>,
}

const GENERAL_CAPABILITIES: &str = "I can help you with:\n\
    • **Driver availability** (say 'I'm free' or 'I'm busy')\n\
    • **Load search** (say 'loads from Delhi to Mumbai')\n\
    • **Expense tracking** (say 'fuel expense ₹2500 at Delhi')\n\n\
    How can I assist you today?";

impl Envelope {
    pub fn availability(state: &AvailabilityState) -> Self {
        Self {
            kind: EnvelopeKind::Availability,
            status: Outcome::Success,
            response: state.response.clone(),
            routed_to: Intent::Availability,
            driver_id: state.input.driver_id.clone(),
            timestamp: timestamp_now(),
            error: None,
            details: Some(Details::Availability(AvailabilityDetails {
                driver_status: state.status,
                location: state.location.clone(),
                vehicle_type: state.vehicle_type.clone(),
                confidence: state.confidence,
                reasoning: state.reasoning.clone(),
                updated_at: state.last_updated.clone(),
            })),
        }
    }

    pub fn load_search(state: &LoadSearchState, presented: usize) -> Self {
        Self {
            kind: EnvelopeKind::LoadSearch,
            status: Outcome::Success,
            response: state.response.clone(),
            routed_to: Intent::LoadSearch,
            driver_id: state.input.driver_id.clone(),
            timestamp: timestamp_now(),
            error: None,
            details: Some(Details::LoadSearch(LoadSearchDetails {
                query: state.input.message.clone(),
                source: state.source.clone(),
                destination: state.destination.clone(),
                vehicle_type: state.vehicle_type.clone(),
                loads_found: state.ranked.len(),
                loads: state.presented_ids(presented),
            })),
        }
    }

    /// `failed` when validation failed, `success` otherwise (warnings included).
    pub fn expense(state: &ExpenseState) -> Self {
        let status = match state.validation_status {
            ValidationStatus::Failed => Outcome::Failed,
            _ => Outcome::Success,
        };
        Self {
            kind: EnvelopeKind::ExpenseTracking,
            status,
            response: state.response.clone(),
            routed_to: Intent::ExpenseTracking,
            driver_id: state.input.driver_id.clone(),
            timestamp: if state.timestamp.is_empty() {
                timestamp_now()
            } else {
                state.timestamp.clone()
            },
            error: None,
            details: Some(Details::Expense(ExpenseDetails {
                expense_type: state.expense_type.clone(),
                amount: state.amount,
                location: state.location.clone(),
                vendor: state.vendor_name.clone(),
                receipt_number: state.receipt_number.clone(),
                validation_status: state.validation_status,
                confidence_score: state.confidence_score,
                warnings: state.warnings.clone(),
                issues: state.issues.clone(),
                expense_id: state.expense_id.clone(),
            })),
        }
    }

    /// Capability overview for messages that fit no category.
    pub fn general(message: &str, driver_id: &str) -> Self {
        Self {
            kind: EnvelopeKind::General,
            status: Outcome::Success,
            response: format!(
                "👋 I understand you said: '{}'. \n\n{}",
                message, GENERAL_CAPABILITIES
            ),
            routed_to: Intent::General,
            driver_id: driver_id.to_string(),
            timestamp: timestamp_now(),
            error: None,
            details: None,
        }
    }

    /// Apology envelope for a pipeline that failed. Keeps the detected intent.
    ///
    /// Status is `error`, not `failed`: `failed` is reserved for expenses that did not
    /// pass validation, so callers can tell a rejected request from a broken one.
    pub fn error(intent: Intent, driver_id: &str, error: impl Into<String>, apology: &str) -> Self {
        Self {
            kind: EnvelopeKind::Error,
            status: Outcome::Error,
            response: apology.to_string(),
            routed_to: intent,
            driver_id: driver_id.to_string(),
            timestamp: timestamp_now(),
            error: Some(error.into()),
            details: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == EnvelopeKind::Error
    }
}
