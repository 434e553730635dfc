//! Persistent-store adapter contract.
//!
//! Writes report success as `Ok(true)`. Both `Ok(false)` and `Err(_)` are failures;
//! pipelines record them on their state and keep going.

mod memory;

pub use memory::MemoryStore;

use crate::driver::DriverStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Latest known status of a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStatusRecord {
    pub driver_id: String,
    pub status: DriverStatus,
    pub location: String,
    pub vehicle_type: String,
    pub last_updated: String,
}

/// One handled availability message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub driver_id: String,
    pub message: String,
    pub status: DriverStatus,
    pub reply: String,
    pub timestamp: String,
}

/// A validated expense as stored for reimbursement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub expense_id: String,
    pub driver_id: String,
    #[serde(rename = "type")]
    pub expense_type: String,
    pub amount: f64,
    pub location: String,
    pub vendor: String,
    pub receipt_number: String,
    pub timestamp: String,
    pub trip_id: Option<String>,
    pub validation_status: String,
    pub confidence_score: f64,
}

#[async_trait]
pub trait DriverStore: Send + Sync {
    async fn upsert_driver_status(&self, record: DriverStatusRecord) -> Result<bool, StoreError>;

    async fn record_interaction(&self, record: InteractionRecord) -> Result<bool, StoreError>;

    async fn record_expense(&self, record: ExpenseRecord) -> Result<bool, StoreError>;

    /// Last upserted status for a driver, if any.
    async fn driver_status(&self, driver_id: &str) -> Result<Option<DriverStatusRecord>, StoreError>;
}

/// Collapse the two failure shapes of a store write into one message.
pub fn write_outcome(result: Result<bool, StoreError>) -> Result<(), String> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err("store declined the write".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
