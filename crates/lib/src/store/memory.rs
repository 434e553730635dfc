//! In-memory store: driver statuses keyed by id plus append-only interaction and expense logs.

use super::{DriverStatusRecord, DriverStore, ExpenseRecord, InteractionRecord, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local store. Cloning shares the same data.
#[derive(Clone)]
pub struct MemoryStore {
    drivers: Arc<RwLock<HashMap<String, DriverStatusRecord>>>,
    interactions: Arc<RwLock<Vec<InteractionRecord>>>,
    expenses: Arc<RwLock<Vec<ExpenseRecord>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            drivers: Arc::new(RwLock::new(HashMap::new())),
            interactions: Arc::new(RwLock::new(Vec::new())),
            expenses: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Interactions recorded for a driver, oldest first.
    pub async fn interactions_for(&self, driver_id: &str) -> Vec<InteractionRecord> {
        self.interactions
            .read()
            .await
            .iter()
            .filter(|r| r.driver_id == driver_id)
            .cloned()
            .collect()
    }

    /// Expenses recorded for a driver, oldest first.
    pub async fn expenses_for(&self, driver_id: &str) -> Vec<ExpenseRecord> {
        self.expenses
            .read()
            .await
            .iter()
            .filter(|r| r.driver_id == driver_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DriverStore for MemoryStore {
    async fn upsert_driver_status(&self, record: DriverStatusRecord) -> Result<bool, StoreError> {
        self.drivers
            .write()
            .await
            .insert(record.driver_id.clone(), record);
        Ok(true)
    }

    async fn record_interaction(&self, record: InteractionRecord) -> Result<bool, StoreError> {
        self.interactions.write().await.push(record);
        Ok(true)
    }

    async fn record_expense(&self, record: ExpenseRecord) -> Result<bool, StoreError> {
        self.expenses.write().await.push(record);
        Ok(true)
    }

    async fn driver_status(&self, driver_id: &str) -> Result<Option<DriverStatusRecord>, StoreError> {
        Ok(self.drivers.read().await.get(driver_id).cloned())
    }
}
