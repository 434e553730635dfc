//! Haul core library: intent routing and task pipelines for truck-driver chat messages,
//! used by the CLI and by any messaging transport.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod envelope;
pub mod extract;
pub mod init;
pub mod intent;
pub mod llm;
pub mod loads;
pub mod money;
pub mod pipeline;
pub mod rng;
pub mod routing;
pub mod store;
pub mod taxonomy;
