//! Client-side orchestration of a single trial-balance audit attempt.
//!
//! [`AuditOrchestrator`] drives one session through file ingestion, the
//! workbook and column-mapping gates, the remote audit call, and the
//! post-success benchmark and engagement continuations.

mod benchmark;
mod controller;
mod engagement;
pub mod error;
pub mod events;
mod executor;
mod ingestion;
mod mapping;
pub mod orchestrator;
pub mod overrides;
pub mod settings;
pub mod state;

pub use error::OrchestratorError;
pub use events::AuditEvent;
pub use orchestrator::{AuditOrchestrator, OrchestratorBuilder};
pub use overrides::InMemoryMappingOverrides;
pub use settings::SessionDefaults;
pub use state::{AuditPhase, AuditView};
