//! Journal replay loader
//!
//! Discovers wired store services whose journals can be replayed, replays
//! each into a fresh document store adapter on a task queue, and reports
//! the outcome per service.

mod agent;
mod candidate;
mod config;
mod errors;
mod layers;
mod queue;
mod report;

pub use agent::{HealthCheck, JournalLoader, NoopHealthCheck};
pub use candidate::{CandidateRegistry, FileCandidateRegistry, ServiceCandidate};
pub use config::LoaderConfig;
pub use errors::{LoaderError, LoaderResult, ReplayError};
pub use layers::{
    find_eligible, ConfiguredLayer, JournalType, LiveService, ProxyLayer, ServiceDirectory,
    SkipReason, StoreConfiguration, StoreLayer,
};
pub use queue::{QueuePolicy, Task, TaskQueue};
pub use report::{ReplayReport, ReportBuilder};
