//! scribe-learning - learns how a user edits AI-refined dictation
//!
//! Corrections the user makes to refined text are turned into literal phrase
//! patterns and scalar style preferences, which are then applied to future
//! refinements. Learning data lives in a remote backend; when it cannot be
//! reached, writes wait in a durable offline queue and the engine keeps working
//! from its local cache.
//!
//! # Modules
//!
//! - [`extract`] - Phrase-level change extraction
//! - [`patterns`] - Pattern store with confidence tracking
//! - [`preferences`] - Preference estimation and text adjustment
//! - [`decision`] - When to ask for feedback
//! - [`engine`] - The orchestrator tying it all together
//! - [`queue`] - Durable offline write queue
//! - [`backend`] - Remote storage trait and implementations

pub mod backend;
pub mod cache;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod extract;
pub mod paths;
pub mod patterns;
pub mod preferences;
pub mod queue;
mod remote;
pub mod text;
pub mod types;

pub use backend::{LearningBackend, MemoryBackend, RestBackend, RestBackendConfig};
pub use config::{BackendSettings, LearningConfig};
pub use decision::{Decision, DecisionEngine};
pub use engine::{AbOption, LearningEngine, LearningStats, ReplayHandle};
pub use error::{BackendError, LearningError, Result};
pub use extract::{extract_changes, is_significant, significant_changes};
pub use patterns::PatternStore;
pub use preferences::{PreferenceDeltas, PreferenceEstimator};
pub use queue::{Mutation, OfflineOperation, OfflineQueue, OperationType, ReplayReport};
pub use types::*;
