//! Debates: lifecycle rules, generation, engagement and the service tying them together.

pub mod engagement;
pub mod lifecycle;
pub mod locks;
pub mod model;
pub mod prompt;
pub mod service;

pub use lifecycle::LifecycleRejection;
pub use model::{DebateType, Stance, VoteType};
pub use service::{DebateDraft, DebateService, GenerationOutcome, PreviewOutcome};
