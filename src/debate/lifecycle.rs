//! Which debate types may be generated at which point of a match.
//!
//! | phase        | pre_match | post_match |
//! |--------------|-----------|------------|
//! | NotStarted   | allowed   | rejected   |
//! | InProgress   | allowed   | rejected   |
//! | Finished     | rejected  | allowed    |
//! | Void         | rejected  | rejected   |
//! | Unrecognized | rejected  | rejected   |
//!
//! A rejection is an answer, not a failure: callers may poll until the
//! match reaches the right phase.

use serde::Serialize;

use super::model::DebateType;
use crate::freshness::{MatchPhase, MatchStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleRejection {
    pub phase: MatchPhase,
    pub status: String,
    pub message: String,
}

/// `Ok(())` if a debate of `debate_type` may be generated for a match in `status`.
pub fn check(status: &MatchStatus, debate_type: DebateType) -> Result<(), LifecycleRejection> {
    let phase = status.phase();
    let message = match (phase, debate_type) {
        (MatchPhase::NotStarted | MatchPhase::InProgress, DebateType::PreMatch) => return Ok(()),
        (MatchPhase::Finished, DebateType::PostMatch) => return Ok(()),
        (MatchPhase::NotStarted, DebateType::PostMatch) => format!(
            "Post-match debates are available once the match has finished; it has not started yet (status {status})"
        ),
        (MatchPhase::InProgress, DebateType::PostMatch) => format!(
            "Post-match debates are available once the match has finished; it is still in progress (status {status})"
        ),
        (MatchPhase::Finished, DebateType::PreMatch) => format!(
            "Pre-match debates cannot be created after the match has finished (status {status})"
        ),
        (MatchPhase::Void, _) => format!(
            "Match was not played out (status {status}); no {debate_type} debate can be generated"
        ),
        (MatchPhase::Unrecognized, _) => format!(
            "Match status '{status}' is not recognized; no {debate_type} debate can be generated until it is"
        ),
    };

    Err(LifecycleRejection {
        phase,
        status: status.code().to_string(),
        message,
    })
}
