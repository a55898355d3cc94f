//! Service-level error taxonomy.
//!
//! Degradable failures (cache, one enrichment source) never reach this type:
//! they are logged and swallowed where they happen. What remains is either a
//! client mistake, an upstream that broke its contract, or a persistence
//! failure.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input. Nothing was done.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// An upstream answered, but with something unusable (malformed LLM JSON,
    /// zero valid debate cards).
    #[error("upstream contract violation: {0}")]
    Contract(String),

    /// An upstream could not be reached or returned a non-success status.
    #[error("upstream fetch failed: {0:#}")]
    Upstream(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Parse a provider match id ("12345"). Rejects empty, non-numeric and
/// non-positive values.
pub fn parse_match_id(raw: &str) -> ServiceResult<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("match_id is required"));
    }
    match trimmed.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ServiceError::validation(format!(
            "match_id must be a positive integer, got '{trimmed}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_id_parsing() {
        assert_eq!(parse_match_id(" 1035037 ").unwrap(), 1035037);
        assert!(matches!(parse_match_id(""), Err(ServiceError::Validation(_))));
        assert!(matches!(parse_match_id("abc"), Err(ServiceError::Validation(_))));
        assert!(matches!(parse_match_id("-4"), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn upstream_message_includes_context_chain() {
        let err = ServiceError::Upstream(
            anyhow::anyhow!("connection refused").context("Failed to fetch lineups"),
        );
        assert_eq!(
            err.to_string(),
            "upstream fetch failed: Failed to fetch lineups: connection refused"
        );
    }
}
