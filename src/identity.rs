//! The acting user, as asserted by the fronting auth gateway.

use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

/// Header the gateway sets after authenticating the caller.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: i64,
}

impl Principal {
    pub fn from_header(value: Option<&str>) -> ServiceResult<Self> {
        let raw = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        match raw.parse::<i64>() {
            Ok(user_id) if user_id > 0 => Ok(Self { user_id }),
            _ => Err(ServiceError::Unauthorized(format!(
                "malformed {USER_ID_HEADER} header '{raw}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn header_parsing() {
        assert_eq!(assert_ok!(Principal::from_header(Some(" 17 "))).user_id, 17);
        assert_err!(Principal::from_header(None));
        assert_err!(Principal::from_header(Some("")));
        assert_err!(Principal::from_header(Some("abc")));
        assert_err!(Principal::from_header(Some("0")));
    }
}
