//! DTOs for presence queries.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::UserId;
use crate::error::GatewayError;

/// Query parameters of `GET /presence`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PresenceQuery {
    /// Comma-separated user ids, e.g. `1,2,3`.
    #[serde(rename = "userIds", default)]
    pub user_ids: String,
}

impl PresenceQuery {
    /// Parses the id list, keeping request order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on a non-numeric id.
    pub fn parse_ids(&self) -> Result<Vec<UserId>, GatewayError> {
        self.user_ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map(UserId::new)
                    .map_err(|_| GatewayError::InvalidRequest(format!("invalid user id: {s}")))
            })
            .collect()
    }
}

/// Online state of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    /// Queried user.
    pub user_id: UserId,
    /// Whether the user holds at least one live connection.
    pub online: bool,
}

/// `GET /presence` response, in request order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PresenceResponse {
    /// One entry per requested id.
    pub presence: Vec<PresenceEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: &str) -> PresenceQuery {
        PresenceQuery {
            user_ids: raw.to_string(),
        }
    }

    #[test]
    fn keeps_order_and_skips_blanks() {
        let ids = query(" 3,1, ,2 ").parse_ids();
        assert!(matches!(
            ids,
            Ok(ref v) if v == &vec![UserId::new(3), UserId::new(1), UserId::new(2)]
        ));
        assert!(matches!(query("").parse_ids(), Ok(ref v) if v.is_empty()));
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(matches!(
            query("1,abc").parse_ids(),
            Err(GatewayError::InvalidRequest(_))
        ));
    }
}
