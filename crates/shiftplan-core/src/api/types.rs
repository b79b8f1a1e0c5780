//! Wire types for the scheduling backend (camelCase JSON).

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub identifier: &'a str,
    pub secret: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub access_token: String,
}

/// Authenticated user's identity and role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub display_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// A selectable planning period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningPeriod {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

/// A plan record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning_period_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A user as seen by administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub identifier: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Payload for creating a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub identifier: String,
    pub secret: String,
    pub display_name: String,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_from_camel_case() {
        let profile: Profile =
            serde_json::from_str(r#"{"id":7,"displayName":"Ada","isAdmin":true}"#).unwrap();
        assert_eq!(
            profile,
            Profile {
                id: 7,
                display_name: "Ada".into(),
                is_admin: true
            }
        );
    }

    #[test]
    fn test_missing_flags_default_to_false() {
        let period: PlanningPeriod = serde_json::from_str(r#"{"id":1,"name":"Q1"}"#).unwrap();
        assert!(!period.is_active);
    }

    #[test]
    fn test_new_user_serializes_camel_case() {
        let body = serde_json::to_value(NewUser {
            identifier: "grace".into(),
            secret: "pw".into(),
            display_name: "Grace".into(),
            is_admin: false,
        })
        .unwrap();
        assert_eq!(body["displayName"], "Grace");
        assert_eq!(body["isAdmin"], false);
    }
}
