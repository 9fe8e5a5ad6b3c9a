use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ProcessingStatus;

/// Role of the account that uploaded an artifact.
///
/// The set is closed; `Admin` and `Editor` are privileged and bypass manual approval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "uploader_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UploaderRole {
    Admin,
    Editor,
    Author,
    Contributor,
}

impl UploaderRole {
    pub fn is_privileged(&self) -> bool {
        matches!(self, UploaderRole::Admin | UploaderRole::Editor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploaderRole::Admin => "admin",
            UploaderRole::Editor => "editor",
            UploaderRole::Author => "author",
            UploaderRole::Contributor => "contributor",
        }
    }
}

impl Display for UploaderRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploaderRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(UploaderRole::Admin),
            "editor" => Ok(UploaderRole::Editor),
            "author" => Ok(UploaderRole::Author),
            "contributor" => Ok(UploaderRole::Contributor),
            other => Err(format!("Unknown uploader role: {}", other)),
        }
    }
}

/// Identity of the caller performing an upload, resolved by the surrounding system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploaderContext {
    pub uploader_id: Uuid,
    pub role: UploaderRole,
}

/// Status an artifact settles at after a successful processing run.
///
/// Privileged uploaders are auto-approved; everyone else waits for approval in `Pending`.
pub fn decide_final_status(role: UploaderRole) -> ProcessingStatus {
    if role.is_privileged() {
        ProcessingStatus::Completed
    } else {
        ProcessingStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_final_status_privileged() {
        assert_eq!(
            decide_final_status(UploaderRole::Admin),
            ProcessingStatus::Completed
        );
        assert_eq!(
            decide_final_status(UploaderRole::Editor),
            ProcessingStatus::Completed
        );
    }

    #[test]
    fn test_decide_final_status_unprivileged() {
        assert_eq!(
            decide_final_status(UploaderRole::Author),
            ProcessingStatus::Pending
        );
        assert_eq!(
            decide_final_status(UploaderRole::Contributor),
            ProcessingStatus::Pending
        );
    }

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<UploaderRole>(), Ok(UploaderRole::Admin));
        assert_eq!(" Editor ".parse::<UploaderRole>(), Ok(UploaderRole::Editor));
        assert!("owner".parse::<UploaderRole>().is_err());
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&UploaderRole::Contributor).unwrap();
        assert_eq!(json, "\"contributor\"");
    }
}
