use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Application role: `app_metadata.role` wins over the top-level claim, which
    /// identity providers often fill with their own values ("authenticated").
    pub fn application_role(&self) -> Option<&str> {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("role"))
            .and_then(|role| role.as_str())
            .or(self.role.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Admin => &[
                Capability::RequestAppointment,
                Capability::ReviewAppointment,
                Capability::DischargePatient,
                Capability::ManageBilling,
                Capability::ManageDirectory,
                Capability::ViewAllRecords,
            ],
            Role::Doctor => &[
                Capability::ReviewAppointment,
                Capability::DischargePatient,
            ],
            Role::Patient => &[Capability::RequestAppointment],
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Doctor => write!(f, "doctor"),
            Role::Patient => write!(f, "patient"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// What a role is allowed to do. Checked once at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RequestAppointment,
    ReviewAppointment,
    DischargePatient,
    ManageBilling,
    ManageDirectory,
    ViewAllRecords,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::RequestAppointment => "request appointments",
            Capability::ReviewAppointment => "review appointments",
            Capability::DischargePatient => "discharge patients",
            Capability::ManageBilling => "manage billing",
            Capability::ManageDirectory => "manage the staff directory",
            Capability::ViewAllRecords => "view all records",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
        }
    }

    /// Returns the acting identity when the user's role grants `capability`.
    pub fn require(&self, capability: Capability) -> Result<Actor, AppError> {
        if self.role.can(capability) {
            Ok(self.actor())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' is not allowed to {}",
                self.role, capability
            )))
        }
    }
}

/// The identity the core operations act on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub capabilities: Vec<Capability>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: None,
            role,
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" doctor ".parse::<Role>().unwrap(), Role::Doctor);
        assert!("nurse".parse::<Role>().is_err());
    }

    #[test]
    fn test_capability_matrix() {
        assert!(Role::Admin.can(Capability::ManageBilling));
        assert!(Role::Doctor.can(Capability::ReviewAppointment));
        assert!(Role::Doctor.can(Capability::DischargePatient));
        assert!(!Role::Doctor.can(Capability::ManageBilling));
        assert!(Role::Patient.can(Capability::RequestAppointment));
        assert!(!Role::Patient.can(Capability::ReviewAppointment));
    }

    #[test]
    fn test_require_returns_actor_or_forbidden() {
        let doctor = user(Role::Doctor);
        let actor = doctor.require(Capability::ReviewAppointment).unwrap();
        assert_eq!(actor.id, doctor.id);
        assert_eq!(actor.role, Role::Doctor);

        assert_matches!(
            user(Role::Patient).require(Capability::ManageBilling),
            Err(AppError::Forbidden(_))
        );
    }

    #[test]
    fn test_application_role_prefers_app_metadata() {
        let claims = JwtClaims {
            sub: Uuid::new_v4().to_string(),
            exp: None,
            email: None,
            role: Some("authenticated".to_string()),
            app_metadata: Some(serde_json::json!({ "role": "doctor" })),
            user_metadata: None,
            aud: None,
            iat: None,
        };
        assert_eq!(claims.application_role(), Some("doctor"));
    }
}
