//! Resident (host) records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ResidentId, Timestamp, TypesError};

/// What a signed-in member may do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Resident,
    /// Door security: may scan passes and record check-in/out.
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    pub fn can_scan(&self) -> bool {
        matches!(self, Self::Staff | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resident" => Ok(Self::Resident),
            "staff" | "security" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(TypesError::UnknownRole(other.to_string())),
        }
    }
}

/// A host. Created or refreshed on each successful login; never deleted here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub id: ResidentId,
    /// Identifier at the membership provider (the auth credential reference).
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub unit: Option<String>,
    /// Whether the membership provider currently confirms residency.
    pub verified_member: bool,
    pub role: Role,
    pub created_at: Timestamp,
    pub last_login_at: Timestamp,
}
