use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::BiddingError;

/// Portal roles that may drive the bidding engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Supplier,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Supplier => "SUPPLIER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = BiddingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADMIN" => Ok(Role::Admin),
            "SUPPLIER" => Ok(Role::Supplier),
            other => Err(BiddingError::Forbidden(format!("unknown role '{other}'"))),
        }
    }
}

/// Identity of whoever issued the request, resolved by the session gateway upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn supplier(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Supplier,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require(&self, role: Role) -> Result<(), BiddingError> {
        if self.role == role {
            Ok(())
        } else {
            Err(BiddingError::Forbidden(format!(
                "{} may not perform a {} operation",
                self.role, role
            )))
        }
    }

    /// Admins may read anything; suppliers only their own records.
    pub fn require_owner_or_admin(&self, supplier_id: &str) -> Result<(), BiddingError> {
        if self.is_admin() || (self.role == Role::Supplier && self.id == supplier_id) {
            Ok(())
        } else {
            Err(BiddingError::Forbidden(
                "records of another supplier are not visible".to_string(),
            ))
        }
    }
}
