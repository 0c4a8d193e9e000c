use crate::error::ModelError;
use crate::ids::UserId;

/// Role granted by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ModelError::invalid("role", other)),
        }
    }
}

/// Identity attached to every request by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallerIdentity {
    pub id: UserId,
    pub role: Role,
}

impl CallerIdentity {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// The only authorization rule this core applies: the caller owns the
    /// resource, or holds an elevated role.
    pub fn can_access(&self, owner: &UserId) -> bool {
        self.role.is_elevated() || &self.id == owner
    }
}
