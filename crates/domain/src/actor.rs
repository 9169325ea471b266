//! Authenticated principals and their roles.

use serde::{Deserialize, Serialize};

use common::UserId;

/// Role of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Buys medicines, owns a cart and their own orders.
    Customer,
    /// Lists medicines and fulfills orders containing them.
    Seller,
    /// Full access to every order.
    Admin,
}

impl Role {
    /// Returns the role name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Seller => "SELLER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Role::Customer),
            "SELLER" => Ok(Role::Seller),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// The authenticated principal attempting an operation.
///
/// Built by the API layer from the gateway-validated session headers and
/// passed through to every scoped store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates an actor with the given identity and role.
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}
