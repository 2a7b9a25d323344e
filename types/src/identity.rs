//! Authenticated caller identities.
//!
//! The engine does not authenticate callers itself. The surrounding service
//! verifies credentials and hands the engine an [`Identity`] token carrying
//! the caller's address and role claims.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role claims an identity may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May run administrative controls such as entering lame duck mode.
    Admin,
}

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub address: Address,
    pub roles: BTreeSet<Role>,
}

impl Identity {
    /// An identity with no role claims.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            roles: BTreeSet::new(),
        }
    }

    /// An identity carrying the `Admin` claim.
    pub fn admin(address: Address) -> Self {
        Self::new(address).with_role(Role::Admin)
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
