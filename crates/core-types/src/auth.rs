//! The caller identity handed to every repository call.
//!
//! Credentials are resolved upstream (token validation, user lookup); this
//! module only carries the resulting triple and answers the two questions the
//! persistence layer asks: "whose rows may this caller touch" and "may this
//! caller see everybody's rows".

use crate::enums::{ApprovalState, Role};
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A resolved, already-authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
    pub approval: ApprovalState,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role, approval: ApprovalState) -> Self {
        Self { user_id, role, approval }
    }

    /// An approved employee. Mostly useful for tools and tests.
    pub fn employee(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Employee, ApprovalState::Approved)
    }

    /// An approved administrator.
    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Admin, ApprovalState::Approved)
    }

    pub fn is_approved(&self) -> bool {
        self.approval == ApprovalState::Approved
    }

    /// Returns the owner id that scopes every owned-row statement.
    ///
    /// Pending accounts own nothing yet and are refused.
    pub fn owner_scope(&self) -> Result<Uuid, CoreError> {
        if !self.is_approved() {
            return Err(CoreError::Unauthorized);
        }
        Ok(self.user_id)
    }

    /// Passes the administrative gate, yielding the token that unlocks
    /// unscoped listings.
    pub fn admin_access(&self) -> Result<AdminAccess, CoreError> {
        if !self.is_approved() {
            return Err(CoreError::Unauthorized);
        }
        if self.role != Role::Admin {
            return Err(CoreError::Forbidden);
        }
        Ok(AdminAccess { admin_id: self.user_id })
    }
}

/// Proof that the administrative check already happened.
///
/// The field is private, so the only constructor is [`Caller::admin_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminAccess {
    admin_id: Uuid,
}

impl AdminAccess {
    pub fn admin_id(&self) -> Uuid {
        self.admin_id
    }
}
