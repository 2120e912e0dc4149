//! # Role Provider Seam
//!
//! The identity collaborator: who is this staff member and what roles do
//! they currently hold? The answer lives outside this subsystem (an auth
//! service, a local staff table, a JWT), so it enters through a trait.
//!
//! ## Failure Policy
//! When the provider *cannot answer at all* (outage, not a deny), the
//! service consults its configured [`RoleLookupPolicy`]:
//! - `FailOpen`: proceed as if authorized (keeps the register working
//!   through identity outages)
//! - `FailClosed`: deny with `PERMISSION_DENIED`
//!
//! An expired credential is NOT an outage: it always surfaces as
//! `SESSION_EXPIRED`, under either policy.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

use mesa_core::Role;

/// Why a role lookup produced no answer.
#[derive(Debug, Error)]
pub enum RoleLookupError {
    /// The identity collaborator is unreachable or failing. Subject to the
    /// configured fail-open/fail-closed policy.
    #[error("Role provider unavailable: {0}")]
    Unavailable(String),

    /// The caller's credential expired. Never subject to fail-open.
    #[error("Credential expired")]
    CredentialExpired,
}

/// Resolves a staff member's active roles.
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// Returns the active roles for a staff member.
    ///
    /// An unknown staff id is a successful lookup with an empty role set,
    /// not an error - errors mean the provider itself failed.
    async fn active_roles(&self, staff_id: &str) -> Result<Vec<Role>, RoleLookupError>;
}

/// In-memory role provider for tests and single-terminal deployments.
#[derive(Debug, Default)]
pub struct StaticRoleProvider {
    roles: RwLock<HashMap<String, Vec<Role>>>,
}

impl StaticRoleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a provider from (staff_id, roles) pairs.
    pub fn with_roles(entries: impl IntoIterator<Item = (String, Vec<Role>)>) -> Self {
        StaticRoleProvider {
            roles: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Assigns roles to a staff member.
    pub fn assign(&self, staff_id: impl Into<String>, roles: Vec<Role>) {
        if let Ok(mut map) = self.roles.write() {
            map.insert(staff_id.into(), roles);
        }
    }
}

#[async_trait]
impl RoleProvider for StaticRoleProvider {
    async fn active_roles(&self, staff_id: &str) -> Result<Vec<Role>, RoleLookupError> {
        let map = self
            .roles
            .read()
            .map_err(|_| RoleLookupError::Unavailable("role map poisoned".to_string()))?;
        Ok(map.get(staff_id).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
