//! # Permission Guard
//!
//! Maps (action, active-role-set) → allow/deny.
//!
//! ## Design
//! Roles and actions are closed enums with a static allow-list per action.
//! The source system matched case-insensitive role-name strings
//! (`['cajero', 'admin', ...]`) at every call site; a tagged enum plus one
//! table removes that whole class of bugs.
//!
//! Role *lookup* (the identity collaborator) lives in mesa-service. This
//! module only answers the pure question; the lookup-failure policy is a
//! configuration value defined here so core and service agree on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Roles
// =============================================================================

/// Staff roles known to the cash/table subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cashier,
    Administrator,
    Owner,
}

// =============================================================================
// Actions
// =============================================================================

/// Guarded operations of the subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    OpenSession,
    CloseSession,
    ProcessPayment,
    RegisterExpense,
    TableTransition,
}

impl Action {
    /// Static allow-list for this action.
    ///
    /// Administrators and owners can do everything; cashiers can do
    /// everything *except* nothing today - the split exists so tightening
    /// one action (e.g., close_session to managers only) is a one-line
    /// change with the compiler checking exhaustiveness.
    pub const fn allowed_roles(self) -> &'static [Role] {
        const ALL: &[Role] = &[Role::Cashier, Role::Administrator, Role::Owner];
        match self {
            Action::OpenSession => ALL,
            Action::CloseSession => ALL,
            Action::ProcessPayment => ALL,
            Action::RegisterExpense => ALL,
            Action::TableTransition => ALL,
        }
    }

    /// Stable lowercase name used in error messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::OpenSession => "open_session",
            Action::CloseSession => "close_session",
            Action::ProcessPayment => "process_payment",
            Action::RegisterExpense => "register_expense",
            Action::TableTransition => "table_transition",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// The Guard
// =============================================================================

/// Pure allow/deny decision: does any active role permit the action?
///
/// ## Example
/// ```rust
/// use mesa_core::permissions::{allowed, Action, Role};
///
/// assert!(allowed(Action::ProcessPayment, &[Role::Cashier]));
/// assert!(!allowed(Action::OpenSession, &[]));
/// ```
pub fn allowed(action: Action, active_roles: &[Role]) -> bool {
    active_roles
        .iter()
        .any(|role| action.allowed_roles().contains(role))
}

// =============================================================================
// Lookup-Failure Policy
// =============================================================================

/// What to do when the identity collaborator cannot report roles at all.
///
/// The source system failed OPEN (kept cashiers working through identity
/// outages). Whether that is intentional resilience or a latent security
/// gap is an open policy question, so it is configurable rather than
/// hard-coded - deployments choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLookupPolicy {
    /// Allow the action when roles cannot be resolved (source behavior).
    FailOpen,
    /// Deny the action when roles cannot be resolved.
    FailClosed,
}

impl Default for RoleLookupPolicy {
    fn default() -> Self {
        // Matches the source system. Revisit before multi-tenant rollout.
        RoleLookupPolicy::FailOpen
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_role_is_allowed_each_action() {
        for action in [
            Action::OpenSession,
            Action::CloseSession,
            Action::ProcessPayment,
            Action::RegisterExpense,
            Action::TableTransition,
        ] {
            for role in [Role::Cashier, Role::Administrator, Role::Owner] {
                assert!(allowed(action, &[role]), "{:?} {:?}", action, role);
            }
        }
    }

    #[test]
    fn test_empty_role_set_denies() {
        assert!(!allowed(Action::OpenSession, &[]));
        assert!(!allowed(Action::ProcessPayment, &[]));
    }

    #[test]
    fn test_any_single_matching_role_suffices() {
        assert!(allowed(Action::CloseSession, &[Role::Owner, Role::Cashier]));
    }

    #[test]
    fn test_default_policy_is_fail_open() {
        assert_eq!(RoleLookupPolicy::default(), RoleLookupPolicy::FailOpen);
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::OpenSession.as_str(), "open_session");
        assert_eq!(Action::TableTransition.to_string(), "table_transition");
    }
}
