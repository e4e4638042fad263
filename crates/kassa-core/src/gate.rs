//! # Return Gate
//!
//! State machine deciding whether a return may run in the current session.
//!
//! ```text
//!   cashier session                         admin session
//!   ───────────────                         ─────────────
//!     ┌────────┐  admin credentials  ┌──────────┐      always open,
//!     │ Locked │ ──────────────────► │ Unlocked │      never consumed
//!     └────────┘ ◄────────────────── └──────────┘
//!          ▲      successful return       │
//!          │                              │ failed return
//!          └── cashier / bad credentials  └──► stays Unlocked
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Role;

/// Gate state for non-admin sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Locked,
    Unlocked,
}

/// Return gate bound to the role of the signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnGate {
    session_role: Role,
    state: GateState,
}

impl ReturnGate {
    /// Creates a gate for a session. Cashier sessions start locked.
    pub fn new(session_role: Role) -> Self {
        let state = if session_role.is_admin() {
            GateState::Unlocked
        } else {
            GateState::Locked
        };
        ReturnGate {
            session_role,
            state,
        }
    }

    pub fn session_role(&self) -> Role {
        self.session_role
    }

    /// Current state. Admin sessions always report `Unlocked`.
    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.session_role.is_admin() || self.state == GateState::Unlocked
    }

    /// Applies the result of a credential challenge.
    ///
    /// `verified` is the role the credentials resolved to, or `None` when
    /// they did not match any login. Only an admin role opens the gate.
    pub fn apply_challenge(&mut self, verified: Option<Role>) -> CoreResult<Role> {
        match verified {
            Some(Role::Admin) => {
                self.state = GateState::Unlocked;
                Ok(Role::Admin)
            }
            Some(role) => {
                if !self.session_role.is_admin() {
                    self.state = GateState::Locked;
                }
                Err(CoreError::Unauthorized(format!(
                    "role '{}' cannot approve returns",
                    role
                )))
            }
            None => {
                if !self.session_role.is_admin() {
                    self.state = GateState::Locked;
                }
                Err(CoreError::Unauthorized(
                    "invalid login or password".to_string(),
                ))
            }
        }
    }

    /// Fails with `Unauthorized` unless a return may run now.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::Unauthorized(
                "administrator login and password required".to_string(),
            ))
        }
    }

    /// Records a successful gated return. Consumes the unlock for
    /// non-admin sessions.
    pub fn consume(&mut self) {
        if !self.session_role.is_admin() {
            self.state = GateState::Locked;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_cashier_starts_locked() {
        let gate = ReturnGate::new(Role::Cashier);
        assert_eq!(gate.state(), GateState::Locked);
        assert_eq!(
            gate.ensure_open().unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_admin_session_bypasses() {
        let mut gate = ReturnGate::new(Role::Admin);
        assert!(gate.is_open());
        gate.consume();
        assert!(gate.is_open());
        assert!(gate.apply_challenge(None).is_err());
        assert!(gate.is_open());
    }

    #[test]
    fn test_admin_challenge_unlocks_once() {
        let mut gate = ReturnGate::new(Role::Cashier);
        assert_eq!(gate.apply_challenge(Some(Role::Admin)).unwrap(), Role::Admin);
        assert!(gate.ensure_open().is_ok());

        gate.consume();
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[test]
    fn test_cashier_challenge_keeps_locked() {
        let mut gate = ReturnGate::new(Role::Cashier);
        let err = gate.apply_challenge(Some(Role::Cashier)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(gate.state(), GateState::Locked);
    }

    #[test]
    fn test_bad_credentials_relock() {
        let mut gate = ReturnGate::new(Role::Cashier);
        gate.apply_challenge(Some(Role::Admin)).unwrap();
        assert!(gate.apply_challenge(None).is_err());
        assert_eq!(gate.state(), GateState::Locked);
    }
}
