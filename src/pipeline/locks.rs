//! Per-user exclusive locks
//!
//! A fit holds its user's lock across artifact load, fit and persist, so two
//! fits for the same user never interleave. Different users never contend.

use crate::error::{Error, Result};
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};

/// What a second fit for a busy user does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Wait until the running fit releases the user
    #[default]
    Block,
    /// Fail immediately with [`Error::Busy`]
    Reject,
}

/// Set of users with a fit in progress
#[derive(Debug, Default)]
pub struct UserLocks {
    busy: Mutex<HashSet<UserId>>,
    released: Condvar,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `user` under `policy`; the lock is held until the guard drops
    pub fn acquire(&self, user: UserId, policy: LockPolicy) -> Result<UserGuard<'_>> {
        let mut busy = self.lock_set();
        while busy.contains(&user) {
            match policy {
                LockPolicy::Reject => return Err(Error::Busy(user)),
                LockPolicy::Block => {
                    tracing::debug!(user = %user, "waiting for running fit");
                    busy = self
                        .released
                        .wait(busy)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
        busy.insert(user);
        Ok(UserGuard { locks: self, user })
    }

    pub fn is_busy(&self, user: UserId) -> bool {
        self.lock_set().contains(&user)
    }

    // The set stays consistent even if a holder panicked: guards remove
    // their user on drop during unwinding.
    fn lock_set(&self) -> MutexGuard<'_, HashSet<UserId>> {
        self.busy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases its user on drop
#[derive(Debug)]
pub struct UserGuard<'a> {
    locks: &'a UserLocks,
    user: UserId,
}

impl UserGuard<'_> {
    pub fn user(&self) -> UserId {
        self.user
    }
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.locks.lock_set().remove(&self.user);
        self.locks.released.notify_all();
    }
}
