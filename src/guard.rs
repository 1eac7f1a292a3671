//! Reentrancy guard
//!
//! A revert discards the whole deploy, the lock flag included, so only the
//! successful path needs to release it.

use odra::prelude::*;

use crate::errors::Error;

#[odra::module]
pub struct ReentrancyGuard {
    locked: Var<bool>,
}

#[odra::module]
impl ReentrancyGuard {
    pub fn is_locked(&self) -> bool {
        self.locked.get_or_default()
    }

    pub fn enter(&mut self) {
        if self.is_locked() {
            self.env().revert(Error::ReentrantCall);
        }
        self.locked.set(true);
    }

    pub fn exit(&mut self) {
        self.locked.set(false);
    }
}
