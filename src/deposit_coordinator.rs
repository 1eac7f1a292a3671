//! Total deposit - pool-wide principal and the delegation switch
//!
//! While delegation is enabled every deposit is handed to the delegation manager
//! and every withdrawal is funded through it. While disabled the principal simply
//! stays in the contract purse.

use alloc::{string::String, vec::Vec};
use odra::prelude::*;
use odra::casper_types::U512;

use crate::delegation::DelegationManager;
use crate::errors::Error;

#[odra::module]
pub struct TotalDeposit {
    total: Var<U512>,
    delegation_enabled: Var<bool>,
}

#[odra::module]
impl TotalDeposit {
    pub fn init(&mut self) {
        self.total.set(U512::zero());
        self.delegation_enabled.set(true);
    }

    pub fn total(&self) -> U512 {
        self.total.get_or_default()
    }

    pub fn is_delegation_enabled(&self) -> bool {
        self.delegation_enabled.get_or_default()
    }
}

impl TotalDeposit {
    /// Record new principal; returns agents dropped while delegating it
    pub fn add(&mut self, amount: U512, delegation: &mut DelegationManager) -> Vec<String> {
        let total = self.total() + amount;
        self.total.set(total);
        if !self.is_delegation_enabled() {
            return Vec::new();
        }
        delegation.deposit_idle(amount).dropped_agents
    }

    /// Release principal for a withdrawal; `None` when it cannot be freed
    pub fn subtract(
        &mut self,
        amount: U512,
        delegation: &mut DelegationManager,
    ) -> Option<Vec<String>> {
        let total = self.total().saturating_sub(amount);
        self.total.set(total);
        if !self.is_delegation_enabled() {
            return Some(Vec::new());
        }
        delegation.free_capital(amount)
    }

    /// Hand the whole principal to the delegation manager
    pub fn enable(&mut self, delegation: &mut DelegationManager) -> Vec<String> {
        if self.is_delegation_enabled() {
            self.env().revert(Error::DelegationAlreadyEnabled);
        }
        self.delegation_enabled.set(true);
        delegation.deposit_idle(self.total()).dropped_agents
    }

    /// Undelegate everything and keep the principal idle in the contract
    pub fn disable(&mut self, delegation: &mut DelegationManager) -> Vec<String> {
        if !self.is_delegation_enabled() {
            self.env().revert(Error::DelegationDisabled);
        }
        self.delegation_enabled.set(false);
        let locked = delegation.locked_total();
        let dropped = delegation.deallocate(locked).dropped_agents;
        delegation.take_available();
        dropped
    }
}
