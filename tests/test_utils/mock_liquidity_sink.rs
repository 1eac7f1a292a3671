//! Mock liquidity sink for testing
//!
//! Accepts `amount_enter` calls and records what arrived. Token amounts are
//! pulled from the caller against the allowance it granted.

use odra::casper_types::U512;
use odra::prelude::*;
use odra::ContractRef;

use hearth::reward_token::{to_token_units, RewardTokenContractRef};

#[odra::module]
pub struct MockLiquiditySink {
    received: Var<U512>,
    calls: Var<u32>,
    last_amounts: Var<Vec<U512>>,
    last_tokens: Var<Vec<Address>>,
}

#[odra::module]
impl MockLiquiditySink {
    pub fn init(&mut self) {
        self.received.set(U512::zero());
        self.calls.set(0);
    }

    #[odra(payable)]
    pub fn amount_enter(&mut self, amounts: Vec<U512>, tokens: Vec<Address>) {
        let received = self.received.get_or_default() + self.env().attached_value();
        self.received.set(received);
        let calls = self.calls.get_or_default() + 1;
        self.calls.set(calls);

        let caller = self.env().caller();
        let me = self.env().self_address();
        for (amount, token) in amounts.iter().zip(tokens.iter()) {
            if amount.is_zero() {
                continue;
            }
            let units = to_token_units(*amount).unwrap();
            RewardTokenContractRef::new(self.env(), *token).transfer_from(caller, me, units);
        }

        self.last_amounts.set(amounts);
        self.last_tokens.set(tokens);
    }

    pub fn received(&self) -> U512 {
        self.received.get_or_default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.get_or_default()
    }

    pub fn last_amounts(&self) -> Vec<U512> {
        self.last_amounts.get_or_default()
    }

    pub fn last_tokens(&self) -> Vec<Address> {
        self.last_tokens.get_or_default()
    }
}
