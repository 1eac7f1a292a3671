//! Reward token - CEP-18 asset emitted by the staking pool
//!
//! Wraps the CEP-18 implementation from `odra-modules` and adds locked transfers:
//! tokens received through `transfer_locked` cannot be spent by the recipient until
//! their unlock time has passed.

use alloc::vec::Vec;
use odra::prelude::*;
use odra::casper_types::{U256, U512};
use odra_modules::cep18_token::Cep18;

use crate::errors::Error;

/// Tokens held by an account that only become spendable at `unlock_time`
#[odra::odra_type]
pub struct TokenLock {
    pub amount: U256,
    /// Block time in milliseconds
    pub unlock_time: u64,
}

/// Reward token with minter-controlled supply and vesting locks
#[odra::module]
pub struct RewardToken {
    /// CEP-18 token implementation
    cep18: SubModule<Cep18>,
    /// Address authorized to mint (funds the staking pool's reward budget)
    minter: Var<Address>,
    /// Outstanding locks per holder
    locks: Mapping<Address, Vec<TokenLock>>,
}

#[odra::module]
impl RewardToken {
    /// Initialize the reward token
    pub fn init(&mut self, symbol: String, name: String, minter: Address) {
        self.cep18.init(symbol, name, 18, U256::zero());
        self.minter.set(minter);
    }

    /// Mint reward tokens - only callable by the minter
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.require_minter();
        self.cep18.raw_mint(&to, &amount);
    }

    /// Transfer unlocked tokens
    pub fn transfer(&mut self, recipient: Address, amount: U256) {
        let caller = self.env().caller();
        self.require_spendable(caller, amount);
        self.cep18.transfer(&recipient, &amount);
    }

    /// Transfer tokens that the recipient can only spend after `unlock_time`
    pub fn transfer_locked(&mut self, recipient: Address, amount: U256, unlock_time: u64) {
        let caller = self.env().caller();
        self.require_spendable(caller, amount);
        self.cep18.transfer(&recipient, &amount);

        if unlock_time > self.env().get_block_time() {
            let mut locks = self.active_locks(recipient);
            locks.push(TokenLock { amount, unlock_time });
            self.locks.set(&recipient, locks);
        }
    }

    /// Approve spender - standard CEP-18 passthrough
    pub fn approve(&mut self, spender: Address, amount: U256) {
        self.cep18.approve(&spender, &amount);
    }

    /// Transfer from - spends only the owner's unlocked tokens
    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) {
        self.require_spendable(owner, amount);
        self.cep18.transfer_from(&owner, &recipient, &amount);
    }

    /// Get token balance, locked tokens included
    pub fn balance_of(&self, owner: Address) -> U256 {
        self.cep18.balance_of(&owner)
    }

    /// Get the part of the balance that is still locked
    pub fn locked_balance_of(&self, owner: Address) -> U256 {
        self.active_locks(owner)
            .iter()
            .fold(U256::zero(), |total, lock| total + lock.amount)
    }

    /// Get allowance - standard CEP-18 view
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.cep18.allowance(&owner, &spender)
    }

    /// Get total supply
    pub fn total_supply(&self) -> U256 {
        self.cep18.total_supply()
    }

    /// Get token name
    pub fn name(&self) -> String {
        self.cep18.name()
    }

    /// Get token symbol
    pub fn symbol(&self) -> String {
        self.cep18.symbol()
    }

    /// Get token decimals
    pub fn decimals(&self) -> u8 {
        self.cep18.decimals()
    }

    /// Get current minter address
    pub fn get_minter(&self) -> Option<Address> {
        self.minter.get()
    }

    // Internal functions

    fn require_minter(&self) {
        let minter = self.minter.get().unwrap_or_revert_with(&self.env(), Error::MinterNotSet);
        if self.env().caller() != minter {
            self.env().revert(Error::NotMinter);
        }
    }

    fn require_spendable(&self, owner: Address, amount: U256) {
        let locked = self.locked_balance_of(owner);
        if locked.is_zero() {
            return;
        }
        let balance = self.cep18.balance_of(&owner);
        if balance < locked + amount {
            self.env().revert(Error::LockedBalance);
        }
    }

    /// Locks that have not expired yet
    fn active_locks(&self, owner: Address) -> Vec<TokenLock> {
        let now = self.env().get_block_time();
        self.locks
            .get(&owner)
            .unwrap_or_default()
            .into_iter()
            .filter(|lock| lock.unlock_time > now)
            .collect()
    }
}

/// Narrow a pool-side amount to token units; `None` when it does not fit in 256 bits
pub fn to_token_units(amount: U512) -> Option<U256> {
    let mut bytes = [0u8; 64];
    amount.to_little_endian(&mut bytes);
    if bytes[32..].iter().any(|byte| *byte != 0) {
        return None;
    }
    Some(U256::from_little_endian(&bytes[..32]))
}

/// Widen token units to a pool-side amount
pub fn from_token_units(amount: U256) -> U512 {
    let mut bytes = [0u8; 32];
    amount.to_little_endian(&mut bytes);
    U512::from_little_endian(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_units_fit_up_to_u256_max() {
        let max = from_token_units(U256::MAX);
        assert_eq!(to_token_units(max), Some(U256::MAX));
        assert_eq!(to_token_units(max + U512::one()), None);
        assert_eq!(to_token_units(U512::from(7u64)), Some(U256::from(7u64)));
    }
}
