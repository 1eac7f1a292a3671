//! User ledger - per-address staking records

use odra::prelude::*;
use odra::casper_types::U512;

use crate::reward_pool;

/// Staking record of one address
#[odra::odra_type]
#[derive(Default)]
pub struct UserAccount {
    /// CSPR deposited by the user and not yet withdrawn
    pub total_deposited: U512,
    /// Portion earning reward: the deposit plus, when enabled, the node creator's stake
    pub available_amount: U512,
    /// `available_amount * acc_per_share / 1e12` at the last settlement
    pub reward_debt: U512,
    /// Reward owed but not yet transferred
    pub pending_reward: U512,
    /// Stake backing a validator node created by this address
    pub agent_amount: U512,
    /// Whether `agent_amount` earns reward
    pub open_node_award: bool,
    pub last_deposit_height: u64,
    /// Reward transferred to this address so far
    pub total_received: U512,
}

impl UserAccount {
    pub fn new(block: u64) -> Self {
        Self {
            last_deposit_height: block,
            ..Default::default()
        }
    }

    /// Reward owed at accumulator value `acc`, carried-over dust included
    pub fn pending(&self, acc_per_share: U512) -> U512 {
        let accrued = reward_pool::reward_debt(self.available_amount, acc_per_share);
        accrued.saturating_sub(self.reward_debt) + self.pending_reward
    }

    pub fn sync_debt(&mut self, acc_per_share: U512) {
        self.reward_debt = reward_pool::reward_debt(self.available_amount, acc_per_share);
    }

    pub fn is_empty(&self) -> bool {
        self.available_amount.is_zero() && self.agent_amount.is_zero()
    }
}

/// Store of all user accounts
#[odra::module]
pub struct UserLedger {
    accounts: Mapping<Address, Option<UserAccount>>,
    user_count: Var<u32>,
    /// Reward transferred to all users so far
    total_distributed: Var<U512>,
}

#[odra::module]
impl UserLedger {
    pub fn account(&self, user: Address) -> Option<UserAccount> {
        self.accounts.get(&user).flatten()
    }

    pub fn user_count(&self) -> u32 {
        self.user_count.get_or_default()
    }

    pub fn total_distributed(&self) -> U512 {
        self.total_distributed.get_or_default()
    }

    /// Store an account, deleting it once nothing is staked under it
    pub fn save(&mut self, user: Address, account: UserAccount) {
        let exists = self.account(user).is_some();
        if account.is_empty() {
            if exists {
                self.accounts.set(&user, None);
                self.user_count.set(self.user_count() - 1);
            }
            return;
        }
        if !exists {
            self.user_count.set(self.user_count() + 1);
        }
        self.accounts.set(&user, Some(account));
    }

    pub fn record_payment(&mut self, amount: U512) {
        let total = self.total_distributed() + amount;
        self.total_distributed.set(total);
    }
}
