//! Reward accumulator
//!
//! Tracks the pool-wide reward-per-share figure. Rewards are emitted at a fixed
//! rate per block and shared pro rata among the staked supply; each user's share
//! is `amount * acc_per_share / ACC_PRECISION` minus what was already accounted
//! for in their reward debt.
//!
//! The emission window closes at `end_block`, which is recomputed whenever the
//! staked supply moves between zero and non-zero.

use odra::prelude::*;
use odra::casper_types::U512;

/// Fixed-point scale of `acc_per_share`
pub const ACC_PRECISION: u64 = 1_000_000_000_000; // 1e12

/// Block count standing in for "never ends" (roughly the year 6000 at 10s blocks)
pub const UNBOUNDED_BLOCKS: u64 = 12_717_449_280;

/// Snapshot of the accumulator
#[odra::odra_type]
pub struct RewardPoolState {
    pub acc_per_share: U512,
    pub last_reward_block: u64,
    pub end_block: u64,
    pub reward_per_block: U512,
    pub total_staked: U512,
}

/// Reward-per-share accumulator
#[odra::module]
pub struct RewardPool {
    acc_per_share: Var<U512>,
    last_reward_block: Var<u64>,
    end_block: Var<u64>,
    reward_per_block: Var<U512>,
    total_staked: Var<U512>,
}

#[odra::module]
impl RewardPool {
    pub fn init(&mut self, reward_per_block: U512, current_block: u64) {
        self.acc_per_share.set(U512::zero());
        self.last_reward_block.set(current_block);
        self.end_block.set(current_block.saturating_add(UNBOUNDED_BLOCKS));
        self.reward_per_block.set(reward_per_block);
        self.total_staked.set(U512::zero());
    }

    pub fn acc_per_share(&self) -> U512 {
        self.acc_per_share.get_or_default()
    }

    pub fn last_reward_block(&self) -> u64 {
        self.last_reward_block.get_or_default()
    }

    pub fn end_block(&self) -> u64 {
        self.end_block.get_or_default()
    }

    pub fn reward_per_block(&self) -> U512 {
        self.reward_per_block.get_or_default()
    }

    pub fn total_staked(&self) -> U512 {
        self.total_staked.get_or_default()
    }

    pub fn state(&self) -> RewardPoolState {
        RewardPoolState {
            acc_per_share: self.acc_per_share(),
            last_reward_block: self.last_reward_block(),
            end_block: self.end_block(),
            reward_per_block: self.reward_per_block(),
            total_staked: self.total_staked(),
        }
    }

    /// Accumulator value `update_pool` would produce at `current_block`, without writing it
    pub fn preview_acc_per_share(&self, current_block: u64) -> U512 {
        let acc = self.acc_per_share();
        let last = self.last_reward_block();
        let effective = current_block.min(self.end_block());
        if effective <= last {
            return acc;
        }
        let supply = self.total_staked();
        if supply.is_zero() {
            return acc;
        }
        accrue(acc, effective - last, self.reward_per_block(), supply)
    }

    /// Bring the accumulator up to `current_block` and return the new value
    pub fn update_pool(&mut self, current_block: u64) -> U512 {
        let acc = self.acc_per_share();
        let last = self.last_reward_block();
        let effective = current_block.min(self.end_block());
        if effective <= last {
            return acc;
        }

        let supply = self.total_staked();
        if supply.is_zero() {
            // Emission with nobody staked is not attributed to anyone.
            self.last_reward_block.set(effective);
            return acc;
        }

        let acc = accrue(acc, effective - last, self.reward_per_block(), supply);
        self.acc_per_share.set(acc);
        self.last_reward_block.set(effective);
        acc
    }

    /// Add to the staked supply; returns true when the supply was empty before
    pub fn add_supply(&mut self, amount: U512) -> bool {
        let supply = self.total_staked();
        self.total_staked.set(supply + amount);
        supply.is_zero() && !amount.is_zero()
    }

    /// Remove from the staked supply; returns true when the supply is now empty
    pub fn sub_supply(&mut self, amount: U512) -> bool {
        let supply = self.total_staked();
        let remaining = supply.saturating_sub(amount);
        self.total_staked.set(remaining);
        !supply.is_zero() && remaining.is_zero()
    }

    /// Supply became non-zero: the window lasts as long as the budget can pay for it
    ///
    /// Accrual restarts at `current_block`; blocks that passed with an empty
    /// supply belong to nobody.
    pub fn open_emission(&mut self, current_block: u64, budget: U512) {
        let blocks = blocks_covered(budget, self.reward_per_block());
        self.last_reward_block.set(current_block);
        self.end_block.set(current_block.saturating_add(blocks));
    }

    /// Supply dropped to zero: close now if nothing is left to pay, else leave it open
    pub fn close_emission(&mut self, current_block: u64, budget: U512) {
        let end_block = if budget.is_zero() {
            current_block
        } else {
            current_block.saturating_add(UNBOUNDED_BLOCKS)
        };
        self.end_block.set(end_block);
    }

    /// Push the end of the window out by as many blocks as `value` pays for
    pub fn extend_end_block(&mut self, value: U512) -> u64 {
        let blocks = blocks_covered(value, self.reward_per_block());
        let end_block = self.end_block().saturating_add(blocks);
        self.end_block.set(end_block);
        blocks
    }
}

/// `acc + blocks * rate * ACC_PRECISION / supply`
pub fn accrue(acc: U512, blocks: u64, reward_per_block: U512, supply: U512) -> U512 {
    let reward = U512::from(blocks) * reward_per_block;
    acc + reward * U512::from(ACC_PRECISION) / supply
}

/// Reward already accounted for on `amount` at accumulator value `acc`
pub fn reward_debt(amount: U512, acc: U512) -> U512 {
    amount * acc / U512::from(ACC_PRECISION)
}

/// Number of blocks `budget` can pay for, capped at [`UNBOUNDED_BLOCKS`]
fn blocks_covered(budget: U512, reward_per_block: U512) -> u64 {
    if reward_per_block.is_zero() {
        return UNBOUNDED_BLOCKS;
    }
    let blocks = budget / reward_per_block;
    if blocks > U512::from(UNBOUNDED_BLOCKS) {
        UNBOUNDED_BLOCKS
    } else {
        blocks.as_u64()
    }
}
