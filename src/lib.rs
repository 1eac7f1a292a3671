//! Hearth - Pooled Staking Protocol for Casper Network
//!
//! This crate provides a staking pool where users can:
//! - Deposit CSPR and earn a per-block emission of a reward token
//! - Have their deposits delegated across several validator nodes
//! - Withdraw at any time, with the pool undelegating just enough to pay out
//! - Share the nodes' consensus income between the project and a treasury

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod consensus_award;
pub mod delegation;
pub mod deposit_coordinator;
pub mod errors;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod reward_pool;
pub mod reward_token;
pub mod staking_pool;
pub mod validator_registry;

// Re-export main types for external use
pub use consensus_award::{ConsensusAwardState, OperatingMode};
pub use delegation::{AgentSummary, DelegationRecord, DelegationSnapshot};
pub use errors::*;
pub use events::*;
pub use ledger::UserAccount;
pub use reward_pool::RewardPoolState;
pub use reward_token::{RewardToken, TokenLock};
pub use staking_pool::{ConsensusAward, StakingPool};
pub use validator_registry::{NodeInfo, ACTIVE_NODE};

// Re-export generated types only when not building for wasm32 target
#[cfg(not(target_arch = "wasm32"))]
pub use reward_token::{RewardTokenHostRef, RewardTokenInitArgs};
#[cfg(not(target_arch = "wasm32"))]
pub use staking_pool::{StakingPoolHostRef, StakingPoolInitArgs};
