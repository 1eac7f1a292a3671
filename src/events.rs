//! Events for Hearth (CEP-88 compliant)

use odra::prelude::*;
use odra::casper_types::U512;

/// Emitted when a user deposits CSPR into the pool
#[odra::event]
pub struct Deposited {
    pub user: Address,
    pub amount: U512,
    pub total_deposited: U512,
    pub block: u64,
}

/// Emitted when a user withdraws part or all of a deposit
#[odra::event]
pub struct Withdrawn {
    pub user: Address,
    pub amount: U512,
    pub remaining: U512,
}

/// Emitted when a user exits without collecting rewards
#[odra::event]
pub struct EmergencyWithdrawn {
    pub user: Address,
    pub amount: U512,
    pub forfeited_reward: U512,
}

/// Emitted when accrued reward is transferred to a user
#[odra::event]
pub struct RewardPaid {
    pub user: Address,
    /// Paid to the user
    pub amount: U512,
    /// Sent to the liquidity sink in liquidity mode
    pub lp_share: U512,
    pub unlock_time: u64,
}

/// Emitted when a reward is too small or the pool too poor to pay it now
#[odra::event]
pub struct RewardDeferred {
    pub user: Address,
    pub previous_pending: U512,
    pub pending: U512,
    pub pool_balance: U512,
}

// ============ DELEGATION EVENTS ============

/// Emitted when a validator node is registered as a delegation target
#[odra::event]
pub struct AgentAdded {
    pub agent_id: String,
    pub creator: Address,
    pub agent_deposit: U512,
    pub open_node_award: bool,
}

/// Emitted when an agent leaves the registry, explicitly or lazily
#[odra::event]
pub struct AgentRemoved {
    pub agent_id: String,
    pub reclaimed: U512,
}

/// Emitted for every delegation placed with the validator registry
#[odra::event]
pub struct Delegated {
    pub agent_id: String,
    pub receipt_id: String,
    pub amount: U512,
}

/// Emitted for every explicit undelegation
#[odra::event]
pub struct Undelegated {
    pub agent_id: String,
    pub receipt_id: String,
    pub amount: U512,
}

/// Emitted when a deactivated agent's delegations are written back as idle capital
#[odra::event]
pub struct DelegationReclaimed {
    pub agent_id: String,
    pub amount: U512,
}

/// Emitted when delegation is switched on or off
#[odra::event]
pub struct DelegationToggled {
    pub enabled: bool,
}

// ============ CONSENSUS AWARD EVENTS ============

/// Emitted when the host delivers block-level consensus income
#[odra::event]
pub struct ConsensusAwardReceived {
    pub amount: U512,
    pub available_award: U512,
}

/// Emitted when the available consensus award is split and routed
#[odra::event]
pub struct ConsensusAwardHarvested {
    pub harvested: U512,
    pub project_share: U512,
    pub treasury_share: U512,
    pub pending_treasury: U512,
}

/// Emitted when the treasury buffer is flushed
#[odra::event]
pub struct TreasuryFlushed {
    pub treasury: Address,
    pub amount: U512,
}

/// Emitted when the treasury ratio changes
#[odra::event]
pub struct TreasuryRatioUpdated {
    pub old_ratio: u8,
    pub new_ratio: u8,
}

// ============ ADMIN EVENTS ============

/// Emitted when the reward emission window is pushed out
#[odra::event]
pub struct EndBlockExtended {
    pub added_blocks: u64,
    pub end_block: u64,
}

/// Emitted when admin is transferred
#[odra::event]
pub struct AdminTransferred {
    pub old_admin: Address,
    pub new_admin: Address,
}
