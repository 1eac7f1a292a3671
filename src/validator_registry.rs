//! Validator registry interface for multi-node delegation
//!
//! The registry tracks validator nodes ("agents") that the pool may delegate to.
//! It answers node queries and executes delegate/undelegate commands, returning a
//! receipt for each delegation. The registry address is passed at initialization and
//! doubles as the consensus host that delivers block rewards.
//!
//! A node counts as active only while its `stop_height` equals [`ACTIVE_NODE`]. Any
//! other value, or no node at all, means it has been deactivated and the registry has
//! already returned every delegation made to it.

use alloc::vec::Vec;
use odra::casper_types::U512;
use odra::prelude::*;

/// Sentinel stop height of a node that is still producing blocks
pub const ACTIVE_NODE: i64 = -1;

/// Node description returned by the registry
#[odra::odra_type]
pub struct NodeInfo {
    /// Address that created the node and posted its own deposit
    pub creator: Address,
    /// Creator's own deposit backing the node
    pub deposit: U512,
    /// Total delegated to the node by everyone, as seen by the registry
    pub total_delegated: U512,
    /// Height at which the node stopped, or [`ACTIVE_NODE`]
    pub stop_height: i64,
}

impl NodeInfo {
    pub fn is_active(&self) -> bool {
        self.stop_height == ACTIVE_NODE
    }
}

/// External contract interface for the validator registry
#[odra::external_contract]
pub trait ValidatorRegistry {
    /// Look up a node; `None` when the registry has never heard of it
    fn query_node(&self, node_id: String) -> Option<NodeInfo>;

    /// Delegate the attached CSPR to a node
    ///
    /// # Returns
    /// Receipt identifying this delegation for a later `undelegate`
    fn delegate(&mut self, node_id: String) -> String;

    /// Withdraw one delegation in full; the CSPR is sent back to the delegator
    fn undelegate(&mut self, receipt_id: String);
}

/// External contract interface for the liquidity sink used in liquidity mode
#[odra::external_contract]
pub trait LiquiditySink {
    /// Add liquidity. Native CSPR arrives as attached value, with a zero entry in
    /// `amounts` and no entry in `tokens`.
    fn amount_enter(&mut self, amounts: Vec<U512>, tokens: Vec<Address>);
}
