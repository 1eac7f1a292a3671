//! Mock validator registry for testing
//!
//! Keeps nodes and delegation receipts in storage and moves real CSPR: delegations
//! are held by the mock and returned on undelegate or when a node is deactivated.

use odra::casper_types::U512;
use odra::prelude::*;
use odra::ContractRef;

use hearth::staking_pool::{ConsensusAward, StakingPoolContractRef};
use hearth::validator_registry::{NodeInfo, ACTIVE_NODE};

#[odra::odra_error]
pub enum MockRegistryError {
    UnknownNode = 900,
    NodeInactive = 901,
    UnknownReceipt = 902,
}

#[odra::odra_type]
pub struct Receipt {
    pub node_id: String,
    pub delegator: Address,
    pub amount: U512,
}

/// Mock validator registry for testing
#[odra::module]
pub struct MockValidatorRegistry {
    nodes: Mapping<String, Option<NodeInfo>>,
    receipts: Mapping<String, Option<Receipt>>,
    node_receipts: Mapping<String, Vec<String>>,
    receipt_counter: Var<u64>,
    // Call back into the delegator from `delegate`
    reenter: Var<bool>,
}

#[odra::module]
impl MockValidatorRegistry {
    pub fn init(&mut self) {
        self.receipt_counter.set(0);
        self.reenter.set(false);
    }

    // ============ REGISTRY INTERFACE ============

    pub fn query_node(&self, node_id: String) -> Option<NodeInfo> {
        self.nodes.get(&node_id).flatten()
    }

    #[odra(payable)]
    pub fn delegate(&mut self, node_id: String) -> String {
        let mut node = self.require_node(&node_id);
        if !node.is_active() {
            self.env().revert(MockRegistryError::NodeInactive);
        }
        let amount = self.env().attached_value();
        let delegator = self.env().caller();

        node.total_delegated += amount;
        self.nodes.set(&node_id, Some(node));

        let counter = self.receipt_counter.get_or_default() + 1;
        self.receipt_counter.set(counter);
        let receipt_id = format!("receipt-{}", counter);
        self.receipts.set(
            &receipt_id,
            Some(Receipt {
                node_id: node_id.clone(),
                delegator,
                amount,
            }),
        );
        let mut ids = self.node_receipts.get(&node_id).unwrap_or_default();
        ids.push(receipt_id.clone());
        self.node_receipts.set(&node_id, ids);

        if self.reenter.get_or_default() {
            StakingPoolContractRef::new(self.env(), delegator).claim_rewards();
        }
        receipt_id
    }

    pub fn undelegate(&mut self, receipt_id: String) {
        let receipt = match self.receipts.get(&receipt_id).flatten() {
            Some(receipt) => receipt,
            None => self.env().revert(MockRegistryError::UnknownReceipt),
        };
        let mut node = self.require_node(&receipt.node_id);
        if !node.is_active() {
            self.env().revert(MockRegistryError::NodeInactive);
        }
        node.total_delegated = node.total_delegated.saturating_sub(receipt.amount);
        self.nodes.set(&receipt.node_id, Some(node));
        self.receipts.set(&receipt_id, None);
        self.env().transfer_tokens(&receipt.delegator, &receipt.amount);
    }

    // ============ TEST HELPERS ============

    pub fn register_node(&mut self, node_id: String, creator: Address, deposit: U512) {
        self.nodes.set(
            &node_id,
            Some(NodeInfo {
                creator,
                deposit,
                total_delegated: U512::zero(),
                stop_height: ACTIVE_NODE,
            }),
        );
    }

    /// Stop a node and pay every open delegation back to its delegator
    pub fn deactivate_node(&mut self, node_id: String, stop_height: i64) {
        let mut node = self.require_node(&node_id);
        self.return_delegations(&node_id);
        node.total_delegated = U512::zero();
        node.stop_height = stop_height;
        self.nodes.set(&node_id, Some(node));
    }

    /// Forget a node entirely, paying its delegations back
    pub fn remove_node(&mut self, node_id: String) {
        self.require_node(&node_id);
        self.return_delegations(&node_id);
        self.nodes.set(&node_id, None);
    }

    /// Pretend other delegators have put `amount` on the node
    pub fn set_external_delegation(&mut self, node_id: String, amount: U512) {
        let mut node = self.require_node(&node_id);
        node.total_delegated = amount;
        self.nodes.set(&node_id, Some(node));
    }

    pub fn set_reenter(&mut self, reenter: bool) {
        self.reenter.set(reenter);
    }

    /// Forward the attached CSPR to `pool` as a single consensus award
    #[odra(payable)]
    pub fn distribute_award(&mut self, pool: Address) {
        let amount = self.env().attached_value();
        let awards = vec![ConsensusAward {
            receiver: pool,
            amount,
        }];
        StakingPoolContractRef::new(self.env(), pool)
            .with_tokens(amount)
            .on_consensus_award(awards);
    }

    /// Forward the attached CSPR to `pool` together with an arbitrary award list
    #[odra(payable)]
    pub fn distribute_awards(&mut self, pool: Address, awards: Vec<ConsensusAward>) {
        let amount = self.env().attached_value();
        StakingPoolContractRef::new(self.env(), pool)
            .with_tokens(amount)
            .on_consensus_award(awards);
    }

    pub fn open_receipts(&self, node_id: String) -> u32 {
        self.node_receipts
            .get(&node_id)
            .unwrap_or_default()
            .iter()
            .filter(|id| self.receipts.get(*id).flatten().is_some())
            .count() as u32
    }

    fn require_node(&self, node_id: &String) -> NodeInfo {
        match self.nodes.get(node_id).flatten() {
            Some(node) => node,
            None => self.env().revert(MockRegistryError::UnknownNode),
        }
    }

    fn return_delegations(&mut self, node_id: &String) {
        for receipt_id in self.node_receipts.get(node_id).unwrap_or_default() {
            if let Some(receipt) = self.receipts.get(&receipt_id).flatten() {
                self.receipts.set(&receipt_id, None);
                self.env().transfer_tokens(&receipt.delegator, &receipt.amount);
            }
        }
        self.node_receipts.set(node_id, Vec::new());
    }
}
