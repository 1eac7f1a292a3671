//! Delegation manager - spreads idle CSPR over registered validator nodes
//!
//! Capital the pool is not holding for withdrawals sits in `available` until it
//! reaches the minimum join amount, then is delegated to agents in registration
//! order, each filled up to `max_capacity`. Every delegation is kept as a record,
//! ordered by amount, so that withdrawals can release the single best-fitting
//! record instead of touching every agent.
//!
//! Agents may be deactivated by the registry at any time. The registry returns the
//! funds itself, so when a scan meets such an agent its records are written back
//! to `available` and the agent is dropped. Callers receive the ids of dropped
//! agents to settle their creators.

use alloc::{string::String, vec::Vec};
use odra::prelude::*;
use odra::casper_types::U512;
use odra::ContractRef;

use crate::errors::Error;
use crate::events::{AgentRemoved, Delegated, DelegationReclaimed, Undelegated};
use crate::validator_registry::{NodeInfo, ValidatorRegistryContractRef};

pub const DEFAULT_MIN_JOIN_DEPOSIT: u64 = 500_000_000_000; // 500 CSPR
pub const DEFAULT_MAX_AGENT_CAPACITY: u64 = 500_000_000_000_000; // 500,000 CSPR

/// One delegation placed with the registry
#[odra::odra_type]
pub struct DelegationRecord {
    pub agent_id: String,
    pub receipt_id: String,
    pub amount: U512,
}

#[odra::odra_type]
pub struct AgentSummary {
    pub agent_id: String,
    pub delegated: U512,
}

/// Full view of the delegation book
#[odra::odra_type]
pub struct DelegationSnapshot {
    /// Agents in registration order
    pub agents: Vec<AgentSummary>,
    /// Records in ascending amount order
    pub records: Vec<DelegationRecord>,
    pub locked_total: U512,
    pub available: U512,
    pub min_join: U512,
    pub max_capacity: U512,
}

/// How a single record came back to the pool
#[derive(Debug, PartialEq, Eq)]
pub enum Release {
    /// Undelegated through the registry
    Withdrawn(U512),
    /// Agent was deactivated; all of its records were written back
    Reclaimed(U512),
}

impl Release {
    pub fn amount(&self) -> U512 {
        match self {
            Release::Withdrawn(amount) | Release::Reclaimed(amount) => *amount,
        }
    }
}

/// Outcome of an allocation or deallocation pass
#[derive(Debug, Default)]
pub struct Rebalance {
    /// Delegated, or freed, by this pass
    pub amount: U512,
    /// Agents found deactivated and dropped along the way
    pub dropped_agents: Vec<String>,
}

#[odra::module]
pub struct DelegationManager {
    registry: Var<Address>,
    agents: Var<Vec<String>>,
    agent_delegations: Mapping<String, U512>,
    records: Var<Vec<DelegationRecord>>,
    locked_total: Var<U512>,
    available: Var<U512>,
    min_join: Var<U512>,
    max_capacity: Var<U512>,
}

#[odra::module]
impl DelegationManager {
    pub fn init(&mut self, registry: Address) {
        self.registry.set(registry);
        self.agents.set(Vec::new());
        self.records.set(Vec::new());
        self.locked_total.set(U512::zero());
        self.available.set(U512::zero());
        self.min_join.set(U512::from(DEFAULT_MIN_JOIN_DEPOSIT));
        self.max_capacity.set(U512::from(DEFAULT_MAX_AGENT_CAPACITY));
    }

    pub fn registry(&self) -> Option<Address> {
        self.registry.get()
    }

    pub fn agents(&self) -> Vec<String> {
        self.agents.get_or_default()
    }

    pub fn is_registered(&self, agent_id: String) -> bool {
        self.agents().contains(&agent_id)
    }

    /// Amount this pool has delegated to `agent_id`
    pub fn agent_delegation(&self, agent_id: String) -> U512 {
        self.agent_delegations.get(&agent_id).unwrap_or_default()
    }

    pub fn records(&self) -> Vec<DelegationRecord> {
        self.records.get_or_default()
    }

    pub fn locked_total(&self) -> U512 {
        self.locked_total.get_or_default()
    }

    pub fn available(&self) -> U512 {
        self.available.get_or_default()
    }

    pub fn min_join(&self) -> U512 {
        self.min_join.get_or_default()
    }

    pub fn max_capacity(&self) -> U512 {
        self.max_capacity.get_or_default()
    }

    pub fn snapshot(&self) -> DelegationSnapshot {
        let agents = self
            .agents()
            .into_iter()
            .map(|agent_id| AgentSummary {
                delegated: self.agent_delegation(agent_id.clone()),
                agent_id,
            })
            .collect();
        DelegationSnapshot {
            agents,
            records: self.records(),
            locked_total: self.locked_total(),
            available: self.available(),
            min_join: self.min_join(),
            max_capacity: self.max_capacity(),
        }
    }

    pub fn set_min_join(&mut self, value: U512) {
        if value.is_zero() || value > self.max_capacity() {
            self.env().revert(Error::InvalidMinJoin);
        }
        self.min_join.set(value);
    }

    pub fn set_max_capacity(&mut self, value: U512) {
        if value < self.min_join() {
            self.env().revert(Error::InvalidCapacity);
        }
        self.max_capacity.set(value);
    }

    /// Drain the idle balance
    pub fn take_available(&mut self) -> U512 {
        let available = self.available();
        self.available.set(U512::zero());
        available
    }
}

impl DelegationManager {
    /// Register a live registry node as a delegation target
    pub fn register_agent(&mut self, agent_id: &String) -> NodeInfo {
        if agent_id.is_empty() {
            self.env().revert(Error::InvalidNodeId);
        }
        if self.is_registered(agent_id.clone()) {
            self.env().revert(Error::AgentAlreadyRegistered);
        }
        let node = self
            .query_node(agent_id)
            .unwrap_or_revert_with(&self.env(), Error::NodeNotFound);
        if !node.is_active() {
            self.env().revert(Error::NodeDeactivated);
        }

        let mut agents = self.agents();
        agents.push(agent_id.clone());
        self.agents.set(agents);
        node
    }

    /// Delegate up to `amount` of the idle balance across agents in registration order
    ///
    /// An agent is skipped when the room left on it is below the minimum join
    /// amount. Meeting a deactivated agent reclaims its funds and restarts the
    /// scan; the reclaimed funds stay idle for the next pass.
    pub fn allocate(&mut self, amount: U512) -> Rebalance {
        let mut outcome = Rebalance::default();
        let mut remaining = amount;
        let mut scanned: Vec<String> = Vec::new();

        'scan: loop {
            for agent_id in self.agents() {
                if scanned.contains(&agent_id) {
                    continue;
                }
                let node = match self.query_node(&agent_id) {
                    Some(node) if node.is_active() => node,
                    _ => {
                        self.reclaim_agent(&agent_id);
                        outcome.dropped_agents.push(agent_id);
                        continue 'scan;
                    }
                };

                let committed = self.agent_delegation(agent_id.clone()).max(node.total_delegated);
                let capacity = self.max_capacity().saturating_sub(committed);
                let min_join = self.min_join();
                if capacity >= remaining {
                    if remaining >= min_join {
                        self.delegate_to(&agent_id, remaining);
                        outcome.amount += remaining;
                    }
                    break 'scan;
                }
                if capacity >= min_join {
                    self.delegate_to(&agent_id, capacity);
                    outcome.amount += capacity;
                    remaining -= capacity;
                }
                scanned.push(agent_id);
            }
            break;
        }
        outcome
    }

    /// Release at least `requested` back to the idle balance
    ///
    /// A request covering everything locked tears down every record. Otherwise
    /// records are released one by one: the largest while it does not exceed
    /// what is still owed, then the smallest one that covers the rest.
    pub fn deallocate(&mut self, requested: U512) -> Rebalance {
        let mut outcome = Rebalance::default();

        if requested >= self.locked_total() {
            while let Some(record) = self.records().into_iter().next() {
                let release = self.release(record, &mut outcome.dropped_agents);
                outcome.amount += release.amount();
            }
            return outcome;
        }

        let mut outstanding = requested;
        while !outstanding.is_zero() {
            let records = self.records();
            let target = match records.last() {
                None => break,
                Some(largest) if largest.amount <= outstanding => largest.clone(),
                Some(largest) => records
                    .iter()
                    .find(|record| record.amount >= outstanding)
                    .unwrap_or(largest)
                    .clone(),
            };
            let freed = self.release(target, &mut outcome.dropped_agents).amount();
            if freed.is_zero() {
                break;
            }
            outcome.amount += freed;
            outstanding = outstanding.saturating_sub(freed);
        }
        outcome
    }

    /// Add to the idle balance and delegate it once it reaches the minimum join amount
    pub fn deposit_idle(&mut self, amount: U512) -> Rebalance {
        let available = self.available() + amount;
        self.available.set(available);
        if available >= self.min_join() {
            self.allocate(available)
        } else {
            Rebalance::default()
        }
    }

    /// Take `amount` out of the managed capital for a withdrawal
    ///
    /// The idle balance is used first and the shortfall is undelegated. Any
    /// surplus released beyond the shortfall is delegated again when large
    /// enough. Returns `None` when not enough could be freed.
    pub fn free_capital(&mut self, amount: U512) -> Option<Vec<String>> {
        let available = self.available();
        if available >= amount {
            self.available.set(available - amount);
            return Some(Vec::new());
        }

        let shortfall = amount - available;
        self.available.set(U512::zero());
        let mut dropped = self.deallocate(shortfall).dropped_agents;

        let available = self.available();
        if available < shortfall {
            return None;
        }
        let surplus = available - shortfall;
        self.available.set(surplus);
        if surplus >= self.min_join() {
            dropped.extend(self.allocate(surplus).dropped_agents);
        }
        Some(dropped)
    }

    /// Delegate the whole idle balance on request
    pub fn allocate_idle(&mut self) -> Rebalance {
        let available = self.available();
        if available < self.min_join() {
            self.env().revert(Error::AvailableBelowMinJoin);
        }
        if self.agents().is_empty() {
            self.env().revert(Error::NoAgents);
        }
        let outcome = self.allocate(available);
        if outcome.amount.is_zero() {
            self.env().revert(Error::AgentsFull);
        }
        outcome
    }

    /// Undelegate everything placed with `agent_id` and deregister it
    pub fn remove_agent(&mut self, agent_id: &String) -> U512 {
        if !self.is_registered(agent_id.clone()) {
            self.env().revert(Error::AgentNotRegistered);
        }
        let active = self.query_node(agent_id).map_or(false, |node| node.is_active());
        if !active {
            return self.reclaim_agent(agent_id);
        }

        let mut total = U512::zero();
        for record in self.take_agent_records(agent_id) {
            self.undelegate(&record);
            total += record.amount;
        }
        self.deregister(agent_id);
        self.env().emit_event(AgentRemoved {
            agent_id: agent_id.clone(),
            reclaimed: total,
        });
        total
    }

    /// Release one record by receipt
    ///
    /// When the record's agent has been deactivated, the whole agent is reclaimed
    /// and reported as dropped.
    pub fn withdraw_delegation(&mut self, receipt_id: &String) -> Rebalance {
        let record = self
            .records()
            .into_iter()
            .find(|record| &record.receipt_id == receipt_id)
            .unwrap_or_revert_with(&self.env(), Error::DelegationNotFound);
        let mut dropped_agents = Vec::new();
        let amount = self.release(record, &mut dropped_agents).amount();
        Rebalance {
            amount,
            dropped_agents,
        }
    }

    // Internal functions

    fn registry_ref(&self) -> ValidatorRegistryContractRef {
        let registry = self
            .registry
            .get()
            .unwrap_or_revert_with(&self.env(), Error::RegistryNotSet);
        ValidatorRegistryContractRef::new(self.env(), registry)
    }

    fn query_node(&self, agent_id: &String) -> Option<NodeInfo> {
        self.registry_ref().query_node(agent_id.clone())
    }

    fn delegate_to(&mut self, agent_id: &String, amount: U512) {
        let receipt_id = self.registry_ref().with_tokens(amount).delegate(agent_id.clone());

        let mut records = self.records();
        insert_ordered(
            &mut records,
            DelegationRecord {
                agent_id: agent_id.clone(),
                receipt_id: receipt_id.clone(),
                amount,
            },
        );
        self.records.set(records);

        let agent_total = self.agent_delegation(agent_id.clone()) + amount;
        self.agent_delegations.set(agent_id, agent_total);
        let locked = self.locked_total() + amount;
        self.locked_total.set(locked);
        let available = self.available().saturating_sub(amount);
        self.available.set(available);

        self.env().emit_event(Delegated {
            agent_id: agent_id.clone(),
            receipt_id,
            amount,
        });
    }

    /// Undelegate a record already taken out of the book
    fn undelegate(&mut self, record: &DelegationRecord) {
        self.registry_ref().undelegate(record.receipt_id.clone());

        let agent_total = self
            .agent_delegation(record.agent_id.clone())
            .saturating_sub(record.amount);
        self.agent_delegations.set(&record.agent_id, agent_total);
        self.credit_released(record.amount);

        self.env().emit_event(Undelegated {
            agent_id: record.agent_id.clone(),
            receipt_id: record.receipt_id.clone(),
            amount: record.amount,
        });
    }

    /// Release one record, or the whole agent if the registry stopped it
    fn release(&mut self, record: DelegationRecord, dropped: &mut Vec<String>) -> Release {
        let active = self
            .query_node(&record.agent_id)
            .map_or(false, |node| node.is_active());
        if !active {
            let amount = self.reclaim_agent(&record.agent_id);
            dropped.push(record.agent_id);
            return Release::Reclaimed(amount);
        }

        let mut records = self.records();
        records.retain(|other| other.receipt_id != record.receipt_id);
        self.records.set(records);
        self.undelegate(&record);
        Release::Withdrawn(record.amount)
    }

    /// Write back the records of a deactivated agent; the registry has already paid them out
    fn reclaim_agent(&mut self, agent_id: &String) -> U512 {
        let amount = self
            .take_agent_records(agent_id)
            .iter()
            .fold(U512::zero(), |total, record| total + record.amount);
        self.credit_released(amount);
        self.deregister(agent_id);

        self.env().emit_event(DelegationReclaimed {
            agent_id: agent_id.clone(),
            amount,
        });
        self.env().emit_event(AgentRemoved {
            agent_id: agent_id.clone(),
            reclaimed: amount,
        });
        amount
    }

    fn credit_released(&mut self, amount: U512) {
        let locked = self.locked_total().saturating_sub(amount);
        self.locked_total.set(locked);
        let available = self.available() + amount;
        self.available.set(available);
    }

    fn take_agent_records(&mut self, agent_id: &String) -> Vec<DelegationRecord> {
        let (taken, kept): (Vec<_>, Vec<_>) = self
            .records()
            .into_iter()
            .partition(|record| &record.agent_id == agent_id);
        self.records.set(kept);
        taken
    }

    fn deregister(&mut self, agent_id: &String) {
        let mut agents = self.agents();
        agents.retain(|other| other != agent_id);
        self.agents.set(agents);
        self.agent_delegations.set(agent_id, U512::zero());
    }
}

/// Insert keeping ascending amount order; equal amounts go after existing ones
fn insert_ordered(records: &mut Vec<DelegationRecord>, record: DelegationRecord) {
    let index = records
        .iter()
        .position(|other| other.amount > record.amount)
        .unwrap_or(records.len());
    records.insert(index, record);
}
