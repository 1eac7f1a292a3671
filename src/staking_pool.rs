//! StakingPool - pooled CSPR staking with block rewards and multi-node delegation
//!
//! Users deposit CSPR and earn a fixed per-block emission of the reward token,
//! shared pro rata over everything staked. The deposited CSPR is delegated across
//! validator nodes registered as agents; block-level consensus income from those
//! nodes is collected separately and split between the project and a treasury.

use alloc::{string::String, vec::Vec};
use odra::prelude::*;
use odra::casper_types::{U256, U512};
use odra::ContractRef;

use crate::consensus_award::{ConsensusAwardManager, ConsensusAwardState, OperatingMode};
use crate::delegation::{DelegationManager, DelegationSnapshot};
use crate::deposit_coordinator::TotalDeposit;
use crate::errors::Error;
use crate::events::{
    AdminTransferred, AgentAdded, AgentRemoved, ConsensusAwardHarvested, ConsensusAwardReceived,
    Delegated, DelegationReclaimed, DelegationToggled, Deposited, EmergencyWithdrawn,
    EndBlockExtended, RewardDeferred, RewardPaid, TreasuryFlushed, TreasuryRatioUpdated,
    Undelegated, Withdrawn,
};
use crate::guard::ReentrancyGuard;
use crate::ledger::{UserAccount, UserLedger};
use crate::reward_pool::{RewardPool, RewardPoolState};
use crate::reward_token::{from_token_units, to_token_units, RewardTokenContractRef};
use crate::validator_registry::LiquiditySinkContractRef;

// Constants
const DEFAULT_MIN_STAKE: u64 = 1_000_000_000; // 1 CSPR in motes
const DEFAULT_MAX_STAKE: u64 = 100_000_000_000_000_000; // 100M CSPR
const DEFAULT_MIN_REWARD_TRANSFER: u64 = 1_000_000_000_000_000; // 0.001 reward token
const DEFAULT_MIN_TREASURY_FLUSH: u64 = 1_000_000; // 0.001 CSPR
/// Denominator of `lp_reward_ratio`
pub const LP_RATIO_SCALE: u32 = 10_000;

/// One entry of a consensus award distribution
#[odra::odra_type]
pub struct ConsensusAward {
    pub receiver: Address,
    pub amount: U512,
}

#[odra::module(events = [
    Deposited,
    Withdrawn,
    EmergencyWithdrawn,
    RewardPaid,
    RewardDeferred,
    AgentAdded,
    AgentRemoved,
    Delegated,
    Undelegated,
    DelegationReclaimed,
    DelegationToggled,
    ConsensusAwardReceived,
    ConsensusAwardHarvested,
    TreasuryFlushed,
    TreasuryRatioUpdated,
    EndBlockExtended,
    AdminTransferred
])]
pub struct StakingPool {
    // Collaborators
    reward_token: Var<Address>,
    treasury: Var<Address>,
    award_receiver: Var<Address>,
    liquidity_sink: Var<Address>,

    // Components
    reward_pool: SubModule<RewardPool>,
    ledger: SubModule<UserLedger>,
    delegation: SubModule<DelegationManager>,
    total_deposit: SubModule<TotalDeposit>,
    consensus_award: SubModule<ConsensusAwardManager>,
    guard: SubModule<ReentrancyGuard>,

    // Creator of each registered agent
    agent_creators: Mapping<String, Option<Address>>,

    // Config
    block_interval_ms: Var<u64>,
    min_stake: Var<U512>,
    max_stake: Var<U512>,
    min_reward_transfer: Var<U512>,
    min_treasury_flush: Var<U512>,
    lp_reward_ratio: Var<u32>,
    lock_duration_ms: Var<u64>,
    reward_agent_creators: Var<bool>,

    // Admin
    admin: Var<Address>,
}

#[odra::module]
impl StakingPool {
    /// Initialize the pool
    ///
    /// # Arguments
    /// * `reward_token` - Reward token contract; its balance held by the pool is the emission budget
    /// * `registry` - Validator registry, also the only host allowed to deliver consensus awards
    /// * `treasury` - Receives the treasury share of consensus awards
    /// * `award_receiver` - Receives the project share of consensus awards in normal mode
    /// * `admin` - Admin address for pool management
    /// * `reward_per_block` - Reward token units emitted per block
    /// * `block_interval_ms` - Block time used to derive heights from the block clock
    pub fn init(
        &mut self,
        reward_token: Address,
        registry: Address,
        treasury: Address,
        award_receiver: Address,
        admin: Address,
        reward_per_block: U512,
        block_interval_ms: u64,
    ) {
        if reward_per_block.is_zero() || block_interval_ms == 0 {
            self.env().revert(Error::InvalidRewardConfig);
        }
        self.reward_token.set(reward_token);
        self.treasury.set(treasury);
        self.award_receiver.set(award_receiver);
        self.admin.set(admin);
        self.block_interval_ms.set(block_interval_ms);

        self.min_stake.set(U512::from(DEFAULT_MIN_STAKE));
        self.max_stake.set(U512::from(DEFAULT_MAX_STAKE));
        self.min_reward_transfer.set(U512::from(DEFAULT_MIN_REWARD_TRANSFER));
        self.min_treasury_flush.set(U512::from(DEFAULT_MIN_TREASURY_FLUSH));
        self.lp_reward_ratio.set(0);
        self.lock_duration_ms.set(0);
        self.reward_agent_creators.set(false);

        let block = self.current_block();
        self.reward_pool.init(reward_per_block, block);
        self.delegation.init(registry);
        self.total_deposit.init();
        self.consensus_award.init();
    }

    // ============ USER FUNCTIONS ============

    /// Deposit the attached CSPR; pays out any reward accrued so far
    #[odra(payable)]
    pub fn deposit(&mut self) {
        self.non_reentrant(|pool| pool.deposit_inner());
    }

    /// Withdraw part of the caller's deposit; pays out accrued reward
    pub fn withdraw(&mut self, amount: U512) {
        self.non_reentrant(|pool| {
            let caller = pool.env().caller();
            pool.withdraw_inner(caller, amount);
        });
    }

    /// Withdraw the caller's whole deposit
    pub fn quit(&mut self) {
        self.non_reentrant(|pool| {
            let caller = pool.env().caller();
            let account = pool.require_account(caller);
            pool.withdraw_inner(caller, account.total_deposited);
        });
    }

    /// Withdraw the caller's whole deposit without touching the reward token
    ///
    /// Any reward accrued or carried over is forfeited.
    pub fn emergency_withdraw(&mut self) {
        self.non_reentrant(|pool| {
            let caller = pool.env().caller();
            pool.emergency_withdraw_inner(caller);
        });
    }

    pub fn claim_rewards(&mut self) {
        self.non_reentrant(|pool| {
            let caller = pool.env().caller();
            pool.claim_inner(caller);
        });
    }

    /// Settle `user`'s reward; the payout always goes to `user`
    pub fn claim_rewards_for(&mut self, user: Address) {
        self.non_reentrant(|pool| pool.claim_inner(user));
    }

    /// Settle several users in one call; unknown addresses are skipped
    pub fn claim_rewards_for_many(&mut self, users: Vec<Address>) {
        self.non_reentrant(|pool| {
            for user in users {
                if pool.ledger.account(user).is_some() {
                    pool.claim_inner(user);
                }
            }
        });
    }

    /// Bring the reward accumulator up to the current block
    pub fn update_pool(&mut self) -> U512 {
        self.non_reentrant(|pool| {
            let block = pool.current_block();
            pool.reward_pool.update_pool(block)
        })
    }

    // ============ CONSENSUS AWARDS ============

    /// Receive block-level income from the registry
    ///
    /// Only entries addressed to this pool count, and the attached value must
    /// equal their sum.
    #[odra(payable)]
    pub fn on_consensus_award(&mut self, awards: Vec<ConsensusAward>) {
        self.non_reentrant(|pool| {
            let host = pool
                .delegation
                .registry()
                .unwrap_or_revert_with(&pool.env(), Error::RegistryNotSet);
            if pool.env().caller() != host {
                pool.env().revert(Error::NotHost);
            }

            let me = pool.env().self_address();
            let amount = awards
                .iter()
                .filter(|award| award.receiver == me)
                .fold(U512::zero(), |total, award| total + award.amount);
            if amount != pool.env().attached_value() {
                pool.env().revert(Error::AwardMismatch);
            }
            if !amount.is_zero() {
                pool.consensus_award.record_award(amount);
            }
        });
    }

    /// Split the available consensus award and send both shares on
    ///
    /// # Returns
    /// The project share
    pub fn harvest_consensus_award(&mut self) -> U512 {
        self.non_reentrant(|pool| {
            let min_flush = pool.min_treasury_flush();
            let harvest = pool.consensus_award.harvest(min_flush);
            if !harvest.flushed.is_zero() {
                let treasury = pool.get_treasury_address();
                pool.env().transfer_tokens(&treasury, &harvest.flushed);
                pool.env().emit_event(TreasuryFlushed {
                    treasury,
                    amount: harvest.flushed,
                });
            }
            pool.route_project_share(harvest.project_share);
            harvest.project_share
        })
    }

    // ============ AGENTS AND DELEGATION ============

    /// Register a registry node as a delegation target
    ///
    /// The node creator's own deposit is recorded on their account, and earns
    /// reward when creator rewards are switched on.
    pub fn add_agent(&mut self, agent_id: String) {
        self.non_reentrant(|pool| pool.add_agent_inner(agent_id));
    }

    /// Undelegate everything placed with an agent and drop it
    pub fn remove_agent(&mut self, agent_id: String) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.require_delegation_enabled();
            pool.delegation.remove_agent(&agent_id);
            pool.retire_agent_creator(&agent_id, false);
        });
    }

    /// Like `remove_agent`, but the creator's reward is not settled
    pub fn emergency_remove_agent(&mut self, agent_id: String) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.require_delegation_enabled();
            pool.delegation.remove_agent(&agent_id);
            pool.retire_agent_creator(&agent_id, true);
        });
    }

    /// Delegate the idle balance
    ///
    /// # Returns
    /// Amount delegated
    pub fn allocate_idle(&mut self) -> U512 {
        self.non_reentrant(|pool| {
            pool.require_delegation_enabled();
            let outcome = pool.delegation.allocate_idle();
            pool.retire_agents(outcome.dropped_agents);
            outcome.amount
        })
    }

    /// Undelegate at least `amount` into the idle balance
    ///
    /// # Returns
    /// Amount actually freed
    pub fn deallocate(&mut self, amount: U512) -> U512 {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.require_delegation_enabled();
            if amount.is_zero() {
                pool.env().revert(Error::AmountMustBePositive);
            }
            let outcome = pool.delegation.deallocate(amount);
            pool.retire_agents(outcome.dropped_agents);
            outcome.amount
        })
    }

    /// Undelegate a single delegation by receipt
    ///
    /// # Returns
    /// Amount released; all of the agent's delegations when it was deactivated
    pub fn withdraw_delegation(&mut self, receipt_id: String) -> U512 {
        self.non_reentrant(|pool| {
            pool.require_admin();
            let outcome = pool.delegation.withdraw_delegation(&receipt_id);
            pool.retire_agents(outcome.dropped_agents);
            outcome.amount
        })
    }

    pub fn enable_delegation(&mut self) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            let dropped = pool.total_deposit.enable(&mut pool.delegation);
            pool.retire_agents(dropped);
            pool.env().emit_event(DelegationToggled { enabled: true });
        });
    }

    /// Undelegate everything; deposits then stay idle in the contract
    pub fn disable_delegation(&mut self) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            let dropped = pool.total_deposit.disable(&mut pool.delegation);
            pool.retire_agents(dropped);
            pool.env().emit_event(DelegationToggled { enabled: false });
        });
    }

    // ============ ADMIN FUNCTIONS ============

    /// Withdraw the whole deposit of each listed user, paying out their reward
    pub fn quit_many(&mut self, users: Vec<Address>) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            for user in users {
                let deposited = pool
                    .ledger
                    .account(user)
                    .map(|account| account.total_deposited)
                    .unwrap_or_default();
                if !deposited.is_zero() {
                    pool.withdraw_inner(user, deposited);
                }
            }
        });
    }

    /// Emergency-withdraw each listed user
    pub fn give_up_many(&mut self, users: Vec<Address>) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            for user in users {
                let deposited = pool
                    .ledger
                    .account(user)
                    .map(|account| account.total_deposited)
                    .unwrap_or_default();
                if !deposited.is_zero() {
                    pool.emergency_withdraw_inner(user);
                }
            }
        });
    }

    /// Lengthen the emission window by as many blocks as `value` pays for
    pub fn extend_end_block(&mut self, value: U512) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            let block = pool.current_block();
            pool.reward_pool.update_pool(block);
            let added_blocks = pool.reward_pool.extend_end_block(value);
            pool.env().emit_event(EndBlockExtended {
                added_blocks,
                end_block: pool.reward_pool.end_block(),
            });
        });
    }

    pub fn set_min_join_deposit(&mut self, value: U512) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.delegation.set_min_join(value);
        });
    }

    pub fn set_max_agent_capacity(&mut self, value: U512) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.delegation.set_max_capacity(value);
        });
    }

    /// Set the treasury share of consensus awards, in percent (10 to 99)
    pub fn set_treasury_ratio(&mut self, ratio: u8) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            let old_ratio = pool.consensus_award.set_treasury_ratio(ratio);
            pool.env().emit_event(TreasuryRatioUpdated {
                old_ratio,
                new_ratio: ratio,
            });
        });
    }

    pub fn set_operating_mode(&mut self, mode: OperatingMode) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            if mode == OperatingMode::Liquidity && pool.liquidity_sink.get().is_none() {
                pool.env().revert(Error::LiquiditySinkNotSet);
            }
            pool.consensus_award.set_operating_mode(mode);
        });
    }

    pub fn set_liquidity_sink(&mut self, sink: Address) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.liquidity_sink.set(sink);
        });
    }

    pub fn set_award_receiver(&mut self, receiver: Address) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.award_receiver.set(receiver);
        });
    }

    pub fn set_treasury(&mut self, treasury: Address) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.treasury.set(treasury);
        });
    }

    /// Rewards below this many reward token units are carried over instead of paid
    pub fn set_min_reward_transfer(&mut self, amount: U512) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.min_reward_transfer.set(amount);
        });
    }

    /// Treasury share of consensus awards is buffered until it reaches this many motes
    pub fn set_min_treasury_flush(&mut self, amount: U512) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.min_treasury_flush.set(amount);
        });
    }

    /// Share of each reward payout sent to the liquidity sink in liquidity mode,
    /// in basis points
    pub fn set_lp_reward_ratio(&mut self, ratio: u32) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            if ratio > LP_RATIO_SCALE {
                pool.env().revert(Error::InvalidLpRatio);
            }
            pool.lp_reward_ratio.set(ratio);
        });
    }

    pub fn set_staking_bounds(&mut self, min_stake: U512, max_stake: U512) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            if max_stake.is_zero() || min_stake > max_stake {
                pool.env().revert(Error::InvalidStakingBounds);
            }
            pool.min_stake.set(min_stake);
            pool.max_stake.set(max_stake);
        });
    }

    /// Rewards paid after this call stay locked for `lock_duration_ms`; zero disables locking
    pub fn set_lock_duration(&mut self, lock_duration_ms: u64) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.lock_duration_ms.set(lock_duration_ms);
        });
    }

    /// Whether node creators registered from now on earn reward on their node deposit
    pub fn set_reward_agent_creators(&mut self, enabled: bool) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            pool.reward_agent_creators.set(enabled);
        });
    }

    pub fn transfer_admin(&mut self, new_admin: Address) {
        self.non_reentrant(|pool| {
            pool.require_admin();
            let old_admin = pool.get_admin_address();
            pool.admin.set(new_admin);
            pool.env().emit_event(AdminTransferred {
                old_admin,
                new_admin,
            });
        });
    }

    // ============ VIEW FUNCTIONS ============

    /// Reward `user` would receive if settled now
    pub fn pending_reward(&self, user: Address) -> U512 {
        match self.ledger.account(user) {
            Some(account) => {
                let acc = self.reward_pool.preview_acc_per_share(self.current_block());
                let pending = account.pending(acc);
                pending - self.lp_share_of(pending)
            }
            None => U512::zero(),
        }
    }

    pub fn user_account(&self, user: Address) -> Option<UserAccount> {
        self.ledger.account(user)
    }

    pub fn user_count(&self) -> u32 {
        self.ledger.user_count()
    }

    /// Height derived from the block clock
    pub fn current_block(&self) -> u64 {
        let interval = self.block_interval_ms.get_or_default().max(1);
        self.env().get_block_time() / interval
    }

    pub fn pool_state(&self) -> RewardPoolState {
        self.reward_pool.state()
    }

    /// Reward tokens held by the pool
    pub fn reward_balance(&self) -> U512 {
        let token = self.get_reward_token_address();
        let balance = RewardTokenContractRef::new(self.env(), token).balance_of(self.env().self_address());
        from_token_units(balance)
    }

    pub fn total_distributed(&self) -> U512 {
        self.ledger.total_distributed()
    }

    pub fn total_deposit(&self) -> U512 {
        self.total_deposit.total()
    }

    pub fn total_delegated(&self) -> U512 {
        self.delegation.locked_total()
    }

    pub fn available_for_delegation(&self) -> U512 {
        self.delegation.available()
    }

    pub fn delegation_snapshot(&self) -> DelegationSnapshot {
        self.delegation.snapshot()
    }

    pub fn agents(&self) -> Vec<String> {
        self.delegation.agents()
    }

    pub fn agent_creator(&self, agent_id: String) -> Option<Address> {
        self.agent_creators.get(&agent_id).flatten()
    }

    pub fn is_delegation_enabled(&self) -> bool {
        self.total_deposit.is_delegation_enabled()
    }

    pub fn consensus_award_state(&self) -> ConsensusAwardState {
        self.consensus_award.state()
    }

    /// Project share of the award not yet harvested
    pub fn available_consensus_award(&self) -> U512 {
        self.consensus_award
            .project_share(self.consensus_award.available_award())
    }

    /// Project share of every award received so far
    pub fn total_consensus_award(&self) -> U512 {
        let total = self.consensus_award.available_award() + self.consensus_award.transferred_award();
        self.consensus_award.project_share(total)
    }

    pub fn pending_treasury(&self) -> U512 {
        self.consensus_award.pending_treasury()
    }

    pub fn min_stake(&self) -> U512 {
        self.min_stake.get_or_default()
    }

    pub fn max_stake(&self) -> U512 {
        self.max_stake.get_or_default()
    }

    pub fn min_reward_transfer(&self) -> U512 {
        self.min_reward_transfer.get_or_default()
    }

    pub fn min_treasury_flush(&self) -> U512 {
        self.min_treasury_flush.get_or_default()
    }

    pub fn lp_reward_ratio(&self) -> u32 {
        self.lp_reward_ratio.get_or_default()
    }

    pub fn lock_duration(&self) -> u64 {
        self.lock_duration_ms.get_or_default()
    }

    pub fn min_join_deposit(&self) -> U512 {
        self.delegation.min_join()
    }

    pub fn max_agent_capacity(&self) -> U512 {
        self.delegation.max_capacity()
    }

    pub fn treasury_ratio(&self) -> u8 {
        self.consensus_award.treasury_ratio()
    }

    pub fn rewards_agent_creators(&self) -> bool {
        self.reward_agent_creators.get_or_default()
    }

    pub fn get_admin(&self) -> Option<Address> {
        self.admin.get()
    }

    pub fn get_treasury(&self) -> Option<Address> {
        self.treasury.get()
    }

    pub fn get_award_receiver(&self) -> Option<Address> {
        self.award_receiver.get()
    }

    pub fn get_liquidity_sink(&self) -> Option<Address> {
        self.liquidity_sink.get()
    }

    pub fn get_reward_token(&self) -> Option<Address> {
        self.reward_token.get()
    }

    pub fn get_registry(&self) -> Option<Address> {
        self.delegation.registry()
    }

    // Internal functions

    fn require_admin(&self) {
        if self.env().caller() != self.get_admin_address() {
            self.env().revert(Error::NotAdmin);
        }
    }

    fn require_delegation_enabled(&self) {
        if !self.total_deposit.is_delegation_enabled() {
            self.env().revert(Error::DelegationDisabled);
        }
    }

    fn require_account(&self, user: Address) -> UserAccount {
        self.ledger
            .account(user)
            .unwrap_or_revert_with(&self.env(), Error::UserNotFound)
    }

    fn get_admin_address(&self) -> Address {
        self.admin.get().unwrap_or_revert_with(&self.env(), Error::AdminNotSet)
    }

    fn get_treasury_address(&self) -> Address {
        self.treasury.get().unwrap_or_revert_with(&self.env(), Error::TreasuryNotSet)
    }

    fn get_reward_token_address(&self) -> Address {
        self.reward_token.get().unwrap_or_revert_with(&self.env(), Error::TokenNotSet)
    }
}

impl StakingPool {
    /// Run `call` with the reentrancy lock held
    fn non_reentrant<R>(&mut self, call: impl FnOnce(&mut Self) -> R) -> R {
        self.guard.enter();
        let result = call(self);
        self.guard.exit();
        result
    }

    fn deposit_inner(&mut self) {
        let caller = self.env().caller();
        let amount = self.env().attached_value();
        if amount.is_zero() {
            self.env().revert(Error::AmountMustBePositive);
        }
        if amount < self.min_stake() {
            self.env().revert(Error::BelowMinimumStake);
        }
        if amount > self.max_stake() {
            self.env().revert(Error::AboveMaximumStake);
        }

        let block = self.current_block();
        let acc = self.reward_pool.update_pool(block);
        let mut account = match self.ledger.account(caller) {
            Some(mut account) => {
                self.settle(caller, &mut account, acc);
                account
            }
            None => UserAccount::new(block),
        };

        account.total_deposited += amount;
        account.available_amount += amount;
        account.last_deposit_height = block;
        if account.total_deposited > self.max_stake() {
            self.env().revert(Error::UserAboveMaximumStake);
        }
        self.grow_supply(amount, block);
        account.sync_debt(acc);
        let total_deposited = account.total_deposited;
        self.ledger.save(caller, account);

        let dropped = self.total_deposit.add(amount, &mut self.delegation);
        self.retire_agents(dropped);

        self.env().emit_event(Deposited {
            user: caller,
            amount,
            total_deposited,
            block,
        });
    }

    fn withdraw_inner(&mut self, user: Address, amount: U512) {
        if amount.is_zero() {
            self.env().revert(Error::AmountMustBePositive);
        }
        let mut account = self.require_account(user);
        if amount > account.total_deposited {
            self.env().revert(Error::WithdrawExceedsDeposit);
        }

        let block = self.current_block();
        let acc = self.reward_pool.update_pool(block);
        self.settle(user, &mut account, acc);

        let dropped = self.free_capital(amount);
        account.total_deposited -= amount;
        account.available_amount = account.available_amount.saturating_sub(amount);
        self.shrink_supply(amount, block);
        account.sync_debt(acc);
        let remaining = account.total_deposited;
        self.ledger.save(user, account);

        self.env().transfer_tokens(&user, &amount);
        self.retire_agents(dropped);

        self.env().emit_event(Withdrawn {
            user,
            amount,
            remaining,
        });
    }

    fn emergency_withdraw_inner(&mut self, user: Address) {
        let mut account = self.require_account(user);
        let amount = account.total_deposited;
        if amount.is_zero() {
            self.env().revert(Error::AmountMustBePositive);
        }

        let dropped = self.free_capital(amount);
        let block = self.current_block();
        let acc = self.reward_pool.update_pool(block);
        let forfeited_reward = account.pending(acc);

        account.total_deposited = U512::zero();
        account.available_amount = account.available_amount.saturating_sub(amount);
        account.pending_reward = U512::zero();
        self.shrink_supply(amount, block);
        account.sync_debt(acc);
        self.ledger.save(user, account);

        self.env().transfer_tokens(&user, &amount);
        self.retire_agents(dropped);

        self.env().emit_event(EmergencyWithdrawn {
            user,
            amount,
            forfeited_reward,
        });
    }

    fn claim_inner(&mut self, user: Address) {
        let mut account = self.require_account(user);
        let block = self.current_block();
        let acc = self.reward_pool.update_pool(block);
        self.settle(user, &mut account, acc);
        account.sync_debt(acc);
        self.ledger.save(user, account);
    }

    fn add_agent_inner(&mut self, agent_id: String) {
        self.require_admin();
        self.require_delegation_enabled();
        let node = self.delegation.register_agent(&agent_id);
        let conflict = self
            .delegation
            .agents()
            .iter()
            .filter(|other| **other != agent_id)
            .any(|other| self.agent_creator(other.clone()) == Some(node.creator));
        if conflict {
            self.env().revert(Error::CreatorConflict);
        }

        let open_node_award = self.rewards_agent_creators();
        let block = self.current_block();
        let acc = self.reward_pool.update_pool(block);
        let mut account = match self.ledger.account(node.creator) {
            Some(mut account) => {
                self.settle(node.creator, &mut account, acc);
                account
            }
            None => UserAccount::new(block),
        };
        account.agent_amount = node.deposit;
        account.open_node_award = open_node_award;
        if open_node_award {
            account.available_amount += node.deposit;
            self.grow_supply(node.deposit, block);
        }
        account.sync_debt(acc);
        self.ledger.save(node.creator, account);
        self.agent_creators.set(&agent_id, Some(node.creator));

        self.env().emit_event(AgentAdded {
            agent_id,
            creator: node.creator,
            agent_deposit: node.deposit,
            open_node_award,
        });
    }

    /// Pay or defer `account`'s pending reward; the caller re-syncs its debt
    fn settle(&mut self, user: Address, account: &mut UserAccount, acc: U512) {
        let previous_pending = account.pending_reward;
        let pending = account.pending(acc);
        if pending.is_zero() {
            return;
        }

        let pool_balance = self.reward_balance();
        if pending < self.min_reward_transfer() || pending > pool_balance {
            account.pending_reward = pending;
            self.env().emit_event(RewardDeferred {
                user,
                previous_pending,
                pending,
                pool_balance,
            });
            return;
        }

        let lp_share = self.lp_share_of(pending);
        let amount = pending - lp_share;
        account.pending_reward = U512::zero();
        account.total_received += amount;
        self.ledger.record_payment(pending);
        let unlock_time = if amount.is_zero() {
            0
        } else {
            self.pay_reward(user, amount)
        };
        if !lp_share.is_zero() {
            self.route_lp_share(lp_share);
        }
        self.env().emit_event(RewardPaid {
            user,
            amount,
            lp_share,
            unlock_time,
        });
    }

    /// Part of a reward payout that goes to the liquidity sink
    fn lp_share_of(&self, reward: U512) -> U512 {
        if self.consensus_award.operating_mode() != OperatingMode::Liquidity {
            return U512::zero();
        }
        reward * U512::from(self.lp_reward_ratio()) / U512::from(LP_RATIO_SCALE)
    }

    /// Let the sink pull `amount` reward tokens from the pool
    fn route_lp_share(&mut self, amount: U512) {
        let sink = self
            .liquidity_sink
            .get()
            .unwrap_or_revert_with(&self.env(), Error::LiquiditySinkNotSet);
        let token = self.get_reward_token_address();
        let units = self.token_units(amount);
        RewardTokenContractRef::new(self.env(), token).approve(sink, units);
        LiquiditySinkContractRef::new(self.env(), sink)
            .amount_enter(alloc::vec![amount], alloc::vec![token]);
    }

    fn token_units(&self, amount: U512) -> U256 {
        to_token_units(amount).unwrap_or_revert_with(&self.env(), Error::AmountOverflow)
    }

    /// Returns the unlock time, zero when the reward is spendable at once
    fn pay_reward(&self, user: Address, amount: U512) -> u64 {
        let token = self.get_reward_token_address();
        let mut token = RewardTokenContractRef::new(self.env(), token);
        let amount = self.token_units(amount);
        let lock_duration = self.lock_duration();
        if lock_duration == 0 {
            token.transfer(user, amount);
            return 0;
        }
        let unlock_time = self.env().get_block_time() + lock_duration;
        token.transfer_locked(user, amount, unlock_time);
        unlock_time
    }

    fn grow_supply(&mut self, amount: U512, block: u64) {
        if self.reward_pool.add_supply(amount) {
            let budget = self.reward_balance();
            self.reward_pool.open_emission(block, budget);
        }
    }

    fn shrink_supply(&mut self, amount: U512, block: u64) {
        if self.reward_pool.sub_supply(amount) {
            let budget = self.reward_balance();
            self.reward_pool.close_emission(block, budget);
        }
    }

    fn free_capital(&mut self, amount: U512) -> Vec<String> {
        match self.total_deposit.subtract(amount, &mut self.delegation) {
            Some(dropped) => dropped,
            None => self.env().revert(Error::InsufficientLiquidity),
        }
    }

    fn route_project_share(&mut self, amount: U512) {
        if amount.is_zero() {
            return;
        }
        match self.consensus_award.operating_mode() {
            OperatingMode::Normal => {
                let receiver = self
                    .award_receiver
                    .get()
                    .unwrap_or_revert_with(&self.env(), Error::AwardReceiverNotSet);
                self.env().transfer_tokens(&receiver, &amount);
            }
            OperatingMode::Liquidity => {
                let sink = self
                    .liquidity_sink
                    .get()
                    .unwrap_or_revert_with(&self.env(), Error::LiquiditySinkNotSet);
                LiquiditySinkContractRef::new(self.env(), sink)
                    .with_tokens(amount)
                    .amount_enter(alloc::vec![U512::zero()], Vec::new());
            }
        }
    }

    fn retire_agents(&mut self, agent_ids: Vec<String>) {
        for agent_id in agent_ids {
            self.retire_agent_creator(&agent_id, false);
        }
    }

    /// Detach a departed agent's creator; their node stake stops earning
    fn retire_agent_creator(&mut self, agent_id: &String, emergency: bool) {
        let creator = match self.agent_creators.get(agent_id).flatten() {
            Some(creator) => creator,
            None => return,
        };
        self.agent_creators.set(agent_id, None);
        let mut account = match self.ledger.account(creator) {
            Some(account) => account,
            None => return,
        };

        let block = self.current_block();
        let acc = self.reward_pool.update_pool(block);
        if !emergency {
            self.settle(creator, &mut account, acc);
        }
        if account.open_node_award {
            account.available_amount = account.available_amount.saturating_sub(account.agent_amount);
            self.shrink_supply(account.agent_amount, block);
        }
        account.agent_amount = U512::zero();
        account.open_node_award = false;
        account.sync_debt(acc);
        self.ledger.save(creator, account);
    }
}
