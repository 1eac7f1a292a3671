//! Test utilities and helpers for Hearth protocol tests

#![allow(dead_code)]

pub mod mock_liquidity_sink;
pub mod mock_registry;

pub use mock_liquidity_sink::{MockLiquiditySink, MockLiquiditySinkHostRef};
pub use mock_registry::{MockValidatorRegistry, MockValidatorRegistryHostRef};

use odra::casper_types::{U256, U512};
use odra::host::{Deployer, HostEnv, HostRef, NoArgs};
use odra::prelude::*;

use hearth::reward_token::{RewardToken, RewardTokenHostRef, RewardTokenInitArgs};
use hearth::staking_pool::{StakingPool, StakingPoolHostRef, StakingPoolInitArgs};

/// Constants for testing
pub const CSPR: u64 = 1_000_000_000; // 1 CSPR in motes (9 decimals)
pub const TOKEN: u128 = 1_000_000_000_000_000_000; // 1 reward token (18 decimals)
pub const BLOCK_MS: u64 = 10_000;
pub const REWARD_PER_BLOCK: u128 = TOKEN;

pub fn cspr(amount: u64) -> U512 {
    U512::from(amount * CSPR)
}

pub fn tokens(amount: u128) -> U512 {
    U512::from(amount * TOKEN)
}

pub fn tokens_u256(amount: u128) -> U256 {
    U256::from(amount * TOKEN)
}

/// Deployed contracts and the accounts playing each role
pub struct Fixture {
    pub env: HostEnv,
    pub pool: StakingPoolHostRef,
    pub token: RewardTokenHostRef,
    pub registry: MockValidatorRegistryHostRef,
    pub admin: Address,
    pub treasury: Address,
    pub award_receiver: Address,
    pub alice: Address,
    pub bob: Address,
    pub carol: Address,
    pub dave: Address,
}

impl Fixture {
    /// Mint reward tokens straight into the pool's budget
    pub fn fund(&mut self, amount: u128) {
        self.env.set_caller(self.admin);
        self.token.mint(self.pool.address(), tokens_u256(amount));
    }

    pub fn advance_blocks(&self, blocks: u64) {
        self.env.advance_block_time(blocks * BLOCK_MS);
    }

    pub fn deposit(&mut self, user: Address, amount: U512) {
        self.env.set_caller(user);
        self.pool.with_tokens(amount).deposit();
    }

    /// Register a node with the mock registry and add it as an agent
    pub fn add_agent(&mut self, node_id: &str, creator: Address, node_deposit: U512) {
        self.registry
            .register_node(node_id.to_string(), creator, node_deposit);
        self.env.set_caller(self.admin);
        self.pool.add_agent(node_id.to_string());
    }

    pub fn pool_balance(&self) -> U512 {
        self.env.balance_of(&self.pool.address())
    }

    pub fn reward_balance_of(&self, user: Address) -> U256 {
        self.token.balance_of(user)
    }
}

/// Deploy registry, reward token and pool; admin is also the token minter
pub fn setup() -> Fixture {
    let env = odra_test::env();

    let admin = env.get_account(0);
    let treasury = env.get_account(1);
    let award_receiver = env.get_account(2);
    let alice = env.get_account(3);
    let bob = env.get_account(4);
    let carol = env.get_account(5);
    let dave = env.get_account(6);

    env.set_caller(admin);
    let registry = MockValidatorRegistry::deploy(&env, NoArgs);
    let token = RewardToken::deploy(
        &env,
        RewardTokenInitArgs {
            symbol: "HRT".to_string(),
            name: "Hearth Reward Token".to_string(),
            minter: admin,
        },
    );
    let pool = StakingPool::deploy(
        &env,
        StakingPoolInitArgs {
            reward_token: token.address(),
            registry: registry.address(),
            treasury,
            award_receiver,
            admin,
            reward_per_block: U512::from(REWARD_PER_BLOCK),
            block_interval_ms: BLOCK_MS,
        },
    );

    Fixture {
        env,
        pool,
        token,
        registry,
        admin,
        treasury,
        award_receiver,
        alice,
        bob,
        carol,
        dave,
    }
}

pub fn deploy_liquidity_sink(env: &HostEnv) -> MockLiquiditySinkHostRef {
    MockLiquiditySink::deploy(env, NoArgs)
}
