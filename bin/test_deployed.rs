//! Smoke test for deployed contracts on localnet
//!
//! Deposits into a deployed StakingPool, claims, and withdraws.

use std::str::FromStr;

use odra::casper_types::U512;
use odra::host::{HostRef, HostRefLoader};
use odra::prelude::Address;
use hearth::{RewardToken, StakingPool};

fn main() {
    let env = odra_casper_livenet_env::env();
    let caller = env.caller();

    println!("=== Testing Deployed Contracts ===\n");
    println!("Caller: {}", caller.to_string());

    let pool_address = std::env::var("STAKING_POOL_ADDRESS")
        .expect("STAKING_POOL_ADDRESS env var must be set");
    let token_address = std::env::var("REWARD_TOKEN_ADDRESS")
        .expect("REWARD_TOKEN_ADDRESS env var must be set");

    let pool_addr = Address::from_str(&pool_address).expect("Invalid StakingPool address");
    let token_addr = Address::from_str(&token_address).expect("Invalid RewardToken address");

    let mut pool = StakingPool::load(&env, pool_addr);
    let token = RewardToken::load(&env, token_addr);

    // Test 1: Read basic view functions
    println!("\n--- Test 1: View Functions ---");
    println!("Pool state: {:?}", pool.pool_state());
    println!("Total deposit: {:?}", pool.total_deposit());
    println!("Total delegated: {:?}", pool.total_delegated());
    println!("Agents: {:?}", pool.agents());
    println!("Reward budget: {:?}", pool.reward_balance());

    // Test 2: Deposit 600 CSPR, enough to trigger a delegation
    println!("\n--- Test 2: Depositing 600 CSPR ---");
    env.set_gas(30_000_000_000u64); // 30 CSPR gas

    let deposit_amount = U512::from(600_000_000_000u64);
    pool.with_tokens(deposit_amount).deposit();
    println!("Account: {:?}", pool.user_account(caller));
    println!("Delegation: {:?}", pool.delegation_snapshot());

    // Test 3: Claim whatever has accrued
    println!("\n--- Test 3: Claiming rewards ---");
    env.set_gas(15_000_000_000u64); // 15 CSPR gas

    println!("Pending before claim: {:?}", pool.pending_reward(caller));
    pool.claim_rewards();
    println!("Reward token balance: {:?}", token.balance_of(caller));

    // Test 4: Withdraw everything
    println!("\n--- Test 4: Quitting ---");
    env.set_gas(30_000_000_000u64); // 30 CSPR gas

    pool.quit();
    println!("Account after quit: {:?}", pool.user_account(caller));
    println!("Total deposit: {:?}", pool.total_deposit());

    println!("\n=== All Tests Passed! ===");
}
