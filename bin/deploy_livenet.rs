//! Livenet deployment script for Hearth contracts
//!
//! Deploys RewardToken and StakingPool to a Casper network, then funds the
//! pool's reward budget.
//!
//! Environment:
//! * `REGISTRY_ADDRESS` - validator registry the pool delegates through (required)
//! * `REWARD_PER_BLOCK` - reward token units emitted per block (default 1 token)
//! * `BLOCK_INTERVAL_MS` - block time used to derive heights (default 16384)
//! * `REWARD_BUDGET` - reward tokens minted to the pool (default 1,000,000 tokens)

use std::str::FromStr;

use odra::casper_types::{U256, U512};
use odra::host::Deployer;
use odra::prelude::{Address, Addressable};
use hearth::{RewardToken, RewardTokenInitArgs, StakingPool, StakingPoolInitArgs};

const TOKEN: u128 = 1_000_000_000_000_000_000;

fn env_or(name: &str, default: u128) -> u128 {
    std::env::var(name)
        .ok()
        .map(|value| value.parse().expect("numeric environment value"))
        .unwrap_or(default)
}

fn main() {
    // Load the Casper livenet environment
    let env = odra_casper_livenet_env::env();

    // Caller is the deployer, admin and token minter
    let deployer = env.caller();
    println!("Deployer address: {}", deployer.to_string());

    let registry_address = std::env::var("REGISTRY_ADDRESS")
        .expect("REGISTRY_ADDRESS env var must be set");
    let registry = Address::from_str(&registry_address).expect("Invalid registry address");
    let reward_per_block = env_or("REWARD_PER_BLOCK", TOKEN);
    let block_interval_ms = env_or("BLOCK_INTERVAL_MS", 16_384) as u64;
    let budget = env_or("REWARD_BUDGET", 1_000_000 * TOKEN);

    // Treasury and award receiver - same as deployer for now
    let treasury = deployer;

    // Step 1: Deploy the reward token with the deployer as minter
    println!("\n=== Deploying RewardToken ===");
    env.set_gas(200_000_000_000u64); // 200 CSPR gas (CEP-18 needs more)

    let mut token = RewardToken::deploy(
        &env,
        RewardTokenInitArgs {
            symbol: "HRT".to_string(),
            name: "Hearth Reward Token".to_string(),
            minter: deployer,
        },
    );
    let token_address = token.address();
    println!("RewardToken deployed at: {}", token_address.to_string());

    // Step 2: Deploy the pool
    println!("\n=== Deploying StakingPool ===");
    env.set_gas(400_000_000_000u64); // 400 CSPR gas

    let pool = StakingPool::deploy(
        &env,
        StakingPoolInitArgs {
            reward_token: token_address,
            registry,
            treasury,
            award_receiver: treasury,
            admin: deployer,
            reward_per_block: U512::from(reward_per_block),
            block_interval_ms,
        },
    );
    let pool_address = pool.address();
    println!("StakingPool deployed at: {}", pool_address.to_string());

    // Step 3: Fund the reward budget
    println!("\n=== Funding reward budget ===");
    env.set_gas(5_000_000_000u64); // 5 CSPR gas

    token.mint(pool_address, U256::from(budget));
    println!("Minted {} reward units to the pool", budget);

    println!("\n=== Deployment Summary ===");
    println!("StakingPool: {}", pool_address.to_string());
    println!("RewardToken: {}", token_address.to_string());
    println!("Registry: {}", registry_address);
    println!("Admin: {}", deployer.to_string());
    println!("\nDeployment complete!");
}
