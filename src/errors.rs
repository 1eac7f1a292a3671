//! Error definitions for Hearth

use odra::prelude::*;

/// Hearth protocol errors
///
/// Codes are grouped: validation (1-19), state (20-49),
/// external calls and liquidity (50-69), reward token (70-79).
#[odra::odra_error]
pub enum Error {
    // ============ VALIDATION ============
    /// Amount must be greater than zero
    AmountMustBePositive = 1,
    /// Deposit is below the configured minimum
    BelowMinimumStake = 2,
    /// Deposit is above the configured maximum
    AboveMaximumStake = 3,
    /// User's total deposit would exceed the configured maximum
    UserAboveMaximumStake = 4,
    /// Withdrawal exceeds the user's deposit
    WithdrawExceedsDeposit = 5,
    /// Treasury ratio must satisfy 10 <= c < 100
    InvalidTreasuryRatio = 6,
    /// Node identifier is empty
    InvalidNodeId = 7,
    /// Minimum join deposit is zero or above the agent capacity
    InvalidMinJoin = 8,
    /// Agent capacity is below the minimum join deposit
    InvalidCapacity = 9,
    /// Attached value does not match the awards addressed to this contract
    AwardMismatch = 10,
    /// Reward per block and block interval must be positive
    InvalidRewardConfig = 11,
    /// Staking bounds are inverted
    InvalidStakingBounds = 12,
    /// Liquidity share of rewards is above 10000 basis points
    InvalidLpRatio = 13,

    // ============ STATE ============
    /// No staking record for this address
    UserNotFound = 20,
    /// Node is already registered as an agent
    AgentAlreadyRegistered = 21,
    /// Node is not registered as an agent
    AgentNotRegistered = 22,
    /// Registry does not know this node
    NodeNotFound = 23,
    /// Registry reports this node as deactivated
    NodeDeactivated = 24,
    /// Node creator already created another registered agent
    CreatorConflict = 25,
    /// Delegation is turned off
    DelegationDisabled = 26,
    /// Delegation is already turned on
    DelegationAlreadyEnabled = 27,
    /// No agent has been registered
    NoAgents = 28,
    /// Idle capital is below the minimum join deposit
    AvailableBelowMinJoin = 29,
    /// Every registered agent is at capacity
    AgentsFull = 30,
    /// No consensus award to harvest
    NoConsensusAward = 31,
    /// No delegation record with this receipt
    DelegationNotFound = 32,
    /// Entry point re-entered while another call is in progress
    ReentrantCall = 33,
    /// Liquidity mode selected without a sink address
    LiquiditySinkNotSet = 34,

    // ============ EXTERNAL / ACCESS ============
    /// Delegations could not free enough capital for the withdrawal
    InsufficientLiquidity = 50,
    /// Caller is not the consensus host
    NotHost = 51,
    /// Caller is not admin
    NotAdmin = 52,
    /// Admin address not set
    AdminNotSet = 53,
    /// Reward token address not set
    TokenNotSet = 54,
    /// Validator registry address not set
    RegistryNotSet = 55,
    /// Treasury address not set
    TreasuryNotSet = 56,
    /// Award receiver address not set
    AwardReceiverNotSet = 57,

    // ============ REWARD TOKEN ============
    /// Caller is not authorized minter
    NotMinter = 70,
    /// Minter address not set
    MinterNotSet = 71,
    /// Transfer would spend tokens that are still locked
    LockedBalance = 72,
    /// Amount does not fit in the reward token's 256-bit balances
    AmountOverflow = 73,
}
