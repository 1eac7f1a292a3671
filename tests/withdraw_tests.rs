//! Withdrawal tests for the Hearth staking pool

mod test_utils;

use odra::casper_types::{U256, U512};
use odra::host::HostRef;
use odra::prelude::*;

use hearth::errors::Error;
use hearth::events::{EmergencyWithdrawn, Withdrawn};

use test_utils::*;

#[test]
fn test_partial_withdraw_pays_reward() {
    let mut f = setup();
    f.fund(1_000);
    f.deposit(f.alice, cspr(1_000));
    f.advance_blocks(10);

    f.env.set_caller(f.alice);
    f.pool.withdraw(cspr(400));

    let account = f.pool.user_account(f.alice).unwrap();
    assert_eq!(account.total_deposited, cspr(600));
    assert_eq!(account.available_amount, cspr(600));
    assert_eq!(f.reward_balance_of(f.alice), tokens_u256(10));
    assert_eq!(f.pool_balance(), cspr(600));
    assert_eq!(f.pool.pool_state().total_staked, cspr(600));

    assert!(f.env.emitted_event(
        &f.pool,
        Withdrawn {
            user: f.alice,
            amount: cspr(400),
            remaining: cspr(600),
        }
    ));
}

#[test]
fn test_withdraw_more_than_deposit_fails() {
    let mut f = setup();
    f.deposit(f.alice, cspr(100));

    f.env.set_caller(f.alice);
    let result = f.pool.try_withdraw(cspr(101));
    assert_eq!(result.unwrap_err(), Error::WithdrawExceedsDeposit.into());

    let result = f.pool.try_withdraw(U512::zero());
    assert_eq!(result.unwrap_err(), Error::AmountMustBePositive.into());
}

#[test]
fn test_withdraw_unknown_user_fails() {
    let mut f = setup();
    f.env.set_caller(f.bob);

    let result = f.pool.try_withdraw(cspr(1));
    assert_eq!(result.unwrap_err(), Error::UserNotFound.into());
}

#[test]
fn test_quit_deletes_account() {
    let mut f = setup();
    f.deposit(f.alice, cspr(100));
    f.deposit(f.bob, cspr(100));

    f.env.set_caller(f.alice);
    f.pool.quit();

    assert!(f.pool.user_account(f.alice).is_none());
    assert_eq!(f.pool.user_count(), 1);
    assert_eq!(f.pool.total_deposit(), cspr(100));
    assert_eq!(f.pool_balance(), cspr(100));
}

#[test]
fn test_withdraw_undelegates_smallest_covering_record() {
    let mut f = setup();
    f.env.set_caller(f.admin);
    f.pool.set_min_join_deposit(cspr(100));
    f.add_agent("node-a", f.carol, cspr(10_000));

    f.deposit(f.alice, cspr(200));
    f.deposit(f.alice, cspr(500));
    assert_eq!(f.pool.delegation_snapshot().records.len(), 2);

    // 150 is covered by the 200 record; the 50 left over stays idle
    f.env.set_caller(f.alice);
    f.pool.withdraw(cspr(150));

    let snapshot = f.pool.delegation_snapshot();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].amount, cspr(500));
    assert_eq!(snapshot.locked_total, cspr(500));
    assert_eq!(snapshot.available, cspr(50));
    assert_eq!(f.pool_balance(), cspr(50));
}

#[test]
fn test_withdraw_returns_surplus_to_idle_balance() {
    let mut f = setup();
    f.add_agent("node-a", f.carol, cspr(10_000));
    f.deposit(f.alice, cspr(500));
    assert_eq!(f.pool.total_delegated(), cspr(500));

    // The whole 500 record comes back; 200 is below the join amount and stays idle
    f.env.set_caller(f.alice);
    f.pool.withdraw(cspr(300));

    assert_eq!(f.pool.total_delegated(), U512::zero());
    assert_eq!(f.pool.available_for_delegation(), cspr(200));
    assert_eq!(f.pool_balance(), cspr(200));
    assert_eq!(f.pool.user_account(f.alice).unwrap().total_deposited, cspr(200));
}

#[test]
fn test_withdraw_redelegates_large_surplus() {
    let mut f = setup();
    f.env.set_caller(f.admin);
    f.pool.set_min_join_deposit(cspr(100));
    f.add_agent("node-a", f.carol, cspr(10_000));
    f.deposit(f.alice, cspr(500));

    f.env.set_caller(f.alice);
    f.pool.withdraw(cspr(300));

    assert_eq!(f.pool.total_delegated(), cspr(200));
    assert_eq!(f.pool.available_for_delegation(), U512::zero());
    assert_eq!(f.pool_balance(), U512::zero());
}

#[test]
fn test_quit_tears_down_all_delegations() {
    let mut f = setup();
    f.env.set_caller(f.admin);
    f.pool.set_min_join_deposit(cspr(100));
    f.add_agent("node-a", f.carol, cspr(10_000));
    f.deposit(f.alice, cspr(200));
    f.deposit(f.alice, cspr(500));

    f.env.set_caller(f.alice);
    f.pool.quit();

    let snapshot = f.pool.delegation_snapshot();
    assert!(snapshot.records.is_empty());
    assert_eq!(snapshot.locked_total, U512::zero());
    assert_eq!(snapshot.available, U512::zero());
    assert_eq!(f.registry.open_receipts("node-a".to_string()), 0);
    assert_eq!(f.pool_balance(), U512::zero());
}

#[test]
fn test_emergency_withdraw_forfeits_reward() {
    let mut f = setup();
    f.fund(1_000);
    f.deposit(f.alice, cspr(1_000));
    f.advance_blocks(10);

    f.env.set_caller(f.alice);
    f.pool.emergency_withdraw();

    assert!(f.pool.user_account(f.alice).is_none());
    assert_eq!(f.reward_balance_of(f.alice), U256::zero());
    assert_eq!(f.pool_balance(), U512::zero());
    assert!(f.env.emitted_event(
        &f.pool,
        EmergencyWithdrawn {
            user: f.alice,
            amount: cspr(1_000),
            forfeited_reward: tokens(10),
        }
    ));
}

#[test]
fn test_admin_quits_many_users() {
    let mut f = setup();
    f.fund(1_000);
    f.deposit(f.alice, cspr(100));
    f.deposit(f.bob, cspr(100));
    f.advance_blocks(2);

    f.env.set_caller(f.admin);
    f.pool.quit_many(vec![f.alice, f.bob, f.dave]);

    assert_eq!(f.pool.user_count(), 0);
    assert_eq!(f.pool.total_deposit(), U512::zero());
    assert_eq!(f.reward_balance_of(f.alice), tokens_u256(1));
    assert_eq!(f.reward_balance_of(f.bob), tokens_u256(1));
}

#[test]
fn test_admin_gives_up_many_users() {
    let mut f = setup();
    f.fund(1_000);
    f.deposit(f.alice, cspr(100));
    f.deposit(f.bob, cspr(100));
    f.advance_blocks(2);

    f.env.set_caller(f.alice);
    let result = f.pool.try_give_up_many(vec![f.alice]);
    assert_eq!(result.unwrap_err(), Error::NotAdmin.into());

    f.env.set_caller(f.admin);
    f.pool.give_up_many(vec![f.alice, f.bob]);

    assert_eq!(f.pool.user_count(), 0);
    assert_eq!(f.reward_balance_of(f.alice), U256::zero());
    assert_eq!(f.pool_balance(), U512::zero());
}
