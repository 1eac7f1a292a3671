//! Reentrancy guard tests for the Hearth staking pool

mod test_utils;

use odra::casper_types::U512;
use odra::host::HostRef;
use odra::prelude::*;

use test_utils::*;

#[test]
fn test_callback_during_delegation_is_rejected() {
    let mut f = setup();
    f.add_agent("node-a", f.carol, cspr(10_000));
    f.registry.set_reenter(true);

    f.env.set_caller(f.alice);
    let result = f.pool.with_tokens(cspr(600)).try_deposit();

    assert!(result.is_err(), "Registry callback into the pool must fail");
    assert!(f.pool.user_account(f.alice).is_none());
    assert_eq!(f.pool.total_delegated(), U512::zero());
}

#[test]
fn test_lock_is_released_after_rejected_call() {
    let mut f = setup();
    f.add_agent("node-a", f.carol, cspr(10_000));
    f.registry.set_reenter(true);

    f.env.set_caller(f.alice);
    assert!(f.pool.with_tokens(cspr(600)).try_deposit().is_err());

    f.registry.set_reenter(false);
    f.deposit(f.alice, cspr(600));

    assert_eq!(f.pool.total_delegated(), cspr(600));
    assert_eq!(f.pool.user_account(f.alice).unwrap().total_deposited, cspr(600));
}
