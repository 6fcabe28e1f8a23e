//! Optimistic output, callee settlement and cross-pool rollback

mod common;

use common::*;
use std::sync::{Arc, Mutex};
use torq_amm::{Address, Event, FlashSwapCallee, Ledger, PoolError, Reserves};

fn borrower() -> Address {
    Address::repeat_byte(0x33)
}

#[test]
fn flash_swap_repaid_with_fee_succeeds() {
    let h = Harness::new();
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 100_000);
    h.fund(token_b(), borrower(), 4);

    let seen: Arc<Mutex<Option<Reserves>>> = Arc::new(Mutex::new(None));
    let callee = {
        let ledger = h.ledger.clone();
        let pool = pool.clone();
        let seen = seen.clone();
        move |sender: Address, _amount0: u128, amount1: u128, data: &[u8]| -> Result<(), PoolError> {
            assert_eq!(sender, borrower());
            assert_eq!(data, b"arb");
            *seen.lock().unwrap() = Some(pool.reserves());
            // 1000 borrowed at 0.3% costs 1004 back
            let repay = amount1 * 10_000 / 9_970 + 1;
            ledger.transfer(token_b(), borrower(), pool.address(), repay)?;
            Ok(())
        }
    };

    pool.swap(
        borrower(),
        0,
        1_000,
        borrower(),
        b"arb",
        Some(&callee as &dyn FlashSwapCallee),
    )
    .unwrap();

    // The callee saw the provisional reserves, net of the optimistic output
    let provisional = seen.lock().unwrap().take().unwrap();
    assert_eq!((provisional.reserve0, provisional.reserve1), (100_000, 99_000));

    let reserves = pool.reserves();
    assert_eq!((reserves.reserve0, reserves.reserve1), (100_000, 100_004));
    assert_eq!(h.balance(token_b(), borrower()), 0);
    assert!(matches!(
        h.ledger.events().last(),
        Some(Event::Swap {
            amount1_in: 1_004,
            amount1_out: 1_000,
            ..
        })
    ));
}

#[test]
fn underpaid_flash_swap_rolls_back_everything() {
    let h = Harness::new();
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 100_000);
    h.fund(token_b(), borrower(), 3);
    let events_before = h.ledger.events();

    let callee = {
        let ledger = h.ledger.clone();
        let pool_address = pool.address();
        move |_: Address, _: u128, amount1: u128, _: &[u8]| -> Result<(), PoolError> {
            ledger.transfer(token_b(), borrower(), pool_address, amount1 + 3)?;
            Ok(())
        }
    };

    assert_eq!(
        pool.swap(
            borrower(),
            0,
            1_000,
            borrower(),
            b"arb",
            Some(&callee as &dyn FlashSwapCallee),
        ),
        Err(PoolError::KValueCheckFailed)
    );

    assert_eq!(h.balance(token_b(), borrower()), 3);
    assert_eq!(h.balance(token_b(), pool.address()), 100_000);
    let reserves = pool.reserves();
    assert_eq!((reserves.reserve0, reserves.reserve1), (100_000, 100_000));
    assert_eq!(h.ledger.events(), events_before);
    assert_eq!(h.ledger.open_checkpoints(), 0);
    assert!(!pool.is_locked());
}

#[test]
fn reentering_the_pool_from_the_callee_is_locked_out() {
    let h = Harness::new();
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 100_000);

    let inner_result: Arc<Mutex<Option<Result<(), PoolError>>>> = Arc::new(Mutex::new(None));
    let callee = {
        let pool = pool.clone();
        let inner_result = inner_result.clone();
        move |_: Address, _: u128, _: u128, _: &[u8]| -> Result<(), PoolError> {
            let result = pool.sync();
            *inner_result.lock().unwrap() = Some(result.clone());
            result
        }
    };

    assert_eq!(
        pool.swap(
            borrower(),
            0,
            1_000,
            borrower(),
            b"reenter",
            Some(&callee as &dyn FlashSwapCallee),
        ),
        Err(PoolError::Locked)
    );
    assert_eq!(*inner_result.lock().unwrap(), Some(Err(PoolError::Locked)));
    assert!(!pool.is_locked());
    assert_eq!(h.balance(token_b(), borrower()), 0);
}

#[test]
fn callback_data_without_callee_fails() {
    let h = Harness::new();
    let pool = h.pool_ab();
    h.add_liquidity(&pool, 100_000, 100_000);

    assert_eq!(
        pool.swap(borrower(), 0, 1_000, borrower(), b"data", None),
        Err(PoolError::MissingCallee)
    );
    assert_eq!(h.balance(token_b(), borrower()), 0);
    assert_eq!(pool.reserves().reserve1, 100_000);
}

#[test]
fn failed_outer_swap_undoes_nested_swap_on_another_pool() {
    let h = Harness::new();
    let outer = h.pool_ab();
    let inner = h.factory.create_pair(token_c(), token_d()).unwrap();
    h.add_liquidity(&outer, 100_000, 100_000);
    h.add_liquidity(&inner, 100_000, 100_000);
    h.fund(token_c(), borrower(), 1_000);
    let events_before = h.ledger.events();

    let callee = {
        let ledger = h.ledger.clone();
        let inner = inner.clone();
        move |_: Address, _: u128, _: u128, _: &[u8]| -> Result<(), PoolError> {
            ledger.transfer(token_c(), borrower(), inner.address(), 1_000)?;
            inner.swap(borrower(), 0, 987, borrower(), &[], None)?;
            // Never repays the outer pool
            Ok(())
        }
    };

    assert_eq!(
        outer.swap(
            borrower(),
            0,
            1_000,
            borrower(),
            b"nested",
            Some(&callee as &dyn FlashSwapCallee),
        ),
        Err(PoolError::KValueCheckFailed)
    );

    let inner_reserves = inner.reserves();
    assert_eq!(
        (inner_reserves.reserve0, inner_reserves.reserve1),
        (100_000, 100_000)
    );
    assert_eq!(h.balance(token_c(), borrower()), 1_000);
    assert_eq!(h.balance(token_d(), borrower()), 0);
    assert_eq!(h.balance(token_b(), borrower()), 0);
    assert_eq!(h.ledger.events(), events_before);
}
