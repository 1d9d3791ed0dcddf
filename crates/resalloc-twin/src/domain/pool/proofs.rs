//! Kani Formal Verification Proofs

use super::*;

/// Grant then release then commit returns the pool to its starting state
#[kani::proof]
fn proof_commit_conserves_units() {
    let total: u32 = kani::any();
    let amount: u32 = kani::any();
    kani::assume(total <= 1_000);
    kani::assume(amount <= total);

    let mut pool = ResourcePool::new(vec![total]);
    let r = ResourceId(0);

    kani::assert(pool.decrement_available(r, amount).is_ok(), "grant within total");
    kani::assert(pool.increment_pending(r, amount).is_ok(), "release recorded");
    kani::assert(
        pool.available_of(r).unwrap() == total - amount,
        "release not visible before commit",
    );

    pool.commit();
    kani::assert(pool.available_of(r).unwrap() == total, "commit restores total");
    kani::assert(!pool.has_pending(), "commit clears pending");
}

/// A grant never drives availability below zero
#[kani::proof]
fn proof_grant_never_overdraws() {
    let total: u32 = kani::any();
    let amount: u32 = kani::any();

    let mut pool = ResourcePool::new(vec![total]);
    let result = pool.decrement_available(ResourceId(0), amount);

    if amount > total {
        kani::assert(result.is_err(), "overdraw rejected");
        kani::assert(pool.available_of(ResourceId(0)).unwrap() == total, "ledger untouched");
    } else {
        kani::assert(result.is_ok(), "grant within total succeeds");
    }
}
