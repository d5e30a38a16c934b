//! Atomic merge primitive for shared per-vertex state
//!
//! [`atomic_merge_min`] is the only sanctioned concurrent write path into
//! shared per-vertex state. Minimum is commutative, associative and
//! idempotent, so the final value of a slot does not depend on the order in
//! which racing threads apply their candidates.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};

/// A word-sized atomic cell that supports compare-and-exchange
pub trait AtomicSlot: Send + Sync {
    type Value: Copy + PartialOrd;

    fn load(&self, order: Ordering) -> Self::Value;

    fn store(&self, value: Self::Value, order: Ordering);

    fn compare_exchange_weak(
        &self,
        current: Self::Value,
        new: Self::Value,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self::Value, Self::Value>;
}

macro_rules! impl_atomic_slot {
    ($atomic:ty, $value:ty) => {
        impl AtomicSlot for $atomic {
            type Value = $value;

            #[inline]
            fn load(&self, order: Ordering) -> $value {
                <$atomic>::load(self, order)
            }

            #[inline]
            fn store(&self, value: $value, order: Ordering) {
                <$atomic>::store(self, value, order)
            }

            #[inline]
            fn compare_exchange_weak(
                &self,
                current: $value,
                new: $value,
                success: Ordering,
                failure: Ordering,
            ) -> Result<$value, $value> {
                <$atomic>::compare_exchange_weak(self, current, new, success, failure)
            }
        }
    };
}

impl_atomic_slot!(AtomicU32, u32);
impl_atomic_slot!(AtomicU64, u64);
impl_atomic_slot!(AtomicI64, i64);

/// An `f64` stored in an `AtomicU64` by bit pattern
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn into_inner(self) -> f64 {
        f64::from_bits(self.0.into_inner())
    }
}

impl AtomicSlot for AtomicF64 {
    type Value = f64;

    #[inline]
    fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.0.load(order))
    }

    #[inline]
    fn store(&self, value: f64, order: Ordering) {
        self.0.store(value.to_bits(), order)
    }

    #[inline]
    fn compare_exchange_weak(
        &self,
        current: f64,
        new: f64,
        success: Ordering,
        failure: Ordering,
    ) -> Result<f64, f64> {
        self.0
            .compare_exchange_weak(current.to_bits(), new.to_bits(), success, failure)
            .map(f64::from_bits)
            .map_err(f64::from_bits)
    }
}

/// Atomically replace `slot` with `min(slot, candidate)`.
///
/// Retries the compare-and-exchange until either the candidate is no longer
/// smaller than the stored value or the swap succeeds, so no update is lost
/// under any interleaving. Returns `true` if this call lowered the slot.
/// An incomparable candidate (NaN) never lowers the slot.
#[inline]
pub fn atomic_merge_min<A: AtomicSlot>(slot: &A, candidate: A::Value) -> bool {
    let mut current = slot.load(Ordering::Acquire);
    while candidate < current {
        match slot.compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return true,
            Err(observed) => current = observed,
        }
    }
    false
}
