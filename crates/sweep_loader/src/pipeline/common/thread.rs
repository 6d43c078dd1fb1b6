//! Thread-local storage for worker identification and randomness.
//!
//! Every pipeline worker gets a stable ID and its own seeded RNG when it is
//! spawned. Production steps draw their randomness (window jitter) through
//! [`with_worker_rng`], so a fixed base seed gives each worker a
//! reproducible stream.

use rand::rngs::StdRng;
use rand::Rng as _;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    /// Thread-local worker ID.
    ///
    /// Each worker thread is assigned a unique ID (0 to worker_count-1) when
    /// spawned. Used for log messages and per-worker seeding.
    pub static WORKER_ID: RefCell<usize> = const { RefCell::new(0) };

    /// Thread-local RNG for deterministic randomness in workers
    pub static WORKER_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Initialize worker's RNG based on worker_id and base seed.
/// Seed formula: base_seed + worker_id
pub fn init_worker_rng(worker_id: usize, base_seed: u64) {
    WORKER_RNG.with(|rng| {
        let seed = base_seed.wrapping_add(worker_id as u64);
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Runs `f` with this thread's worker RNG.
///
/// Outside a worker (no RNG initialized yet) a fresh RNG is seeded from the
/// thread RNG and kept for later calls on the same thread.
pub fn with_worker_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    WORKER_RNG.with(|rng| {
        let mut rng_ref = rng.borrow_mut();
        let rng = rng_ref.get_or_insert_with(|| StdRng::seed_from_u64(rand::rng().random()));
        f(rng)
    })
}

/// Runs `f` with `rng` installed as this thread's worker RNG.
///
/// Draws made through [`with_worker_rng`] inside `f` advance `rng`; the
/// thread's previous RNG is put back afterwards, also when `f` panics.
pub fn with_rng_installed<T>(rng: &mut StdRng, f: impl FnOnce() -> T) -> T {
    struct Restore<'a> {
        rng: &'a mut StdRng,
        previous: Option<StdRng>,
    }

    impl Drop for Restore<'_> {
        fn drop(&mut self) {
            WORKER_RNG.with(|slot| {
                let mut slot = slot.borrow_mut();
                if let Some(advanced) = slot.take() {
                    *self.rng = advanced;
                }
                *slot = self.previous.take();
            })
        }
    }

    let previous = WORKER_RNG.with(|slot| slot.borrow_mut().replace(rng.clone()));
    let _restore = Restore { rng, previous };
    f()
}

/// Returns the ID of the current worker thread (0 outside workers).
pub fn current_worker_id() -> usize {
    WORKER_ID.with(|id| *id.borrow())
}
