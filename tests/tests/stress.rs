use core::ptr::NonNull;

use kloss::Allocator;
use rand::prelude::*;
use tests::{fill, verify, RNG_SEED};

// Random interleavings of alloc/resize/free against a region chain with a
// tracked spill-over, checking payload integrity at every step.
#[test]
fn random_interleavings_preserve_payloads() {
    let mut rng = StdRng::seed_from_u64(RNG_SEED);
    let mut alloc = Allocator::growing(512).with_fallback(Allocator::tracked());

    let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

    for _ in 0..4096 {
        match rng.gen_range(0..4) {
            0 | 1 => {
                let len = rng.gen_range(1..700);
                let seed = rng.gen::<u8>();

                if let Some(p) = alloc.alloc(len) {
                    fill(p, len, seed);
                    live.push((p, len, seed));
                }
            }
            2 if !live.is_empty() => {
                let at = rng.gen_range(0..live.len());
                let (p, len, seed) = live[at];
                verify(p, len, seed);

                let new_len = rng.gen_range(1..700);

                // SAFETY: `p` is tracked as live in the model.
                if let Some(q) = unsafe { alloc.resize(Some(p), new_len) } {
                    verify(q, len.min(new_len), seed);
                    fill(q, new_len, seed);
                    live[at] = (q, new_len, seed);
                }
            }
            3 if !live.is_empty() => {
                let at = rng.gen_range(0..live.len());
                let (p, len, seed) = live.swap_remove(at);
                verify(p, len, seed);

                // SAFETY: `p` was live and is forgotten by the model here.
                unsafe { alloc.free(Some(p)) };
            }
            _ => {}
        }
    }

    for (p, len, seed) in live.drain(..) {
        verify(p, len, seed);
        unsafe { alloc.free(Some(p)) };
    }
}

// The same churn against a bounded fixed region, where most operations
// fail locally and the chain has to keep routing correctly.
#[test]
fn bounded_region_stays_consistent_under_churn() {
    let mut rng = StdRng::seed_from_u64(RNG_SEED ^ 0xdead_beef);
    let mut alloc = Allocator::fixed_owned(2048).with_fallback(Allocator::tracked());

    let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

    for _ in 0..2048 {
        if live.len() < 24 && rng.gen_bool(0.6) {
            let len = rng.gen_range(1..400);
            let seed = rng.gen::<u8>();

            if let Some(p) = alloc.alloc(len) {
                fill(p, len, seed);
                live.push((p, len, seed));
            }
        } else if !live.is_empty() {
            let at = rng.gen_range(0..live.len());
            let (p, len, seed) = live.swap_remove(at);
            verify(p, len, seed);

            // SAFETY: `p` was live and is forgotten by the model here.
            unsafe { alloc.free(Some(p)) };
        }
    }

    for (p, len, seed) in live.drain(..) {
        verify(p, len, seed);
        unsafe { alloc.free(Some(p)) };
    }
}
