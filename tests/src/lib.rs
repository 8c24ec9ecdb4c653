//! Shared support for integration tests and benches.

use core::ptr::NonNull;

/// Default random seed to use.
pub const RNG_SEED: u64 = 2718281828459045235;

/// Write a recognisable pattern into an allocation.
pub fn fill(ptr: NonNull<u8>, len: usize, seed: u8) {
    for at in 0..len {
        unsafe {
            ptr.as_ptr().add(at).write(seed.wrapping_add(at as u8));
        }
    }
}

/// Assert the pattern written by [`fill`] is intact.
pub fn verify(ptr: NonNull<u8>, len: usize, seed: u8) {
    for at in 0..len {
        let value = unsafe { ptr.as_ptr().add(at).read() };
        assert_eq!(value, seed.wrapping_add(at as u8), "mismatch at byte {at}");
    }
}
