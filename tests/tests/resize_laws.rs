use kloss::{Allocator, RegionBuffer};
use tests::{fill, verify};

#[test]
fn missing_pointer_allocates() {
    let mut alloc = Allocator::growing(512);

    unsafe {
        let p = alloc.resize(None, 64).unwrap();
        fill(p, 64, 3);
        verify(p, 64, 3);

        alloc.free(Some(p));
    }
}

#[test]
fn zero_size_frees() {
    let mut buf = RegionBuffer::<512>::new();
    let mut alloc = Allocator::fixed(&mut buf);

    let p = alloc.alloc(100).unwrap();

    unsafe {
        assert_eq!(alloc.resize(Some(p), 0), None);
    }

    // The blocks went back; the same request lands on the same spot.
    let q = alloc.alloc(100).unwrap();
    assert_eq!(p, q);

    unsafe { alloc.free(Some(q)) };
}

#[test]
fn zero_size_allocations_fail_cleanly() {
    let mut alloc = Allocator::system();

    assert_eq!(alloc.alloc(0), None);
    assert_eq!(alloc.alloc_zeroed(0, 16), None);
    assert_eq!(alloc.alloc_zeroed(16, 0), None);
    assert_eq!(alloc.copy_of(&[]), None);
}

#[test]
fn leading_bytes_survive_any_resize() {
    let sizes = [16usize, 100, 500, 40, 900, 8, 300];

    let mut alloc = Allocator::growing(512).with_fallback(Allocator::tracked());

    let mut ptr = alloc.alloc(sizes[0]).unwrap();
    let mut len = sizes[0];
    fill(ptr, len, 111);

    for size in &sizes[1..] {
        unsafe {
            ptr = alloc.resize(Some(ptr), *size).unwrap();
        }

        verify(ptr, len.min(*size), 111);

        len = *size;
        fill(ptr, len, 111);
    }

    unsafe { alloc.free(Some(ptr)) };
}

#[test]
fn copies_are_independent() {
    let mut alloc = Allocator::tracked();

    let source = [42u8; 64];
    let p = alloc.copy_of(&source).unwrap();

    unsafe {
        assert_eq!(core::slice::from_raw_parts(p.as_ptr(), 64), &source[..]);
        p.as_ptr().write(0);
    }

    assert_eq!(source[0], 42);
    unsafe { alloc.free(Some(p)) };
}

#[test]
fn zeroed_matrix_is_all_zero() {
    let mut alloc = Allocator::growing(4096);

    let p = alloc.alloc_zeroed(32, 24).unwrap();

    for at in 0..32 * 24 {
        assert_eq!(unsafe { p.as_ptr().add(at).read() }, 0);
    }

    unsafe { alloc.free(Some(p)) };
}
