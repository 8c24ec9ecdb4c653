//! [<img alt="github" src="https://img.shields.io/badge/github-udoprog/kloss-8da0cb?style=for-the-badge&logo=github" height="20">](https://github.com/udoprog/kloss)
//! [<img alt="crates.io" src="https://img.shields.io/crates/v/kloss.svg?style=for-the-badge&color=fc8d62&logo=rust" height="20">](https://crates.io/crates/kloss)
//! [<img alt="docs.rs" src="https://img.shields.io/badge/docs.rs-kloss-66c2a5?style=for-the-badge&logoColor=white" height="20">](https://docs.rs/kloss)
//!
//! Composable memory allocation strategies with fallback chaining.
//!
//! This crate provides a single polymorphic [`Allocator`] handle over four
//! strategies:
//!
//! * `system`: an untracked passthrough to the OS heap.
//! * `tracked`: the OS heap with an ownership ledger, so teardown releases
//!   every outstanding block.
//! * `fixed`: exactly one bump-plus-freelist region over caller-provided
//!   (or owned) memory.
//! * `growing`: a sequence of regions that adds a fresh one whenever none
//!   can serve.
//!
//! Handles chain through [`Allocator::with_fallback`]: a request the front
//! handle cannot satisfy walks down the chain, and every block carries a
//! self-describing header, so `free` and `resize` route back to whichever
//! handle owns the pointer. A resize no strategy can serve locally migrates
//! the payload to a fresh allocation taken from the root of the chain.
//!
//! <br>
//!
//! ## Examples
//!
//! ```
//! use kloss::{Allocator, RegionBuffer};
//!
//! let mut buf = RegionBuffer::<456>::new();
//! let mut alloc = Allocator::fixed(&mut buf).with_fallback(Allocator::tracked());
//!
//! let a = alloc.alloc(100).expect("allocation a failed");
//! let b = alloc.alloc(100).expect("allocation b failed");
//!
//! // The region is exhausted by now; this one spills into the tracked
//! // fallback and is still released through the same chain.
//! let c = alloc.alloc(400).expect("allocation c failed");
//!
//! // SAFETY: Every pointer is live and was allocated through this chain.
//! unsafe {
//!     alloc.free(Some(b));
//!     alloc.free(Some(c));
//!
//!     // Grows in place when the neighbouring blocks allow it.
//!     let a = alloc.resize(Some(a), 150).expect("resize failed");
//!     alloc.free(Some(a));
//! }
//! ```

#![deny(missing_docs)]
#![no_std]
#![cfg_attr(doc_cfg, feature(doc_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;


mod header;
pub use self::header::{BLOCK, MAX_BYTES};

#[cfg(feature = "alloc")]
mod free_list;

mod region;
#[doc(inline)]
pub use self::region::RegionBuffer;

#[cfg(feature = "alloc")]
mod system;
#[cfg(feature = "alloc")]
mod tracked;

#[cfg(feature = "alloc")]
mod allocator;
#[cfg(feature = "alloc")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "alloc")))]
pub use self::allocator::Allocator;

/// The default buffer size for a stack-backed [`RegionBuffer`].
pub const DEFAULT_REGION_BUFFER: usize = 4096;
