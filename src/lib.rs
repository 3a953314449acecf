//! # segalloc - A Segregated Free-List Allocator
//!
//! This crate provides a **segregated free-list allocator** (explicit free
//! list, boundary-tagged, first-fit within a size class) that manages memory
//! using the `sbrk` system call — the same memory-system boundary this
//! lineage's earlier bump allocator used, but with blocks that can be
//! reused out of order and coalesced back together.
//!
//! ## Overview
//!
//! ```text
//!   Segregated Free List:
//!
//!   lists[0]  [1,2)    -> ...
//!   lists[..] ...
//!   lists[k]  [2^k,2^(k+1)) -> head (largest) <-> ... <-> tail (smallest)
//!   lists[19] [2^19,..)
//!
//!   Each bucket is a doubly-linked list of free blocks in that size class,
//!   kept in ascending order with the largest block at the head.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   segalloc
//!   ├── align      - Alignment helpers (align!, align_to!, align_up8)
//!   ├── block      - Boundary-tagged block primitives (internal)
//!   ├── list       - Segregated free-list index (internal)
//!   ├── coalesce   - Physical-neighbor merging (internal)
//!   ├── heap       - sbrk-backed heap extension (internal)
//!   ├── allocator  - Allocator: malloc/free/realloc/stats
//!   └── team       - team identity record
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use segalloc::Allocator;
//!
//! fn main() {
//!     let mut allocator = Allocator::new();
//!     allocator.init().expect("failed to bootstrap the heap");
//!
//!     let p = allocator.malloc(64);
//!     assert!(!p.is_null());
//!     allocator.free(p);
//! }
//! ```
//!
//! ## How It Works
//!
//! The allocator uses `sbrk(2)` to extend the program's data segment, the
//! same way this crate's earlier bump allocator did. Unlike a bump
//! allocator, freed blocks are tracked in a segregated free-list index and
//! can satisfy later requests of any order, not just the most recent one.
//!
//! Every block carries a boundary tag (a header and a footer word, each
//! packing size/tag/allocated) so that a freed block's physical neighbors
//! can be located and merged in O(1), regardless of which bucket they sit
//! in.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives; `Allocator` is
//!   deliberately `!Send`/`!Sync`.
//! - **Never returns memory to the host**: `sbrk` only grows.
//! - **Unix-only**: requires `libc` and `sbrk` (POSIX systems).
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! The public `Allocator` API is safe to call; the internals below it
//! operate on raw addresses and are confined to `block` and `heap`.

pub mod align;
mod allocator;
mod block;
mod coalesce;
mod heap;
mod list;
pub mod team;

pub use allocator::{Allocator, HeapStats};
