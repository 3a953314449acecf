//! The public allocator: size-class constants, `find_fit`/`place`, and the
//! `malloc`/`free`/`realloc` operations built on [`crate::heap`],
//! [`crate::list`], and [`crate::coalesce`].

use std::ptr;

use crate::align::align_up8;
use crate::block::BlockPtr;
use crate::coalesce::coalesce;
use crate::heap::{self, HeapState};
use crate::list::{self, Buckets};

/// Number of segregated size-class buckets, `lists[k]` holding free blocks
/// in `[2^k, 2^(k+1))`.
pub(crate) const NUM_BUCKETS: usize = 20;

/// Bytes requested from the memory system the first time [`Allocator::init`]
/// seeds the heap with a single free block.
const SEED_BLOCK_SIZE: usize = 64;

/// Requests at or above this adjusted size are split from the high address
/// end of a fit, leaving the low (already-addressed) remainder free; smaller
/// requests split from the low end instead. See [`Allocator::place`].
const LARGE_REQUEST_THRESHOLD: u32 = 73;

/// Slack added to every `realloc` target size, absorbing small amounts of
/// future growth without forcing a second grow-in-place or copy.
const REALLOC_BUFFER: usize = 128;

/// Minimum number of bytes requested from the memory system on any heap
/// extension triggered by `malloc` or `realloc`.
const MIN_EXTEND: usize = 4096;

/// Smallest legal block size: an 8-byte header+footer pair plus at least one
/// word each for the free-list `pred`/`succ` links.
const MIN_BLOCK_SIZE: u32 = 16;

/// Snapshot of heap occupancy, exposed only for diagnostics — nothing in the
/// allocator's core algorithms reads these numbers back.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapStats {
  pub heap_size: usize,
  pub bytes_free: usize,
  pub free_block_count: usize,
  pub bucket_occupancy: [usize; NUM_BUCKETS],
}

/// A segregated free-list allocator over a single `sbrk`-extended heap.
///
/// `init` must be called once, before any `malloc`/`free`/`realloc` call;
/// calling those before `init` (or after it fails) is undefined behavior,
/// same as calling `malloc`/`free` on an uninitialized `mm` implementation.
pub struct Allocator {
  lists: Buckets,
  heap: HeapState,
}

impl Default for Allocator {
  fn default() -> Self {
    Self::new()
  }
}

impl Allocator {
  /// Builds an allocator with no backing heap yet. Call [`Allocator::init`]
  /// before using it.
  pub fn new() -> Self {
    Self {
      lists: list::empty_buckets(),
      heap: HeapState { heap_lo: 0, base: 0, epilogue_header: 0 },
    }
  }

  /// Bootstraps the heap (alignment pad, prologue, epilogue) and seeds it
  /// with one free block. Safe to call again to reset the allocator to a
  /// fresh heap.
  pub fn init(&mut self) -> Result<(), ()> {
    self.lists = list::empty_buckets();
    self.heap = heap::bootstrap().ok_or(())?;
    heap::extend(&mut self.heap, &mut self.lists, SEED_BLOCK_SIZE).ok_or(())?;
    Ok(())
  }

  /// Rounds a requested payload size up to an adjusted block size: header
  /// and footer overhead, an 8-byte floor, and 8-byte alignment throughout.
  fn adjust(size: usize) -> u32 {
    if size == 0 {
      0
    } else if size <= 8 {
      MIN_BLOCK_SIZE
    } else {
      align_up8(size + 8) as u32
    }
  }

  /// Segregated-fit search: walk buckets from `asize`'s own bucket upward,
  /// but only actually scan a bucket's list once the remaining shifted
  /// search size has dropped to 1 (or it is the last bucket), matching the
  /// size-doubling structure of the index itself. Within a scanned bucket,
  /// walk from the head (largest) toward smaller sizes via `pred` and stop
  /// at the first block big enough.
  fn find_fit(&self, asize: u32) -> Option<BlockPtr> {
    let start = list::bucket_of(asize);
    let mut shifted = asize >> start;

    for k in start..NUM_BUCKETS {
      let scan_this_bucket = k == NUM_BUCKETS - 1 || (shifted <= 1 && self.lists[k].is_some());
      if scan_this_bucket {
        let mut node = self.lists[k];
        while let Some(candidate) = node {
          if candidate.size() >= asize {
            return Some(candidate);
          }
          node = unsafe { candidate.pred(self.heap.base) };
        }
      }
      shifted >>= 1;
    }
    None
  }

  /// Places a request of `asize` bytes into the free block `bp`, which must
  /// already have been removed from the index by the caller. Splits off and
  /// re-indexes the remainder when it is large enough to hold a block;
  /// large requests split from the high address end, small ones from the
  /// low end, matching the threshold in [`LARGE_REQUEST_THRESHOLD`].
  fn place(&mut self, bp: BlockPtr, asize: u32) -> BlockPtr {
    let total = bp.size();
    let remainder = total - asize;

    if remainder <= MIN_BLOCK_SIZE {
      bp.write_tags(total, false, true);
      return bp;
    }

    if asize >= LARGE_REQUEST_THRESHOLD {
      bp.write_tags(remainder, false, false);
      unsafe { list::insert_node(&mut self.lists, self.heap.base, bp, remainder) };
      let payload = bp.next_block();
      payload.write_tags(asize, false, true);
      payload
    } else {
      bp.write_tags(asize, false, true);
      let rest = bp.next_block();
      rest.write_tags(remainder, false, false);
      unsafe { list::insert_node(&mut self.lists, self.heap.base, rest, remainder) };
      bp
    }
  }

  /// Returns a pointer to `size` usable bytes, or null if `size` is zero or
  /// the memory system refused to grow the heap far enough.
  pub fn malloc(&mut self, size: usize) -> *mut u8 {
    let asize = Self::adjust(size);
    if asize == 0 {
      return ptr::null_mut();
    }

    if let Some(bp) = self.find_fit(asize) {
      unsafe { list::delete_node(&mut self.lists, self.heap.base, bp) };
      return self.place(bp, asize).as_mut_ptr();
    }

    let extend_bytes = (asize as usize).max(MIN_EXTEND);
    match heap::extend(&mut self.heap, &mut self.lists, extend_bytes) {
      Some(bp) => {
        unsafe { list::delete_node(&mut self.lists, self.heap.base, bp) };
        self.place(bp, asize).as_mut_ptr()
      }
      None => ptr::null_mut(),
    }
  }

  /// Returns `bp` to the free-list index, coalescing with either physical
  /// neighbor that is also free. A null `bp` is a no-op.
  ///
  /// # Safety
  /// `bp` must be null or a pointer previously returned by `malloc`/`realloc`
  /// on this allocator and not already freed.
  pub unsafe fn free(&mut self, bp: *mut u8) {
    let Some(nn) = ptr::NonNull::new(bp) else { return };
    let bp = unsafe { BlockPtr::new(nn.as_ptr() as usize) };
    let size = bp.size();
    bp.write_tags(size, false, false);
    unsafe {
      list::insert_node(&mut self.lists, self.heap.base, bp, size);
      coalesce(&mut self.lists, self.heap.base, bp);
    }
  }

  /// Resizes the block at `bp` to hold `size` bytes, preserving its
  /// contents up to the smaller of the old and new sizes.
  ///
  /// `realloc(null, size)` behaves as `malloc(size)`; `realloc(bp, 0)`
  /// returns null without freeing `bp` (the caller retains ownership, same
  /// as an oversized request that the memory system refuses).
  ///
  /// # Safety
  /// `bp` must be null or a pointer previously returned by `malloc`/`realloc`
  /// on this allocator and not already freed.
  pub unsafe fn realloc(&mut self, bp: *mut u8, size: usize) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }
    let Some(nn) = ptr::NonNull::new(bp) else { return self.malloc(size) };
    let bp = unsafe { BlockPtr::new(nn.as_ptr() as usize) };

    let new_size = (align_up8(size + 8).max(MIN_BLOCK_SIZE as usize) + REALLOC_BUFFER) as isize;
    let current_size = bp.size() as isize;

    if current_size - new_size >= 0 {
      return bp.as_mut_ptr();
    }

    let next = bp.next_block();
    if next.is_allocated() && next.size() != 0 {
      return self.realloc_out_of_place(bp, size, current_size as usize);
    }

    let mut rem = current_size + next.size() as isize - new_size;
    if rem < 0 {
      let extend_amount = ((-rem) as usize).max(MIN_EXTEND);
      if heap::extend(&mut self.heap, &mut self.lists, extend_amount).is_none() {
        return ptr::null_mut();
      }
    }

    let next_after = bp.next_block();
    rem = current_size + next_after.size() as isize - new_size;
    debug_assert!(rem >= 0, "grow-in-place math should always leave non-negative slack");

    if next_after.size() > 0 {
      unsafe { list::delete_node(&mut self.lists, self.heap.base, next_after) };
    }

    let final_size = (new_size + rem) as u32;
    bp.write_tags(final_size, false, true);
    bp.as_mut_ptr()
  }

  /// Fallback realloc path: allocate fresh, copy the smaller of the old
  /// payload and the request, free the original.
  fn realloc_out_of_place(&mut self, bp: BlockPtr, size: usize, current_size: usize) -> *mut u8 {
    let new_ptr = self.malloc(size);
    if new_ptr.is_null() {
      return new_ptr;
    }
    let copy_len = size.min(current_size.saturating_sub(8));
    unsafe {
      ptr::copy_nonoverlapping(bp.as_mut_ptr(), new_ptr, copy_len);
      self.free(bp.as_mut_ptr());
    }
    new_ptr
  }

  /// Diagnostic snapshot: total heap span, free bytes, and per-bucket free
  /// block counts. Not part of the allocation contract.
  pub fn stats(&self) -> HeapStats {
    let (lo, hi) = heap::bounds(&self.heap);
    let mut bytes_free = 0usize;
    let mut free_block_count = 0usize;
    let mut bucket_occupancy = [0usize; NUM_BUCKETS];

    for (k, occupancy) in bucket_occupancy.iter_mut().enumerate() {
      let mut node = self.lists[k];
      while let Some(node_bp) = node {
        bytes_free += node_bp.size() as usize;
        free_block_count += 1;
        *occupancy += 1;
        node = unsafe { node_bp.pred(self.heap.base) };
      }
    }

    HeapStats {
      heap_size: hi.saturating_sub(lo),
      bytes_free,
      free_block_count,
      bucket_occupancy,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::heap_test_guard;

  /// Walks every bucket and every physical block, checking the invariants
  /// that matter to correctness: free blocks are indexed and vice versa, no
  /// two physically adjacent blocks are both free, and header/footer agree.
  fn assert_heap_consistent(allocator: &Allocator) {
    for k in 0..NUM_BUCKETS {
      let mut node = allocator.lists[k];
      while let Some(bp) = node {
        assert!(!bp.is_allocated(), "indexed block must be free");
        assert_eq!(bp.read_header(), bp.read_footer(), "header/footer must agree");
        assert_eq!(list::bucket_of(bp.size()), k, "block must live in its own size-class bucket");
        node = unsafe { bp.pred(allocator.heap.base) };
      }
    }

    let mut cursor = unsafe { BlockPtr::new(allocator.heap.base) };
    let mut prev_was_free = false;
    loop {
      let (size, _, allocated) = cursor.read_header();
      if size == 0 {
        break; // epilogue
      }
      if !allocated {
        assert!(!prev_was_free, "two physically adjacent free blocks escaped coalescing");
      }
      prev_was_free = !allocated;
      cursor = cursor.next_block();
    }
  }

  #[test]
  fn find_fit_reuses_a_larger_bucket_without_extending_the_heap() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    // `init` seeds one 64-byte free block (bucket 6). A 1-byte request
    // (asize = 16, bucket 4) must find that block by scanning forward
    // through buckets 4 and 5 (empty) to 6, rather than skipping past it
    // and forcing a needless heap extension.
    let heap_size_before = a.stats().heap_size;
    let p = a.malloc(1);
    assert!(!p.is_null());
    assert_eq!(a.stats().heap_size, heap_size_before, "a pre-existing adequate free block must satisfy the request without sbrk");
    assert_heap_consistent(&a);
  }

  #[test]
  fn single_byte_alloc_free_then_reuse() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    let p = a.malloc(1);
    assert!(!p.is_null());
    assert_heap_consistent(&a);

    unsafe { a.free(p) };
    assert_heap_consistent(&a);

    let q = a.malloc(1);
    assert_eq!(p, q, "freeing the only block then requesting the same size should reuse it");
    assert_heap_consistent(&a);
  }

  #[test]
  fn two_adjacent_frees_coalesce_into_one_bucket() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    // Two 100-byte requests land in adjacent blocks; freeing both should
    // merge them into a single free block sized for their combined bucket.
    let p1 = a.malloc(100);
    let p2 = a.malloc(100);
    assert!(!p1.is_null() && !p2.is_null());

    unsafe {
      a.free(p1);
      a.free(p2);
    }
    assert_heap_consistent(&a);

    let stats = a.stats();
    assert_eq!(stats.free_block_count, 1, "adjacent frees must coalesce into a single block");
  }

  #[test]
  fn freeing_outer_blocks_does_not_coalesce_across_a_live_middle_block() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    let ap = a.malloc(32);
    let bp = a.malloc(32);
    let cp = a.malloc(32);
    assert!(!ap.is_null() && !bp.is_null() && !cp.is_null());

    unsafe {
      a.free(ap);
      a.free(cp);
    }
    assert_heap_consistent(&a);

    // `bp` stays live between them, so `a` and `c`'s freed blocks must
    // remain two separate 40-byte blocks (32 payload rounded up + 8
    // overhead), both in the same bucket, rather than merging.
    let stats = a.stats();
    assert_eq!(stats.free_block_count, 2, "a live middle block must prevent coalescing");
    assert_eq!(stats.bucket_occupancy[list::bucket_of(40)], 2);

    let mut node = a.lists[list::bucket_of(40)];
    let mut seen = 0;
    while let Some(bp) = node {
      assert_eq!(bp.size(), 40);
      seen += 1;
      node = unsafe { bp.pred(a.heap.base) };
    }
    assert_eq!(seen, 2);
    let _ = bp;
  }

  #[test]
  fn large_request_splits_from_the_high_address_end() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    // A fit much larger than a large ( >= 73-byte adjusted) request should
    // leave its remainder, not the payload, at the low address.
    let big_block = a.malloc(4000);
    unsafe { a.free(big_block) };

    let payload = a.malloc(100);
    assert!(payload as usize > big_block as usize, "large requests split from the high end");
    assert_heap_consistent(&a);
  }

  #[test]
  fn small_request_splits_from_the_low_address_end() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    let big_block = a.malloc(4000);
    unsafe { a.free(big_block) };

    // Exactly one free block exists at this point; a low-end split must
    // place the payload at that block's own (lower) address rather than at
    // the far end, unlike the high-address split above.
    let free_bp = a.lists.iter().find_map(|b| *b).expect("exactly one free block expected");

    let payload = a.malloc(8);
    assert_eq!(payload, free_bp.as_mut_ptr(), "small requests split from the low end, keeping the fit block's own address");
    assert_heap_consistent(&a);
  }

  #[test]
  fn realloc_shrink_returns_same_pointer_and_preserves_bytes() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    let p = a.malloc(500);
    unsafe { ptr::write_bytes(p, 0xAB, 10) };

    let shrunk = unsafe { a.realloc(p, 10) };
    assert_eq!(shrunk, p, "shrinking within the realloc buffer must not move the block");
    let bytes = unsafe { std::slice::from_raw_parts(shrunk, 10) };
    assert!(bytes.iter().all(|&b| b == 0xAB));
    assert_heap_consistent(&a);
  }

  #[test]
  fn realloc_grow_into_free_neighbor_stays_in_place() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    let p = a.malloc(16);
    let neighbor = a.malloc(200);
    unsafe { a.free(neighbor) };

    let grown = unsafe { a.realloc(p, 100) };
    assert_eq!(grown, p, "growing into a free physical neighbor must not move the block");
    assert_heap_consistent(&a);
  }

  #[test]
  fn realloc_forced_out_of_place_preserves_bytes() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    let p = a.malloc(16);
    unsafe { ptr::write_bytes(p, 0xCD, 16) };
    // pin the physical neighbor as allocated so growth cannot happen in place
    let pin = a.malloc(16);

    let grown = unsafe { a.realloc(p, 2000) };
    assert_ne!(grown, p, "growth blocked by an allocated neighbor must copy to a new block");
    let bytes = unsafe { std::slice::from_raw_parts(grown, 16) };
    assert!(bytes.iter().all(|&b| b == 0xCD));
    assert_heap_consistent(&a);

    unsafe { a.free(pin) };
  }

  #[test]
  fn realloc_null_behaves_as_malloc_and_zero_size_returns_null() {
    let _guard = heap_test_guard();
    let mut a = Allocator::new();
    a.init().unwrap();

    let p = unsafe { a.realloc(ptr::null_mut(), 32) };
    assert!(!p.is_null());

    let q = unsafe { a.realloc(p, 0) };
    assert!(q.is_null());
  }
}
