//! The memory-system collaborator boundary.
//!
//! This is the only module that calls into `libc::sbrk`, and the only place
//! (besides [`crate::block`]) that ever looks at a raw address before it has
//! been wrapped in a [`crate::block::BlockPtr`]. Everything else in the
//! crate — the segregated-list index, coalescing, splitting, the public
//! `Allocator` methods — only ever extends the heap by calling [`extend`].

use libc::{c_void, intptr_t, sbrk};

use crate::align::align_up8;
use crate::block::{self, BlockPtr, WORD};
use crate::coalesce::coalesce;
use crate::list::{self, Buckets};

/// Heap bookkeeping owned by [`crate::allocator::Allocator`]. `base` is the
/// origin used to compress free-list links (see `block.rs`); `epilogue_header`
/// tracks where the next extension must write its new block header.
#[derive(Clone, Copy)]
pub struct HeapState {
  pub heap_lo: usize,
  pub base: usize,
  pub epilogue_header: usize,
}

/// Requests exactly `bytes` more memory from the host via `sbrk`.
///
/// Returns the address of the first new byte, or `None` on failure (the
/// `(void*)-1` sentinel).
fn sbrk_request(bytes: usize) -> Option<usize> {
  let ptr = unsafe { sbrk(bytes as intptr_t) };
  if ptr == usize::MAX as *mut c_void {
    None
  } else {
    Some(ptr as usize)
  }
}

/// Bootstraps the heap: the alignment pad, the 8-byte allocated prologue,
/// and the zero-size allocated epilogue. Returns the initialized
/// [`HeapState`]; the caller (`Allocator::init`) is responsible for seeding
/// the first free block via [`extend`].
pub fn bootstrap() -> Option<HeapState> {
  let raw = sbrk_request(4 * WORD)?;
  unsafe {
    block::write_raw_word(raw, 0);
    block::write_raw_word(raw + WORD, block::pack(8, false, true));
    block::write_raw_word(raw + 2 * WORD, block::pack(8, false, true));
    block::write_raw_word(raw + 3 * WORD, block::pack(0, false, true));
  }
  Some(HeapState {
    heap_lo: raw,
    base: raw + 2 * WORD,
    epilogue_header: raw + 3 * WORD,
  })
}

/// Extends the heap by at least `min_bytes` (rounded up to 8), writes the
/// new free block and a fresh epilogue, indexes the block, and coalesces it
/// with whatever physically precedes it (which may itself be free).
///
/// Returns the (possibly merged) block, or `None` if the host refused the
/// extension — in which case `state` and `lists` are left untouched.
pub fn extend(state: &mut HeapState, lists: &mut Buckets, min_bytes: usize) -> Option<BlockPtr> {
  let bytes = align_up8(min_bytes.max(1));
  let block_header_addr = state.epilogue_header;

  let raw = sbrk_request(bytes)?;
  debug_assert_eq!(
    raw,
    block_header_addr + WORD,
    "the memory system must grow the heap contiguously from its current break"
  );

  let bp = unsafe { BlockPtr::new(block_header_addr + WORD) };
  bp.write_tags(bytes as u32, false, false);

  let new_epilogue_addr = block_header_addr + bytes;
  unsafe { block::write_raw_word(new_epilogue_addr, block::pack(0, false, true)) };
  state.epilogue_header = new_epilogue_addr;

  unsafe {
    list::insert_node(lists, state.base, bp, bytes as u32);
    Some(coalesce(lists, state.base, bp))
  }
}

/// `mem_heap_lo`/`mem_heap_hi` equivalents, exposed only for diagnostics and
/// tests outside the core.
pub fn bounds(state: &HeapState) -> (usize, usize) {
  let hi = unsafe { sbrk(0) } as usize;
  (state.heap_lo, hi)
}
