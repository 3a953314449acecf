//! Block header/footer/tag primitives.
//!
//! This is the one place (besides [`crate::heap`]) that casts between raw
//! addresses and typed handles. Everything above this module — the
//! segregated-list index, coalescing, splitting, the public allocator
//! operations — works exclusively with [`BlockPtr`] and never touches a
//! `*mut u8`/`usize` directly.
//!
//! # Layout
//!
//! A block is a contiguous, 8-byte-aligned run of bytes with a 4-byte header
//! at offset 0, a 4-byte footer at offset `size - 4`, and a payload (or, for
//! a free block, free-list linkage) in between. Both header and footer words
//! pack the same three fields:
//!
//! ```text
//! bits [31:3]  size in bytes (always a multiple of 8)
//! bit  1       reallocation tag (see crate-level docs; unused by any call site)
//! bit  0       allocated
//! ```
//!
//! [`BlockPtr`] always refers to a block's *content address* — one word past
//! its header, i.e. where the payload (allocated) or predecessor link (free)
//! begins. This mirrors the "content address" convention this crate's bump
//! allocator used for the pointer it handed back to callers.
//!
//! # Free-list links
//!
//! A real 4-byte link word cannot hold a full pointer on a 64-bit host, so
//! `pred`/`succ` are stored as 4-byte offsets from a fixed heap base (the
//! prologue's content address, which is never itself a valid free-block
//! payload address and therefore doubles as the `None` sentinel at offset
//! 0). This keeps the 4-byte link words the on-heap layout promises without
//! widening them to a full pointer.

use std::mem;
use std::ptr::NonNull;

pub(crate) const WORD: usize = mem::size_of::<u32>();
const ALLOC_BIT: u32 = 0b01;
const TAG_BIT: u32 = 0b10;
const SIZE_MASK: u32 = !0b111;

/// Writes a bare header word at `addr`, used only for the prologue/epilogue
/// sentinels, which are not addressed through a [`BlockPtr`] content
/// address.
///
/// # Safety
/// `addr` must be valid, word-aligned, and writable.
pub(crate) unsafe fn write_raw_word(addr: usize, word: u32) {
  unsafe { put_word(addr, word) }
}

/// A handle to a block's content address. Copy, comparable, and otherwise
/// opaque: arithmetic on the underlying address only ever happens inside
/// this module.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockPtr(NonNull<u8>);

impl BlockPtr {
  /// Wraps a raw content address.
  ///
  /// # Safety
  /// `addr` must be non-zero and must actually be the content address of a
  /// live block on the managed heap.
  #[inline]
  pub unsafe fn new(addr: usize) -> Self {
    debug_assert_ne!(addr, 0);
    Self(unsafe { NonNull::new_unchecked(addr as *mut u8) })
  }

  #[inline]
  pub fn addr(self) -> usize {
    self.0.as_ptr() as usize
  }

  #[inline]
  pub fn as_mut_ptr(self) -> *mut u8 {
    self.0.as_ptr()
  }
}

#[inline]
unsafe fn get_word(addr: usize) -> u32 {
  unsafe { (addr as *const u32).read() }
}

#[inline]
unsafe fn put_word(addr: usize, word: u32) {
  unsafe { (addr as *mut u32).write(word) }
}

/// Packs a size/tag/allocated triple into a header or footer word.
#[inline]
pub fn pack(size: u32, tag: bool, alloc: bool) -> u32 {
  debug_assert_eq!(size & !SIZE_MASK, 0, "block size must be a multiple of 8");
  size | (if tag { TAG_BIT } else { 0 }) | (if alloc { ALLOC_BIT } else { 0 })
}

#[inline]
fn unpack(word: u32) -> (u32, bool, bool) {
  (word & SIZE_MASK, word & TAG_BIT != 0, word & ALLOC_BIT != 0)
}

impl BlockPtr {
  #[inline]
  fn header_addr(self) -> usize {
    self.addr() - WORD
  }

  /// Reads `(size, realloc_tag, allocated)` from this block's header.
  pub fn read_header(self) -> (u32, bool, bool) {
    unsafe { unpack(get_word(self.header_addr())) }
  }

  pub fn size(self) -> u32 {
    self.read_header().0
  }

  pub fn is_allocated(self) -> bool {
    self.read_header().2
  }

  pub fn tag(self) -> bool {
    self.read_header().1
  }

  fn footer_addr(self, size: u32) -> usize {
    self.header_addr() + size as usize - WORD
  }

  /// Reads `(size, realloc_tag, allocated)` from this block's footer.
  pub fn read_footer(self) -> (u32, bool, bool) {
    let (size, ..) = self.read_header();
    unsafe { unpack(get_word(self.footer_addr(size))) }
  }

  /// Writes header and footer, destroying whatever tag bit was present.
  pub fn write_tags(self, size: u32, tag: bool, alloc: bool) {
    let word = pack(size, tag, alloc);
    unsafe {
      put_word(self.header_addr(), word);
      put_word(self.footer_addr(size), word);
    }
  }

  /// Writes header and footer, preserving whichever tag bit this block's
  /// header already carried (the tag-aware write variant referenced, but
  /// never exercised, in the design notes).
  pub fn write_tags_preserve_tag(self, size: u32, alloc: bool) {
    let existing_tag = self.tag();
    self.write_tags(size, existing_tag, alloc);
  }

  /// The block immediately following this one in address order, derived
  /// from this block's own header (not a boundary tag read).
  pub fn next_block(self) -> BlockPtr {
    let (size, ..) = self.read_header();
    unsafe { BlockPtr::new(self.addr() + size as usize) }
  }

  /// The block immediately preceding this one, derived from the boundary
  /// tag (footer) physically just before this block's header.
  pub fn prev_block(self) -> BlockPtr {
    let prev_footer_addr = self.header_addr() - WORD;
    let (prev_size, ..) = unsafe { unpack(get_word(prev_footer_addr)) };
    unsafe { BlockPtr::new(self.addr() - prev_size as usize) }
  }

  fn pred_link_addr(self) -> usize {
    self.addr()
  }

  fn succ_link_addr(self) -> usize {
    self.addr() + WORD
  }

  /// Reads the predecessor free-list link (toward larger sizes in the same
  /// bucket), decoding the 4-byte heap-relative offset against `base`.
  ///
  /// # Safety
  /// Only meaningful on a free block.
  pub unsafe fn pred(self, base: usize) -> Option<BlockPtr> {
    unsafe { decode_link(get_word(self.pred_link_addr()), base) }
  }

  /// Reads the successor free-list link (toward smaller sizes).
  ///
  /// # Safety
  /// Only meaningful on a free block.
  pub unsafe fn succ(self, base: usize) -> Option<BlockPtr> {
    unsafe { decode_link(get_word(self.succ_link_addr()), base) }
  }

  /// # Safety
  /// Only meaningful on a free block with at least 16 bytes of interior.
  pub unsafe fn set_pred(self, base: usize, value: Option<BlockPtr>) {
    unsafe { put_word(self.pred_link_addr(), encode_link(value, base)) }
  }

  /// # Safety
  /// Only meaningful on a free block with at least 16 bytes of interior.
  pub unsafe fn set_succ(self, base: usize, value: Option<BlockPtr>) {
    unsafe { put_word(self.succ_link_addr(), encode_link(value, base)) }
  }
}

fn encode_link(value: Option<BlockPtr>, base: usize) -> u32 {
  match value {
    None => 0,
    Some(bp) => {
      let offset = bp.addr() - base;
      debug_assert!(offset <= u32::MAX as usize, "heap grew past the 4GiB compressed-offset range");
      offset as u32
    }
  }
}

unsafe fn decode_link(word: u32, base: usize) -> Option<BlockPtr> {
  if word == 0 {
    None
  } else {
    Some(unsafe { BlockPtr::new(base + word as usize) })
  }
}
