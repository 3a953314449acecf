//! The segregated free-list index.
//!
//! `lists[k]` holds free blocks whose size falls in `[2^k, 2^(k+1))`. Each
//! bucket is a doubly-linked list kept in ascending size order with the
//! *head* pointing at the **largest** element — the insertion walk below
//! advances along the predecessor link toward smaller sizes, so `malloc`'s
//! search (in `allocator.rs`) does the same.

use crate::allocator::NUM_BUCKETS;
use crate::block::BlockPtr;

pub type Buckets = [Option<BlockPtr>; NUM_BUCKETS];

pub fn empty_buckets() -> Buckets {
  [None; NUM_BUCKETS]
}

/// Selects the bucket for `size`: `floor(log2(size))`, clamped to the last
/// bucket.
pub fn bucket_of(size: u32) -> usize {
  let size = size.max(1);
  let class = 31 - size.leading_zeros();
  (class as usize).min(NUM_BUCKETS - 1)
}

/// Inserts `bp` (of `size` bytes) into its bucket, keeping ascending order
/// with the head at the largest element.
///
/// # Safety
/// `bp` must be a free block not already present in `lists`.
pub unsafe fn insert_node(lists: &mut Buckets, base: usize, bp: BlockPtr, size: u32) {
  let k = bucket_of(size);

  let mut search = lists[k];
  let mut insert: Option<BlockPtr> = None;
  while let Some(candidate) = search {
    if size > candidate.size() {
      insert = Some(candidate);
      search = unsafe { candidate.pred(base) };
    } else {
      break;
    }
  }

  match (search, insert) {
    (Some(search_bp), Some(insert_bp)) => unsafe {
      bp.set_pred(base, Some(insert_bp));
      bp.set_succ(base, Some(search_bp));
      insert_bp.set_succ(base, Some(bp));
      search_bp.set_pred(base, Some(bp));
    },
    (Some(search_bp), None) => unsafe {
      bp.set_pred(base, None);
      bp.set_succ(base, Some(search_bp));
      search_bp.set_pred(base, Some(bp));
      lists[k] = Some(bp);
    },
    (None, Some(insert_bp)) => unsafe {
      bp.set_pred(base, Some(insert_bp));
      bp.set_succ(base, None);
      insert_bp.set_succ(base, Some(bp));
    },
    (None, None) => unsafe {
      bp.set_pred(base, None);
      bp.set_succ(base, None);
      lists[k] = Some(bp);
    },
  }
}

/// Removes `bp` from whichever bucket it currently occupies.
///
/// # Safety
/// `bp` must currently be present in `lists`.
pub unsafe fn delete_node(lists: &mut Buckets, base: usize, bp: BlockPtr) {
  let k = bucket_of(bp.size());
  let pred = unsafe { bp.pred(base) };
  let succ = unsafe { bp.succ(base) };

  match (pred, succ) {
    (Some(pred_bp), Some(succ_bp)) => unsafe {
      pred_bp.set_succ(base, Some(succ_bp));
      succ_bp.set_pred(base, Some(pred_bp));
    },
    (Some(pred_bp), None) => unsafe {
      pred_bp.set_succ(base, None);
    },
    (None, Some(succ_bp)) => unsafe {
      succ_bp.set_pred(base, None);
      lists[k] = Some(succ_bp);
    },
    (None, None) => {
      lists[k] = None;
    }
  }
}
