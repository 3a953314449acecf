//! Interactive walkthrough of the segregated free-list allocator.
//!
//! Run with `cargo run --bin walkthrough`. Press enter between steps to
//! watch the program break move (or hold steady, once blocks start being
//! reused) as blocks are allocated, freed, and resized.

use std::io::{self, Write};

use libc::sbrk;
use segalloc::Allocator;

fn pause(step: &str) {
  print!("\n-- {step} -- press enter to continue --");
  io::stdout().flush().unwrap();
  let mut buf = String::new();
  io::stdin().read_line(&mut buf).unwrap();
}

fn main() {
  let mut allocator = Allocator::new();
  allocator.init().expect("failed to bootstrap the heap");

  println!("program break after init = {:?}", unsafe { sbrk(0) });

  pause("allocate 32 bytes");
  let a = allocator.malloc(32);
  println!("malloc(32) = {a:?}, program break = {:?}", unsafe { sbrk(0) });

  pause("allocate 4096 bytes (forces a heap extension)");
  let b = allocator.malloc(4096);
  println!("malloc(4096) = {b:?}, program break = {:?}", unsafe { sbrk(0) });

  pause("free the first block, then request 16 bytes (should reuse it)");
  unsafe { allocator.free(a) };
  let c = allocator.malloc(16);
  println!("malloc(16) = {c:?} (first block was {a:?})");

  pause("grow the 4096-byte block by realloc");
  let b = unsafe { allocator.realloc(b, 6000) };
  println!("realloc(.., 6000) = {b:?}, program break = {:?}", unsafe { sbrk(0) });

  pause("print allocator stats and free everything");
  let stats = allocator.stats();
  println!("{stats:?}");
  unsafe {
    allocator.free(b);
    allocator.free(c);
  }
  println!("program break at end = {:?}", unsafe { sbrk(0) });
}
