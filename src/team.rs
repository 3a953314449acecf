//! Team identity record.
//!
//! Plain metadata the embedding program may publish (in a status line, a
//! debug print, a crash report). Never read by [`crate::allocator`].

/// Identifies who is responsible for this allocator.
#[derive(Debug, Clone, Copy)]
pub struct Team {
  pub name: &'static str,
  pub members: &'static [&'static str],
  pub description: &'static str,
}

/// The record for this crate.
pub const TEAM: Team = Team {
  name: "segalloc",
  members: &["segalloc maintainers"],
  description: "segregated free-list allocator over an sbrk-extended heap",
};
