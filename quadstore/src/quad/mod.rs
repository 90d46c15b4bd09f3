//! The Quad Index (spec §4.4): primary triple→context table, the reverse
//! context→triple index, the context existence set, and the three
//! two-bound compound indices, plus the lookup planner that picks among
//! them.

mod index;
mod planner;

pub use index::{Pattern, QuadIndex};
pub use planner::{Planner, Position};
