//! An ordered set is a dictionary whose entries are kept sorted by key and which allows several
//! entries with the same key.  Entries can be inserted, removed and found in `O(log(n))` on
//! average, and whole sets can be split apart and joined back together.
//!
//! Conceptually, the underlying skiplist resembles something like:
//!
//! ```text
//! <head:3> ----------> [2] --------------------------------------------------> [9] ---------->
//! <head:2> ----------> [2] ------------------------------------[7] ----------> [9] ---------->
//! <head:1> ----------> [2] ----------> [4] ------------------> [7] ----------> [9] --> [10] ->
//! <head:0> --> [1] --> [2] --> [3] --> [4] --> [5] --> [6] --> [7] --> [8] --> [9] --> [10] ->
//! ```
//!
//! where every node is also linked to the copy of itself on the levels above and below, allowing
//! the algorithm to skip ahead on the upper levels and drop down when it would overshoot.
//!
//! The set has an associated ordering function which **must** be well-behaved.  Specifically,
//! given some ordering function `f(a, b)`, it must satisfy the following properties:
//!
//! - Be well defined: `f(a, b)` should always return the same value
//! - Be anti-symmetric: `f(a, b) == Greater` iff `f(b, a) == Less` and `f(a, b) == Equal == f(b, a)`.
//! - Be transitive: If `f(a, b) == Greater` and `f(b, c) == Greater` then `f(a, c) == Greater`.
//!
//! **Failure to satisfy these properties results in entries being visited in an unspecified
//! order.**

mod coin;
mod error;
pub mod ordered_set;
mod skipnode;

pub use crate::coin::{Coin, CoinSource, RandomCoin};
pub use crate::error::SetError;
pub use crate::ordered_set::{
    Comparator, Cursor, Destructor, IntoIter, Iter, NodeRef, OrderedSet, Options,
    DEFAULT_MAX_LEVEL,
};
