use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetError {
    /// The allocator could not provide memory for a node.
    AllocationFailed,
    /// `split` was called on a set with no entries.
    EmptySplit,
}

impl fmt::Display for SetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SetError::AllocationFailed => f.write_str("node allocation failed"),
            SetError::EmptySplit => f.write_str("cannot split an empty set"),
        }
    }
}

impl Error for SetError {}
