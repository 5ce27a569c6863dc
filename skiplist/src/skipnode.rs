use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

// /////////////////////////////////////////////////////////////////////////////////////////////////
// SkipNode
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// A link to a neighbouring node.  `None` marks the end of a chain (horizontally) or the end of a
/// tower (vertically).
pub type Link<K, V> = Option<NonNull<SkipNode<K, V>>>;

/// What a node carries.  Only the level-0 node of a tower owns the key and the value; the copies
/// stacked above it point back at that base node, so a payload can only ever be released once.
pub enum Payload<K, V> {
    /// Level sentinel, carries nothing.
    Header,
    /// Level-0 node, sole owner of the entry.
    Base { key: K, value: V },
    /// Promoted copy of a base node.
    Shadow { base: NonNull<SkipNode<K, V>> },
}

/// SkipNodes make up the OrderedSet.  Every node lives on exactly one level and is linked four
/// ways: horizontally to its neighbours on that level and vertically to the copies of the same
/// entry on the levels above and below.
///
/// Headers start every level.  A header never appears as the `next` of another node, and the
/// first real node of a level has the header as its `previous`.
pub struct SkipNode<K, V> {
    // 0 is the base level.
    pub level: usize,
    pub next: Link<K, V>,
    pub previous: Link<K, V>,
    pub top: Link<K, V>,
    pub bottom: Link<K, V>,
    pub payload: Payload<K, V>,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<K, V> SkipNode<K, V> {
    /// Create a header for `level`.
    pub fn header(level: usize) -> Self {
        SkipNode::unlinked(level, Payload::Header)
    }

    /// Create a base node owning `key` and `value`.
    pub fn base(key: K, value: V) -> Self {
        SkipNode::unlinked(0, Payload::Base { key, value })
    }

    /// Create a copy of the tower rooted at `base`, to be placed on `level`.
    pub fn shadow(base: NonNull<SkipNode<K, V>>, level: usize) -> Self {
        SkipNode::unlinked(level, Payload::Shadow { base })
    }

    fn unlinked(level: usize, payload: Payload<K, V>) -> Self {
        SkipNode {
            level,
            next: None,
            previous: None,
            top: None,
            bottom: None,
            payload,
        }
    }

    /// Moves the node to the heap.  If the allocator refuses, the node is handed back so the
    /// caller decides what happens to its payload.
    pub fn allocate(self) -> Result<NonNull<SkipNode<K, V>>, SkipNode<K, V>> {
        let layout = Layout::new::<SkipNode<K, V>>();
        // SAFETY: `SkipNode` always has a non-zero size (it holds four links and a level).
        let ptr = unsafe { alloc::alloc(layout) } as *mut SkipNode<K, V>;
        match NonNull::new(ptr) {
            Some(node) => {
                // SAFETY: freshly allocated with the layout of `SkipNode<K, V>`.
                unsafe { node.as_ptr().write(self) };
                Ok(node)
            }
            None => Err(self),
        }
    }

    /// Takes back a node created by `allocate` (or leaked from a `Box`), freeing its memory.
    ///
    /// # Safety
    ///
    /// `node` must not be used again, and nothing may still dereference it.
    pub unsafe fn release(node: NonNull<SkipNode<K, V>>) -> SkipNode<K, V> {
        // SAFETY: both `allocate` and `Box` use the global allocator with this exact layout.
        *Box::from_raw(node.as_ptr())
    }

    /// Returns `true` if the node is a level header.
    pub fn is_header(&self) -> bool {
        match self.payload {
            Payload::Header => true,
            _ => false,
        }
    }

    /// The key of the tower this node belongs to, `None` for headers.
    pub fn key(&self) -> Option<&K> {
        match self.payload {
            Payload::Header => None,
            Payload::Base { ref key, .. } => Some(key),
            // SAFETY: a base node outlives every copy stacked on top of it.
            Payload::Shadow { base } => unsafe { (*base.as_ptr()).key() },
        }
    }

    /// Mutable access to the value, only for base nodes.
    pub fn value_mut(&mut self) -> Option<&mut V> {
        match self.payload {
            Payload::Base { ref mut value, .. } => Some(value),
            _ => None,
        }
    }
}

impl<K, V> Payload<K, V> {
    /// Consumes the payload, returning the entry if it owned one.
    pub fn into_entry(self) -> Option<(K, V)> {
        match self {
            Payload::Base { key, value } => Some((key, value)),
            _ => None,
        }
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<K, V> fmt::Display for SkipNode<K, V>
where
    K: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.payload {
            Payload::Header => write!(f, "<head:{}>", self.level),
            Payload::Base { ref key, .. } => write!(f, "[{}]", key),
            Payload::Shadow { .. } => match self.key() {
                Some(key) => write!(f, "[{}]^{}", key, self.level),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Payload, SkipNode};

    #[test]
    fn allocate_and_release() {
        let node = SkipNode::base(3, "three").allocate().ok().unwrap();
        let node = unsafe { SkipNode::release(node) };
        assert_eq!(node.level, 0);
        assert_eq!(node.payload.into_entry(), Some((3, "three")));
    }

    #[test]
    fn shadow_reads_base_key() {
        let base = SkipNode::base(7, ()).allocate().ok().unwrap();
        let shadow = SkipNode::<i32, ()>::shadow(base, 1);
        assert_eq!(shadow.key(), Some(&7));
        assert_eq!(format!("{}", shadow), "[7]^1");
        assert!(shadow.payload.into_entry().is_none());
        unsafe { SkipNode::release(base) };
    }

    #[test]
    fn header_has_no_entry() {
        let mut header = SkipNode::<i32, i32>::header(2);
        assert!(header.is_header());
        assert_eq!(header.key(), None);
        assert_eq!(header.value_mut(), None);
        assert_eq!(format!("{}", header), "<head:2>");
        match header.payload {
            Payload::Header => (),
            _ => panic!("Expected header"),
        }
    }
}
