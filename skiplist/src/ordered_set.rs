use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use logger::{log, Logger};

use crate::coin::{Coin, CoinSource, RandomCoin};
use crate::error::SetError;
use crate::skipnode::{Link, Payload, SkipNode};

/// Three-way comparison shared by a set and every set split off from it.
pub type Comparator<K> = Rc<dyn Fn(&K, &K) -> Ordering>;

/// Callback receiving a key or a value that the set discards for good.
pub type Destructor<T> = Rc<dyn Fn(T)>;

/// Towers never grow past this many levels unless configured otherwise.  32 levels keep searches
/// logarithmic well beyond four billion entries.
pub const DEFAULT_MAX_LEVEL: usize = 32;

macro_rules! note {
    ($set: expr, $level: ident, $($arg:tt)*) => ({
        if let Some(ref logger) = $set.logger {
            log!(logger, $level, $($arg)*);
        }
    })
}

// /////////////////////////////////////////////////////////////////////////////////////////////////
// Options
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// Construction options for an `OrderedSet`.
#[derive(Clone)]
pub struct Options {
    /// Maximum number of levels a single tower may occupy.  Values below 1 are treated as 1.
    pub max_level: usize,
    /// Seed for the promotion coin; `None` seeds from the operating system.
    pub seed: Option<u64>,
    /// Receives structural events (level growth, split, merge, concat).
    pub logger: Option<Logger>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_level: DEFAULT_MAX_LEVEL,
            seed: None,
            logger: None,
        }
    }
}

// /////////////////////////////////////////////////////////////////////////////////////////////////
// OrderedSet
// /////////////////////////////////////////////////////////////////////////////////////////////////

/// An ordered dictionary that allows duplicate keys, built on a skiplist of node towers.
///
/// Conceptually:
///
/// ```text
/// <head:2> -------------------------> [5] ---------------->
///    |                                 |
/// <head:1> ---------> [3] ----------> [5] ---------------->
///    |                 |               |
/// <head:0> --> [3] --> [3] --> [4] --> [5] --> [8] -------->
/// ```
///
/// Every entry lives in a base node on level 0; a coin decides how many copies of it are stacked
/// above.  Searches start at the top header and drop a level whenever the next key would
/// overshoot, giving expected `O(log(n))` insertion, removal and lookup.
///
/// Equal keys are allowed.  A new entry is placed *before* the entries already present with an
/// equal key, and removal by key takes the first of them, so equal keys behave like a stack.
///
/// The comparison function **must** be a total order: consistent, anti-symmetric and transitive.
/// Failure to satisfy these properties leaves the set in an unspecified (but memory safe) order.
///
/// The set is single threaded: it is neither `Send` nor `Sync`.
pub struct OrderedSet<K, V> {
    compare: Comparator<K>,
    destroy_key: Option<Destructor<K>>,
    destroy_value: Option<Destructor<V>>,
    len: usize,
    // Level-0 nodes with the smallest and largest key.
    first: Link<K, V>,
    last: Link<K, V>,
    // Header of the highest level.
    header: NonNull<SkipNode<K, V>>,
    coin: Box<dyn CoinSource>,
    max_level: usize,
    logger: Option<Logger>,
    _marker: PhantomData<Box<SkipNode<K, V>>>,
}

// ///////////////////////////////////////////////
// Inherent methods
// ///////////////////////////////////////////////

impl<K, V> OrderedSet<K, V>
where
    K: Ord,
{
    /// Create a new set ordered by `K::cmp`, with default options.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::OrderedSet;
    ///
    /// let set: OrderedSet<i64, &str> = OrderedSet::new();
    /// assert!(set.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        OrderedSet::with_comp(|a: &K, b: &K| a.cmp(b))
    }
}

impl<K, V> OrderedSet<K, V> {
    /// Create a new set using `f` to order keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::OrderedSet;
    ///
    /// // Largest key first.
    /// let mut set = OrderedSet::with_comp(|a: &u64, b: &u64| b.cmp(a));
    /// set.insert(1, ()).unwrap();
    /// set.insert(9, ()).unwrap();
    /// assert_eq!(set.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![9, 1]);
    /// ```
    #[inline]
    pub fn with_comp<F>(f: F) -> Self
    where
        F: 'static + Fn(&K, &K) -> Ordering,
    {
        OrderedSet::with_options(f, Options::default())
    }

    /// Create a new set using `f` to order keys and the given `options`.
    pub fn with_options<F>(f: F, options: Options) -> Self
    where
        F: 'static + Fn(&K, &K) -> Ordering,
    {
        let coin = match options.seed {
            Some(seed) => RandomCoin::seeded(seed),
            None => RandomCoin::new(),
        };
        OrderedSet::with_coin(f, Box::new(coin), options)
    }

    /// Create a new set whose promotions are decided by `coin`.  `options.seed` is ignored.
    pub fn with_coin<F>(f: F, coin: Box<dyn CoinSource>, options: Options) -> Self
    where
        F: 'static + Fn(&K, &K) -> Ordering,
    {
        OrderedSet::from_parts(Rc::new(f), coin, options.max_level, options.logger)
    }

    fn from_parts(
        compare: Comparator<K>,
        coin: Box<dyn CoinSource>,
        max_level: usize,
        logger: Option<Logger>,
    ) -> Self {
        let header = NonNull::from(Box::leak(Box::new(SkipNode::header(0))));
        OrderedSet {
            compare,
            destroy_key: None,
            destroy_value: None,
            len: 0,
            first: None,
            last: None,
            header,
            coin,
            max_level: max_level.max(1),
            logger,
            _marker: PhantomData,
        }
    }

    /// Replace the callback run on discarded keys, returning the previous one.
    pub fn set_destroy_key(&mut self, destroy: Option<Destructor<K>>) -> Option<Destructor<K>> {
        std::mem::replace(&mut self.destroy_key, destroy)
    }

    /// Replace the callback run on discarded values, returning the previous one.
    pub fn set_destroy_value(&mut self, destroy: Option<Destructor<V>>) -> Option<Destructor<V>> {
        std::mem::replace(&mut self.destroy_value, destroy)
    }

    /// Returns the number of entries in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the set contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of levels, including the base level.  Levels are never removed, so this
    /// only grows over the lifetime of a set.
    #[inline]
    pub fn height(&self) -> usize {
        unsafe { (*self.header.as_ptr()).level + 1 }
    }

    /// Insert an entry.  An existing entry with an equal key is kept; the new one is placed
    /// before it.
    ///
    /// Fails only if the base node cannot be allocated, in which case `key` and `value` are
    /// handed to the destructors.
    ///
    /// The returned handle keeps the set mutably borrowed, so it is only good for reading the new
    /// entry and its neighbours right away.  Use `find_node` to get a handle that can be passed
    /// back to `next` and `previous`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::OrderedSet;
    ///
    /// let mut set = OrderedSet::new();
    /// set.insert(3, 30).unwrap();
    /// set.insert(3, 31).unwrap();
    /// assert_eq!(set.len(), 2);
    /// assert_eq!(set.find(&3), Some(&31));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<NodeRef<'_, K, V>, SetError> {
        let predecessor = self.find_predecessor(&key);
        let node = match SkipNode::base(key, value).allocate() {
            Ok(node) => node,
            Err(rejected) => {
                if let Some((key, value)) = rejected.payload.into_entry() {
                    self.discard(key, value);
                }
                return Err(SetError::AllocationFailed);
            }
        };

        unsafe {
            Self::link_after(predecessor, node);

            let mut promoted = node;
            let mut height = 1;
            while height < self.max_level && self.coin.flip() == Coin::Heads {
                match self.promote(promoted) {
                    Ok(copy) => promoted = copy,
                    Err(e) => {
                        note!(self, Warning, "promotion stopped at level {}: {}", height, e);
                        break;
                    }
                }
                height += 1;
            }

            if (*predecessor.as_ptr()).is_header() {
                self.first = Some(node);
            }
            if (*node.as_ptr()).next.is_none() {
                self.last = Some(node);
            }
        }

        self.len += 1;
        Ok(NodeRef::new(node))
    }

    /// Remove the first entry whose key equals `key`, running the destructors on it.  Returns
    /// `false` if there was no such entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::OrderedSet;
    ///
    /// let mut set = OrderedSet::new();
    /// set.insert(1, "one").unwrap();
    /// assert!(set.remove(&1));
    /// assert!(!set.remove(&1));
    /// ```
    pub fn remove(&mut self, key: &K) -> bool {
        match self.find_base(key) {
            Some(node) => {
                unsafe { self.destroy_tower(node) };
                true
            }
            None => false,
        }
    }

    /// Remove and return the first entry, without running the destructors.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let node = self.first?;
        unsafe { self.take_tower(node) }
    }

    /// Remove and return the last entry, without running the destructors.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let node = self.last?;
        unsafe { self.take_tower(node) }
    }

    /// Returns the value of the first entry whose key equals `key`.
    pub fn find(&self, key: &K) -> Option<&V> {
        self.find_node(key).map(|node| node.value())
    }

    /// Returns a mutable reference to the value of the first entry whose key equals `key`.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let node = self.find_base(key)?;
        unsafe { (*node.as_ptr()).value_mut() }
    }

    /// Returns the first entry whose key equals `key`.
    pub fn find_node(&self, key: &K) -> Option<NodeRef<'_, K, V>> {
        self.find_base(key).map(NodeRef::new)
    }

    /// Returns `true` if an entry with a key equal to `key` exists.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find_base(key).is_some()
    }

    /// The smallest entry, or `Cursor::End` if the set is empty.
    pub fn first(&self) -> Cursor<'_, K, V> {
        match self.first {
            Some(node) => Cursor::At(NodeRef::new(node)),
            None => Cursor::End,
        }
    }

    /// The largest entry, or `Cursor::Begin` if the set is empty.
    pub fn last(&self) -> Cursor<'_, K, V> {
        match self.last {
            Some(node) => Cursor::At(NodeRef::new(node)),
            None => Cursor::Begin,
        }
    }

    /// Step forward from `cursor`.  `Begin` steps onto the first entry, the last entry steps onto
    /// `End`, and `End` stays put.
    pub fn next<'a>(&'a self, cursor: Cursor<'a, K, V>) -> Cursor<'a, K, V> {
        match cursor {
            Cursor::Begin => self.first(),
            Cursor::At(node) => node.next(),
            Cursor::End => Cursor::End,
        }
    }

    /// Step backward from `cursor`; the mirror image of `next`.
    pub fn previous<'a>(&'a self, cursor: Cursor<'a, K, V>) -> Cursor<'a, K, V> {
        match cursor {
            Cursor::Begin => Cursor::Begin,
            Cursor::At(node) => node.previous(),
            Cursor::End => self.last(),
        }
    }

    /// Iterate over the entries in ascending order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            front: self.first,
            back: self.last,
            len: self.len,
            _marker: PhantomData,
        }
    }

    /// Split the set in two.  `self` keeps every entry with a key less than or equal to
    /// `split_key`; the returned set receives the others.  Both keep their level structure, the
    /// comparator and the destructors.
    ///
    /// Splitting an empty set is an error rather than an empty result.
    ///
    /// # Examples
    ///
    /// ```
    /// use skiplist::OrderedSet;
    ///
    /// let mut low = OrderedSet::new();
    /// for i in 1..6 {
    ///     low.insert(i, ()).unwrap();
    /// }
    /// let high = low.split(&3).unwrap();
    /// assert_eq!(low.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![1, 2, 3]);
    /// assert_eq!(high.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![4, 5]);
    /// ```
    pub fn split(&mut self, split_key: &K) -> Result<OrderedSet<K, V>, SetError> {
        if self.is_empty() {
            return Err(SetError::EmptySplit);
        }

        let mut other = OrderedSet::from_parts(
            self.compare.clone(),
            self.coin.fork(),
            self.max_level,
            self.logger.clone(),
        );
        other.destroy_key = self.destroy_key.clone();
        other.destroy_value = self.destroy_value.clone();
        while other.height() < self.height() {
            other.grow_level()?;
        }

        let trail = self.trail(|key| (self.compare)(key, split_key) != Ordering::Greater);
        let headers = other.headers();

        let mut moved = 0;
        unsafe {
            // Everything right of the trail moves, level by level.
            for (&tail, &header) in trail.iter().zip(headers.iter()) {
                let rest = (*tail.as_ptr()).next.take();
                (*header.as_ptr()).next = rest;
                if let Some(rest) = rest {
                    (*rest.as_ptr()).previous = Some(header);
                }
            }

            other.first = (*headers[0].as_ptr()).next;
            if other.first.is_some() {
                other.last = self.last;
            }
            let tail = trail[0];
            if (*tail.as_ptr()).is_header() {
                self.first = None;
                self.last = None;
            } else {
                self.last = Some(tail);
            }

            let mut node = other.first;
            while let Some(current) = node {
                moved += 1;
                node = (*current.as_ptr()).next;
            }
        }
        other.len = moved;
        self.len -= moved;

        note!(
            self,
            Verbose,
            "split {} entries into {} + {} over {} levels",
            self.len + moved,
            self.len,
            moved,
            self.height()
        );
        Ok(other)
    }

    /// Move every entry of `other` into `self`, as if each were inserted in ascending order.
    /// Key ranges may overlap.
    ///
    /// On allocation failure the entry being moved is discarded, the remaining entries of
    /// `other` are discarded through `other`'s destructors, and the error is returned.
    pub fn merge(&mut self, other: OrderedSet<K, V>) -> Result<(), SetError> {
        let incoming = other.len();
        for (key, value) in other {
            self.insert(key, value)?;
        }
        note!(self, Verbose, "merged {} entries, {} total", incoming, self.len);
        Ok(())
    }

    /// Append `other` after `self`.  Every key of `other` must compare greater than every key of
    /// `self`; this is checked only in debug builds.
    ///
    /// The chains are spliced level by level without moving or allocating entries.  Finding the
    /// end of every level of `self` takes expected logarithmic time; the splice itself is linear
    /// in the number of levels.  Levels `other` has above the height of `self` are adopted as
    /// they are.
    pub fn concat(&mut self, mut other: OrderedSet<K, V>) {
        if let (Some(last), Some(first)) = (self.last, other.first) {
            debug_assert!(
                unsafe {
                    match ((*last.as_ptr()).key(), (*first.as_ptr()).key()) {
                        (Some(a), Some(b)) => (self.compare)(a, b) == Ordering::Less,
                        _ => false,
                    }
                },
                "concatenated keys must be greater than every existing key"
            );
        }

        let tails = self.trail(|_| true);
        let headers = other.headers();
        let shared = tails.len().min(headers.len());

        unsafe {
            for level in 0..shared {
                let tail = tails[level];
                let moved = (*headers[level].as_ptr()).next.take();
                (*tail.as_ptr()).next = moved;
                if let Some(moved) = moved {
                    (*moved.as_ptr()).previous = Some(tail);
                }
            }

            if headers.len() > shared {
                // `other` is taller: its upper headers, chains included, go on top of ours.
                let lowest = headers[shared];
                let kept = headers[shared - 1];
                (*kept.as_ptr()).top = None;
                (*lowest.as_ptr()).bottom = Some(self.header);
                (*self.header.as_ptr()).top = Some(lowest);
                self.header = other.header;
                other.header = kept;
            }
        }

        if self.first.is_none() {
            self.first = other.first;
        }
        if other.last.is_some() {
            self.last = other.last;
        }
        self.len += other.len;
        other.first = None;
        other.last = None;
        other.len = 0;

        note!(
            self,
            Verbose,
            "concatenated into {} entries over {} levels",
            self.len,
            self.height()
        );
    }

    // ///////////////////////////////////////////////
    // Search
    // ///////////////////////////////////////////////

    /// Descends from the top header to the base level.  On every level it moves right for as
    /// long as `advance` accepts the next key, hands the node it stopped at to `visit`, then drops
    /// down.  Returns the node it stopped at on level 0.
    fn descend<P, F>(&self, advance: P, mut visit: F) -> NonNull<SkipNode<K, V>>
    where
        P: Fn(&K) -> bool,
        F: FnMut(NonNull<SkipNode<K, V>>),
    {
        let mut node = self.header;
        unsafe {
            loop {
                while let Some(next) = (*node.as_ptr()).next {
                    match (*next.as_ptr()).key() {
                        Some(key) if advance(key) => node = next,
                        _ => break,
                    }
                }
                visit(node);
                match (*node.as_ptr()).bottom {
                    Some(bottom) => node = bottom,
                    None => return node,
                }
            }
        }
    }

    /// The last level-0 node (possibly the header) whose key is strictly less than `key`.
    fn find_predecessor(&self, key: &K) -> NonNull<SkipNode<K, V>> {
        self.descend(|k| (self.compare)(k, key) == Ordering::Less, |_| ())
    }

    /// Like `descend`, collecting the stopping node of every level.  Indexed by level.
    fn trail<P>(&self, advance: P) -> Vec<NonNull<SkipNode<K, V>>>
    where
        P: Fn(&K) -> bool,
    {
        let mut trail = Vec::with_capacity(self.height());
        self.descend(advance, |node| trail.push(node));
        trail.reverse();
        trail
    }

    fn find_base(&self, key: &K) -> Link<K, V> {
        let predecessor = self.find_predecessor(key);
        unsafe {
            match (*predecessor.as_ptr()).next {
                Some(next) => match (*next.as_ptr()).key() {
                    Some(k) if (self.compare)(k, key) == Ordering::Equal => Some(next),
                    _ => None,
                },
                None => None,
            }
        }
    }

    /// Headers from level 0 upwards.
    fn headers(&self) -> Vec<NonNull<SkipNode<K, V>>> {
        let mut headers = Vec::with_capacity(self.height());
        let mut header = Some(self.header);
        while let Some(current) = header {
            headers.push(current);
            header = unsafe { (*current.as_ptr()).bottom };
        }
        headers.reverse();
        headers
    }

    // ///////////////////////////////////////////////
    // Node & level management
    // ///////////////////////////////////////////////

    /// Put a new header on top of the header tower.
    fn grow_level(&mut self) -> Result<NonNull<SkipNode<K, V>>, SetError> {
        let level = self.height();
        let header = SkipNode::header(level)
            .allocate()
            .map_err(|_| SetError::AllocationFailed)?;
        unsafe {
            (*header.as_ptr()).bottom = Some(self.header);
            (*self.header.as_ptr()).top = Some(header);
        }
        self.header = header;
        note!(self, Debug, "grew to {} levels", level + 1);
        Ok(header)
    }

    /// Stack a copy of `node` on the level above it.  The copy goes right after the nearest node
    /// to the left that already reaches that level, or after the header.
    unsafe fn promote(&mut self, node: NonNull<SkipNode<K, V>>) -> Result<NonNull<SkipNode<K, V>>, SetError> {
        let mut target = (*node.as_ptr()).previous;
        let anchor = loop {
            match target {
                Some(t) if (*t.as_ptr()).top.is_some() => break (*t.as_ptr()).top,
                Some(t) if !(*t.as_ptr()).is_header() => target = (*t.as_ptr()).previous,
                _ => break None,
            }
        };
        let anchor = match anchor {
            Some(anchor) => anchor,
            None => self.grow_level()?,
        };

        let base = match (*node.as_ptr()).payload {
            Payload::Shadow { base } => base,
            _ => node,
        };
        let copy = SkipNode::shadow(base, (*node.as_ptr()).level + 1)
            .allocate()
            .map_err(|_| SetError::AllocationFailed)?;

        Self::link_after(anchor, copy);
        (*node.as_ptr()).top = Some(copy);
        (*copy.as_ptr()).bottom = Some(node);
        Ok(copy)
    }

    unsafe fn link_after(anchor: NonNull<SkipNode<K, V>>, node: NonNull<SkipNode<K, V>>) {
        let next = (*anchor.as_ptr()).next;
        (*node.as_ptr()).next = next;
        (*node.as_ptr()).previous = Some(anchor);
        (*anchor.as_ptr()).next = Some(node);
        if let Some(next) = next {
            (*next.as_ptr()).previous = Some(node);
        }
    }

    unsafe fn unlink(node: NonNull<SkipNode<K, V>>) {
        let previous = (*node.as_ptr()).previous;
        let next = (*node.as_ptr()).next;
        if let Some(previous) = previous {
            (*previous.as_ptr()).next = next;
        }
        if let Some(next) = next {
            (*next.as_ptr()).previous = previous;
        }
    }

    /// Unlinks and frees the whole tower standing on `base`, returning its entry.
    unsafe fn take_tower(&mut self, base: NonNull<SkipNode<K, V>>) -> Option<(K, V)> {
        let previous = (*base.as_ptr()).previous;
        let next = (*base.as_ptr()).next;
        if self.first == Some(base) {
            self.first = next;
        }
        if self.last == Some(base) {
            self.last = match previous {
                Some(p) if !(*p.as_ptr()).is_header() => Some(p),
                _ => None,
            };
        }

        let mut node = (*base.as_ptr()).top;
        Self::unlink(base);
        let entry = SkipNode::release(base).payload.into_entry();
        while let Some(copy) = node {
            node = (*copy.as_ptr()).top;
            Self::unlink(copy);
            SkipNode::release(copy);
        }

        self.len -= 1;
        entry
    }

    unsafe fn destroy_tower(&mut self, base: NonNull<SkipNode<K, V>>) {
        if let Some((key, value)) = self.take_tower(base) {
            self.discard(key, value);
        }
    }

    /// Frees a single node; only base nodes reach the destructors.
    unsafe fn destroy_node(&self, node: NonNull<SkipNode<K, V>>) {
        if let Some((key, value)) = SkipNode::release(node).payload.into_entry() {
            self.discard(key, value);
        }
    }

    fn discard(&self, key: K, value: V) {
        match self.destroy_key {
            Some(ref destroy) => destroy(key),
            None => drop(key),
        }
        match self.destroy_value {
            Some(ref destroy) => destroy(value),
            None => drop(value),
        }
    }
}

// ///////////////////////////////////////////////
// Trait implementation
// ///////////////////////////////////////////////

impl<K, V> Drop for OrderedSet<K, V> {
    fn drop(&mut self) {
        unsafe {
            let mut header = Some(self.header);
            while let Some(current_header) = header {
                header = (*current_header.as_ptr()).bottom;
                let mut node = Some(current_header);
                while let Some(current) = node {
                    node = (*current.as_ptr()).next;
                    self.destroy_node(current);
                }
            }
        }
    }
}

impl<K: Ord, V> Default for OrderedSet<K, V> {
    fn default() -> OrderedSet<K, V> {
        OrderedSet::new()
    }
}

impl<K, V> fmt::Debug for OrderedSet<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a OrderedSet<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V> IntoIterator for OrderedSet<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter { set: self }
    }
}

// ///////////////////////////////////////////////
// Extra structs
// ///////////////////////////////////////////////

/// A handle on one entry of a set, valid for as long as the set is borrowed.
pub struct NodeRef<'a, K, V> {
    node: NonNull<SkipNode<K, V>>,
    _marker: PhantomData<&'a SkipNode<K, V>>,
}

impl<'a, K, V> NodeRef<'a, K, V> {
    // Only ever called with base nodes.
    fn new(node: NonNull<SkipNode<K, V>>) -> Self {
        NodeRef {
            node,
            _marker: PhantomData,
        }
    }

    /// The key and the value of the entry.
    pub fn entry(&self) -> (&'a K, &'a V) {
        match unsafe { &(*self.node.as_ptr()).payload } {
            Payload::Base { key, value } => (key, value),
            _ => unreachable!("node handles only point at base nodes"),
        }
    }

    /// The key of the entry.
    pub fn key(&self) -> &'a K {
        self.entry().0
    }

    /// The value of the entry.
    pub fn value(&self) -> &'a V {
        self.entry().1
    }

    /// The following entry, or `Cursor::End`.
    pub fn next(&self) -> Cursor<'a, K, V> {
        match unsafe { (*self.node.as_ptr()).next } {
            Some(next) => Cursor::At(NodeRef::new(next)),
            None => Cursor::End,
        }
    }

    /// The preceding entry, or `Cursor::Begin`.
    pub fn previous(&self) -> Cursor<'a, K, V> {
        match unsafe { (*self.node.as_ptr()).previous } {
            Some(previous) if unsafe { !(*previous.as_ptr()).is_header() } => {
                Cursor::At(NodeRef::new(previous))
            }
            _ => Cursor::Begin,
        }
    }
}

impl<'a, K, V> Clone for NodeRef<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V> Copy for NodeRef<'a, K, V> {}

impl<'a, K, V> PartialEq for NodeRef<'a, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<'a, K, V> Eq for NodeRef<'a, K, V> {}

impl<'a, K, V> fmt::Debug for NodeRef<'a, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (key, value) = self.entry();
        f.debug_tuple("NodeRef").field(key).field(value).finish()
    }
}

/// A traversal position: an entry, or one of the two virtual ends of the set.
pub enum Cursor<'a, K, V> {
    /// Before the first entry.
    Begin,
    At(NodeRef<'a, K, V>),
    /// After the last entry.
    End,
}

impl<'a, K, V> Cursor<'a, K, V> {
    /// The entry under the cursor, if any.
    pub fn node(&self) -> Option<NodeRef<'a, K, V>> {
        match *self {
            Cursor::At(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_begin(&self) -> bool {
        match *self {
            Cursor::Begin => true,
            _ => false,
        }
    }

    pub fn is_end(&self) -> bool {
        match *self {
            Cursor::End => true,
            _ => false,
        }
    }
}

impl<'a, K, V> Clone for Cursor<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V> Copy for Cursor<'a, K, V> {}

impl<'a, K, V> PartialEq for Cursor<'a, K, V> {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Cursor::Begin, Cursor::Begin) | (Cursor::End, Cursor::End) => true,
            (Cursor::At(a), Cursor::At(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a, K, V> Eq for Cursor<'a, K, V> {}

impl<'a, K, V> fmt::Debug for Cursor<'a, K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Cursor::Begin => f.write_str("Begin"),
            Cursor::At(ref node) => node.fmt(f),
            Cursor::End => f.write_str("End"),
        }
    }
}

pub struct Iter<'a, K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    len: usize,
    _marker: PhantomData<&'a SkipNode<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.len == 0 {
            return None;
        }
        let node = self.front?;
        self.front = unsafe { (*node.as_ptr()).next };
        self.len -= 1;
        Some(NodeRef::new(node).entry())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<(&'a K, &'a V)> {
        if self.len == 0 {
            return None;
        }
        let node = self.back?;
        self.back = unsafe { (*node.as_ptr()).previous };
        self.len -= 1;
        Some(NodeRef::new(node).entry())
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

/// Moves entries out of a set in ascending order.  Entries still inside when the iterator is
/// dropped are discarded through the set's destructors.
pub struct IntoIter<K, V> {
    set: OrderedSet<K, V>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.set.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.set.len(), Some(self.set.len()))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.set.pop_last()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

// ///////////////////////////////////////////////
// Tests
// ///////////////////////////////////////////////

#[cfg(test)]
impl<K, V> OrderedSet<K, V> {
    /// Walks every level and asserts the structural invariants.
    fn check(&self) {
        unsafe {
            let headers = self.headers();
            assert_eq!(headers.len(), self.height());

            for (level, &header) in headers.iter().enumerate() {
                let h = &*header.as_ptr();
                assert!(h.is_header());
                assert_eq!(h.level, level);
                assert!(h.previous.is_none());
                if level == 0 {
                    assert!(h.bottom.is_none());
                } else {
                    assert_eq!(h.bottom, Some(headers[level - 1]));
                }
                if level + 1 == headers.len() {
                    assert!(h.top.is_none());
                } else {
                    assert_eq!(h.top, Some(headers[level + 1]));
                }

                let mut count = 0;
                let mut previous = header;
                let mut node = h.next;
                while let Some(current) = node {
                    let n = &*current.as_ptr();
                    assert!(!n.is_header());
                    assert_eq!(n.level, level);
                    assert_eq!(n.previous, Some(previous));
                    if let Some(previous_key) = (*previous.as_ptr()).key() {
                        let ordering = (self.compare)(previous_key, n.key().unwrap());
                        assert!(ordering != Ordering::Greater);
                    }
                    match n.payload {
                        Payload::Base { .. } => {
                            assert_eq!(level, 0);
                            assert!(n.bottom.is_none());
                        }
                        Payload::Shadow { base } => {
                            assert!(level > 0);
                            let below = n.bottom.unwrap();
                            assert_eq!((*below.as_ptr()).top, Some(current));
                            assert_eq!((*below.as_ptr()).level + 1, level);
                            let below_base = match (*below.as_ptr()).payload {
                                Payload::Shadow { base } => base,
                                _ => below,
                            };
                            assert_eq!(below_base, base);
                        }
                        Payload::Header => panic!("header inside a level chain"),
                    }
                    if let Some(top) = n.top {
                        assert_eq!((*top.as_ptr()).bottom, Some(current));
                    }
                    count += 1;
                    previous = current;
                    node = n.next;
                }

                if level == 0 {
                    assert_eq!(count, self.len);
                    assert_eq!(self.first, h.next);
                    if count == 0 {
                        assert!(self.last.is_none());
                    } else {
                        assert_eq!(self.last, Some(previous));
                    }
                }
            }
        }
    }

    /// Number of nodes on `level`, headers excluded.
    fn level_len(&self, level: usize) -> usize {
        let mut node = unsafe { (*self.headers()[level].as_ptr()).next };
        let mut count = 0;
        while let Some(current) = node {
            count += 1;
            node = unsafe { (*current.as_ptr()).next };
        }
        count
    }
}
