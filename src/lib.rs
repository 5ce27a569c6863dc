//! Ordered sets with duplicate keys, configured from a file.
//!
//! ```
//! let config = orderedset::Config::new();
//! let mut set = orderedset::open(&config).unwrap();
//! set.insert(2, "two").unwrap();
//! set.insert(1, "one").unwrap();
//! assert_eq!(set.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![1, 2]);
//! ```

pub use config::{Config, ConfigError};
pub use logger::{Level, Logger};
pub use skiplist::{
    Coin, CoinSource, Comparator, Cursor, Destructor, IntoIter, Iter, NodeRef, OrderedSet,
    Options, RandomCoin, SetError, DEFAULT_MAX_LEVEL,
};

/// Creates an empty set ordered by `K::cmp`, with the level cap, seed and logging of `config`.
pub fn open<K, V>(config: &Config) -> Result<OrderedSet<K, V>, ConfigError>
where
    K: Ord,
{
    Ok(OrderedSet::with_options(
        |a: &K, b: &K| a.cmp(b),
        config.options()?,
    ))
}

/// Reads the configuration file at `path` and creates an empty set from it.
pub fn open_file<K, V>(path: &str) -> Result<OrderedSet<K, V>, ConfigError>
where
    K: Ord,
{
    let mut config = Config::new();
    config.parsefile(path)?;
    open(&config)
}
