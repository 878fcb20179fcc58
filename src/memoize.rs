//! Memoization Module
//!
//! Caches a function's results in a private expiring dictionary.

use std::hash::Hash;
use std::time::Duration;

use tracing::trace;

use crate::cache::ExpiringDict;
use crate::error::Result;

// == Memoized ==
/// A function wrapped with a bounded, expiring result cache.
///
/// The cache key is the whole argument value `A`. To memoize something
/// method-like, make the receiver's identity part of `A`.
///
/// The wrapped function runs without the cache lock held. Two threads that
/// miss on the same key at the same time both run it; the later result wins.
pub struct Memoized<A, R, F> {
    cache: ExpiringDict<A, R>,
    func: F,
}

impl<A, R, F> Memoized<A, R, F>
where
    A: Eq + Hash + Clone,
    R: Clone,
    F: Fn(&A) -> R,
{
    /// Wraps `func` with a cache holding at most `max_len` results, each for
    /// at most `max_age`.
    pub fn new(max_len: usize, max_age: Duration, func: F) -> Result<Self> {
        Ok(Self {
            cache: ExpiringDict::new(max_len, max_age)?,
            func,
        })
    }

    // == Call ==
    /// Returns the cached result for `args`, computing and storing it on a
    /// miss.
    pub fn call(&self, args: A) -> R {
        if let Some(result) = self.cache.get(&args) {
            return result;
        }

        trace!("memoized call missed, computing");
        let result = (self.func)(&args);
        self.cache.set(args, result.clone());
        result
    }

    /// The backing dictionary.
    pub fn cache(&self) -> &ExpiringDict<A, R> {
        &self.cache
    }
}

/// Wraps `func` in a [`Memoized`] cache.
pub fn memoize<A, R, F>(max_len: usize, max_age: Duration, func: F) -> Result<Memoized<A, R, F>>
where
    A: Eq + Hash + Clone,
    R: Clone,
    F: Fn(&A) -> R,
{
    Memoized::new(max_len, max_age, func)
}
