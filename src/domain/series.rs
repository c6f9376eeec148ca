//! Lazy, indexable numeric series.
//!
//! A [`Series`] reports its length up front and computes `value_at(i)` on
//! demand. Index 0 is the most recent value; higher indices are older. No
//! transform caches results, so reads are a pure function of the backing data.
//!
//! The transforms form a small closed set:
//! - [`Direct`]: an owned buffer
//! - [`Reference`]: a borrowed alias, recomputed on every access
//! - [`Repeat`]: one constant value over a fixed length
//! - [`Change`]: pairwise difference `base[i] - base[i + 1]`
//! - [`SubRange`]: a window `[offset, offset + len)` of another series
//! - [`AnySeries`]: the type-erased wrapper for mixing transforms in one tree

use std::fmt;
use std::ops::Sub;

use crate::domain::error::RangeError;

pub trait Series {
    type Value: Copy;

    fn len(&self) -> usize;

    /// Value at `index`; fails with [`RangeError`] when `index >= len()`.
    fn value_at(&self, index: usize) -> Result<Self::Value, RangeError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every value, newest first.
    fn to_vec(&self) -> Result<Vec<Self::Value>, RangeError> {
        (0..self.len()).map(|i| self.value_at(i)).collect()
    }
}

impl<S: Series + ?Sized> Series for Box<S> {
    type Value = S::Value;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn value_at(&self, index: usize) -> Result<Self::Value, RangeError> {
        (**self).value_at(index)
    }
}

/// Owned buffer, stored newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Direct<T> {
    values: Vec<T>,
}

impl<T: Copy> Direct<T> {
    pub fn new(newest_first: Vec<T>) -> Self {
        Self {
            values: newest_first,
        }
    }

    pub fn from_chronological(mut oldest_first: Vec<T>) -> Self {
        oldest_first.reverse();
        Self::new(oldest_first)
    }

    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }
}

impl<T: Copy> Series for Direct<T> {
    type Value = T;

    fn len(&self) -> usize {
        self.values.len()
    }

    fn value_at(&self, index: usize) -> Result<T, RangeError> {
        self.values
            .get(index)
            .copied()
            .ok_or(RangeError::new(index, self.values.len()))
    }
}

/// Non-owning alias of another series.
#[derive(Debug)]
pub struct Reference<'a, S: ?Sized> {
    base: &'a S,
}

impl<'a, S: ?Sized> Reference<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self { base }
    }
}

impl<S: ?Sized> Clone for Reference<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for Reference<'_, S> {}

impl<S: Series + ?Sized> Series for Reference<'_, S> {
    type Value = S::Value;

    fn len(&self) -> usize {
        self.base.len()
    }

    fn value_at(&self, index: usize) -> Result<S::Value, RangeError> {
        self.base.value_at(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repeat<T> {
    value: T,
    len: usize,
}

impl<T: Copy> Repeat<T> {
    pub fn new(value: T, len: usize) -> Self {
        Self { value, len }
    }
}

impl<T: Copy> Series for Repeat<T> {
    type Value = T;

    fn len(&self) -> usize {
        self.len
    }

    fn value_at(&self, index: usize) -> Result<T, RangeError> {
        RangeError::check(index, self.len)?;
        Ok(self.value)
    }
}

/// `base[i] - base[i + 1]`: the change from the previous (older) value.
///
/// The oldest value of `base` has no predecessor, so the change series is one
/// shorter than its base and reading that position is a range error.
#[derive(Debug, Clone)]
pub struct Change<S> {
    base: S,
}

impl<S: Series> Change<S> {
    pub fn new(base: S) -> Self {
        Self { base }
    }
}

impl<S> Series for Change<S>
where
    S: Series,
    S::Value: Sub<Output = S::Value>,
{
    type Value = S::Value;

    fn len(&self) -> usize {
        self.base.len().saturating_sub(1)
    }

    fn value_at(&self, index: usize) -> Result<S::Value, RangeError> {
        RangeError::check(index, self.len())?;
        Ok(self.base.value_at(index)? - self.base.value_at(index + 1)?)
    }
}

/// The window `[offset, offset + len)` of `base`, re-indexed from zero.
///
/// Skipping from the front drops the newest values (`offset = 1` reads
/// "yesterday"); truncating drops the oldest values, which is how series with
/// different lookbacks are lined up on their shared newest index.
#[derive(Debug, Clone)]
pub struct SubRange<S> {
    base: S,
    offset: usize,
    len: usize,
}

impl<S: Series> SubRange<S> {
    /// # Panics
    /// If the window does not fit inside `base`.
    pub fn new(base: S, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= base.len(),
            "invariant violated: window {}..{} exceeds base series of length {}",
            offset,
            offset + len,
            base.len()
        );
        Self { base, offset, len }
    }

    /// Drop the `offset` newest values.
    pub fn skip(base: S, offset: usize) -> Self {
        let offset = offset.min(base.len());
        let len = base.len() - offset;
        Self::new(base, offset, len)
    }

    /// Keep only the `len` newest values.
    pub fn truncate(base: S, len: usize) -> Self {
        let len = len.min(base.len());
        Self::new(base, 0, len)
    }
}

impl<S: Series> Series for SubRange<S> {
    type Value = S::Value;

    fn len(&self) -> usize {
        self.len
    }

    fn value_at(&self, index: usize) -> Result<S::Value, RangeError> {
        RangeError::check(index, self.len)?;
        self.base.value_at(self.offset + index)
    }
}

/// Type-erased series, for trees whose node kinds are only known at runtime.
pub struct AnySeries<'a, T = f64> {
    inner: Box<dyn Series<Value = T> + 'a>,
}

impl<'a, T: Copy> AnySeries<'a, T> {
    pub fn new(series: impl Series<Value = T> + 'a) -> Self {
        Self {
            inner: Box::new(series),
        }
    }
}

impl<T: Copy> Series for AnySeries<'_, T> {
    type Value = T;

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn value_at(&self, index: usize) -> Result<T, RangeError> {
        self.inner.value_at(index)
    }
}

impl<T: Copy> fmt::Debug for AnySeries<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnySeries")
            .field("len", &self.inner.len())
            .finish()
    }
}
