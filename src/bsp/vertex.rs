//! Vertex handles and ranges
//!
//! A [`Vertex`] is a fragment-local dense index. It is only meaningful inside
//! the fragment that produced it; global identity is carried by [`Gid`].

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Fragment identifier, dense in `[0, fnum)`
pub type FragmentId = usize;

/// Globally stable vertex identifier
pub type Gid = u64;

/// Fragment-local vertex handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vertex(usize);

impl Vertex {
    /// Create a handle from a dense local index
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The dense local index
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for Vertex {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open range of vertex handles `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexRange {
    start: usize,
    end: usize,
}

impl VertexRange {
    /// Create a range; an inverted range is normalised to empty
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn contains(&self, v: Vertex) -> bool {
        v.index() >= self.start && v.index() < self.end
    }

    /// Iterate over the handles in the range
    pub fn iter(&self) -> impl Iterator<Item = Vertex> + Clone {
        (self.start..self.end).map(Vertex::new)
    }

    /// Intersection with another range
    pub fn intersect(&self, other: VertexRange) -> VertexRange {
        VertexRange::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Split into exactly `parts` contiguous chunks whose lengths differ by at
    /// most one. Trailing chunks may be empty when `parts > len`.
    pub fn split(&self, parts: usize) -> Vec<VertexRange> {
        let parts = parts.max(1);
        let len = self.len();
        let base = len / parts;
        let extra = len % parts;

        let mut chunks = Vec::with_capacity(parts);
        let mut lo = self.start;
        for i in 0..parts {
            let size = base + usize::from(i < extra);
            chunks.push(VertexRange::new(lo, lo + size));
            lo += size;
        }
        chunks
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for VertexRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl IntoIterator for VertexRange {
    type Item = Vertex;
    type IntoIter = std::iter::Map<Range<usize>, fn(usize) -> Vertex>;

    fn into_iter(self) -> Self::IntoIter {
        (self.start..self.end).map(Vertex::new as fn(usize) -> Vertex)
    }
}

/// Dense per-vertex storage indexed by [`Vertex`]
///
/// Holds the shared per-vertex state of an app. Concurrent writers go
/// through atomic slot types (see [`atomic_merge_min`](super::atomic::atomic_merge_min)).
#[derive(Debug, Clone, Default)]
pub struct VertexArray<T> {
    data: Vec<T>,
}

impl<T> VertexArray<T> {
    /// Create an array of `len` slots, each produced by `init`
    pub fn from_fn(len: usize, init: impl FnMut(usize) -> T) -> Self {
        Self {
            data: (0..len).map(init).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, v: Vertex) -> Option<&T> {
        self.data.get(v.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Vertex, &T)> {
        self.data.iter().enumerate().map(|(i, t)| (Vertex::new(i), t))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T> std::ops::Index<Vertex> for VertexArray<T> {
    type Output = T;

    fn index(&self, v: Vertex) -> &T {
        &self.data[v.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_basics() {
        let range = VertexRange::new(2, 6);
        assert_eq!(range.len(), 4);
        assert!(range.contains(Vertex::new(2)));
        assert!(!range.contains(Vertex::new(6)));
        assert_eq!(range.iter().map(Vertex::index).collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = VertexRange::new(5, 3);
        assert!(range.is_empty());
        assert_eq!(range.iter().count(), 0);
    }

    #[test]
    fn test_split_covers_range_once() {
        let range = VertexRange::new(3, 13);
        let chunks = range.split(4);
        assert_eq!(chunks.len(), 4);
        assert_eq!(
            chunks.iter().map(VertexRange::len).collect::<Vec<_>>(),
            vec![3, 3, 2, 2]
        );
        let all: Vec<_> = chunks.iter().flat_map(|c| c.iter()).collect();
        assert_eq!(all, range.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_split_more_parts_than_vertices() {
        let chunks = VertexRange::new(0, 2).split(4);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.iter().filter(|c| c.is_empty()).count(), 2);
    }

    #[test]
    fn test_intersect() {
        let a = VertexRange::new(0, 10);
        assert_eq!(a.intersect(VertexRange::new(5, 20)), VertexRange::new(5, 10));
        assert!(a.intersect(VertexRange::new(12, 20)).is_empty());
    }

    #[test]
    fn test_vertex_array_index() {
        let array = VertexArray::from_fn(3, |i| i * 10);
        assert_eq!(array[Vertex::new(2)], 20);
        assert!(array.get(Vertex::new(3)).is_none());
    }
}
