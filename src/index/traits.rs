//! Range-search traits.

/// A stored item within range of a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    /// Position of the item in the stored set.
    pub index: usize,
    /// Distance from the stored item to the query.
    pub distance: f64,
}

/// Trait for structures answering range queries over a stored set.
pub trait RangeSearch<T> {
    /// Every stored item within `threshold` of `query`, sorted by ascending distance then
    /// stored position.
    fn range_query(&self, query: &T, threshold: f64) -> Vec<Neighbour>;

    /// Number of stored items.
    fn len(&self) -> usize;

    /// True when nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn sort_neighbours(neighbours: &mut [Neighbour]) {
    neighbours.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.index.cmp(&b.index))
    });
}
