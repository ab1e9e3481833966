//! Brute-force range search.

use super::traits::{sort_neighbours, Neighbour, RangeSearch};
use crate::measure::Measure;

/// Compares the query with every stored item.
///
/// Exact for any measure, metric or not. Used as the reference the pivot index is checked
/// against.
#[derive(Debug, Clone)]
pub struct LinearScan<T, M> {
    items: Vec<T>,
    measure: M,
}

impl<T, M: Measure<T>> LinearScan<T, M> {
    /// Store `items` for scanning.
    pub fn new(items: Vec<T>, measure: M) -> Self {
        Self { items, measure }
    }

    /// Stored items.
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

impl<T, M: Measure<T>> RangeSearch<T> for LinearScan<T, M> {
    fn range_query(&self, query: &T, threshold: f64) -> Vec<Neighbour> {
        let mut out: Vec<Neighbour> = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, x)| {
                let distance = self.measure.distance(x, query);
                (distance <= threshold).then_some(Neighbour { index, distance })
            })
            .collect();
        sort_neighbours(&mut out);
        out
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
