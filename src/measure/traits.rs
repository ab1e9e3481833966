//! Distance traits.

/// A distance over values of type `T`.
///
/// Implementations must be pure and callable concurrently from many threads on shared values.
pub trait Measure<T: ?Sized>: Sync {
    /// Distance between `a` and `b`, in `[0, 1]`.
    fn distance(&self, a: &T, b: &T) -> f64;

    /// Whether this measure satisfies identity, symmetry and the triangle inequality.
    ///
    /// Index pruning is only exact when this is true.
    fn is_true_metric(&self) -> bool {
        false
    }
}

impl<T: ?Sized, M: Measure<T> + ?Sized> Measure<T> for &M {
    fn distance(&self, a: &T, b: &T) -> f64 {
        (**self).distance(a, b)
    }

    fn is_true_metric(&self) -> bool {
        (**self).is_true_metric()
    }
}

/// A string distance applied to one pair of field values.
///
/// Must be total: empty inputs and unusual characters still produce a value. Non-finite
/// outputs are treated as maximal dissimilarity by the composite measure.
pub trait AtomicMetric: Send + Sync {
    /// Distance between two field values, in `[0, 1]`.
    fn distance(&self, a: &str, b: &str) -> f64;

    /// Whether this metric satisfies the triangle inequality.
    fn is_true_metric(&self) -> bool {
        false
    }

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Plain functions and closures work as atomic metrics. They are never assumed to be metrics.
impl<F> AtomicMetric for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn distance(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }

    fn name(&self) -> &str {
        "custom"
    }
}
