//! Linkage quality metrics.
//!
//! Scores linker output against ground truth.
//!
//! # Metrics Overview
//!
//! | Metric | Formula | Range | Best |
//! |--------|---------|-------|------|
//! | precision | `tp / (tp + fp)` | [0, 1] | 1 |
//! | recall | `tp / (tp + fn)` | [0, 1] | 1 |
//! | F-measure | `2pr / (p + r)` | [0, 1] | 1 |
//!
//! Each is 0 rather than NaN when its denominator is 0.
//!
//! # Symmetric tasks
//!
//! Linking a record set against itself reports every undirected pair twice, once from each
//! end. [`evaluate`] halves the link-derived counts for such tasks before deriving `fn`.
//!
//! # Example
//!
//! ```rust
//! use kinlink::metrics::LinkageQuality;
//!
//! let q = LinkageQuality::new(3, 1, 1);
//! assert!((q.precision() - 0.75).abs() < 1e-12);
//! assert!((q.recall() - 0.75).abs() < 1e-12);
//! assert!((q.f_measure() - 0.75).abs() < 1e-12);
//! ```

use std::fmt;

use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::linker::Link;
use crate::truth::{LinkStatus, TrueMatchRule};

/// Confusion counts for one linkage run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkageQuality {
    /// Links that are true matches.
    pub tp: usize,
    /// Links whose identities disagree.
    pub fp: usize,
    /// True links the linker missed.
    pub fn_: usize,
    /// Links with too little identity data to classify.
    pub unknown: usize,
    /// True links made unreachable by blocking before linkage.
    pub links_lost_on_prefilter: usize,
}

impl LinkageQuality {
    /// Create from the three confusion counts.
    pub fn new(tp: usize, fp: usize, fn_: usize) -> Self {
        Self {
            tp,
            fp,
            fn_,
            ..Self::default()
        }
    }

    /// Record how many true links blocking removed.
    pub fn with_links_lost_on_prefilter(mut self, lost: usize) -> Self {
        self.links_lost_on_prefilter = lost;
        self
    }

    /// `tp / (tp + fp)`, or 0 when no link was classified.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// `tp / (tp + fn)`, or 0 when there was nothing to find.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Harmonic mean of precision and recall, or 0 when both are 0.
    pub fn f_measure(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }
}

impl fmt::Display for LinkageQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tp {} fp {} fn {} unknown {} precision {:.3} recall {:.3} f1 {:.3}",
            self.tp,
            self.fp,
            self.fn_,
            self.unknown,
            self.precision(),
            self.recall(),
            self.f_measure()
        )
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    tp: usize,
    fp: usize,
    unknown: usize,
}

impl Tally {
    fn add(mut self, status: LinkStatus) -> Self {
        match status {
            LinkStatus::TrueMatch => self.tp += 1,
            LinkStatus::NotTrueMatch => self.fp += 1,
            LinkStatus::Unknown => self.unknown += 1,
        }
        self
    }

    fn merge(self, other: Tally) -> Tally {
        Tally {
            tp: self.tp + other.tp,
            fp: self.fp + other.fp,
            unknown: self.unknown + other.unknown,
        }
    }
}

/// Score links against a true-match rule and the ground-truth link count.
///
/// `fn` saturates at 0 if the links hold more true matches than `ground_truth_count`.
pub fn evaluate(
    links: &[Link<'_>],
    rule: &TrueMatchRule,
    ground_truth_count: usize,
    symmetric: bool,
) -> LinkageQuality {
    let classify = |link: &Link<'_>| rule.status(link.record1(), link.record2());

    #[cfg(feature = "parallel")]
    let tally = links
        .par_iter()
        .fold(Tally::default, |t, link| t.add(classify(link)))
        .reduce(Tally::default, Tally::merge);

    #[cfg(not(feature = "parallel"))]
    let tally = links
        .iter()
        .fold(Tally::default(), |t, link| t.add(classify(link)));

    let Tally {
        mut tp,
        mut fp,
        mut unknown,
    } = tally;
    if symmetric {
        tp /= 2;
        fp /= 2;
        unknown /= 2;
    }

    let quality = LinkageQuality {
        tp,
        fp,
        fn_: ground_truth_count.saturating_sub(tp),
        unknown,
        links_lost_on_prefilter: 0,
    };
    info!(links = links.len(), ground_truth_count, %quality, "evaluated linkage");
    quality
}
