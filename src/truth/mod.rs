//! Ground truth from curated identity fields.
//!
//! Evaluation datasets carry identities assigned by hand (person ids, parents' ids). They
//! say which record pairs are truly linked, independently of any similarity, and are used
//! only to score linkage output, never to produce it.
//!
//! Missing identities are ambiguous rather than negative: they yield
//! [`LinkStatus::Unknown`] and are never counted as false positives.

mod ground_truth;
mod status;

pub use ground_truth::{family_key, triangular, GroundTruth};
pub use status::{AbsencePolicy, IdentityPair, LinkStatus, TrueMatchRule};
