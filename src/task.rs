//! Linkage task descriptors.
//!
//! A task is plain data: which roles meet, which fields are compared, how strictly, and how
//! the result is scored. Recipes for concrete tasks (baby-baby siblings, bride-groom
//! siblings, death-marriage identity, ...) are built by the caller from these pieces; the
//! engine itself knows none of them.

use std::fmt;
use std::sync::Arc;

use crate::blocking::BlockingFilter;
use crate::error::{Error, Result};
use crate::index::IndexConfig;
use crate::measure::{Aggregation, AtomicMetric, BoundedLevenshtein, CompositeMeasure, LinkageFieldSet};
use crate::record::{FieldId, Role};
use crate::truth::{GroundTruth, TrueMatchRule};

/// Everything needed to run and score one linkage.
#[derive(Clone)]
pub struct LinkageTask {
    name: String,
    link_type: String,
    stored_role: Role,
    query_role: Role,
    stored_fields: Vec<FieldId>,
    query_fields: Vec<FieldId>,
    metric: Arc<dyn AtomicMetric>,
    aggregation: Aggregation,
    threshold: f64,
    index: IndexConfig,
    min_populated: Option<usize>,
    true_match: Option<TrueMatchRule>,
    ground_truth: Option<GroundTruth>,
}

impl fmt::Debug for LinkageTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkageTask")
            .field("name", &self.name)
            .field("link_type", &self.link_type)
            .field("stored_role", &self.stored_role)
            .field("query_role", &self.query_role)
            .field("stored_fields", &self.stored_fields)
            .field("query_fields", &self.query_fields)
            .field("metric", &self.metric.name())
            .field("aggregation", &self.aggregation)
            .field("threshold", &self.threshold)
            .field("index", &self.index)
            .field("min_populated", &self.min_populated)
            .finish_non_exhaustive()
    }
}

impl LinkageTask {
    /// Create a task linking `stored_role` records with `query_role` records.
    ///
    /// Defaults: bounded Levenshtein, mean aggregation, threshold 0.5, default index,
    /// no blocking, no evaluation.
    pub fn new(name: impl Into<String>, stored_role: Role, query_role: Role) -> Self {
        let link_type = if stored_role == query_role {
            format!("{} with {}", stored_role.name(), query_role.name())
        } else {
            format!("{} to {}", stored_role.name(), query_role.name())
        };
        Self {
            name: name.into(),
            link_type,
            stored_role,
            query_role,
            stored_fields: Vec::new(),
            query_fields: Vec::new(),
            metric: Arc::new(BoundedLevenshtein::default()),
            aggregation: Aggregation::Mean,
            threshold: 0.5,
            index: IndexConfig::default(),
            min_populated: None,
            true_match: None,
            ground_truth: None,
        }
    }

    /// Describe the kind of link produced (e.g. "sibling").
    pub fn with_link_type(mut self, link_type: impl Into<String>) -> Self {
        self.link_type = link_type.into();
        self
    }

    /// Fields compared, position by position.
    pub fn with_fields(
        mut self,
        stored: impl Into<Vec<FieldId>>,
        query: impl Into<Vec<FieldId>>,
    ) -> Self {
        self.stored_fields = stored.into();
        self.query_fields = query.into();
        self
    }

    /// Atomic metric applied to each field pair.
    pub fn with_metric(mut self, metric: Arc<dyn AtomicMetric>) -> Self {
        self.metric = metric;
        self
    }

    /// Aggregation of field distances.
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Distance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Index parameters.
    pub fn with_index_config(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    /// Drop records with fewer than `min_populated` linkage fields present.
    pub fn with_blocking(mut self, min_populated: usize) -> Self {
        self.min_populated = Some(min_populated);
        self
    }

    /// Rule classifying links for evaluation.
    pub fn with_true_match(mut self, rule: TrueMatchRule) -> Self {
        self.true_match = Some(rule);
        self
    }

    /// How to derive the ground-truth links.
    pub fn with_ground_truth(mut self, ground_truth: GroundTruth) -> Self {
        self.ground_truth = Some(ground_truth);
        self
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link type.
    pub fn link_type(&self) -> &str {
        &self.link_type
    }

    /// Stored-side role.
    pub fn stored_role(&self) -> &Role {
        &self.stored_role
    }

    /// Query-side role.
    pub fn query_role(&self) -> &Role {
        &self.query_role
    }

    /// Distance threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Index parameters.
    pub fn index_config(&self) -> &IndexConfig {
        &self.index
    }

    /// True-match rule, if the task is evaluated.
    pub fn true_match(&self) -> Option<&TrueMatchRule> {
        self.true_match.as_ref()
    }

    /// Ground-truth shape, if the task is evaluated.
    pub fn ground_truth(&self) -> Option<&GroundTruth> {
        self.ground_truth.as_ref()
    }

    /// Whether a role is linked with itself.
    pub fn is_symmetric(&self) -> bool {
        self.stored_role == self.query_role
    }

    /// Check the whole descriptor. Fails fast on any configuration defect.
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                message: "must be finite and non-negative",
            });
        }
        self.measure()?;
        self.blocking_filters()?;

        let stored = self.stored_role.kind();
        let query = self.query_role.kind();
        if let Some(rule) = &self.true_match {
            for pair in rule.alternatives().iter().flatten() {
                stored.check_field(pair.first)?;
                query.check_field(pair.second)?;
            }
        }
        match &self.ground_truth {
            Some(GroundTruth::Identity { field1, field2 }) => {
                stored.check_field(*field1)?;
                query.check_field(*field2)?;
            }
            Some(GroundTruth::SiblingSymmetric { father, mother }) => {
                if !self.is_symmetric() {
                    return Err(Error::InvalidParameter {
                        name: "ground_truth",
                        message: "symmetric sibling ground truth needs equal roles",
                    });
                }
                stored.check_field(*father)?;
                stored.check_field(*mother)?;
            }
            Some(GroundTruth::SiblingAsymmetric {
                father1,
                mother1,
                father2,
                mother2,
            }) => {
                stored.check_field(*father1)?;
                stored.check_field(*mother1)?;
                query.check_field(*father2)?;
                query.check_field(*mother2)?;
            }
            Some(GroundTruth::Rule { rule, .. }) => {
                for pair in rule.alternatives().iter().flatten() {
                    stored.check_field(pair.first)?;
                    query.check_field(pair.second)?;
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Build the composite measure for this task.
    pub fn measure(&self) -> Result<CompositeMeasure> {
        let stored = LinkageFieldSet::new(self.stored_role.kind(), self.stored_fields.clone())?;
        let query = LinkageFieldSet::new(self.query_role.kind(), self.query_fields.clone())?;
        Ok(CompositeMeasure::new(stored, query, Arc::clone(&self.metric))?
            .with_aggregation(self.aggregation))
    }

    /// Blocking filters for (stored, query), keyed on the linkage fields.
    pub fn blocking_filters(&self) -> Result<Option<(BlockingFilter, BlockingFilter)>> {
        let Some(min) = self.min_populated else {
            return Ok(None);
        };
        let stored = BlockingFilter::new(self.stored_fields.clone(), min)?;
        let query = BlockingFilter::new(self.query_fields.clone(), min)?;
        stored.validate_for(self.stored_role.kind())?;
        query.validate_for(self.query_role.kind())?;
        Ok(Some((stored, query)))
    }
}
