//! Threshold linkage over a reference-point index.
//!
//! # Lifecycle
//!
//! ```text
//! Built --add_records--> RecordsAdded --links/collect_links--> Linking --terminate--> Terminated
//! ```
//!
//! Records are added exactly once. The threshold may change until linking starts.
//! `terminate` may be called from any state, any number of times; it drops the index.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::link::Link;
use super::viability::Viability;
use crate::blocking::{BlockingFilter, FilterReport};
use crate::error::{Error, Result};
use crate::index::{IndexConfig, QueryStats, ReferencePointIndex};
use crate::measure::{CompositeMeasure, Projection, Side};
use crate::record::{Record, Role};

/// Linker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkerState {
    /// Configured, no records yet.
    Built,
    /// Index built, ready to link.
    RecordsAdded,
    /// Links are being or have been produced.
    Linking,
    /// Resources released.
    Terminated,
}

impl LinkerState {
    /// Lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            LinkerState::Built => "built",
            LinkerState::RecordsAdded => "records added",
            LinkerState::Linking => "linking",
            LinkerState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LinkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type PivotIndex<'a> = ReferencePointIndex<Projection<'a>, CompositeMeasure>;

/// Emits every viable (stored, query) pair within a distance threshold.
///
/// Stored records are indexed; each query record is run as a range query against the index
/// and the surviving candidates are checked with the viability predicate.
///
/// The task is symmetric when both roles are equal. Then the two record collections are
/// expected to be the same set, a record is never linked with itself, and each undirected
/// pair is emitted once from each end.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kinlink::linker::{AlwaysViable, ThresholdLinker};
/// use kinlink::measure::{CompositeMeasure, Exact, LinkageFieldSet};
/// use kinlink::record::{birth, Record, RecordId, RecordKind};
///
/// let fields = LinkageFieldSet::new(RecordKind::Birth, [birth::SURNAME]).unwrap();
/// let measure = CompositeMeasure::symmetric(fields, Arc::new(Exact));
/// let records: Vec<Record> = (0..3)
///     .map(|i| Record::new(RecordId(i), RecordKind::Birth).with_field(birth::SURNAME, "moir"))
///     .collect();
///
/// let mut linker = ThresholdLinker::new(measure, 0.0, AlwaysViable).unwrap();
/// linker.add_records(&records, &records).unwrap();
/// assert_eq!(linker.collect_links().unwrap().len(), 6);
/// linker.terminate();
/// ```
pub struct ThresholdLinker<'a, V> {
    measure: CompositeMeasure,
    threshold: f64,
    viability: V,
    stored_role: Role,
    query_role: Role,
    index_config: IndexConfig,
    blocking: Option<(BlockingFilter, BlockingFilter)>,
    filter_reports: Option<(FilterReport, FilterReport)>,
    state: LinkerState,
    stored: Vec<&'a Record>,
    queries: Vec<(&'a Record, Projection<'a>)>,
    index: Option<PivotIndex<'a>>,
}

impl<V> fmt::Debug for ThresholdLinker<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdLinker")
            .field("measure", &self.measure)
            .field("threshold", &self.threshold)
            .field("stored_role", &self.stored_role)
            .field("query_role", &self.query_role)
            .field("state", &self.state)
            .field("stored", &self.stored.len())
            .field("queries", &self.queries.len())
            .finish()
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "threshold",
            message: "must be finite and non-negative",
        })
    }
}

impl<'a, V: Viability> ThresholdLinker<'a, V> {
    /// Create a linker.
    ///
    /// Roles default to the record kind names of the two field sets, so a measure over one
    /// kind on both sides makes a symmetric task unless [`ThresholdLinker::with_roles`] says
    /// otherwise.
    pub fn new(measure: CompositeMeasure, threshold: f64, viability: V) -> Result<Self> {
        check_threshold(threshold)?;
        let stored_kind = measure.fields(Side::Stored).kind();
        let query_kind = measure.fields(Side::Query).kind();
        Ok(Self {
            measure,
            threshold,
            viability,
            stored_role: Role::new(stored_kind, stored_kind.name()),
            query_role: Role::new(query_kind, query_kind.name()),
            index_config: IndexConfig::default(),
            blocking: None,
            filter_reports: None,
            state: LinkerState::Built,
            stored: Vec::new(),
            queries: Vec::new(),
            index: None,
        })
    }

    /// Set the roles of the stored and query records.
    pub fn with_roles(mut self, stored: Role, query: Role) -> Result<Self> {
        for (role, side) in [(&stored, Side::Stored), (&query, Side::Query)] {
            let expected = self.measure.fields(side).kind();
            if role.kind() != expected {
                return Err(Error::KindMismatch {
                    expected,
                    found: role.kind(),
                });
            }
        }
        self.stored_role = stored;
        self.query_role = query;
        Ok(self)
    }

    /// Set index construction parameters.
    pub fn with_index_config(mut self, config: IndexConfig) -> Self {
        self.index_config = config;
        self
    }

    /// Pre-filter stored and query records before indexing.
    pub fn with_blocking(mut self, stored: BlockingFilter, query: BlockingFilter) -> Self {
        self.blocking = Some((stored, query));
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkerState {
        self.state
    }

    /// Distance threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether the task links a role with itself.
    pub fn is_symmetric(&self) -> bool {
        self.stored_role == self.query_role
    }

    /// Blocking counts for (stored, query), once records have been added with blocking.
    pub fn filter_reports(&self) -> Option<(FilterReport, FilterReport)> {
        self.filter_reports
    }

    /// Change the threshold. Only allowed before linking starts.
    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        match self.state {
            LinkerState::Built | LinkerState::RecordsAdded => {
                check_threshold(threshold)?;
                self.threshold = threshold;
                Ok(())
            }
            state => Err(Error::InvalidState {
                operation: "set threshold",
                state: state.name(),
            }),
        }
    }

    /// Supply the record sets and build the index. Allowed once.
    ///
    /// For a symmetric task pass the same collection twice. Fails on an empty stored set
    /// or a record of the wrong kind.
    pub fn add_records<S, Q>(&mut self, stored: S, query: Q) -> Result<()>
    where
        S: IntoIterator<Item = &'a Record>,
        Q: IntoIterator<Item = &'a Record>,
    {
        if self.state != LinkerState::Built {
            return Err(Error::InvalidState {
                operation: "add records",
                state: self.state.name(),
            });
        }

        let (stored, query): (Vec<&'a Record>, Vec<&'a Record>) = match &self.blocking {
            Some((stored_filter, query_filter)) => {
                let (stored, stored_report) = stored_filter.filter_with_report(stored);
                let (query, query_report) = query_filter.filter_with_report(query);
                self.filter_reports = Some((stored_report, query_report));
                (stored, query)
            }
            None => (stored.into_iter().collect(), query.into_iter().collect()),
        };

        if stored.is_empty() {
            return Err(Error::EmptyInput);
        }

        let projections = stored
            .iter()
            .map(|&r| self.measure.project(r, Side::Stored))
            .collect::<Result<Vec<_>>>()?;
        let queries = query
            .iter()
            .map(|&r| self.measure.project(r, Side::Query).map(|p| (r, p)))
            .collect::<Result<Vec<_>>>()?;

        let index = ReferencePointIndex::build(projections, self.measure.clone(), &self.index_config)?;

        debug!(
            stored = stored.len(),
            queries = queries.len(),
            symmetric = self.is_symmetric(),
            "records added"
        );
        self.stored = stored;
        self.queries = queries;
        self.index = Some(index);
        self.state = LinkerState::RecordsAdded;
        Ok(())
    }

    fn start_linking(&mut self, operation: &'static str) -> Result<Arc<str>> {
        match self.state {
            LinkerState::RecordsAdded | LinkerState::Linking => {
                if self.state == LinkerState::RecordsAdded {
                    debug!(threshold = self.threshold, "linking started");
                }
                self.state = LinkerState::Linking;
                Ok(Arc::from(format!("threshold match at {}", self.threshold)))
            }
            state => Err(Error::InvalidState {
                operation,
                state: state.name(),
            }),
        }
    }

    fn links_for(
        &self,
        index: &PivotIndex<'a>,
        query: &(&'a Record, Projection<'a>),
        provenance: &Arc<str>,
    ) -> (Vec<Link<'a>>, QueryStats) {
        let &(record, ref projection) = query;
        let symmetric = self.is_symmetric();
        let (neighbours, stats) = index.range_query_with_stats(projection, self.threshold);

        let links = neighbours
            .into_iter()
            .filter_map(|n| {
                let stored = self.stored[n.index];
                if symmetric && stored.id() == record.id() {
                    return None;
                }
                if !self.viability.is_viable(stored, record) {
                    return None;
                }
                Some(Link::new(
                    stored,
                    self.stored_role.clone(),
                    record,
                    self.query_role.clone(),
                    n.distance,
                    Arc::clone(provenance),
                ))
            })
            .collect();
        (links, stats)
    }

    /// Lazily link query records one at a time, in query order.
    pub fn links(&mut self) -> Result<impl Iterator<Item = Link<'a>> + '_> {
        let provenance = self.start_linking("link")?;
        let this: &Self = self;
        let index = this.index.as_ref().ok_or(Error::InvalidState {
            operation: "link",
            state: LinkerState::Terminated.name(),
        })?;
        Ok(this
            .queries
            .iter()
            .flat_map(move |q| this.links_for(index, q, &provenance).0))
    }

    /// Link every query record, in parallel when enabled. Output is in query order.
    pub fn collect_links(&mut self) -> Result<Vec<Link<'a>>> {
        let provenance = self.start_linking("collect links")?;
        let index = self.index.as_ref().ok_or(Error::InvalidState {
            operation: "collect links",
            state: LinkerState::Terminated.name(),
        })?;

        #[cfg(feature = "parallel")]
        let per_query: Vec<(Vec<Link<'a>>, QueryStats)> = self
            .queries
            .par_iter()
            .map(|q| self.links_for(index, q, &provenance))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let per_query: Vec<(Vec<Link<'a>>, QueryStats)> = self
            .queries
            .iter()
            .map(|q| self.links_for(index, q, &provenance))
            .collect();

        let mut stats = QueryStats::default();
        let mut links = Vec::new();
        for (query_links, query_stats) in per_query {
            stats.merge(&query_stats);
            links.extend(query_links);
        }

        debug!(
            distance_computations = stats.distance_computations,
            distances_pruned = stats.distances_pruned,
            "range queries finished"
        );
        info!(links = links.len(), threshold = self.threshold, "linkage complete");
        Ok(links)
    }

    /// Release the index and record references. Idempotent.
    pub fn terminate(&mut self) {
        if self.state != LinkerState::Terminated {
            debug!(from = %self.state, "linker terminated");
        }
        self.index = None;
        self.queries = Vec::new();
        self.stored = Vec::new();
        self.state = LinkerState::Terminated;
    }
}
