//! Running a linkage task end to end.
//!
//! ```text
//! records --blocking--> filtered --index + range queries + viability--> links --evaluate--> quality
//!            \                                                                          ^
//!             `----------------------------- ground truth count -----------------------'
//! ```

use tracing::info;

use crate::error::{Error, Result};
use crate::linker::{Link, ThresholdLinker, Viability};
use crate::metrics::{evaluate, LinkageQuality};
use crate::record::Record;
use crate::task::LinkageTask;

/// Links and scores from one run.
#[derive(Debug, Clone)]
pub struct LinkageOutcome<'a> {
    /// Accepted links, in query order.
    pub links: Vec<Link<'a>>,
    /// Scores, when the task defines a true-match rule.
    pub quality: Option<LinkageQuality>,
    /// Ground-truth links among the records that survived blocking.
    pub ground_truth_count: Option<usize>,
}

/// Scores at one threshold of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdQuality {
    /// Threshold evaluated.
    pub threshold: f64,
    /// Scores at that threshold.
    pub quality: LinkageQuality,
}

/// Links gathered before scoring.
struct Prepared<'a> {
    links: Vec<Link<'a>>,
    ground_truth_count: Option<usize>,
    links_lost_on_prefilter: usize,
}

/// Runs a [`LinkageTask`] with a viability predicate.
#[derive(Debug)]
pub struct LinkageRunner<V> {
    task: LinkageTask,
    viability: V,
}

impl<V: Viability> LinkageRunner<V> {
    /// Validate `task` and pair it with a predicate.
    pub fn new(task: LinkageTask, viability: V) -> Result<Self> {
        task.validate()?;
        Ok(Self { task, viability })
    }

    /// The task being run.
    pub fn task(&self) -> &LinkageTask {
        &self.task
    }

    /// Link `stored` against `query` at the task threshold and score the result.
    ///
    /// For a symmetric task pass the same slice twice.
    pub fn run<'a>(&self, stored: &'a [Record], query: &'a [Record]) -> Result<LinkageOutcome<'a>> {
        let prepared = self.prepare(stored, query, self.task.threshold())?;
        let quality = self.task.true_match().map(|rule| {
            evaluate(
                &prepared.links,
                rule,
                prepared.ground_truth_count.unwrap_or(0),
                self.task.is_symmetric(),
            )
            .with_links_lost_on_prefilter(prepared.links_lost_on_prefilter)
        });
        if let Some(quality) = &quality {
            info!(task = self.task.name(), %quality, "linkage run scored");
        }
        Ok(LinkageOutcome {
            links: prepared.links,
            quality,
            ground_truth_count: prepared.ground_truth_count,
        })
    }

    /// Score several thresholds from a single linkage pass.
    ///
    /// Links once at the largest threshold, then evaluates each threshold on the links
    /// within it. Results follow the order of `thresholds`.
    pub fn sweep_thresholds(
        &self,
        stored: &[Record],
        query: &[Record],
        thresholds: &[f64],
    ) -> Result<Vec<ThresholdQuality>> {
        let Some(rule) = self.task.true_match() else {
            return Err(Error::InvalidParameter {
                name: "true_match",
                message: "a threshold sweep needs a true-match rule",
            });
        };
        let Some(max) = thresholds.iter().copied().reduce(f64::max) else {
            return Ok(Vec::new());
        };

        let prepared = self.prepare(stored, query, max)?;
        let ground_truth_count = prepared.ground_truth_count.unwrap_or(0);

        let sweep = thresholds
            .iter()
            .map(|&threshold| {
                let within: Vec<Link<'_>> = prepared
                    .links
                    .iter()
                    .filter(|l| l.distance() <= threshold)
                    .cloned()
                    .collect();
                let quality = evaluate(&within, rule, ground_truth_count, self.task.is_symmetric())
                    .with_links_lost_on_prefilter(prepared.links_lost_on_prefilter);
                ThresholdQuality { threshold, quality }
            })
            .collect();
        Ok(sweep)
    }

    fn prepare<'a>(&self, stored: &'a [Record], query: &'a [Record], threshold: f64) -> Result<Prepared<'a>> {
        let all_stored: Vec<&'a Record> = stored.iter().collect();
        let all_query: Vec<&'a Record> = query.iter().collect();

        let (kept_stored, kept_query) = match self.task.blocking_filters()? {
            Some((stored_filter, query_filter)) => {
                (stored_filter.filter(stored), query_filter.filter(query))
            }
            None => (all_stored.clone(), all_query.clone()),
        };

        let (ground_truth_count, links_lost_on_prefilter) = match self.task.ground_truth() {
            Some(gt) => {
                let after = gt.count(&kept_stored, &kept_query);
                let before = if kept_stored.len() == all_stored.len() && kept_query.len() == all_query.len() {
                    after
                } else {
                    gt.count(&all_stored, &all_query)
                };
                (Some(after), before.saturating_sub(after))
            }
            None => (None, 0),
        };

        let viability = |a: &Record, b: &Record| self.viability.is_viable(a, b);
        let mut linker = ThresholdLinker::new(self.task.measure()?, threshold, viability)?
            .with_roles(self.task.stored_role().clone(), self.task.query_role().clone())?
            .with_index_config(self.task.index_config().clone());
        linker.add_records(kept_stored, kept_query)?;
        let links = linker.collect_links();
        linker.terminate();

        Ok(Prepared {
            links: links?,
            ground_truth_count,
            links_lost_on_prefilter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::{AlwaysViable, MaxYearGap};
    use crate::record::{birth, RecordId, RecordKind, Role};
    use crate::truth::{GroundTruth, TrueMatchRule};

    fn baby(id: u64, father: &str, mother: &str, names: [&str; 2], year: &str) -> Record {
        Record::new(RecordId(id), RecordKind::Birth)
            .with_field(birth::ORIGINAL_ID, format!("b{id}"))
            .with_field(birth::FATHER_FORENAME, names[0])
            .with_field(birth::MOTHER_FORENAME, names[1])
            .with_field(birth::BIRTH_YEAR, year)
            .with_field(birth::FATHER_IDENTITY, father)
            .with_field(birth::MOTHER_IDENTITY, mother)
    }

    fn task() -> LinkageTask {
        let fields = [birth::FATHER_FORENAME, birth::MOTHER_FORENAME];
        LinkageTask::new("sibling", Role::baby(), Role::baby())
            .with_fields(fields, fields)
            .with_threshold(0.3)
            .with_true_match(TrueMatchRule::siblings_for(&Role::baby(), &Role::baby()).unwrap())
            .with_ground_truth(GroundTruth::siblings_for(&Role::baby(), &Role::baby()).unwrap())
    }

    fn records() -> Vec<Record> {
        vec![
            baby(1, "F1", "M1", ["james", "mary"], "1860"),
            baby(2, "F1", "M1", ["james", "mary"], "1863"),
            baby(3, "F2", "M2", ["james", "mary"], "1861"),
            baby(4, "F3", "M3", ["peter", "ann"], "1870"),
            baby(5, "F3", "M3", ["", "ann"], "1872"),
        ]
    }

    #[test]
    fn test_run_scores_links() {
        let records = records();
        let runner = LinkageRunner::new(task(), AlwaysViable).unwrap();
        let outcome = runner.run(&records, &records).unwrap();

        assert_eq!(outcome.ground_truth_count, Some(2));
        assert_eq!(outcome.links.len(), 6);
        let quality = outcome.quality.unwrap();
        assert_eq!(quality.tp, 1);
        assert_eq!(quality.fp, 2);
        assert_eq!(quality.fn_, 1);
    }

    #[test]
    fn test_one_parent_families_do_not_cost_recall() {
        let records = vec![
            baby(1, "F1", "", ["james", "mary"], "1860"),
            baby(2, "F1", "", ["james", "mary"], "1862"),
            baby(3, "F2", "M2", ["peter", "ann"], "1870"),
            baby(4, "F2", "M2", ["peter", "ann"], "1873"),
        ];
        let runner = LinkageRunner::new(task(), AlwaysViable).unwrap();
        let outcome = runner.run(&records, &records).unwrap();

        assert_eq!(outcome.links.len(), 4);
        assert_eq!(outcome.ground_truth_count, Some(1));
        let quality = outcome.quality.unwrap();
        assert_eq!((quality.tp, quality.fp, quality.fn_), (1, 0, 0));
        assert_eq!(quality.unknown, 1);
        assert_eq!(quality.recall(), 1.0);
        assert_eq!(quality.precision(), 1.0);
    }

    #[test]
    fn test_blocking_counts_lost_links() {
        let records = records();
        let runner = LinkageRunner::new(task().with_blocking(2), AlwaysViable).unwrap();
        let outcome = runner.run(&records, &records).unwrap();
        let quality = outcome.quality.unwrap();
        assert_eq!(outcome.ground_truth_count, Some(1));
        assert_eq!(quality.links_lost_on_prefilter, 1);
    }

    #[test]
    fn test_viability_in_run() {
        let records = records();
        let runner = LinkageRunner::new(
            task(),
            MaxYearGap::new(birth::BIRTH_YEAR, birth::BIRTH_YEAR, 2),
        )
        .unwrap();
        let outcome = runner.run(&records, &records).unwrap();
        // 1-2 are three years apart; 1-3 and 2-3 survive.
        assert_eq!(outcome.links.len(), 4);
        let quality = outcome.quality.unwrap();
        assert_eq!(quality.tp, 0);
        assert_eq!(quality.fp, 2);
    }

    #[test]
    fn test_sweep_thresholds() {
        let records = records();
        let runner = LinkageRunner::new(task(), AlwaysViable).unwrap();
        let sweep = runner
            .sweep_thresholds(&records, &records, &[0.0, 0.6, 0.1])
            .unwrap();
        assert_eq!(sweep.len(), 3);
        assert_eq!(sweep[0].threshold, 0.0);
        assert_eq!(sweep[0].quality.tp, 1);
        assert_eq!(sweep[0].quality.fp, 2);
        assert_eq!(sweep[1].quality.tp, 2);
        assert_eq!(sweep[1].quality.fn_, 0);
        assert_eq!(sweep[2].quality, sweep[0].quality);
        assert!(runner.sweep_thresholds(&records, &records, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_sweep_needs_rule() {
        let records = records();
        let fields = [birth::FATHER_FORENAME];
        let task = LinkageTask::new("plain", Role::baby(), Role::baby()).with_fields(fields, fields);
        let runner = LinkageRunner::new(task, AlwaysViable).unwrap();
        assert!(runner.sweep_thresholds(&records, &records, &[0.1]).is_err());
        assert!(runner.run(&records, &records).unwrap().quality.is_none());
    }

    #[test]
    fn test_invalid_task_rejected() {
        let task = task().with_fields([birth::FORENAME], [birth::FORENAME, birth::SURNAME]);
        assert!(LinkageRunner::new(task, AlwaysViable).is_err());
    }
}
