#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use proptest::prelude::*;
    use rand::prelude::*;
    use rand::Rng;

    use crate::index::{IndexConfig, LinearScan, PruningPolicy, RangeSearch, ReferencePointIndex};
    use crate::linker::{AlwaysViable, MaxYearGap, ThresholdLinker, YearSource};
    use crate::measure::{
        check_triangle_inequality, BoundedLevenshtein, CompositeMeasure, JaroWinkler,
        LinkageFieldSet, Side,
    };
    use crate::metrics::evaluate;
    use crate::record::{birth, marriage, Record, RecordId, RecordKind, Role};
    use crate::repository::{load_records, InMemoryRepository};
    use crate::truth::{GroundTruth, TrueMatchRule};
    use crate::{LinkageRunner, LinkageTask, Result};

    const FORENAMES: [&str; 8] = ["john", "jon", "james", "jane", "janet", "mary", "marie", "ann"];
    const SURNAMES: [&str; 6] = ["moir", "muir", "grant", "gray", "reid", "reed"];

    fn random_births(rng: &mut StdRng, n: usize) -> Vec<Record> {
        (0..n as u64)
            .map(|id| {
                let family = rng.random_range(0..n as u64 / 3 + 1);
                Record::new(RecordId(id), RecordKind::Birth)
                    .with_field(birth::ORIGINAL_ID, format!("b{id}"))
                    .with_field(birth::FATHER_FORENAME, FORENAMES[rng.random_range(0..FORENAMES.len())])
                    .with_field(birth::FATHER_SURNAME, SURNAMES[rng.random_range(0..SURNAMES.len())])
                    .with_field(birth::MOTHER_FORENAME, FORENAMES[rng.random_range(0..FORENAMES.len())])
                    .with_field(birth::FATHER_IDENTITY, format!("F{family}"))
                    .with_field(birth::MOTHER_IDENTITY, format!("M{family}"))
            })
            .collect()
    }

    fn parent_fields() -> LinkageFieldSet {
        LinkageFieldSet::new(
            RecordKind::Birth,
            [birth::FATHER_FORENAME, birth::FATHER_SURNAME, birth::MOTHER_FORENAME],
        )
        .unwrap()
    }

    #[test]
    fn test_three_siblings_scenario() -> Result<()> {
        let records: Vec<Record> = (1..=3)
            .map(|id| {
                Record::new(RecordId(id), RecordKind::Birth)
                    .with_field(birth::ORIGINAL_ID, format!("b{id}"))
                    .with_field(birth::FATHER_FORENAME, "james")
                    .with_field(birth::FATHER_SURNAME, "moir")
                    .with_field(birth::MOTHER_FORENAME, "mary")
                    .with_field(birth::FATHER_IDENTITY, "F1")
                    .with_field(birth::MOTHER_IDENTITY, "M1")
            })
            .collect();
        let refs: Vec<&Record> = records.iter().collect();

        let gt = GroundTruth::siblings_for(&Role::baby(), &Role::baby()).unwrap();
        assert_eq!(gt.count(&refs, &refs), 3);

        let measure = CompositeMeasure::symmetric(parent_fields(), Arc::new(BoundedLevenshtein::default()));
        let mut linker = ThresholdLinker::new(measure, 1.0, AlwaysViable)?
            .with_roles(Role::baby(), Role::baby())?;
        linker.add_records(&records, &records)?;
        let links = linker.collect_links()?;
        linker.terminate();
        assert_eq!(links.len(), 6);

        let undirected: BTreeSet<String> = links.iter().map(|l| l.pair_key()).collect();
        assert_eq!(undirected.len(), 3);

        let rule = TrueMatchRule::siblings_for(&Role::baby(), &Role::baby()).unwrap();
        let quality = evaluate(&links, &rule, gt.count(&refs, &refs), true);
        assert_eq!((quality.tp, quality.fp, quality.fn_), (3, 0, 0));
        assert_eq!(quality.precision(), 1.0);
        assert_eq!(quality.recall(), 1.0);
        assert_eq!(quality.f_measure(), 1.0);
        Ok(())
    }

    #[test]
    fn test_repository_to_quality() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(11);
        let repo = InMemoryRepository::new(random_births(&mut rng, 60));
        let births = load_records(&repo, RecordKind::Birth)?;

        let fields = [birth::FATHER_FORENAME, birth::FATHER_SURNAME, birth::MOTHER_FORENAME];
        let task = LinkageTask::new("birth-birth sibling", Role::baby(), Role::baby())
            .with_link_type("sibling")
            .with_fields(fields, fields)
            .with_threshold(0.2)
            .with_index_config(IndexConfig::new(6).with_seed(3))
            .with_true_match(TrueMatchRule::siblings_for(&Role::baby(), &Role::baby()).unwrap())
            .with_ground_truth(GroundTruth::siblings_for(&Role::baby(), &Role::baby()).unwrap());
        let runner = LinkageRunner::new(task, AlwaysViable)?;
        let outcome = runner.run(&births, &births)?;
        let quality = outcome.quality.unwrap();

        assert_eq!(outcome.links.len() % 2, 0);
        assert!(outcome.links.iter().all(|l| l.distance() <= 0.2));
        assert_eq!(quality.tp + quality.fn_, outcome.ground_truth_count.unwrap());
        assert!((0.0..=1.0).contains(&quality.precision()));
        Ok(())
    }

    #[test]
    fn test_index_matches_linear_scan_on_random_records() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(5);
        let stored = random_births(&mut rng, 80);
        let queries = random_births(&mut rng, 20);
        let measure = CompositeMeasure::symmetric(parent_fields(), Arc::new(BoundedLevenshtein::new(3)?));
        assert!(measure.is_true_metric());

        let projections = stored
            .iter()
            .map(|r| measure.project(r, Side::Stored))
            .collect::<Result<Vec<_>>>()?;
        let index = ReferencePointIndex::build(projections.clone(), measure.clone(), &IndexConfig::new(8))?;
        let scan = LinearScan::new(projections, measure.clone());

        for q in &queries {
            let q = measure.project(q, Side::Query)?;
            for threshold in [0.0, 0.2, 0.4] {
                assert_eq!(index.range_query(&q, threshold), scan.range_query(&q, threshold));
            }
        }
        Ok(())
    }

    #[test]
    fn test_metric_check_backs_declaration() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(9);
        let records = random_births(&mut rng, 40);

        let metric = CompositeMeasure::symmetric(parent_fields(), Arc::new(BoundedLevenshtein::default()));
        let items = records
            .iter()
            .map(|r| metric.project(r, Side::Stored))
            .collect::<Result<Vec<_>>>()?;
        assert!(check_triangle_inequality(&metric, &items, 2000, 1).is_consistent());

        let heuristic = CompositeMeasure::symmetric(parent_fields(), Arc::new(JaroWinkler));
        assert!(!heuristic.is_true_metric());
        let index = ReferencePointIndex::build(
            items.clone(),
            heuristic.clone(),
            &IndexConfig::new(4).with_pruning(PruningPolicy::RequireMetric),
        )?;
        assert!(!index.prunes());
        Ok(())
    }

    #[test]
    fn test_baby_groom_sibling_task() -> Result<()> {
        let baby = |id: u64, father: &str, year: &str| {
            Record::new(RecordId(id), RecordKind::Birth)
                .with_field(birth::ORIGINAL_ID, format!("b{id}"))
                .with_field(birth::FATHER_FORENAME, "james")
                .with_field(birth::MOTHER_FORENAME, "mary")
                .with_field(birth::BIRTH_YEAR, year)
                .with_field(birth::FATHER_IDENTITY, father)
                .with_field(birth::MOTHER_IDENTITY, "M1")
        };
        let groom = |id: u64, father: &str, age: &str| {
            Record::new(RecordId(id), RecordKind::Marriage)
                .with_field(marriage::ORIGINAL_ID, format!("m{id}"))
                .with_field(marriage::GROOM_FATHER_FORENAME, "james")
                .with_field(marriage::GROOM_MOTHER_FORENAME, "mary")
                .with_field(marriage::GROOM_AGE_OR_DATE_OF_BIRTH, age)
                .with_field(marriage::MARRIAGE_YEAR, "1890")
                .with_field(marriage::GROOM_FATHER_IDENTITY, father)
                .with_field(marriage::GROOM_MOTHER_IDENTITY, "M1")
        };
        let babies = vec![baby(1, "F1", "1862"), baby(2, "F1", "1864"), baby(3, "F9", "1863")];
        let grooms = vec![groom(10, "F1", "25"), groom(11, "F1", "70")];

        let viability = MaxYearGap::new(
            birth::BIRTH_YEAR,
            YearSource::BirthYearFromAge {
                age_or_date: marriage::GROOM_AGE_OR_DATE_OF_BIRTH,
                event_year: marriage::MARRIAGE_YEAR,
            },
            40,
        );
        let task = LinkageTask::new("baby-groom sibling", Role::baby(), Role::groom())
            .with_fields(
                [birth::FATHER_FORENAME, birth::MOTHER_FORENAME],
                [marriage::GROOM_FATHER_FORENAME, marriage::GROOM_MOTHER_FORENAME],
            )
            .with_threshold(0.1)
            .with_true_match(TrueMatchRule::siblings_for(&Role::baby(), &Role::groom()).unwrap())
            .with_ground_truth(GroundTruth::siblings_for(&Role::baby(), &Role::groom()).unwrap());
        assert!(!task.is_symmetric());

        let outcome = LinkageRunner::new(task, viability)?.run(&babies, &grooms)?;
        // The 70-year-old groom was born in 1820, too early to be a sibling.
        assert_eq!(outcome.links.len(), 3);
        assert!(outcome.links.iter().all(|l| l.record2().id() == RecordId(10)));
        assert_eq!(outcome.ground_truth_count, Some(4));

        let quality = outcome.quality.unwrap();
        assert_eq!((quality.tp, quality.fp, quality.fn_), (2, 1, 2));
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_linker_matches_brute_force(seed in any::<u64>(), n in 2usize..40, threshold in 0.0f64..0.6) {
            let mut rng = StdRng::seed_from_u64(seed);
            let records = random_births(&mut rng, n);
            let measure = CompositeMeasure::symmetric(parent_fields(), Arc::new(BoundedLevenshtein::default()));

            let mut linker = ThresholdLinker::new(measure.clone(), threshold, AlwaysViable)
                .unwrap()
                .with_index_config(IndexConfig::new(5).with_seed(seed));
            linker.add_records(&records, &records).unwrap();
            let linked: BTreeSet<(u64, u64)> = linker
                .collect_links()
                .unwrap()
                .iter()
                .map(|l| (l.record1().id().0, l.record2().id().0))
                .collect();

            let expected: BTreeSet<(u64, u64)> = records
                .iter()
                .flat_map(|a| records.iter().map(move |b| (a, b)))
                .filter(|(a, b)| a.id() != b.id() && measure.distance(a, b) <= threshold)
                .map(|(a, b)| (a.id().0, b.id().0))
                .collect();
            prop_assert_eq!(linked, expected);
        }
    }
}
