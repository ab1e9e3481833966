use kinlink::linker::MaxYearGap;
use kinlink::record::{birth, Record, RecordId, RecordKind, Role};
use kinlink::{GroundTruth, IndexConfig, InMemoryRepository, LinkageRunner, LinkageTask, TrueMatchRule};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Birth-birth sibling linkage over a small parish register.
    //
    // Run with `RUST_LOG=kinlink=debug` to see index construction and per-run summaries.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let register = [
        // (father forename, father surname, mother forename, mother maiden surname, year, family)
        ("james", "moir", "mary", "grant", "1861", 1),
        ("james", "muir", "mary", "grant", "1863", 1),
        ("jas", "moir", "marie", "grant", "1866", 1),
        ("peter", "reid", "ann", "gray", "1862", 2),
        ("peter", "reed", "ann", "grey", "1865", 2),
        ("john", "moir", "jane", "reid", "1890", 3),
        ("james", "moir", "mary", "grant", "1898", 4),
    ];
    let records: Vec<Record> = register
        .iter()
        .zip(1u64..)
        .map(|(&(ff, fs, mf, ms, year, family), id)| {
            Record::new(RecordId(id), RecordKind::Birth)
                .with_field(birth::ORIGINAL_ID, format!("b{id}"))
                .with_field(birth::FATHER_FORENAME, ff)
                .with_field(birth::FATHER_SURNAME, fs)
                .with_field(birth::MOTHER_FORENAME, mf)
                .with_field(birth::MOTHER_MAIDEN_SURNAME, ms)
                .with_field(birth::BIRTH_YEAR, year)
                .with_field(birth::FATHER_IDENTITY, format!("F{family}"))
                .with_field(birth::MOTHER_IDENTITY, format!("M{family}"))
        })
        .collect();

    let repository = InMemoryRepository::new(records);
    let births = kinlink::load_records(&repository, RecordKind::Birth)?;

    let fields = [
        birth::FATHER_FORENAME,
        birth::FATHER_SURNAME,
        birth::MOTHER_FORENAME,
        birth::MOTHER_MAIDEN_SURNAME,
    ];
    let task = LinkageTask::new("birth-birth sibling", Role::baby(), Role::baby())
        .with_link_type("sibling")
        .with_fields(fields, fields)
        .with_threshold(0.3)
        .with_blocking(3)
        .with_index_config(IndexConfig::new(4).with_seed(7))
        .with_true_match(TrueMatchRule::siblings_for(&Role::baby(), &Role::baby()).ok_or("no sibling rule")?)
        .with_ground_truth(GroundTruth::siblings_for(&Role::baby(), &Role::baby()).ok_or("no sibling truth")?);

    // Siblings are rarely born more than 25 years apart.
    let viability = MaxYearGap::new(birth::BIRTH_YEAR, birth::BIRTH_YEAR, 25);
    let runner = LinkageRunner::new(task, viability)?;

    let outcome = runner.run(&births, &births)?;
    for link in &outcome.links {
        println!("{link}");
    }
    if let Some(quality) = outcome.quality {
        println!("{quality}");
    }

    println!("threshold sweep:");
    for point in runner.sweep_thresholds(&births, &births, &[0.05, 0.1, 0.2, 0.3, 0.4])? {
        println!(
            "  {:.2}  precision {:.3}  recall {:.3}  f1 {:.3}",
            point.threshold,
            point.quality.precision(),
            point.quality.recall(),
            point.quality.f_measure()
        );
    }

    Ok(())
}
