use sierra::script::ScriptUtil;
use sierra::{CsvSink, Reclassifier, SierraResult, WorkList};

const DEFAULT_AUDIT_LOG: &str = "lpa-reclass-log.csv";
const DEFAULT_ERROR_LOG: &str = "lpa-reclass-errors.csv";

const HELP_TEXT: &str = r#"
Apply LCC call numbers to LPA reference items and their bib records.

    --worklist <file>
        CSV work list.  One header row, then rows of
        <unused>,<bib number, e.g. b12345678a>,<special cutter>,<LCC>

    --audit-log <file>
        Audit CSV, one row per bib.  Appended to.
        Defaults to lpa-reclass-log.csv

    --error-log <file>
        CSV of bibId,itemId for items which could not be updated.
        Defaults to lpa-reclass-errors.csv

    --dry-run
        Read bibs and items and log the changes which would be made,
        but do not update anything.
"#;

fn main() -> SierraResult<()> {
    let mut ops = getopts::Options::new();

    ops.optopt("", "worklist", "", "");
    ops.optopt("", "audit-log", "", "");
    ops.optopt("", "error-log", "", "");
    ops.optflag("", "dry-run", "");

    let scripter = match ScriptUtil::init(&mut ops, Some(HELP_TEXT))? {
        Some(s) => s,
        None => return Ok(()), // e.g. --help
    };

    let params = scripter.params();

    let worklist = params
        .opt_str("worklist")
        .ok_or("--worklist file required")?;

    let audit_log = params
        .opt_str("audit-log")
        .unwrap_or(DEFAULT_AUDIT_LOG.to_string());

    let error_log = params
        .opt_str("error-log")
        .unwrap_or(DEFAULT_ERROR_LOG.to_string());

    let dry_run = params.opt_present("dry-run");

    // Open the local files before talking to Sierra.
    let worklist = WorkList::open(&worklist)?;
    let sink = CsvSink::new(&audit_log, &error_log)?;

    let client = scripter.connect()?;

    let mut reclassifier = Reclassifier::new(client, sink);
    reclassifier.set_dry_run(dry_run);

    log::info!(
        "Starting LPA reclass of {:?} dry_run={} audit={:?} errors={:?}",
        worklist.path(),
        reclassifier.dry_run(),
        reclassifier.sink().audit_path(),
        reclassifier.sink().error_path(),
    );

    let summary = reclassifier.run(worklist)?;

    println!("{summary}");

    Ok(())
}
