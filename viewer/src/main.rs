mod cli;
mod render;

use std::{path::Path, process::ExitCode};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use encoding_rs::{Encoding, UTF_8};
use mm_hierarchy::RoleClassLib;
use mm_rules::{Dataset, Partition, Record};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{CheckArgs, Cli, Command, FilterArgs, RoleClassArgs};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads a text file, honouring a byte order mark and assuming UTF-8 otherwise.
fn read_text(path: &Path) -> Result<String> {
    let buf = std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    let (decoded, encoding, had_errors) = Encoding::decode(UTF_8, &buf);
    if had_errors {
        warn!(
            path = %path.display(),
            encoding = encoding.name(),
            "replaced malformed byte sequences"
        );
    }
    Ok(decoded.into_owned())
}

fn roleclass(args: RoleClassArgs) -> Result<ExitCode> {
    let source = read_text(&args.input)?;
    let libraries =
        mm_hierarchy::read_roleclass_libs(&source, args.allow_dtd).with_context(|| {
            format!("Could not read RoleClass libraries from {}", args.input.display())
        })?;

    for library in &libraries {
        info!(
            library = %library.name,
            version = library.version.as_deref().unwrap_or("-"),
            role_classes = library.hierarchy.len(),
            "found RoleClassLib"
        );
    }

    let library = select_library(&libraries, args.library.as_deref())?;
    let output = match args.node {
        Some(node) => render::details(&library.hierarchy, &node)?,
        None => render::render(&library.hierarchy, args.format)?,
    };
    print!("{output}");
    Ok(ExitCode::SUCCESS)
}

fn select_library<'l>(
    libraries: &'l [RoleClassLib],
    name: Option<&str>,
) -> Result<&'l RoleClassLib> {
    match name {
        Some(name) => libraries
            .iter()
            .find(|library| library.name == name)
            .ok_or_else(|| {
                let known: Vec<_> = libraries.iter().map(|l| l.name.as_str()).collect();
                anyhow!("there is no RoleClassLib {name:?} (found: {})", known.join(", "))
            }),
        None => match libraries.first() {
            Some(library) => Ok(library),
            None => bail!("the document has no RoleClassLib"),
        },
    }
}

fn records<'r>(records: impl Iterator<Item = &'r Record>) -> Value {
    Value::Array(records.cloned().map(Value::Object).collect())
}

fn partition_json(partition: &Partition<'_>) -> Value {
    json!({
        "matches": records(partition.matches()),
        "non_matches": records(partition.non_matches()),
    })
}

fn filter(args: FilterArgs) -> Result<ExitCode> {
    let dataset = match (args.sample, args.dataset) {
        (Some(id), _) => mm_catalog::sample(id)?.dataset.clone(),
        (None, Some(path)) => Dataset::from_json(&read_text(&path)?)
            .with_context(|| format!("Could not read a dataset from {}", path.display()))?,
        (None, None) => bail!("either --sample or --dataset is required"),
    };
    let partition = mm_rules::evaluate(&dataset, &args.predicate)?;
    println!("{}", serde_json::to_string_pretty(&partition_json(&partition))?);
    Ok(ExitCode::SUCCESS)
}

fn check(args: CheckArgs) -> Result<ExitCode> {
    let sample = mm_catalog::sample(args.sample)?;
    let index = usize::try_from(args.entry - 1)?;
    let reference = sample.entry(index)?.rule;
    let comparison = sample.check_rule(index, &args.predicate)?;

    let pick = |indices: &[usize]| records(indices.iter().map(|&i| &sample.dataset.records()[i]));
    let report = json!({
        "reference": reference,
        "equivalent": comparison.is_equivalent(),
        "missing": pick(&comparison.missing),
        "extra": pick(&comparison.extra),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if comparison.is_equivalent() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Roleclass(args) => roleclass(args),
        Command::Concepts { format } => {
            print!("{}", render::render(mm_catalog::concepts(), format)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Filter(args) => filter(args),
        Command::Check(args) => check(args),
    }
}
