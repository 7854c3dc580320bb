//! run-adaptation — Binary Entrypoint
//! Runs one weight-adaptation cycle per selected reader for a given date.
//!
//! Usage:
//!   run-adaptation --date=YYYY-MM-DD [--reader=<id> | --all-readers] [--force]
//!
//! Exit code 0 on any terminal cycle state (rejection is a successful
//! outcome); non-zero only on unhandled errors.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use daily_brief_ranker::report::render_cycle_report;
use daily_brief_ranker::store::SnapshotStore;
use daily_brief_ranker::{run_cycle, ConfigRegistry, FixtureEvals, MemoryStore, RankConfig};

const ENV_DATA_PATH: &str = "RANKER_DATA_PATH";
const DEFAULT_DATA_PATH: &str = "data/demo.json";
const ARTIFACTS_DIR: &str = "artifacts";

#[derive(Debug)]
struct Args {
    date: NaiveDate,
    reader: Option<String>,
    all_readers: bool,
    force: bool,
}

fn usage() -> ! {
    eprintln!(
        "usage: run-adaptation --date=YYYY-MM-DD [--reader=<id> | --all-readers] [--force]"
    );
    std::process::exit(2);
}

fn parse_args(argv: &[String]) -> Result<Args> {
    let mut date = None;
    let mut reader = None;
    let mut all_readers = false;
    let mut force = false;

    let mut iter = argv.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline_value) = match arg.split_once('=') {
            Some((f, v)) => (f, Some(v.to_string())),
            None => (arg.as_str(), None),
        };
        // `--flag value` is accepted alongside `--flag=value`.
        let mut take_value = || -> Result<String> {
            if let Some(v) = inline_value.clone() {
                return Ok(v);
            }
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} requires a value"))
        };

        match flag {
            "--date" => {
                let raw = take_value()?;
                date = Some(
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid --date `{raw}`, expected YYYY-MM-DD"))?,
                );
            }
            "--reader" => reader = Some(take_value()?),
            "--all-readers" => all_readers = true,
            "--force" => force = true,
            "--help" | "-h" => usage(),
            other => bail!("unknown argument `{other}`"),
        }
    }

    let date = date.context("--date is required")?;
    if reader.is_some() && all_readers {
        bail!("--reader and --all-readers are mutually exclusive");
    }
    if reader.is_none() && !all_readers {
        bail!("one of --reader or --all-readers is required");
    }
    Ok(Args {
        date,
        reader,
        all_readers,
        force,
    })
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("run-adaptation: {e}");
            usage();
        }
    };

    // Live config: validated on load, never silently clamped.
    let cfg = RankConfig::load_default().context("loading rank config")?;
    let registry = ConfigRegistry::new(cfg);

    // Demo-mode store seeded from a JSON fixture; a real deployment plugs a
    // database behind the same traits.
    let data_path = std::env::var(ENV_DATA_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));
    let store = if data_path.exists() {
        MemoryStore::from_json_file(&data_path)
            .with_context(|| format!("seeding store from {}", data_path.display()))?
    } else {
        tracing::warn!(path = %data_path.display(), "no data fixture found; starting empty");
        MemoryStore::new()
    };

    let readers = if args.all_readers {
        store.readers()
    } else {
        vec![args.reader.clone().expect("reader checked in parse_args")]
    };
    if readers.is_empty() {
        tracing::info!("no readers with feedback; nothing to do");
        return Ok(());
    }

    let evals = FixtureEvals;
    for reader in &readers {
        // Idempotent overwrite stays available behind --force; without it an
        // already-recorded cycle is reported and skipped.
        if !args.force {
            if let Some(existing) = store.get(reader, args.date)? {
                tracing::info!(
                    reader = %reader,
                    date = %args.date,
                    applied = existing.applied,
                    "snapshot already exists; skipping (use --force to re-run)"
                );
                continue;
            }
        }

        let report = run_cycle(reader, args.date, &store, &store, &evals, &registry)
            .with_context(|| format!("adaptation cycle for reader {reader}"))?;

        std::fs::create_dir_all(ARTIFACTS_DIR).context("creating artifacts dir")?;
        let artifact = PathBuf::from(ARTIFACTS_DIR)
            .join(format!("weight_update_{}_{}.md", args.date, reader));
        std::fs::write(&artifact, render_cycle_report(&report))
            .with_context(|| format!("writing {}", artifact.display()))?;

        println!(
            "[WEIGHTS] reader={} date={} outcome={} artifact={}",
            reader,
            args.date,
            report.outcome.as_str(),
            artifact.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_inline_and_separate_values() {
        let a = parse_args(&argv(&["--date=2026-01-28", "--reader", "r1", "--force"])).unwrap();
        assert_eq!(a.date, NaiveDate::from_ymd_opt(2026, 1, 28).unwrap());
        assert_eq!(a.reader.as_deref(), Some("r1"));
        assert!(a.force);
        assert!(!a.all_readers);
    }

    #[test]
    fn requires_date_and_reader_selection() {
        assert!(parse_args(&argv(&["--reader=r1"])).is_err());
        assert!(parse_args(&argv(&["--date=2026-01-28"])).is_err());
        assert!(
            parse_args(&argv(&["--date=2026-01-28", "--reader=r1", "--all-readers"])).is_err()
        );
    }

    #[test]
    fn rejects_malformed_date_and_unknown_flags() {
        assert!(parse_args(&argv(&["--date=01/28/2026", "--all-readers"])).is_err());
        assert!(parse_args(&argv(&["--date=2026-01-28", "--all-readers", "--verbose"])).is_err());
    }
}
