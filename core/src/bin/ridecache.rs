use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;

use ridecache_core::cli::print_cache_report;
use ridecache_core::config::load_config;
use ridecache_core::csv_source::{entry_for, CsvLibrary};
use ridecache_core::{metrics, CacheContext, RideCache, RideCatalog};

const USAGE: &str = "usage:
  ridecache [--config FILE] [--json] <YYYY_MM_DD_hh_mm_ss.csv>
  ridecache [--config FILE] [--json] --aggregate <dir> <from> <to>
  ridecache [--config FILE] --prescan <dir> <from> <to>";

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("bad date '{s}', expected YYYY-MM-DD"))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut config_path: Option<PathBuf> = None;
    let mut json = false;
    let mut show_metrics = false;
    let mut positional = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let file = args.next().ok_or_else(|| anyhow!("--config needs a file"))?;
                config_path = Some(file.into());
            }
            "--json" => json = true,
            "--metrics" => show_metrics = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ => positional.push(arg),
        }
    }

    let config = match &config_path {
        Some(p) => load_config(p)?,
        None => Default::default(),
    };
    let ctx = CacheContext::new(config);

    match positional.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["--aggregate", dir, from, to] => {
            let lib = CsvLibrary::new(dir);
            let cache = RideCache::aggregate(&lib, parse_date(from)?, parse_date(to)?, &ctx)?;
            emit(&cache, json)?;
        }
        ["--prescan", dir, from, to] => {
            let lib = CsvLibrary::new(dir);
            for entry in lib.rides_between(parse_date(from)?, parse_date(to)?)? {
                let status = RideCache::refresh_if_stale(&entry, &lib, &ctx)
                    .with_context(|| format!("refreshing {}", entry.path.display()))?;
                println!("{:?}\t{}", status, entry.path.display());
            }
        }
        [file] => {
            let path = PathBuf::from(file);
            let entry = entry_for(&path)
                .ok_or_else(|| anyhow!("{} is not named YYYY_MM_DD_hh_mm_ss.csv", path.display()))?;
            let lib = CsvLibrary::new(path.parent().map(PathBuf::from).unwrap_or_default());
            let cache = RideCache::open(&entry, &lib, &ctx)?;
            emit(&cache, json)?;
        }
        _ => bail!("{USAGE}"),
    }

    if show_metrics {
        print!("{}", metrics::gather_text());
    }
    Ok(())
}

fn emit(cache: &RideCache, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&cache.to_json())?);
    } else {
        print_cache_report(cache);
    }
    Ok(())
}
