// src/bin/report_reference_stores.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use unimatch_lib::storage::{summarize, JsonlStore, ReferenceStores};
use unimatch_lib::utils::config::StorePaths;
use unimatch_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Summarise the university reference stores", long_about = None)]
struct ReportArgs {
    /// How many of the most-failed names to list
    #[arg(long, default_value_t = 20)]
    top: usize,

    /// Also list profiles no mapping points at
    #[arg(long)]
    show_unreferenced: bool,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();

    let args = ReportArgs::parse();
    let paths = StorePaths::from_env();
    info!("Reading reference stores from {}", paths.reference_data_dir.display());

    let frequencies = JsonlStore::<u64>::new(&paths.frequency_file).load();
    let data = ReferenceStores::from_paths(&paths).load();
    let report = summarize(&data, args.top);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
        return Ok(());
    }

    let unresolved = frequencies
        .keys()
        .filter(|name| !data.map.contains_key(name))
        .count();

    println!("=== Reference Store Report ===");
    println!("Raw names (frequency table): {}", frequencies.len());
    println!("  not yet mapped:            {}", unresolved);
    println!("Mappings:                    {}", report.mappings);
    println!("  skipped:                   {}", report.skipped_mappings);
    println!("  distinct canonical names:  {}", report.distinct_canonicals);
    println!("Canonical profiles:          {}", report.profiles);
    println!("  unreferenced:              {}", report.unreferenced_profiles.len());
    println!("  missing for a mapping:     {}", report.dangling_canonicals.len());
    println!("Failed names:                {}", report.failed_names);

    if args.show_unreferenced && !report.unreferenced_profiles.is_empty() {
        println!("\n=== Unreferenced Profiles ===");
        for name in &report.unreferenced_profiles {
            println!("  {}", name);
        }
    }

    if !report.dangling_canonicals.is_empty() {
        println!("\n=== Mapped Names Without Profile ===");
        for name in &report.dangling_canonicals {
            println!("  {}", name);
        }
    }

    if !report.top_failures.is_empty() {
        println!("\n=== Top {} Failed Names ===", report.top_failures.len());
        for (name, count) in &report.top_failures {
            println!("  {:>5}  {}", count, name);
        }
    }

    Ok(())
}
