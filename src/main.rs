//! Crossing scenario CLI.
//!
//! Runs headless transport scenarios against the naval manager and outputs
//! one JSON record per scenario.
//!
//! Usage:
//!   cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --scenarios N   Number of scenarios to run (default: 8)
//!   --ticks N       Tick budget per scenario (default: 400)
//!   --units N       Land units to ferry (default: 6)
//!   --ships N       Transports afloat at the start (default: 1)
//!   --sink P        Per-tick chance of sinking a loaded ship (default: 0.0)
//!   --threads N     Number of parallel threads (default: 4)
//!   --seed N        Random seed, 0 for entropy (default: 0)
//!   --config FILE   Naval tunables as JSON
//!   --output FILE   Output file path (default: stdout)
//!   --quiet         Suppress progress and summary output

use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use flotilla::naval::NavalConfig;
use flotilla::sim::{self, ScenarioConfig};

fn value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|s| s.parse()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("invalid {} value", flag);
            print_usage();
            process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut config = ScenarioConfig::default();
    let mut output_path: Option<String> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scenarios" => {
                i += 1;
                config.num_scenarios = value(&args, i, "--scenarios");
            }
            "--ticks" => {
                i += 1;
                config.max_ticks = value(&args, i, "--ticks");
            }
            "--units" => {
                i += 1;
                config.units = value(&args, i, "--units");
            }
            "--ships" => {
                i += 1;
                config.initial_ships = value(&args, i, "--ships");
            }
            "--sink" => {
                i += 1;
                config.sink_chance = value(&args, i, "--sink");
            }
            "--threads" => {
                i += 1;
                config.threads = value(&args, i, "--threads");
            }
            "--seed" => {
                i += 1;
                config.seed = value(&args, i, "--seed");
            }
            "--config" => {
                i += 1;
                let path: String = value(&args, i, "--config");
                let parsed = fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|text| NavalConfig::from_json(&text).map_err(|e| e.to_string()));
                match parsed {
                    Ok(naval) => config.naval = naval,
                    Err(e) => {
                        eprintln!("failed to load {}: {}", path, e);
                        process::exit(1);
                    }
                }
            }
            "--output" => {
                i += 1;
                output_path = Some(value(&args, i, "--output"));
            }
            "--quiet" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    config.quiet = quiet;

    if !quiet {
        eprintln!(
            "Crossings: {} scenarios, {} ticks, {} units, {} ships, sink {:.2}, {} threads",
            config.num_scenarios,
            config.max_ticks,
            config.units,
            config.initial_ships,
            config.sink_chance,
            config.threads
        );
    }

    let start = Instant::now();
    let records = match sim::run_scenarios(&config) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("failed to build thread pool: {}", e);
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !quiet {
        eprintln!("Completed {} scenarios in {:.1}s", records.len(), elapsed.as_secs_f64());
        sim::print_summary(&records);
    }

    let written = match &output_path {
        Some(path) => File::create(path).and_then(|file| sim::write_jsonl(&records, &mut BufWriter::new(file))),
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            sim::write_jsonl(&records, &mut writer)
        }
    };
    if let Err(e) = written {
        eprintln!("failed to write output: {}", e);
        process::exit(1);
    }
    if let (Some(path), false) = (&output_path, quiet) {
        eprintln!("Wrote {} records to {}", records.len(), path);
    }
}

fn print_usage() {
    eprintln!("Usage: flotilla [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenarios N    Number of scenarios to run (default: 8)");
    eprintln!("  --ticks N        Tick budget per scenario (default: 400)");
    eprintln!("  --units N        Land units to ferry (default: 6)");
    eprintln!("  --ships N        Transports afloat at the start (default: 1)");
    eprintln!("  --sink P         Per-tick chance of sinking a loaded ship (default: 0.0)");
    eprintln!("  --threads N      Number of parallel threads (default: 4)");
    eprintln!("  --seed N         Random seed, 0 for entropy (default: 0)");
    eprintln!("  --config FILE    Naval tunables as JSON");
    eprintln!("  --output FILE    Output file path (default: stdout)");
    eprintln!("  --quiet          Suppress progress and summary output");
    eprintln!("  --help           Show this help");
}
