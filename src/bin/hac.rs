use std::env;
use std::process;

use hac_rs::io::read_csv_points;
use hac_rs::{HacConfig, HacOutcome, HierarchicalClustering};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

struct Config {
    input: String,
    workers: usize,
    target: usize,
    json: bool,
}

impl Config {
    fn parse(args: Vec<String>) -> Result<Self, String> {
        let mut input = None;
        let mut workers = 1usize;
        let mut target = 1usize;
        let mut json = false;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--workers" => {
                    let value = iter.next().ok_or("--workers requires a value")?;
                    workers = value
                        .parse()
                        .map_err(|_| format!("invalid worker count: {value}"))?;
                }
                "--target" => {
                    let value = iter.next().ok_or("--target requires a value")?;
                    target = value
                        .parse()
                        .map_err(|_| format!("invalid target cluster count: {value}"))?;
                }
                "--json" => json = true,
                other if other.starts_with("--") => {
                    return Err(format!("unknown option: {other}"));
                }
                other => {
                    if input.replace(other.to_string()).is_some() {
                        return Err("multiple input paths given".to_string());
                    }
                }
            }
        }

        Ok(Self {
            input: input.ok_or("missing input CSV path")?,
            workers,
            target,
            json,
        })
    }
}

fn print_usage() {
    eprintln!("Usage: hac <input.csv> [OPTIONS]");
    eprintln!();
    eprintln!("Hierarchical agglomerative clustering over 2-D points.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --workers N   number of worker threads (default 1)");
    eprintln!("  --target K    stop when K clusters remain (default 1)");
    eprintln!("  --json        print the outcome as JSON instead of text");
}

fn main() {
    env_logger::init();

    if env::args().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return;
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let config = match Config::parse(args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {message}\n");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("Error: {err}");
        let mut source = err.source();
        while let Some(inner) = source {
            eprintln!("  caused by: {inner}");
            source = inner.source();
        }
        process::exit(1);
    }
}

fn run(config: &Config) -> CliResult<()> {
    let points = read_csv_points(&config.input)?;
    let engine = HierarchicalClustering::new(HacConfig::new(config.workers, config.target));
    let outcome = engine.run(&points)?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &HacOutcome) {
    println!("{} clusters:", outcome.clusters.len());
    for cluster in &outcome.clusters {
        // 1-based member indices, matching the usual presentation of the
        // input rows.
        print!("< ");
        for member in &cluster.members {
            print!("{} ", member + 1);
        }
        println!(
            "> centroid ({:.4}, {:.4})",
            cluster.centroid.x, cluster.centroid.y
        );
    }

    if !outcome.merges.is_empty() {
        println!("\n{} merges:", outcome.merges.len());
        for record in &outcome.merges {
            println!(
                "cluster {} absorbed cluster {} at distance {:.6}",
                record.surviving.0, record.absorbed.0, record.distance
            );
        }
    }
}
