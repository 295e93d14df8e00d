//! treegen CLI: enumerate rooted trees with N nodes and at most M leaves.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use treegen_core::config::GeneratorConfig;
use treegen_core::tree::Tree;
use treegen_exec::{ProgressSnapshot, TreeGenerator};

#[derive(Parser)]
#[command(name = "treegen")]
#[command(
    about = "Generate all non-equivalent unordered rooted trees with N nodes and at most M leaves",
    long_about = None
)]
struct Cli {
    /// Number of nodes
    n: usize,

    /// Maximum number of leaves
    m: usize,

    /// Only print counts and progress, not the trees
    #[arg(long)]
    quiet: bool,

    /// Disable the parallel strategies
    #[arg(long)]
    single_threaded: bool,

    /// Worker threads (overrides detection and config)
    #[arg(long)]
    threads: Option<usize>,

    /// JSON generator config; otherwise read from TREEGEN_* environment variables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the run report as JSON after the summary
    #[arg(long)]
    report: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &cli.config {
        Some(path) => GeneratorConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => GeneratorConfig::from_env(),
    };
    if let Some(threads) = cli.threads {
        cfg.max_threads = Some(threads);
    }

    println!(
        "Generating all trees with N={} nodes and M<={} leaves",
        cli.n, cli.m
    );
    println!("{}", "=".repeat(60));
    println!();

    let mut generator = TreeGenerator::with_config(cfg);
    if cli.quiet {
        generator = generator.with_progress(print_progress);
    }

    let started = Instant::now();
    let mut index = 0usize;
    let quiet = cli.quiet;
    let total = generator.generate(
        cli.n,
        cli.m,
        |tree: &Tree| {
            index += 1;
            if !quiet {
                print_tree(index, tree);
            }
        },
        !cli.single_threaded,
    )?;
    let elapsed = started.elapsed();

    if quiet {
        eprintln!();
    }
    println!("{}", "=".repeat(60));
    println!("Total trees generated: {}", total);
    let ms = elapsed.as_millis();
    if ms >= 1000 {
        println!("Time taken: {} ms ({:.2} seconds)", ms, elapsed.as_secs_f64());
    } else {
        println!("Time taken: {} ms", ms);
    }
    if total > 0 {
        println!(
            "Average time per tree: {:.6} ms",
            elapsed.as_secs_f64() * 1000.0 / total as f64
        );
    }

    if cli.report {
        if let Some(report) = generator.last_report() {
            println!("{}", report.to_json()?);
        }
    }
    Ok(())
}

fn print_tree(index: usize, tree: &Tree) {
    println!("Tree #{}:", index);
    println!("  Representation: {}", tree);
    println!(
        "  Nodes: {}, Leaves: {}",
        tree.node_count(),
        tree.leaf_count()
    );
    println!("  Structure:");
    print!("{}", tree.render("  "));
    println!();
}

fn print_progress(snap: &ProgressSnapshot) {
    let mut line = format!(
        "\rProgress: {} trees | {:.1}s elapsed | {:.0} trees/sec",
        snap.trees,
        snap.elapsed_ms as f64 / 1000.0,
        snap.trees_per_second()
    );
    if snap.units_total > 0 {
        line.push_str(&format!(" | work: {}/{}", snap.units_done, snap.units_total));
    }
    let mut err = std::io::stderr().lock();
    let _ = err.write_all(line.as_bytes());
    let _ = err.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_and_flags() {
        let cli = Cli::try_parse_from(["treegen", "7", "3", "--quiet", "--threads", "2"]).unwrap();
        assert_eq!(cli.n, 7);
        assert_eq!(cli.m, 3);
        assert!(cli.quiet);
        assert!(!cli.single_threaded);
        assert_eq!(cli.threads, Some(2));
    }

    #[test]
    fn missing_arguments_are_an_error() {
        assert!(Cli::try_parse_from(["treegen", "7"]).is_err());
        assert!(Cli::try_parse_from(["treegen", "seven", "3"]).is_err());
    }
}
