use std::fs::File;
use std::io::{BufWriter, Write};
use std::str::FromStr;

use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pvx::config::{self, ModelParams, SimulationConfig};
use pvx::error::{Result, ValuationError};
use pvx::frontier::{self, CorrelationMatrix, EfficientFrontier};
use pvx::portfolio::{self, PortfolioAggregate};
use pvx::scoring::{Molecule, MoleculeRecord, Scorecard};
use pvx::simulation::MoleculeSimulation;
use pvx::types::MoleculeId;
use pvx::worker;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pvx=info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn parse_value<T: FromStr>(flag: &'static str, raw: Option<&String>) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = raw.ok_or_else(|| ValuationError::InvalidParameter {
        name: flag,
        reason: "missing value".to_string(),
    })?;
    raw.parse()
        .map_err(|e: T::Err| ValuationError::InvalidParameter { name: flag, reason: format!("`{raw}`: {e}") })
}

fn sample_molecules() -> Result<Vec<Molecule>> {
    let cards: [(&str, [f64; 7]); 4] = [
        ("PVX-101", [80.0, 65.0, 70.0, 55.0, 60.0, 45.0, 75.0]),
        ("PVX-204", [60.0, 85.0, 55.0, 70.0, 50.0, 65.0, 60.0]),
        ("PVX-317", [45.0, 55.0, 60.0, 80.0, 70.0, 55.0, 50.0]),
        ("PVX-422", [90.0, 40.0, 75.0, 45.0, 35.0, 70.0, 80.0]),
    ];
    cards
        .iter()
        .enumerate()
        .map(|(i, (name, scores))| {
            Ok(Molecule {
                id: MoleculeId(i as u64 + 1),
                name: name.to_string(),
                scorecard: Scorecard::canonical(*scores)?,
            })
        })
        .collect()
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut seed_override: Option<u64> = None;
    let mut iterations: Option<usize> = None;
    let mut molecules_path: Option<String> = None;
    let mut csv_path: Option<String> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" => {
                i += 1;
                seed_override = Some(parse_value("--seed", args.get(i))?);
            }
            "--iterations" => {
                i += 1;
                iterations = Some(parse_value("--iterations", args.get(i))?);
            }
            "--molecules" => {
                i += 1;
                molecules_path = Some(parse_value("--molecules", args.get(i))?);
            }
            "--csv" => {
                i += 1;
                csv_path = Some(parse_value("--csv", args.get(i))?);
            }
            "--quiet" => quiet = true,
            _ => {}
        }
        i += 1;
    }

    let params = ModelParams::canonical();
    let molecules: Vec<Molecule> = match &molecules_path {
        Some(path) => config::load_json::<Vec<MoleculeRecord>>(path)?
            .into_iter()
            .map(|record| record.validate(&params))
            .collect::<Result<_>>()?,
        None => sample_molecules()?,
    };

    let seed = seed_override.unwrap_or_else(|| rand::rng().random());
    let mut sim_config = SimulationConfig::canonical().with_seed(seed);
    if let Some(n) = iterations {
        sim_config.iterations = n;
    }
    info!(molecules = molecules.len(), seed, "portfolio run");

    let runs = worker::spawn_batch(molecules, sim_config, params.clone()).wait()?;
    let holdings = portfolio::holdings(&runs);
    let aggregate = portfolio::aggregate(&holdings, &params)?;

    // One molecule is a valid portfolio but has nothing to correlate.
    let correlation = match frontier::correlation_matrix(&holdings) {
        Ok(m) => Some(m),
        Err(e) if e.is_insufficient_data() => {
            warn!("{e}");
            None
        }
        Err(e) => return Err(e),
    };
    let efficient = match frontier::efficient_frontier(&holdings, &params, seed) {
        Ok(f) => Some(f),
        Err(e) if e.is_insufficient_data() => None,
        Err(e) => return Err(e),
    };

    if let Some(path) = &csv_path {
        write_draws_csv(&runs, &aggregate, path)?;
    }

    if !quiet {
        print_molecules(&runs);
        print_aggregate(&aggregate, &runs);
        if let Some(m) = &correlation {
            print_correlation(m);
        }
        if let Some(f) = &efficient {
            print_frontier(f, &runs);
        }
    }
    Ok(())
}

fn write_draws_csv(runs: &[MoleculeSimulation], aggregate: &PortfolioAggregate, path: &str) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    let header: Vec<String> = runs.iter().map(|r| r.molecule.to_string()).collect();
    writeln!(w, "iteration,{},portfolio", header.join(","))?;
    for (i, total) in aggregate.distribution.iter().enumerate() {
        let draws: Vec<String> =
            runs.iter().map(|r| format!("{:.6}", r.result.peak_sales_distribution[i])).collect();
        writeln!(w, "{i},{},{total:.6}", draws.join(","))?;
    }
    w.flush()?;
    Ok(())
}

fn print_molecules(runs: &[MoleculeSimulation]) {
    println!("=== Molecules ===");
    println!(
        "{:>4} | {:<10} | {:>9} | {:>6} | {:>8} | {:>8} | {:>7} | {:>7} | {:>6}",
        "Id", "Name", "Composite", "P(BB)%", "Est($B)", "Mean($B)", "P10", "P90", "Seed"
    );
    println!("{}", "-".repeat(90));
    for r in runs {
        println!(
            "{:>4} | {:<10} | {:>9.1} | {:>5.1}% | {:>8.2} | {:>8.2} | {:>7.2} | {:>7.2} | {:>6}",
            r.molecule.to_string(),
            r.name,
            r.valuation.composite_score,
            r.valuation.blockbuster_probability * 100.0,
            r.valuation.peak_sales,
            r.result.statistics.mean,
            r.result.percentiles.p10,
            r.result.percentiles.p90,
            r.result.seed,
        );
    }
}

fn print_aggregate(aggregate: &PortfolioAggregate, runs: &[MoleculeSimulation]) {
    let s = &aggregate.statistics;
    let r = &s.risk_adjusted_return;
    let p = &aggregate.percentiles;

    println!(
        "\n=== Portfolio ({} molecules, {} iterations) ===",
        aggregate.molecule_count, aggregate.iterations
    );
    if let Some(longest) = aggregate.truncated_from {
        println!("  (distributions truncated from {longest} to {} draws)", aggregate.iterations);
    }
    println!("  Mean {:.3}  Std dev {:.3}  P5 {:.3}  P50 {:.3}  P95 {:.3}", s.mean, s.std_dev, p.p5, p.p50, p.p95);
    println!("  VaR(5%) {:.3}  ES(5%) {:.3}", r.value_at_risk, r.expected_shortfall);
    println!("  Sharpe {:.3} (rf {:.2})  Sortino {:.3}", r.sharpe_ratio, aggregate.risk_free_rate, r.sortino_ratio);
    println!("  Diversification benefit {:.1}%", aggregate.diversification_benefit);
    println!(
        "  P(portfolio ≥ ${}B) {:.1}%",
        aggregate.molecule_count,
        aggregate.portfolio_success_prob * 100.0
    );

    println!("\n--- Contributions ---");
    println!("{:<10} | {:>8} | {:>7} | {:>8}", "Name", "Mean($B)", "Share%", "Std dev");
    for c in &aggregate.contributions {
        let name = runs.iter().find(|r| r.molecule == c.molecule).map(|r| r.name.as_str()).unwrap_or("?");
        println!("{:<10} | {:>8.3} | {:>6.1}% | {:>8.3}", name, c.mean, c.share_of_mean * 100.0, c.std_dev);
    }
}

fn print_correlation(m: &CorrelationMatrix) {
    println!("\n=== Correlation ===");
    let header: Vec<String> = m.molecules.iter().map(|id| format!("{:>7}", id.to_string())).collect();
    println!("{:>6} |{}", "", header.join(""));
    for (id, row) in m.molecules.iter().zip(&m.values) {
        let cells: Vec<String> = row.iter().map(|v| format!("{v:>7.3}")).collect();
        println!("{:>6} |{}", id.to_string(), cells.join(""));
    }
}

fn print_frontier(f: &EfficientFrontier, runs: &[MoleculeSimulation]) {
    println!(
        "\n=== Efficient frontier ({} of {} points) ===",
        f.efficient.len(),
        f.points.len()
    );
    let names: Vec<&str> = runs.iter().map(|r| r.name.as_str()).collect();
    println!("{:>8} | {:>8} | {}", "Risk", "Return", names.join(" / "));
    for p in &f.efficient {
        let weights: Vec<String> = p.core.weights.iter().map(|w| format!("{:.0}%", w * 100.0)).collect();
        let b = &p.confidence_band;
        println!(
            "{:>8.3} | {:>8.3} | {}   80% [{:.2}, {:.2}]  95% [{:.2}, {:.2}]",
            p.core.risk,
            p.core.expected_return,
            weights.join(" / "),
            b.p10,
            b.p90,
            b.p2_5,
            b.p97_5
        );
    }
}
