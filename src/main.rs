use std::fs::File;
use std::io::{BufWriter, Write};
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pvx::config::{self, ModelParams, SimulationConfig};
use pvx::error::{Result, ValuationError};
use pvx::scenario::{Scenario, ScenarioResult};
use pvx::scoring::{self, Molecule, MoleculeRecord, Scorecard};
use pvx::sensitivity::{self, SensitivityResult};
use pvx::simulation::SimulationResult;
use pvx::types::MoleculeId;
use pvx::uncertainty;
use pvx::worker;

struct Args {
    seed: Option<u64>,
    iterations: Option<usize>,
    uncertainty: Option<f64>,
    sampling: Option<String>,
    params_path: Option<String>,
    molecule_path: Option<String>,
    output_path: String,
    quiet: bool,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        seed: None,
        iterations: None,
        uncertainty: None,
        sampling: None,
        params_path: None,
        molecule_path: None,
        output_path: "distribution.ndjson".to_string(),
        quiet: false,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || {
            i += 1;
            args.get(i).cloned().ok_or_else(|| ValuationError::InvalidParameter {
                name: "arguments",
                reason: format!("{flag} requires a value"),
            })
        };
        match flag {
            "--seed" => parsed.seed = Some(parse_value("--seed", &value()?)?),
            "--iterations" => parsed.iterations = Some(parse_value("--iterations", &value()?)?),
            "--uncertainty" => parsed.uncertainty = Some(parse_value("--uncertainty", &value()?)?),
            "--sampling" => parsed.sampling = Some(value()?),
            "--params" => parsed.params_path = Some(value()?),
            "--molecule" => parsed.molecule_path = Some(value()?),
            "--output" => parsed.output_path = value()?,
            "--quiet" => parsed.quiet = true,
            _ => {}
        }
        i += 1;
    }
    Ok(parsed)
}

fn parse_value<T: FromStr>(flag: &'static str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ValuationError::InvalidParameter { name: flag, reason: format!("`{raw}`: {e}") })
}

fn sample_molecule() -> Result<Molecule> {
    Ok(Molecule {
        id: MoleculeId(101),
        name: "PVX-101".to_string(),
        scorecard: Scorecard::canonical([80.0, 65.0, 70.0, 55.0, 60.0, 45.0, 75.0])?,
    })
}

#[derive(Serialize)]
struct DrawRecord {
    iteration: usize,
    peak_sales: f64,
}

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

fn run() -> Result<()> {
    let args = parse_args()?;

    let params = match &args.params_path {
        Some(path) => ModelParams::from_json_file(path)?,
        None => ModelParams::canonical(),
    };
    let molecule: Molecule = match &args.molecule_path {
        Some(path) => config::load_json::<MoleculeRecord>(path)?.validate(&params)?,
        None => sample_molecule()?,
    };

    let mut sim_config = SimulationConfig::canonical();
    if let Some(n) = args.iterations {
        sim_config.iterations = n;
    }
    if let Some(u) = args.uncertainty {
        sim_config.uncertainty_range = u;
    }
    if let Some(s) = &args.sampling {
        sim_config.sampling =
            s.parse().map_err(|reason| ValuationError::InvalidParameter { name: "--sampling", reason })?;
    }
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    let sim_config = sim_config.with_seed(seed);
    sim_config.validate()?;
    info!(molecule = %molecule.name, seed, iterations = sim_config.iterations, "valuing molecule");

    let simulation = worker::spawn_simulation(molecule.scorecard.clone(), sim_config.clone(), params.clone());
    let scenarios =
        worker::spawn_scenarios(molecule.scorecard.clone(), Scenario::catalog(), sim_config.clone(), params.clone());
    let tornado = sensitivity::tornado(&molecule.scorecard, &params);

    let result = simulation.wait()?;
    let scenario_results = scenarios.wait()?;

    let file = File::create(&args.output_path)?;
    let mut writer = BufWriter::new(file);
    for (iteration, &peak_sales) in result.peak_sales_distribution.iter().enumerate() {
        serde_json::to_writer(&mut writer, &DrawRecord { iteration, peak_sales })?;
        writeln!(writer)?;
    }
    writer.flush()?;

    if !args.quiet {
        print_valuation(&molecule, &sim_config, &params)?;
        print_simulation(&result);
        print_tornado(&tornado);
        print_scenarios(&scenario_results);
        println!("\nDistribution: {} draws → {}", result.iterations(), args.output_path);
    }
    Ok(())
}

fn print_valuation(molecule: &Molecule, sim_config: &SimulationConfig, params: &ModelParams) -> Result<()> {
    let valuation = scoring::evaluate(&molecule.scorecard, params);
    let bands = uncertainty::map_uncertainty(&molecule.scorecard, sim_config.uncertainty_range)?;

    println!("=== {} ({}) ===", molecule.name, molecule.id);
    println!("{:<26} | {:>6} | {:>6} | {:>8} | {:>6} | {:>6}", "Component", "Score", "Weight", "Weighted", "Min", "Max");
    println!("{}", "-".repeat(72));
    for (c, band) in molecule.scorecard.components().iter().zip(&bands) {
        println!(
            "{:<26} | {:>6.1} | {:>6.2} | {:>8.2} | {:>6.1} | {:>6.1}",
            c.name(),
            c.score,
            c.weight,
            c.weighted_score(),
            band.min_score,
            band.max_score,
        );
    }
    println!("\nComposite score:          {:>8.1}", valuation.composite_score);
    println!("Blockbuster probability:  {:>7.1}%", valuation.blockbuster_probability * 100.0);
    println!(
        "Peak sales estimate:      {:>8.2} $B  (range {:.2}–{:.2})",
        valuation.peak_sales, valuation.peak_sales_low, valuation.peak_sales_high
    );
    Ok(())
}

fn print_simulation(result: &SimulationResult) {
    let s = &result.statistics;
    let r = &s.risk_adjusted_return;
    let p = &result.percentiles;

    println!("\n=== Monte Carlo ({} iterations, seed {}) ===", result.iterations(), result.seed);
    println!(
        "{:>7} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7}",
        "min", "p5", "p10", "p25", "p50", "p75", "p90", "p95", "max"
    );
    println!(
        "{:>7.2} | {:>7.2} | {:>7.2} | {:>7.2} | {:>7.2} | {:>7.2} | {:>7.2} | {:>7.2} | {:>7.2}",
        s.min, p.p5, p.p10, p.p25, p.p50, p.p75, p.p90, p.p95, s.max
    );
    println!("\n  Mean {:.3}  Std dev {:.3}  Skew {:.3}  Excess kurtosis {:.3}", s.mean, s.std_dev, s.skewness, s.kurtosis);
    println!("  VaR(5%) {:.3}  ES(5%) {:.3}", r.value_at_risk, r.expected_shortfall);
    println!("  Sharpe {:.3}  Sortino {:.3}  Risk/reward {:.3}", r.sharpe_ratio, r.sortino_ratio, r.risk_reward_ratio);
    println!(
        "  Risk-weighted value {:.3}  Certainty equivalent {:.3}",
        r.risk_weighted_value, r.certainty_equivalent
    );
    println!("  P(peak sales ≥ $1B) {:.1}%", r.probability_of_success * 100.0);

    println!("\n--- Histogram ---");
    for bin in &result.histogram {
        let bar = "#".repeat((bin.percentage / 2.0).round() as usize);
        println!("{:>7.2}–{:<7.2} {:>5.1}% {bar}", bin.lower, bin.upper, bin.percentage);
    }
}

fn print_tornado(results: &[SensitivityResult]) {
    println!("\n=== Sensitivity (tornado) ===");
    println!("{:<26} | {:>8} | {:>8} | {:>8}", "Component", "Up%", "Down%", "Swing");
    println!("{}", "-".repeat(60));
    for r in results {
        println!("{:<26} | {:>+8.2} | {:>+8.2} | {:>8.2}", r.component_name, r.up_impact, r.down_impact, r.swing());
    }
}

fn print_scenarios(results: &[ScenarioResult]) {
    println!("\n=== Scenarios ===");
    println!(
        "{:<12} | {:>9} | {:>9} | {:>7} | {:>8} | {:>7} | {:>7}",
        "Scenario", "Composite", "Mean($B)", "P(BB)%", "Δ base%", "P10", "P90"
    );
    println!("{}", "-".repeat(76));
    for r in results {
        println!(
            "{:<12} | {:>9.1} | {:>9.2} | {:>6.1}% | {:>+8.2} | {:>7.2} | {:>7.2}",
            r.name,
            r.composite_score,
            r.peak_sales,
            r.blockbuster_probability * 100.0,
            r.delta_from_base,
            r.p10,
            r.p90,
        );
    }
}
