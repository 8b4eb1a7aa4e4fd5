
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use fixtures::{LARGE, MEDIUM, SMALL, config, make_molecules, simulated};
use pvx::config::ModelParams;
use pvx::frontier;
use pvx::portfolio;
use pvx::sampling::SamplingDistribution;
use pvx::scenario::{self, Scenario};
use pvx::scoring::Scorecard;
use pvx::sensitivity;
use pvx::simulation::{Simulation, simulate_batch};

// ── Group 1: simulation, iteration count scaling ───────────────────────────

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    let card = make_molecules(1).remove(0).scorecard;
    let params = ModelParams::canonical();
    for &iterations in &[1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(iterations as u64));
        group.bench_with_input(BenchmarkId::from_parameter(iterations), &iterations, |b, &n| {
            b.iter_batched(
                || {
                    Simulation::from_scorecard(&card, &config(n, 42), &params)
                        .expect("valid bench config")
                        .with_rng(ChaCha20Rng::seed_from_u64(42))
                },
                |sim| sim.run(),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

// ── Group 2: sampling, distribution cost at fixed iterations ───────────────

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    let card = Scorecard::uniform(65.0).expect("valid score");
    let params = ModelParams::canonical();
    for sampling in [SamplingDistribution::Uniform, SamplingDistribution::Triangular, SamplingDistribution::TruncatedNormal] {
        let mut cfg = config(10_000, 7);
        cfg.sampling = sampling;
        group.throughput(Throughput::Elements(cfg.iterations as u64));
        group.bench_function(BenchmarkId::from_parameter(format!("{sampling:?}")), |b| {
            b.iter_batched(
                || Simulation::from_scorecard(&card, &cfg, &params).expect("valid bench config"),
                |sim| sim.run(),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

// ── Group 3: batch, parallel multi-molecule runs ───────────────────────────

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(10);
    let params = ModelParams::canonical();
    for (name, p) in [("small", &SMALL), ("medium", &MEDIUM), ("large", &LARGE)] {
        let molecules = make_molecules(p.molecules);
        let cfg = config(p.iterations, 42);
        group.throughput(Throughput::Elements((p.molecules * p.iterations) as u64));
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| simulate_batch(&molecules, &cfg, &params))
        });
    }
    group.finish();
}

// ── Group 4: portfolio, aggregation of simulated molecules ─────────────────

fn bench_portfolio(c: &mut Criterion) {
    let mut group = c.benchmark_group("portfolio");
    let params = ModelParams::canonical();
    for (name, p) in [("small", &SMALL), ("medium", &MEDIUM), ("large", &LARGE)] {
        let runs = simulated(p, 42);
        let holdings = portfolio::holdings(&runs);
        group.throughput(Throughput::Elements((p.molecules * p.iterations) as u64));
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| portfolio::aggregate(&holdings, &params))
        });
    }
    group.finish();
}

// ── Group 5: frontier, correlation and efficient frontier ──────────────────

fn bench_frontier(c: &mut Criterion) {
    let mut group = c.benchmark_group("frontier");
    group.sample_size(10);
    let params = ModelParams::canonical();
    for (name, p) in [("sweep", &SMALL), ("cloud", &MEDIUM)] {
        let runs = simulated(p, 42);
        let holdings = portfolio::holdings(&runs);
        group.bench_function(BenchmarkId::new("efficient", name), |b| {
            b.iter(|| frontier::efficient_frontier(&holdings, &params, 42))
        });
        group.bench_function(BenchmarkId::new("correlation", name), |b| {
            b.iter(|| frontier::correlation_matrix(&holdings))
        });
    }
    group.finish();
}

// ── Group 6: analysis, tornado and scenarios ───────────────────────────────

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");
    let card = make_molecules(1).remove(0).scorecard;
    let params = ModelParams::canonical();
    group.bench_function("tornado", |b| b.iter(|| sensitivity::tornado(&card, &params)));
    let cfg = config(10_000, 42);
    let catalog = Scenario::catalog();
    group.bench_function("scenarios", |b| b.iter(|| scenario::run_scenarios(&card, &catalog, &cfg, &params)));
    group.finish();
}

criterion_group!(
    benches,
    bench_simulation,
    bench_sampling,
    bench_batch,
    bench_portfolio,
    bench_frontier,
    bench_analysis,
);
criterion_main!(benches);
