//! Prints the snapping solver quality report: success rate, distance to the
//! pointer and predicate calls per strategy. Timing is `solver_timing`.
//!
//! ```text
//! cargo bench --bench solver_report                 # default 4×4 grid
//! cargo bench --bench solver_report -- 6 200 30     # grid, trials, perturbation
//! ```

use weaveheart::bench::{run_benchmark, BenchmarkConfig};
use weaveheart::config::EditorConfig;
use weaveheart::editor::HeartEditor;
use weaveheart::model::HeartModel;

fn main() -> weaveheart::Result<()> {
    // Default: WARN for everything, INFO for weaveheart.
    // Override with RUST_LOG env var (e.g. RUST_LOG=weaveheart=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("solver_report=info".parse().unwrap_or_default())
        .add_directive("weaveheart=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().skip(1).filter(|a| !a.starts_with('-')).collect();
    let grid_size = args.first().and_then(|a| a.parse().ok()).unwrap_or(4);
    let mut bench = BenchmarkConfig::default();
    if let Some(trials) = args.get(1).and_then(|a| a.parse().ok()) {
        bench.trials = trials;
    }
    if let Some(perturbation) = args.get(2).and_then(|a| a.parse().ok()) {
        bench.perturbation = perturbation;
    }

    let config = EditorConfig::load_or_default(std::path::Path::new("weaveheart.toml"));
    let model = HeartModel::new(grid_size, &config)?;
    let mut editor = HeartEditor::new(model, config);

    let report = run_benchmark(&mut editor, &bench)?;
    println!("grid {grid_size}×{grid_size}, {} trials, seed {:#x}", bench.trials, bench.seed);
    print!("{report}");
    Ok(())
}
