// Elven Canopy Harmony Reducer: CLI entry point.
//
// Reads a score (a JSON list of measure stacks), reduces every measure to
// a few representative chords, and prints the result.
//
// Usage:
//   cargo run -p elven_canopy_harmony --bin reduce -- <score.json>
//     [--config config.json] [--max-chords N] [--json]
//
// Logging goes through env_logger; set RUST_LOG=debug to see which chords
// each measure kept.

use elven_canopy_harmony::config::ReductionConfig;
use elven_canopy_harmony::error::{HarmonyError, Result};
use elven_canopy_harmony::pipeline::{MeasureStack, reduce_score};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(score_path) = args.get(1).filter(|s| !s.starts_with("--")) else {
        eprintln!("usage: reduce <score.json> [--config config.json] [--max-chords N] [--json]");
        return ExitCode::FAILURE;
    };

    match run(&args, Path::new(score_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String], score_path: &Path) -> Result<()> {
    let mut config = match parse_flag::<String>(args, "--config") {
        Some(path) => ReductionConfig::load(Path::new(&path))?,
        None => ReductionConfig::default(),
    };
    if let Some(max_chords) = parse_flag(args, "--max-chords") {
        config.max_chords = max_chords;
    }
    config.validate()?;

    let data = std::fs::read_to_string(score_path).map_err(|source| HarmonyError::Io {
        path: score_path.to_path_buf(),
        source,
    })?;
    let stacks: Vec<MeasureStack> = serde_json::from_str(&data)?;
    log::info!(
        "reducing {} measures to at most {} chords each ({:?})",
        stacks.len(),
        config.max_chords,
        config.weight_algorithm
    );

    let reduced = reduce_score(&stacks, &config)?;
    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string_pretty(&reduced)?);
    } else {
        for measure in &reduced {
            println!("{}", measure.summary());
        }
    }
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
