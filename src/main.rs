use anyhow::{bail, Context, Result};
use building_efficiency_tracker::{
    config::{Config, RepositoryBackend},
    domain::CalculateEfficiencyRequest,
    state::AppState,
    telemetry::init_tracing,
};
use serde::Serialize;
use tracing::warn;

const USAGE: &str = "usage: building-efficiency-tracker <command>

commands:
  calculate <request.json>
  calculations <building> [period]
  summary <building>
  latest <building>
  buildings [skip] [limit]
  clear-cache [building]

The default `memory` repository lives only for a single run; set
BET__REPOSITORY__BACKEND=postgres (built with the `db` feature) to keep
calculations between runs.";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let cfg = Config::load()?;
    if cfg.repository.backend == RepositoryBackend::Memory {
        warn!(
            "memory repository selected; calculations do not outlive this run, \
             set BET__REPOSITORY__BACKEND=postgres to persist"
        );
    }
    let state = AppState::new(cfg).await?;
    let service = &state.service;

    match (command.as_str(), rest) {
        ("calculate", [path]) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read request file {path}"))?;
            let request: CalculateEfficiencyRequest =
                serde_json::from_str(&raw).context("Failed to parse calculation request")?;
            print_json(&service.calculate_efficiency_request(&request).await?)
        }
        ("calculations", [building]) => {
            print_json(&service.get_building_calculations(building).await?)
        }
        ("calculations", [building, period]) => {
            print_json(&service.get_building_calculations_by_period(building, period).await?)
        }
        ("summary", [building]) => print_json(&service.get_building_summary(building).await?),
        ("latest", [building]) => print_json(&service.get_latest_calculation(building).await?),
        ("buildings", page) if page.len() <= 2 => {
            let skip = parse_arg(page.first(), "skip", 0)?;
            let limit = parse_arg(page.get(1), "limit", state.cfg.listing.default_limit)?;
            print_json(&service.list_building_summaries(skip, limit).await?)
        }
        ("clear-cache", []) => print_json(&service.clear_cache(None).await),
        ("clear-cache", [building]) => {
            print_json(&service.clear_cache(Some(building.as_str())).await)
        }
        _ => bail!(USAGE),
    }
}

fn parse_arg(value: Option<&String>, name: &str, default: usize) -> Result<usize> {
    match value {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a non-negative integer, got {raw:?}")),
        None => Ok(default),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
