use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use dvg_cache::{DivergenceCache, DivergenceHandle, DivergenceState};
use dvg_crypto::ContentHasher;
use dvg_diff::{find_moves, flatten_value, node_type, ArrayIds};
use dvg_engine::{DivergenceEngine, DivergenceReport, TokioScheduler};
use dvg_types::{Divergence, DivergenceStatus, Effect};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cli::*;
use crate::config::DvgConfig;
use crate::input::{load_snapshots, read_json, read_json_file};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = DvgConfig::load(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Diff(args) => runtime()?.block_on(cmd_diff(args, &config, &format)),
        Command::Watch(args) => runtime()?.block_on(cmd_watch(args, &config, &format)),
        Command::Hash(args) => cmd_hash(args, &format),
        Command::Moves(args) => cmd_moves(args, &format),
        Command::Flatten(args) => cmd_flatten(args, &format),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")
}

async fn cmd_diff(args: DiffArgs, config: &DvgConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let ctx = load_snapshots(&args.snapshots).await?;
    let engine = DivergenceEngine::new(config.engine.clone());
    let report = engine.find_divergences_with(&ctx, &TokioScheduler).await;
    print_report(&report, format)
}

async fn cmd_watch(
    args: WatchArgs,
    config: &DvgConfig,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let ctx = load_snapshots(&args.snapshots).await?;
    let upstream_id = ctx.upstream_head.as_ref().map(|d| d.id().to_string()).unwrap_or_default();
    let subject_id = ctx.subject_head.as_ref().map(|d| d.id().to_string()).unwrap_or_default();

    let cache = DivergenceCache::new(config.cache.clone(), config.engine.clone());
    let DivergenceHandle { mut results, sink } = cache.get_or_create(&upstream_id, &subject_id)?;
    sink.send(ctx)?;

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    // the first tick fires immediately and the files were just read
    interval.tick().await;
    info!(upstream = %upstream_id, subject = %subject_id, "watching snapshots");

    loop {
        tokio::select! {
            _ = interval.tick() => match load_snapshots(&args.snapshots).await {
                Ok(ctx) => sink.send(ctx)?,
                Err(e) => warn!(error = %format!("{e:#}"), "reloading snapshots failed"),
            },
            state = results.changed() => {
                if let DivergenceState::Ready(report) = state? {
                    print_report(&report, format)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn cmd_hash(args: HashArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let value = read_json(&args.input)?;
    let digest = ContentHasher::hash_value(&value);
    match format {
        OutputFormat::Text => println!("{digest}"),
        OutputFormat::Json => println!("{}", json!({ "digest": digest.to_hex() })),
    }
    Ok(())
}

fn cmd_moves(args: MovesArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let (Value::Array(a), Value::Array(b)) = (read_json_file(&args.a)?, read_json_file(&args.b)?)
    else {
        bail!("both inputs must be JSON arrays");
    };
    let moves = find_moves(&a, &b);
    match format {
        OutputFormat::Text if moves.is_empty() => println!("No moves."),
        OutputFormat::Text => {
            for (key, delta) in &moves {
                println!("{}  {}", key.yellow(), format!("{delta:+}").bold());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&moves)?),
    }
    Ok(())
}

fn cmd_flatten(args: FlattenArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let value = read_json(&args.input)?;
    let ids = ArrayIds::new();
    let entries = flatten_value(&value, args.compact, &ids)?;
    match format {
        OutputFormat::Text => {
            for entry in entries {
                println!(
                    "{}  {}  {}",
                    entry.path.to_string().bold(),
                    node_type(entry.value).cyan(),
                    entry.value
                );
            }
        }
        OutputFormat::Json => {
            let rows: Vec<Value> = entries
                .map(|entry| {
                    json!({
                        "path": entry.path.to_string(),
                        "type": node_type(entry.value),
                        "value": entry.value,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn print_report(report: &DivergenceReport, format: &OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.is_empty() && report.faults().is_empty() {
        println!("{} No divergences.", "✓".green().bold());
        return Ok(());
    }
    for (path, divergence) in report.sorted_by_path() {
        println!("{}", describe(path, divergence));
    }
    for fault in report.faults() {
        eprintln!("{} {}: {}", "fault".red().bold(), fault.path, fault.error);
    }
    println!(
        "\n{} divergences, {} unresolved, {} faults",
        report.len().to_string().bold(),
        report.unresolved().to_string().yellow(),
        report.faults().len()
    );
    Ok(())
}

/// One line per divergence: status, path, effect, and the revision it is
/// measured from.
fn describe(path: &str, divergence: &Divergence) -> String {
    let status = match divergence.status {
        DivergenceStatus::Unresolved => format!("{:<10}", "unresolved").yellow(),
        DivergenceStatus::Resolved => format!("{:<10}", "resolved").green(),
    };
    let effect = match &divergence.effect {
        None => "-".to_string(),
        Some(Effect::Insert { position }) => format!("insert at {position}"),
        Some(Effect::Move {
            upstream_position,
            delta,
        }) => format!("move to {upstream_position} ({delta:+})"),
        Some(effect) => effect.kind().to_string(),
    };
    let mut line = format!(
        "{status}  {}  {}  {}",
        path.bold(),
        effect.cyan(),
        format!("since {}", divergence.since_revision_id).dimmed()
    );
    if !divergence.is_addressable {
        line.push_str(&format!("  {}", "(container)".dimmed()));
    }
    line
}
