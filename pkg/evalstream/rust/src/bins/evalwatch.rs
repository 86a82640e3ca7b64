// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use evalstream::config::{DashboardConfig, load_config};
use evalstream::duration::duration_from_string;
use evalstream::render::render_table;
use evalstream::transport::DEFAULT_API_URL;
use evalstream::{EvaluationService, Expressions, HttpTransport, TimeSpec, TimeWindowResolver};
use futures::StreamExt;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "evalwatch")]
#[command(about = "Stream metric expression evaluations to the terminal")]
#[command(version)]
struct Args {
    /// Dashboard definition (YAML). Reloaded on SIGHUP.
    #[arg(short, long, env = "EVALWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the evaluation API.
    #[arg(long, env = "EVALWATCH_API_URL")]
    api_url: Option<String>,

    /// Expression as `label=query`. Overrides a config entry with the same label.
    #[arg(short, long = "expr", value_parser = parse_expr)]
    exprs: Vec<(String, String)>,

    /// RFC 3339 start of the interval.
    #[arg(long)]
    begin: Option<DateTime<Utc>>,

    /// RFC 3339 end of the interval.
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Interval length, e.g. "1h 30m".
    #[arg(long, value_parser = parse_duration)]
    duration: Option<u64>,

    /// Sampling step, e.g. "10s".
    #[arg(long, value_parser = parse_duration)]
    stepsize: Option<u64>,

    /// Number of trailing rows to print.
    #[arg(long, default_value = "20")]
    rows: usize,

    /// Validate every expression with the server before streaming.
    #[arg(long)]
    validate: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

fn parse_expr(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((label, query)) if !label.trim().is_empty() && !query.trim().is_empty() => {
            Ok((label.trim().to_string(), query.trim().to_string()))
        }
        _ => Err(format!("expected label=query, got {s:?}")),
    }
}

fn parse_duration(s: &str) -> std::result::Result<u64, String> {
    duration_from_string(s).map_err(|e| e.to_string())
}

struct Dashboard {
    api_url: String,
    exprs: Expressions,
    spec: TimeSpec,
}

/// Config file values overlaid with command line flags.
fn load_dashboard(args: &Args) -> Result<Dashboard> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => DashboardConfig::default(),
    };

    let mut exprs = config.expressions;
    exprs.extend(args.exprs.iter().cloned());

    let base = config.time.to_time_spec();
    let spec = TimeSpec::new(
        args.begin.or(base.begin),
        args.end.or(base.end),
        args.duration.or(base.duration),
        args.stepsize.or(base.stepsize),
    );

    Ok(Dashboard {
        api_url: args
            .api_url
            .clone()
            .or(config.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        exprs,
        spec,
    })
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn validate_all(transport: &HttpTransport, exprs: &Expressions) -> Result<()> {
    let mut failed = false;
    for (label, query) in exprs {
        let validation = transport
            .validate(query)
            .await
            .with_context(|| format!("validating {label}"))?;
        if validation.ok {
            if let Some(normalized) = validation.normalized_query.filter(|n| n != query) {
                info!(label = %label, normalized = %normalized, "expression is valid");
            }
            continue;
        }
        failed = true;
        for err in &validation.parse_errors {
            warn!(label = %label, "parse error: {err}");
        }
    }
    if failed {
        bail!("one or more expressions failed validation");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let dashboard = load_dashboard(&args)?;
    if dashboard.exprs.is_empty() {
        bail!("no expressions given, use --expr or --config");
    }

    let transport = Arc::new(HttpTransport::new(&dashboard.api_url)?);
    if args.validate {
        validate_all(&transport, &dashboard.exprs).await?;
    }

    let resolver = TimeWindowResolver::new(dashboard.spec);
    let service = EvaluationService::new(Arc::clone(&transport), resolver.clone());
    let (exprs_tx, exprs_rx) = watch::channel(dashboard.exprs);
    let mut snapshots = service.evaluate(exprs_rx);

    let mut sighup = signal(SignalKind::hangup())?;

    info!(
        api_url = %dashboard.api_url,
        interval = %resolver.representation(),
        "Starting evalwatch"
    );

    loop {
        tokio::select! {
            item = snapshots.next() => match item {
                Some(Ok(data)) => {
                    println!("{}", resolver.representation());
                    print!("{}", render_table(&data, args.rows));
                    println!();
                }
                Some(Err(e)) => warn!(error = %e, "evaluation failed"),
                None => break,
            },
            _ = sighup.recv() => match load_dashboard(&args) {
                Ok(dashboard) => {
                    info!(expressions = dashboard.exprs.len(), "Received SIGHUP, reloaded dashboard");
                    resolver.update(dashboard.spec);
                    exprs_tx.send_replace(dashboard.exprs);
                }
                Err(e) => warn!("Received SIGHUP, reload failed: {e:#}"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, exiting");
                break;
            }
        }
    }

    Ok(())
}
