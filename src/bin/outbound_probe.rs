//! outbound-probe: run resilient calls against one URL and report the outcome
//!
//! Usage:
//!   outbound-probe <url> [--method M] [--retries N] [--timeout-ms N] [--repeat N] [--config file.yaml]
//!
//! Exit codes: 0 when the last call succeeded, 1 when it failed, 2 on usage errors.

use anyhow::{bail, Context};
use outbound_resilience::{
    ClientConfig, Method, PolicyOverrides, RequestDescriptor, ResilientClientBuilder,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct Args {
    url: String,
    method: Method,
    retries: Option<u32>,
    timeout_ms: Option<u64>,
    repeat: u32,
    config: Option<String>,
}

fn print_usage() {
    println!(
        r#"outbound-probe: resilient outbound call probe

USAGE:
    outbound-probe <url> [OPTIONS]

OPTIONS:
    --method <M>          HTTP method (default GET)
    --retries <N>         Retries beyond the first attempt
    --timeout-ms <N>      Per-attempt deadline in milliseconds
    --repeat <N>          Number of logical calls to make (default 1)
    --config <file>       YAML client config (retry + breaker sections)
    -h, --help            Show this help message

ENVIRONMENT:
    RUST_LOG              Log filter, e.g. outbound_resilience=debug
    OUTBOUND_*            Config overrides (see ClientConfig::apply_env)"#
    );
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Args>> {
    let mut url = None;
    let mut method = Method::Get;
    let mut retries = None;
    let mut timeout_ms = None;
    let mut repeat = 1;
    let mut config = None;

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .with_context(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--method" => method = value("--method")?.parse::<Method>()?,
            "--retries" => retries = Some(value("--retries")?.parse::<u32>().context("--retries")?),
            "--timeout-ms" => {
                timeout_ms = Some(value("--timeout-ms")?.parse::<u64>().context("--timeout-ms")?)
            }
            "--repeat" => repeat = value("--repeat")?.parse::<u32>().context("--repeat")?,
            "--config" => config = Some(value("--config")?),
            other if other.starts_with("--") => bail!("unknown option: {other}"),
            other => {
                if url.is_some() {
                    bail!("unexpected argument: {other}");
                }
                url = Some(other.to_string());
            }
        }
    }

    let Some(url) = url else {
        bail!("missing <url>");
    };
    Ok(Some(Args {
        url,
        method,
        retries,
        timeout_ms,
        repeat: repeat.max(1),
        config,
    }))
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_path(path)
            .with_context(|| format!("loading config from {path}"))?,
        None => ClientConfig::default(),
    };
    config.apply_env()?;

    let client = ResilientClientBuilder::new().config(&config).build()?;

    let mut overrides = PolicyOverrides::new();
    if let Some(n) = args.retries {
        overrides = overrides.with_max_retries(n);
    }
    if let Some(ms) = args.timeout_ms {
        overrides = overrides.with_timeout(Duration::from_millis(ms));
    }

    let mut last_ok = false;
    for call in 1..=args.repeat {
        let request = RequestDescriptor::new(args.method, &args.url)?;
        match client.request_with_stats(request, overrides.clone()).await {
            Ok((resp, stats)) => {
                last_ok = true;
                println!(
                    "call {call}: HTTP {} after {} attempt(s) in {}ms [{}]",
                    resp.status(),
                    stats.attempts,
                    stats.duration_ms,
                    stats.client_request_id
                );
            }
            Err(e) => {
                last_ok = false;
                println!(
                    "call {call}: {} [{} {}] attempts={} timeout={} network={}",
                    e,
                    e.kind().code(),
                    e.kind().name(),
                    e.attempts(),
                    e.is_timeout(),
                    e.is_network_error()
                );
            }
        }
    }

    if let Some(registry) = client.breakers() {
        for s in registry.snapshots() {
            println!(
                "breaker {}: {} failures={}/{} open_remaining_ms={}",
                s.destination,
                s.state.as_str(),
                s.failure_count,
                s.failure_threshold,
                s.open_remaining_ms
                    .map(|ms| ms.to_string())
                    .unwrap_or_else(|| "-".into())
            );
        }
    }
    Ok(last_ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(Some(a)) => a,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            eprintln!();
            print_usage();
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
