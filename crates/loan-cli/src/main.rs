use anyhow::Context;
use clap::Parser;
use loan_core::{config::Config, predictor::Predictor};
use serde_json::Value;
use std::io::{self, Read, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Reads one loan application (JSON object) on stdin, prints one verdict (JSON) on stdout.
///
/// The model and label encoders are loaded from the directory holding this executable.
/// Takes no options besides `--help` and `--version`; other arguments are a usage error.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {}

fn main() -> anyhow::Result<()> {
    let _args = Args::parse();

    // stdout carries the verdict only
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let span = tracing::info_span!("loan-predict", trace_id = %Uuid::new_v4());
    let _enter = span.enter();

    let cfg = Config::default();
    let predictor = Predictor::load(&cfg).context("load model artifacts")?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("read stdin")?;
    // syntax errors are fatal; a well-formed non-object gets the failure verdict
    let record: Value = serde_json::from_str(&input).context("parse input record as JSON")?;

    let verdict = predictor.predict_value(&record);

    let mut out = io::stdout().lock();
    serde_json::to_writer(&mut out, &verdict)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
