use anyhow::{Context, Result};
use clap::Parser;
use scenedex_core::eval::{evaluate, Qrels, Run};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "evaluator")]
#[command(about = "Score a TREC run file against relevance judgments", long_about = None)]
struct Args {
    /// Relevance judgments: queryId iteration docId grade
    qrels: PathBuf,
    /// Run file produced by `indexer rank`
    run: PathBuf,
    /// Metrics file, overwritten
    #[arg(long, default_value = "output.metrics")]
    output: PathBuf,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = Args::parse();

    let qrels = Qrels::load(&args.qrels).context("loading qrels")?;
    let run = Run::load(&args.run).context("loading run")?;
    let metrics = evaluate(&run, &qrels);
    tracing::info!(queries = metrics.num_queries, map = metrics.map, ndcg = metrics.ndcg_10, "run evaluated");

    let run_name = args.run.display().to_string();
    let f = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    metrics.write_report(BufWriter::new(f), &run_name)?;
    Ok(())
}
