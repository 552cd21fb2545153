use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use scenedex_core::config::RankingConfig;
use scenedex_core::output::{save_matches, save_run};
use scenedex_core::query::{run_match, Granularity, MatchQuery, THRESHOLD_SEPARATOR};
use scenedex_core::rank::{rank_queries, Bm25Params, DirichletParams, RankingModel};
use scenedex_core::IndexStore;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index a scene corpus and run match or ranked queries over it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Scenes containing any of the terms
    TermList,
    /// Scenes containing the terms as a consecutive phrase
    Phrase,
    /// Scenes where a term before the `-gt` marker outnumbers every term after it
    Threshold,
}

#[derive(Subcommand)]
enum Commands {
    /// Match terms against the corpus and write the matching ids
    Match {
        /// Corpus JSON file
        corpus: PathBuf,
        /// Report play ids instead of scene ids
        #[arg(long, default_value_t = false)]
        play: bool,
        #[arg(long, value_enum, default_value_t = Mode::TermList)]
        mode: Mode,
        /// Output file, overwritten
        #[arg(long, default_value = "output.txt")]
        output: PathBuf,
        /// Query terms, given after `--`; threshold mode splits them at `-gt`
        #[arg(required = true, last = true)]
        terms: Vec<String>,
    },
    /// Rank the configured query set and write a TREC run file
    Rank {
        /// Corpus JSON file
        corpus: PathBuf,
        /// Query set and run tag
        #[arg(long, default_value = "queries.json")]
        queries: PathBuf,
        /// Output run file; defaults to bm25.trecrun or ql.trecrun
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(subcommand)]
        model: ModelArgs,
    },
    /// Print corpus statistics as JSON
    Stats {
        /// Corpus JSON file
        corpus: PathBuf,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum ModelArgs {
    /// Okapi BM25
    Bm25 {
        #[arg(long, default_value_t = 1.2)]
        k1: f64,
        #[arg(long, default_value_t = 100.0)]
        k2: f64,
        #[arg(long, default_value_t = 0.75)]
        b: f64,
    },
    /// Query likelihood with Dirichlet smoothing
    Ql {
        #[arg(long, default_value_t = 2000.0)]
        mu: f64,
    },
}

impl From<ModelArgs> for RankingModel {
    fn from(args: ModelArgs) -> Self {
        match args {
            ModelArgs::Bm25 { k1, k2, b } => RankingModel::Bm25(Bm25Params { k1, k2, b }),
            ModelArgs::Ql { mu } => RankingModel::QueryLikelihood(DirichletParams { mu }),
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Match { corpus, play, mode, output, terms } => {
            let query = build_query(mode, play, terms).unwrap_or_else(|e| e.exit());
            match_corpus(&corpus, query, play, &output)
        }
        Commands::Rank { corpus, queries, output, model } => rank_corpus(&corpus, &queries, output, model.into()),
        Commands::Stats { corpus } => print_stats(&corpus),
    }
}

/// Usage errors surface as clap errors so they exit 2 before the corpus is read.
fn build_query(mode: Mode, play: bool, terms: Vec<String>) -> Result<MatchQuery, clap::Error> {
    match mode {
        Mode::TermList => Ok(MatchQuery::Terms(terms)),
        Mode::Phrase => Ok(MatchQuery::Phrase(terms)),
        Mode::Threshold if play => {
            Err(Cli::command().error(ErrorKind::ArgumentConflict, "threshold mode cannot report play ids"))
        }
        Mode::Threshold => match MatchQuery::threshold_from_terms(&terms) {
            MatchQuery::Threshold { greater, .. } if greater.is_empty() => Err(Cli::command().error(
                ErrorKind::ValueValidation,
                format!("threshold mode needs at least one term before `{THRESHOLD_SEPARATOR}`"),
            )),
            query => Ok(query),
        },
    }
}

fn match_corpus(corpus: &Path, query: MatchQuery, play: bool, output: &Path) -> Result<()> {
    let store = IndexStore::open(corpus).context("loading corpus")?;
    let granularity = if play { Granularity::Play } else { Granularity::Scene };
    let ids = run_match(&store, &query, granularity);
    tracing::info!(matches = ids.len(), "match complete");
    save_matches(output, &ids).with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

fn rank_corpus(corpus: &Path, queries: &Path, output: Option<PathBuf>, model: RankingModel) -> Result<()> {
    model.validate().context("invalid model parameters")?;
    let config = RankingConfig::load(queries).context("loading query set")?;
    let queries = config.queries().context("validating query set")?;
    let store = IndexStore::open(corpus).context("loading corpus")?;

    let runs = rank_queries(&store, &model, &queries);
    let output = output.unwrap_or_else(|| PathBuf::from(model.default_output()));
    let run_tag = model.run_tag(&config.run_tag);
    save_run(&output, &store, &runs, &run_tag).with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(output = %output.display(), run_tag = %run_tag, "ranking complete");
    Ok(())
}

fn print_stats(corpus: &Path) -> Result<()> {
    let store = IndexStore::open(corpus).context("loading corpus")?;
    let json = serde_json::to_string_pretty(&store.summary())?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_args(args: &[&str]) -> Result<(bool, Mode, Vec<String>), clap::Error> {
        let cli = Cli::try_parse_from(["indexer", "match", "corpus.json"].iter().chain(args).copied())?;
        match cli.command {
            Commands::Match { play, mode, terms, .. } => Ok((play, mode, terms)),
            _ => panic!("expected the match subcommand"),
        }
    }

    #[test]
    fn flags_are_parsed_before_the_term_separator() {
        let (play, mode, terms) = match_args(&["--play", "--mode", "phrase", "--", "the", "king"]).unwrap();
        assert!(play);
        assert_eq!(mode, Mode::Phrase);
        assert_eq!(terms, vec!["the", "king"]);
    }

    #[test]
    fn terms_without_separator_are_rejected() {
        assert!(match_args(&["the", "--play"]).is_err());
        assert!(match_args(&["--play"]).is_err());
    }

    #[test]
    fn threshold_marker_is_a_literal_term() {
        let (play, mode, terms) = match_args(&["--mode", "threshold", "--", "the", "-gt", "king"]).unwrap();
        assert_eq!(terms, vec!["the", "-gt", "king"]);
        assert_eq!(
            build_query(mode, play, terms).unwrap(),
            MatchQuery::Threshold { greater: vec!["the".into()], lesser: vec!["king".into()] }
        );
    }

    #[test]
    fn threshold_with_play_ids_is_a_conflict() {
        let (play, mode, terms) = match_args(&["--mode", "threshold", "--play", "--", "the", "-gt", "king"]).unwrap();
        let err = build_query(mode, play, terms).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn threshold_needs_a_greater_term() {
        let (play, mode, terms) = match_args(&["--mode", "threshold", "--", "-gt", "king"]).unwrap();
        let err = build_query(mode, play, terms).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rank_defaults_follow_the_model() {
        let cli = Cli::try_parse_from(["indexer", "rank", "corpus.json", "bm25", "--k1", "2"]).unwrap();
        let Commands::Rank { queries, output, model, .. } = cli.command else {
            panic!("expected the rank subcommand");
        };
        assert_eq!(queries, PathBuf::from("queries.json"));
        assert!(output.is_none());
        assert_eq!(RankingModel::from(model), RankingModel::Bm25(Bm25Params { k1: 2.0, k2: 100.0, b: 0.75 }));
    }
}
