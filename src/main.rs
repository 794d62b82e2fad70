// Copyright 2026 Rageval Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod cli;
mod config;
mod embed;
mod error;
mod evaluator;
mod index;
mod model;
mod output;
mod queries;
mod report;
mod rerank;
mod retriever;
mod scorer;

use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing::info;

use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::EvalArgs;
use crate::cli::StatsArgs;
use crate::config::Config;
use crate::index::VectorIndex;
use crate::output::print_json;
use crate::report::RunSummary;
use crate::retriever::DirectRetriever;
use crate::retriever::RerankRetriever;
use crate::retriever::effective_pre_k;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Read the local offset while the process is still single-threaded.
    let timestamp = report::run_timestamp();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let config = config::load_global_config()?;
    match cli.command {
        Commands::Eval(args) => cmd_eval(args, config, timestamp),
        Commands::Stats(args) => cmd_stats(args, config),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_eval(args: EvalArgs, config: Config, timestamp: String) -> Result<()> {
    let db_dir = args.db_dir.unwrap_or(config.db_dir);
    let eval_file = args.eval_file.unwrap_or(config.eval_file);
    let k = args.k.unwrap_or(config.k);
    let label = args.label.unwrap_or(config.label);
    let report_path = args.report.unwrap_or(config.report);
    let details_path = args
        .details
        .unwrap_or_else(|| report::default_details_path(&label));
    if k == 0 {
        anyhow::bail!("k must be at least 1");
    }
    let pre_k = args
        .rerank
        .then(|| effective_pre_k(k, args.pre_k.unwrap_or(config.pre_k)));

    let queries = queries::load_queries(&eval_file)?;
    info!(queries = queries.len(), file = %eval_file.display(), "loaded eval queries");

    let index = VectorIndex::open(&db_dir, &config.index_file)?;
    info!(index = %index.path().display(), "opened vector index");

    let run = match pre_k {
        Some(pre_k) => {
            let reranker = rerank::build_reranker(&config.reranker)?;
            let retriever = RerankRetriever::new(&index, reranker.as_ref(), k, pre_k);
            info!(
                k,
                pre_k = retriever.pre_k(),
                backend = %config.reranker.backend,
                "retrieving with rerank"
            );
            evaluator::evaluate(&retriever, &queries)?
        }
        None => {
            info!(k, "retrieving with similarity search");
            evaluator::evaluate(&DirectRetriever::new(&index, k), &queries)?
        }
    };

    report::write_details(&details_path, &run.details)?;
    info!(path = %details_path.display(), "wrote detail log");

    print_json(&run.metrics)?;

    let summary = RunSummary {
        label,
        timestamp,
        db_dir,
        eval_file,
        k,
        rerank_pre_k: pre_k,
        metrics: run.metrics,
    };
    report::append_report(&report_path, &summary)?;
    info!(path = %report_path.display(), "appended report entry");
    Ok(())
}

fn cmd_stats(args: StatsArgs, config: Config) -> Result<()> {
    let db_dir: PathBuf = args.db_dir.unwrap_or(config.db_dir);
    let index = VectorIndex::open(&db_dir, &config.index_file)
        .with_context(|| format!("open index in {}", db_dir.display()))?;
    let stats = index.stats()?;

    if args.json {
        print_json(&stats)?;
    } else {
        println!("Index: {}", index.path().display());
        println!("Docs: {}", stats.doc_count);
        println!("Chunks: {}", stats.chunk_count);
        println!("Size: {} bytes", stats.index_size_bytes);
        println!("Embedding: {} ({} dims)", stats.embedding, stats.embedding_dim);
    }
    Ok(())
}
