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

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "rageval", version, about = "Retrieval quality evaluation for RAG indexes")]
pub struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a labeled query set against the vector index
    Eval(EvalArgs),

    /// Show vector index stats
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Directory holding the vector index
    #[arg(long)]
    pub db_dir: Option<PathBuf>,

    /// JSON array of eval queries
    #[arg(long)]
    pub eval_file: Option<PathBuf>,

    /// Top-k for retrieval (and after rerank)
    #[arg(long)]
    pub k: Option<usize>,

    /// Re-rank similarity candidates before keeping the top-k
    #[arg(long)]
    pub rerank: bool,

    /// Candidates fetched before rerank (only used with --rerank)
    #[arg(long)]
    pub pre_k: Option<usize>,

    /// Run label (baseline / overlap / rerank / ...)
    #[arg(long)]
    pub label: Option<String>,

    /// Markdown report to append to
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Detail log path (defaults to details<label>.json)
    #[arg(long)]
    pub details: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Directory holding the vector index
    #[arg(long)]
    pub db_dir: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}
