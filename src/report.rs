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

//! Run outputs: the per-query detail log (rewritten every run) and the
//! cumulative markdown report (only ever appended to).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::model::Metrics;
use crate::model::QueryDetail;
use crate::output::write_json_file;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub label: String,
    pub timestamp: String,
    pub db_dir: PathBuf,
    pub eval_file: PathBuf,
    pub k: usize,
    /// Set only when re-ranking was enabled.
    pub rerank_pre_k: Option<usize>,
    pub metrics: Metrics,
}

/// Local wall-clock time at minute precision. Falls back to UTC when the
/// local offset cannot be determined.
pub fn run_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

pub fn default_details_path(label: &str) -> PathBuf {
    PathBuf::from(format!("details{label}.json"))
}

pub fn write_details(path: &Path, details: &[QueryDetail]) -> Result<()> {
    write_json_file(path, details)
}

pub fn append_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open report {}", path.display()))?;
    let is_new = file
        .metadata()
        .with_context(|| format!("stat report {}", path.display()))?
        .len()
        == 0;

    let mut text = String::new();
    if is_new {
        text.push_str(&format!("# Retrieval evaluation report - {}\n\n", summary.label));
    }
    text.push_str(&render_section(summary));
    file.write_all(text.as_bytes())
        .with_context(|| format!("append report {}", path.display()))?;
    Ok(())
}

fn render_section(summary: &RunSummary) -> String {
    let k = summary.k;
    let mut out = format!(
        "\n\n---\n\n### Evaluation Run - {} ({})\n\n",
        summary.timestamp, summary.label
    );
    out.push_str(&format!(
        "**Vector DB directory:** `{}`  \n",
        summary.db_dir.display()
    ));
    out.push_str(&format!(
        "**Eval file:** `{}`  \n",
        summary.eval_file.display()
    ));
    out.push_str(&format!("**Top-K (k):** `{k}`  \n"));
    out.push_str(&format!("**Rerank:** `{}`  \n", summary.rerank_pre_k.is_some()));
    if let Some(pre_k) = summary.rerank_pre_k {
        out.push_str(&format!("**Top-pre-K (before rerank):** `{pre_k}`  \n"));
    }
    out.push_str(&format!(
        "\n**Hit@{k} (doc_type):** `{:.3}`  \n",
        summary.metrics.hit_at_k_doc_type
    ));
    out.push_str(&format!(
        "**Avg RankScore@{k} (file-level):** `{:.3}`  \n",
        summary.metrics.avg_rank_score
    ));
    out
}
