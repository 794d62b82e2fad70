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

//! Per-query scoring: doc-type Hit@k and the linear RankScore@k.
//!
//! RankScore rewards the earliest retrieved document whose file basename is
//! in the ground-truth set: index 0 scores `1.0`, index `k - 1` scores `1/k`.
//! Queries without file-level ground truth abstain and score `0.0`.

use crate::model::EvalQuery;
use crate::model::QueryResult;
use crate::model::RetrievedDocument;

pub fn score_query(query: &EvalQuery, retrieved: &[RetrievedDocument], k: usize) -> QueryResult {
    let doc_type_hit = match query.expected_doc_type.as_deref() {
        Some(expected) if !expected.is_empty() => {
            retrieved.iter().any(|doc| doc.doc_type == expected)
        }
        _ => false,
    };

    let file_rank = best_file_rank(&query.expected_source_basenames, retrieved);
    let rank_score = file_rank.map_or(0.0, |rank| rank_score(rank, k));

    QueryResult {
        doc_type_hit,
        file_hit: file_rank.is_some(),
        file_rank,
        rank_score,
    }
}

/// Lowest index whose source basename is expected.
fn best_file_rank(expected: &[String], retrieved: &[RetrievedDocument]) -> Option<usize> {
    if expected.is_empty() {
        return None;
    }
    retrieved
        .iter()
        .enumerate()
        .filter(|(_, doc)| !doc.source.is_empty())
        .find(|(_, doc)| {
            let base = basename(&doc.source);
            expected.iter().any(|name| name == base)
        })
        .map(|(idx, _)| idx)
}

fn rank_score(rank: usize, k: usize) -> f64 {
    if k == 0 || rank >= k {
        return 0.0;
    }
    (k - rank) as f64 / k as f64
}

/// Text after the last `/`. Trailing separators leave it empty.
fn basename(source: &str) -> &str {
    source.rsplit('/').next().unwrap_or(source)
}
