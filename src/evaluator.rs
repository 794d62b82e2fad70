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

use tracing::debug;

use crate::error::EvalError;
use crate::model::EvalQuery;
use crate::model::Metrics;
use crate::model::QueryDetail;
use crate::model::QueryResult;
use crate::retriever::Retriever;
use crate::scorer::score_query;

#[derive(Debug, Clone)]
pub struct EvalRun {
    pub metrics: Metrics,
    pub details: Vec<QueryDetail>,
}

/// Runs every query in order, one at a time. The first retrieval failure
/// aborts the whole batch.
pub fn evaluate(retriever: &dyn Retriever, queries: &[EvalQuery]) -> Result<EvalRun, EvalError> {
    let k = retriever.top_k();
    let mut details = Vec::with_capacity(queries.len());

    for query in queries {
        let retrieved = retriever.retrieve(&query.question)?;
        let result = if retrieved.is_empty() {
            QueryResult::miss()
        } else {
            score_query(query, &retrieved, k)
        };
        debug!(
            id = %query.id,
            retrieved = retrieved.len(),
            doc_type_hit = result.doc_type_hit,
            file_rank = ?result.file_rank,
            rank_score = result.rank_score,
            "scored query"
        );

        let (retrieved_doc_types, retrieved_sources): (Vec<String>, Vec<String>) = retrieved
            .into_iter()
            .map(|doc| (doc.doc_type, doc.source))
            .unzip();
        details.push(QueryDetail {
            id: query.id.clone(),
            question: query.question.clone(),
            expected_doc_type: query.expected_doc_type.clone(),
            expected_source_basenames: query.expected_source_basenames.clone(),
            retrieved_doc_types,
            retrieved_sources,
            result,
        });
    }

    let metrics = aggregate(details.iter().map(|d| &d.result));
    Ok(EvalRun { metrics, details })
}

/// Both fractions are 0.0 for an empty batch.
pub fn aggregate<'a>(results: impl IntoIterator<Item = &'a QueryResult>) -> Metrics {
    let mut num_queries = 0usize;
    let mut doc_type_hits = 0usize;
    let mut rank_total = 0.0f64;
    for result in results {
        num_queries += 1;
        if result.doc_type_hit {
            doc_type_hits += 1;
        }
        rank_total += result.rank_score;
    }
    if num_queries == 0 {
        return Metrics::default();
    }
    Metrics {
        num_queries,
        hit_at_k_doc_type: doc_type_hits as f64 / num_queries as f64,
        avg_rank_score: rank_total / num_queries as f64,
    }
}
