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

//! Retrieval strategies consumed by the evaluator.
//!
//! A run picks exactly one strategy up front: [`DirectRetriever`] asks the
//! index for the top `k`, [`RerankRetriever`] over-fetches `pre_k`
//! candidates and keeps the `k` the re-ranker likes best.

use tracing::debug;

use crate::error::EvalError;
use crate::model::RetrievedDocument;
use crate::rerank::Reranker;

/// Similarity search over a pre-built index, best match first.
pub trait VectorSearch {
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>, EvalError>;
}

pub trait Retriever {
    /// At most [`Retriever::top_k`] documents, best first.
    fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, EvalError>;

    fn top_k(&self) -> usize;
}

pub struct DirectRetriever<'a, S: VectorSearch + ?Sized> {
    search: &'a S,
    k: usize,
}

impl<'a, S: VectorSearch + ?Sized> DirectRetriever<'a, S> {
    pub fn new(search: &'a S, k: usize) -> Self {
        Self { search, k }
    }
}

impl<S: VectorSearch + ?Sized> Retriever for DirectRetriever<'_, S> {
    fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, EvalError> {
        let mut docs = self.search.similarity_search(query, self.k)?;
        docs.truncate(self.k);
        Ok(docs)
    }

    fn top_k(&self) -> usize {
        self.k
    }
}

pub struct RerankRetriever<'a, S: VectorSearch + ?Sized, R: Reranker + ?Sized> {
    search: &'a S,
    reranker: &'a R,
    k: usize,
    pre_k: usize,
}

impl<'a, S: VectorSearch + ?Sized, R: Reranker + ?Sized> RerankRetriever<'a, S, R> {
    /// `pre_k` below `k` is raised to `k`.
    pub fn new(search: &'a S, reranker: &'a R, k: usize, pre_k: usize) -> Self {
        Self {
            search,
            reranker,
            k,
            pre_k: effective_pre_k(k, pre_k),
        }
    }

    pub fn pre_k(&self) -> usize {
        self.pre_k
    }
}

pub fn effective_pre_k(k: usize, pre_k: usize) -> usize {
    pre_k.max(k)
}

impl<S: VectorSearch + ?Sized, R: Reranker + ?Sized> Retriever for RerankRetriever<'_, S, R> {
    fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, EvalError> {
        let candidates = self.search.similarity_search(query, self.pre_k)?;
        if candidates.is_empty() {
            debug!("no candidates, skipping rerank");
            return Ok(Vec::new());
        }

        let contents: Vec<&str> = candidates.iter().map(|d| d.content.as_str()).collect();
        let scores = self.reranker.score(query, &contents)?;
        if scores.len() != candidates.len() {
            return Err(EvalError::rerank(format!(
                "reranker returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }

        let mut scored: Vec<(f32, RetrievedDocument)> = scores.into_iter().zip(candidates).collect();
        scored.sort_by(|a, b| rank_key(b.0).total_cmp(&rank_key(a.0)));
        scored.truncate(self.k);
        Ok(scored.into_iter().map(|(_, doc)| doc).collect())
    }

    fn top_k(&self) -> usize {
        self.k
    }
}

/// NaN sorts below every real score.
pub(crate) fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}
