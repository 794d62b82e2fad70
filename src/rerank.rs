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

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::RerankerConfig;
use crate::error::EvalError;

pub const RERANK_OVERLAP: &str = "overlap";
pub const RERANK_HTTP: &str = "http";

/// Pairwise relevance model: one score per content, in input order. Higher
/// is more relevant.
pub trait Reranker {
    fn score(&self, query: &str, contents: &[&str]) -> Result<Vec<f32>, EvalError>;
}

pub fn build_reranker(config: &RerankerConfig) -> Result<Box<dyn Reranker>, EvalError> {
    match config.backend.trim().to_lowercase().as_str() {
        RERANK_OVERLAP => Ok(Box::new(OverlapReranker)),
        RERANK_HTTP => Ok(Box::new(HttpReranker::new(config)?)),
        other => Err(EvalError::config(format!(
            "unsupported reranker backend '{other}'; supported: {RERANK_OVERLAP} or {RERANK_HTTP}"
        ))),
    }
}

/// Offline scorer: share of distinct query terms found in the content.
pub struct OverlapReranker;

impl Reranker for OverlapReranker {
    fn score(&self, query: &str, contents: &[&str]) -> Result<Vec<f32>, EvalError> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(vec![0.0; contents.len()]);
        }
        Ok(contents
            .iter()
            .map(|content| {
                let doc_terms = terms(content);
                let shared = query_terms.intersection(&doc_terms).count();
                shared as f32 / query_terms.len() as f32
            })
            .collect())
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Cross-encoder served over HTTP with the text-embeddings-inference
/// `/rerank` contract.
pub struct HttpReranker {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [&'a str],
    raw_scores: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl HttpReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self, EvalError> {
        Self::with_client(config, reqwest::blocking::Client::builder())
    }

    fn with_client(
        config: &RerankerConfig,
        builder: reqwest::blocking::ClientBuilder,
    ) -> Result<Self, EvalError> {
        let client = builder
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| EvalError::rerank(format!("create HTTP client: {err}")))?;
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty());
        Ok(Self {
            client,
            endpoint: rerank_endpoint(&config.url),
            model: config.model.clone(),
            api_key,
        })
    }
}

fn rerank_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/rerank") {
        base.to_string()
    } else {
        format!("{base}/rerank")
    }
}

impl Reranker for HttpReranker {
    fn score(&self, query: &str, contents: &[&str]) -> Result<Vec<f32>, EvalError> {
        let body = RerankRequest {
            query,
            texts: contents,
            raw_scores: false,
            model: self.model.as_deref(),
        };
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .map_err(|err| EvalError::rerank(format!("POST {}: {err}", self.endpoint)))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(EvalError::rerank(format!(
                "POST {} returned {status}: {}",
                self.endpoint,
                text.trim()
            )));
        }
        let hits: Vec<RerankHit> = resp
            .json()
            .map_err(|err| EvalError::rerank(format!("parse rerank response: {err}")))?;
        debug!(candidates = contents.len(), "reranked");
        scores_in_input_order(hits, contents.len())
    }
}

fn scores_in_input_order(hits: Vec<RerankHit>, len: usize) -> Result<Vec<f32>, EvalError> {
    let mut scores: Vec<Option<f32>> = vec![None; len];
    for hit in hits {
        let slot = scores.get_mut(hit.index).ok_or_else(|| {
            EvalError::rerank(format!(
                "rerank response index {} out of range for {len} texts",
                hit.index
            ))
        })?;
        *slot = Some(hit.score);
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(idx, score)| {
            score.ok_or_else(|| EvalError::rerank(format!("rerank response is missing index {idx}")))
        })
        .collect()
}
