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

//! Shared domain types used across loading, retrieval, scoring, and reporting.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

pub const UNKNOWN_DOC_TYPE: &str = "unknown";

/// Query identifier as written in the eval file. Numbers stay numbers in the
/// detail log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryId {
    Num(i64),
    Text(String),
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryId::Num(n) => write!(f, "{n}"),
            QueryId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalQuery {
    pub id: QueryId,
    pub question: String,
    pub expected_doc_type: Option<String>,
    /// Duplicate-free, in first-seen order.
    pub expected_source_basenames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub content: String,
    pub doc_type: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueryResult {
    pub doc_type_hit: bool,
    pub file_hit: bool,
    pub file_rank: Option<usize>,
    pub rank_score: f64,
}

impl QueryResult {
    pub fn miss() -> Self {
        Self {
            doc_type_hit: false,
            file_hit: false,
            file_rank: None,
            rank_score: 0.0,
        }
    }
}

/// One record of the detail log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDetail {
    pub id: QueryId,
    pub question: String,
    pub expected_doc_type: Option<String>,
    pub expected_source_basenames: Vec<String>,
    pub retrieved_doc_types: Vec<String>,
    pub retrieved_sources: Vec<String>,
    #[serde(flatten)]
    pub result: QueryResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub num_queries: usize,
    pub hit_at_k_doc_type: f64,
    pub avg_rank_score: f64,
}
