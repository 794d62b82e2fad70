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

//! Typed failures surfaced by the evaluator and its backends.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    /// The query file is missing, unreadable, or not the expected JSON shape.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The vector index could not be opened or read.
    #[error("index error: {0}")]
    Index(String),

    /// The re-ranking backend failed or answered with something unusable.
    #[error("rerank error: {0}")]
    Rerank(String),

    #[error("config error: {0}")]
    Config(String),
}

impl EvalError {
    pub fn data_format(msg: impl Into<String>) -> Self {
        Self::DataFormat(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    pub fn rerank(msg: impl Into<String>) -> Self {
        Self::Rerank(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
