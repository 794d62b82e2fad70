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
use std::path::Path;

use serde::Deserialize;

use crate::error::EvalError;
use crate::model::EvalQuery;
use crate::model::QueryId;

#[derive(Debug, Deserialize)]
struct RawQuery {
    id: QueryId,
    question: String,
    #[serde(default)]
    expected_doc_type: Option<String>,
    #[serde(default)]
    expected_source_basenames: Option<Vec<String>>,
    #[serde(default)]
    expected_source_basename: Option<String>,
}

impl RawQuery {
    fn normalize(self) -> EvalQuery {
        let mut basenames: Vec<String> = Vec::new();
        let legacy = self.expected_source_basename.filter(|name| !name.is_empty());
        for name in self
            .expected_source_basenames
            .unwrap_or_default()
            .into_iter()
            .chain(legacy)
        {
            if !basenames.contains(&name) {
                basenames.push(name);
            }
        }
        EvalQuery {
            id: self.id,
            question: self.question,
            expected_doc_type: self.expected_doc_type,
            expected_source_basenames: basenames,
        }
    }
}

/// Reads the eval file: one JSON document holding an array of queries,
/// whatever its extension says.
pub fn load_queries(path: &Path) -> Result<Vec<EvalQuery>, EvalError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| EvalError::data_format(format!("read {}: {err}", path.display())))?;
    parse_queries(&text)
        .map_err(|err| EvalError::data_format(format!("{}: {err}", path.display())))
}

fn parse_queries(text: &str) -> Result<Vec<EvalQuery>, String> {
    let raw: Vec<RawQuery> = serde_json::from_str(text).map_err(|err| err.to_string())?;
    let mut seen = HashSet::new();
    let mut queries = Vec::with_capacity(raw.len());
    for item in raw {
        if !seen.insert(item.id.clone()) {
            return Err(format!("duplicate query id {}", item.id));
        }
        queries.push(item.normalize());
    }
    Ok(queries)
}
