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

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use rusqlite::Connection;
use rusqlite::params;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

pub const DIM: usize = 128;

pub const CONTRACT_TEXT: &str = "acme master services agreement termination notice";
pub const PRODUCT_TEXT: &str = "widget pro pricing tiers and discounts";
pub const EMPLOYEE_TEXT: &str = "jane doe senior engineer career history";

pub fn rageval_cmd(config_root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rageval"));
    cmd.env("XDG_CONFIG_HOME", config_root);
    cmd.env("HOME", config_root);
    cmd.env("APPDATA", config_root);
    cmd
}

/// Same feature hashing the index builder uses, so fixture chunks land where
/// the evaluator's query embedding expects them.
fn embed(text: &str) -> Vec<f32> {
    let mut vec = vec![0.0f32; DIM];
    for token in text.split_whitespace() {
        let hash = Sha256::digest(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash[..8]);
        let val = u64::from_le_bytes(bytes);
        let idx = (val as usize) % DIM;
        vec[idx] += if (val & (1 << 63)) != 0 { 1.0 } else { -1.0 };
    }
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vec {
            *v /= norm;
        }
    }
    vec
}

fn to_bytes(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Three single-chunk docs, one per category.
pub fn write_index(db_dir: &Path) {
    fs::create_dir_all(db_dir).expect("db dir");
    let conn = Connection::open(db_dir.join("index.db")).expect("open index");
    conn.execute_batch(
        "CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT);\nCREATE TABLE doc (id TEXT PRIMARY KEY, path TEXT, mtime TEXT, size INTEGER, hash TEXT, tag TEXT, source TEXT, meta TEXT, deleted INTEGER DEFAULT 0);\nCREATE TABLE chunk (rowid INTEGER PRIMARY KEY, id TEXT UNIQUE, doc_id TEXT, offset INTEGER, tokens INTEGER, text TEXT, embedding BLOB, deleted INTEGER DEFAULT 0);",
    )
    .expect("schema");
    for (key, value) in [
        ("schema_version", "1".to_string()),
        ("embedding", "hash".to_string()),
        ("embedding_dim", DIM.to_string()),
    ] {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .expect("meta");
    }
    let docs = [
        ("kb/contracts/acme_msa.md", "contracts", CONTRACT_TEXT),
        ("kb/products/widget_pro.md", "products", PRODUCT_TEXT),
        ("kb/employees/jane_doe.md", "employees", EMPLOYEE_TEXT),
    ];
    for (i, (path, doc_type, text)) in docs.iter().enumerate() {
        let doc_id = format!("doc-{i}");
        let meta = serde_json::json!({ "doc_type": doc_type }).to_string();
        conn.execute(
            "INSERT INTO doc (id, path, meta) VALUES (?1, ?2, ?3)",
            params![doc_id, path, meta],
        )
        .expect("doc");
        conn.execute(
            "INSERT INTO chunk (id, doc_id, offset, tokens, text, embedding) VALUES (?1, ?2, 0, ?3, ?4, ?5)",
            params![
                format!("{doc_id}-0"),
                doc_id,
                text.split_whitespace().count() as i64,
                text,
                to_bytes(&embed(text)),
            ],
        )
        .expect("chunk");
    }
}

pub fn write_queries(path: &Path) {
    let queries = serde_json::json!([
        {
            "id": 1,
            "question": CONTRACT_TEXT,
            "expected_doc_type": "contracts",
            "expected_source_basenames": ["acme_msa.md"]
        },
        {
            "id": "q2",
            "question": PRODUCT_TEXT,
            "expected_doc_type": "products",
            "expected_source_basename": "widget_pro.md"
        },
        {
            "id": 3,
            "question": EMPLOYEE_TEXT,
            "expected_doc_type": "employees"
        }
    ]);
    fs::write(path, serde_json::to_string_pretty(&queries).expect("json")).expect("write queries");
}

pub fn run_stdout_json(cmd: &mut Command, cwd: &Path) -> Value {
    let output = cmd.current_dir(cwd).output().expect("run command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("parse json")
}
