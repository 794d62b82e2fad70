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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use fs2::FileExt;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::embed::Embedder;
use crate::embed::EmbeddingSpec;
use crate::embed::build_embedder;
use crate::embed::cosine_similarity;
use crate::embed::from_bytes;
use crate::embed::resolve_embedding;
use crate::error::EvalError;
use crate::model::RetrievedDocument;
use crate::model::UNKNOWN_DOC_TYPE;
use crate::retriever::VectorSearch;
use crate::retriever::rank_key;

const SCHEMA_VERSION: i64 = 1;
const DEFAULT_EMBEDDING_DIM: usize = 256;
const LOCK_WAIT: Duration = Duration::from_millis(5000);

/// Pre-built vector index, opened read-only for the length of a run.
pub struct VectorIndex {
    conn: Connection,
    path: PathBuf,
    embedding: EmbeddingSpec,
    embedder: Box<dyn Embedder>,
    _lock: File,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub doc_count: i64,
    pub chunk_count: i64,
    pub index_size_bytes: u64,
    pub embedding: String,
    pub embedding_dim: usize,
}

#[derive(Debug)]
struct ScoredChunk {
    score: f32,
    id: String,
    offset: i64,
    path: String,
    doc: RetrievedDocument,
}

fn sql_err(what: &'static str) -> impl FnOnce(rusqlite::Error) -> EvalError {
    move |err| EvalError::index(format!("{what}: {err}"))
}

impl VectorIndex {
    pub fn open(db_dir: &Path, index_file: &str) -> Result<Self, EvalError> {
        let path = db_dir.join(index_file);
        if !path.is_file() {
            return Err(EvalError::index(format!(
                "vector index not found at {}",
                path.display()
            )));
        }
        let lock = Self::acquire_shared_lock(&path, LOCK_WAIT)?;
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|err| EvalError::index(format!("open {}: {err}", path.display())))?;
        conn.busy_timeout(Duration::from_millis(5000))
            .map_err(sql_err("set busy timeout"))?;

        let version = Self::meta(&conn, "schema_version")?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);
        if version != SCHEMA_VERSION {
            return Err(EvalError::index(format!(
                "index schema version {version} is not supported (expected {SCHEMA_VERSION})"
            )));
        }
        let name = Self::meta(&conn, "embedding")?.unwrap_or_else(|| "hash".to_string());
        let dim = match Self::meta(&conn, "embedding_dim")? {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| EvalError::index(format!("invalid embedding_dim '{raw}'")))?,
            None => DEFAULT_EMBEDDING_DIM,
        };
        let embedding = resolve_embedding(&name, dim)?;

        Ok(Self {
            conn,
            path,
            embedding,
            embedder: build_embedder(embedding),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path_for(path: &Path) -> Result<PathBuf, EvalError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize());
        let mut dir = std::env::temp_dir();
        dir.push("rageval");
        fs::create_dir_all(&dir).map_err(|err| {
            EvalError::index(format!("create lock dir {}: {err}", dir.display()))
        })?;
        Ok(dir.join(format!("index-{hash}.lock")))
    }

    /// Readers share the lock, so parallel runs over one index are fine; a
    /// writer rebuilding the index holds it exclusively.
    fn acquire_shared_lock(path: &Path, wait: Duration) -> Result<File, EvalError> {
        let lock_path = Self::lock_path_for(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|err| {
                EvalError::index(format!("open lock file {}: {err}", lock_path.display()))
            })?;
        let deadline = Instant::now() + wait;
        loop {
            match FileExt::try_lock_shared(&file) {
                Ok(()) => return Ok(file),
                Err(_) if Instant::now() >= deadline => {
                    return Err(EvalError::index(format!(
                        "index is locked for writing; another process may be rebuilding {}",
                        path.display()
                    )));
                }
                Err(_) => sleep(Duration::from_millis(50)),
            }
        }
    }

    fn meta(conn: &Connection, key: &str) -> Result<Option<String>, EvalError> {
        let has_meta: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='meta'",
                [],
                |row| row.get(0),
            )
            .map_err(sql_err("check meta table"))?;
        if has_meta == 0 {
            return Ok(None);
        }
        conn.query_row("SELECT value FROM meta WHERE key=?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(sql_err("read meta"))
    }

    pub fn stats(&self) -> Result<IndexStats, EvalError> {
        let doc_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM doc WHERE deleted=0", [], |row| {
                row.get(0)
            })
            .map_err(sql_err("count docs"))?;
        let chunk_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunk WHERE deleted=0", [], |row| {
                row.get(0)
            })
            .map_err(sql_err("count chunks"))?;
        let index_size_bytes = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        Ok(IndexStats {
            doc_count,
            chunk_count,
            index_size_bytes,
            embedding: self.embedding.name.to_string(),
            embedding_dim: self.embedding.dim,
        })
    }

    fn scan(&self, query_vec: &[f32]) -> Result<Vec<ScoredChunk>, EvalError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT chunk.id, chunk.offset, chunk.text, chunk.embedding,\n                doc.path, doc.tag, doc.meta\n         FROM chunk\n         JOIN doc ON doc.id = chunk.doc_id\n         WHERE chunk.deleted=0 AND doc.deleted=0",
            )
            .map_err(sql_err("prepare similarity scan"))?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let offset: i64 = row.get(1)?;
                let text: Option<String> = row.get(2)?;
                let embedding: Vec<u8> = row.get(3)?;
                let path: Option<String> = row.get(4)?;
                let tag: Option<String> = row.get(5)?;
                let meta: Option<String> = row.get(6)?;
                Ok((id, offset, text, embedding, path, tag, meta))
            })
            .map_err(sql_err("similarity scan"))?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, offset, text, embedding, path, tag, meta) =
                row.map_err(sql_err("read chunk row"))?;
            let score = cosine_similarity(query_vec, &from_bytes(&embedding));
            let path = path.unwrap_or_default();
            scored.push(ScoredChunk {
                score,
                id,
                offset,
                doc: RetrievedDocument {
                    content: text.unwrap_or_default(),
                    doc_type: doc_type_of(meta.as_deref(), tag.as_deref()),
                    source: path.clone(),
                },
                path,
            });
        }
        Ok(scored)
    }
}

impl VectorSearch for VectorIndex {
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>, EvalError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed(query);
        let mut scored = self.scan(&query_vec)?;
        sort_by_score_with_tiebreak(&mut scored);
        scored.truncate(k);
        Ok(scored.into_iter().map(|item| item.doc).collect())
    }
}

/// `meta.doc_type` wins, then the ingestion tag.
fn doc_type_of(meta: Option<&str>, tag: Option<&str>) -> String {
    let from_meta = meta
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .and_then(|value| {
            value
                .get("doc_type")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty());
    from_meta
        .or_else(|| tag.filter(|t| !t.is_empty()).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_DOC_TYPE.to_string())
}

fn sort_by_score_with_tiebreak(items: &mut [ScoredChunk]) {
    items.sort_by(|a, b| {
        rank_key(b.score)
            .total_cmp(&rank_key(a.score))
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.offset.cmp(&b.offset))
            .then_with(|| a.id.cmp(&b.id))
    });
}


#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::fixture::FixtureDoc;
    use super::fixture::write_index;
    use super::*;

    fn corpus(dir: &Path) {
        write_index(
            dir,
            &[
                FixtureDoc {
                    path: "kb/contracts/acme.md",
                    tag: Some("legacy"),
                    meta: Some(r#"{"doc_type": "contracts"}"#),
                    chunks: &["acme master services agreement", "termination clause"],
                },
                FixtureDoc {
                    path: "kb/products/widget.md",
                    tag: Some("products"),
                    meta: None,
                    chunks: &["widget pricing tiers"],
                },
                FixtureDoc {
                    path: "kb/misc/notes.md",
                    tag: None,
                    meta: None,
                    chunks: &["random meeting notes"],
                },
            ],
        );
    }

    #[test]
    fn nearest_chunk_comes_first() -> Result<(), EvalError> {
        let dir = tempdir().expect("tempdir");
        corpus(dir.path());
        let index = VectorIndex::open(dir.path(), "index.db")?;

        let docs = index.similarity_search("widget pricing tiers", 2)?;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "kb/products/widget.md");
        assert_eq!(docs[0].doc_type, "products");
        assert_eq!(docs[0].content, "widget pricing tiers");
        Ok(())
    }

    #[test]
    fn doc_type_prefers_meta_then_tag_then_unknown() -> Result<(), EvalError> {
        let dir = tempdir().expect("tempdir");
        corpus(dir.path());
        let index = VectorIndex::open(dir.path(), "index.db")?;

        let docs = index.similarity_search("anything", 10)?;
        assert_eq!(docs.len(), 4);
        let type_of = |source: &str| {
            docs.iter()
                .find(|d| d.source == source)
                .map(|d| d.doc_type.clone())
                .expect("doc present")
        };
        assert_eq!(type_of("kb/contracts/acme.md"), "contracts");
        assert_eq!(type_of("kb/products/widget.md"), "products");
        assert_eq!(type_of("kb/misc/notes.md"), UNKNOWN_DOC_TYPE);
        Ok(())
    }

    #[test]
    fn search_is_deterministic() -> Result<(), EvalError> {
        let dir = tempdir().expect("tempdir");
        corpus(dir.path());
        let index = VectorIndex::open(dir.path(), "index.db")?;
        let first = index.similarity_search("termination", 3)?;
        for _ in 0..5 {
            assert_eq!(index.similarity_search("termination", 3)?, first);
        }
        Ok(())
    }

    #[test]
    fn missing_index_is_an_index_error() {
        let dir = tempdir().expect("tempdir");
        let err = VectorIndex::open(dir.path(), "index.db")
            .err()
            .expect("missing index");
        assert!(matches!(err, EvalError::Index(_)));
    }

    #[test]
    fn unversioned_index_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let conn = Connection::open(dir.path().join("index.db")).expect("open");
        conn.execute_batch("CREATE TABLE doc (id TEXT);").expect("schema");
        drop(conn);
        let err = VectorIndex::open(dir.path(), "index.db")
            .err()
            .expect("unversioned");
        assert!(err.to_string().contains("schema version 0"));
    }

    #[test]
    fn stats_count_live_rows() -> Result<(), EvalError> {
        let dir = tempdir().expect("tempdir");
        corpus(dir.path());
        let index = VectorIndex::open(dir.path(), "index.db")?;
        let stats = index.stats()?;
        assert_eq!(stats.doc_count, 3);
        assert_eq!(stats.chunk_count, 4);
        assert_eq!(stats.embedding, "hash");
        assert_eq!(stats.embedding_dim, super::fixture::DIM);
        Ok(())
    }

    fn scored(score: f32, path: &str) -> ScoredChunk {
        ScoredChunk {
            score,
            id: format!("{path}-0"),
            offset: 0,
            path: path.to_string(),
            doc: RetrievedDocument {
                content: String::new(),
                doc_type: UNKNOWN_DOC_TYPE.to_string(),
                source: path.to_string(),
            },
        }
    }

    #[test]
    fn nan_similarity_sorts_last() {
        let mut items = vec![
            scored(0.2, "b.md"),
            scored(f32::NAN, "a.md"),
            scored(0.9, "c.md"),
            scored(f32::NAN, "0.md"),
            scored(0.2, "a.md"),
        ];
        sort_by_score_with_tiebreak(&mut items);
        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["c.md", "a.md", "b.md", "0.md", "a.md"]);
        assert!(items[3].score.is_nan());
    }

    #[test]
    fn writer_lock_blocks_readers_until_timeout() -> Result<(), EvalError> {
        let dir = tempdir().expect("tempdir");
        corpus(dir.path());
        let path = dir.path().join("index.db");

        let reader = VectorIndex::acquire_shared_lock(&path, Duration::from_millis(100))?;
        let second_reader = VectorIndex::acquire_shared_lock(&path, Duration::from_millis(100))?;
        drop(reader);
        drop(second_reader);

        let lock_path = VectorIndex::lock_path_for(&path)?;
        let writer = File::open(&lock_path).expect("lock file");
        FileExt::lock_exclusive(&writer).expect("exclusive lock");
        let err = VectorIndex::acquire_shared_lock(&path, Duration::from_millis(100))
            .expect_err("reader must wait for writer");
        assert!(matches!(err, EvalError::Index(ref msg) if msg.contains("locked for writing")));

        FileExt::unlock(&writer).expect("unlock");
        VectorIndex::acquire_shared_lock(&path, Duration::from_millis(100))?;
        Ok(())
    }
}
