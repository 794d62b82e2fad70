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

mod common;

use std::fs;
use std::path::Path;

use serde_json::Value;
use tempfile::TempDir;

use common::rageval_cmd;
use common::run_stdout_json;
use common::write_index;
use common::write_queries;

fn assert_repeatable(args: &[&str], runs: usize, config_root: &Path, cwd: &Path) {
    let mut baseline: Option<(Value, String)> = None;
    for _ in 0..runs {
        let mut cmd = rageval_cmd(config_root);
        cmd.args(args);
        cmd.args(["--details", "details.json"]);
        let metrics = run_stdout_json(&mut cmd, cwd);
        let details = fs::read_to_string(cwd.join("details.json")).expect("details");
        if let Some((ref expected_metrics, ref expected_details)) = baseline {
            assert_eq!(&metrics, expected_metrics);
            assert_eq!(&details, expected_details);
        } else {
            baseline = Some((metrics, details));
        }
    }
}

#[test]
fn deterministic_outputs() {
    let config = TempDir::new().expect("config tempdir");
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write_index(&root.join("vector_db"));
    write_queries(&root.join("eval_queries.jsonl"));

    assert_repeatable(&["eval", "--k", "3"], 10, config.path(), root);
    assert_repeatable(
        &["eval", "--k", "2", "--rerank", "--pre-k", "3"],
        10,
        config.path(),
        root,
    );
}
