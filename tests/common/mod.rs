#![allow(dead_code)]

use std::error::Error;

use serde_json::Value;
use sql_request_runner::prelude::*;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// What one dispatcher run wrote and returned.
pub struct Output {
    pub status: ExitStatus,
    pub out: Vec<Value>,
    pub err: Vec<Value>,
}

/// Parse every output line as its own JSON document.
pub fn json_lines(bytes: Vec<u8>) -> Vec<Value> {
    String::from_utf8(bytes)
        .expect("output is utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is one JSON document"))
        .collect()
}

pub fn run_with<C: Connector>(rt: &Runtime, dispatcher: &RequestDispatcher<C>, input: &str) -> Output {
    let mut reporter = Reporter::new(Vec::new(), Vec::new());
    let status = rt.block_on(dispatcher.run(input, &mut reporter));
    let (out, err) = reporter.into_parts();
    Output {
        status,
        out: json_lines(out),
        err: json_lines(err),
    }
}

/// File-backed `SQLite` database in a temporary directory.
pub struct SqliteHarness {
    pub rt: Runtime,
    pub dispatcher: RequestDispatcher<AnyConnector>,
    _dir: TempDir,
}

impl SqliteHarness {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("requests.db");
        let connector = AnyConnector::from_config(&ConnectionConfig::sqlite(path.to_string_lossy()))?;
        Ok(Self {
            rt: Runtime::new()?,
            dispatcher: RequestDispatcher::new(connector),
            _dir: dir,
        })
    }

    pub fn run(&self, input: &str) -> Output {
        run_with(&self.rt, &self.dispatcher, input)
    }

    /// Create the `people` table used across the tests.
    pub fn with_people_table(self) -> Self {
        let output = self.run(
            r#"{"action":"execute","sql":"create table people (id integer primary key, name text not null)"}"#,
        );
        assert_eq!(output.status, ExitStatus::Success, "create table: {:?}", output.err);
        self
    }

    pub fn count_people(&self) -> Value {
        let output = self.run(r#"{"action":"execute","sql":"select count(*) as n from people"}"#);
        output.out[0][0]["n"].clone()
    }
}
