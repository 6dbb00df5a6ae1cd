#![cfg(feature = "sqlite")]
mod common;

use common::SqliteHarness;
use serde_json::json;
use sql_request_runner::prelude::*;

#[test]
fn execute_binds_repeated_names_once() -> Result<(), Box<dyn std::error::Error>> {
    let harness = SqliteHarness::new()?;
    let output = harness.run(
        r#"{"action":"execute","sql":"select :a as a, :b as b, :a as again","params":{"a":1,"b":"x"}}"#,
    );
    assert_eq!(output.status, ExitStatus::Success);
    assert_eq!(output.out, vec![json!([{"a": 1, "b": "x", "again": 1}])]);
    assert!(output.err.is_empty());
    Ok(())
}

#[test]
fn missing_params_bind_null() -> Result<(), Box<dyn std::error::Error>> {
    let harness = SqliteHarness::new()?;
    let output = harness.run(r#"{"action":"execute","sql":"select :missing as m"}"#);
    assert_eq!(output.out, vec![json!([{"m": null}])]);
    Ok(())
}

#[test]
fn colons_inside_literals_are_not_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let harness = SqliteHarness::new()?;
    let output = harness.run(
        r#"{"action":"execute","sql":"select 'at :noon' as t, :v as v -- :comment","params":{"v":2}}"#,
    );
    assert_eq!(output.out, vec![json!([{"t": "at :noon", "v": 2}])]);
    Ok(())
}

#[test]
fn empty_result_prints_an_empty_array() -> Result<(), Box<dyn std::error::Error>> {
    let harness = SqliteHarness::new()?.with_people_table();
    let output = harness.run(
        r#"{"action":"execute","sql":"select * from people where id = :id","params":{"id":9}}"#,
    );
    assert_eq!(output.status, ExitStatus::Success);
    assert_eq!(output.out, vec![json!([])]);
    Ok(())
}

#[test]
fn failure_reports_one_record_with_stripped_params() -> Result<(), Box<dyn std::error::Error>> {
    let harness = SqliteHarness::new()?;
    let output = harness.run(
        r#"{"action":"execute","sql":"select * from nope where id = :id","params":{"id":1,"password":"secret"}}"#,
    );
    assert_eq!(output.status, ExitStatus::Failure);
    assert!(output.out.is_empty());
    assert_eq!(output.err.len(), 1);

    let record = &output.err[0];
    assert!(record.is_object(), "execute errors are not wrapped: {record}");
    assert_eq!(record["item"], json!({"id": 1}));
    assert_eq!(record["query"], "select * from nope where id = :id");
    assert!(
        record["error"].as_str().is_some_and(|e| e.contains("no such table")),
        "unexpected error: {record}"
    );
    Ok(())
}

#[test]
fn ignored_failure_exits_zero() -> Result<(), Box<dyn std::error::Error>> {
    let harness = SqliteHarness::new()?;
    let output =
        harness.run(r#"{"action":"execute","sql":"select * from nope","ignore":true}"#);
    assert_eq!(output.status, ExitStatus::Success);
    assert_eq!(output.err.len(), 1);
    assert_eq!(output.err[0]["item"], json!({}));
    Ok(())
}

#[test]
fn values_round_trip_through_sqlite() -> Result<(), Box<dyn std::error::Error>> {
    let harness = SqliteHarness::new()?;
    let output = harness.run(
        r#"{"action":"execute","sql":"select :f as f, :t as t, :n as n, :o as o","params":{"f":1.5,"t":true,"n":null,"o":{"k":[1,2]}}}"#,
    );
    assert_eq!(
        output.out,
        vec![json!([{"f": 1.5, "t": 1, "n": null, "o": "{\"k\":[1,2]}"}])]
    );
    Ok(())
}
