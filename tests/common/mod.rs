#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use rowgate::model::{Coordinate, TableLayout, Timestamp};
use rowgate::output::RestRow;
use rowgate::query::PendingWrite;
use rowgate::store::{snapshot, InMemoryStore};
use rowgate::{Row, RowResource};

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const TABLE: &str = "sample_table";

pub const SAMPLE_LAYOUT: &str = r#"{
  "name": "sample_table",
  "row_key": {"encoding": "formatted", "components": [{"name": "id", "type": "long"}]},
  "families": [
    {"kind": "group", "name": "group_family", "columns": [
      {"name": "string_qualifier", "schema": "string"},
      {"name": "long_qualifier", "schema": "long"},
      {"name": "team_qualifier", "schema": {
        "type": "record", "name": "Team", "namespace": "org.rowgate.sample",
        "fields": [
          {"name": "barracks_status", "type": ["null", "long"], "default": null},
          {"name": "complete", "type": ["null", "long"], "default": null},
          {"name": "id", "type": ["null", "long"], "default": null},
          {"name": "name", "type": ["null", "string"], "default": null}
        ]}},
      {"name": "inline_record", "schema": {
        "type": "record", "name": "inline_record",
        "fields": [
          {"name": "username", "type": "string"},
          {"name": "num_purchases", "type": "long"}
        ]}}
    ]},
    {"kind": "map", "name": "longs", "schema": "long"},
    {"kind": "map", "name": "pick_bans", "schema": {
      "type": "record", "name": "PickBan", "namespace": "org.rowgate.sample",
      "fields": [
        {"name": "team", "type": ["null", "long"], "default": null},
        {"name": "hero_id", "type": ["null", "long"], "default": null},
        {"name": "order", "type": ["null", "long"], "default": null},
        {"name": "is_pick", "type": ["null", "boolean"], "default": null}
      ]}},
    {"kind": "map", "name": "strings", "schema": "string"}
  ]
}"#;

/// Qualifier exercising every character the query string treats specially
pub const EXTENSIVE_QUALIFIER: &str = ":.:.?&;& /\\\n~!@#$%^&*()_+{}|[]\\;';'\"\"";

pub fn sample_layout() -> TableLayout {
    TableLayout::from_json_str(SAMPLE_LAYOUT).expect("sample layout parses")
}

/// Hex entity id of the sample table row `id`
pub fn row_hex(id: i64) -> String {
    sample_layout()
        .row_key
        .entity_id(&[json!(id)])
        .expect("long row key")
        .to_hex()
}

/// Form-encode `pairs` as a query string
pub fn qs(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn seed(resource: &RowResource, id: i64, ts: u64, values: &[(&str, &str, String)]) {
    let mut write = PendingWrite::new().with_timestamp(Timestamp::new(ts));
    for (family, qualifier, text) in values {
        write = write.with_value(Coordinate::new(*family, *qualifier), text.clone());
    }
    resource
        .put_row(TABLE, &row_hex(id), &write)
        .expect("seed write succeeds");
}

/// The sample table with its three seeded rows
///
/// * 12345: seven cells across every family
/// * 2345: five versions of `group_family:string_qualifier`
/// * 56789: the same five versions at timestamps 1 through 5
pub fn sample_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store
        .create_table(sample_layout())
        .expect("fresh store has no tables");
    let resource = RowResource::new(store.clone());

    let team = json!({
        "barracks_status": {"long": 1234},
        "complete": {"long": 12345},
        "id": {"long": 1},
        "name": {"string": "Team Name"}
    });
    let inline = json!({"username": "some_user", "num_purchases": 10});
    let ban = json!({
        "team": {"long": 3},
        "hero_id": {"long": 1},
        "order": {"long": 2},
        "is_pick": {"boolean": false}
    });
    seed(
        &resource,
        12345,
        1_700_000_000_000,
        &[
            ("group_family", "string_qualifier", "some_value".to_string()),
            ("group_family", "long_qualifier", "1000".to_string()),
            ("group_family", "team_qualifier", team.to_string()),
            ("group_family", "inline_record", inline.to_string()),
            ("pick_bans", "ban_pick_1", ban.to_string()),
            ("strings", "apple iphone", "iphone".to_string()),
            ("longs", "some other qualifier", "1000".to_string()),
        ],
    );

    for (i, value) in ["some_value", "some_value1", "some_value2", "some_value3", "some_value4"]
        .into_iter()
        .enumerate()
    {
        let qualifier = [("group_family", "string_qualifier", value.to_string())];
        seed(&resource, 2345, 1_700_000_000_000 + 5 * i as u64, &qualifier);
        seed(&resource, 56789, 1 + i as u64, &qualifier);
    }
    store
}

pub fn sample_resource() -> RowResource {
    RowResource::new(sample_store())
}

/// Wire form of a row
pub fn rest(row: &Row) -> RestRow {
    RestRow::from_row(row).expect("row encodes")
}

/// Parse the JSON document carried by a structured cell's wire value
pub fn structured(row: &RestRow, index: usize) -> serde_json::Value {
    match &row.cells[index].value {
        rowgate::codec::WireValue::Text(text) => {
            serde_json::from_str(text).expect("structured value holds JSON")
        }
        other => panic!("structured values travel as strings, got {:?}", other),
    }
}

/// Write the sample store and a layout file into `dir`
pub fn write_fixtures(dir: &Path) -> TestResult<(PathBuf, PathBuf)> {
    let tables = dir.join("tables.json");
    snapshot::save(&sample_store(), &tables)?;
    let layout = dir.join("layout.json");
    std::fs::write(&layout, SAMPLE_LAYOUT)?;
    Ok((tables, layout))
}
