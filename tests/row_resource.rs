//! Row reads and writes through the row resource against the sample table

use serde_json::json;

use rowgate::codec::WireValue;
use rowgate::model::CellValue;
use rowgate::{ErrorKind, RowError};

mod common;

use common::{qs, rest, row_hex, sample_resource, structured, EXTENSIVE_QUALIFIER, TABLE};

fn text(s: &str) -> WireValue {
    WireValue::Text(s.to_string())
}

fn number(n: i64) -> WireValue {
    WireValue::Number(n.into())
}

#[test]
fn fetch_all_cells_for_row() {
    let resource = sample_resource();
    let row = resource.get_row_with_params(TABLE, &row_hex(12345), "").unwrap();
    assert_eq!(row.cell_count(), 7);

    let order: Vec<String> = row.cells.iter().map(|c| c.coordinate.to_string()).collect();
    assert_eq!(
        order,
        [
            "group_family:inline_record",
            "group_family:long_qualifier",
            "group_family:string_qualifier",
            "group_family:team_qualifier",
            "longs:some other qualifier",
            "pick_bans:ban_pick_1",
            "strings:apple iphone",
        ]
    );
}

#[test]
fn fetch_single_group_cells() {
    let resource = sample_resource();
    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=group_family:string_qualifier")
        .unwrap();
    assert_eq!(rest(&row).cells.len(), 1);
    assert_eq!(rest(&row).cells[0].value, text("some_value"));

    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=group_family:long_qualifier")
        .unwrap();
    assert_eq!(row.cells[0].value, CellValue::Long(1000));
    assert_eq!(rest(&row).cells[0].value, number(1000));
}

#[test]
fn fetch_record_cells() {
    let resource = sample_resource();
    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=group_family:team_qualifier")
        .unwrap();
    let team = structured(&rest(&row), 0);
    assert_eq!(team["barracks_status"]["long"], 1234);
    assert_eq!(team["name"]["string"], "Team Name");

    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=group_family:inline_record")
        .unwrap();
    assert_eq!(structured(&rest(&row), 0)["username"], "some_user");
}

#[test]
fn fetch_single_map_cells() {
    let resource = sample_resource();
    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=strings:apple%20iphone")
        .unwrap();
    let wire = rest(&row);
    assert_eq!(wire.cells.len(), 1);
    assert_eq!(wire.cells[0].column_qualifier, "apple iphone");
    assert_eq!(wire.cells[0].value, text("iphone"));

    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=longs:some%20other%20qualifier")
        .unwrap();
    assert_eq!(rest(&row).cells[0].value, number(1000));

    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=pick_bans:ban_pick_1")
        .unwrap();
    assert_eq!(row.cell_count(), 1);
    assert_eq!(structured(&rest(&row), 0)["hero_id"]["long"], 1);
}

#[test]
fn fetch_all_qualifiers_of_family() {
    let resource = sample_resource();
    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=group_family")
        .unwrap();
    assert_eq!(row.cell_count(), 4);

    let row = resource
        .get_row_with_params(TABLE, &row_hex(12345), "cols=strings")
        .unwrap();
    assert_eq!(row.cell_count(), 1);
}

#[test]
fn fetch_versions() {
    let resource = sample_resource();
    let row = resource
        .get_row_with_params(
            TABLE,
            &row_hex(2345),
            "cols=group_family:string_qualifier&versions=all",
        )
        .unwrap();
    assert_eq!(row.cell_count(), 5);
    let stamps: Vec<u64> = row.cells.iter().map(|c| c.timestamp.get()).collect();
    assert!(stamps.windows(2).all(|w| w[0] > w[1]), "newest first: {:?}", stamps);

    let row = resource
        .get_row_with_params(
            TABLE,
            &row_hex(2345),
            "cols=group_family:string_qualifier&versions=1",
        )
        .unwrap();
    assert_eq!(row.cell_count(), 1);
    assert_eq!(row.cells[0].value, CellValue::from("some_value4"));
}

#[test]
fn fetch_by_time_range() {
    let resource = sample_resource();
    let row = resource
        .get_row_with_params(
            TABLE,
            &row_hex(56789),
            "cols=group_family:string_qualifier&timerange=1..6&versions=10",
        )
        .unwrap();
    assert_eq!(row.cell_count(), 5);
    assert_eq!(row.cells[0].value, CellValue::from("some_value4"));

    let row = resource
        .get_row_with_params(
            TABLE,
            &row_hex(56789),
            "cols=group_family:string_qualifier&timerange=2..3&versions=1",
        )
        .unwrap();
    assert_eq!(row.cell_count(), 1);
    assert_eq!(row.cells[0].value, CellValue::from("some_value1"));
    assert_eq!(row.cells[0].timestamp.get(), 2);
}

#[test]
fn unknown_family_is_rejected() {
    let resource = sample_resource();
    let err = resource
        .get_row_with_params(TABLE, &row_hex(56789), "cols=group_familyy")
        .unwrap_err();
    assert!(matches!(&err, RowError::UnknownColumn { column } if column == "group_familyy"));
    assert_eq!(err.status_code(), 400);

    let err = resource
        .get_row_with_params(TABLE, &row_hex(56789), "cols=group_family:nope")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Client);
}

#[test]
fn missing_row_table_and_bad_id() {
    let resource = sample_resource();
    let err = resource.get_row_with_params(TABLE, &row_hex(1), "").unwrap_err();
    assert!(matches!(err, RowError::RowNotFound { .. }));
    assert_eq!(err.status_code(), 404);

    // A requested column without data is simply absent from an existing row
    let row = resource
        .get_row_with_params(TABLE, &row_hex(56789), "cols=strings:absent")
        .unwrap();
    assert_eq!(row.cell_count(), 0);

    let err = resource.get_row_with_params("no_table", &row_hex(1), "").unwrap_err();
    assert_eq!(err.status_code(), 404);

    let err = resource.get_row_with_params(TABLE, "not-hex", "").unwrap_err();
    assert!(matches!(err, RowError::InvalidParameter { .. }));
}

#[test]
fn reader_schema_override() {
    let resource = sample_resource();
    let params = qs(&[
        ("cols", "group_family:long_qualifier"),
        ("schema.group_family:long_qualifier", "\"double\""),
    ]);
    let row = resource.get_row_with_params(TABLE, &row_hex(12345), &params).unwrap();
    assert_eq!(row.cells[0].value, CellValue::Double(1000.0));

    let params = qs(&[
        ("cols", "group_family:long_qualifier"),
        ("schema.group_family:long_qualifier", "\"int\""),
    ]);
    let err = resource.get_row_with_params(TABLE, &row_hex(12345), &params).unwrap_err();
    assert!(matches!(err, RowError::Schema { .. }));
}

#[test]
fn single_cell_put() {
    let resource = sample_resource();
    let hex = row_hex(54321);
    let locator = resource
        .put_row_with_params(TABLE, &hex, "group_family:long_qualifier=123&timestamp=3141592")
        .unwrap();
    assert!(locator
        .path(resource.instance())
        .contains(&format!("/v1/instances/default/tables/sample_table/rows/{}", hex)));

    let row = resource
        .get_row_with_params(TABLE, &hex, "cols=group_family:long_qualifier")
        .unwrap();
    assert_eq!(rest(&row).cells[0].value, number(123));
    assert_eq!(row.cells[0].timestamp.get(), 3141592);
}

#[test]
fn multiple_cell_put() {
    let resource = sample_resource();
    let hex = row_hex(54323);
    let team = json!({
        "barracks_status": {"long": 94103},
        "complete": null,
        "id": {"long": 88},
        "name": {"string": "Windrunners"}
    })
    .to_string();
    let params = qs(&[
        ("group_family:long_qualifier", "123"),
        ("group_family:string_qualifier", "helloworld"),
        ("group_family:team_qualifier", team.as_str()),
        ("timestamp", "3141592"),
    ]);
    resource.put_row_with_params(TABLE, &hex, &params).unwrap();

    let row = rest(&resource.get_row_with_params(TABLE, &hex, "").unwrap());
    assert_eq!(row.cells[0].value, number(123));
    assert_eq!(row.cells[1].value, text("helloworld"));
    let team = structured(&row, 2);
    assert_eq!(team["barracks_status"]["long"], 94103);
    assert_eq!(team["id"]["long"], 88);
    assert_eq!(team["name"]["string"], "Windrunners");
}

#[test]
fn generic_record_put() {
    let resource = sample_resource();
    let hex = row_hex(54324);
    let record = json!({"username": "gumshoe", "num_purchases": 5647382910i64}).to_string();
    let params = qs(&[("group_family:inline_record", record.as_str()), ("timestamp", "3141592")]);
    resource.put_row_with_params(TABLE, &hex, &params).unwrap();

    let row = rest(&resource.get_row_with_params(TABLE, &hex, "").unwrap());
    let record = structured(&row, 0);
    assert_eq!(record["username"], "gumshoe");
    assert_eq!(record["num_purchases"], 5647382910i64);
}

#[test]
fn map_column_put() {
    let resource = sample_resource();
    let hex = row_hex(54325);
    let ban = json!({
        "team": {"long": 7654},
        "hero_id": {"long": 1029384756},
        "order": {"long": 6},
        "is_pick": {"boolean": true}
    })
    .to_string();
    let strings_key = format!("strings:{}", EXTENSIVE_QUALIFIER);
    let params = qs(&[
        ("longs: ", "987654567890"),
        (strings_key.as_str(), "helloworld"),
        ("pick_bans:harkonnen:.:.?&;& ", ban.as_str()),
        ("timestamp", "3141592"),
    ]);
    resource.put_row_with_params(TABLE, &hex, &params).unwrap();

    let row = rest(&resource.get_row_with_params(TABLE, &hex, "").unwrap());
    assert_eq!(row.cells[0].column_qualifier, " ");
    assert_eq!(row.cells[0].value, number(987654567890));
    assert_eq!(row.cells[1].column_qualifier, "harkonnen:.:.?&;& ");
    let ban = structured(&row, 1);
    assert_eq!(ban["team"]["long"], 7654);
    assert_eq!(ban["hero_id"]["long"], 1029384756);
    assert_eq!(ban["order"]["long"], 6);
    assert_eq!(ban["is_pick"]["boolean"], true);
    assert_eq!(row.cells[2].column_qualifier, EXTENSIVE_QUALIFIER);
    assert_eq!(row.cells[2].value, text("helloworld"));
}

#[test]
fn nonexistent_column_put_commits_nothing() {
    let resource = sample_resource();
    let hex = row_hex(54323);
    let err = resource
        .put_row_with_params(
            TABLE,
            &hex,
            "group_family:long_qualifier=123&nonfamily:noncolumn=helloworld&timestamp=3141592",
        )
        .unwrap_err();
    assert!(matches!(&err, RowError::UnknownColumn { column } if column == "nonfamily:noncolumn"));
    assert_eq!(err.status_code(), 400);

    let err = resource.get_row_with_params(TABLE, &hex, "").unwrap_err();
    assert!(matches!(err, RowError::RowNotFound { .. }));
}

#[test]
fn bad_value_put_commits_nothing() {
    let resource = sample_resource();
    let hex = row_hex(54326);
    let err = resource
        .put_row_with_params(
            TABLE,
            &hex,
            "group_family:string_qualifier=fine&group_family:long_qualifier=helloworld&timestamp=1",
        )
        .unwrap_err();
    assert!(matches!(err, RowError::Codec { .. }));
    assert!(resource.get_row_with_params(TABLE, &hex, "").is_err());
}

#[test]
fn timestamped_put() {
    let resource = sample_resource();
    let hex = row_hex(54323);
    let strings_column = format!("strings:{}", EXTENSIVE_QUALIFIER);
    let strings_ts = format!("timestamp.{}", strings_column);
    let params = qs(&[
        ("group_family:long_qualifier", "123"),
        ("timestamp.group_family:long_qualifier", "3141591"),
        ("group_family:string_qualifier", "helloworld"),
        (strings_column.as_str(), "sample_string"),
        (strings_ts.as_str(), "2"),
        ("timestamp.nonfamily:noncolumn", "12"),
        ("timestamp", "3141592"),
    ]);
    resource.put_row_with_params(TABLE, &hex, &params).unwrap();

    let row = rest(&resource.get_row_with_params(TABLE, &hex, "timerange=3141592..").unwrap());
    assert_eq!(row.cells.len(), 1);
    assert_eq!(row.cells[0].column_qualifier, "string_qualifier");
    assert_eq!(row.cells[0].timestamp, 3141592);
    assert_eq!(row.cells[0].value, text("helloworld"));

    let row = rest(
        &resource
            .get_row_with_params(TABLE, &hex, "timerange=3141591..3141592")
            .unwrap(),
    );
    assert_eq!(row.cells.len(), 1);
    assert_eq!(row.cells[0].column_qualifier, "long_qualifier");
    assert_eq!(row.cells[0].timestamp, 3141591);
    assert_eq!(row.cells[0].value, number(123));

    let row = rest(&resource.get_row_with_params(TABLE, &hex, "timerange=0..3").unwrap());
    assert_eq!(row.cells.len(), 1);
    assert_eq!(row.cells[0].column_qualifier, EXTENSIVE_QUALIFIER);
    assert_eq!(row.cells[0].timestamp, 2);
    assert_eq!(row.cells[0].value, text("sample_string"));
}

#[test]
fn put_without_timestamp() {
    let resource = sample_resource();
    let err = resource
        .put_row_with_params(TABLE, &row_hex(543233), "group_family:long_qualifier=123")
        .unwrap_err();
    assert!(matches!(err, RowError::MissingTimestamp));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn writer_schema_puts() {
    let resource = sample_resource();
    let hex = row_hex(54400);
    let record = json!({"username": "gumshoe", "num_purchases": 5647382910i64}).to_string();
    let record_schema = resource
        .layout(TABLE)
        .unwrap()
        .cell_schema("group_family", "inline_record")
        .unwrap()
        .to_string();
    let params = qs(&[
        ("group_family:long_qualifier", "123"),
        ("schema.group_family:long_qualifier", "\"long\""),
        ("group_family:string_qualifier", "helloworld"),
        ("schema.group_family:string_qualifier", "\"string\""),
        ("group_family:inline_record", record.as_str()),
        ("schema.group_family:inline_record", record_schema.as_str()),
        ("schema.nonfamily:noncolumn", "blah"),
        ("timestamp", "3141592"),
    ]);
    resource.put_row_with_params(TABLE, &hex, &params).unwrap();

    let row = rest(&resource.get_row_with_params(TABLE, &hex, "").unwrap());
    assert_eq!(row.cells[1].column_qualifier, "long_qualifier");
    assert_eq!(row.cells[1].value, number(123));
    assert_eq!(row.cells[2].column_qualifier, "string_qualifier");
    assert_eq!(row.cells[2].value, text("helloworld"));
    let record = structured(&row, 0);
    assert_eq!(record["username"], "gumshoe");
    assert_eq!(record["num_purchases"], 5647382910i64);
}

#[test]
fn narrower_writer_schema_is_promoted() {
    let resource = sample_resource();
    let hex = row_hex(54401);
    let params = qs(&[
        ("group_family:long_qualifier", "7"),
        ("schema.group_family:long_qualifier", "\"int\""),
        ("timestamp", "10"),
    ]);
    resource.put_row_with_params(TABLE, &hex, &params).unwrap();
    let row = resource.get_row_with_params(TABLE, &hex, "").unwrap();
    assert_eq!(row.cells[0].value, CellValue::Long(7));

    let params = qs(&[
        ("group_family:long_qualifier", "7"),
        ("schema.group_family:long_qualifier", "\"string\""),
        ("timestamp", "10"),
    ]);
    let err = resource.put_row_with_params(TABLE, &hex, &params).unwrap_err();
    assert!(matches!(err, RowError::Schema { .. }));

    let params = qs(&[
        ("group_family:long_qualifier", "7"),
        ("schema.group_family:long_qualifier", "{not json"),
        ("timestamp", "10"),
    ]);
    let err = resource.put_row_with_params(TABLE, &hex, &params).unwrap_err();
    assert!(matches!(err, RowError::Schema { .. }));
}

#[test]
fn oversized_schema_overrides_are_rejected() {
    let resource = sample_resource();
    let mut schema = r#"{"type": "record", "name": "R0", "fields": [{"name": "x", "type": "long"}]}"#.to_string();
    for n in 1..=40 {
        schema = format!(
            r#"{{"type": "record", "name": "R{}", "fields": [{{"name": "a", "type": {}}}, {{"name": "b", "type": "R{}"}}]}}"#,
            n,
            schema,
            n - 1
        );
    }
    let started = std::time::Instant::now();

    let params = qs(&[
        ("group_family:long_qualifier", "7"),
        ("schema.group_family:long_qualifier", schema.as_str()),
        ("timestamp", "10"),
    ]);
    let err = resource
        .put_row_with_params(TABLE, &row_hex(54402), &params)
        .unwrap_err();
    assert!(matches!(err, RowError::Schema { .. }));

    let params = qs(&[("schema.group_family:long_qualifier", schema.as_str())]);
    let err = resource
        .get_row_with_params(TABLE, &row_hex(12345), &params)
        .unwrap_err();
    assert!(matches!(err, RowError::Schema { .. }));
    assert_eq!(err.kind(), ErrorKind::Client);

    assert!(started.elapsed() < std::time::Duration::from_secs(2));
}

#[test]
fn conflicting_parameters() {
    let resource = sample_resource();
    let err = resource
        .put_row_with_params(
            TABLE,
            &row_hex(9),
            "strings:a=1&strings:a=2&timestamp=1",
        )
        .unwrap_err();
    assert!(matches!(err, RowError::InvalidParameter { .. }));

    let err = resource
        .get_row_with_params(TABLE, &row_hex(12345), "versions=0")
        .unwrap_err();
    assert!(matches!(err, RowError::InvalidParameter { .. }));
}

#[test]
fn entity_ids_from_components() {
    let resource = sample_resource();
    let eid = resource.entity_id(TABLE, "[12345]").unwrap();
    assert_eq!(eid.to_hex(), row_hex(12345));
    assert_eq!(resource.entity_id(TABLE, "12345").unwrap(), eid);

    let err = resource.entity_id(TABLE, "[\"alice\"]").unwrap_err();
    assert!(matches!(err, RowError::InvalidParameter { .. }));
    assert!(resource.entity_id(TABLE, "[1, 2]").is_err());
}
