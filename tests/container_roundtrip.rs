//! End-to-end container tests: the employee write/read scenario, block
//! boundaries, metadata, and corruption detection.

use tempfile::TempDir;

use volant::{
    encode_text, ContainerReader, ContainerWriter, CorruptFileError, Field, RecordSchema, Schema,
    Value,
};

fn employee_schema() -> Schema {
    Schema::Record(
        RecordSchema::new(
            "Employee",
            vec![
                Field::new("name", Schema::String),
                Field::new("age", Schema::Int),
                Field::new("emails", Schema::Array(Box::new(Schema::String))),
                Field::new("boss", Schema::nullable(Schema::Ref("Employee".into()))),
            ],
        )
        .unwrap(),
    )
}

fn employee(name: &str, age: i32, emails: &[&str], boss: Option<Value>) -> Value {
    Value::record(vec![
        ("name", Value::from(name)),
        ("age", Value::Int(age)),
        (
            "emails",
            Value::Array(emails.iter().map(|e| Value::from(*e)).collect()),
        ),
        ("boss", boss.unwrap_or(Value::Null)),
    ])
}

fn staff() -> Vec<Value> {
    let joe = employee("Joe", 31, &["joe@abc.com", "joe@gmail.com"], None);
    let jane = employee("Jane", 30, &[], Some(joe.clone()));
    let zoe = employee("Zoe", 21, &[], Some(jane.clone()));
    vec![joe, jane, zoe]
}

#[test]
fn write_then_read_back_in_order_with_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("employees.vc");

    let mut writer = ContainerWriter::builder(&path, employee_schema())
        .metadata("Meta-Key0", "Meta-Value0")
        .metadata("Meta-Key1", "Meta-Value1")
        .create()
        .unwrap();
    for person in staff() {
        writer.append(&person).unwrap();
    }
    assert_eq!(writer.records_appended(), 3);
    writer.close().unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.schema(), &employee_schema());
    assert_eq!(
        reader.metadata_value("Meta-Key0"),
        Some(b"Meta-Value0".as_slice())
    );
    assert_eq!(
        reader.metadata_value("Meta-Key1"),
        Some(b"Meta-Value1".as_slice())
    );
    assert_eq!(reader.metadata_value("absent"), None);

    let mut read_back = Vec::new();
    while reader.has_next().unwrap() {
        read_back.push(reader.next().unwrap());
    }
    assert_eq!(read_back, staff());

    // Forward-only: the sequence is exhausted for good.
    assert!(!reader.has_next().unwrap());
    assert!(reader.next().is_err());
}

#[test]
fn records_stream_across_block_boundaries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blocks.vc");

    // A tiny block size forces one block per record.
    let mut writer = ContainerWriter::builder(&path, employee_schema())
        .block_size(1)
        .create()
        .unwrap();
    for person in staff() {
        writer.append(&person).unwrap();
    }
    writer.close().unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    let mut count = 0;
    while reader.has_next().unwrap() {
        reader.next().unwrap();
        count += 1;
    }
    assert_eq!(count, 3);
}

#[test]
fn empty_container_has_schema_but_no_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.vc");

    let writer = ContainerWriter::builder(&path, employee_schema())
        .metadata("Meta-Key0", "Meta-Value0")
        .create()
        .unwrap();
    writer.close().unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.schema(), &employee_schema());
    assert_eq!(
        reader.metadata_value("Meta-Key0"),
        Some(b"Meta-Value0".as_slice())
    );
    assert!(!reader.has_next().unwrap());
}

#[test]
fn dropped_writer_still_seals_buffered_block() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dropped.vc");

    {
        let mut writer = ContainerWriter::create(&path, employee_schema()).unwrap();
        writer
            .append(&employee("Joe", 31, &["joe@abc.com"], None))
            .unwrap();
        // No close: Drop seals the block best-effort.
    }

    let mut reader = ContainerReader::open(&path).unwrap();
    assert!(reader.has_next().unwrap());
    let record = reader.next().unwrap();
    assert_eq!(record.field("name"), Some(&Value::from("Joe")));
}

#[test]
fn rejected_append_leaves_prior_records_intact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.vc");

    let mut writer = ContainerWriter::create(&path, employee_schema()).unwrap();
    writer
        .append(&employee("Joe", 31, &[], None))
        .unwrap();

    let malformed = Value::record(vec![("name", Value::Int(5))]);
    assert!(writer.append(&malformed).is_err());

    writer
        .append(&employee("Jane", 30, &[], None))
        .unwrap();
    writer.close().unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    let mut names = Vec::new();
    while reader.has_next().unwrap() {
        names.push(reader.next().unwrap().field("name").unwrap().clone());
    }
    assert_eq!(names, vec![Value::from("Joe"), Value::from("Jane")]);
}

#[test]
fn flipping_any_sync_marker_byte_is_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.vc");

    let mut writer = ContainerWriter::create(&path, employee_schema()).unwrap();
    for person in staff() {
        writer.append(&person).unwrap();
    }
    writer.close().unwrap();

    // One block was written, so the file ends with its sync marker.
    let clean = std::fs::read(&path).unwrap();
    let sync_start = clean.len() - 16;

    for offset in sync_start..clean.len() {
        let mut corrupted = clean.clone();
        corrupted[offset] ^= 0x01;
        std::fs::write(&path, &corrupted).unwrap();

        let mut reader = ContainerReader::open(&path).unwrap();
        let result = drain(&mut reader);
        let err = result.expect_err("corruption must not go unnoticed");
        assert_eq!(
            err.downcast_ref::<CorruptFileError>(),
            Some(&CorruptFileError::SyncMismatch(0)),
            "flipped byte at offset {}",
            offset
        );
    }
}

#[test]
fn truncated_block_is_corrupt_file_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.vc");

    let mut writer = ContainerWriter::create(&path, employee_schema()).unwrap();
    for person in staff() {
        writer.append(&person).unwrap();
    }
    writer.close().unwrap();

    let clean = std::fs::read(&path).unwrap();
    std::fs::write(&path, &clean[..clean.len() - 5]).unwrap();

    let mut reader = ContainerReader::open(&path).unwrap();
    let err = drain(&mut reader).expect_err("truncation must not go unnoticed");
    assert!(err.downcast_ref::<CorruptFileError>().is_some());
}

#[test]
fn text_rendering_of_written_records_matches_field_order() {
    let schema = employee_schema();
    let lines: Vec<String> = staff()
        .iter()
        .map(|person| encode_text(&schema, person).unwrap())
        .collect();

    assert_eq!(
        lines[0],
        "{\"name\":\"Joe\",\"age\":31,\"emails\":[\"joe@abc.com\",\"joe@gmail.com\"],\"boss\":null}"
    );
    // Jane's boss renders as the full nested employee.
    assert!(lines[1].contains("\"boss\":{\"name\":\"Joe\""));
    assert!(lines[2].starts_with("{\"name\":\"Zoe\",\"age\":21,"));
}

fn drain(reader: &mut ContainerReader) -> eyre::Result<Vec<Value>> {
    let mut out = Vec::new();
    while reader.has_next()? {
        out.push(reader.next()?);
    }
    Ok(out)
}
