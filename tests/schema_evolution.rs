//! Resolved reads through container files: old data read under newer and
//! narrower schemas.

use tempfile::TempDir;

use volant::{
    ContainerReader, ContainerWriter, Field, RecordSchema, Schema, SchemaResolutionError, Value,
};

fn writer_schema() -> Schema {
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

fn write_staff(path: &std::path::Path) {
    let mut writer = ContainerWriter::create(path, writer_schema()).unwrap();
    let joe = employee("Joe", 31, &["joe@abc.com", "joe@gmail.com"], None);
    let jane = employee("Jane", 30, &[], Some(joe.clone()));
    let zoe = employee("Zoe", 21, &[], Some(jane.clone()));
    for person in [joe, jane, zoe] {
        writer.append(&person).unwrap();
    }
    writer.close().unwrap();
}

#[test]
fn renamed_and_added_fields_come_from_defaults() {
    // A second-generation schema: `age` was renamed to `yrs` (renames are
    // not matched, so a default is required) and `gender` was added.
    let reader_schema = Schema::Record(
        RecordSchema::new(
            "Employee",
            vec![
                Field::new("name", Schema::String),
                Field::with_default("yrs", Schema::Long, Value::Long(-1)),
                Field::with_default("gender", Schema::String, Value::from("unknown")),
                Field::new("emails", Schema::Array(Box::new(Schema::String))),
            ],
        )
        .unwrap(),
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.vc");
    write_staff(&path);

    let mut reader = ContainerReader::open(&path).unwrap();
    let mut records = Vec::new();
    while reader.has_next().unwrap() {
        records.push(reader.next_resolved(&reader_schema).unwrap());
    }

    assert_eq!(records.len(), 3);
    for record in &records {
        // The writer's age/boss were consumed and dropped; the reader's
        // yrs/gender came from their defaults.
        assert_eq!(record.field("yrs"), Some(&Value::Long(-1)));
        assert_eq!(record.field("gender"), Some(&Value::from("unknown")));
        assert_eq!(record.field("age"), None);
        assert_eq!(record.field("boss"), None);
    }
    assert_eq!(records[0].field("name"), Some(&Value::from("Joe")));
    assert_eq!(
        records[0].field("emails"),
        Some(&Value::Array(vec![
            Value::from("joe@abc.com"),
            Value::from("joe@gmail.com"),
        ]))
    );
}

#[test]
fn widened_field_keeps_its_value_recursively() {
    // Same field names, but age widened to long and a defaulted addition;
    // the recursive boss chain resolves with the same rules at every level.
    let reader_schema = Schema::Record(
        RecordSchema::new(
            "Employee",
            vec![
                Field::new("name", Schema::String),
                Field::new("age", Schema::Long),
                Field::new("emails", Schema::Array(Box::new(Schema::String))),
                Field::with_default(
                    "boss",
                    Schema::nullable(Schema::Ref("Employee".into())),
                    Value::Null,
                ),
                Field::with_default("gender", Schema::String, Value::from("unknown")),
            ],
        )
        .unwrap(),
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.vc");
    write_staff(&path);

    let mut reader = ContainerReader::open(&path).unwrap();
    let mut records = Vec::new();
    while reader.has_next().unwrap() {
        records.push(reader.next_resolved(&reader_schema).unwrap());
    }

    assert_eq!(records[0].field("age"), Some(&Value::Long(31)));
    assert_eq!(records[1].field("age"), Some(&Value::Long(30)));

    let janes_boss = records[1].field("boss").unwrap();
    assert_eq!(janes_boss.field("name"), Some(&Value::from("Joe")));
    assert_eq!(janes_boss.field("age"), Some(&Value::Long(31)));
    assert_eq!(janes_boss.field("gender"), Some(&Value::from("unknown")));
}

#[test]
fn baseline_and_resolved_reads_mix_in_one_pass() {
    let reader_schema = Schema::Record(
        RecordSchema::new(
            "Employee",
            vec![Field::new("name", Schema::String)],
        )
        .unwrap(),
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.vc");
    write_staff(&path);

    let mut reader = ContainerReader::open(&path).unwrap();

    assert!(reader.has_next().unwrap());
    let first = reader.next().unwrap();
    assert_eq!(first.field("age"), Some(&Value::Int(31)));

    let second = reader.next_resolved(&reader_schema).unwrap();
    assert_eq!(second, Value::record(vec![("name", Value::from("Jane"))]));

    let third = reader.next().unwrap();
    assert_eq!(third.field("name"), Some(&Value::from("Zoe")));

    assert!(!reader.has_next().unwrap());
}

#[test]
fn missing_default_fails_per_record_without_killing_the_reader() {
    let reader_schema = Schema::Record(
        RecordSchema::new(
            "Employee",
            vec![
                Field::new("name", Schema::String),
                Field::new("salary", Schema::Double),
            ],
        )
        .unwrap(),
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.vc");
    write_staff(&path);

    let mut reader = ContainerReader::open(&path).unwrap();
    assert!(reader.has_next().unwrap());

    let err = reader.next_resolved(&reader_schema).unwrap_err();
    assert_eq!(
        err.downcast_ref::<SchemaResolutionError>(),
        Some(&SchemaResolutionError::MissingDefault {
            record: "Employee".into(),
            field: "salary".into()
        })
    );
}

#[test]
fn reader_schema_travels_with_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1.vc");
    write_staff(&path);

    let reader = ContainerReader::open(&path).unwrap();
    assert_eq!(reader.schema(), &writer_schema());

    // The embedded text form parses back to the identical schema.
    let text = reader.schema().to_text().unwrap();
    assert_eq!(Schema::from_text(&text).unwrap(), writer_schema());
}
