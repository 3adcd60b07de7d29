use csrmatch_lib::{import_companies_from_json, import_ngos_from_json, Db, MatchEngine};
use serde_json::Value;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("CLI crate should be inside workspace")
        .to_path_buf()
}

fn fixture_path(name: &str) -> PathBuf {
    workspace_root().join("csrmatch_lib/tests/fixtures").join(name)
}

fn load_fixture(name: &str) -> Value {
    let path = fixture_path(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read fixture {}: {}", path.display(), e));
    serde_json::from_str(&text).expect("fixture is valid JSON")
}

fn load_schema(name: &str) -> Value {
    let path = workspace_root().join("schema").join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read schema {}: {}", path.display(), e));
    serde_json::from_str(&text).expect("schema is valid JSON")
}

/// Import both fixtures into a fresh store and score every pair once.
fn scored_matches() -> Value {
    let mut db = Db::open_in_memory().expect("open db");
    db.init().expect("init db");
    import_ngos_from_json(&mut db, fixture_path("ngos.json")).expect("import ngos");
    import_companies_from_json(&mut db, fixture_path("companies.json")).expect("import companies");

    let engine = MatchEngine::with_defaults().expect("engine");
    let mut records = Vec::new();
    for company_id in db.list_company_ids().expect("companies") {
        for ngo_id in db.list_ngo_ids().expect("ngos") {
            records.push(
                engine
                    .create_match(&db, &company_id, &ngo_id)
                    .expect("create match"),
            );
        }
    }
    serde_json::to_value(&records).expect("matches serialize")
}

// ---------------------------------------------------------------------------
// Positive validation: fixtures and engine output conform to their schemas
// ---------------------------------------------------------------------------

#[test]
fn test_ngos_fixture_conforms_to_schema() {
    let data = load_fixture("ngos.json");
    let schema = load_schema("ngo.schema.json");

    let validator = jsonschema::draft202012::new(&schema).expect("ngo schema compiles");
    let result = validator.validate(&data);
    if let Err(e) = &result {
        panic!("ngos fixture failed validation: {e}");
    }
}

#[test]
fn test_companies_fixture_conforms_to_schema() {
    let data = load_fixture("companies.json");
    let schema = load_schema("company.schema.json");

    let validator = jsonschema::draft202012::new(&schema).expect("company schema compiles");
    let result = validator.validate(&data);
    if let Err(e) = &result {
        panic!("companies fixture failed validation: {e}");
    }
}

#[test]
fn test_match_records_conform_to_schema() {
    let data = scored_matches();
    assert_eq!(data.as_array().map(Vec::len), Some(8));
    let schema = load_schema("match.schema.json");

    let validator = jsonschema::draft202012::new(&schema).expect("match schema compiles");
    let result = validator.validate(&data);
    if let Err(e) = &result {
        panic!("match records failed validation: {e}");
    }
}

// ---------------------------------------------------------------------------
// Negative validation: schemas reject invalid data
// ---------------------------------------------------------------------------

#[test]
fn test_ngo_schema_rejects_missing_required_field() {
    let schema = load_schema("ngo.schema.json");
    let mut data = load_fixture("ngos.json");

    data[0]
        .as_object_mut()
        .expect("ngo is an object")
        .remove("id");

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    assert!(
        validator.validate(&data).is_err(),
        "schema should reject NGO missing id"
    );
}

#[test]
fn test_ngo_schema_rejects_out_of_range_sdg() {
    let schema = load_schema("ngo.schema.json");
    let mut data = load_fixture("ngos.json");

    data[0]["sdgs"] = serde_json::json!([4, 18]);

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    assert!(
        validator.validate(&data).is_err(),
        "schema should reject SDG 18"
    );
}

#[test]
fn test_ngo_schema_rejects_bad_postal_code() {
    let schema = load_schema("ngo.schema.json");
    let mut data = load_fixture("ngos.json");

    data[1]["postal_code"] = Value::String("012345".to_string());

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    assert!(
        validator.validate(&data).is_err(),
        "schema should reject a PIN code starting with 0"
    );
}

#[test]
fn test_company_schema_rejects_geography_without_state() {
    let schema = load_schema("company.schema.json");
    let mut data = load_fixture("companies.json");

    data[0]["preferred_geographies"] = serde_json::json!([{ "district": "Gaya" }]);

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    assert!(
        validator.validate(&data).is_err(),
        "schema should reject a location without a state"
    );
}

#[test]
fn test_match_schema_rejects_score_above_100() {
    let schema = load_schema("match.schema.json");
    let mut data = scored_matches();

    data[0]["score"] = serde_json::json!(100.5);

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    assert!(
        validator.validate(&data).is_err(),
        "schema should reject a composite score above 100"
    );
}

#[test]
fn test_match_schema_rejects_missing_compliance_issues() {
    let schema = load_schema("match.schema.json");
    let mut data = scored_matches();

    data[0]["compliance_status"]
        .as_object_mut()
        .expect("compliance status is an object")
        .remove("issues");

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    assert!(
        validator.validate(&data).is_err(),
        "schema should reject compliance status without issues"
    );
}

// ---------------------------------------------------------------------------
// Edge cases
// ---------------------------------------------------------------------------

#[test]
fn test_ngo_schema_rejects_additional_properties() {
    let schema = load_schema("ngo.schema.json");
    let mut data = load_fixture("ngos.json");

    data[0]
        .as_object_mut()
        .expect("ngo is an object")
        .insert("bogusField".to_string(), Value::Number(123.into()));

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    assert!(
        validator.validate(&data).is_err(),
        "schema should reject additional properties"
    );
}

#[test]
fn test_null_optional_fields_accepted() {
    let schema = load_schema("ngo.schema.json");
    let mut data = load_fixture("ngos.json");

    for field in ["postal_code", "credibility_score", "achievements", "updated_at"] {
        data[0][field] = Value::Null;
    }

    let validator = jsonschema::draft202012::new(&schema).expect("schema compiles");
    let result = validator.validate(&data);
    if let Err(e) = &result {
        panic!("nulls in optional NGO fields should validate: {e}");
    }
}

#[test]
fn test_empty_array_conforms_to_all_schemas() {
    let empty = serde_json::json!([]);

    for schema_name in ["ngo.schema.json", "company.schema.json", "match.schema.json"] {
        let schema = load_schema(schema_name);
        let validator =
            jsonschema::draft202012::new(&schema).unwrap_or_else(|e| panic!("{schema_name}: {e}"));
        let result = validator.validate(&empty);
        if let Err(e) = &result {
            panic!("empty array should conform to {schema_name}: {e}");
        }
    }
}
