//! Conversion of textual dimension grammars into abstract spaces.

use searchspace::prelude::*;
use serde_json::json;

fn orion_entries() -> Vec<(&'static str, &'static str)> {
    vec![
        ("unf", "uniform(0, 1)"),
        ("uni", "uniform(0, 1, discrete=True)"),
        ("cat", "choices([\"a\", \"b\"])"),
        ("cac", "choices({\"a\": 0.2, \"b\": 0.8})"),
        ("fid", "fidelity(1, 300, 4)"),
        ("lun", "loguniform(1, 2)"),
        ("nor", "normal(0, 1)"),
        ("gau", "gaussian(1, 1)"),
    ]
}

#[test]
fn converts_a_full_textual_space() {
    let space = convert_space(orion_entries()).unwrap();
    assert_eq!(
        space.names(),
        vec!["unf", "uni", "cat", "cac", "fid", "lun", "nor", "gau"]
    );

    for sample in space.sample(5).unwrap() {
        let unf = sample["unf"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&unf));

        assert!(matches!(sample["uni"], Value::Int(0 | 1)));

        let Value::Str(cat) = &sample["cat"] else {
            panic!("expected a label");
        };
        assert!(["a", "b"].contains(&cat.as_str()));

        assert_eq!(sample["fid"], Value::Int(300));

        let lun = sample["lun"].as_f64().unwrap();
        assert!((1.0..=2.0).contains(&lun));
    }
}

#[test]
fn discrete_uniform_entry_has_the_expected_shape() {
    let space = convert_space([("uni", "uniform(0, 1, discrete=True)")]).unwrap();
    let doc = space.serialize().unwrap();
    assert_eq!(doc["uni"]["kind"], json!("uniform"));
    assert_eq!(doc["uni"]["low"], json!(0.0));
    assert_eq!(doc["uni"]["high"], json!(1.0));
    assert_eq!(doc["uni"]["discrete"], json!(true));
    assert_eq!(doc["uni"]["log"], json!(false));
}

#[test]
fn loguniform_entry_sets_the_log_flag() {
    let space = convert_space([("lun", "loguniform(1, 2)")]).unwrap();
    let doc = space.serialize().unwrap();
    assert_eq!(doc["lun"]["kind"], json!("uniform"));
    assert_eq!(doc["lun"]["log"], json!(true));
}

#[test]
fn weighted_choices_survive_conversion() {
    let space = convert_space([("cac", "choices({\"a\": 0.2, \"b\": 0.8})")]).unwrap();
    let doc = space.serialize().unwrap();
    assert_eq!(doc["cac"]["choices"][0]["weight"], json!(0.2));
    assert_eq!(doc["cac"]["choices"][1]["weight"], json!(0.8));
}

#[test]
fn converted_space_has_no_backend_bound() {
    let space = convert_space([("unf", "uniform(0, 1)")]).unwrap();
    assert!(space.backend().is_none());
}

#[test]
fn unknown_grammar_aborts_the_whole_conversion() {
    let result = convert_space([("ok", "uniform(0, 1)"), ("bad", "triangular(0, 1, 2)")]);
    let Err(Error::Parse { entry, reason }) = result else {
        panic!("expected a parse error");
    };
    assert_eq!(entry, "bad");
    assert!(reason.contains("triangular"));
}

#[test]
fn malformed_entries_name_the_offender() {
    for text in ["uniform(0", "uniform 0 1", "choices(1)", "uniform(0, 1, step=2)"] {
        let result = convert_space([("broken", text)]);
        let Err(Error::Parse { entry, .. }) = result else {
            panic!("expected a parse error for {text:?}");
        };
        assert_eq!(entry, "broken");
    }
}

#[test]
fn configuration_errors_pass_through_unwrapped() {
    assert!(matches!(
        convert_space([("bad", "uniform(2, 1)")]),
        Err(Error::InvalidBounds { .. })
    ));
    assert!(matches!(
        convert_space([("bad", "loguniform(0, 1)")]),
        Err(Error::InvalidLogBounds)
    ));
}

#[test]
fn duplicate_entry_names_are_rejected() {
    let entries = vec![("a", "uniform(0, 1)"), ("a", "normal(0, 1)")];
    assert!(matches!(
        convert_space(entries),
        Err(Error::DuplicateName { .. })
    ));
}
