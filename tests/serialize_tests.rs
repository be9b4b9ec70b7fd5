//! Round-trip law and document shape for space serialization.

use searchspace::prelude::*;
use searchspace::{eq, either};
use serde_json::json;

fn reference_space() -> Space {
    let space = Space::new();
    let optim = space.categorical("optimizer", ["sgd", "adam"]).unwrap();
    let lr = space
        .loguniform("optimizer.lr", 1.0, 2.0)
        .unwrap()
        .quantization(0.01)
        .unwrap();
    lr.enable_if(either([eq(&optim, "adam"), eq(&optim, "sgd")]))
        .unwrap();
    lr.forbid_equal(1).unwrap();
    space
}

fn busy_space() -> Space {
    let space = Space::new();
    space
        .categorical_weighted("opt", [("sgd", 0.2), ("adam", 0.8)])
        .unwrap();
    space.uniform("dropout", 0.0, 0.5).unwrap();
    space
        .normal("init", 0.0, 0.1)
        .unwrap()
        .quantization(0.001)
        .unwrap();
    space.ordinal("depth", [2, 4, 8]).unwrap();
    space.fidelity("epochs", 1, 300, 4).unwrap();
    let sub = space.subspace("scheduler").unwrap();
    let warmup = sub.uniform("warmup", 0.0, 0.3).unwrap();
    warmup.forbid_in([0.1, 0.2]).unwrap();
    sub.categorical("kind", ["cosine", "linear"]).unwrap();
    space
}

#[test]
fn round_trip_law_holds() {
    for space in [reference_space(), busy_space()] {
        let serialized = space.serialize().unwrap();
        let restored = Space::from_dict(&serialized).unwrap();
        assert_eq!(restored.serialize().unwrap(), serialized);
    }
}

#[test]
fn round_trip_law_holds_through_json_text() {
    let space = busy_space();
    let serialized = space.serialize().unwrap();
    let text = serde_json::to_string(&serialized).unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let restored = Space::from_dict(&reparsed).unwrap();
    assert_eq!(restored.serialize().unwrap(), serialized);
}

#[test]
fn restored_space_samples() {
    let space = reference_space();
    let restored = Space::from_dict(&space.serialize().unwrap()).unwrap();
    assert!(restored.backend().is_none());
    let samples = restored.sample(2).unwrap();
    assert_eq!(samples.len(), 2);
}

#[test]
fn serialization_is_independent_of_binding() {
    for backend in ["random", "sobol"] {
        let space = reference_space();
        let before = space.serialize().unwrap();
        space.instantiate(backend).unwrap();
        space.sample(3).unwrap();
        assert_eq!(space.serialize().unwrap(), before);
    }
}

#[test]
fn document_shape() {
    let doc = reference_space().serialize().unwrap();

    assert_eq!(doc["optimizer"]["kind"], json!("categorical"));
    assert_eq!(doc["optimizer"]["choices"][0]["value"], json!("sgd"));

    let lr = &doc["optimizer.lr"];
    assert_eq!(lr["kind"], json!("uniform"));
    assert_eq!(lr["low"], json!(1.0));
    assert_eq!(lr["high"], json!(2.0));
    assert_eq!(lr["log"], json!(true));
    assert_eq!(lr["quantization"], json!(0.01));
    assert_eq!(lr["condition"]["op"], json!("either"));
    assert_eq!(lr["forbidden"][0]["op"], json!("equal"));
}

#[test]
fn subspaces_nest_in_the_document() {
    let doc = busy_space().serialize().unwrap();
    let scheduler = &doc["scheduler"]["__subspace__"];
    assert_eq!(scheduler["warmup"]["kind"], json!("uniform"));
    assert_eq!(scheduler["kind"]["kind"], json!("categorical"));
}

#[test]
fn from_dict_rejects_malformed_documents() {
    assert!(matches!(
        Space::from_dict(&json!({"a": {"kind": "beta"}})),
        Err(Error::Parse { .. })
    ));
    assert!(matches!(
        Space::from_dict(&json!({"a": 7})),
        Err(Error::Parse { .. })
    ));
    assert!(matches!(
        Space::from_dict(&json!(["a"])),
        Err(Error::Parse { .. })
    ));
}

#[test]
fn from_dict_accepts_textual_entries() {
    // Orion-style text mappings deserialize directly.
    let doc = json!({
        "unf": "uniform(0, 1)",
        "uni": "uniform(0, 1, discrete=True)",
        "cat": "choices([\"a\", \"b\"])",
        "cac": "choices({\"a\": 0.2, \"b\": 0.8})",
        "fid": "fidelity(1, 300, 4)",
        "lun": "loguniform(1, 2)",
        "nor": "normal(0, 1)",
        "gau": "gaussian(1, 1)",
    });
    let space = Space::from_dict(&doc).unwrap();
    assert_eq!(space.len(), 8);

    let samples = space.sample(2).unwrap();
    assert_eq!(samples.len(), 2);

    // And the canonical serialization of a textual space round-trips too.
    let serialized = space.serialize().unwrap();
    let restored = Space::from_dict(&serialized).unwrap();
    assert_eq!(restored.serialize().unwrap(), serialized);
}
