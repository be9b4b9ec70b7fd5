//! Serialization of the abstract model to and from structured documents.
//!
//! The document shape, per dimension:
//!
//! ```json
//! {
//!   "optimizer.lr": {
//!     "kind": "uniform",
//!     "low": 1.0,
//!     "high": 2.0,
//!     "discrete": false,
//!     "log": true,
//!     "quantization": 0.01,
//!     "condition": {"op": "eq", "dim": "optimizer", "value": "sgd"},
//!     "forbidden": [{"op": "equal", "value": 1}]
//!   }
//! }
//! ```
//!
//! Nested subspaces serialize as `{"name": {"__subspace__": {...}}}`. Only
//! strings, numbers, booleans, null, arrays, and string-keyed objects appear,
//! so every document is valid JSON.

use serde_json::{Map, Value as Json};

use crate::convert;
use crate::dimension::{Dimension, Kind};
use crate::error::{Error, Result};
use crate::expr::{Expr, Forbidden};
use crate::space::{Entry, Space};
use crate::value::Value;

fn parse_err(entry: &str, reason: impl Into<String>) -> Error {
    Error::Parse {
        entry: entry.to_owned(),
        reason: reason.into(),
    }
}

pub(crate) fn space_doc(space: &Space) -> Result<Json> {
    let mut doc = Map::new();
    for (name, entry) in space.entries() {
        let value = match entry {
            Entry::Dimension(dim) => dimension_doc(&dim)?,
            Entry::Subspace(sub) => {
                let mut wrapper = Map::new();
                wrapper.insert("__subspace__".to_owned(), space_doc(&sub)?);
                Json::Object(wrapper)
            }
        };
        doc.insert(name, value);
    }
    Ok(Json::Object(doc))
}

fn dimension_doc(dim: &Dimension) -> Result<Json> {
    let mut doc = Map::new();
    doc.insert(
        "kind".to_owned(),
        Json::String(dim.kind().name().to_owned()),
    );
    match dim.kind() {
        Kind::Uniform { low, high } => {
            doc.insert("low".to_owned(), Json::from(*low));
            doc.insert("high".to_owned(), Json::from(*high));
        }
        Kind::Normal { loc, scale } => {
            doc.insert("loc".to_owned(), Json::from(*loc));
            doc.insert("scale".to_owned(), Json::from(*scale));
        }
        Kind::Categorical { choices } => {
            let choices: Vec<Json> = choices
                .iter()
                .map(|(label, weight)| {
                    let mut choice = Map::new();
                    choice.insert("value".to_owned(), label.to_json());
                    choice.insert("weight".to_owned(), Json::from(*weight));
                    Json::Object(choice)
                })
                .collect();
            doc.insert("choices".to_owned(), Json::Array(choices));
        }
        Kind::Ordinal { values } => {
            let values: Vec<Json> = values.iter().map(Value::to_json).collect();
            doc.insert("values".to_owned(), Json::Array(values));
        }
        Kind::Fidelity { low, high, base } => {
            doc.insert("low".to_owned(), Json::from(*low));
            doc.insert("high".to_owned(), Json::from(*high));
            doc.insert("base".to_owned(), Json::from(*base));
        }
    }
    doc.insert("discrete".to_owned(), Json::Bool(dim.discrete()));
    doc.insert("log".to_owned(), Json::Bool(dim.log()));
    doc.insert(
        "quantization".to_owned(),
        dim.quantization().map_or(Json::Null, Json::from),
    );
    if let Some(condition) = dim.condition() {
        let condition = serde_json::to_value(condition)
            .map_err(|_| Error::Internal("condition with a non-finite literal"))?;
        doc.insert("condition".to_owned(), condition);
    }
    if !dim.forbidden().is_empty() {
        let forbidden = serde_json::to_value(dim.forbidden())
            .map_err(|_| Error::Internal("forbidden clause with a non-finite literal"))?;
        doc.insert("forbidden".to_owned(), forbidden);
    }
    Ok(Json::Object(doc))
}

pub(crate) fn space_from_doc(doc: &Json) -> Result<Space> {
    let space = Space::new();
    fill_space(&space, doc)?;
    Ok(space)
}

fn fill_space(space: &Space, doc: &Json) -> Result<()> {
    let Some(entries) = doc.as_object() else {
        return Err(parse_err(
            "<root>",
            "expected an object of dimension entries",
        ));
    };
    for (name, entry) in entries {
        match entry {
            Json::String(text) => {
                space.insert_dimension(convert::parse_dimension(name, text)?)?;
            }
            Json::Object(obj) => {
                if let Some(sub_doc) = obj.get("__subspace__") {
                    let sub = space.subspace(name)?;
                    fill_space(&sub, sub_doc)?;
                } else {
                    space.insert_dimension(dimension_from_doc(name, obj)?)?;
                }
            }
            _ => {
                return Err(parse_err(
                    name,
                    "expected a grammar string, a dimension object, or a subspace",
                ));
            }
        }
    }
    Ok(())
}

fn f64_field(name: &str, obj: &Map<String, Json>, key: &str) -> Result<f64> {
    obj.get(key)
        .and_then(Json::as_f64)
        .ok_or_else(|| parse_err(name, format!("missing or non-numeric '{key}'")))
}

fn i64_field(name: &str, obj: &Map<String, Json>, key: &str) -> Result<i64> {
    obj.get(key)
        .and_then(Json::as_i64)
        .ok_or_else(|| parse_err(name, format!("missing or non-integer '{key}'")))
}

fn value_field(name: &str, doc: &Json) -> Result<Value> {
    Value::from_json(doc).ok_or_else(|| parse_err(name, "expected a scalar value"))
}

fn dimension_from_doc(name: &str, obj: &Map<String, Json>) -> Result<Dimension> {
    let kind = obj
        .get("kind")
        .and_then(Json::as_str)
        .ok_or_else(|| parse_err(name, "missing 'kind'"))?;

    let mut dim = match kind {
        "uniform" => Dimension::uniform(
            name,
            f64_field(name, obj, "low")?,
            f64_field(name, obj, "high")?,
        )?,
        "normal" => Dimension::normal(
            name,
            f64_field(name, obj, "loc")?,
            f64_field(name, obj, "scale")?,
        )?,
        "categorical" => {
            let docs = obj
                .get("choices")
                .and_then(Json::as_array)
                .ok_or_else(|| parse_err(name, "missing 'choices' array"))?;
            let mut choices = Vec::with_capacity(docs.len());
            for choice in docs {
                let choice = choice
                    .as_object()
                    .ok_or_else(|| parse_err(name, "choices must be {value, weight} objects"))?;
                let label = choice
                    .get("value")
                    .ok_or_else(|| parse_err(name, "choice missing 'value'"))
                    .and_then(|v| value_field(name, v))?;
                let weight = choice
                    .get("weight")
                    .and_then(Json::as_f64)
                    .ok_or_else(|| parse_err(name, "choice missing numeric 'weight'"))?;
                choices.push((label, weight));
            }
            Dimension::categorical(name, choices)?
        }
        "ordinal" => {
            let docs = obj
                .get("values")
                .and_then(Json::as_array)
                .ok_or_else(|| parse_err(name, "missing 'values' array"))?;
            let values = docs
                .iter()
                .map(|v| value_field(name, v))
                .collect::<Result<Vec<Value>>>()?;
            Dimension::ordinal(name, values)?
        }
        "fidelity" => Dimension::fidelity(
            name,
            i64_field(name, obj, "low")?,
            i64_field(name, obj, "high")?,
            i64_field(name, obj, "base")?,
        )?,
        other => return Err(parse_err(name, format!("unknown kind '{other}'"))),
    };

    if obj.get("discrete").and_then(Json::as_bool).unwrap_or(false) {
        dim.set_discrete()?;
    }
    if obj.get("log").and_then(Json::as_bool).unwrap_or(false) {
        dim.set_log()?;
    }
    if let Some(q) = obj.get("quantization")
        && !q.is_null()
    {
        let q = q
            .as_f64()
            .ok_or_else(|| parse_err(name, "non-numeric 'quantization'"))?;
        dim.set_quantization(q)?;
    }
    if let Some(condition) = obj.get("condition") {
        let expr: Expr = serde_json::from_value(condition.clone())
            .map_err(|e| parse_err(name, format!("bad condition: {e}")))?;
        dim.set_condition(expr);
    }
    if let Some(forbidden) = obj.get("forbidden") {
        let clauses: Vec<Forbidden> = serde_json::from_value(forbidden.clone())
            .map_err(|e| parse_err(name, format!("bad forbidden clauses: {e}")))?;
        for clause in clauses {
            dim.push_forbidden(clause);
        }
    }
    Ok(dim)
}
