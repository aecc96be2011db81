//! In-process pipeline evaluator.

use std::cmp::Ordering;

use chrono::Datelike;
use serde_json::Value;

use super::{Accumulator, Expr, GeoNear, Group, Pipeline, Stage};
use crate::geo::{distance_meters, GeoPoint};
use crate::query::sort::sort_documents;
use crate::store::StoreError;
use crate::types::{Document, ID_FIELD};
use crate::value::{compare_values, lookup, number, parse_instant};

/// Run `pipeline` over `docs`, stage by stage, in declaration order.
pub fn run_pipeline(docs: Vec<Document>, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError> {
    let mut rows = docs;
    for (index, stage) in pipeline.stages().iter().enumerate() {
        rows = match stage {
            Stage::Match(filter) => {
                let mut kept = Vec::with_capacity(rows.len());
                for doc in rows {
                    if filter.matches(&doc)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            Stage::Group(group) => group_rows(rows, group),
            Stage::Sort(keys) => {
                sort_documents(&mut rows, keys);
                rows
            }
            Stage::Project(projection) => rows.into_iter().map(|doc| projection.apply(doc)).collect(),
            Stage::Unwind(field) => unwind(rows, field),
            Stage::AddFields(fields) => rows
                .into_iter()
                .map(|mut doc| {
                    for (name, expr) in fields {
                        let value = evaluate(expr, &doc);
                        doc.insert(name.clone(), value);
                    }
                    doc
                })
                .collect(),
            Stage::GeoNear(geo) => {
                if index != 0 {
                    return Err(StoreError::InvalidQuery(
                        "geoNear is only valid as the first pipeline stage".into(),
                    ));
                }
                geo_near(rows, geo)
            }
            Stage::Limit(n) => {
                rows.truncate(*n);
                rows
            }
        };
    }
    Ok(rows)
}

/// Evaluate an expression against one document.
pub fn evaluate(expr: &Expr, doc: &Document) -> Value {
    match expr {
        Expr::Field(path) => lookup(doc, path).cloned().unwrap_or(Value::Null),
        Expr::Literal(value) => value.clone(),
        Expr::ToUpper(inner) => match evaluate(inner, doc) {
            Value::String(s) => Value::String(s.to_uppercase()),
            Value::Null => Value::String(String::new()),
            other => Value::String(other.to_string().to_uppercase()),
        },
        Expr::Month(inner) => match evaluate(inner, doc) {
            Value::String(s) => parse_instant(&s).map_or(Value::Null, |ts| Value::from(ts.month())),
            _ => Value::Null,
        },
    }
}

fn group_rows(rows: Vec<Document>, group: &Group) -> Vec<Document> {
    let mut buckets: Vec<(Value, Vec<Document>)> = Vec::new();
    for doc in rows {
        let key = evaluate(&group.key, &doc);
        match buckets.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(doc),
            None => buckets.push((key, vec![doc])),
        }
    }

    buckets
        .into_iter()
        .map(|(key, members)| {
            let mut out = Document::new();
            out.insert(ID_FIELD.to_string(), key);
            for (name, accumulator) in &group.fields {
                out.insert(name.clone(), accumulate(accumulator, &members));
            }
            out
        })
        .collect()
}

fn accumulate(accumulator: &Accumulator, members: &[Document]) -> Value {
    let values = |expr: &Expr| -> Vec<Value> {
        members
            .iter()
            .map(|doc| evaluate(expr, doc))
            .filter(|v| !v.is_null())
            .collect()
    };

    match accumulator {
        Accumulator::Sum(expr) => {
            let nums: Vec<Value> = values(expr).into_iter().filter(Value::is_number).collect();
            let integral = nums.iter().all(|v| v.is_i64() || v.is_u64());
            let total: f64 = nums.iter().filter_map(Value::as_f64).sum();
            numeric(total, integral)
        }
        Accumulator::Avg(expr) => {
            let nums: Vec<f64> = values(expr).iter().filter_map(Value::as_f64).collect();
            if nums.is_empty() {
                Value::Null
            } else {
                number(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        Accumulator::Min(expr) => values(expr)
            .into_iter()
            .min_by(compare_values)
            .unwrap_or(Value::Null),
        Accumulator::Max(expr) => values(expr)
            .into_iter()
            .max_by(compare_values)
            .unwrap_or(Value::Null),
        Accumulator::Push(expr) => Value::Array(values(expr)),
    }
}

fn numeric(value: f64, integral: bool) -> Value {
    if integral && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        number(value)
    }
}

fn unwind(rows: Vec<Document>, field: &str) -> Vec<Document> {
    let mut out = Vec::with_capacity(rows.len());
    for doc in rows {
        match doc.get(field) {
            Some(Value::Array(items)) => {
                for item in items.clone() {
                    let mut copy = doc.clone();
                    copy.insert(field.to_string(), item);
                    out.push(copy);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => out.push(doc),
        }
    }
    out
}

fn geo_near(rows: Vec<Document>, geo: &GeoNear) -> Vec<Document> {
    let mut located: Vec<(f64, Document)> = rows
        .into_iter()
        .filter_map(|mut doc| {
            let point = lookup(&doc, &geo.key).and_then(GeoPoint::from_geojson)?;
            let distance = distance_meters(geo.near, point) * geo.distance_multiplier;
            doc.insert(geo.distance_field.clone(), number(distance));
            Some((distance, doc))
        })
        .collect();
    located.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    located.into_iter().map(|(_, doc)| doc).collect()
}
