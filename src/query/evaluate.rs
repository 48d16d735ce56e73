//! Expression evaluation against on-disk entries.
//!
//! `name`, `size` and `last_modified` evaluate against file metadata;
//! any other attribute is read from the entry's attribute store. A
//! comparison on an attribute the entry does not carry never matches,
//! `!=` included; IO failures during evaluation count as non-matches
//! rather than aborting a whole query.

use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::attrs::{self, AttrFlags};
use crate::types::AttrValue;

use super::expression::{Comparison, ComparisonOp, ComparisonValue, QueryExpression};
use super::text_match::{has_wildcards, wildcard_match};

/// A compiled matcher for one query expression.
#[derive(Debug, Clone)]
pub struct Matcher {
    expression: QueryExpression,
}

impl Matcher {
    pub fn new(expression: QueryExpression) -> Self {
        Self { expression }
    }

    pub fn expression(&self) -> &QueryExpression {
        &self.expression
    }

    /// Whether the entry at `path` satisfies the expression.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(metadata) = path.symlink_metadata() else {
            return false;
        };
        evaluate(&self.expression, path, &metadata)
    }
}

fn evaluate(expression: &QueryExpression, path: &Path, metadata: &Metadata) -> bool {
    match expression {
        QueryExpression::Compare(comparison) => evaluate_comparison(comparison, path, metadata),
        QueryExpression::Not(inner) => !evaluate(inner, path, metadata),
        QueryExpression::And(parts) => parts.iter().all(|part| evaluate(part, path, metadata)),
        QueryExpression::Or(parts) => parts.iter().any(|part| evaluate(part, path, metadata)),
    }
}

/// The attribute's value as seen by the comparison.
enum Operand {
    Int(i64),
    Float(f64),
    Text(String),
}

fn evaluate_comparison(comparison: &Comparison, path: &Path, metadata: &Metadata) -> bool {
    let Some(operand) = load_operand(&comparison.attribute, path, metadata) else {
        return false;
    };
    match operand {
        Operand::Int(actual) => compare_numeric(actual as f64, comparison),
        Operand::Float(actual) => compare_numeric(actual, comparison),
        Operand::Text(actual) => compare_text(&actual, comparison),
    }
}

fn load_operand(attribute: &str, path: &Path, metadata: &Metadata) -> Option<Operand> {
    match attribute {
        "name" => Some(Operand::Text(path.file_name()?.to_string_lossy().into_owned())),
        "size" => Some(Operand::Int(metadata.len() as i64)),
        "last_modified" => {
            let modified = metadata.modified().ok()?;
            let seconds = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
            Some(Operand::Int(seconds as i64))
        }
        _ => {
            let (type_code, payload) =
                attrs::read_attr(path, attribute, AttrFlags::empty()).ok()??;
            match AttrValue::from_bytes(type_code, &payload) {
                Ok(AttrValue::Float(value)) => Some(Operand::Float(f64::from(value))),
                Ok(AttrValue::Double(value)) => Some(Operand::Float(value)),
                Ok(value) => {
                    if let Some(int) = value.as_i64() {
                        Some(Operand::Int(int))
                    } else if let Some(text) = value.as_str() {
                        Some(Operand::Text(text.to_string()))
                    } else if let AttrValue::Raw(bytes) = value {
                        Some(Operand::Text(String::from_utf8_lossy(&bytes).into_owned()))
                    } else {
                        None
                    }
                }
                // No typed decoding: compare the payload as text.
                Err(_) => Some(Operand::Text(String::from_utf8_lossy(&payload).into_owned())),
            }
        }
    }
}

fn compare_numeric(actual: f64, comparison: &Comparison) -> bool {
    let expected = match comparison.value.as_f64() {
        Some(expected) => expected,
        // Numeric attribute against a textual value: fall back to a
        // textual rendering so `size=="*0"` style patterns still work.
        None => {
            return compare_text(&format_numeric(actual), comparison);
        }
    };
    match comparison.op {
        ComparisonOp::Eq => actual == expected,
        ComparisonOp::Ne => actual != expected,
        ComparisonOp::Lt => actual < expected,
        ComparisonOp::Le => actual <= expected,
        ComparisonOp::Gt => actual > expected,
        ComparisonOp::Ge => actual >= expected,
    }
}

fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn compare_text(actual: &str, comparison: &Comparison) -> bool {
    let expected = match &comparison.value {
        ComparisonValue::Text(text) => text.clone(),
        ComparisonValue::Int(value) => value.to_string(),
        ComparisonValue::Float(value) => value.to_string(),
    };
    match comparison.op {
        ComparisonOp::Eq if has_wildcards(&expected) => wildcard_match(&expected, actual),
        ComparisonOp::Ne if has_wildcards(&expected) => !wildcard_match(&expected, actual),
        ComparisonOp::Eq => actual == expected,
        ComparisonOp::Ne => actual != expected,
        ComparisonOp::Lt => actual < expected.as_str(),
        ComparisonOp::Le => actual <= expected.as_str(),
        ComparisonOp::Gt => actual > expected.as_str(),
        ComparisonOp::Ge => actual >= expected.as_str(),
    }
}
