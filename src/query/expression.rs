//! Query expression types and AST nodes.

use std::fmt;

/// A parsed query expression (AST node).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    Compare(Comparison),
    Not(Box<QueryExpression>),
    And(Vec<QueryExpression>),
    Or(Vec<QueryExpression>),
}

/// A single attribute comparison (leaf node in the AST).
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Attribute name, or one of the pseudo-attributes `name`, `size`,
    /// `last_modified`.
    pub attribute: String,
    pub op: ComparisonOp,
    pub value: ComparisonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ComparisonValue {
    /// Classifies an unquoted literal. Quoted literals stay textual.
    pub fn from_word(word: &str) -> Self {
        if let Ok(value) = word.parse::<i64>() {
            Self::Int(value)
        } else if let Ok(value) = word.parse::<f64>() {
            Self::Float(value)
        } else {
            Self::Text(word.to_string())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare(comparison) => write!(f, "{comparison}"),
            Self::Not(inner) => write!(f, "!({inner})"),
            Self::And(parts) => write_joined(f, parts, " && "),
            Self::Or(parts) => write_joined(f, parts, " || "),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    parts: &[QueryExpression],
    separator: &str,
) -> fmt::Result {
    write!(f, "(")?;
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{part}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.attribute, self.op.symbol(), self.value)
    }
}

impl fmt::Display for ComparisonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "\"{text}\""),
        }
    }
}
