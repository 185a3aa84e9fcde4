//! Full in-memory walk of a [`Value`] tree against a compiled path.

use super::{FilterExpr, FilterLiteral, PathExpression, PathSegment};
use crate::value::Value;

/// Comparison operator inside a `?(@.path OP literal)` filter segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Walks a fully materialized [`Value`] against a compiled [`PathExpression`]
/// and collects every match, used when the expression cannot be streamed
/// directly (recursive descent, root-only paths, multiple selectors).
pub struct PathFilter<'a> {
    expr: &'a PathExpression,
}

impl<'a> PathFilter<'a> {
    pub fn new(expr: &'a PathExpression) -> Self {
        Self { expr }
    }

    pub fn evaluate<'v>(&self, root: &'v Value) -> Vec<&'v Value> {
        let mut matches = vec![root];
        for segment in self.expr.segments() {
            let mut next = Vec::new();
            for value in matches {
                Self::apply_segment(segment, value, &mut next);
            }
            matches = next;
        }
        matches
    }

    fn apply_segment<'v>(segment: &PathSegment, value: &'v Value, out: &mut Vec<&'v Value>) {
        match segment {
            PathSegment::Root => out.push(value),
            PathSegment::Property { name, recursive } => {
                if *recursive {
                    Self::collect_recursive(name, value, out);
                } else if let Value::Object(obj) = value {
                    if let Some(found) = obj.get(name) {
                        out.push(found);
                    }
                }
            }
            PathSegment::Wildcard => match value {
                Value::Array(items) => out.extend(items.iter()),
                Value::Object(obj) => out.extend(obj.iter().map(|(_, v)| v)),
                _ => {}
            },
            PathSegment::Index(index) => {
                if let Value::Array(items) = value {
                    if let Some(resolved) = resolve_index(*index, items.len()) {
                        out.push(&items[resolved]);
                    }
                }
            }
            PathSegment::Slice { start, end, step } => {
                if let Value::Array(items) = value {
                    for i in slice_indices(*start, *end, *step, items.len()) {
                        out.push(&items[i]);
                    }
                }
            }
            PathSegment::Filter(filter) => {
                if let Value::Array(items) = value {
                    out.extend(items.iter().filter(|item| matches_filter(filter, item)));
                } else if matches_filter(filter, value) {
                    out.push(value);
                }
            }
        }
    }

    fn collect_recursive<'v>(name: &str, value: &'v Value, out: &mut Vec<&'v Value>) {
        match value {
            Value::Object(obj) => {
                for (key, child) in obj.iter() {
                    if key == name {
                        out.push(child);
                    }
                    Self::collect_recursive(name, child, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    Self::collect_recursive(name, item, out);
                }
            }
            _ => {}
        }
    }
}

/// Resolves a JSONPath index (possibly negative) against a length, returning
/// `None` when it falls outside `[0, len)`.
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len as i64 + index
    } else {
        index
    };
    if resolved >= 0 && (resolved as usize) < len {
        Some(resolved as usize)
    } else {
        None
    }
}

/// Standard slice semantics with nullable, possibly negative bounds.
pub fn slice_indices(start: Option<i64>, end: Option<i64>, step: i64, len: usize) -> Vec<usize> {
    if len == 0 || step < 1 {
        return Vec::new();
    }
    let len_i = len as i64;
    let normalize = |value: i64| -> i64 {
        if value < 0 {
            (len_i + value).max(0)
        } else {
            value.min(len_i)
        }
    };
    let start = normalize(start.unwrap_or(0));
    let end = normalize(end.unwrap_or(len_i));

    let mut out = Vec::new();
    let mut i = start;
    while i < end {
        out.push(i as usize);
        i += step;
    }
    out
}

fn matches_filter(filter: &FilterExpr, candidate: &Value) -> bool {
    let mut current = candidate;
    for name in &filter.property_chain {
        match current.as_object().and_then(|obj| obj.get(name)) {
            Some(next) => current = next,
            None => return false,
        }
    }

    match (&filter.op, &filter.literal) {
        (None, None) => true, // `@.a.b.c` alone: existence test
        (Some(op), Some(literal)) => compare(current, *op, literal),
        _ => false,
    }
}

fn compare(value: &Value, op: FilterOp, literal: &FilterLiteral) -> bool {
    let ordering = match (value, literal) {
        (Value::Integer(a), FilterLiteral::Integer(b)) => (*a as f64).partial_cmp(&(*b as f64)),
        (Value::Integer(a), FilterLiteral::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), FilterLiteral::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), FilterLiteral::Float(b)) => a.partial_cmp(b),
        (Value::String(a), FilterLiteral::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Bool(a), FilterLiteral::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, FilterLiteral::Null) => Some(std::cmp::Ordering::Equal),
        _ => None,
    };

    match op {
        FilterOp::Eq | FilterOp::StrictEq => ordering == Some(std::cmp::Ordering::Equal),
        FilterOp::Ne | FilterOp::StrictNe => ordering != Some(std::cmp::Ordering::Equal),
        FilterOp::Lt => ordering == Some(std::cmp::Ordering::Less),
        FilterOp::Le => matches!(ordering, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)),
        FilterOp::Gt => ordering == Some(std::cmp::Ordering::Greater),
        FilterOp::Ge => matches!(ordering, Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)),
    }
}
