//! Compiled JSONPath-subset expressions and their evaluation.
//!
//! A textual path is compiled once, up front, into a [`PathExpression`]:
//! an ordered list of [`PathSegment`]s plus a handful of precomputed flags
//! that let the parser decide, without re-inspecting the segment list on
//! every element, whether it can narrow straight to a target container
//! instead of materializing the whole document.

mod filter;
mod parser;

pub use filter::{FilterOp, PathFilter};
pub use parser::PathParser;

/// One step of a compiled path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Matches only the document root.
    Root,
    /// An object member access. `recursive` marks a `..name` descent.
    Property { name: String, recursive: bool },
    /// `.*` or `[*]`: every child of an array or object.
    Wildcard,
    /// `[n]`; negative counts from the end of a materialized array.
    Index(i64),
    /// `[start:end:step]`, bounds nullable, step always `>= 1`.
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: i64,
    },
    /// `[?(@.a.b OP literal)]`.
    Filter(FilterExpr),
}

/// A compiled `?(@.path OP literal)` filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub property_chain: Vec<String>,
    pub op: Option<FilterOp>,
    pub literal: Option<FilterLiteral>,
}

/// A parsed filter literal.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterLiteral {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// A compiled path expression: original text, segment list, and the flags
/// the parser consults to decide how aggressively it can stream.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    text: String,
    segments: Vec<PathSegment>,
    has_recursive: bool,
    can_stream_array_elements: bool,
    early_termination: Option<usize>,
    can_use_simple_streaming: bool,
}

impl PathExpression {
    pub(crate) fn new(text: String, segments: Vec<PathSegment>) -> Self {
        let has_recursive = segments
            .iter()
            .any(|s| matches!(s, PathSegment::Property { recursive: true, .. }));
        let can_stream_array_elements = !has_recursive;

        let early_termination = match segments.last() {
            Some(PathSegment::Index(i)) if *i >= 0 => Some(*i as usize + 1),
            Some(PathSegment::Slice {
                end: Some(end),
                step: 1,
                ..
            }) if *end > 0 => Some(*end as usize),
            _ => None,
        };

        let can_use_simple_streaming = !has_recursive && Self::is_simple_shape(&segments);

        Self {
            text,
            segments,
            has_recursive,
            can_stream_array_elements,
            early_termination,
            can_use_simple_streaming,
        }
    }

    /// `Root, (Property)*, (Wildcard | Index | Slice | Filter), (Property)*`
    /// with at most one bracketed selector and no recursive segments.
    fn is_simple_shape(segments: &[PathSegment]) -> bool {
        let mut iter = segments.iter();
        match iter.next() {
            Some(PathSegment::Root) => {}
            _ => return false,
        }

        let mut seen_selector = false;
        for segment in iter {
            match segment {
                PathSegment::Property { recursive: false, .. } => {}
                PathSegment::Index(i) if *i < 0 => return false,
                PathSegment::Wildcard | PathSegment::Index(_) | PathSegment::Slice { .. } | PathSegment::Filter(_) => {
                    if seen_selector {
                        return false;
                    }
                    seen_selector = true;
                }
                PathSegment::Property { recursive: true, .. } | PathSegment::Root => return false,
            }
        }
        seen_selector
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn has_recursive(&self) -> bool {
        self.has_recursive
    }

    pub fn can_stream_array_elements(&self) -> bool {
        self.can_stream_array_elements
    }

    pub fn can_use_simple_streaming(&self) -> bool {
        self.can_use_simple_streaming
    }

    /// Index (exclusive upper bound, 0-based) at which iteration may stop,
    /// if the last segment names a bounded position.
    pub fn early_termination(&self) -> Option<usize> {
        self.early_termination
    }
}

/// Thin query surface over a compiled [`PathExpression`], used by the
/// parser's path-directed streaming mode.
#[derive(Debug, Clone)]
pub struct PathEvaluator {
    expr: PathExpression,
}

impl PathEvaluator {
    pub fn new(expr: PathExpression) -> Self {
        Self { expr }
    }

    pub fn expression(&self) -> &PathExpression {
        &self.expr
    }

    pub fn has_early_termination(&self) -> bool {
        self.expr.early_termination.is_some()
    }

    pub fn termination_index(&self) -> Option<usize> {
        self.expr.early_termination
    }

    pub fn can_use_simple_streaming(&self) -> bool {
        self.expr.can_use_simple_streaming
    }

    /// The first bracketed-or-wildcard selector segment and its position in
    /// the segment list, for a simple-streaming-shaped expression.
    pub fn selector(&self) -> Option<(usize, &PathSegment)> {
        self.expr.segments.iter().enumerate().find(|(_, s)| {
            matches!(
                s,
                PathSegment::Wildcard | PathSegment::Index(_) | PathSegment::Slice { .. } | PathSegment::Filter(_)
            )
        })
    }

    /// Property names leading up to the selector (the container to descend
    /// into before streaming begins).
    pub fn leading_properties(&self) -> Vec<&str> {
        let selector_pos = self.selector().map(|(i, _)| i).unwrap_or(self.expr.segments.len());
        self.expr.segments[..selector_pos]
            .iter()
            .filter_map(|s| match s {
                PathSegment::Property { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Property names following the selector (applied to each streamed
    /// element after it is materialized).
    pub fn trailing_properties(&self) -> Vec<&str> {
        let selector_pos = self.selector().map(|(i, _)| i + 1).unwrap_or(self.expr.segments.len());
        self.expr.segments[selector_pos..]
            .iter()
            .filter_map(|s| match s {
                PathSegment::Property { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(path: &str) -> PathExpression {
        PathParser::new(path).parse().unwrap()
    }

    #[test]
    fn wildcard_selector_enables_simple_streaming() {
        let expr = compile("$.items[*]");
        assert!(expr.can_use_simple_streaming());
        assert!(!expr.has_recursive());
    }

    #[test]
    fn recursive_property_disables_simple_streaming() {
        let expr = compile("$..name");
        assert!(expr.has_recursive());
        assert!(!expr.can_use_simple_streaming());
    }

    #[test]
    fn bounded_index_has_early_termination() {
        let expr = compile("$.items[2]");
        assert_eq!(expr.early_termination(), Some(3));
    }

    #[test]
    fn negative_index_has_no_early_termination() {
        let expr = compile("$.items[-1]");
        assert_eq!(expr.early_termination(), None);
    }

    #[test]
    fn negative_index_disables_simple_streaming() {
        let expr = compile("$.items[-1]");
        assert!(!expr.can_use_simple_streaming());
    }

    #[test]
    fn slice_with_bounded_end_has_early_termination() {
        let expr = compile("$.items[0:2]");
        assert_eq!(expr.early_termination(), Some(2));
    }

    #[test]
    fn two_selectors_is_not_simple_shape() {
        let expr = compile("$.a[*].b[0]");
        assert!(!expr.can_use_simple_streaming());
    }

    #[test]
    fn evaluator_splits_leading_and_trailing_properties() {
        let expr = compile("$.items[0:2].v");
        let evaluator = PathEvaluator::new(expr);
        assert_eq!(evaluator.leading_properties(), vec!["items"]);
        assert_eq!(evaluator.trailing_properties(), vec!["v"]);
    }
}
