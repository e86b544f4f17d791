//! Expression AST and builder DSL.
//!
//! Pipelines never splice raw JSON together. Every computed value, filter,
//! sort key, and accumulator is first built as a typed tree, then rendered
//! to its wire form by [`ValueExpr::to_wire`] and friends. The typed layer
//! is what the engine interprets; the wire form is what gets logged and
//! asserted on.

use serde_json::{json, Map, Value};

// ============================================================================
// Value expressions
// ============================================================================

/// A value-producing expression, evaluated against one document.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    /// Dot-separated field reference, rendered as `"$period.start"`.
    Field(String),
    /// The whole current document, rendered as `"$$ROOT"`.
    Root,
    /// A constant embedded in the pipeline.
    Literal(Value),
    /// Parse an RFC 3339 string into an instant.
    DateFromString { source: Box<ValueExpr> },
    /// Format an instant with a strftime-style pattern such as `"%Y-%m"`.
    DateToString {
        format: String,
        source: Box<ValueExpr>,
    },
    /// Leading substring by offset and length.
    Substr {
        source: Box<ValueExpr>,
        start: u32,
        len: u32,
    },
    /// Single element of an array value; negative indexes count from the end.
    ArrayElemAt { array: Box<ValueExpr>, index: i64 },
    /// Shallow merge of object values, later entries winning per key.
    MergeObjects(Vec<ValueExpr>),
    /// Object template with computed values, used by `$push` and `$replaceRoot`.
    Template(Vec<(String, ValueExpr)>),
}

/// References a document field: `field("temperature.low")`.
pub fn field(path: impl Into<String>) -> ValueExpr {
    ValueExpr::Field(path.into())
}

/// The current document as a whole.
pub fn root() -> ValueExpr {
    ValueExpr::Root
}

/// Embeds a constant value.
pub fn lit(value: impl Into<Value>) -> ValueExpr {
    ValueExpr::Literal(value.into())
}

/// Coerces an RFC 3339 string expression into an instant.
///
/// This is the only door from strings into the temporal domain; filters and
/// sorts compare instants, never raw strings.
pub fn date_from_string(source: ValueExpr) -> ValueExpr {
    ValueExpr::DateFromString {
        source: Box::new(source),
    }
}

/// Formats an instant, e.g. `date_to_string("%Y-%m", ...)` for month keys.
pub fn date_to_string(format: impl Into<String>, source: ValueExpr) -> ValueExpr {
    ValueExpr::DateToString {
        format: format.into(),
        source: Box::new(source),
    }
}

/// Leading substring: `substr(field("area"), 0, 1)` takes the initial.
pub fn substr(source: ValueExpr, start: u32, len: u32) -> ValueExpr {
    ValueExpr::Substr {
        source: Box::new(source),
        start,
        len,
    }
}

/// Picks one element out of an array value.
pub fn elem_at(array: ValueExpr, index: i64) -> ValueExpr {
    ValueExpr::ArrayElemAt {
        array: Box::new(array),
        index,
    }
}

/// Shallow object merge; later operands overwrite earlier keys.
pub fn merge_objects(parts: Vec<ValueExpr>) -> ValueExpr {
    ValueExpr::MergeObjects(parts)
}

/// Object template with computed entries.
pub fn template(entries: Vec<(&str, ValueExpr)>) -> ValueExpr {
    ValueExpr::Template(
        entries
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr))
            .collect(),
    )
}

impl ValueExpr {
    /// Renders the expression in pipeline wire form.
    pub fn to_wire(&self) -> Value {
        match self {
            ValueExpr::Field(path) => Value::String(format!("${path}")),
            ValueExpr::Root => Value::String("$$ROOT".to_string()),
            ValueExpr::Literal(value) => value.clone(),
            ValueExpr::DateFromString { source } => {
                json!({"$dateFromString": {"dateString": source.to_wire()}})
            }
            ValueExpr::DateToString { format, source } => {
                json!({"$dateToString": {"format": format, "date": source.to_wire()}})
            }
            ValueExpr::Substr { source, start, len } => {
                json!({"$substr": [source.to_wire(), start, len]})
            }
            ValueExpr::ArrayElemAt { array, index } => {
                json!({"$arrayElemAt": [array.to_wire(), index]})
            }
            ValueExpr::MergeObjects(parts) => {
                let parts: Vec<Value> = parts.iter().map(ValueExpr::to_wire).collect();
                json!({"$mergeObjects": parts})
            }
            ValueExpr::Template(entries) => {
                let mut obj = Map::with_capacity(entries.len());
                for (name, expr) in entries {
                    obj.insert(name.clone(), expr.to_wire());
                }
                Value::Object(obj)
            }
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Comparison operator for range filters.
///
/// Both bounds of every window in this crate are inclusive, so the
/// exclusive variants are intentionally absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Gte,
    Lte,
}

impl CmpOp {
    pub fn wire_name(self) -> &'static str {
        match self {
            CmpOp::Gte => "$gte",
            CmpOp::Lte => "$lte",
        }
    }
}

/// A document predicate used by match stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every inner filter must hold.
    And(Vec<Filter>),
    /// Field/value comparison in query form: `{"ts": {"$gte": ...}}`.
    Cmp {
        field: String,
        op: CmpOp,
        value: Value,
    },
    /// Expression comparison in `$expr` form: `{"$expr": {"$gte": ["$ts", ...]}}`.
    ///
    /// Semantically equivalent to [`Filter::Cmp`] for a field left-hand side;
    /// both spellings exist because both appear on the wire.
    ExprCmp {
        op: CmpOp,
        lhs: ValueExpr,
        rhs: Value,
    },
    /// Case-insensitive substring match over a string field.
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
}

/// Conjunction of filters: renders as `{"$and": [...]}`.
pub fn all_of(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

/// Field comparison against a literal bound.
pub fn cmp(field: impl Into<String>, op: CmpOp, value: Value) -> Filter {
    Filter::Cmp {
        field: field.into(),
        op,
        value,
    }
}

/// Expression-form comparison against a literal bound.
pub fn expr_cmp(op: CmpOp, lhs: ValueExpr, rhs: Value) -> Filter {
    Filter::ExprCmp { op, lhs, rhs }
}

/// Case-insensitive regex over a field.
pub fn regex_contains(field: impl Into<String>, pattern: impl Into<String>) -> Filter {
    Filter::Regex {
        field: field.into(),
        pattern: pattern.into(),
        case_insensitive: true,
    }
}

impl Filter {
    /// Renders the predicate body of a match stage.
    pub fn to_wire(&self) -> Value {
        match self {
            Filter::And(filters) => {
                let parts: Vec<Value> = filters.iter().map(Filter::to_wire).collect();
                json!({"$and": parts})
            }
            Filter::Cmp { field, op, value } => {
                json!({field: {op.wire_name(): value}})
            }
            Filter::ExprCmp { op, lhs, rhs } => {
                json!({"$expr": {op.wire_name(): [lhs.to_wire(), rhs]}})
            }
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                if *case_insensitive {
                    json!({field: {"$regex": pattern, "$options": "i"}})
                } else {
                    json!({field: {"$regex": pattern}})
                }
            }
        }
    }
}

// ============================================================================
// Sort keys
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn wire_value(self) -> i64 {
        match self {
            SortDir::Asc => 1,
            SortDir::Desc => -1,
        }
    }
}

/// One key of a (possibly compound) sort. Earlier keys dominate.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

/// Ascending sort key.
pub fn asc(field: impl Into<String>) -> SortKey {
    SortKey {
        field: field.into(),
        dir: SortDir::Asc,
    }
}

/// Descending sort key.
pub fn desc(field: impl Into<String>) -> SortKey {
    SortKey {
        field: field.into(),
        dir: SortDir::Desc,
    }
}

impl SortKey {
    pub(crate) fn append_wire(&self, target: &mut Map<String, Value>) {
        target.insert(self.field.clone(), json!(self.dir.wire_value()));
    }
}

// ============================================================================
// Accumulators
// ============================================================================

/// Per-group accumulator used by group and bucket stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Arithmetic mean over numeric values; null when no value is numeric.
    Avg(ValueExpr),
    /// Smallest non-null value.
    Min(ValueExpr),
    /// Largest non-null value.
    Max(ValueExpr),
    /// Number of documents in the group, rendered as `{"$sum": 1}`.
    Count,
    /// Collects one value per document into an array, in input order.
    Push(ValueExpr),
}

pub fn avg(expr: ValueExpr) -> Accumulator {
    Accumulator::Avg(expr)
}

pub fn min(expr: ValueExpr) -> Accumulator {
    Accumulator::Min(expr)
}

pub fn max(expr: ValueExpr) -> Accumulator {
    Accumulator::Max(expr)
}

pub fn count() -> Accumulator {
    Accumulator::Count
}

pub fn push(expr: ValueExpr) -> Accumulator {
    Accumulator::Push(expr)
}

impl Accumulator {
    pub fn to_wire(&self) -> Value {
        match self {
            Accumulator::Avg(expr) => json!({"$avg": expr.to_wire()}),
            Accumulator::Min(expr) => json!({"$min": expr.to_wire()}),
            Accumulator::Max(expr) => json!({"$max": expr.to_wire()}),
            Accumulator::Count => json!({"$sum": 1}),
            Accumulator::Push(expr) => json!({"$push": expr.to_wire()}),
        }
    }
}
