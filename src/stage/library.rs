//! Stage AST and constructor library.
//!
//! Each constructor returns a [`Stage`] (or a short stage fragment) with the
//! exact wire shape the reworked forecast queries rely on. Composition into
//! full pipelines happens in [`crate::pipeline::compose`]; nothing here knows
//! about intents or collections.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::document::wire_instant;

use super::expr::{
    all_of, cmp, date_from_string, date_to_string, elem_at, expr_cmp, field, merge_objects,
    regex_contains, root, substr, Accumulator, CmpOp, Filter, SortKey, ValueExpr,
};

// ============================================================================
// Stage AST
// ============================================================================

/// One aggregation stage.
///
/// The variants cover exactly the surface the forecast queries use; an
/// unsupported shape is unrepresentable rather than rejected at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep only documents matching the filter.
    Match(Filter),
    /// Assign computed fields, in order. Existing fields are overwritten.
    Set(Vec<(String, ValueExpr)>),
    /// Reshape each document to the listed fields.
    Project(Vec<ProjectField>),
    /// Drop the listed paths from each document.
    Unset(Vec<String>),
    /// Stable sort by one or more keys; earlier keys dominate.
    Sort(Vec<SortKey>),
    /// Truncate the stream after `n` documents.
    Limit(u64),
    /// Fold the stream into one document per distinct key.
    Group(GroupSpec),
    /// Run named sub-pipelines over the same input; yields a single document.
    Facet(Vec<(String, Vec<Stage>)>),
    /// Partition documents into labelled ranges.
    Bucket(BucketSpec),
    /// Insert synthetic documents so an instant field covers a window at a
    /// fixed step.
    Densify(DensifySpec),
    /// Give missing or null fields a constant value.
    Fill(Vec<(String, Value)>),
    /// Left outer join against another collection, matches collected into an
    /// array field.
    Lookup(LookupSpec),
    /// Replace each document with the result of an object expression.
    ReplaceRoot(ValueExpr),
}

/// One entry of a project stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectField {
    /// Pass the field through unchanged: `"area": 1`.
    Include(String),
    /// Bind a new name to an expression: `"lat": "$latitude"`.
    Computed { target: String, source: ValueExpr },
}

/// Group stage description: a key expression plus named accumulators.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub key: ValueExpr,
    pub fields: Vec<(String, Accumulator)>,
}

/// Bucket stage description.
///
/// `boundaries` must be ascending and at least two long; each bucket spans
/// `[boundaries[i], boundaries[i + 1])` and everything outside the covered
/// range lands in the bucket labelled `default_label`.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSpec {
    pub group_by: ValueExpr,
    pub boundaries: Vec<Value>,
    pub default_label: String,
    pub output: Vec<(String, Accumulator)>,
}

/// Densify stage description. Both window bounds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct DensifySpec {
    pub field: String,
    pub step_hours: i64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Lookup stage description.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSpec {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

impl Stage {
    /// Wire name of the stage, e.g. `"$match"`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Set(_) => "$set",
            Stage::Project(_) => "$project",
            Stage::Unset(_) => "$unset",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
            Stage::Group(_) => "$group",
            Stage::Facet(_) => "$facet",
            Stage::Bucket(_) => "$bucket",
            Stage::Densify(_) => "$densify",
            Stage::Fill(_) => "$fill",
            Stage::Lookup(_) => "$lookup",
            Stage::ReplaceRoot(_) => "$replaceRoot",
        }
    }

    /// Renders the stage in pipeline wire form.
    pub fn to_wire(&self) -> Value {
        match self {
            Stage::Match(filter) => json!({"$match": filter.to_wire()}),
            Stage::Set(assignments) => {
                let mut body = Map::with_capacity(assignments.len());
                for (name, expr) in assignments {
                    body.insert(name.clone(), expr.to_wire());
                }
                json!({"$set": body})
            }
            Stage::Project(fields) => {
                let mut body = Map::with_capacity(fields.len());
                for projected in fields {
                    match projected {
                        ProjectField::Include(name) => {
                            body.insert(name.clone(), json!(1));
                        }
                        ProjectField::Computed { target, source } => {
                            body.insert(target.clone(), source.to_wire());
                        }
                    }
                }
                json!({"$project": body})
            }
            Stage::Unset(fields) => json!({"$unset": fields}),
            Stage::Sort(keys) => {
                let mut body = Map::with_capacity(keys.len());
                for key in keys {
                    key.append_wire(&mut body);
                }
                json!({"$sort": body})
            }
            Stage::Limit(n) => json!({"$limit": n}),
            Stage::Group(spec) => {
                let mut body = Map::with_capacity(spec.fields.len() + 1);
                body.insert("_id".to_string(), spec.key.to_wire());
                for (name, acc) in &spec.fields {
                    body.insert(name.clone(), acc.to_wire());
                }
                json!({"$group": body})
            }
            Stage::Facet(arms) => {
                let mut body = Map::with_capacity(arms.len());
                for (name, stages) in arms {
                    let wire: Vec<Value> = stages.iter().map(Stage::to_wire).collect();
                    body.insert(name.clone(), Value::Array(wire));
                }
                json!({"$facet": body})
            }
            Stage::Bucket(spec) => {
                let mut output = Map::with_capacity(spec.output.len());
                for (name, acc) in &spec.output {
                    output.insert(name.clone(), acc.to_wire());
                }
                json!({"$bucket": {
                    "groupBy": spec.group_by.to_wire(),
                    "boundaries": spec.boundaries,
                    "default": spec.default_label,
                    "output": output,
                }})
            }
            Stage::Densify(spec) => json!({"$densify": {
                "field": spec.field,
                "range": {
                    "step": spec.step_hours,
                    "unit": "hour",
                    "bounds": [wire_instant(spec.from), wire_instant(spec.to)],
                },
            }}),
            Stage::Fill(fills) => {
                let mut output = Map::with_capacity(fills.len());
                for (name, value) in fills {
                    output.insert(name.clone(), json!({"value": value}));
                }
                json!({"$fill": {"output": output}})
            }
            Stage::Lookup(spec) => json!({"$lookup": {
                "from": spec.from,
                "localField": spec.local_field,
                "foreignField": spec.foreign_field,
                "as": spec.as_field,
            }}),
            Stage::ReplaceRoot(expr) => json!({"$replaceRoot": {"newRoot": expr.to_wire()}}),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Match stage from a prepared filter.
pub fn match_on(filter: Filter) -> Stage {
    Stage::Match(filter)
}

/// Set stage from assignment pairs.
pub fn set(assignments: Vec<(&str, ValueExpr)>) -> Stage {
    Stage::Set(
        assignments
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr))
            .collect(),
    )
}

/// Assignment that coerces an RFC 3339 string field into an instant field.
///
/// `coerce_timestamp("period.start", "start")` yields the `$set` entry
/// `start: {$dateFromString: {dateString: "$period.start"}}`. Until a record
/// passes through such an assignment its timestamps are ordinary strings and
/// never participate in temporal comparisons.
pub fn coerce_timestamp<'a>(source: &str, target: &'a str) -> (&'a str, ValueExpr) {
    (target, date_from_string(field(source)))
}

/// Assignment that extracts the first character of a string field.
pub fn first_letter<'a>(source: &str, target: &'a str) -> (&'a str, ValueExpr) {
    (target, substr(field(source), 0, 1))
}

/// Inclusive instant-range match over a coerced field, both bounds in
/// query form.
pub fn instant_range(field_name: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Stage {
    match_on(all_of(vec![
        cmp(field_name, CmpOp::Gte, wire_instant(from)),
        cmp(field_name, CmpOp::Lte, wire_instant(to)),
    ]))
}

/// Inclusive instant-range match with the lower bound spelled in `$expr`
/// form. Equivalent in meaning to [`instant_range`]; kept because both
/// spellings appear on the wire.
pub fn instant_range_expr_lower(
    field_name: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Stage {
    match_on(all_of(vec![
        expr_cmp(CmpOp::Gte, field(field_name), wire_instant(from)),
        cmp(field_name, CmpOp::Lte, wire_instant(to)),
    ]))
}

/// Case-insensitive substring match over the `area` field.
pub fn area_keyword(keyword: &str) -> Stage {
    match_on(regex_contains("area", format!(".*{keyword}.*")))
}

/// Sort stage from compound keys.
pub fn sort_by(keys: Vec<SortKey>) -> Stage {
    Stage::Sort(keys)
}

/// Limit stage.
pub fn limit(n: u64) -> Stage {
    Stage::Limit(n)
}

/// Project stage.
pub fn project(fields: Vec<ProjectField>) -> Stage {
    Stage::Project(fields)
}

/// Pass-through project entry.
pub fn include(name: &str) -> ProjectField {
    ProjectField::Include(name.to_string())
}

/// Renaming project entry; `rename("lat", "latitude")` emits `lat: "$latitude"`.
pub fn rename(target: &str, source: &str) -> ProjectField {
    ProjectField::Computed {
        target: target.to_string(),
        source: field(source),
    }
}

/// Unset stage.
pub fn unset(fields: Vec<&str>) -> Stage {
    Stage::Unset(fields.into_iter().map(str::to_string).collect())
}

/// Facet stage from named sub-pipelines.
pub fn facet(arms: Vec<(&str, Vec<Stage>)>) -> Stage {
    Stage::Facet(
        arms.into_iter()
            .map(|(name, stages)| (name.to_string(), stages))
            .collect(),
    )
}

/// Summary statistic computed per calendar month by [`monthly_facet_group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Avg,
    Min,
    Max,
}

impl Metric {
    /// Facet arm and output field name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Avg => "avg",
            Metric::Min => "min",
            Metric::Max => "max",
        }
    }

    fn accumulator(self, value: ValueExpr) -> Accumulator {
        match self {
            Metric::Avg => Accumulator::Avg(value),
            Metric::Min => Accumulator::Min(value),
            Metric::Max => Accumulator::Max(value),
        }
    }
}

/// Facet arm grouping documents by calendar month (`"%Y-%m"` of the coerced
/// `ts_field`) and reducing `value_field` with one metric.
///
/// The group key coerces `ts_field` itself rather than reusing an earlier
/// `$set`, so the arm stays valid no matter what ran before it.
pub fn monthly_facet_group(
    metric: Metric,
    value_field: &str,
    ts_field: &str,
) -> (&'static str, Vec<Stage>) {
    let spec = GroupSpec {
        key: date_to_string("%Y-%m", date_from_string(field(ts_field))),
        fields: vec![(metric.name().to_string(), metric.accumulator(field(value_field)))],
    };
    (metric.name(), vec![Stage::Group(spec)])
}

/// Bucket stage over string boundaries; out-of-range values fall into the
/// bucket labelled `default_label`.
pub fn bucket_by(
    group_by: ValueExpr,
    boundaries: Vec<&str>,
    default_label: &str,
    output: Vec<(&str, Accumulator)>,
) -> Stage {
    Stage::Bucket(BucketSpec {
        group_by,
        boundaries: boundaries.into_iter().map(Value::from).collect(),
        default_label: default_label.to_string(),
        output: output
            .into_iter()
            .map(|(name, acc)| (name.to_string(), acc))
            .collect(),
    })
}

/// Densify stage over an instant field, inclusive of both window bounds.
pub fn densify_instants(
    field_name: &str,
    step_hours: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Stage {
    Stage::Densify(DensifySpec {
        field: field_name.to_string(),
        step_hours,
        from,
        to,
    })
}

/// Fill stage assigning constants to missing or null fields.
pub fn fill_constants(fills: Vec<(&str, Value)>) -> Stage {
    Stage::Fill(
        fills
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

/// Join fragment: look up one matching record and merge a sub-object of it
/// underneath the current document.
///
/// Expands to three stages. The lookup collects matches into
/// `<local_key>_info`, a set stage picks the first match into
/// `<local_key>_obj`, and a replace-root merges `<local_key>_obj.<subpath>`
/// with `$$ROOT`. `$$ROOT` comes last in the merge, so on a key collision
/// the record's own fields win over the joined ones. When nothing matches,
/// the merge contributes nothing and the document passes through unchanged;
/// callers must not rely on joined fields being present.
pub fn lookup_one_and_merge(
    foreign_collection: &str,
    local_key: &str,
    foreign_key: &str,
    merge_subpath: &str,
) -> Vec<Stage> {
    let info_field = format!("{local_key}_info");
    let obj_field = format!("{local_key}_obj");
    vec![
        Stage::Lookup(LookupSpec {
            from: foreign_collection.to_string(),
            local_field: local_key.to_string(),
            foreign_field: foreign_key.to_string(),
            as_field: info_field.clone(),
        }),
        Stage::Set(vec![(obj_field.clone(), elem_at(field(info_field), 0))]),
        Stage::ReplaceRoot(merge_objects(vec![
            field(format!("{obj_field}.{merge_subpath}")),
            root(),
        ])),
    ]
}
