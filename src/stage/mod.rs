//! Typed pipeline stages.
//!
//! This module provides the building blocks every pipeline is assembled
//! from. It includes:
//!
//! - [`library`] - Stage constructors and the [`Stage`] AST
//! - [`expr`] - Value expressions, filters, sort keys, and accumulators
//!
//! Stages are plain data. Rendering to wire form ([`Stage::to_wire`]) and
//! interpretation (the store engine) are separate concerns, so a composed
//! pipeline can be logged, asserted on, and executed from the same value.

pub mod expr;
pub mod library;

pub use expr::{
    all_of, asc, avg, cmp, count, date_from_string, date_to_string, desc, elem_at, expr_cmp,
    field, lit, max, merge_objects, min, push, regex_contains, root, substr, template,
    Accumulator, CmpOp, Filter, SortDir, SortKey, ValueExpr,
};
pub use library::{
    area_keyword, bucket_by, coerce_timestamp, densify_instants, facet, fill_constants,
    first_letter, include, instant_range, instant_range_expr_lower, limit, lookup_one_and_merge,
    match_on, monthly_facet_group, project, rename, set, sort_by, unset, BucketSpec, DensifySpec,
    GroupSpec, LookupSpec, Metric, ProjectField, Stage,
};
