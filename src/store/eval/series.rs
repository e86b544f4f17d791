//! Window densification and constant fill.

use std::collections::BTreeSet;

use chrono::Duration;
use serde_json::Value;

use crate::document::{as_instant, get_path, set_path, wire_instant, Document};
use crate::stage::DensifySpec;
use crate::store::error::{StoreError, StoreResult};

use super::expr::compare;

/// Inserts a synthetic document for every step-grid instant inside the
/// window that no existing document occupies.
///
/// Both window bounds are on the grid and inclusive, so a window of 144
/// hours at a 6-hour step always yields 25 distinct instants. Synthetic
/// documents carry only the densified field; a later fill stage gives them
/// their placeholder fields. Existing documents count as occupying an
/// instant only on exact equality, so off-grid records are kept *and* their
/// surrounding grid instants are still generated.
pub(crate) fn densify(spec: &DensifySpec, mut docs: Vec<Document>) -> StoreResult<Vec<Document>> {
    if spec.step_hours <= 0 {
        return Err(StoreError::InvalidPipeline(
            "$densify step must be a positive number of hours".to_string(),
        ));
    }
    if spec.from > spec.to {
        return Err(StoreError::InvalidPipeline(
            "$densify bounds are reversed".to_string(),
        ));
    }

    let mut occupied: BTreeSet<i64> = BTreeSet::new();
    for doc in &docs {
        if let Some(at) = get_path(doc, &spec.field).and_then(as_instant) {
            occupied.insert(at.timestamp_millis());
        }
    }

    let step = Duration::hours(spec.step_hours);
    let mut cursor = spec.from;
    while cursor <= spec.to {
        if !occupied.contains(&cursor.timestamp_millis()) {
            let mut synthetic = Document::new();
            set_path(&mut synthetic, &spec.field, wire_instant(cursor));
            docs.push(synthetic);
        }
        cursor += step;
    }

    // Emit in field order; downstream sorts re-order anyway, but the stage
    // on its own should still produce something deterministic.
    docs.sort_by(|a, b| compare(get_path(a, &spec.field), get_path(b, &spec.field)));
    Ok(docs)
}

/// Assigns constants to fields that are missing or null. Present non-null
/// values, including empty strings, stay untouched.
pub(crate) fn fill(fills: &[(String, Value)], docs: &mut [Document]) {
    for doc in docs.iter_mut() {
        for (field, value) in fills {
            let needs_fill = matches!(get_path(doc, field), None | Some(Value::Null));
            if needs_fill {
                set_path(doc, field, value.clone());
            }
        }
    }
}
