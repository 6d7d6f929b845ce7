//! Descriptor validation orchestration.
//!
//! Validation runs per record so that one inconsistent record never blocks
//! generation of the others.

pub mod cycle;
pub mod index;
pub mod naming;
pub mod reserved;
pub mod shape;

use crate::prelude::*;

/// Validate one record in a staged, deterministic order.
pub fn validate_record(
    set: &DescriptorSet,
    record: &RecordDescriptor,
) -> Result<(), DescriptorError> {
    let mut errs = ErrorTree::new();

    // Phase 1: identifiers and paths.
    naming::validate_naming(record, &mut errs);

    // Phase 2: per-field type shapes, roles and string modes.
    for field in &record.fields {
        shape::validate_field(record, field, &mut errs);
    }

    // Phase 3: invariants that need the full set.
    cycle::validate_containment(set, record, &mut errs);
    index::validate_indexes(record, &mut errs);

    errs.result().map_err(|errors| DescriptorError::Validation {
        record: record.path(),
        errors,
    })
}

/// Validate every record, returning the failures keyed by record path.
#[must_use]
pub fn validate_set(set: &DescriptorSet) -> Vec<DescriptorError> {
    set.records()
        .filter_map(|record| validate_record(set, record).err())
        .collect()
}
