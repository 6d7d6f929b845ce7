use crate::prelude::*;
use std::collections::BTreeSet;

/// Report a containment cycle that runs through this record.
///
/// Only by-value composite fields (optionally nullable) contain their target;
/// containers of records are indirections and never form a cycle.
pub fn validate_containment(set: &DescriptorSet, record: &RecordDescriptor, errs: &mut ErrorTree) {
    let start = record.path();
    let mut stack = vec![start.clone()];
    let mut visited = BTreeSet::new();

    if let Some(cycle) = walk(set, record, &start, &mut stack, &mut visited) {
        err!(errs, "containment cycle {}", cycle.join(" -> "));
    }
}

fn walk(
    set: &DescriptorSet,
    record: &RecordDescriptor,
    start: &str,
    stack: &mut Vec<String>,
    visited: &mut BTreeSet<String>,
) -> Option<Vec<String>> {
    for target in contained_records(record) {
        let Some(child) = set.find(target) else {
            continue;
        };
        let path = child.path();

        if path == start {
            let mut cycle = stack.clone();
            cycle.push(path);
            return Some(cycle);
        }
        if !visited.insert(path.clone()) {
            continue;
        }

        stack.push(path);
        if let Some(cycle) = walk(set, child, start, stack, visited) {
            return Some(cycle);
        }
        stack.pop();
    }

    None
}

fn contained_records(record: &RecordDescriptor) -> impl Iterator<Item = &str> {
    record.fields.iter().filter_map(|field| {
        let ty = field.ty.unwrap_option();
        (ty.kind == TypeKind::Record).then_some(ty.name.as_str())
    })
}
