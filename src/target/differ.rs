use super::{Target, TargetSet};

/// Reports whether `new` would change the file last written from `old`.
///
/// Both sets are compared in canonical form, so neither the order of the
/// targets nor the order of endpoints inside a target matters. Labels must
/// match exactly.
pub fn is_different(old: &TargetSet, new: &TargetSet) -> bool {
    if old.len() != new.len() {
        return true;
    }

    old.canonical() != new.canonical()
}

/// Sorts each target's endpoints, then the targets by endpoint list.
///
/// Comparing the endpoint lists orders by first endpoint and breaks ties on
/// the rest; labels break any remaining tie so equal sets always line up.
pub(super) fn canonicalize(targets: &mut [Target]) {
    for target in targets.iter_mut() {
        target.endpoints.sort_unstable();
    }
    targets.sort_unstable_by(|a, b| {
        a.endpoints
            .cmp(&b.endpoints)
            .then_with(|| a.labels.cmp(&b.labels))
    });
}
