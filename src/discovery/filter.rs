use std::collections::BTreeSet;

use crate::inventory::Instance;

/// True if the instance carries every required tag. Extra instance tags are
/// fine; an instance without a tag set never matches.
pub fn matches(instance: &Instance, required_tags: &BTreeSet<String>) -> bool {
    match instance.tags() {
        Some(tags) => required_tags
            .iter()
            .all(|required| tags.iter().any(|tag| tag == required)),
        None => false,
    }
}
