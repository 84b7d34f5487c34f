//! Partial updates as JSON field merges.

use bazaar_core::{BazaarError, Record};
use serde_json::Value;

fn patch_err(e: impl std::fmt::Display) -> BazaarError {
    BazaarError::Patch {
        reason: e.to_string(),
    }
}

/// Apply a patch to a record, returning the patched copy.
///
/// The patch must be a JSON object; its top-level fields overwrite the
/// record's corresponding fields wholesale (no deep merge). The same
/// merge is used by the coordinator's local apply and by anything that
/// needs to preview a mutation, so local and remote interpretations of
/// a patch cannot drift apart.
pub fn apply_patch<T: Record>(record: &T, patch: &Value) -> Result<T, BazaarError> {
    let fields = patch
        .as_object()
        .ok_or_else(|| patch_err("patch must be a JSON object"))?;

    let mut value = serde_json::to_value(record).map_err(patch_err)?;
    let base = value
        .as_object_mut()
        .ok_or_else(|| patch_err("record must serialize to a JSON object"))?;

    for (field, new_value) in fields {
        base.insert(field.clone(), new_value.clone());
    }

    serde_json::from_value(value).map_err(patch_err)
}
