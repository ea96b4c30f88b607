//! Effect classification for a change at a path.
//!
//! Both entry points share one decision table:
//!
//! 1. The path ends in `_type` and before/after differ: `ChangeObjectType`.
//! 2. Something existed before and nothing after: `Unset`.
//! 3. The node is an array member, nothing before, something after: `Insert`.
//! 4. Anything else: `Set`.
//!
//! `Move` is never produced here; moves are detected per keyed array.

use dvg_types::{Digest, EffectKind, FlatPath};
use serde_json::Value;

/// Classify a transition between two raw values.
pub fn classify_values(
    before: Option<&Value>,
    after: Option<&Value>,
    in_array: bool,
    path: &FlatPath,
) -> EffectKind {
    decide(before != after, before.is_some(), after.is_some(), in_array, path)
}

/// Classify a transition between two content digests, where
/// [`Digest::EMPTY`] stands for an absent value.
pub fn classify_hashes(
    before: &Digest,
    after: &Digest,
    in_array: bool,
    path: &FlatPath,
) -> EffectKind {
    decide(
        before != after,
        !before.is_empty(),
        !after.is_empty(),
        in_array,
        path,
    )
}

fn decide(
    differs: bool,
    had_before: bool,
    has_after: bool,
    in_array: bool,
    path: &FlatPath,
) -> EffectKind {
    if path.ends_with_type() && differs {
        EffectKind::ChangeObjectType
    } else if had_before && !has_after {
        EffectKind::Unset
    } else if in_array && !had_before && has_after {
        EffectKind::Insert
    } else {
        EffectKind::Set
    }
}
