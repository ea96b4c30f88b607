//! Object-type coalescing.
//!
//! Once an object's type changes, its descendants can no longer be compared
//! field by field. The whole batch is scanned with `_type` paths first; the
//! first divergence that reveals a type change is re-emitted on the parent
//! object and every later divergence at or below that object is dropped.

use dvg_types::{Divergence, Effect, EffectKind, FlatPath, SnapshotRole};

pub fn coalesce_object_types(
    mut divergences: Vec<(FlatPath, Divergence)>,
) -> Vec<(FlatPath, Divergence)> {
    divergences.sort_by_key(|(path, _)| !path.ends_with_type());

    let mut changed: Vec<FlatPath> = Vec::new();
    let mut out = Vec::with_capacity(divergences.len());

    for (path, divergence) in divergences {
        if changed.iter().any(|parent| path.starts_with(parent)) {
            continue;
        }

        if changes_object_type(&divergence) {
            let parent = path.parent();
            changed.push(parent.clone());
            let coalesced = Divergence {
                effect: Some(Effect::ChangeObjectType),
                is_addressable: true,
                path: parent.to_string(),
                ..divergence
            };
            out.push((parent, coalesced));
            continue;
        }

        out.push((path, divergence));
    }
    out
}

/// Either the divergence is itself a type change, or upstream and subject
/// disagree on the type of the object holding it.
fn changes_object_type(divergence: &Divergence) -> bool {
    if divergence.effect_kind() == Some(EffectKind::ChangeObjectType) {
        return true;
    }
    let snapshots = &divergence.snapshots;
    matches!(
        (
            snapshots.parent_object_type(SnapshotRole::UpstreamHead),
            snapshots.parent_object_type(SnapshotRole::SubjectHead),
        ),
        (Some(upstream), Some(subject)) if upstream != subject
    )
}
