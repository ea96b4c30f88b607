//! Per-path divergence evaluation.

use dvg_crypto::ContentHasher;
use dvg_diff::{classify_hashes, classify_values, MoveDetector};
use dvg_types::{
    key_of, Digest, Divergence, DivergenceStatus, Document, Effect, EffectKind, FlatPath,
    PathSegment, ResolutionMarker, SnapshotRole, Snapshots,
};

use crate::error::{DivergenceError, EngineResult};

use SnapshotRole::{SubjectHead, UpstreamAtFork, UpstreamHead};

/// How a path is compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy<'a> {
    /// No resolution recorded: compare against the fork point.
    SinceFork,
    /// Compare against what the user last acknowledged.
    SinceResolution(&'a ResolutionMarker),
}

impl<'a> Strategy<'a> {
    pub fn select(marker: Option<&'a ResolutionMarker>) -> Self {
        match marker {
            Some(marker) => Self::SinceResolution(marker),
            None => Self::SinceFork,
        }
    }
}

/// The three documents of a computation plus the move detector.
pub(crate) struct Comparison<'a> {
    pub upstream_at_fork: &'a Document,
    pub upstream_head: &'a Document,
    pub subject_head: &'a Document,
    pub moves: &'a MoveDetector,
}

impl<'a> Comparison<'a> {
    /// Evaluate one path. `Ok(None)` means the path has no divergence.
    pub fn evaluate(
        &self,
        path: &FlatPath,
        snapshots: &Snapshots,
        marker: Option<&ResolutionMarker>,
    ) -> EngineResult<Option<Divergence>> {
        let strategy = Strategy::select(marker);

        match strategy {
            Strategy::SinceFork if self.upstream_at_fork.rev() == self.upstream_head.rev() => {
                return Ok(None);
            }
            Strategy::SinceResolution(marker)
                if self.upstream_head.rev() == Some(marker.revision()) =>
            {
                let since = self.upstream_head.rev().unwrap_or_default().to_string();
                return Ok(Some(self.record(
                    path,
                    snapshots,
                    DivergenceStatus::Resolved,
                    None,
                    false,
                    since,
                )));
            }
            _ => {}
        }

        if is_positioned(strategy, snapshots) {
            return self.positioned(strategy, path, snapshots);
        }

        match strategy {
            Strategy::SinceFork => Ok(self.since_fork(path, snapshots)),
            Strategy::SinceResolution(marker) => self.since_resolution(path, snapshots, marker),
        }
    }

    /// A keyed array member: report a move when its upstream index changed
    /// and the subject's copy of the array does not already reflect it.
    fn positioned(
        &self,
        strategy: Strategy<'_>,
        path: &FlatPath,
        snapshots: &Snapshots,
    ) -> EngineResult<Option<Divergence>> {
        let key = snapshots
            .value(UpstreamAtFork)
            .and_then(key_of)
            .or_else(|| snapshots.value(UpstreamHead).and_then(key_of));
        let Some(key) = key else {
            return Ok(None);
        };

        let base = match strategy {
            Strategy::SinceFork => snapshots
                .parent_array(UpstreamAtFork)
                .and_then(|parent| parent.position_of_key(key)),
            Strategy::SinceResolution(marker) => {
                let position = marker.signature().as_position().ok_or_else(|| {
                    DivergenceError::ExpectedPositionSignature {
                        path: path.to_string(),
                        found: marker.signature().kind(),
                    }
                })?;
                Some(position as usize)
            }
        };
        let head = snapshots
            .parent_array(UpstreamHead)
            .and_then(|parent| parent.position_of_key(key));
        let (Some(base), Some(head)) = (base, head) else {
            return Ok(None);
        };
        if base == head {
            return Ok(None);
        }

        let (Some(subject_parent), Some(upstream_parent)) = (
            snapshots.parent_array(SubjectHead),
            snapshots.parent_array(UpstreamHead),
        ) else {
            return Ok(None);
        };
        if !subject_parent.has_keyed_member() || !upstream_parent.has_keyed_member() {
            return Ok(None);
        }

        let table = self.moves.moves(subject_parent, upstream_parent);
        let Some(&delta) = table.get(key) else {
            return Ok(None);
        };

        Ok(Some(self.record(
            path,
            snapshots,
            DivergenceStatus::Unresolved,
            Some(Effect::Move {
                upstream_position: head,
                delta,
            }),
            true,
            self.fork_revision(),
        )))
    }

    fn since_fork(&self, path: &FlatPath, snapshots: &Snapshots) -> Option<Divergence> {
        let fork = snapshots.value(UpstreamAtFork);
        let upstream = snapshots.value(UpstreamHead);
        let subject = snapshots.value(SubjectHead);

        let fork_hash = ContentHasher::hash(fork);
        let upstream_hash = ContentHasher::hash(upstream);
        let subject_hash = ContentHasher::hash(subject);

        let in_array = snapshots.parent_array(UpstreamHead).is_some();
        let kind = classify_values(fork, upstream, in_array, path);
        let structural = matches!(kind, EffectKind::Insert | EffectKind::Unset);

        // upstream unchanged since the fork
        if !structural && fork_hash == upstream_hash {
            return None;
        }
        // subject already matches upstream
        if !structural && upstream_hash == subject_hash {
            return None;
        }
        if kind == EffectKind::Insert && subject_has_member(snapshots, path) {
            return None;
        }

        let sides = [fork, upstream];
        if sides.iter().flatten().any(|v| v.is_array()) {
            return None;
        }
        let has_object = sides.iter().flatten().any(|v| v.is_object());
        let has_keyed = sides.iter().flatten().any(|v| key_of(v).is_some());
        let is_addressable = !has_object || has_keyed;

        Some(self.record(
            path,
            snapshots,
            DivergenceStatus::Unresolved,
            Some(effect_for(kind, path, snapshots)),
            is_addressable,
            self.fork_revision(),
        ))
    }

    fn since_resolution(
        &self,
        path: &FlatPath,
        snapshots: &Snapshots,
        marker: &ResolutionMarker,
    ) -> EngineResult<Option<Divergence>> {
        let signature = marker.signature();
        let hex = signature
            .as_hash()
            .ok_or_else(|| DivergenceError::ExpectedHashSignature {
                path: path.to_string(),
                found: signature.kind(),
            })?;
        let resolved_hash =
            Digest::from_hex(hex).map_err(|e| DivergenceError::MalformedSignature {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let upstream_hash = ContentHasher::hash(snapshots.value(UpstreamHead));
        let subject_hash = ContentHasher::hash(snapshots.value(SubjectHead));

        // upstream reverted to the resolved value, or subject converged
        let status = if upstream_hash == resolved_hash || upstream_hash == subject_hash {
            DivergenceStatus::Resolved
        } else {
            DivergenceStatus::Unresolved
        };

        let in_array = snapshots.parent_array(UpstreamHead).is_some();
        let kind = classify_hashes(&resolved_hash, &upstream_hash, in_array, path);

        Ok(Some(self.record(
            path,
            snapshots,
            status,
            Some(effect_for(kind, path, snapshots)),
            true,
            marker.revision().to_string(),
        )))
    }

    fn fork_revision(&self) -> String {
        self.upstream_at_fork.rev().unwrap_or_default().to_string()
    }

    fn record(
        &self,
        path: &FlatPath,
        snapshots: &Snapshots,
        status: DivergenceStatus,
        effect: Option<Effect>,
        is_addressable: bool,
        since_revision_id: String,
    ) -> Divergence {
        Divergence {
            status,
            effect,
            is_addressable,
            since_revision_id,
            document_id: self.upstream_head.id().to_string(),
            subject_id: self.subject_head.id().to_string(),
            document_type: self.subject_head.document_type().to_string(),
            path: path.to_string(),
            snapshots: snapshots.clone(),
        }
    }
}

/// Whether the node is a keyed object that can move within its array.
fn is_positioned(strategy: Strategy<'_>, snapshots: &Snapshots) -> bool {
    let keyed = |role| snapshots.value(role).and_then(key_of).is_some();
    match strategy {
        Strategy::SinceFork => keyed(UpstreamAtFork) && keyed(UpstreamHead),
        Strategy::SinceResolution(_) => keyed(UpstreamHead),
    }
}

/// Whether the subject's copy of the parent array already holds the keyed
/// member this path addresses.
fn subject_has_member(snapshots: &Snapshots, path: &FlatPath) -> bool {
    let Some(key) = path.last().and_then(PathSegment::as_key) else {
        return false;
    };
    snapshots
        .parent_array(SubjectHead)
        .is_some_and(|parent| parent.position_of_key(key).is_some())
}

fn effect_for(kind: EffectKind, path: &FlatPath, snapshots: &Snapshots) -> Effect {
    match kind {
        EffectKind::Insert => Effect::Insert {
            position: insert_position(path, snapshots),
        },
        EffectKind::Unset => Effect::Unset,
        EffectKind::ChangeObjectType => Effect::ChangeObjectType,
        // classifiers never produce moves
        EffectKind::Set | EffectKind::Move => Effect::Set,
    }
}

/// Slot of an inserted member in the upstream array: a keyed member's index
/// in the upstream parent, a primitive's own index.
fn insert_position(path: &FlatPath, snapshots: &Snapshots) -> usize {
    let keyed = snapshots
        .value(UpstreamHead)
        .and_then(key_of)
        .and_then(|key| snapshots.parent_array(UpstreamHead)?.position_of_key(key));
    keyed
        .or_else(|| path.last().and_then(PathSegment::as_index))
        .unwrap_or(0)
}
