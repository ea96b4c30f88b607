use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::path::TypedSegment;

/// The three snapshots compared in one computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotRole {
    /// The common ancestor state.
    UpstreamAtFork,
    /// The current upstream state.
    UpstreamHead,
    /// The current subject (forked) state.
    SubjectHead,
}

impl SnapshotRole {
    pub const ALL: [SnapshotRole; 3] = [
        SnapshotRole::UpstreamAtFork,
        SnapshotRole::UpstreamHead,
        SnapshotRole::SubjectHead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpstreamAtFork => "upstreamAtFork",
            Self::UpstreamHead => "upstreamHead",
            Self::SubjectHead => "subjectHead",
        }
    }
}

impl fmt::Display for SnapshotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one array within one flatten pass.
///
/// Two `ParentArray`s with the same id are the same array instance, which
/// lets move detection memoize by identity instead of by content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(pub u64);

/// The array a node is a direct member of.
#[derive(Clone, Debug, PartialEq)]
pub struct ParentArray {
    pub id: ArrayId,
    pub items: Arc<Vec<Value>>,
}

impl ParentArray {
    pub fn new(id: ArrayId, items: Arc<Vec<Value>>) -> Self {
        Self { id, items }
    }

    /// Index of the keyed member carrying `key`.
    pub fn position_of_key(&self, key: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| crate::document::key_of(item) == Some(key))
    }

    /// Whether any member is a keyed object.
    pub fn has_keyed_member(&self) -> bool {
        self.items
            .iter()
            .any(|item| crate::document::key_of(item).is_some())
    }
}

impl Serialize for ParentArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

/// One role's view of the node at a path.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_array: Option<ParentArray>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_object_type: Option<String>,
    pub path_with_types: Vec<TypedSegment>,
}

/// Per-role node views at one path. A role is `None` when the path does not
/// exist in that snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_at_fork: Option<SnapshotNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_head: Option<SnapshotNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_head: Option<SnapshotNode>,
}

impl Snapshots {
    pub fn get(&self, role: SnapshotRole) -> Option<&SnapshotNode> {
        match role {
            SnapshotRole::UpstreamAtFork => self.upstream_at_fork.as_ref(),
            SnapshotRole::UpstreamHead => self.upstream_head.as_ref(),
            SnapshotRole::SubjectHead => self.subject_head.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, role: SnapshotRole) -> &mut Option<SnapshotNode> {
        match role {
            SnapshotRole::UpstreamAtFork => &mut self.upstream_at_fork,
            SnapshotRole::UpstreamHead => &mut self.upstream_head,
            SnapshotRole::SubjectHead => &mut self.subject_head,
        }
    }

    /// The raw value held by `role`, if the path exists there.
    pub fn value(&self, role: SnapshotRole) -> Option<&Value> {
        self.get(role).map(|node| &node.value)
    }

    pub fn parent_array(&self, role: SnapshotRole) -> Option<&ParentArray> {
        self.get(role).and_then(|node| node.parent_array.as_ref())
    }

    pub fn parent_object_type(&self, role: SnapshotRole) -> Option<&str> {
        self.get(role)
            .and_then(|node| node.parent_object_type.as_deref())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DivergenceStatus {
    Unresolved,
    Resolved,
}

/// Semantic effect of an upstream change, without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    Set,
    Unset,
    Insert,
    Move,
    ChangeObjectType,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Set => "set",
            Self::Unset => "unset",
            Self::Insert => "insert",
            Self::Move => "move",
            Self::ChangeObjectType => "changeObjectType",
        };
        f.write_str(s)
    }
}

/// Semantic effect of an upstream change, with the data each effect carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum Effect {
    Set,
    Unset,
    /// `position` is the member's slot in the upstream array.
    Insert { position: usize },
    /// `delta` is the signed index change relative to the subject's array.
    Move {
        #[serde(rename = "upstreamPosition")]
        upstream_position: usize,
        delta: i64,
    },
    ChangeObjectType,
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Set => EffectKind::Set,
            Self::Unset => EffectKind::Unset,
            Self::Insert { .. } => EffectKind::Insert,
            Self::Move { .. } => EffectKind::Move,
            Self::ChangeObjectType => EffectKind::ChangeObjectType,
        }
    }
}

/// One upstream change at one path that the subject has not absorbed, or
/// has absorbed via a resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Divergence {
    pub status: DivergenceStatus,
    #[serde(flatten)]
    pub effect: Option<Effect>,
    pub is_addressable: bool,
    pub since_revision_id: String,
    pub document_id: String,
    pub subject_id: String,
    pub document_type: String,
    pub path: String,
    pub snapshots: Snapshots,
}

impl Divergence {
    pub fn effect_kind(&self) -> Option<EffectKind> {
        self.effect.map(|e| e.kind())
    }

    pub fn is_resolved(&self) -> bool {
        self.status == DivergenceStatus::Resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;
    use serde_json::json;

    fn node(value: Value) -> SnapshotNode {
        SnapshotNode {
            value,
            parent_array: None,
            parent_object_type: None,
            path_with_types: vec![TypedSegment::new(PathSegment::field("x"), "number")],
        }
    }

    fn divergence(effect: Option<Effect>) -> Divergence {
        Divergence {
            status: DivergenceStatus::Unresolved,
            effect,
            is_addressable: true,
            since_revision_id: "r1".into(),
            document_id: "up".into(),
            subject_id: "sub".into(),
            document_type: "book".into(),
            path: "x".into(),
            snapshots: Snapshots {
                upstream_head: Some(node(json!(2))),
                ..Default::default()
            },
        }
    }

    #[test]
    fn serializes_camel_case_shape() {
        let json = serde_json::to_value(divergence(Some(Effect::Set))).unwrap();
        assert_eq!(json["status"], json!("unresolved"));
        assert_eq!(json["effect"], json!("set"));
        assert_eq!(json["isAddressable"], json!(true));
        assert_eq!(json["sinceRevisionId"], json!("r1"));
        assert_eq!(json["snapshots"]["upstreamHead"]["value"], json!(2));
        assert!(json["snapshots"].get("subjectHead").is_none());
    }

    #[test]
    fn move_carries_position_and_delta() {
        let effect = Effect::Move {
            upstream_position: 0,
            delta: -3,
        };
        let json = serde_json::to_value(divergence(Some(effect))).unwrap();
        assert_eq!(json["effect"], json!("move"));
        assert_eq!(json["upstreamPosition"], json!(0));
        assert_eq!(json["delta"], json!(-3));
    }

    #[test]
    fn insert_carries_position() {
        let json =
            serde_json::to_value(divergence(Some(Effect::Insert { position: 2 }))).unwrap();
        assert_eq!(json["effect"], json!("insert"));
        assert_eq!(json["position"], json!(2));
    }

    #[test]
    fn no_effect_omits_field() {
        let json = serde_json::to_value(divergence(None)).unwrap();
        assert!(json.get("effect").is_none());
    }

    #[test]
    fn parent_array_serializes_items_only() {
        let parent = ParentArray::new(ArrayId(7), Arc::new(vec![json!({"_key": "a"})]));
        assert_eq!(serde_json::to_value(&parent).unwrap(), json!([{"_key": "a"}]));
        assert_eq!(parent.position_of_key("a"), Some(0));
        assert!(parent.has_keyed_member());
    }

    #[test]
    fn effect_kind_strips_payload() {
        let d = divergence(Some(Effect::Insert { position: 1 }));
        assert_eq!(d.effect_kind(), Some(EffectKind::Insert));
        assert_eq!(EffectKind::ChangeObjectType.to_string(), "changeObjectType");
    }
}
