//! Per-path state assembled from the three flattened snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use dvg_diff::{flatten_object, ArrayIds};
use dvg_types::{
    ArrayId, Document, FlatPath, ParentArray, Resolution, ResolutionMarker, SnapshotNode,
    SnapshotRole, Snapshots,
};
use indexmap::IndexMap;
use serde_json::Value;

/// Snapshot views for every non-system path, in first-seen order.
pub type PathTable = IndexMap<FlatPath, Snapshots>;

/// Order in which roles are flattened into the table.
pub const FLATTEN_ORDER: [SnapshotRole; 3] = [
    SnapshotRole::SubjectHead,
    SnapshotRole::UpstreamHead,
    SnapshotRole::UpstreamAtFork,
];

/// Flatten `doc` and record its nodes under `role`.
///
/// Parent arrays are shared between siblings, and a node's parent array and
/// parent object type always come from the same snapshot as the node.
/// Root-level fields record no parent object type.
pub fn record_snapshot(table: &mut PathTable, role: SnapshotRole, doc: &Document, ids: &ArrayIds) {
    let mut arrays: HashMap<ArrayId, Arc<Vec<Value>>> = HashMap::new();
    for entry in flatten_object(doc.fields(), false, ids) {
        if entry.path.is_system() {
            continue;
        }
        let parent_array = entry.parent.array().map(|(id, items)| {
            let items = arrays
                .entry(id)
                .or_insert_with(|| Arc::new(items.clone()));
            ParentArray::new(id, Arc::clone(items))
        });
        let parent_object_type = if entry.path.len() > 1 {
            entry.parent.object_type().map(str::to_owned)
        } else {
            None
        };
        let node = SnapshotNode {
            value: entry.value.clone(),
            parent_array,
            parent_object_type,
            path_with_types: entry.path_with_types,
        };
        *table.entry(entry.path).or_default().slot_mut(role) = Some(node);
    }
}

/// Resolution markers by exact path. The first marker listed for a path wins.
pub fn index_resolutions(resolutions: &[Resolution]) -> HashMap<&str, &ResolutionMarker> {
    let mut index = HashMap::with_capacity(resolutions.len());
    for resolution in resolutions {
        index
            .entry(resolution.path.as_str())
            .or_insert(&resolution.resolution_marker);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvg_types::Signature;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn path(s: &str) -> FlatPath {
        s.parse().unwrap()
    }

    #[test]
    fn system_paths_are_left_out() {
        let mut table = PathTable::new();
        let ids = ArrayIds::new();
        let d = doc(json!({
            "_id": "a", "_rev": "r", "_type": "book", "_createdAt": "t",
            "title": "x",
            "list": [{"_key": "k", "_type": "item", "v": 1}]
        }));
        record_snapshot(&mut table, SnapshotRole::UpstreamHead, &d, &ids);
        let paths: Vec<String> = table.keys().map(ToString::to_string).collect();
        assert_eq!(
            paths,
            vec![
                "title",
                "list",
                r#"list[_key=="k"]"#,
                r#"list[_key=="k"]._type"#,
                r#"list[_key=="k"].v"#,
            ]
        );
    }

    #[test]
    fn roles_share_path_entries_in_first_seen_order() {
        let mut table = PathTable::new();
        let ids = ArrayIds::new();
        record_snapshot(&mut table, SnapshotRole::SubjectHead, &doc(json!({"b": 1})), &ids);
        let upstream = doc(json!({"a": 1, "b": 2}));
        record_snapshot(&mut table, SnapshotRole::UpstreamHead, &upstream, &ids);

        let paths: Vec<String> = table.keys().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["b", "a"]);
        let b = &table[&path("b")];
        assert_eq!(b.value(SnapshotRole::SubjectHead), Some(&json!(1)));
        assert_eq!(b.value(SnapshotRole::UpstreamHead), Some(&json!(2)));
        assert!(b.upstream_at_fork.is_none());
    }

    #[test]
    fn parents_come_from_the_same_snapshot() {
        let mut table = PathTable::new();
        let ids = ArrayIds::new();
        record_snapshot(
            &mut table,
            SnapshotRole::SubjectHead,
            &doc(json!({"pet": {"_type": "cat", "name": "Tom"}, "tags": ["a", "b"]})),
            &ids,
        );
        record_snapshot(
            &mut table,
            SnapshotRole::UpstreamHead,
            &doc(json!({"pet": {"_type": "dog", "name": "Rex"}, "tags": ["b"]})),
            &ids,
        );

        let name = &table[&path("pet.name")];
        assert_eq!(name.parent_object_type(SnapshotRole::SubjectHead), Some("cat"));
        assert_eq!(name.parent_object_type(SnapshotRole::UpstreamHead), Some("dog"));

        let tag = &table[&path("tags[0]")];
        let sub = tag.parent_array(SnapshotRole::SubjectHead).unwrap();
        let up = tag.parent_array(SnapshotRole::UpstreamHead).unwrap();
        assert_ne!(sub.id, up.id);
        assert_eq!(up.items.as_slice(), &[json!("b")]);

        let sibling = &table[&path("tags[1]")];
        let sibling_parent = sibling.parent_array(SnapshotRole::SubjectHead).unwrap();
        assert!(Arc::ptr_eq(&sub.items, &sibling_parent.items));
    }

    #[test]
    fn root_fields_record_no_parent_type() {
        let mut table = PathTable::new();
        let ids = ArrayIds::new();
        let upstream = doc(json!({"_type": "book", "title": "x"}));
        record_snapshot(&mut table, SnapshotRole::UpstreamHead, &upstream, &ids);
        assert_eq!(
            table[&path("title")].parent_object_type(SnapshotRole::UpstreamHead),
            None
        );
    }

    #[test]
    fn first_resolution_for_a_path_wins() {
        let resolutions = vec![
            Resolution::new("title", ResolutionMarker::new("r1", Signature::Hash("aa".into()))),
            Resolution::new("title", ResolutionMarker::new("r2", Signature::Hash("bb".into()))),
        ];
        let index = index_resolutions(&resolutions);
        assert_eq!(index["title"].revision(), "r1");
        assert!(index.get("other").is_none());
    }
}
