//! Depth-first flattening of a document into `(path, value)` entries.
//!
//! Objects contribute one entry per field. Arrays contribute their primitive
//! members by index and their keyed objects by key; nested arrays and
//! unkeyed objects inside arrays have no stable address and are skipped.

use std::sync::atomic::{AtomicU64, Ordering};

use dvg_types::{key_of, object_type, ArrayId, FlatPath, PathSegment, TypedSegment};
use serde_json::{map, Map, Value};

use crate::error::{DiffError, DiffResult};

/// Allocator for [`ArrayId`]s.
///
/// Every array entered by a [`Flatten`] walk receives a fresh id, so ids are
/// unique for as long as the allocator lives.
#[derive(Debug, Default)]
pub struct ArrayIds(AtomicU64);

impl ArrayIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> ArrayId {
        ArrayId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a flattened node is a direct member of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParentRef<'a> {
    /// A field of an object; carries the object's `_type` when it has one.
    Object { object_type: Option<&'a str> },
    /// A member of an array.
    Array { id: ArrayId, items: &'a Vec<Value> },
}

impl<'a> ParentRef<'a> {
    pub fn object_type(&self) -> Option<&'a str> {
        match self {
            Self::Object { object_type } => *object_type,
            Self::Array { .. } => None,
        }
    }

    pub fn array(&self) -> Option<(ArrayId, &'a Vec<Value>)> {
        match self {
            Self::Array { id, items } => Some((*id, *items)),
            Self::Object { .. } => None,
        }
    }
}

/// One flattened node.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatEntry<'a> {
    pub path: FlatPath,
    pub value: &'a Value,
    pub path_with_types: Vec<TypedSegment>,
    pub parent: ParentRef<'a>,
}

/// The type recorded for a node in [`TypedSegment`]s.
pub fn node_type(value: &Value) -> &str {
    match value {
        Value::Object(_) => object_type(value).unwrap_or("object"),
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}

#[derive(Clone)]
enum Frame<'a> {
    Object {
        path: FlatPath,
        types: Vec<TypedSegment>,
        object_type: Option<&'a str>,
        fields: map::Iter<'a>,
    },
    Array {
        path: FlatPath,
        types: Vec<TypedSegment>,
        id: ArrayId,
        items: &'a Vec<Value>,
        next: usize,
    },
}

/// Lazy pre-order walk over a document.
///
/// Containers are yielded before their descendants unless the walk is
/// compact, in which case only leaves are yielded. The root itself is never
/// yielded. Cloning the iterator restarts from the clone's position.
#[derive(Clone)]
pub struct Flatten<'a> {
    stack: Vec<Frame<'a>>,
    compact: bool,
    ids: &'a ArrayIds,
}

/// Flatten an object root.
pub fn flatten_object<'a>(
    root: &'a Map<String, Value>,
    compact: bool,
    ids: &'a ArrayIds,
) -> Flatten<'a> {
    let frame = Frame::Object {
        path: FlatPath::root(),
        types: Vec::new(),
        object_type: root.get("_type").and_then(Value::as_str),
        fields: root.iter(),
    };
    Flatten {
        stack: vec![frame],
        compact,
        ids,
    }
}

/// Flatten an array root.
pub fn flatten_array<'a>(root: &'a Vec<Value>, compact: bool, ids: &'a ArrayIds) -> Flatten<'a> {
    let frame = Frame::Array {
        path: FlatPath::root(),
        types: Vec::new(),
        id: ids.next_id(),
        items: root,
        next: 0,
    };
    Flatten {
        stack: vec![frame],
        compact,
        ids,
    }
}

/// Flatten any container value.
pub fn flatten_value<'a>(
    root: &'a Value,
    compact: bool,
    ids: &'a ArrayIds,
) -> DiffResult<Flatten<'a>> {
    match root {
        Value::Object(map) => Ok(flatten_object(map, compact, ids)),
        Value::Array(items) => Ok(flatten_array(items, compact, ids)),
        Value::Null => Err(DiffError::NotAContainer("null")),
        Value::Bool(_) => Err(DiffError::NotAContainer("boolean")),
        Value::Number(_) => Err(DiffError::NotAContainer("number")),
        Value::String(_) => Err(DiffError::NotAContainer("string")),
    }
}

impl<'a> Flatten<'a> {
    /// The next addressable child of the top frame, or `None` when the frame
    /// is exhausted.
    fn next_child(frame: &mut Frame<'a>) -> Option<(FlatEntry<'a>, &'a Value)> {
        match frame {
            Frame::Object {
                path,
                types,
                object_type,
                fields,
            } => {
                let (name, value) = fields.next()?;
                let segment = PathSegment::Field(name.clone());
                let entry = child_entry(path, types, segment, value, ParentRef::Object {
                    object_type: *object_type,
                });
                Some((entry, value))
            }
            Frame::Array {
                path,
                types,
                id,
                items,
                next,
            } => {
                let items: &'a Vec<Value> = *items;
                while *next < items.len() {
                    let index = *next;
                    *next += 1;
                    let value = &items[index];
                    let segment = match value {
                        Value::Array(_) => continue,
                        Value::Object(_) => match key_of(value) {
                            Some(key) => PathSegment::Key(key.to_string()),
                            None => continue,
                        },
                        _ => PathSegment::Index(index),
                    };
                    let parent = ParentRef::Array { id: *id, items };
                    return Some((child_entry(path, types, segment, value, parent), value));
                }
                None
            }
        }
    }

    fn push_frame(&mut self, entry: &FlatEntry<'a>, value: &'a Value) {
        let frame = match value {
            Value::Object(map) => Frame::Object {
                path: entry.path.clone(),
                types: entry.path_with_types.clone(),
                object_type: object_type(value),
                fields: map.iter(),
            },
            Value::Array(items) => Frame::Array {
                path: entry.path.clone(),
                types: entry.path_with_types.clone(),
                id: self.ids.next_id(),
                items,
                next: 0,
            },
            _ => return,
        };
        self.stack.push(frame);
    }
}

fn child_entry<'a>(
    path: &FlatPath,
    types: &[TypedSegment],
    segment: PathSegment,
    value: &'a Value,
    parent: ParentRef<'a>,
) -> FlatEntry<'a> {
    let mut path_with_types = Vec::with_capacity(types.len() + 1);
    path_with_types.extend_from_slice(types);
    path_with_types.push(TypedSegment::new(segment.clone(), node_type(value)));
    FlatEntry {
        path: path.child(segment),
        value,
        path_with_types,
        parent,
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = FlatEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some((entry, value)) = Self::next_child(frame) else {
                self.stack.pop();
                continue;
            };
            let is_container = matches!(value, Value::Object(_) | Value::Array(_));
            if is_container {
                self.push_frame(&entry, value);
                if self.compact {
                    continue;
                }
            }
            return Some(entry);
        }
    }
}
