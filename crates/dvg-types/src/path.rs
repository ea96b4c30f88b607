use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::document::SYSTEM_FIELDS;
use crate::error::TypeError;

/// One step of a [`FlatPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Object field, rendered as `name` (joined with `.`).
    Field(String),
    /// Keyed array member, rendered as `[_key=="k"]`.
    Key(String),
    /// Primitive array member, rendered as `[i]`.
    Index(usize),
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    pub fn as_field(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            _ => None,
        }
    }
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Field(name) => serializer.serialize_str(name),
            Self::Index(i) => serializer.serialize_u64(*i as u64),
            Self::Key(key) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("_key", key)?;
                map.end()
            }
        }
    }
}

/// A path segment paired with the type of the node it reaches.
///
/// The type is the object's own `_type` when present, otherwise one of
/// `object`, `array`, `string`, `number`, `boolean` or `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypedSegment {
    pub segment: PathSegment,
    #[serde(rename = "type")]
    pub node_type: String,
}

impl TypedSegment {
    pub fn new(segment: PathSegment, node_type: impl Into<String>) -> Self {
        Self {
            segment,
            node_type: node_type.into(),
        }
    }
}

/// Structural path addressing a node inside a document.
///
/// Renders as `a.b`, `arr[0]` or `arr[_key=="x"]`, and parses back from the
/// same syntax. Key literals are JSON string literals, so any key survives
/// the round trip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlatPath(Vec<PathSegment>);

impl FlatPath {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    /// The path with its last segment removed. The root's parent is the root.
    pub fn parent(&self) -> Self {
        let end = self.0.len().saturating_sub(1);
        Self(self.0[..end].to_vec())
    }

    /// Segment-wise prefix test. Every path starts with itself and with the root.
    pub fn starts_with(&self, prefix: &FlatPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Whether the last segment is the `_type` field.
    pub fn ends_with_type(&self) -> bool {
        matches!(self.last(), Some(PathSegment::Field(name)) if name == "_type")
    }

    /// Whether this path addresses a store-managed field.
    ///
    /// True when any field segment is a system field, and for the root-level
    /// `_type`. Nested `_type` fields are author content.
    pub fn is_system(&self) -> bool {
        if self.0.len() == 1 && self.ends_with_type() {
            return true;
        }
        self.0
            .iter()
            .filter_map(PathSegment::as_field)
            .any(|name| SYSTEM_FIELDS.contains(&name))
    }
}

impl From<Vec<PathSegment>> for FlatPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for FlatPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Key(key) => {
                    let literal = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[_key=={literal}]")?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FlatPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathParser { src: s, pos: 0 }.parse()
    }
}

impl Serialize for FlatPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlatPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

struct PathParser<'a> {
    src: &'a str,
    pos: usize,
}

impl PathParser<'_> {
    fn parse(mut self) -> Result<FlatPath, TypeError> {
        let mut segments = Vec::new();
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            if rest.starts_with('[') {
                segments.push(self.bracket()?);
            } else {
                if !segments.is_empty() {
                    if !rest.starts_with('.') {
                        return Err(self.error("expected `.` or `[`"));
                    }
                    self.pos += 1;
                }
                segments.push(self.field()?);
            }
        }
        Ok(FlatPath(segments))
    }

    fn field(&mut self) -> Result<PathSegment, TypeError> {
        let rest = &self.src[self.pos..];
        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("empty field name"));
        }
        self.pos += end;
        Ok(PathSegment::Field(rest[..end].to_string()))
    }

    fn bracket(&mut self) -> Result<PathSegment, TypeError> {
        // skip `[`
        self.pos += 1;
        let rest = &self.src[self.pos..];
        let segment = if let Some(literal) = rest.strip_prefix("_key==") {
            let len = json_string_len(literal).ok_or_else(|| self.error("bad key literal"))?;
            let key: String = serde_json::from_str(&literal[..len])
                .map_err(|e| self.error(&e.to_string()))?;
            self.pos += "_key==".len() + len;
            PathSegment::Key(key)
        } else {
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            let index = rest[..end]
                .parse()
                .map_err(|_| self.error("expected array index"))?;
            self.pos += end;
            PathSegment::Index(index)
        };
        if !self.src[self.pos..].starts_with(']') {
            return Err(self.error("expected `]`"));
        }
        self.pos += 1;
        Ok(segment)
    }

    fn error(&self, reason: &str) -> TypeError {
        TypeError::InvalidPath {
            path: self.src.to_string(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }
}

/// Byte length of the JSON string literal at the start of `s`, quotes included.
fn json_string_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'"') {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn path(s: &str) -> FlatPath {
        s.parse().unwrap()
    }

    #[test]
    fn renders_all_segment_kinds() {
        let p = FlatPath::from_segments(vec![
            PathSegment::field("authors"),
            PathSegment::key("a1"),
            PathSegment::field("tags"),
            PathSegment::Index(2),
        ]);
        assert_eq!(p.to_string(), r#"authors[_key=="a1"].tags[2]"#);
    }

    #[test]
    fn parses_what_it_renders() {
        for s in [
            "title",
            "a.b.c",
            "arr[0]",
            r#"arr[_key=="x"].name"#,
            r#"arr[_key=="we\"ird.[key]"]"#,
            "[3]",
        ] {
            assert_eq!(path(s).to_string(), s);
        }
    }

    #[test]
    fn rejects_malformed_paths() {
        for s in ["a..b", "arr[", "arr[x]", r#"arr[_key=="x"#, "a[0]b", ".a"] {
            assert!(
                matches!(s.parse::<FlatPath>(), Err(TypeError::InvalidPath { .. })),
                "expected `{s}` to be rejected"
            );
        }
    }

    #[test]
    fn parent_and_last() {
        let p = path(r#"arr[_key=="x"].name"#);
        assert_eq!(p.parent(), path(r#"arr[_key=="x"]"#));
        assert_eq!(p.last(), Some(&PathSegment::field("name")));
        assert_eq!(FlatPath::root().parent(), FlatPath::root());
    }

    #[test]
    fn starts_with_is_segment_wise() {
        let p = path("author.name");
        assert!(p.starts_with(&path("author")));
        assert!(p.starts_with(&p));
        assert!(p.starts_with(&FlatPath::root()));
        assert!(!path("authors.name").starts_with(&path("author")));
    }

    #[test]
    fn system_paths() {
        assert!(path("_id").is_system());
        assert!(path("_type").is_system());
        assert!(path(r#"arr[_key=="x"]._key"#).is_system());
        assert!(path("meta._updatedAt").is_system());
        assert!(!path("pet._type").is_system());
        assert!(!path("title").is_system());
        assert!(!path("_xSystem").is_system());
    }

    #[test]
    fn typed_segment_serializes_with_type_field() {
        let seg = TypedSegment::new(PathSegment::key("k"), "author");
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"segment": {"_key": "k"}, "type": "author"})
        );
    }

    #[test]
    fn serializes_as_string() {
        let p = path("arr[1]");
        assert_eq!(serde_json::to_value(&p).unwrap(), serde_json::json!("arr[1]"));
    }

    proptest! {
        #[test]
        fn any_key_survives_render_and_parse(key in ".*", field in "[a-zA-Z_][a-zA-Z0-9_]{0,8}") {
            let p = FlatPath::from_segments(vec![
                PathSegment::Field(field),
                PathSegment::Key(key),
                PathSegment::Index(0),
            ]);
            let parsed: FlatPath = p.to_string().parse().unwrap();
            prop_assert_eq!(parsed, p);
        }
    }
}
