use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;

/// Field names managed by the store rather than by authors.
///
/// A path whose segments include any of these as a field name never
/// produces a divergence. The root `_type` is excluded separately.
pub const SYSTEM_FIELDS: &[&str] = &[
    "_id",
    "_rev",
    "_key",
    "_system",
    "_createdAt",
    "_updatedAt",
];

/// A JSON document snapshot.
///
/// Documents are plain JSON objects carrying the system fields `_id`,
/// `_rev` and `_type` alongside author content. Field order is preserved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap an existing field map.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a document from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(TypeError::NotAnObject(json_kind(&other))),
        }
    }

    /// The document identifier (`_id`), or `""` when missing.
    pub fn id(&self) -> &str {
        self.str_field("_id").unwrap_or("")
    }

    /// The revision identifier (`_rev`), if any.
    pub fn rev(&self) -> Option<&str> {
        self.str_field("_rev")
    }

    /// The document type (`_type`), or `""` when missing.
    pub fn document_type(&self) -> &str {
        self.str_field("_type").unwrap_or("")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}

impl TryFrom<Value> for Document {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// The `_key` of an object value, if it is a keyed object.
pub fn key_of(value: &Value) -> Option<&str> {
    value.as_object()?.get("_key")?.as_str()
}

/// The `_type` of an object value, if it declares one.
pub fn object_type(value: &Value) -> Option<&str> {
    value.as_object()?.get("_type")?.as_str()
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_read_system_fields() {
        let doc = Document::from_value(json!({
            "_id": "book-1",
            "_rev": "r1",
            "_type": "book",
            "title": "Dune"
        }))
        .unwrap();
        assert_eq!(doc.id(), "book-1");
        assert_eq!(doc.rev(), Some("r1"));
        assert_eq!(doc.document_type(), "book");
        assert_eq!(doc.get("title"), Some(&json!("Dune")));
    }

    #[test]
    fn missing_system_fields_are_empty() {
        let doc = Document::from_value(json!({})).unwrap();
        assert_eq!(doc.id(), "");
        assert_eq!(doc.rev(), None);
        assert_eq!(doc.document_type(), "");
    }

    #[test]
    fn non_object_is_rejected() {
        let err = Document::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err, TypeError::NotAnObject("array"));
    }

    #[test]
    fn field_order_is_preserved() {
        let doc = Document::from_value(json!({"z": 1, "a": 2, "m": 3})).unwrap();
        let keys: Vec<&str> = doc.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn key_and_type_helpers() {
        let item = json!({"_key": "k1", "_type": "author"});
        assert_eq!(key_of(&item), Some("k1"));
        assert_eq!(object_type(&item), Some("author"));
        assert_eq!(key_of(&json!({"_key": 3})), None);
        assert_eq!(key_of(&json!("k1")), None);
    }

    #[test]
    fn serde_is_transparent() {
        let raw = json!({"_id": "a", "n": 1});
        let doc: Document = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }
}
