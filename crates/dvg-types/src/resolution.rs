use serde::{Deserialize, Serialize};

/// What a user acknowledged when resolving a divergence.
///
/// On the wire a JSON string is a content hash and a JSON integer is an
/// upstream array position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signature {
    /// Lowercase hex digest of the upstream value at resolution time.
    Hash(String),
    /// Upstream index of a keyed array member at resolution time.
    Position(u64),
}

impl Signature {
    pub fn as_hash(&self) -> Option<&str> {
        match self {
            Self::Hash(h) => Some(h),
            Self::Position(_) => None,
        }
    }

    pub fn as_position(&self) -> Option<u64> {
        match self {
            Self::Position(p) => Some(*p),
            Self::Hash(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hash(_) => "hash",
            Self::Position(_) => "position",
        }
    }
}

/// `[revision, signature]` recorded when a divergence is resolved.
///
/// The revision is the upstream document revision at the moment of
/// resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionMarker(pub String, pub Signature);

impl ResolutionMarker {
    pub fn new(revision: impl Into<String>, signature: Signature) -> Self {
        Self(revision.into(), signature)
    }

    pub fn revision(&self) -> &str {
        &self.0
    }

    pub fn signature(&self) -> &Signature {
        &self.1
    }
}

/// A resolution marker bound to the path it resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    #[serde(alias = "_key")]
    pub path: String,
    pub resolution_marker: ResolutionMarker,
}

impl Resolution {
    pub fn new(path: impl Into<String>, marker: ResolutionMarker) -> Self {
        Self {
            path: path.into(),
            resolution_marker: marker,
        }
    }
}
