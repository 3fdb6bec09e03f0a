//! Entity keys and the flattened property-list form entities are encoded
//! to/from (spec §3 "Entity key", §1 "entity serialization ... is an
//! opaque function").

use std::collections::BTreeMap;
use std::fmt;

use crate::codec::CodecError;

/// A single field of an entity's flattened property list.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// The opaque flat property list the codec encodes to bytes.
///
/// Mapping a user type to this shape is outside the scope of this crate
/// (spec §1); callers provide it by implementing [`Entity`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PropertyList(pub BTreeMap<String, PropertyValue>);

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }
}

/// Anything that can be flattened to and rebuilt from a [`PropertyList`].
///
/// This is the Rust-native replacement for the reflective destination
/// handling in the original implementation (spec §9): `T: Entity` is
/// checked at compile time instead of at runtime.
pub trait Entity: Send + Sync + Clone {
    fn to_properties(&self) -> PropertyList;
    fn from_properties(props: PropertyList) -> Result<Self, CodecError>
    where
        Self: Sized;
}

/// A bare property list is itself a valid destination (the "PropertyListSlice"
/// variant of the original's destination adapter) — it simply round-trips.
impl Entity for PropertyList {
    fn to_properties(&self) -> PropertyList {
        self.clone()
    }

    fn from_properties(props: PropertyList) -> Result<Self, CodecError> {
        Ok(props)
    }
}

/// The id-or-name component of an [`EntityKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyId {
    Name(String),
    Int(i64),
    /// Allocated by the store on write. Keys in this state are rejected
    /// from cache operations until the store assigns a stable identity
    /// (spec §3 "Entity key").
    Incomplete,
}

/// An entity-store key: namespace + kind + an id-or-name path component.
///
/// Mirrors the shape of a Datastore-style key closely enough to derive a
/// stable cache key from it (§4.1), without depending on any particular
/// store's concrete key type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    namespace: String,
    kind: String,
    id: KeyId,
}

impl EntityKey {
    pub fn new(namespace: impl Into<String>, kind: impl Into<String>, id: KeyId) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
            id,
        }
    }

    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(String::new(), kind, KeyId::Name(name.into()))
    }

    pub fn numbered(kind: impl Into<String>, id: i64) -> Self {
        Self::new(String::new(), kind, KeyId::Int(id))
    }

    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self::new(String::new(), kind, KeyId::Incomplete)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    /// `false` for a key the store hasn't assigned an id/name to yet.
    pub fn is_complete(&self) -> bool {
        !matches!(self.id, KeyId::Incomplete)
    }

    /// Canonical string form used as cache-key deriver input. Stable for a
    /// given key; not a public wire format (spec §6).
    pub fn canonical(&self) -> String {
        match &self.id {
            KeyId::Name(name) => format!("{}/{}/n:{}", self.namespace, self.kind, name),
            KeyId::Int(id) => format!("{}/{}/i:{}", self.namespace, self.kind, id),
            KeyId::Incomplete => format!("{}/{}/incomplete", self.namespace, self.kind),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}
