use crate::types::{AnonType, Builtin, ExcType};

/// Smallest integer the host keeps in its shared small-int table.
pub const SMALL_INT_MIN: i64 = -5;
/// Largest integer the host keeps in its shared small-int table.
pub const SMALL_INT_MAX: i64 = 256;

/// Index of a decoded constant inside the [`crate::Heap`] arena.
///
/// Uses `u32` to save space; the arena never frees, so an id stays valid for
/// the lifetime of the heap that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstId(u32);

impl ConstId {
    /// # Panics
    /// Panics if `index` does not fit in `u32`.
    pub(crate) fn new(index: usize) -> Self {
        Self(index.try_into().expect("ConstId overflow"))
    }

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Non-owning view into the blob payload produced by the `X` tag.
///
/// `offset` is relative to the start of the payload (just after the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobSpan {
    pub offset: usize,
    pub len: usize,
}

/// Handle to a decoded constant.
///
/// Singletons and cheap integers are stored inline; everything else lives in
/// the arena and is referenced via `Ref(ConstId)`.
///
/// `PartialEq` is *identity*: two values compare equal exactly when they
/// denote the same constant object. Structural comparison goes through
/// [`crate::ConstObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    None,
    Bool(bool),
    Ellipsis,
    NotImplemented,
    /// Integer in `SMALL_INT_MIN..=SMALL_INT_MAX`, shared by value.
    SmallInt(i64),
    AnonType(AnonType),
    Builtin(Builtin),
    Exception(ExcType),
    Ref(ConstId),
    Raw(BlobSpan),
}

impl Value {
    /// Identity comparison, the host's `is`.
    #[inline]
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        self == other
    }

    /// Returns the arena id for heap constants.
    #[must_use]
    pub fn ref_id(self) -> Option<ConstId> {
        match self {
            Self::Ref(id) => Some(id),
            _ => None,
        }
    }

    /// Fixed-size byte image of this value's identity.
    ///
    /// Container hashes are computed over the concatenated identity images of
    /// their elements: elements are already canonical, so identity stands in
    /// for content.
    #[must_use]
    pub fn identity_bytes(self) -> [u8; 9] {
        let (discriminant, payload): (u8, u64) = match self {
            Self::None => (0, 0),
            Self::Bool(b) => (1, u64::from(b)),
            Self::Ellipsis => (2, 0),
            Self::NotImplemented => (3, 0),
            Self::SmallInt(i) => (4, u64::from_ne_bytes(i.to_ne_bytes())),
            Self::AnonType(t) => (5, u64::from(t as u8)),
            Self::Builtin(b) => (6, u64::from(b as u8)),
            Self::Exception(e) => (7, u64::from(e as u8)),
            Self::Ref(id) => (8, u64::from(id.0)),
            Self::Raw(span) => (9, span.offset as u64),
        };
        let mut out = [0u8; 9];
        out[0] = discriminant;
        out[1..].copy_from_slice(&payload.to_le_bytes());
        out
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
