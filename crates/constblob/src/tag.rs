//! One-byte type tags that prefix every encoded constant.

use strum::FromRepr;

/// Tag byte introducing an encoded constant.
///
/// Discriminants are the tag bytes themselves.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
pub enum Tag {
    /// Repeat the previous value of the current batch.
    BackRef = b'p',
    Tuple = b'T',
    List = b'L',
    Dict = b'D',
    Set = b'S',
    FrozenSet = b'P',
    /// Non-negative machine int, 2.x hosts only.
    IntPositive = b'i',
    /// Negative machine int, 2.x hosts only.
    IntNegative = b'I',
    LongPositive = b'l',
    LongNegative = b'q',
    /// Non-negative integer as base-2^31 limbs.
    BigIntPositive = b'G',
    BigIntNegative = b'g',
    Float = b'f',
    Complex = b'j',
    /// Complex built from two nested float constants.
    ComplexComposed = b'J',
    /// Attribute name: interned text.
    AttributeName = b'a',
    BytesZeroTerminated = b'c',
    TextZeroTerminated = b'u',
    TextSized = b'v',
    TextChar = b'w',
    BytesSized = b'b',
    BytesChar = b'd',
    ByteArray = b'B',
    None = b'n',
    True = b't',
    False = b'F',
    Slice = b':',
    Range = b';',
    AnonValue = b'M',
    SpecialValue = b'Q',
    Builtin = b'O',
    Exception = b'E',
    SpecialFloat = b'Z',
    RawData = b'X',
    GenericAlias = b'A',
    UnionType = b'H',
    Code = b'C',
    /// Written by the encoder in place of values it could not serialise.
    Corrupt = b'.',
}

impl Tag {
    /// The tag byte as a character, for error messages.
    #[must_use]
    pub fn as_char(self) -> char {
        char::from(self as u8)
    }

    /// Whether decoding this tag recurses into nested constants.
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Tuple
                | Self::List
                | Self::Dict
                | Self::Set
                | Self::FrozenSet
                | Self::Slice
                | Self::Range
                | Self::ComplexComposed
                | Self::GenericAlias
                | Self::UnionType
                | Self::Code
        )
    }
}
