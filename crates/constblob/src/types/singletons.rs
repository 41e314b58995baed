//! Fixed one-byte tables: anonymous runtime types (`M`), named special
//! values (`Q`), and special float bit patterns (`Z`).

use strum::{FromRepr, IntoStaticStr};

use crate::config::HostVersion;

/// Runtime types that have no name in the builtins namespace.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, IntoStaticStr)]
pub enum AnonType {
    #[strum(serialize = "NoneType")]
    NoneType = 0,
    #[strum(serialize = "ellipsis")]
    Ellipsis = 1,
    #[strum(serialize = "NotImplementedType")]
    NotImplementedType = 2,
    #[strum(serialize = "function")]
    Function = 3,
    #[strum(serialize = "generator")]
    Generator = 4,
    #[strum(serialize = "builtin_function_or_method")]
    BuiltinFunction = 5,
    #[strum(serialize = "code")]
    Code = 6,
    #[strum(serialize = "module")]
    Module = 7,
    // 2.x only
    #[strum(serialize = "file")]
    File = 8,
    #[strum(serialize = "classobj")]
    ClassObj = 9,
    #[strum(serialize = "instance")]
    Instance = 10,
    #[strum(serialize = "instancemethod")]
    InstanceMethod = 11,
}

impl AnonType {
    /// Resolves an `M` table index for the given host version.
    #[must_use]
    pub fn lookup(index: u8, version: HostVersion) -> Option<Self> {
        Self::from_repr(index).filter(|anon| (*anon as u8) < 8 || version.major == 2)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Values resolved through a runtime lookup rather than encoded inline.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum SpecialValue {
    Ellipsis = 0,
    NotImplemented = 1,
    /// `sys.version_info` as a plain tuple.
    SysVersionInfo = 2,
}

/// Float constants whose bit patterns must survive exactly.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
pub enum SpecialFloat {
    PlusZero = 0,
    MinusZero = 1,
    PlusNan = 2,
    MinusNan = 3,
    PlusInf = 4,
    MinusInf = 5,
}

impl SpecialFloat {
    pub const COUNT: usize = 6;

    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Self::PlusZero => 0.0,
            Self::MinusZero => -0.0,
            Self::PlusNan => f64::NAN,
            Self::MinusNan => -f64::NAN,
            Self::PlusInf => f64::INFINITY,
            Self::MinusInf => f64::NEG_INFINITY,
        }
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_float_bits() {
        let plus_zero = SpecialFloat::PlusZero.value().to_bits();
        let minus_zero = SpecialFloat::MinusZero.value().to_bits();
        assert_ne!(plus_zero, minus_zero);
        assert_eq!(plus_zero ^ minus_zero, 1 << 63);

        let plus_nan = SpecialFloat::PlusNan.value();
        let minus_nan = SpecialFloat::MinusNan.value();
        assert!(plus_nan.is_nan() && minus_nan.is_nan());
        assert!(plus_nan.is_sign_positive());
        assert!(minus_nan.is_sign_negative());
    }

    #[test]
    fn anon_types_gated_by_version() {
        assert_eq!(AnonType::lookup(7, HostVersion::PY311), Some(AnonType::Module));
        assert_eq!(AnonType::lookup(8, HostVersion::PY311), None);
        assert_eq!(AnonType::lookup(8, HostVersion::PY27), Some(AnonType::File));
        assert_eq!(AnonType::lookup(12, HostVersion::PY27), None);
    }
}
