//! Runtime configuration: which host version the blob was encoded for, and
//! how deep constant nesting may go.

use std::{fmt, str::FromStr};

/// Host language version the constants were encoded for.
///
/// Selects which tags are legal and the layout of code-object descriptors.
/// Ordering is lexicographic over `(major, minor, micro)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct HostVersion {
    pub major: u8,
    pub minor: u8,
    pub micro: u8,
}

impl HostVersion {
    pub const PY27: Self = Self::new(2, 7);
    pub const PY38: Self = Self::new(3, 8);
    pub const PY39: Self = Self::new(3, 9);
    pub const PY310: Self = Self::new(3, 10);
    pub const PY311: Self = Self::new(3, 11);
    pub const PY312: Self = Self::new(3, 12);

    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor, micro: 0 }
    }

    #[must_use]
    pub const fn with_micro(self, micro: u8) -> Self {
        Self { micro, ..self }
    }

    /// Versions this decoder knows the format of: 2.7 and 3.4 through 3.14.
    #[must_use]
    pub fn is_supported(self) -> bool {
        match self.major {
            2 => self.minor == 7,
            3 => (4..=14).contains(&self.minor),
            _ => false,
        }
    }

    fn at_least(self, major: u8, minor: u8) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    /// Legacy `i`/`I` integer tags only exist for 2.x hosts.
    #[must_use]
    pub fn has_legacy_ints(self) -> bool {
        self.major == 2
    }

    #[must_use]
    pub fn has_kw_only_args(self) -> bool {
        self.major >= 3
    }

    #[must_use]
    pub fn has_pos_only_args(self) -> bool {
        self.at_least(3, 8)
    }

    #[must_use]
    pub fn has_qualname(self) -> bool {
        self.at_least(3, 11)
    }

    #[must_use]
    pub fn has_generic_alias(self) -> bool {
        self.at_least(3, 9)
    }

    #[must_use]
    pub fn has_union_type(self) -> bool {
        self.at_least(3, 10)
    }
}

impl Default for HostVersion {
    fn default() -> Self {
        Self::PY311
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.micro != 0 {
            write!(f, ".{}", self.micro)?;
        }
        Ok(())
    }
}

/// Error returned when parsing a [`HostVersion`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid host version {0:?}, expected MAJOR.MINOR[.MICRO]")]
pub struct ParseVersionError(String);

impl FromStr for HostVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_owned());
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        let micro = match parts.next() {
            Some(p) => p.parse().map_err(|_| err())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self { major, minor, micro })
    }
}

/// Default limit on container nesting inside one constant.
pub const DEFAULT_MAX_NESTING: usize = 256;

/// Settings fixed for the lifetime of a [`crate::ConstantsRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Version whose tag set and code-object layout the decoder follows.
    pub host_version: HostVersion,
    /// Containers nested deeper than this are reported as corrupt data.
    pub max_nesting: usize,
}

impl RuntimeConfig {
    #[must_use]
    pub fn new(host_version: HostVersion) -> Self {
        Self {
            host_version,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    #[must_use]
    pub fn with_max_nesting(self, max_nesting: usize) -> Self {
        Self { max_nesting, ..self }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(HostVersion::default())
    }
}
