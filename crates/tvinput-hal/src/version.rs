//! API versioning
//!
//! Versions are (major, minor) pairs packed into 16 bits, major in the high
//! byte. A device version is acceptable to a consumer when the majors match
//! and the device's minor is no newer than the one the consumer supports.

use crate::HalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u8,
    pub minor: u8,
}

/// Initial TV input module API
pub const TV_INPUT_MODULE_API_VERSION_0_1: ApiVersion = ApiVersion::new(0, 1);

/// Initial TV input device API
pub const TV_INPUT_DEVICE_API_VERSION_0_1: ApiVersion = ApiVersion::new(0, 1);

/// Version of the module/device framework the module was built against
pub const HAL_API_VERSION: ApiVersion = ApiVersion::new(1, 0);

impl ApiVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// 16-bit packed form
    pub const fn packed(self) -> u16 {
        ((self.major as u16) << 8) | self.minor as u16
    }

    pub const fn from_packed(packed: u16) -> Self {
        Self {
            major: (packed >> 8) as u8,
            minor: (packed & 0xff) as u8,
        }
    }

    /// Check whether this version can be driven by a consumer supporting `supported`
    pub fn is_compatible_with(self, supported: ApiVersion) -> bool {
        self.major == supported.major && self.minor <= supported.minor
    }

    /// Fail with [`HalError::UnsupportedVersion`] unless compatible
    pub fn ensure_compatible(self, supported: ApiVersion) -> crate::Result<()> {
        if self.is_compatible_with(supported) {
            Ok(())
        } else {
            Err(HalError::UnsupportedVersion {
                found: self,
                supported,
            })
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HalError::InvalidArgument(format!("invalid API version '{s}'"));

        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        let major = major.parse::<u8>().map_err(|_| invalid())?;
        let minor = minor.parse::<u8>().map_err(|_| invalid())?;

        Ok(Self::new(major, minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout() {
        assert_eq!(TV_INPUT_MODULE_API_VERSION_0_1.packed(), 0x0001);
        assert_eq!(HAL_API_VERSION.packed(), 0x0100);
        assert_eq!(ApiVersion::new(2, 3).packed(), 0x0203);
        assert_eq!(ApiVersion::from_packed(0x0203), ApiVersion::new(2, 3));
    }

    #[test]
    fn test_compatibility() {
        let supported = ApiVersion::new(0, 2);

        assert!(ApiVersion::new(0, 1).is_compatible_with(supported));
        assert!(ApiVersion::new(0, 2).is_compatible_with(supported));
        assert!(!ApiVersion::new(0, 3).is_compatible_with(supported));
        assert!(!ApiVersion::new(1, 0).is_compatible_with(supported));
    }

    #[test]
    fn test_ensure_compatible_error() {
        let result = ApiVersion::new(0, 5).ensure_compatible(ApiVersion::new(0, 1));
        assert!(matches!(
            result,
            Err(HalError::UnsupportedVersion { found, .. }) if found == ApiVersion::new(0, 5)
        ));
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(TV_INPUT_DEVICE_API_VERSION_0_1.to_string(), "0.1");
        assert_eq!("1.0".parse::<ApiVersion>().unwrap(), HAL_API_VERSION);
        assert_eq!(" 0.1 ".parse::<ApiVersion>().unwrap(), ApiVersion::new(0, 1));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<ApiVersion>().is_err());
        assert!("1".parse::<ApiVersion>().is_err());
        assert!("a.b".parse::<ApiVersion>().is_err());
        assert!("1.256".parse::<ApiVersion>().is_err());
    }
}
