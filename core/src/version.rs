//! Etherpad API protocol versions and the per-method version gate.
//!
//! # Design
//! The protocol version is the remote API's own `MAJOR.MINOR.PATCH` number
//! (`/api/1.2.13/...`), unrelated to this crate's version. Components compare
//! numerically, so `1.2.10` is newer than `1.2.9`.

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// A `MAJOR.MINOR.PATCH` Etherpad API version.
///
/// Field order gives the derived `Ord` semantic-version ordering. Components
/// beyond `u64::MAX` do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ApiVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Returned when a string is not of the form `\d+\.\d+\.\d+`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a MAJOR.MINOR.PATCH version")]
pub struct ParseVersionError(String);

impl FromStr for ApiVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let mut parts = s.split('.');
        let mut next = || -> Result<u64, ParseVersionError> {
            let part = parts.next().ok_or_else(err)?;
            // `u64::from_str` accepts a leading `+`, the version grammar does not.
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            part.parse().map_err(|_| err())
        };
        let version = ApiVersion::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

/// Fail with [`ApiError::NotImplemented`] when `configured` is older than the
/// `required` minimum version of a method.
pub fn ensure_supported(configured: ApiVersion, required: ApiVersion) -> Result<(), ApiError> {
    if configured < required {
        return Err(ApiError::NotImplemented {
            configured,
            required,
        });
    }
    Ok(())
}
