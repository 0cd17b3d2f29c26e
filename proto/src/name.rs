// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounded bridge / port names.

use std::fmt::{Display, Formatter};

/// A bridge or port name as carried on the control channel.
///
/// Names follow the platform interface-name rules: non-empty, at most
/// [`IfName::MAX_LEN`] bytes, no interior NUL, and NUL-terminated on the
/// wire.  Holding one of these is proof the bounds were checked.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IfName(String);

impl IfName {
    /// Maximum length of a name in bytes, excluding the wire NUL terminator.
    /// This is `IFNAMSIZ - 1` on the platforms the legacy tooling targets.
    pub const MAX_LEN: usize = 15;

    /// Wire size of the name field including the NUL terminator.
    pub const WIRE_SIZE: usize = IfName::MAX_LEN + 1;

    /// Parse a name from a NUL-terminated wire field.
    ///
    /// Anything after the first NUL is ignored, matching the legacy tools
    /// which always send a full `IFNAMSIZ` block.
    pub fn from_wire(raw: &[u8]) -> Result<IfName, IfNameError> {
        let end = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or(IfNameError::NotTerminated)?;
        IfName::try_from(
            std::str::from_utf8(&raw[..end]).map_err(|_| IfNameError::NotUtf8)?,
        )
    }

    /// Render the name as a NUL-terminated wire field.
    #[must_use]
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = self.0.as_bytes().to_vec();
        out.push(0);
        out
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for IfName {
    type Error = IfNameError;

    fn try_from(name: &str) -> Result<IfName, IfNameError> {
        if name.is_empty() {
            return Err(IfNameError::Empty);
        }
        if name.len() > IfName::MAX_LEN {
            return Err(IfNameError::TooLong(name.len()));
        }
        if name.bytes().any(|b| b == 0) {
            return Err(IfNameError::InteriorNul);
        }
        Ok(IfName(name.to_string()))
    }
}

impl Display for IfName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when building an [`IfName`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IfNameError {
    #[error("names may not be empty")]
    Empty,
    #[error("name of {0} bytes exceeds the {max} byte limit", max = IfName::MAX_LEN)]
    TooLong(usize),
    #[error("names may not contain NUL bytes")]
    InteriorNul,
    #[error("wire name field is not NUL terminated")]
    NotTerminated,
    #[error("name is not valid utf-8")]
    NotUtf8,
}
