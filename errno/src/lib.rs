// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Typed POSIX-style error codes for the bridge compatibility shim.
//!
//! The control channel carries operation results as a raw `u32` errno value
//! (`0` meaning success).  This crate wraps the non-zero codes in a newtype so
//! the rest of the workspace never passes bare integers around, while still
//! round-tripping unknown codes from the peer unchanged.

#![deny(clippy::all, clippy::pedantic)]

use std::num::NonZero;

/// A non-zero POSIX-style error code as carried on the control channel.
///
/// # Note
///
/// This type is marked [`#[repr(transparent)]`][transparent] so that
/// [`Option<Errno>`] has the same size and alignment as `u32`, which is the
/// representation used on the wire.
///
/// [transparent]: https://doc.rust-lang.org/reference/type-layout.html#the-transparent-representation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, thiserror::Error)]
#[error("{}", self.name())]
#[repr(transparent)]
pub struct Errno(NonZero<u32>);

impl Errno {
    pub const EPERM: Errno = Errno::from_const(1);
    pub const ENOENT: Errno = Errno::from_const(2);
    pub const ESRCH: Errno = Errno::from_const(3);
    pub const EIO: Errno = Errno::from_const(5);
    pub const ENOMEM: Errno = Errno::from_const(12);
    pub const EFAULT: Errno = Errno::from_const(14);
    pub const EBUSY: Errno = Errno::from_const(16);
    pub const ENODEV: Errno = Errno::from_const(19);
    pub const EINVAL: Errno = Errno::from_const(22);
    pub const EOPNOTSUPP: Errno = Errno::from_const(95);
    pub const EHOSTUNREACH: Errno = Errno::from_const(113);
    pub const ETIMEDOUT: Errno = Errno::from_const(110);
    pub const ESTALE: Errno = Errno::from_const(116);

    const fn from_const(raw: u32) -> Errno {
        match NonZero::new(raw) {
            Some(raw) => Errno(raw),
            None => unreachable!(),
        }
    }

    /// Interpret a raw error-code attribute: `0` is success, anything else is
    /// an [`Errno`].
    pub const fn check(raw: u32) -> Result<(), Errno> {
        match NonZero::new(raw) {
            None => Ok(()),
            Some(raw) => Err(Errno(raw)),
        }
    }

    /// The raw value of this code, as carried on the wire.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0.get()
    }

    /// The symbolic name of this code, or `"errno(<n>)"-style` text for codes
    /// this crate has no name for.
    #[must_use]
    pub fn name(self) -> String {
        match self.0.get() {
            1 => "EPERM".to_string(),
            2 => "ENOENT".to_string(),
            3 => "ESRCH".to_string(),
            5 => "EIO".to_string(),
            12 => "ENOMEM".to_string(),
            14 => "EFAULT".to_string(),
            16 => "EBUSY".to_string(),
            19 => "ENODEV".to_string(),
            22 => "EINVAL".to_string(),
            95 => "EOPNOTSUPP".to_string(),
            110 => "ETIMEDOUT".to_string(),
            113 => "EHOSTUNREACH".to_string(),
            116 => "ESTALE".to_string(),
            raw => format!("errno({raw})"),
        }
    }
}

impl From<Errno> for u32 {
    fn from(errno: Errno) -> u32 {
        errno.as_u32()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test {
    use super::*;

    #[test]
    fn zero_is_success() {
        assert_eq!(Errno::check(0), Ok(()));
    }

    #[test]
    fn known_code_has_a_name() {
        assert_eq!(Errno::check(22).unwrap_err(), Errno::EINVAL);
        assert_eq!(Errno::EINVAL.name(), "EINVAL");
    }

    #[test]
    fn unknown_code_round_trips() {
        let errno = Errno::check(4242).unwrap_err();
        assert_eq!(errno.as_u32(), 4242);
        assert_eq!(errno.name(), "errno(4242)");
    }
}
