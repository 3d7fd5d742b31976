//! Open-time policies and their translation into `openat(2)` flags.

use std::ops::BitOr;

/// Create-vs-open-existing and truncation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the file, replacing (truncating) any existing one.
    CreateAlways,
    /// Open the file if it exists, create it otherwise.
    CreateOrOpen,
    /// Create the file; fail if the path already exists.
    CreateNew,
    /// Open an existing file; fail if the path does not exist.
    OpenExisting,
    /// Open or create, then truncate to zero length.
    OpenOrCreateTruncate,
}

/// Concurrent-access policy for other handles to the same path.
///
/// Combinable as a set: `ShareMode::read() | ShareMode::write()`.
///
/// POSIX has no mandatory share modes, so on Linux the set is carried
/// through the API without kernel effect; it maps to real sharing flags on
/// platforms that have them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareMode {
    bits: u8,
}

impl ShareMode {
    const READ: u8 = 1 << 0;
    const WRITE: u8 = 1 << 1;
    const DELETE: u8 = 1 << 2;

    /// No concurrent access allowed.
    pub fn none() -> Self {
        Self { bits: 0 }
    }

    /// Allow concurrent reads.
    pub fn read() -> Self {
        Self { bits: Self::READ }
    }

    /// Allow concurrent writes.
    pub fn write() -> Self {
        Self { bits: Self::WRITE }
    }

    /// Allow concurrent deletion/renaming.
    pub fn delete() -> Self {
        Self { bits: Self::DELETE }
    }

    pub fn allows_read(&self) -> bool {
        self.bits & Self::READ != 0
    }

    pub fn allows_write(&self) -> bool {
        self.bits & Self::WRITE != 0
    }

    pub fn allows_delete(&self) -> bool {
        self.bits & Self::DELETE != 0
    }
}

impl BitOr for ShareMode {
    type Output = ShareMode;

    fn bitor(self, rhs: ShareMode) -> ShareMode {
        ShareMode {
            bits: self.bits | rhs.bits,
        }
    }
}

/// OS-level caching and access-pattern policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingMode {
    /// Normal page-cache buffering.
    Default,
    /// Direct I/O (`O_DIRECT`); offsets and buffer lengths must be
    /// sector-aligned, which is the caller's obligation.
    Unbuffered,
    /// Hint that access will be sequential.
    Sequential,
    /// Hint that access will be random.
    RandomAccess,
    /// Hint that the data will not be reused.
    Temporary,
    /// Writes reach the device before completing (`O_SYNC`).
    WriteThrough,
}

/// OS access rights requested at open; fixed by the capability wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Collapse access, open and buffering policies into one flag set for the
/// single open call.
pub(crate) fn open_flags(access: Access, open_mode: OpenMode, buffering: BufferingMode) -> i32 {
    let mut flags = match access {
        Access::Read => libc::O_RDONLY,
        Access::Write => libc::O_WRONLY,
        Access::ReadWrite => libc::O_RDWR,
    };

    flags |= match open_mode {
        OpenMode::CreateAlways => libc::O_CREAT | libc::O_TRUNC,
        OpenMode::CreateOrOpen => libc::O_CREAT,
        OpenMode::CreateNew => libc::O_CREAT | libc::O_EXCL,
        OpenMode::OpenExisting => 0,
        // Same bits as CreateAlways on POSIX; the distinction only exists
        // on platforms that separate "replace" from "open then truncate".
        OpenMode::OpenOrCreateTruncate => libc::O_CREAT | libc::O_TRUNC,
    };

    flags |= match buffering {
        BufferingMode::Unbuffered => libc::O_DIRECT,
        BufferingMode::WriteThrough => libc::O_SYNC,
        _ => 0,
    };

    flags | libc::O_CLOEXEC
}

/// Access-pattern advice applied after the open, when the mode maps to one.
pub(crate) fn advise(buffering: BufferingMode) -> Option<i32> {
    match buffering {
        BufferingMode::Sequential => Some(libc::POSIX_FADV_SEQUENTIAL),
        BufferingMode::RandomAccess => Some(libc::POSIX_FADV_RANDOM),
        BufferingMode::Temporary => Some(libc::POSIX_FADV_NOREUSE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_new_requires_exclusive_creation() {
        let flags = open_flags(Access::Write, OpenMode::CreateNew, BufferingMode::Default);
        assert_ne!(flags & libc::O_CREAT, 0);
        assert_ne!(flags & libc::O_EXCL, 0);
        assert_eq!(flags & libc::O_TRUNC, 0);
    }

    #[test]
    fn open_existing_never_creates() {
        let flags = open_flags(Access::Read, OpenMode::OpenExisting, BufferingMode::Default);
        assert_eq!(flags & libc::O_CREAT, 0);
        assert_eq!(flags & libc::O_EXCL, 0);
    }

    #[test]
    fn truncating_modes_truncate() {
        for mode in [OpenMode::CreateAlways, OpenMode::OpenOrCreateTruncate] {
            let flags = open_flags(Access::Write, mode, BufferingMode::Default);
            assert_ne!(flags & libc::O_CREAT, 0);
            assert_ne!(flags & libc::O_TRUNC, 0);
        }
    }

    #[test]
    fn buffering_modes_map_to_flags() {
        let direct = open_flags(Access::Write, OpenMode::CreateOrOpen, BufferingMode::Unbuffered);
        assert_ne!(direct & libc::O_DIRECT, 0);

        let sync = open_flags(Access::Write, OpenMode::CreateOrOpen, BufferingMode::WriteThrough);
        assert_ne!(sync & libc::O_SYNC, 0);

        let plain = open_flags(Access::Write, OpenMode::CreateOrOpen, BufferingMode::Default);
        assert_eq!(plain & (libc::O_DIRECT | libc::O_SYNC), 0);
    }

    #[test]
    fn cloexec_is_always_requested() {
        for mode in [
            BufferingMode::Default,
            BufferingMode::Unbuffered,
            BufferingMode::Sequential,
        ] {
            let flags = open_flags(Access::ReadWrite, OpenMode::CreateOrOpen, mode);
            assert_ne!(flags & libc::O_CLOEXEC, 0);
        }
    }

    #[test]
    fn advise_only_for_hint_modes() {
        assert_eq!(
            advise(BufferingMode::Sequential),
            Some(libc::POSIX_FADV_SEQUENTIAL)
        );
        assert_eq!(
            advise(BufferingMode::RandomAccess),
            Some(libc::POSIX_FADV_RANDOM)
        );
        assert_eq!(advise(BufferingMode::Default), None);
        assert_eq!(advise(BufferingMode::Unbuffered), None);
        assert_eq!(advise(BufferingMode::WriteThrough), None);
    }

    #[test]
    fn share_modes_combine_as_a_set() {
        let share = ShareMode::read() | ShareMode::delete();
        assert!(share.allows_read());
        assert!(share.allows_delete());
        assert!(!share.allows_write());

        let none = ShareMode::none();
        assert!(!none.allows_read() && !none.allows_write() && !none.allows_delete());
    }
}
