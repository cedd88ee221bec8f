use std::fmt;

use crate::{
    statistics::Statistics,
    util::{Result, Status},
};

/// How a DB instance was opened. Fixed for the lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn is_read_only(self) -> bool {
        self == AccessMode::ReadOnly
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::ReadWrite => write!(f, "read-write"),
            AccessMode::ReadOnly => write!(f, "read-only"),
        }
    }
}

/// Every operation that changes the database. Each one is checked by
/// [`MutationGuard::check`] before it touches the WAL, a MemTable or the
/// MANIFEST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Put,
    Delete,
    Write,
    CreateColumnFamily,
    DropColumnFamily,
    Flush,
}

impl Mutation {
    pub fn name(self) -> &'static str {
        match self {
            Mutation::Put => "Put",
            Mutation::Delete => "Delete",
            Mutation::Write => "Write",
            Mutation::CreateColumnFamily => "CreateColumnFamily",
            Mutation::DropColumnFamily => "DropColumnFamily",
            Mutation::Flush => "Flush",
        }
    }
}

/// Rejects mutations on read-only handles.
///
/// The check is a pure precondition: it reads only the handle's mode, so a
/// rejected call has no effect on the WAL, the MemTables or the MANIFEST,
/// whatever the call's arguments reference.
#[derive(Debug, Clone, Copy)]
pub struct MutationGuard {
    mode: AccessMode,
}

impl MutationGuard {
    pub fn new(mode: AccessMode) -> Self {
        MutationGuard { mode }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn check(&self, mutation: Mutation, stats: &Statistics) -> Result<()> {
        match self.mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => {
                stats.record_read_only_rejection();
                log::debug!("rejected {} on read-only handle", mutation.name());
                Err(Status::read_only_violation(mutation.name()))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;

    const ALL: [Mutation; 6] = [
        Mutation::Put,
        Mutation::Delete,
        Mutation::Write,
        Mutation::CreateColumnFamily,
        Mutation::DropColumnFamily,
        Mutation::Flush,
    ];

    #[test]
    fn test_read_write_allows_everything() {
        let stats = Statistics::new();
        let guard = MutationGuard::new(AccessMode::ReadWrite);
        for m in ALL {
            guard.check(m, &stats).unwrap();
        }
        assert_eq!(stats.read_only_rejections.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_read_only_rejects_everything() {
        let stats = Statistics::new();
        let guard = MutationGuard::new(AccessMode::ReadOnly);
        for m in ALL {
            let err = guard.check(m, &stats).unwrap_err();
            assert!(err.is_read_only_violation());
            assert!(err.message().unwrap().starts_with(m.name()));
        }
        assert_eq!(
            stats.read_only_rejections.load(Ordering::Relaxed),
            ALL.len() as u64
        );
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(AccessMode::ReadOnly.to_string(), "read-only");
        assert!(AccessMode::ReadOnly.is_read_only());
        assert!(!AccessMode::ReadWrite.is_read_only());
    }
}
