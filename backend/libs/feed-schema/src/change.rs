//! Typed change notifications
//!
//! A `ChangeEvent` carries the entity as it looked when the change was
//! committed. The same identity may be delivered more than once and out of
//! order relative to a bulk load, so consumers treat events as idempotent.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent<T> {
    pub kind: ChangeKind,
    pub entity: T,
}

impl<T> ChangeEvent<T> {
    pub fn added(entity: T) -> Self {
        Self {
            kind: ChangeKind::Added,
            entity,
        }
    }

    pub fn modified(entity: T) -> Self {
        Self {
            kind: ChangeKind::Modified,
            entity,
        }
    }

    pub fn removed(entity: T) -> Self {
        Self {
            kind: ChangeKind::Removed,
            entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_display() {
        assert_eq!(ChangeKind::Added.to_string(), "added");
        assert_eq!(ChangeKind::Modified.to_string(), "modified");
        assert_eq!(ChangeKind::Removed.to_string(), "removed");
    }

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(ChangeEvent::added(1).kind, ChangeKind::Added);
        assert_eq!(ChangeEvent::modified(1).kind, ChangeKind::Modified);
        assert_eq!(ChangeEvent::removed(1).kind, ChangeKind::Removed);
    }
}
