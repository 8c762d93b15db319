//! Node records stored in the namespace arena.

use std::fmt;
use std::time::SystemTime;

use indexmap::IndexMap;

/// Stable identifier of a node in the namespace arena.
///
/// Identifiers are handed out sequentially and never reused, so they double
/// as FUSE inode numbers. The root is always `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Root directory (inode 1 in FUSE)
    pub const ROOT: NodeId = NodeId(1);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(super) fn index(&self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }

    pub(super) fn from_index(index: usize) -> Self {
        Self(index as u64 + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

impl NodeKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// Owning user and group stamped on every node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// POSIX-style attribute record of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttrs {
    /// Permission bits (no file type bits)
    pub perm: u16,
    /// Size in bytes, always 0 for directories
    pub size: u64,
    /// Creation time
    pub ctime: SystemTime,
    /// Modification time
    pub mtime: SystemTime,
    pub uid: u32,
    pub gid: u32,
}

impl NodeAttrs {
    pub const DIR_PERM: u16 = 0o755;

    pub fn directory(owner: Owner, now: SystemTime) -> Self {
        Self {
            perm: Self::DIR_PERM,
            size: 0,
            ctime: now,
            mtime: now,
            uid: owner.uid,
            gid: owner.gid,
        }
    }

    pub fn file(owner: Owner, perm: u16, ctime: SystemTime, mtime: SystemTime) -> Self {
        Self {
            perm,
            size: 0,
            ctime,
            mtime,
            uid: owner.uid,
            gid: owner.gid,
        }
    }
}

/// Snapshot of a node returned to callers outside the tree lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    pub attrs: NodeAttrs,
}

#[derive(Debug)]
pub(super) struct Node {
    pub(super) parent: Option<NodeId>,
    pub(super) name: String,
    pub(super) path: String,
    pub(super) kind: NodeKind,
    pub(super) attrs: NodeAttrs,
    /// Child name to node, in insertion order. Always empty for files.
    pub(super) children: IndexMap<String, NodeId>,
}

impl Node {
    pub(super) fn info(&self, id: NodeId) -> NodeInfo {
        NodeInfo {
            id,
            parent: self.parent,
            name: self.name.clone(),
            path: self.path.clone(),
            kind: self.kind,
            attrs: self.attrs,
        }
    }
}
