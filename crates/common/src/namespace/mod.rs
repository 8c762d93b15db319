//! In-memory filesystem namespace
//!
//! The namespace is an arena of nodes addressed by stable [`NodeId`]s. Each
//! directory owns an insertion-ordered map of child names; children point back
//! to their parent by id only. Path resolution walks the tree from the root
//! one component at a time.
//!
//! Nodes are never removed during a run. All mutation happens under a single
//! write lock per `create`, while lookups share a read lock, so the foreground
//! FUSE path and the background syncer can interleave freely.

mod node;
pub mod path;

use std::time::SystemTime;

use indexmap::IndexMap;
use parking_lot::RwLock;

pub use node::{NodeAttrs, NodeId, NodeInfo, NodeKind, Owner};

use node::Node;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("no such entry: {0}")]
    NotFound(String),
    #[error("entry already exists: {0}")]
    AlreadyExists(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn node(&self, id: NodeId) -> Option<&Node> {
        id.index().and_then(|i| self.nodes.get(i))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        id.index().and_then(move |i| self.nodes.get_mut(i))
    }

    fn resolve(&self, path: &str) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for component in path::components(path) {
            current = *self.node(current)?.children.get(component)?;
        }
        Some(current)
    }
}

/// The shared node tree
#[derive(Debug)]
pub struct Namespace {
    tree: RwLock<Tree>,
    owner: Owner,
}

impl Namespace {
    /// Create a namespace holding only the root directory
    pub fn new(owner: Owner) -> Self {
        let root = Node {
            parent: None,
            name: String::new(),
            path: "/".to_string(),
            kind: NodeKind::Directory,
            attrs: NodeAttrs::directory(owner, SystemTime::now()),
            children: IndexMap::new(),
        };

        Self {
            tree: RwLock::new(Tree { nodes: vec![root] }),
            owner,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Attributes for a new directory owned by this namespace's owner
    pub fn dir_attrs(&self) -> NodeAttrs {
        NodeAttrs::directory(self.owner, SystemTime::now())
    }

    /// Attributes for a new file owned by this namespace's owner
    pub fn file_attrs(&self, perm: u16, ctime: SystemTime, mtime: SystemTime) -> NodeAttrs {
        NodeAttrs::file(self.owner, perm, ctime, mtime)
    }

    /// Create a node named `name` under the directory at `parent_path`
    pub fn create(
        &self,
        parent_path: &str,
        name: &str,
        kind: NodeKind,
        attrs: NodeAttrs,
    ) -> Result<NodeId, NamespaceError> {
        let mut tree = self.tree.write();
        let parent = tree
            .resolve(parent_path)
            .ok_or_else(|| NamespaceError::NotFound(path::normalize(parent_path)))?;
        Self::insert(&mut tree, parent, name, kind, attrs)
    }

    /// Create a node named `name` under the directory `parent`
    pub fn create_child(
        &self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        attrs: NodeAttrs,
    ) -> Result<NodeId, NamespaceError> {
        let mut tree = self.tree.write();
        Self::insert(&mut tree, parent, name, kind, attrs)
    }

    /// Create every missing directory along `dir_path` and return the last one
    pub fn create_dir_all(&self, dir_path: &str) -> Result<NodeId, NamespaceError> {
        let mut tree = self.tree.write();
        let mut current = NodeId::ROOT;
        for component in path::components(dir_path) {
            let existing = tree
                .node(current)
                .and_then(|n| n.children.get(component))
                .copied();
            current = match existing {
                Some(id) => {
                    let is_dir = tree.node(id).map(|n| n.kind.is_dir()).unwrap_or(false);
                    if !is_dir {
                        return Err(NamespaceError::NotADirectory(path::normalize(dir_path)));
                    }
                    id
                }
                None => {
                    let attrs = NodeAttrs::directory(self.owner, SystemTime::now());
                    Self::insert(&mut tree, current, component, NodeKind::Directory, attrs)?
                }
            };
        }
        Ok(current)
    }

    fn insert(
        tree: &mut Tree,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        mut attrs: NodeAttrs,
    ) -> Result<NodeId, NamespaceError> {
        if !path::is_valid_name(name) {
            return Err(NamespaceError::InvalidName(name.to_string()));
        }

        let parent_node = tree
            .node(parent)
            .ok_or_else(|| NamespaceError::NotFound(format!("node {}", parent)))?;
        if !parent_node.kind.is_dir() {
            return Err(NamespaceError::NotFound(parent_node.path.clone()));
        }

        let child_path = path::join(&parent_node.path, name);
        if parent_node.children.contains_key(name) {
            return Err(NamespaceError::AlreadyExists(child_path));
        }

        if kind.is_dir() {
            attrs.size = 0;
        }

        let id = NodeId::from_index(tree.nodes.len());
        tree.nodes.push(Node {
            parent: Some(parent),
            name: name.to_string(),
            path: child_path,
            kind,
            attrs,
            children: IndexMap::new(),
        });
        if let Some(parent_node) = tree.node_mut(parent) {
            parent_node.children.insert(name.to_string(), id);
        }

        tracing::trace!(node = %id, parent = %parent, name, ?kind, "created node");
        Ok(id)
    }

    /// Resolve an absolute path to its node
    pub fn resolve(&self, path: &str) -> Result<NodeInfo, NamespaceError> {
        let tree = self.tree.read();
        tree.resolve(path)
            .and_then(|id| tree.node(id).map(|n| n.info(id)))
            .ok_or_else(|| NamespaceError::NotFound(path::normalize(path)))
    }

    /// Names of the children of the directory at `path`, in insertion order
    ///
    /// The `.` and `..` pseudo-entries are not stored in the tree; the
    /// filesystem boundary adds them.
    pub fn list_children(&self, path: &str) -> Result<Vec<String>, NamespaceError> {
        let tree = self.tree.read();
        let node = tree
            .resolve(path)
            .and_then(|id| tree.node(id))
            .filter(|n| n.kind.is_dir())
            .ok_or_else(|| NamespaceError::NotFound(path::normalize(path)))?;
        Ok(node.children.keys().cloned().collect())
    }

    /// Children of directory `id` with their ids and kinds, in insertion order
    pub fn children(&self, id: NodeId) -> Result<Vec<(String, NodeId, NodeKind)>, NamespaceError> {
        let tree = self.tree.read();
        let node = tree
            .node(id)
            .ok_or_else(|| NamespaceError::NotFound(format!("node {}", id)))?;
        if !node.kind.is_dir() {
            return Err(NamespaceError::NotADirectory(node.path.clone()));
        }

        Ok(node
            .children
            .iter()
            .filter_map(|(name, child)| {
                tree.node(*child)
                    .map(|c| (name.clone(), *child, c.kind))
            })
            .collect())
    }

    /// Find the child `name` of directory `parent`
    pub fn lookup(&self, parent: NodeId, name: &str) -> Option<NodeInfo> {
        let tree = self.tree.read();
        let child = *tree.node(parent)?.children.get(name)?;
        tree.node(child).map(|n| n.info(child))
    }

    pub fn get(&self, id: NodeId) -> Option<NodeInfo> {
        let tree = self.tree.read();
        tree.node(id).map(|n| n.info(id))
    }

    pub fn attributes_of(&self, id: NodeId) -> Option<NodeAttrs> {
        self.tree.read().node(id).map(|n| n.attrs)
    }

    /// Update the size of a file node. Directories are left untouched.
    pub fn set_size(&self, id: NodeId, size: u64) -> Result<(), NamespaceError> {
        let mut tree = self.tree.write();
        let node = tree
            .node_mut(id)
            .ok_or_else(|| NamespaceError::NotFound(format!("node {}", id)))?;
        if node.kind == NodeKind::File {
            node.attrs.size = size;
        }
        Ok(())
    }

    /// Number of nodes, including the root
    pub fn node_count(&self) -> usize {
        self.tree.read().nodes.len()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(Owner::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    fn file_attrs(ns: &Namespace) -> NodeAttrs {
        let t = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        ns.file_attrs(0o744, t, t)
    }

    #[test]
    fn test_root_exists() {
        let ns = Namespace::default();
        let root = ns.resolve("/").unwrap();
        assert_eq!(root.id, NodeId::ROOT);
        assert_eq!(root.kind, NodeKind::Directory);
        assert!(root.parent.is_none());
        assert!(ns.list_children("/").unwrap().is_empty());
    }

    #[test]
    fn test_create_and_resolve() {
        let ns = Namespace::default();
        ns.create("/", "stream", NodeKind::Directory, ns.dir_attrs())
            .unwrap();
        let id = ns
            .create("/stream", "Sunset.jpg", NodeKind::File, file_attrs(&ns))
            .unwrap();

        let node = ns.resolve("/stream/Sunset.jpg").unwrap();
        assert_eq!(node.id, id);
        assert_eq!(node.kind, NodeKind::File);
        assert_eq!(node.path, "/stream/Sunset.jpg");
        assert_eq!(node.attrs.perm, 0o744);

        let parent = ns.get(node.parent.unwrap()).unwrap();
        assert_eq!(parent.path, "/stream");
    }

    #[test]
    fn test_create_missing_parent() {
        let ns = Namespace::default();
        let err = ns
            .create("/nope", "a.jpg", NodeKind::File, file_attrs(&ns))
            .unwrap_err();
        assert_eq!(err, NamespaceError::NotFound("/nope".to_string()));
    }

    #[test]
    fn test_create_under_file_is_not_found() {
        let ns = Namespace::default();
        ns.create("/", "a.jpg", NodeKind::File, file_attrs(&ns))
            .unwrap();
        let err = ns
            .create("/a.jpg", "b.jpg", NodeKind::File, file_attrs(&ns))
            .unwrap_err();
        assert!(matches!(err, NamespaceError::NotFound(_)));
    }

    #[test]
    fn test_create_duplicate() {
        let ns = Namespace::default();
        ns.create("/", "date", NodeKind::Directory, ns.dir_attrs())
            .unwrap();
        let err = ns
            .create("/", "date", NodeKind::File, file_attrs(&ns))
            .unwrap_err();
        assert_eq!(err, NamespaceError::AlreadyExists("/date".to_string()));
        // the original kind is kept
        assert_eq!(ns.resolve("/date").unwrap().kind, NodeKind::Directory);
    }

    #[test]
    fn test_invalid_names() {
        let ns = Namespace::default();
        for name in ["", ".", "..", "a/b"] {
            let err = ns
                .create("/", name, NodeKind::File, file_attrs(&ns))
                .unwrap_err();
            assert!(matches!(err, NamespaceError::InvalidName(_)));
        }
    }

    #[test]
    fn test_list_children_in_insertion_order() {
        let ns = Namespace::default();
        for name in ["tags", "sets", "date", "stream"] {
            ns.create("/", name, NodeKind::Directory, ns.dir_attrs())
                .unwrap();
        }
        assert_eq!(
            ns.list_children("/").unwrap(),
            vec!["tags", "sets", "date", "stream"]
        );
    }

    #[test]
    fn test_list_children_of_file_fails() {
        let ns = Namespace::default();
        ns.create("/", "a.jpg", NodeKind::File, file_attrs(&ns))
            .unwrap();
        assert!(ns.list_children("/a.jpg").is_err());
        assert!(ns.list_children("/missing").is_err());
    }

    #[test]
    fn test_create_dir_all() {
        let ns = Namespace::default();
        let personal = ns.create_dir_all("/tags/personal").unwrap();
        let public = ns.create_dir_all("/tags/public").unwrap();
        assert_ne!(personal, public);
        assert_eq!(ns.create_dir_all("/tags/public").unwrap(), public);
        assert_eq!(ns.list_children("/tags").unwrap(), vec!["personal", "public"]);
    }

    #[test]
    fn test_set_size() {
        let ns = Namespace::default();
        let id = ns
            .create("/", "a.jpg", NodeKind::File, file_attrs(&ns))
            .unwrap();
        assert_eq!(ns.attributes_of(id).unwrap().size, 0);
        ns.set_size(id, 4096).unwrap();
        assert_eq!(ns.attributes_of(id).unwrap().size, 4096);

        // directories keep size zero
        ns.set_size(NodeId::ROOT, 10).unwrap();
        assert_eq!(ns.attributes_of(NodeId::ROOT).unwrap().size, 0);
    }

    #[test]
    fn test_lookup_and_children() {
        let ns = Namespace::default();
        let stream = ns
            .create("/", "stream", NodeKind::Directory, ns.dir_attrs())
            .unwrap();
        let file = ns
            .create_child(stream, "x.jpg", NodeKind::File, file_attrs(&ns))
            .unwrap();

        assert_eq!(ns.lookup(stream, "x.jpg").unwrap().id, file);
        assert!(ns.lookup(stream, "y.jpg").is_none());
        assert_eq!(
            ns.children(stream).unwrap(),
            vec![("x.jpg".to_string(), file, NodeKind::File)]
        );
        assert!(ns.children(file).is_err());
    }

    #[test]
    fn test_kind_is_permanent_under_concurrency() {
        let ns = Arc::new(Namespace::default());
        ns.create("/", "stream", NodeKind::Directory, ns.dir_attrs())
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ns = ns.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let (name, kind) = if i % 2 == 0 {
                            (format!("f{}-{}", t, i), NodeKind::File)
                        } else {
                            (format!("d{}-{}", t, i), NodeKind::Directory)
                        };
                        let attrs = if kind.is_dir() {
                            ns.dir_attrs()
                        } else {
                            file_attrs(&ns)
                        };
                        ns.create("/stream", &name, kind, attrs).unwrap();
                        let _ = ns.list_children("/stream").unwrap();
                        assert_eq!(ns.resolve(&format!("/stream/{}", name)).unwrap().kind, kind);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(ns.list_children("/stream").unwrap().len(), 400);
        for t in 0..8 {
            for i in 0..50 {
                let path = if i % 2 == 0 {
                    format!("/stream/f{}-{}", t, i)
                } else {
                    format!("/stream/d{}-{}", t, i)
                };
                let expected = if i % 2 == 0 {
                    NodeKind::File
                } else {
                    NodeKind::Directory
                };
                assert_eq!(ns.resolve(&path).unwrap().kind, expected);
            }
        }
    }
}
