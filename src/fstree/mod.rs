//! In-memory filesystem image tree.
//!
//! A [`Tree`] owns every node of an image in an arena; nodes refer to each
//! other through [`NodeId`] handles. Directory children are the owning edges,
//! parent links and resolved hard links are plain handles that never affect
//! ownership.
//!
//! # Example
//!
//! ```rust
//! use sqimage::fstree::{Metadata, NodeKind, Tree};
//!
//! let mut tree = Tree::new();
//! let a = tree.add_file("a", Metadata::with_permissions(0o644), None).unwrap();
//! tree.add_hard_link("b", "a").unwrap();
//! tree.add_hard_link("c", "/b").unwrap();
//! tree.resolve_hard_links().unwrap();
//!
//! let c = tree.lookup("c").unwrap();
//! assert_eq!(tree.node(c).kind(), &NodeKind::HardLinkResolved { target: a });
//! assert_eq!(tree.node(a).link_count(), 2);
//! ```

mod defaults;
pub mod hardlink;
mod node;

pub use defaults::{SOURCE_DATE_EPOCH, TreeDefaults};
pub use hardlink::resolve_hard_links;
pub use node::{FileType, Metadata, Node, NodeId, NodeKind, mode};

use std::path::PathBuf;

use crate::path::{canonicalize, split_last};
use crate::{Error, Result};

const ROOT: NodeId = NodeId(0);

/// An image tree rooted at a single directory.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    defaults: TreeDefaults,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates an empty tree using [`TreeDefaults::default`].
    pub fn new() -> Self {
        Self::with_defaults(TreeDefaults::default())
    }

    /// Creates an empty tree whose root and implicit directories use `defaults`.
    pub fn with_defaults(defaults: TreeDefaults) -> Self {
        let root = Node::new(
            String::new(),
            None,
            defaults.metadata(),
            NodeKind::Directory {
                children: Vec::new(),
            },
        );
        Self {
            nodes: vec![root],
            defaults,
        }
    }

    /// Returns the defaults this tree was created with.
    pub fn defaults(&self) -> &TreeDefaults {
        &self.defaults
    }

    /// Returns the root directory.
    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Returns the number of nodes, including the root.
    ///
    /// A fresh tree has a length of 1 and is still [empty](Self::is_empty).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the root directory has no children.
    ///
    /// This is the case exactly when [`len`](Self::len) is 1.
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT.0].children().is_empty()
    }

    /// Returns the node behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the node behind a handle, or `None` for a foreign handle.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Looks up the node at `path`.
    ///
    /// The path is canonicalized first; the empty path and `/` name the root.
    /// Hard links are not followed.
    pub fn lookup(&self, path: &str) -> Result<NodeId> {
        let canonical = canonicalize(path).map_err(|e| invalid_path(path, e))?;
        self.find(&canonical).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })
    }

    /// Walks a canonical path from the root.
    pub(crate) fn find(&self, canonical: &str) -> Option<NodeId> {
        let mut current = ROOT;
        for segment in canonical.split('/').filter(|s| !s.is_empty()) {
            current = self.child(current, segment)?;
        }
        Some(current)
    }

    fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[dir.0]
            .children()
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].name == name)
    }

    /// Reconstructs the absolute path of a node by walking its parents.
    ///
    /// Intended for diagnostics; the root is `/`.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.map(|c| &self.nodes[c.0]) {
            if node.parent.is_some() {
                segments.push(node.name.as_str());
            }
            current = node.parent;
        }

        if segments.is_empty() {
            return "/".to_string();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    /// Inserts a new entry.
    ///
    /// Missing intermediate directories are created with the tree defaults.
    /// `extra` is the link target for [`FileType::Symlink`] (required) and the
    /// input file for [`FileType::Regular`] (optional); it is ignored for
    /// every other type. Device numbers are taken from [`Metadata::rdev`].
    ///
    /// Inserting a directory where an implicitly created directory already
    /// exists adopts that directory and applies `meta` to it.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPath`] if `path` cannot be canonicalized, names the
    ///   root, or passes through an entry that is not a directory
    /// - [`Error::InvalidArgument`] if a symlink target is missing or malformed
    /// - [`Error::AlreadyExists`] if an entry with that name exists
    ///
    /// A failed insertion leaves the tree unchanged.
    pub fn insert(
        &mut self,
        path: &str,
        file_type: FileType,
        meta: Metadata,
        extra: Option<&str>,
    ) -> Result<NodeId> {
        let kind = match file_type {
            FileType::Regular => NodeKind::Regular {
                input_file: extra.map(PathBuf::from),
            },
            FileType::Directory => NodeKind::Directory {
                children: Vec::new(),
            },
            FileType::Symlink => NodeKind::Symlink {
                target: symlink_target(path, extra)?,
            },
            FileType::CharDevice => NodeKind::CharDevice { devno: meta.rdev },
            FileType::BlockDevice => NodeKind::BlockDevice { devno: meta.rdev },
            FileType::Fifo => NodeKind::Fifo,
            FileType::Socket => NodeKind::Socket,
        };
        self.insert_node(path, meta, kind)
    }

    fn insert_node(&mut self, path: &str, meta: Metadata, kind: NodeKind) -> Result<NodeId> {
        let canonical = canonicalize(path).map_err(|e| invalid_path(path, e))?;
        let Some((parent_path, name)) = split_last(&canonical) else {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "cannot insert the root directory".into(),
            });
        };

        let parent = self.make_parents(path, parent_path)?;

        if let Some(existing) = self.child(parent, name) {
            let node = &mut self.nodes[existing.0];
            if node.implicit && matches!(kind, NodeKind::Directory { .. }) {
                node.meta = meta;
                node.implicit = false;
                return Ok(existing);
            }
            return Err(Error::AlreadyExists {
                path: self.path_of(existing),
            });
        }

        Ok(self.push_child(parent, name.to_string(), meta, kind))
    }

    /// Resolves the directory `parent_path`, creating missing directories.
    fn make_parents(&mut self, path: &str, parent_path: &str) -> Result<NodeId> {
        let mut current = ROOT;
        for segment in parent_path.split('/').filter(|s| !s.is_empty()) {
            current = match self.child(current, segment) {
                Some(id) if self.nodes[id.0].is_dir() => id,
                Some(id) => {
                    return Err(Error::InvalidPath {
                        path: path.to_string(),
                        reason: format!("{} is not a directory", self.path_of(id)),
                    });
                }
                None => {
                    let meta = self.defaults.metadata();
                    let dir = NodeKind::Directory {
                        children: Vec::new(),
                    };
                    let id = self.push_child(current, segment.to_string(), meta, dir);
                    self.nodes[id.0].implicit = true;
                    id
                }
            };
        }
        Ok(current)
    }

    fn push_child(&mut self, parent: NodeId, name: String, meta: Metadata, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name, Some(parent), meta, kind));
        if let NodeKind::Directory { children } = &mut self.nodes[parent.0].kind {
            children.push(id);
        }
        id
    }

    /// Inserts a regular file, optionally naming where its content comes from.
    pub fn add_file(&mut self, path: &str, meta: Metadata, input_file: Option<&str>) -> Result<NodeId> {
        self.insert(path, FileType::Regular, meta, input_file)
    }

    /// Inserts a directory.
    pub fn add_directory(&mut self, path: &str, meta: Metadata) -> Result<NodeId> {
        self.insert(path, FileType::Directory, meta, None)
    }

    /// Inserts a symbolic link.
    pub fn add_symlink(&mut self, path: &str, target: &str, meta: Metadata) -> Result<NodeId> {
        self.insert(path, FileType::Symlink, meta, Some(target))
    }

    /// Inserts a character or block device.
    pub fn add_device(&mut self, path: &str, block: bool, devno: u64, meta: Metadata) -> Result<NodeId> {
        let file_type = if block {
            FileType::BlockDevice
        } else {
            FileType::CharDevice
        };
        self.insert(path, file_type, meta.rdev(devno), None)
    }

    /// Inserts a hard link placeholder pointing at `target`.
    ///
    /// The target is canonicalized and stored; it is looked up only when
    /// [`resolve_hard_links`](Self::resolve_hard_links) runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `target` cannot be canonicalized,
    /// plus every error [`insert`](Self::insert) can return for `path`.
    pub fn add_hard_link(&mut self, path: &str, target: &str) -> Result<NodeId> {
        let target = canonicalize(target)?;
        let meta = Metadata::with_permissions(0o777);
        self.insert_node(path, meta, NodeKind::HardLinkPending { target })
    }

    /// Runs the hard link resolution pass. See [`resolve_hard_links`].
    pub fn resolve_hard_links(&mut self) -> Result<usize> {
        resolve_hard_links(self)
    }

    /// Returns a depth-first, pre-order iterator over all nodes.
    ///
    /// Children are visited in their current order, insertion order unless
    /// [`sort`](Self::sort) was called.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![ROOT],
        }
    }

    /// Sorts the children of every directory by name.
    pub fn sort(&mut self) {
        for index in 0..self.nodes.len() {
            let mut children = match &mut self.nodes[index].kind {
                NodeKind::Directory { children } => std::mem::take(children),
                _ => continue,
            };
            children.sort_unstable_by(|a, b| self.nodes[a.0].name.cmp(&self.nodes[b.0].name));
            if let NodeKind::Directory { children: slot } = &mut self.nodes[index].kind {
                *slot = children;
            }
        }
    }
}

/// Depth-first iterator returned by [`Tree::walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Walk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.node(id).children().iter().rev().copied());
        Some(id)
    }
}

fn invalid_path(path: &str, err: Error) -> Error {
    let reason = match err {
        Error::InvalidArgument(reason) => reason,
        other => other.to_string(),
    };
    Error::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

fn symlink_target(path: &str, target: Option<&str>) -> Result<String> {
    match target {
        None | Some("") => Err(Error::InvalidArgument(format!(
            "{}: symbolic link needs a target",
            path
        ))),
        Some(t) if t.contains('\0') => Err(Error::InvalidArgument(format!(
            "{}: symbolic link target contains NUL byte",
            path
        ))),
        Some(t) => Ok(t.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_meta() -> Metadata {
        Metadata::with_permissions(0o644).owner(1000, 1000).mtime(1234)
    }

    #[test]
    fn test_new_tree_has_root() {
        let mut tree = Tree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert!(tree.node(tree.root()).is_dir());

        tree.add_directory("etc", Metadata::default()).unwrap();
        assert_eq!(tree.len(), 2);
        assert!(!tree.is_empty());
        assert_eq!(tree.path_of(tree.root()), "/");
        assert_eq!(tree.lookup("/").unwrap(), tree.root());
        assert_eq!(tree.lookup("").unwrap(), tree.root());
    }

    #[test]
    fn test_insert_creates_implicit_parents() {
        let defaults = TreeDefaults::new().owner(7, 8).mode(0o750).mtime(99);
        let mut tree = Tree::with_defaults(defaults);
        let id = tree.add_file("usr/lib/libc.so", file_meta(), None).unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.path_of(id), "/usr/lib/libc.so");

        let lib = tree.lookup("usr/lib").unwrap();
        let node = tree.node(lib);
        assert!(node.is_dir());
        assert!(node.is_implicit());
        assert_eq!(node.metadata(), &defaults.metadata());
        assert_eq!(node.parent(), Some(tree.lookup("usr").unwrap()));
    }

    #[test]
    fn test_explicit_directory_adopts_implicit_one() {
        let mut tree = Tree::new();
        tree.add_file("etc/passwd", file_meta(), None).unwrap();
        let implicit = tree.lookup("etc").unwrap();

        let meta = Metadata::with_permissions(0o700).owner(0, 0);
        let explicit = tree.add_directory("etc", meta).unwrap();

        assert_eq!(explicit, implicit);
        assert!(!tree.node(explicit).is_implicit());
        assert_eq!(tree.node(explicit).metadata().permissions, 0o700);

        let err = tree.add_directory("etc", meta).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { ref path } if path == "/etc"));
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let mut tree = Tree::new();
        tree.add_file("a", file_meta(), None).unwrap();
        let err = tree.add_file("/a", file_meta(), None).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_insert_through_file_fails() {
        let mut tree = Tree::new();
        tree.add_file("a", file_meta(), None).unwrap();
        let err = tree.add_file("a/b", file_meta(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert!(err.to_string().contains("/a is not a directory"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_insert_rejects_bad_paths() {
        let mut tree = Tree::new();
        for path in ["", "/", "a/../b", "./a", "a\0b"] {
            let err = tree.add_file(path, file_meta(), None).unwrap_err();
            assert!(matches!(err, Error::InvalidPath { .. }), "path {:?}", path);
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn test_insert_every_type() {
        let mut tree = Tree::new();
        let meta = file_meta();
        tree.add_file("file", meta, Some("/src/file")).unwrap();
        tree.add_directory("dir", meta).unwrap();
        tree.add_symlink("link", "../elsewhere", meta).unwrap();
        tree.add_device("null", false, 0x0103, meta).unwrap();
        tree.add_device("sda", true, 0x0800, meta).unwrap();
        tree.insert("fifo", FileType::Fifo, meta, None).unwrap();
        tree.insert("sock", FileType::Socket, meta, None).unwrap();

        let kind = |p: &str| tree.node(tree.lookup(p).unwrap()).kind().clone();
        assert_eq!(
            kind("file"),
            NodeKind::Regular {
                input_file: Some(PathBuf::from("/src/file"))
            }
        );
        assert_eq!(
            kind("link"),
            NodeKind::Symlink {
                target: "../elsewhere".into()
            }
        );
        assert_eq!(kind("null"), NodeKind::CharDevice { devno: 0x0103 });
        assert_eq!(kind("sda"), NodeKind::BlockDevice { devno: 0x0800 });
        assert_eq!(kind("fifo"), NodeKind::Fifo);
        assert_eq!(kind("sock"), NodeKind::Socket);
        assert_eq!(
            tree.node(tree.lookup("sda").unwrap()).mode(),
            mode::S_IFBLK | 0o644
        );
    }

    #[test]
    fn test_symlink_requires_target() {
        let mut tree = Tree::new();
        let err = tree
            .insert("link", FileType::Symlink, file_meta(), None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(tree.add_symlink("link", "", file_meta()).is_err());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_add_hard_link_canonicalizes_target() {
        let mut tree = Tree::new();
        let id = tree.add_hard_link("b", "//a///x/").unwrap();
        assert_eq!(
            tree.node(id).kind(),
            &NodeKind::HardLinkPending {
                target: "a/x".into()
            }
        );
        assert_eq!(tree.node(id).mode(), mode::S_IFLNK | 0o777);
    }

    #[test]
    fn test_add_hard_link_rejects_bad_target() {
        let mut tree = Tree::new();
        let err = tree.add_hard_link("b", "a/../c").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(tree.lookup("b").is_err());
    }

    #[test]
    fn test_lookup_missing() {
        let mut tree = Tree::new();
        tree.add_file("a", file_meta(), None).unwrap();
        assert!(tree.lookup("b").unwrap_err().is_not_found());
        assert!(tree.lookup("a/b").unwrap_err().is_not_found());
    }

    #[test]
    fn test_walk_preorder_insertion_order() {
        let mut tree = Tree::new();
        tree.add_file("b/2", file_meta(), None).unwrap();
        tree.add_file("a", file_meta(), None).unwrap();
        tree.add_file("b/1", file_meta(), None).unwrap();

        let paths: Vec<_> = tree.walk().map(|id| tree.path_of(id)).collect();
        assert_eq!(paths, vec!["/", "/b", "/b/2", "/b/1", "/a"]);
    }

    #[test]
    fn test_sort_orders_children_by_name() {
        let mut tree = Tree::new();
        tree.add_file("b/2", file_meta(), None).unwrap();
        tree.add_file("a", file_meta(), None).unwrap();
        tree.add_file("b/1", file_meta(), None).unwrap();
        tree.sort();

        let paths: Vec<_> = tree.walk().map(|id| tree.path_of(id)).collect();
        assert_eq!(paths, vec!["/", "/a", "/b", "/b/1", "/b/2"]);
    }
}
