//! Tree node types.

use std::fmt;
use std::path::PathBuf;

/// File type bits of a POSIX `st_mode`.
pub mod mode {
    /// Mask selecting the file type bits.
    pub const S_IFMT: u32 = 0o170000;
    /// Socket.
    pub const S_IFSOCK: u32 = 0o140000;
    /// Symbolic link.
    pub const S_IFLNK: u32 = 0o120000;
    /// Regular file.
    pub const S_IFREG: u32 = 0o100000;
    /// Block device.
    pub const S_IFBLK: u32 = 0o060000;
    /// Directory.
    pub const S_IFDIR: u32 = 0o040000;
    /// Character device.
    pub const S_IFCHR: u32 = 0o020000;
    /// Named pipe.
    pub const S_IFIFO: u32 = 0o010000;
    /// Mask selecting the permission bits (including setuid/setgid/sticky).
    pub const PERM_MASK: u32 = 0o7777;
}

/// Handle of a node inside a [`Tree`](super::Tree).
///
/// Handles are only meaningful for the tree that issued them. They stay valid
/// for the lifetime of that tree since nodes are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the position of the node in creation order (the root is 0).
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of entry a caller can insert into a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
}

impl FileType {
    /// Returns the `S_IFxxx` bits for this type.
    pub fn mode_bits(self) -> u32 {
        match self {
            Self::Regular => mode::S_IFREG,
            Self::Directory => mode::S_IFDIR,
            Self::Symlink => mode::S_IFLNK,
            Self::CharDevice => mode::S_IFCHR,
            Self::BlockDevice => mode::S_IFBLK,
            Self::Fifo => mode::S_IFIFO,
            Self::Socket => mode::S_IFSOCK,
        }
    }

    /// Classifies a POSIX `st_mode`.
    pub fn from_mode(st_mode: u32) -> Option<Self> {
        match st_mode & mode::S_IFMT {
            mode::S_IFREG => Some(Self::Regular),
            mode::S_IFDIR => Some(Self::Directory),
            mode::S_IFLNK => Some(Self::Symlink),
            mode::S_IFCHR => Some(Self::CharDevice),
            mode::S_IFBLK => Some(Self::BlockDevice),
            mode::S_IFIFO => Some(Self::Fifo),
            mode::S_IFSOCK => Some(Self::Socket),
            _ => None,
        }
    }
}

/// Per-entry metadata that is opaque to the tree itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Owner user ID.
    pub uid: u32,
    /// Owner group ID.
    pub gid: u32,
    /// Permission bits (`0o7777` mask).
    pub permissions: u16,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: i64,
    /// Device number, used by character and block devices.
    pub rdev: u64,
}

impl Metadata {
    /// Creates metadata with the given permissions and everything else zero.
    pub fn with_permissions(permissions: u16) -> Self {
        Self {
            permissions: permissions & mode::PERM_MASK as u16,
            ..Self::default()
        }
    }

    /// Sets the owner.
    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Sets the modification time.
    pub fn mtime(mut self, mtime: i64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Sets the device number.
    pub fn rdev(mut self, rdev: u64) -> Self {
        self.rdev = rdev;
        self
    }
}

/// Variant payload of a node.
///
/// Directory children are the owning edges of the tree. A resolved hard link
/// only refers to its target by handle; it does not own it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Regular file, optionally naming the file its content is read from.
    Regular {
        /// Where the file data comes from, if known.
        input_file: Option<PathBuf>,
    },
    /// Directory with its children in insertion order.
    Directory {
        /// Child nodes.
        children: Vec<NodeId>,
    },
    /// Symbolic link.
    Symlink {
        /// Link target, stored verbatim.
        target: String,
    },
    /// Character device.
    CharDevice {
        /// Device number.
        devno: u64,
    },
    /// Block device.
    BlockDevice {
        /// Device number.
        devno: u64,
    },
    /// Named pipe.
    Fifo,
    /// Unix domain socket.
    Socket,
    /// Hard link that has not been resolved yet.
    HardLinkPending {
        /// Canonical path of the link target.
        target: String,
    },
    /// Hard link resolved to a concrete entry.
    HardLinkResolved {
        /// The terminal target; never another hard link.
        target: NodeId,
    },
}

impl NodeKind {
    /// Returns the insertable file type of this node, if it is not a hard link.
    pub fn file_type(&self) -> Option<FileType> {
        match self {
            Self::Regular { .. } => Some(FileType::Regular),
            Self::Directory { .. } => Some(FileType::Directory),
            Self::Symlink { .. } => Some(FileType::Symlink),
            Self::CharDevice { .. } => Some(FileType::CharDevice),
            Self::BlockDevice { .. } => Some(FileType::BlockDevice),
            Self::Fifo => Some(FileType::Fifo),
            Self::Socket => Some(FileType::Socket),
            Self::HardLinkPending { .. } | Self::HardLinkResolved { .. } => None,
        }
    }
}

/// A single entry of the image tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) meta: Metadata,
    pub(crate) link_count: u32,
    pub(crate) implicit: bool,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(name: String, parent: Option<NodeId>, meta: Metadata, kind: NodeKind) -> Self {
        Self {
            name,
            parent,
            meta,
            link_count: 0,
            implicit: false,
            kind,
        }
    }

    /// Returns the name of this entry (empty for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the directory that owns this entry; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the entry metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    /// Returns the variant payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns how many hard links have been resolved to this entry.
    pub fn link_count(&self) -> u32 {
        self.link_count
    }

    /// Returns true for directories created on the way to a deeper entry.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    /// Returns true if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// Returns the children of a directory, or an empty slice.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            _ => &[],
        }
    }

    /// Returns the terminal target of a resolved hard link.
    pub fn link_target(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::HardLinkResolved { target } => Some(target),
            _ => None,
        }
    }

    /// Reconstructs a POSIX `st_mode` for this entry.
    ///
    /// Hard links report `S_IFLNK | 0777` since they have no type of their own.
    pub fn mode(&self) -> u32 {
        match self.kind.file_type() {
            Some(ft) => ft.mode_bits() | (u32::from(self.meta.permissions) & mode::PERM_MASK),
            None => mode::S_IFLNK | 0o777,
        }
    }
}
