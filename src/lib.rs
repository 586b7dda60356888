//! # sqimage
//!
//! Building blocks for squashfs image packers: an in-memory filesystem tree
//! with hard-link resolution, and buffered byte streams with transparent
//! compression.
//!
//! ## Image Tree
//!
//! A [`Tree`](fstree::Tree) is populated entry by entry from a directory
//! listing, a description file or an archive. Intermediate directories are
//! created on the fly. Hard links are recorded by target path and resolved in
//! a single pass once every entry is present, so a link may name a target
//! that is inserted after it.
//!
//! ```rust
//! use sqimage::fstree::{Metadata, Tree, TreeDefaults};
//! use sqimage::Result;
//!
//! fn main() -> Result<()> {
//!     let mut tree = Tree::with_defaults(TreeDefaults::new().mode(0o755));
//!
//!     tree.add_file("usr/bin/busybox", Metadata::with_permissions(0o755), None)?;
//!     tree.add_hard_link("bin/sh", "usr/bin/busybox")?;
//!     tree.add_symlink("bin/ls", "../usr/bin/busybox", Metadata::with_permissions(0o777))?;
//!     tree.resolve_hard_links()?;
//!     tree.sort();
//!
//!     for id in tree.walk() {
//!         println!("{:o} {}", tree.node(id).mode(), tree.path_of(id));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Streams
//!
//! Readable streams implement [`ByteSource`](io::ByteSource) and writable
//! ones [`ByteSink`](io::ByteSink). Compression is a decorator: wrap a source
//! in a [`TransformSource`](io::TransformSource) to read decompressed data, or
//! a sink in a [`TransformSink`](io::TransformSink) to write compressed data.
//!
//! ```rust,no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use sqimage::io::{open_compressed_source, open_file_source, ByteSource, SharedSource};
//! use sqimage::Result;
//!
//! fn main() -> Result<()> {
//!     let file: SharedSource = Rc::new(RefCell::new(open_file_source("rootfs.tar.zst")?));
//!     let source = open_compressed_source(file)?;
//!
//!     let mut data = Vec::new();
//!     source.borrow_mut().read_to_end(&mut data)?;
//!     println!("{} bytes", data.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `gzip` | Yes | gzip codec via `flate2` |
//! | `bzip2` | Yes | bzip2 codec |
//! | `zstd` | Yes | Zstandard codec |
//!
//! xz data is recognized by [`codec::detect_method`] but has no codec.
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger itself.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod codec;
pub mod error;
pub mod fstree;
pub mod io;
pub mod path;

pub use error::{Error, Result};
pub use fstree::{FileType, Metadata, Node, NodeId, NodeKind, Tree, TreeDefaults};
pub use io::{ByteSink, ByteSource, ReadStatus, TransformSink, TransformSource};
