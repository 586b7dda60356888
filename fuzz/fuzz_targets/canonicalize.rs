//! Fuzz target for path canonicalization and tree insertion.
//!
//! Run with: cargo +nightly fuzz run canonicalize
//!
//! Properties checked:
//! - Canonical output never has empty, `.` or `..` segments
//! - Canonicalization is idempotent
//! - Inserting an accepted path makes it reachable through lookup

#![no_main]

use libfuzzer_sys::fuzz_target;
use sqimage::fstree::{Metadata, Tree};
use sqimage::path::canonicalize;

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(canonical) = canonicalize(path) else {
        return;
    };

    assert!(
        canonical
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
            || canonical.is_empty(),
        "bad canonical form {:?} for {:?}",
        canonical,
        path
    );
    assert_eq!(canonicalize(&canonical).ok().as_deref(), Some(canonical.as_str()));

    if !canonical.is_empty() {
        let mut tree = Tree::new();
        let id = tree
            .add_file(path, Metadata::default(), None)
            .expect("canonical path must insert into an empty tree");
        assert_eq!(tree.lookup(&canonical).ok(), Some(id));
        assert_eq!(tree.path_of(id), format!("/{}", canonical));
    }
});
