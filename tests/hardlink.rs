//! Integration tests for image tree construction and hard link resolution.

use sqimage::fstree::{FileType, Metadata, NodeKind, Tree, TreeDefaults, mode};
use sqimage::Error;

fn file(tree: &mut Tree, path: &str) -> sqimage::NodeId {
    tree.add_file(path, Metadata::with_permissions(0o644), None)
        .unwrap()
}

#[test]
fn test_chain_resolves_to_terminal() {
    let mut tree = Tree::new();
    let a = file(&mut tree, "/a");
    tree.add_hard_link("/b", "/a").unwrap();
    tree.add_hard_link("/c", "/b").unwrap();

    assert_eq!(tree.resolve_hard_links().unwrap(), 2);

    let b = tree.lookup("/b").unwrap();
    let c = tree.lookup("/c").unwrap();
    assert_eq!(tree.node(b).kind(), &NodeKind::HardLinkResolved { target: a });
    assert_eq!(tree.node(c).kind(), &NodeKind::HardLinkResolved { target: a });
    assert_eq!(tree.node(a).link_count(), 2);
}

#[test]
fn test_self_link_reports_path() {
    let mut tree = Tree::new();
    tree.add_hard_link("/x", "/x").unwrap();

    let err = tree.resolve_hard_links().unwrap_err();
    assert!(matches!(err.root_cause(), Error::CycleDetected));
    match &err {
        Error::HardLink { path, target, .. } => {
            assert_eq!(path, "/x");
            assert_eq!(target, "/x");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("'/x' -> '/x'"));
    assert!(err.to_string().contains("too many links"));
}

#[test]
fn test_two_node_cycle() {
    let mut tree = Tree::new();
    tree.add_hard_link("p", "q").unwrap();
    tree.add_hard_link("q", "p").unwrap();

    let err = tree.resolve_hard_links().unwrap_err();
    assert!(matches!(err.root_cause(), Error::CycleDetected));
}

#[test]
fn test_cycle_does_not_touch_other_branches() {
    let mut tree = Tree::new();
    let target = file(&mut tree, "good/target");
    let link = tree.add_hard_link("good/link", "good/target").unwrap();
    tree.add_hard_link("zbad/loop", "zbad/loop").unwrap();

    assert!(tree.resolve_hard_links().is_err());
    assert_eq!(tree.node(link).link_target(), Some(target));
    assert_eq!(tree.node(target).link_count(), 1);
}

#[test]
fn test_directory_target_unchanged() {
    let mut tree = Tree::new();
    let dir = tree
        .add_directory("etc", Metadata::with_permissions(0o755))
        .unwrap();
    tree.add_hard_link("etc-link", "etc").unwrap();

    let err = tree.resolve_hard_links().unwrap_err();
    assert!(matches!(err.root_cause(), Error::NotPermitted));
    assert!(err.is_link_error());
    assert_eq!(tree.node(dir).link_count(), 0);
    assert_eq!(tree.node(dir).mode(), mode::S_IFDIR | 0o755);
}

#[test]
fn test_long_chain() {
    let mut tree = Tree::new();
    let target = file(&mut tree, "links/0");
    for i in 1..=100 {
        tree.add_hard_link(&format!("links/{i}"), &format!("links/{}", i - 1))
            .unwrap();
    }

    assert_eq!(tree.resolve_hard_links().unwrap(), 100);
    for i in 1..=100 {
        let id = tree.lookup(&format!("links/{i}")).unwrap();
        assert_eq!(tree.node(id).link_target(), Some(target));
    }
    assert_eq!(tree.node(target).link_count(), 100);
}

#[test]
fn test_link_to_device_and_symlink() {
    let mut tree = Tree::new();
    let dev = tree
        .add_device("dev/null", false, 0x0103, Metadata::with_permissions(0o666))
        .unwrap();
    let sym = tree
        .add_symlink("bin/sh", "busybox", Metadata::with_permissions(0o777))
        .unwrap();
    tree.add_hard_link("dev/null2", "dev/null").unwrap();
    tree.add_hard_link("bin/sh2", "bin/sh").unwrap();

    tree.resolve_hard_links().unwrap();
    assert_eq!(tree.node(dev).link_count(), 1);
    assert_eq!(tree.node(sym).link_count(), 1);
    assert_eq!(tree.node(dev).kind(), &NodeKind::CharDevice { devno: 0x0103 });
}

#[test]
fn test_insert_and_lookup() {
    let defaults = TreeDefaults::new().owner(0, 0).mode(0o700).mtime(42);
    let mut tree = Tree::with_defaults(defaults);
    let conf = tree
        .insert(
            "/etc//ssh/sshd_config",
            FileType::Regular,
            Metadata::with_permissions(0o600),
            Some("rootfs/etc/ssh/sshd_config"),
        )
        .unwrap();

    assert_eq!(tree.lookup("etc/ssh/sshd_config").unwrap(), conf);
    assert_eq!(tree.path_of(conf), "/etc/ssh/sshd_config");

    let etc = tree.lookup("/etc").unwrap();
    assert!(tree.node(etc).is_implicit());
    assert_eq!(tree.node(etc).metadata().permissions, 0o700);
    assert_eq!(tree.node(etc).metadata().mtime, 42);

    assert!(matches!(
        tree.insert("etc/ssh/sshd_config", FileType::Fifo, Metadata::default(), None),
        Err(Error::AlreadyExists { .. })
    ));
    assert!(matches!(
        tree.insert("etc/ssh/sshd_config/x", FileType::Fifo, Metadata::default(), None),
        Err(Error::InvalidPath { .. })
    ));
    assert!(matches!(
        tree.insert("etc/../passwd", FileType::Fifo, Metadata::default(), None),
        Err(Error::InvalidPath { .. })
    ));
    assert!(tree.lookup("etc/missing").unwrap_err().is_not_found());
}

#[test]
fn test_hard_link_target_must_be_canonicalizable() {
    let mut tree = Tree::new();
    assert!(matches!(
        tree.add_hard_link("link", "../outside"),
        Err(Error::InvalidArgument(_))
    ));
    assert!(tree.lookup("link").is_err());
}

#[test]
fn test_sorted_walk() {
    let mut tree = Tree::new();
    for path in ["usr/lib/b", "usr/bin/z", "usr/bin/a", "etc/hosts"] {
        file(&mut tree, path);
    }
    tree.sort();

    let paths: Vec<String> = tree.walk().map(|id| tree.path_of(id)).collect();
    assert_eq!(
        paths,
        [
            "/",
            "/etc",
            "/etc/hosts",
            "/usr",
            "/usr/bin",
            "/usr/bin/a",
            "/usr/bin/z",
            "/usr/lib",
            "/usr/lib/b",
        ]
    );
    assert_eq!(tree.len(), 9);
}
