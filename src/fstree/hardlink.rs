//! Hard link resolution.
//!
//! Hard links are inserted as [`NodeKind::HardLinkPending`] placeholders that
//! only store a target path. Once the tree is fully populated,
//! [`resolve_hard_links`] walks it once and rewrites every placeholder into a
//! [`NodeKind::HardLinkResolved`] that refers directly to the concrete entry
//! at the end of its chain.
//!
//! A link may point at another link. Chains are followed until a concrete
//! entry is reached; links that were already resolved short-circuit to their
//! target, so every chain is walked at most once past its resolved prefix.

use std::collections::HashSet;

use super::{NodeId, NodeKind, Tree};
use crate::{Error, Result};

/// Resolves every pending hard link in `tree`.
///
/// The tree is traversed depth-first in child order. The first failure aborts
/// the pass and is returned as [`Error::HardLink`] carrying the full path of
/// the offending link, its stored target and the cause:
///
/// - [`Error::NotFound`] if a target path does not exist
/// - [`Error::CycleDetected`] if a chain revisits an entry
/// - [`Error::NotPermitted`] if the chain ends at a directory
/// - [`Error::TooManyLinks`] if the target's link count is saturated
///
/// Links resolved before the failure stay resolved.
///
/// Returns the number of links resolved.
pub fn resolve_hard_links(tree: &mut Tree) -> Result<usize> {
    let mut resolved = 0;
    let mut stack = vec![tree.root()];

    while let Some(id) = stack.pop() {
        let target = match &tree.node(id).kind {
            NodeKind::HardLinkPending { target } => target.clone(),
            NodeKind::Directory { children } => {
                stack.extend(children.iter().rev().copied());
                continue;
            }
            _ => continue,
        };

        if let Err(source) = resolve_link(tree, id) {
            return Err(Error::HardLink {
                path: tree.path_of(id),
                target: format!("/{target}"),
                source: Box::new(source),
            });
        }
        resolved += 1;
    }

    log::debug!("resolved {} hard link(s)", resolved);
    Ok(resolved)
}

/// Follows the chain starting at `start` and rewrites `start` to point at the
/// concrete entry it ends at.
fn resolve_link(tree: &mut Tree, start: NodeId) -> Result<()> {
    let mut visited = HashSet::from([start]);
    let mut current = start;

    loop {
        let next = match &tree.node(current).kind {
            NodeKind::HardLinkResolved { target } => *target,
            NodeKind::HardLinkPending { target } => {
                tree.find(target).ok_or_else(|| Error::NotFound {
                    path: format!("/{}", target),
                })?
            }
            _ => break,
        };

        if !visited.insert(next) {
            return Err(Error::CycleDetected);
        }
        current = next;
    }

    let target = tree.node_mut(current);
    if target.is_dir() {
        return Err(Error::NotPermitted);
    }
    if target.link_count == u32::MAX {
        return Err(Error::TooManyLinks);
    }
    target.link_count += 1;

    tree.node_mut(start).kind = NodeKind::HardLinkResolved { target: current };
    log::trace!(
        "hard link {} -> {}",
        tree.path_of(start),
        tree.path_of(current)
    );
    Ok(())
}
