//! Keyed children diff.
//!
//! Reconciles two sibling lists with the fewest host moves:
//!
//! 1. Patch the common prefix, then the common suffix.
//! 2. If only new nodes remain, mount them before the first node of the
//!    suffix. If only old nodes remain, unmount them.
//! 3. Otherwise map new keys to positions, patch each surviving old node
//!    into its counterpart and unmount the rest. Survivors whose old
//!    positions form the longest increasing subsequence stay put; the
//!    others are moved, and nodes with no old counterpart are mounted,
//!    walking the window back to front so every anchor is already placed.
//!
//! Unkeyed children pair with the first unmatched unkeyed new sibling of
//! the same type.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::host::{HostAdapter, HostId};
use super::renderer::RendererInner;
use super::sequence::longest_increasing_subsequence;
use super::vnode::{Key, VNode};
use crate::error::{Result, SprigError};

/// Fails with [`SprigError::DuplicateKey`] if two siblings share a key.
pub(crate) fn check_unique_keys(children: &[VNode]) -> Result<()> {
    let mut seen = HashSet::new();
    for key in children.iter().filter_map(VNode::key_ref) {
        if !seen.insert(key) {
            return Err(SprigError::DuplicateKey {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Check every child list in `vnode`'s tree for duplicate keys. Component
/// subtrees are checked when their own render produces them.
pub(crate) fn validate_keys(vnode: &VNode) -> Result<()> {
    let children = vnode.child_nodes();
    check_unique_keys(children)?;
    children.iter().try_for_each(validate_keys)
}

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn patch_keyed_children(
        self: &Rc<Self>,
        c1: &[VNode],
        c2: &[VNode],
        container: HostId,
        parent_anchor: Option<HostId>,
    ) -> Result<()> {
        check_unique_keys(c2)?;

        let mut i = 0;
        let mut e1 = c1.len();
        let mut e2 = c2.len();

        while i < e1 && i < e2 && c1[i].is_same_node(&c2[i]) {
            self.patch(Some(&c1[i]), &c2[i], container, None)?;
            i += 1;
        }

        while i < e1 && i < e2 && c1[e1 - 1].is_same_node(&c2[e2 - 1]) {
            self.patch(Some(&c1[e1 - 1]), &c2[e2 - 1], container, None)?;
            e1 -= 1;
            e2 -= 1;
        }

        if i >= e1 {
            let anchor = self.anchor_after(c2, e2, parent_anchor);
            for node in &c2[i..e2] {
                self.patch(None, node, container, anchor)?;
            }
            return Ok(());
        }

        if i >= e2 {
            for node in &c1[i..e1] {
                self.unmount(node, true);
            }
            return Ok(());
        }

        self.patch_unknown_window(&c1[..e1], &c2[..e2], i, c2, container, parent_anchor)
    }

    /// The window `c1[start..]` vs `c2[start..]` where neither end matched.
    /// `all_new` is the full new list, for anchors past the window.
    fn patch_unknown_window(
        self: &Rc<Self>,
        c1: &[VNode],
        c2: &[VNode],
        start: usize,
        all_new: &[VNode],
        container: HostId,
        parent_anchor: Option<HostId>,
    ) -> Result<()> {
        let key_to_new: HashMap<&Key, usize> = c2
            .iter()
            .enumerate()
            .skip(start)
            .filter_map(|(index, node)| node.key_ref().map(|key| (key, index)))
            .collect();

        let to_be_patched = c2.len() - start;
        let mut new_to_old = vec![0usize; to_be_patched];
        let mut patched = 0;
        let mut moved = false;
        let mut max_so_far = 0;

        for (old_index, prev) in c1.iter().enumerate().skip(start) {
            if patched >= to_be_patched {
                self.unmount(prev, true);
                continue;
            }

            let new_index = match prev.key_ref() {
                Some(key) => key_to_new
                    .get(key)
                    .copied()
                    .filter(|&j| prev.is_same_node(&c2[j])),
                None => (start..c2.len()).find(|&j| {
                    new_to_old[j - start] == 0
                        && c2[j].key_ref().is_none()
                        && prev.is_same_node(&c2[j])
                }),
            };

            match new_index {
                None => self.unmount(prev, true),
                Some(j) => {
                    new_to_old[j - start] = old_index + 1;
                    if j >= max_so_far {
                        max_so_far = j;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev), &c2[j], container, None)?;
                    patched += 1;
                }
            }
        }

        let stable = if moved {
            longest_increasing_subsequence(&new_to_old)
        } else {
            Vec::new()
        };
        let mut cursor = stable.len();

        for offset in (0..to_be_patched).rev() {
            let index = start + offset;
            let node = &c2[index];
            let anchor = self.anchor_after(all_new, index + 1, parent_anchor);

            if new_to_old[offset] == 0 {
                self.patch(None, node, container, anchor)?;
            } else if moved {
                if cursor > 0 && stable[cursor - 1] == offset {
                    cursor -= 1;
                } else {
                    self.move_node(node, container, anchor);
                }
            }
        }

        tracing::trace!(
            target: "sprig::render",
            window = to_be_patched,
            patched,
            moved,
            stable = stable.len(),
            "keyed window patched"
        );
        Ok(())
    }

    /// First host node of `nodes[index]`, or the parent's anchor past the end.
    fn anchor_after(
        &self,
        nodes: &[VNode],
        index: usize,
        parent_anchor: Option<HostId>,
    ) -> Option<HostId> {
        nodes
            .get(index)
            .and_then(|node| self.host_el(node))
            .or(parent_anchor)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
