//! Comment thread reconciliation.
//!
//! The tree is a recursive `Vec<Comment>` (newest first at every level). The
//! free functions take the tree by value and hand back the rewritten one:
//! only the path from the root to the touched node is rebuilt, every other
//! subtree is moved across untouched.

use tracing::debug;

use gavel_shared::{Comment, CommentId};

use super::echo::EchoSuppressor;
use super::Outcome;

/// Whether `id` appears anywhere in the tree.
pub fn contains(nodes: &[Comment], id: CommentId) -> bool {
    find(nodes, id).is_some()
}

pub fn find(nodes: &[Comment], id: CommentId) -> Option<&Comment> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find(&node.replies, id) {
            return Some(found);
        }
    }
    None
}

/// Whether any node of `comment`'s subtree, itself included, is already in
/// the tree.
pub fn overlaps(nodes: &[Comment], comment: &Comment) -> bool {
    contains(nodes, comment.id) || comment.replies.iter().any(|r| overlaps(nodes, r))
}

/// Number of nodes at every depth.
pub fn count(nodes: &[Comment]) -> usize {
    nodes.iter().map(|n| 1 + count(&n.replies)).sum()
}

/// Insert `comment` into the tree.
///
/// Any id of the incoming subtree already present: tree unchanged. Parent
/// found at any depth: prepended to that parent's replies. Otherwise
/// prepended to the roots.
pub fn insert(nodes: Vec<Comment>, comment: Comment) -> Vec<Comment> {
    if overlaps(&nodes, &comment) {
        return nodes;
    }
    match comment.parent_id {
        Some(parent) if contains(&nodes, parent) => {
            let mut slot = Some(comment);
            attach(nodes, parent, &mut slot)
        }
        _ => {
            let mut nodes = nodes;
            nodes.insert(0, comment);
            nodes
        }
    }
}

fn attach(nodes: Vec<Comment>, parent: CommentId, slot: &mut Option<Comment>) -> Vec<Comment> {
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        if slot.is_some() {
            if node.id == parent {
                if let Some(child) = slot.take() {
                    node.replies.insert(0, child);
                }
            } else if contains(&node.replies, parent) {
                let replies = std::mem::take(&mut node.replies);
                node.replies = attach(replies, parent, slot);
            }
        }
        out.push(node);
    }
    out
}

/// Remove the node with `id` and its whole subtree. Unknown ids leave the
/// tree unchanged.
pub fn remove(nodes: Vec<Comment>, id: CommentId) -> Vec<Comment> {
    nodes
        .into_iter()
        .filter(|node| node.id != id)
        .map(|mut node| {
            if contains(&node.replies, id) {
                let replies = std::mem::take(&mut node.replies);
                node.replies = remove(replies, id);
            }
            node
        })
        .collect()
}

/// Swap the node with `comment.id` for `comment`, keeping the existing
/// node's replies.
pub fn replace(nodes: Vec<Comment>, comment: Comment) -> Vec<Comment> {
    let mut slot = Some(comment);
    swap(nodes, &mut slot)
}

fn swap(nodes: Vec<Comment>, slot: &mut Option<Comment>) -> Vec<Comment> {
    let Some(id) = slot.as_ref().map(|c| c.id) else {
        return nodes;
    };
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        if slot.is_some() {
            if node.id == id {
                if let Some(fresh) = slot.take() {
                    node = Comment {
                        replies: std::mem::take(&mut node.replies),
                        ..fresh
                    };
                }
            } else if contains(&node.replies, id) {
                let replies = std::mem::take(&mut node.replies);
                node.replies = swap(replies, slot);
            }
        }
        out.push(node);
    }
    out
}

/// A product's comment tree plus the ids this client wrote itself.
#[derive(Debug, Clone)]
pub struct CommentThread {
    roots: Vec<Comment>,
    echoes: EchoSuppressor<CommentId>,
}

impl CommentThread {
    pub fn new(roots: Vec<Comment>, echo_capacity: usize) -> Self {
        Self {
            roots,
            echoes: EchoSuppressor::new(echo_capacity),
        }
    }

    pub fn roots(&self) -> &[Comment] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn find(&self, id: CommentId) -> Option<&Comment> {
        find(&self.roots, id)
    }

    /// Optimistic insert of a comment this client just posted. The id is
    /// recorded before the node lands so the broadcast echo is recognised.
    pub fn record_local(&mut self, comment: Comment) -> Outcome {
        self.echoes.record(comment.id);
        self.apply_insert_unsuppressed(comment)
    }

    /// Insert a comment received from the bus.
    pub fn apply_insert(&mut self, comment: Comment) -> Outcome {
        if !self.echoes.is_suppressed(&comment.id) {
            return self.apply_insert_unsuppressed(comment);
        }

        let richer = self
            .find(comment.id)
            .is_some_and(|existing| comment.is_richer_than(existing));
        if !richer {
            debug!(comment = %comment.id, "Echo of local comment ignored");
            return Outcome::Ignored("echo");
        }

        debug!(comment = %comment.id, "Echo carries revealed identity, replacing");
        let roots = std::mem::take(&mut self.roots);
        self.roots = replace(roots, comment);
        Outcome::Replaced
    }

    fn apply_insert_unsuppressed(&mut self, comment: Comment) -> Outcome {
        if overlaps(&self.roots, &comment) {
            return Outcome::Ignored("duplicate comment");
        }
        let roots = std::mem::take(&mut self.roots);
        self.roots = insert(roots, comment);
        Outcome::Inserted
    }

    pub fn apply_delete(&mut self, id: CommentId) -> Outcome {
        if !contains(&self.roots, id) {
            return Outcome::Ignored("unknown comment");
        }
        let roots = std::mem::take(&mut self.roots);
        self.roots = remove(roots, id);
        Outcome::Removed
    }
}
