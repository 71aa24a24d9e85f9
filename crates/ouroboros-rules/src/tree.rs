//! Path-addressed tree access
//!
//! The result mirror and the nested ("standard") error store are both
//! trees addressed by a list of path segments. [`PathTree`] abstracts the
//! handful of node operations they need so the walking code lives here once.

use crate::types::Value;

/// Node operations needed to walk, auto-vivify and prune a tree.
pub trait PathTree: Sized {
    /// A fresh, empty branch node
    fn branch() -> Self;

    /// Whether the node can hold children
    fn is_branch(&self) -> bool;

    /// Whether the node is a branch with no children
    fn is_empty_branch(&self) -> bool;

    fn get_child(&self, key: &str) -> Option<&Self>;

    fn get_child_mut(&mut self, key: &str) -> Option<&mut Self>;

    /// Insert or replace a child
    fn put_child(&mut self, key: &str, node: Self);

    fn take_child(&mut self, key: &str) -> Option<Self>;
}

/// Read the node at `path`. An empty path addresses the root.
pub fn get_at_path<'a, T: PathTree>(root: &'a T, path: &[String]) -> Option<&'a T> {
    path.iter().try_fold(root, |node, seg| node.get_child(seg))
}

pub fn get_at_path_mut<'a, T: PathTree>(root: &'a mut T, path: &[String]) -> Option<&'a mut T> {
    path.iter().try_fold(root, |node, seg| node.get_child_mut(seg))
}

/// Write `node` at `path`, creating (or overwriting non-branch) ancestors.
///
/// A list segment that is not an existing index stops the write.
pub fn set_at_path<T: PathTree>(root: &mut T, path: &[String], node: T) {
    let Some((last, parents)) = path.split_last() else {
        *root = node;
        return;
    };

    let mut current = root;
    for seg in parents {
        if !current.is_branch() {
            *current = T::branch();
        }
        let needs_branch = match current.get_child(seg) {
            Some(child) => !child.is_branch(),
            None => true,
        };
        if needs_branch {
            current.put_child(seg, T::branch());
        }
        current = match current.get_child_mut(seg) {
            Some(child) => child,
            None => return,
        };
    }

    if !current.is_branch() {
        *current = T::branch();
    }
    current.put_child(last, node);
}

/// Remove the node at `path`, then drop any ancestor left empty by it.
pub fn remove_at_path<T: PathTree>(root: &mut T, path: &[String]) -> Option<T> {
    let (first, rest) = path.split_first()?;
    if rest.is_empty() {
        return root.take_child(first);
    }

    let child = root.get_child_mut(first)?;
    let removed = remove_at_path(child, rest);
    if removed.is_some() && child.is_empty_branch() {
        root.take_child(first);
    }
    removed
}

impl PathTree for Value {
    fn branch() -> Self {
        Value::object()
    }

    fn is_branch(&self) -> bool {
        matches!(self, Value::Object(_) | Value::List(_))
    }

    fn is_empty_branch(&self) -> bool {
        match self {
            Value::Object(pairs) => pairs.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    fn get_child(&self, key: &str) -> Option<&Self> {
        self.child(key)
    }

    fn get_child_mut(&mut self, key: &str) -> Option<&mut Self> {
        self.child_mut(key)
    }

    fn put_child(&mut self, key: &str, node: Self) {
        match self {
            Value::Object(_) => self.insert(key, node),
            // Lists keep their shape: only existing slots are replaced.
            Value::List(items) => {
                if let Some(slot) = key.parse::<usize>().ok().and_then(|idx| items.get_mut(idx)) {
                    *slot = node;
                }
            }
            _ => {}
        }
    }

    fn take_child(&mut self, key: &str) -> Option<Self> {
        self.remove(key)
    }
}
