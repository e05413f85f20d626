//! Dotted-name presentation transform.
//!
//! Spec names may encode hierarchy with a separator (`"arm.joint.0"`).
//! The core never interprets it. These helpers convert between a flat
//! name-keyed map and a nested tree at the edge of an application.

use indexmap::IndexMap;

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = ".";

/// A node of a nested name tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Nested<T> {
    /// A value.
    Leaf(T),
    /// Named children.
    Tree(IndexMap<String, Nested<T>>),
}

/// Errors from [`flatten`] and [`unflatten`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NestingError {
    /// The separator string is empty.
    #[error("separator must not be empty")]
    EmptySeparator,
    /// A tree key is the empty string.
    #[error("empty key under `{parent}`")]
    EmptyKey {
        /// Path of the subtree holding the key; empty at the root.
        parent: String,
    },
    /// A tree key already contains the separator.
    #[error("key `{key}` contains the separator `{separator}`")]
    SeparatorInKey {
        /// Offending key.
        key: String,
        /// Separator in use.
        separator: String,
    },
    /// A path names both a value and a subtree.
    #[error("`{key}` is both a leaf and a subtree")]
    LeafSubtreeConflict {
        /// Conflicting path.
        key: String,
    },
    /// The same flat key appears twice.
    #[error("duplicate key `{key}`")]
    DuplicateKey {
        /// Repeated key.
        key: String,
    },
}

/// Flatten a tree into dotted keys, depth-first in insertion order.
///
/// Keys must be non-empty and free of the separator, so every leaf gets a
/// distinct path.
pub fn flatten<T>(
    tree: IndexMap<String, Nested<T>>,
    separator: &str,
) -> Result<IndexMap<String, T>, NestingError> {
    if separator.is_empty() {
        return Err(NestingError::EmptySeparator);
    }
    let mut out = IndexMap::new();
    flatten_into(tree, "", separator, &mut out)?;
    Ok(out)
}

fn flatten_into<T>(
    tree: IndexMap<String, Nested<T>>,
    prefix: &str,
    separator: &str,
    out: &mut IndexMap<String, T>,
) -> Result<(), NestingError> {
    for (key, node) in tree {
        if key.is_empty() {
            return Err(NestingError::EmptyKey {
                parent: prefix.to_owned(),
            });
        }
        if key.contains(separator) {
            return Err(NestingError::SeparatorInKey {
                key,
                separator: separator.to_owned(),
            });
        }
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}{separator}{key}")
        };
        match node {
            Nested::Leaf(value) => {
                if out.contains_key(&path) {
                    return Err(NestingError::DuplicateKey { key: path });
                }
                out.insert(path, value);
            }
            Nested::Tree(children) => flatten_into(children, &path, separator, out)?,
        }
    }
    Ok(())
}

/// Build a tree from dotted keys.
pub fn unflatten<T>(
    flat: impl IntoIterator<Item = (String, T)>,
    separator: &str,
) -> Result<IndexMap<String, Nested<T>>, NestingError> {
    if separator.is_empty() {
        return Err(NestingError::EmptySeparator);
    }
    let mut root: IndexMap<String, Nested<T>> = IndexMap::new();
    for (key, value) in flat {
        let parts: Vec<&str> = key.split(separator).collect();
        if let Some(depth) = parts.iter().position(|p| p.is_empty()) {
            return Err(NestingError::EmptyKey {
                parent: parts[..depth].join(separator),
            });
        }
        let Some((last, parents)) = parts.split_last() else {
            continue;
        };
        let mut node = &mut root;
        for (depth, part) in parents.iter().enumerate() {
            let child = node
                .entry((*part).to_owned())
                .or_insert_with(|| Nested::Tree(IndexMap::new()));
            node = match child {
                Nested::Tree(children) => children,
                Nested::Leaf(_) => {
                    return Err(NestingError::LeafSubtreeConflict {
                        key: parts[..=depth].join(separator),
                    })
                }
            };
        }
        match node.get(*last) {
            Some(Nested::Leaf(_)) => return Err(NestingError::DuplicateKey { key: key.clone() }),
            Some(Nested::Tree(_)) => {
                return Err(NestingError::LeafSubtreeConflict { key: key.clone() })
            }
            None => {
                node.insert((*last).to_owned(), Nested::Leaf(value));
            }
        }
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(pairs: &[(&str, i32)]) -> Vec<(String, i32)> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn unflatten_builds_tree() {
        let tree = unflatten(flat(&[("a.b", 1), ("a.c", 2), ("d", 3)]), ".").unwrap();
        let Some(Nested::Tree(a)) = tree.get("a") else {
            panic!("expected subtree");
        };
        assert_eq!(a.get("b"), Some(&Nested::Leaf(1)));
        assert_eq!(tree.get("d"), Some(&Nested::Leaf(3)));
    }

    #[test]
    fn flatten_inverts_unflatten() {
        let input = flat(&[("arm.joint.0", 1), ("arm.joint.1", 2), ("gripper", 3)]);
        let tree = unflatten(input.clone(), ".").unwrap();
        let back: Vec<(String, i32)> = flatten(tree, ".").unwrap().into_iter().collect();
        assert_eq!(back, input);
    }

    #[test]
    fn leaf_then_subtree_conflicts() {
        assert_eq!(
            unflatten(flat(&[("a", 1), ("a.b", 2)]), "."),
            Err(NestingError::LeafSubtreeConflict { key: "a".into() })
        );
        assert_eq!(
            unflatten(flat(&[("a.b", 1), ("a", 2)]), "."),
            Err(NestingError::LeafSubtreeConflict { key: "a".into() })
        );
    }

    #[test]
    fn duplicate_keys_rejected() {
        assert_eq!(
            unflatten(flat(&[("x.y", 1), ("x.y", 2)]), "."),
            Err(NestingError::DuplicateKey { key: "x.y".into() })
        );
    }

    #[test]
    fn flatten_rejects_separator_in_key() {
        let mut tree = IndexMap::new();
        tree.insert("a.b".to_owned(), Nested::Leaf(1));
        assert!(matches!(
            flatten(tree, "."),
            Err(NestingError::SeparatorInKey { .. })
        ));
    }

    #[test]
    fn flatten_rejects_empty_keys() {
        let mut inner = IndexMap::new();
        inner.insert("x".to_owned(), Nested::Leaf(1));
        let mut tree = IndexMap::new();
        tree.insert(String::new(), Nested::Tree(inner));
        tree.insert("x".to_owned(), Nested::Leaf(2));
        assert_eq!(
            flatten(tree, "."),
            Err(NestingError::EmptyKey { parent: String::new() })
        );

        let mut inner = IndexMap::new();
        inner.insert(String::new(), Nested::Leaf(1));
        let mut tree = IndexMap::new();
        tree.insert("a".to_owned(), Nested::Tree(inner));
        assert_eq!(
            flatten(tree, "."),
            Err(NestingError::EmptyKey { parent: "a".into() })
        );
    }

    #[test]
    fn unflatten_rejects_empty_segments() {
        assert_eq!(
            unflatten(flat(&[("", 1)]), "."),
            Err(NestingError::EmptyKey { parent: String::new() })
        );
        assert_eq!(
            unflatten(flat(&[("a..b", 1)]), "."),
            Err(NestingError::EmptyKey { parent: "a".into() })
        );
    }

    #[test]
    fn custom_separator() {
        let tree = unflatten(flat(&[("a/b", 1)]), "/").unwrap();
        assert!(matches!(tree.get("a"), Some(Nested::Tree(_))));
        assert_eq!(unflatten(flat(&[("a", 1)]), ""), Err(NestingError::EmptySeparator));
    }
}
