//! Path-addressed writes into an owned document.

use crate::{ApplyError, Node, Pointer, Segment};

/// Walks `path` and returns the node it addresses.
pub(crate) fn resolve_mut<'a>(
    target: &'a mut Node,
    path: &Pointer,
) -> Result<&'a mut Node, ApplyError> {
    let mut current = target;
    for (depth, segment) in path.segments().iter().enumerate() {
        let here = || Pointer::from(&path.segments()[..depth]).to_string();
        current = match current {
            Node::Object(members) => members
                .get_mut(&segment.token())
                .ok_or_else(|| ApplyError::Unresolved { path: path.to_string() })?,
            Node::Array(items) => {
                let index = segment.as_index().ok_or_else(|| ApplyError::TypeMismatch {
                    path: here(),
                    expected: "object",
                    found: "array",
                })?;
                items.get_mut(index).ok_or_else(|| ApplyError::OutOfBounds { path: here(), index })?
            }
            other => {
                return Err(ApplyError::TypeMismatch {
                    path: here(),
                    expected: "object or array",
                    found: other.type_name(),
                })
            }
        };
    }
    Ok(current)
}

/// Replaces the value at `path`, creating an object member or appending at
/// the end of an array when the slot does not exist yet.
pub(crate) fn set(target: &mut Node, path: &Pointer, value: Node) -> Result<(), ApplyError> {
    let Some((parent, last)) = split(path) else {
        *target = value;
        return Ok(());
    };
    match resolve_mut(target, &parent)? {
        Node::Object(members) => {
            members.insert(last.token(), value);
            Ok(())
        }
        Node::Array(items) => {
            let index = array_index(&parent, last)?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => items[index] = value,
                std::cmp::Ordering::Equal => items.push(value),
                std::cmp::Ordering::Greater => {
                    return Err(ApplyError::OutOfBounds { path: parent.to_string(), index });
                }
            }
            Ok(())
        }
        other => Err(mismatch(&parent, other)),
    }
}

/// RFC 6902 `add`: inserts into arrays, sets object members.
pub(crate) fn insert(target: &mut Node, path: &Pointer, value: Node) -> Result<(), ApplyError> {
    let Some((parent, last)) = split(path) else {
        *target = value;
        return Ok(());
    };
    match resolve_mut(target, &parent)? {
        Node::Object(members) => {
            members.insert(last.token(), value);
            Ok(())
        }
        Node::Array(items) => {
            let index = array_index(&parent, last)?;
            if index > items.len() {
                return Err(ApplyError::OutOfBounds { path: parent.to_string(), index });
            }
            items.insert(index, value);
            Ok(())
        }
        other => Err(mismatch(&parent, other)),
    }
}

/// Removes the value at `path`. A missing object member is not an error.
pub(crate) fn remove(target: &mut Node, path: &Pointer) -> Result<Option<Node>, ApplyError> {
    let Some((parent, last)) = split(path) else {
        return Err(ApplyError::RootRemoval);
    };
    match resolve_mut(target, &parent)? {
        Node::Object(members) => Ok(members.remove(&last.token())),
        Node::Array(items) => {
            let index = array_index(&parent, last)?;
            if index >= items.len() {
                return Err(ApplyError::OutOfBounds { path: parent.to_string(), index });
            }
            Ok(Some(items.remove(index)))
        }
        other => Err(mismatch(&parent, other)),
    }
}

fn split(path: &Pointer) -> Option<(Pointer, &Segment)> {
    let last = path.last()?;
    Some((path.parent()?, last))
}

fn array_index(parent: &Pointer, segment: &Segment) -> Result<usize, ApplyError> {
    segment.as_index().ok_or_else(|| ApplyError::TypeMismatch {
        path: parent.to_string(),
        expected: "object",
        found: "array",
    })
}

fn mismatch(path: &Pointer, found: &Node) -> ApplyError {
    ApplyError::TypeMismatch {
        path: path.to_string(),
        expected: "object or array",
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str) -> Node {
        Node::from_json_str(text).unwrap()
    }

    fn pointer(text: &str) -> Pointer {
        text.parse().unwrap()
    }

    #[test]
    fn set_creates_members_and_appends() {
        let mut doc = node("{\"a\":{},\"l\":[1]}");
        set(&mut doc, &pointer("/a/b"), node("true")).unwrap();
        set(&mut doc, &pointer("/l/1"), node("2")).unwrap();
        set(&mut doc, &pointer("/l/0"), node("0")).unwrap();
        assert_eq!(doc, node("{\"a\":{\"b\":true},\"l\":[0,2]}"));
    }

    #[test]
    fn insert_shifts_array_items() {
        let mut doc = node("[1,3]");
        insert(&mut doc, &pointer("/1"), node("2")).unwrap();
        assert_eq!(doc, node("[1,2,3]"));
    }

    #[test]
    fn failures_describe_the_path() {
        let mut doc = node("{\"a\":1,\"l\":[]}");
        assert_eq!(
            set(&mut doc, &pointer("/a/b"), Node::Null).unwrap_err(),
            ApplyError::TypeMismatch {
                path: "/a".to_string(),
                expected: "object or array",
                found: "number"
            }
        );
        assert_eq!(
            set(&mut doc, &pointer("/missing/b"), Node::Null).unwrap_err(),
            ApplyError::Unresolved { path: "/missing".to_string() }
        );
        assert_eq!(
            set(&mut doc, &pointer("/l/3"), Node::Null).unwrap_err(),
            ApplyError::OutOfBounds { path: "/l".to_string(), index: 3 }
        );
        assert_eq!(remove(&mut doc, &Pointer::root()).unwrap_err(), ApplyError::RootRemoval);
    }

    #[test]
    fn removing_absent_member_is_a_no_op() {
        let mut doc = node("{\"a\":1}");
        assert_eq!(remove(&mut doc, &pointer("/b")).unwrap(), None);
        assert_eq!(remove(&mut doc, &pointer("/a")).unwrap(), Some(node("1")));
        assert_eq!(doc, node("{}"));
    }
}
