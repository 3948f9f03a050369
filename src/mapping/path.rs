//! Path-based access into JSON documents
//!
//! Paths use dotted object access with bracketed numeric indices, e.g.
//! `fields.items[0].name`. Reads return `None` for any missing intermediate
//! node; writes create intermediate containers as needed, choosing array vs.
//! object by whether the next segment is a numeric index.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }
        let mut rest = part;
        if let Some(bracket) = rest.find('[') {
            let (name, tail) = rest.split_at(bracket);
            if !name.is_empty() {
                segments.push(Segment::Key(name.to_string()));
            }
            rest = tail;
            while let Some(stripped) = rest.strip_prefix('[') {
                match stripped.find(']') {
                    Some(end) => {
                        let inner = &stripped[..end];
                        match inner.parse::<usize>() {
                            Ok(index) => segments.push(Segment::Index(index)),
                            // Non-numeric bracket content is treated as a key
                            Err(_) => segments.push(Segment::Key(inner.to_string())),
                        }
                        rest = &stripped[end + 1..];
                    }
                    None => {
                        // Unterminated bracket; take the remainder as a key
                        segments.push(Segment::Key(stripped.to_string()));
                        rest = "";
                    }
                }
            }
            if !rest.is_empty() {
                segments.push(Segment::Key(rest.to_string()));
            }
        } else {
            segments.push(Segment::Key(rest.to_string()));
        }
    }
    segments
}

/// Read the value at `path`, or `None` if any node along the way is missing
/// or of the wrong shape
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in parse_path(path) {
        current = match segment {
            Segment::Key(key) => current.as_object()?.get(&key)?,
            Segment::Index(index) => current.as_array()?.get(index)?,
        };
    }
    Some(current)
}

fn descend<'a>(current: &'a mut Value, segment: &Segment) -> &'a mut Value {
    match segment {
        Segment::Key(key) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            if let Value::Object(map) = current {
                map.entry(key.clone()).or_insert(Value::Null)
            } else {
                current
            }
        }
        Segment::Index(index) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            if let Value::Array(items) = current {
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                &mut items[*index]
            } else {
                current
            }
        }
    }
}

/// Write `new_value` at `path`, creating intermediate objects and arrays
///
/// Existing scalar nodes along the path are replaced by the container the
/// path requires. Arrays are padded with nulls up to the written index.
pub fn set_path(root: &mut Value, path: &str, new_value: Value) {
    let segments = parse_path(path);
    let Some((last, parents)) = segments.split_last() else {
        *root = new_value;
        return;
    };

    let mut current = root;
    for segment in parents {
        current = descend(current, segment);
    }

    match last {
        Segment::Key(key) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            if let Value::Object(map) = current {
                map.insert(key.clone(), new_value);
            }
        }
        Segment::Index(index) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            if let Value::Array(items) = current {
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                items[*index] = new_value;
            }
        }
    }
}
