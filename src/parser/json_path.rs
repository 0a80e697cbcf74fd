//! JSON path lookup for the generic parser
//!
//! Paths are dot-separated; numeric segments index arrays and everything
//! else is an object key. Bracketed indices (`choices[0]`) are accepted too.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum PathSeg {
    Key(String),
    Index(usize),
}

/// Parse a path like `choices.0.delta.content` or `choices[0].delta.content`
pub(super) fn parse_path(path: &str) -> Vec<PathSeg> {
    let mut segs = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            continue;
        }
        let (key, rest) = match part.find('[') {
            Some(pos) => part.split_at(pos),
            None => (part, ""),
        };
        if !key.is_empty() {
            segs.push(match key.parse::<usize>() {
                Ok(idx) => PathSeg::Index(idx),
                Err(_) => PathSeg::Key(key.to_string()),
            });
        }
        // Zero or more [number]
        for bracket in rest.split('[').skip(1) {
            if let Ok(idx) = bracket.trim_end_matches(']').parse::<usize>() {
                segs.push(PathSeg::Index(idx));
            }
        }
    }
    segs
}

/// Walk `path` through `v`; a missing key or out-of-range index yields `None`
pub(super) fn get_path<'a>(v: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = v;
    for seg in parse_path(path) {
        match (seg, cur) {
            (PathSeg::Key(k), Value::Object(map)) => {
                cur = map.get(&k)?;
            }
            (PathSeg::Index(i), Value::Array(arr)) => {
                cur = arr.get(i)?;
            }
            _ => return None,
        }
    }
    Some(cur)
}

/// Resolve `path` to a string; numbers and booleans are rendered, anything
/// else counts as absent
pub(super) fn get_string(v: &Value, path: &str) -> Option<String> {
    match get_path(v, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
