//! Addressing and replacing values inside a JSON content tree.
//!
//! A [`Path`] is a sequence of [`PathSegment`]s. Segments resolve against the
//! container they are applied to:
//!
//! | Segment    | Object               | Array                         |
//! |------------|----------------------|-------------------------------|
//! | `Key(k)`   | member `k`           | index `k` if `k` is a `usize` |
//! | `Index(i)` | error                | element `i`                   |
//!
//! So `Key("2")` reads the member named `"2"` of an object but element 2 of
//! an array, while `Index(2)` only ever means element 2.
//!
//! [`set`] never creates or removes anything: every segment, including the
//! last, must already exist. The input tree is left untouched and a new tree
//! is returned.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a [`Path`].
///
/// Serialized untagged: `"name"` is a key, `3` is an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Array index, written `[0]`
    Index(usize),
    /// Object key, written `.key`. Numeric keys also address array elements.
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Address of a node in a content tree. The empty path is the root.
///
/// ```
/// use roastery_core::path::Path;
///
/// let dotted: Path = "products.0.price".parse().unwrap();
/// let bracketed: Path = "products[0].price".parse().unwrap();
/// assert_eq!(dotted.len(), 3);
/// assert_eq!(bracketed.to_string(), "products[0].price");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Builds a path of `Key` segments, e.g. `["products", "0", "price"]`.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: keys
                .into_iter()
                .map(|k| PathSegment::Key(k.into()))
                .collect(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Errors from parsing a path string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathParseError {
    #[error("empty key at position {0}")]
    EmptyKey(usize),

    #[error("unclosed bracket at position {0}")]
    UnclosedBracket(usize),

    #[error("invalid index '{1}' at position {0}")]
    InvalidIndex(usize, String),

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

impl FromStr for Path {
    type Err = PathParseError;

    /// Parses `site.hero.title`, `products.0.price` or `products[0].price`.
    ///
    /// Dotted parts are always keys (`0` above is `Key("0")`); only bracketed
    /// numbers become `Index` segments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let chars: Vec<char> = s.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '[' => {
                    let start = i;
                    i += 1;
                    let idx_start = i;
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err(PathParseError::UnclosedBracket(start));
                    }
                    let idx: String = chars[idx_start..i].iter().collect();
                    let index = idx
                        .parse::<usize>()
                        .map_err(|_| PathParseError::InvalidIndex(idx_start, idx.clone()))?;
                    segments.push(PathSegment::Index(index));
                    i += 1;
                }
                '.' => {
                    if i == 0 {
                        return Err(PathParseError::EmptyKey(0));
                    }
                    i += 1;
                    if i >= chars.len() || chars[i] == '.' || chars[i] == '[' {
                        return Err(PathParseError::EmptyKey(i));
                    }
                }
                ']' => return Err(PathParseError::UnexpectedChar(']', i)),
                _ => {
                    if i > 0 && chars[i - 1] == ']' {
                        return Err(PathParseError::UnexpectedChar(chars[i], i));
                    }
                    let key_start = i;
                    while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
                        i += 1;
                    }
                    segments.push(PathSegment::Key(chars[key_start..i].iter().collect()));
                }
            }
        }

        Ok(Path { segments })
    }
}

/// Why a path failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathErrorReason {
    /// Object has no member with this key
    MissingKey,
    /// Index is past the end of the array
    IndexOutOfBounds { index: usize, len: usize },
    /// Key applied to an array is not a non-negative integer
    NotAnIndex,
    /// Segment cannot be applied to this kind of value
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for PathErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathErrorReason::MissingKey => write!(f, "no such key"),
            PathErrorReason::IndexOutOfBounds { index, len } => {
                write!(f, "index {} out of bounds (length {})", index, len)
            }
            PathErrorReason::NotAnIndex => write!(f, "key is not an array index"),
            PathErrorReason::TypeMismatch { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
        }
    }
}

/// A path that does not resolve in the tree it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path '{path}' at segment {position} ({segment}): {reason}")]
pub struct PathError {
    pub path: String,
    pub position: usize,
    pub segment: PathSegment,
    pub reason: PathErrorReason,
}

enum Slot<'a> {
    Member(&'a str),
    Element(usize),
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolves `segment` against `container`, checking that the target exists.
fn locate<'s>(container: &Value, segment: &'s PathSegment) -> Result<Slot<'s>, PathErrorReason> {
    match (segment, container) {
        (PathSegment::Key(key), Value::Object(map)) => {
            if map.contains_key(key) {
                Ok(Slot::Member(key))
            } else {
                Err(PathErrorReason::MissingKey)
            }
        }
        (PathSegment::Key(key), Value::Array(items)) => {
            let index = key
                .parse::<usize>()
                .map_err(|_| PathErrorReason::NotAnIndex)?;
            element(items.len(), index)
        }
        (PathSegment::Index(index), Value::Array(items)) => element(items.len(), *index),
        (PathSegment::Index(_), other) => Err(PathErrorReason::TypeMismatch {
            expected: "array",
            found: type_name(other),
        }),
        (PathSegment::Key(_), other) => Err(PathErrorReason::TypeMismatch {
            expected: "object or array",
            found: type_name(other),
        }),
    }
}

fn element<'s>(len: usize, index: usize) -> Result<Slot<'s>, PathErrorReason> {
    if index < len {
        Ok(Slot::Element(index))
    } else {
        Err(PathErrorReason::IndexOutOfBounds { index, len })
    }
}

fn path_error(path: &Path, position: usize, reason: PathErrorReason) -> PathError {
    PathError {
        path: path.to_string(),
        position,
        segment: path.segments[position].clone(),
        reason,
    }
}

/// Returns the value at `path`.
pub fn get<'a>(root: &'a Value, path: &Path) -> Result<&'a Value, PathError> {
    let mut current = root;
    for (position, segment) in path.segments.iter().enumerate() {
        let slot = locate(current, segment).map_err(|r| path_error(path, position, r))?;
        let next = match slot {
            Slot::Member(key) => current.get(key),
            Slot::Element(index) => current.get(index),
        };
        current = next.ok_or_else(|| path_error(path, position, PathErrorReason::MissingKey))?;
    }
    Ok(current)
}

/// Returns a copy of `root` with the value at `path` replaced by `value`.
///
/// With an empty path the result is `value` itself. Nothing outside `path`
/// changes, and `root` is never modified.
pub fn set(root: &Value, path: &Path, value: Value) -> Result<Value, PathError> {
    if path.is_root() {
        return Ok(value);
    }

    let mut next = root.clone();
    let mut cursor = &mut next;
    for (position, segment) in path.segments.iter().enumerate() {
        let slot = locate(cursor, segment).map_err(|r| path_error(path, position, r))?;
        let child = match slot {
            Slot::Member(key) => cursor.get_mut(key),
            Slot::Element(index) => cursor.get_mut(index),
        };
        cursor = child.ok_or_else(|| path_error(path, position, PathErrorReason::MissingKey))?;
    }
    *cursor = value;

    Ok(next)
}

/// A replacement value whose structure differs from the value it replaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} at '{at}'")]
pub struct ShapeMismatch {
    /// Where the structures diverge
    pub at: Path,
    pub reason: String,
}

/// Checks that `new` can stand in for `old`, the value found at `path`.
///
/// Both must be the same kind of JSON value; objects must have the same key
/// set and arrays the same length, recursively. Scalar contents may differ.
pub fn check_shape(path: &Path, old: &Value, new: &Value) -> Result<(), ShapeMismatch> {
    match (old, new) {
        (Value::Object(before), Value::Object(after)) => {
            if let Some(key) = before.keys().find(|k| !after.contains_key(*k)) {
                return Err(ShapeMismatch {
                    at: path.clone(),
                    reason: format!("missing key '{}'", key),
                });
            }
            if let Some(key) = after.keys().find(|k| !before.contains_key(*k)) {
                return Err(ShapeMismatch {
                    at: path.clone(),
                    reason: format!("unexpected key '{}'", key),
                });
            }
            for (key, value) in before {
                if let Some(replacement) = after.get(key) {
                    check_shape(&path.clone().key(key.clone()), value, replacement)?;
                }
            }
            Ok(())
        }
        (Value::Array(before), Value::Array(after)) => {
            if before.len() != after.len() {
                return Err(ShapeMismatch {
                    at: path.clone(),
                    reason: format!("length {} changed to {}", before.len(), after.len()),
                });
            }
            for (index, (value, replacement)) in before.iter().zip(after).enumerate() {
                check_shape(&path.clone().index(index), value, replacement)?;
            }
            Ok(())
        }
        _ if type_name(old) == type_name(new) => Ok(()),
        _ => Err(ShapeMismatch {
            at: path.clone(),
            reason: format!("expected {}, found {}", type_name(old), type_name(new)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "site": { "hero": { "title": "Hello", "subtitle": "World" } },
            "products": [
                { "id": "1", "price": 450000, "notes": ["a", "b"] },
                { "id": "2", "price": 420000, "notes": [] },
                { "id": "3", "price": 350000, "notes": ["c"] }
            ],
            "labels": { "2": "two" }
        })
    }

    #[test]
    fn test_parse_dotted() {
        let path: Path = "products.0.price".parse().unwrap();
        assert_eq!(path, Path::from_keys(["products", "0", "price"]));
    }

    #[test]
    fn test_parse_brackets() {
        let path: Path = "products[1].notes[0]".parse().unwrap();
        assert_eq!(
            path,
            Path::root().key("products").index(1).key("notes").index(0)
        );
        assert_eq!(path.to_string(), "products[1].notes[0]");
    }

    #[test]
    fn test_parse_empty_is_root() {
        let path: Path = "".parse().unwrap();
        assert!(path.is_root());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "a..b".parse::<Path>(),
            Err(PathParseError::EmptyKey(_))
        ));
        assert!(matches!(
            ".a".parse::<Path>(),
            Err(PathParseError::EmptyKey(0))
        ));
        assert!(matches!(
            "a.".parse::<Path>(),
            Err(PathParseError::EmptyKey(_))
        ));
        assert!(matches!(
            "a[1".parse::<Path>(),
            Err(PathParseError::UnclosedBracket(1))
        ));
        assert!(matches!(
            "a[x]".parse::<Path>(),
            Err(PathParseError::InvalidIndex(_, _))
        ));
        assert!(matches!(
            "a[0]b".parse::<Path>(),
            Err(PathParseError::UnexpectedChar('b', 4))
        ));
    }

    #[test]
    fn test_path_json_untagged() {
        let path: Path = serde_json::from_value(json!(["products", 0, "price"])).unwrap();
        assert_eq!(path, Path::root().key("products").index(0).key("price"));

        let path: Path = serde_json::from_value(json!(["products", "0", "price"])).unwrap();
        assert_eq!(path, Path::from_keys(["products", "0", "price"]));
        assert_eq!(
            serde_json::to_value(Path::root().key("a").index(2)).unwrap(),
            json!(["a", 2])
        );
    }

    #[test]
    fn test_get_leaf() {
        let doc = doc();
        let path = Path::from_keys(["site", "hero", "title"]);
        assert_eq!(get(&doc, &path).unwrap(), &json!("Hello"));
    }

    #[test]
    fn test_set_then_get() {
        let doc = doc();
        let path = Path::from_keys(["products", "2", "price"]);

        let updated = set(&doc, &path, json!(500000)).unwrap();
        assert_eq!(get(&updated, &path).unwrap(), &json!(500000));
    }

    #[test]
    fn test_set_leaves_siblings_equal() {
        let doc = doc();
        let path = Path::from_keys(["products", "2", "price"]);

        let updated = set(&doc, &path, json!(1)).unwrap();

        assert_eq!(updated["products"][0], doc["products"][0]);
        assert_eq!(updated["products"][1], doc["products"][1]);
        assert_eq!(updated["products"][2]["id"], doc["products"][2]["id"]);
        assert_eq!(updated["products"][2]["notes"], doc["products"][2]["notes"]);
        assert_eq!(updated["site"], doc["site"]);
        assert_eq!(updated["labels"], doc["labels"]);
        assert_eq!(updated["products"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_set_does_not_touch_input() {
        let doc = doc();
        let before = doc.clone();

        let _ = set(&doc, &Path::from_keys(["site", "hero", "title"]), json!("Bye")).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_set_empty_path_returns_value() {
        let doc = doc();
        let replacement = json!({"entirely": "new"});
        assert_eq!(set(&doc, &Path::root(), replacement.clone()).unwrap(), replacement);
    }

    #[test]
    fn test_set_replaces_subtree() {
        let doc = doc();
        let path = Path::from_keys(["products", "0", "notes"]);
        let updated = set(&doc, &path, json!(["x"])).unwrap();
        assert_eq!(updated["products"][0]["notes"], json!(["x"]));
    }

    #[test]
    fn test_numeric_key_on_array_is_index() {
        let doc = doc();
        let path = Path::from_keys(["products", "2", "id"]);
        assert_eq!(get(&doc, &path).unwrap(), &json!("3"));
    }

    #[test]
    fn test_numeric_key_on_object_is_key() {
        let doc = doc();
        let path = Path::from_keys(["labels", "2"]);
        assert_eq!(get(&doc, &path).unwrap(), &json!("two"));

        let updated = set(&doc, &path, json!("deux")).unwrap();
        assert_eq!(updated["labels"]["2"], "deux");
        assert_eq!(updated["labels"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_index_on_object_is_error() {
        let doc = doc();
        let path = Path::root().key("labels").index(2);
        let err = get(&doc, &path).unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(
            err.reason,
            PathErrorReason::TypeMismatch {
                expected: "array",
                found: "object"
            }
        );
    }

    #[test]
    fn test_non_numeric_key_on_array() {
        let doc = doc();
        let err = set(&doc, &Path::from_keys(["products", "first"]), json!(1)).unwrap_err();
        assert_eq!(err.reason, PathErrorReason::NotAnIndex);
    }

    #[test]
    fn test_missing_intermediate_is_error() {
        let doc = doc();
        let err = set(&doc, &Path::from_keys(["site", "footer", "legal"]), json!("x")).unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.reason, PathErrorReason::MissingKey);
        assert!(err.to_string().contains("site.footer.legal"));
    }

    #[test]
    fn test_missing_terminal_key_is_error() {
        let doc = doc();
        let err = set(&doc, &Path::from_keys(["site", "hero", "tagline"]), json!("x")).unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.reason, PathErrorReason::MissingKey);
    }

    #[test]
    fn test_index_out_of_bounds_does_not_append() {
        let doc = doc();
        let err = set(&doc, &Path::root().key("products").index(3), json!({})).unwrap_err();
        assert_eq!(
            err.reason,
            PathErrorReason::IndexOutOfBounds { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_segment_on_scalar_is_error() {
        let doc = doc();
        let err = get(&doc, &Path::from_keys(["site", "hero", "title", "x"])).unwrap_err();
        assert_eq!(
            err.reason,
            PathErrorReason::TypeMismatch {
                expected: "object or array",
                found: "string"
            }
        );
    }

    #[test]
    fn test_is_prefix_of() {
        let parent = Path::from_keys(["products", "0"]);
        let child = Path::from_keys(["products", "0", "price"]);
        assert!(parent.is_prefix_of(&child));
        assert!(child.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
        assert!(Path::root().is_prefix_of(&child));
    }

    #[test]
    fn test_check_shape_accepts_scalar_changes() {
        let doc = doc();
        let path = Path::from_keys(["products", "0"]);
        let replacement = json!({ "id": "1", "price": 1, "notes": ["x", "y"] });
        assert!(check_shape(&path, get(&doc, &path).unwrap(), &replacement).is_ok());
    }

    #[test]
    fn test_check_shape_rejects_array_length_change() {
        let doc = doc();
        let path = Path::from_keys(["products"]);
        let err = check_shape(&path, get(&doc, &path).unwrap(), &json!([])).unwrap_err();
        assert_eq!(err.at, path);
        assert_eq!(err.reason, "length 3 changed to 0");

        let notes = Path::from_keys(["products", "0"]);
        let replacement = json!({ "id": "1", "price": 1, "notes": ["a"] });
        let err = check_shape(&notes, get(&doc, &notes).unwrap(), &replacement).unwrap_err();
        assert_eq!(err.at.to_string(), "products.0.notes");
    }

    #[test]
    fn test_check_shape_rejects_key_set_change() {
        let doc = doc();
        let path = Path::from_keys(["site", "hero"]);
        let old = get(&doc, &path).unwrap();

        let extra = json!({ "title": "Hi", "subtitle": "There", "tagline": "New" });
        let err = check_shape(&path, old, &extra).unwrap_err();
        assert_eq!(err.reason, "unexpected key 'tagline'");

        let missing = json!({ "title": "Hi" });
        let err = check_shape(&path, old, &missing).unwrap_err();
        assert_eq!(err.reason, "missing key 'subtitle'");
    }

    #[test]
    fn test_check_shape_rejects_kind_change() {
        let doc = doc();
        let path = Path::from_keys(["labels"]);
        let err = check_shape(&path, get(&doc, &path).unwrap(), &json!(5)).unwrap_err();
        assert_eq!(err.reason, "expected object, found number");
        assert!(err.to_string().contains("'labels'"));
    }
}
