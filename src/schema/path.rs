use serde_json::{Map, Value as JsonValue};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Dot-path address into a nested JSON value, e.g. `theming.primaryColor`
/// or `domains.0.domain`. Numeric segments address array slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s.parse::<usize>() {
                Ok(i) if s.chars().all(|c| c.is_ascii_digit()) => Segment::Index(i),
                _ => Segment::Key(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn get<'a>(&self, root: &'a JsonValue) -> Option<&'a JsonValue> {
        if self.segments.is_empty() {
            return None;
        }
        let mut cur = root;
        for seg in &self.segments {
            cur = match seg {
                Segment::Key(k) => cur.get(k.as_str())?,
                Segment::Index(i) => cur.get(*i)?,
            };
        }
        Some(cur)
    }

    /// Write `value` at this path, creating objects/arrays along the way.
    /// A scalar sitting where a container is needed gets replaced.
    pub fn insert(&self, root: &mut JsonValue, value: JsonValue) {
        insert_at(root, &self.segments, value);
    }

    /// Detach and return the value at this path, if any.
    pub fn remove(&self, root: &mut JsonValue) -> Option<JsonValue> {
        let (last, parents) = self.segments.split_last()?;
        let mut cur = root;
        for seg in parents {
            cur = match seg {
                Segment::Key(k) => cur.get_mut(k.as_str())?,
                Segment::Index(i) => cur.get_mut(*i)?,
            };
        }
        match (last, cur) {
            (Segment::Key(k), JsonValue::Object(map)) => map.remove(k),
            (Segment::Index(i), JsonValue::Array(arr)) if *i < arr.len() => Some(arr.remove(*i)),
            _ => None,
        }
    }
}

fn insert_at(slot: &mut JsonValue, segs: &[Segment], value: JsonValue) {
    let Some((seg, rest)) = segs.split_first() else {
        *slot = value;
        return;
    };
    match seg {
        Segment::Key(k) => {
            if !slot.is_object() {
                *slot = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(map) = slot {
                let child = map.entry(k.clone()).or_insert(JsonValue::Null);
                insert_at(child, rest, value);
            }
        }
        Segment::Index(i) => {
            if !slot.is_array() {
                *slot = JsonValue::Array(Vec::new());
            }
            if let JsonValue::Array(arr) = slot {
                while arr.len() <= *i {
                    arr.push(JsonValue::Null);
                }
                insert_at(&mut arr[*i], rest, value);
            }
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => i.to_string(),
            })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}
