//! NBT paths (`mem.v3`, `stack[-1]`, `frame.m0`).

use crate::error::{VmError, VmResult};
use crate::nbt::Nbt;
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(i64),
}

/// A parsed path into a storage compound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbtPath {
    segments: Vec<Segment>,
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

impl NbtPath {
    pub fn parse(text: &str) -> VmResult<Self> {
        let fail = |reason: &str| VmError::Parse {
            line: text.to_string(),
            reason: reason.to_string(),
        };
        let chars: Vec<char> = text.chars().collect();
        let mut segments = Vec::new();
        let mut pos = 0;
        while pos < chars.len() {
            match chars[pos] {
                '.' if !segments.is_empty() => pos += 1,
                '[' => {
                    let end = chars[pos..]
                        .iter()
                        .position(|&c| c == ']')
                        .ok_or_else(|| fail("unclosed '['"))?;
                    let inner: String = chars[pos + 1..pos + end].iter().collect();
                    let index = inner.trim().parse().map_err(|_| fail("bad list index"))?;
                    segments.push(Segment::Index(index));
                    pos += end + 1;
                }
                '"' => {
                    let end = chars[pos + 1..]
                        .iter()
                        .position(|&c| c == '"')
                        .ok_or_else(|| fail("unclosed quote"))?;
                    segments.push(Segment::Key(chars[pos + 1..pos + 1 + end].iter().collect()));
                    pos += end + 2;
                }
                _ => {
                    let start = pos;
                    while pos < chars.len() && !matches!(chars[pos], '.' | '[') {
                        pos += 1;
                    }
                    if start == pos {
                        return Err(fail("empty path segment"));
                    }
                    segments.push(Segment::Key(chars[start..pos].iter().collect()));
                }
            }
        }
        if segments.is_empty() {
            return Err(fail("empty path"));
        }
        Ok(Self { segments })
    }

    /// Value at this path, if present.
    pub fn get<'a>(&self, root: &'a Nbt) -> Option<&'a Nbt> {
        self.segments.iter().try_fold(root, |node, segment| match (segment, node) {
            (Segment::Key(key), Nbt::Compound(map)) => map.get(key),
            (Segment::Index(i), Nbt::List(items)) => {
                resolve_index(*i, items.len()).and_then(|i| items.get(i))
            }
            _ => None,
        })
    }

    fn get_mut<'a>(&self, root: &'a mut Nbt) -> Option<&'a mut Nbt> {
        self.segments.iter().try_fold(root, |node, segment| match (segment, node) {
            (Segment::Key(key), Nbt::Compound(map)) => map.get_mut(key),
            (Segment::Index(i), Nbt::List(items)) => {
                resolve_index(*i, items.len()).and_then(move |i| items.get_mut(i))
            }
            _ => None,
        })
    }

    /// Parent of the final segment, creating missing compounds on the way.
    fn parent_mut<'a>(&self, root: &'a mut Nbt) -> Option<&'a mut Nbt> {
        let (_, parents) = self.segments.split_last()?;
        let mut node = root;
        for segment in parents {
            node = match (segment, node) {
                (Segment::Key(key), Nbt::Compound(map)) => {
                    map.entry(key.clone()).or_insert_with(Nbt::compound)
                }
                (Segment::Index(i), Nbt::List(items)) => {
                    let i = resolve_index(*i, items.len())?;
                    items.get_mut(i)?
                }
                _ => return None,
            };
        }
        Some(node)
    }

    /// Store `value` at this path. Returns whether anything changed; `None`
    /// when the path cannot hold a value.
    pub fn set(&self, root: &mut Nbt, value: Nbt) -> Option<bool> {
        let last = self.segments.last()?;
        let parent = self.parent_mut(root)?;
        match (last, parent) {
            (Segment::Key(key), Nbt::Compound(map)) => {
                let changed = map.get(key) != Some(&value);
                map.insert(key.clone(), value);
                Some(changed)
            }
            (Segment::Index(i), Nbt::List(items)) => {
                let i = resolve_index(*i, items.len())?;
                let changed = items[i] != value;
                items[i] = value;
                Some(changed)
            }
            _ => None,
        }
    }

    /// List at this path, created empty when missing.
    pub fn list_mut<'a>(&self, root: &'a mut Nbt) -> Option<&'a mut Vec<Nbt>> {
        if self.get(root).is_none() {
            self.set(root, Nbt::List(Vec::new()))?;
        }
        match self.get_mut(root)? {
            Nbt::List(items) => Some(items),
            _ => None,
        }
    }

    /// Compound at this path, created empty when missing.
    pub fn compound_mut<'a>(&self, root: &'a mut Nbt) -> Option<&'a mut IndexMap<String, Nbt>> {
        if self.get(root).is_none() {
            self.set(root, Nbt::compound())?;
        }
        match self.get_mut(root)? {
            Nbt::Compound(map) => Some(map),
            _ => None,
        }
    }

    /// Remove the value at this path. Returns whether it existed.
    pub fn remove(&self, root: &mut Nbt) -> bool {
        let Some(last) = self.segments.last() else {
            return false;
        };
        let parent_path = NbtPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        };
        let parent = if parent_path.segments.is_empty() {
            Some(root)
        } else {
            parent_path.get_mut(root)
        };
        match (last, parent) {
            (Segment::Key(key), Some(Nbt::Compound(map))) => map.shift_remove(key).is_some(),
            (Segment::Index(i), Some(Nbt::List(items))) => match resolve_index(*i, items.len()) {
                Some(i) => {
                    items.remove(i);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}
