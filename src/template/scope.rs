//! Resolution context: the stack of data scopes visible to a tag

use serde_json::Value;

/// Stack of data scopes, innermost last
#[derive(Clone, Debug)]
pub struct Scope<'d> {
    frames: Vec<&'d Value>,
}

impl<'d> Scope<'d> {
    /// Scope with the data record as its only frame
    pub fn new(root: &'d Value) -> Self {
        Self { frames: vec![root] }
    }

    /// Enter a loop iteration
    pub fn push(&mut self, value: &'d Value) {
        self.frames.push(value);
    }

    /// Leave a loop iteration; the root frame is never popped
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Resolve a dotted path.
    ///
    /// The first segment is looked up from the innermost frame outwards;
    /// the remaining segments descend into the value found there only.
    /// Numeric segments index into lists. `.` is the innermost value.
    pub fn lookup(&self, path: &str) -> Option<&'d Value> {
        if path == "." {
            return self.frames.last().copied();
        }

        let mut segments = path.split('.');
        let first = segments.next()?;
        let base = self
            .frames
            .iter()
            .rev()
            .copied()
            .find_map(|frame| frame.as_object()?.get(first))?;

        segments.try_fold(base, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

/// Null, false, an empty list, or absent
pub fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Values a `{#name}` section iterates over
pub fn iterations(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        v if is_falsy(v) => Vec::new(),
        Some(v) => vec![v],
        None => Vec::new(),
    }
}

/// Text a scalar tag renders for a value
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
