use core::fmt;

/// A single step in a structural path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Navigate to an object member by key.
    Key(String),
    /// Navigate to an array element by index.
    Index(usize),
}

/// Location of the value currently being encoded or decoded, rendered as
/// `$.a.b[3]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    /// Create a new empty path (the root, `$`).
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Push a step onto the path.
    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    /// Pop the last step off the path.
    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    /// Replace the last step, pushing it if the path is empty.
    pub fn replace_last(&mut self, step: PathStep) {
        match self.steps.last_mut() {
            Some(last) => *last = step,
            None => self.steps.push(step),
        }
    }

    /// The recorded steps, root first.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for step in &self.steps {
            match step {
                PathStep::Key(key) if is_plain_key(key) => write!(f, ".{key}")?,
                PathStep::Key(key) => write!(f, "[{key:?}]")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testhelpers::test;

    #[test]
    fn renders_keys_and_indices() {
        let mut path = Path::new();
        assert_eq!(path.to_string(), "$");
        path.push(PathStep::Key("a".into()));
        path.push(PathStep::Key("b".into()));
        path.push(PathStep::Index(3));
        assert_eq!(path.to_string(), "$.a.b[3]");
        path.replace_last(PathStep::Index(4));
        assert_eq!(path.to_string(), "$.a.b[4]");
    }

    #[test]
    fn quotes_unusual_keys() {
        let mut path = Path::new();
        path.push(PathStep::Key("first name".into()));
        assert_eq!(path.to_string(), "$[\"first name\"]");
    }
}
