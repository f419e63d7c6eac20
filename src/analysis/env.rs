use std::collections::BTreeMap;
use std::sync::Arc;

/// A named binding recorded in one lexical scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    /// Language-provided names (`builtins`, `true`, `map`, ...) as opposed to user bindings.
    pub is_builtin: bool,
}

impl Definition {
    pub fn new(name: impl Into<String>, is_builtin: bool) -> Self {
        Definition {
            name: name.into(),
            is_builtin,
        }
    }
}

/// One frame of the environment chain.
///
/// Frames are immutable once built and link to their enclosing frame through a
/// shared `Arc`, so a chain can only be grown downward from an existing parent and
/// never forms a cycle. Definitions are keyed by name, which keeps names unique
/// within a frame while still allowing an inner frame to shadow an outer one.
#[derive(Debug, Clone, Default)]
pub struct EnvNode {
    definitions: BTreeMap<String, Definition>,
    parent: Option<Arc<EnvNode>>,
}

impl EnvNode {
    /// Creates an empty frame with an optional parent.
    pub fn new(parent: Option<Arc<EnvNode>>) -> Self {
        EnvNode {
            definitions: BTreeMap::new(),
            parent,
        }
    }

    /// Builds a frame from user bindings.
    pub fn with_names<I, S>(parent: Option<Arc<EnvNode>>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut env = EnvNode::new(parent);
        for name in names {
            env.define(Definition::new(name, false));
        }
        env
    }

    /// Builds a parentless frame of language builtins.
    pub fn builtins<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut env = EnvNode::new(None);
        for name in names {
            env.define(Definition::new(name, true));
        }
        env
    }

    /// Adds a definition to this frame, replacing any previous one with the same name.
    pub fn define(&mut self, def: Definition) {
        self.definitions.insert(def.name.clone(), def);
    }

    /// Definitions of this frame only, ordered by name.
    pub fn defs(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.definitions.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn parent(&self) -> Option<&Arc<EnvNode>> {
        self.parent.as_ref()
    }
}
