use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    /// Unqualified name without namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    pub fn new(ns_uri: impl Into<String>, local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: Some(ns_uri.into()) }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Lexical `prefix:local` form as written into XML text.
    ///
    /// Without a prefix this is the bare local name; the namespace URI is not
    /// part of the result.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", self.local),
            _ => self.local.clone(),
        }
    }

    /// Namespace and local name match, prefixes are ignored.
    pub fn matches(&self, other: &QName) -> bool {
        self.local == other.local && self.ns_uri == other.ns_uri
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns_uri {
            Some(ns) => write!(f, "Q{{{ns}}}{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}
