use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;

use crate::xdm::{XdmItem, XdmValue};

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Language level an expression is compiled at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Path expression without a prolog.
    #[default]
    Path,
    /// Full query with an optional prolog.
    Query,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NamespaceBindings {
    pub by_prefix: BTreeMap<String, String>,
}

impl NamespaceBindings {
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }
}

/// Compile-time context. Frozen into a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticContext {
    pub dialect: Dialect,
    pub default_element_namespace: Option<String>,
    pub namespaces: NamespaceBindings,
    pub in_scope_variables: BTreeSet<String>,
}

impl Default for StaticContext {
    fn default() -> Self {
        let mut namespaces = NamespaceBindings::default();
        namespaces.by_prefix.insert("xml".to_owned(), XML_NAMESPACE.to_owned());
        Self {
            dialect: Dialect::default(),
            default_element_namespace: None,
            namespaces,
            in_scope_variables: BTreeSet::new(),
        }
    }
}

impl StaticContext {
    pub fn is_declared(&self, variable: &str) -> bool {
        self.in_scope_variables.contains(variable)
    }
}

/// Builder for [`StaticContext`]. The implicit `xml` binding cannot be replaced.
#[derive(Debug, Default)]
pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.ctx.dialect = dialect;
        self
    }

    pub fn with_default_element_namespace(mut self, uri: impl Into<String>) -> Self {
        self.ctx.default_element_namespace = Some(uri.into());
        self
    }

    /// Registers a prefix. Attempts to rebind `xml` are ignored.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if prefix == "xml" {
            return self;
        }
        self.ctx.namespaces.by_prefix.insert(prefix, uri.into());
        self
    }

    /// Declares an external variable the expression may reference.
    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.ctx.in_scope_variables.insert(name.into());
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// Evaluation-time context: focus and variable values.
#[derive(Debug, Clone)]
pub struct DynamicContext<N> {
    pub context_item: Option<XdmItem<N>>,
    pub variables: IndexMap<String, XdmValue<N>>,
}

impl<N> Default for DynamicContext<N> {
    fn default() -> Self {
        Self { context_item: None, variables: IndexMap::new() }
    }
}

impl<N> DynamicContext<N> {
    pub fn variable(&self, name: &str) -> Option<&XdmValue<N>> {
        self.variables.get(name)
    }
}

pub struct DynamicContextBuilder<N> {
    ctx: DynamicContext<N>,
}

impl<N> Default for DynamicContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> DynamicContextBuilder<N> {
    pub fn new() -> Self {
        Self { ctx: DynamicContext::default() }
    }

    pub fn with_context_item(mut self, item: impl Into<XdmItem<N>>) -> Self {
        self.ctx.context_item = Some(item.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: XdmValue<N>) -> Self {
        self.ctx.variables.insert(name.into(), value);
        self
    }

    pub fn build(self) -> DynamicContext<N> {
        self.ctx
    }
}
