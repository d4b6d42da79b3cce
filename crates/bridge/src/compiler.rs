use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use xqbridge_engine::{Dialect, QueryEngine, StaticContext, StaticContextBuilder};

use crate::error::CompileError;

/// Key under which a namespace map may carry the default element namespace.
/// It is never passed on as a prefix.
pub const DEFAULT_ELEMENT_NAMESPACE_KEY: &str = "$default-element-namespace";

/// Prefix to namespace URI bindings handed to [`compile`].
pub type NamespaceMap = BTreeMap<String, String>;

/// Compiled, immutable expression. Cheap to clone and free of any document
/// affinity, so one compiled query serves any number of executions.
pub struct CompiledQuery<E: QueryEngine> {
    inner: Arc<CompiledInner<E>>,
}

struct CompiledInner<E: QueryEngine> {
    engine: Arc<E>,
    compiled: E::Compiled,
    source: String,
    text: String,
    context_variable: String,
    static_ctx: StaticContext,
}

impl<E: QueryEngine> CompiledQuery<E> {
    pub fn engine(&self) -> &Arc<E> {
        &self.inner.engine
    }

    pub fn compiled(&self) -> &E::Compiled {
        &self.inner.compiled
    }

    /// Expression text as supplied by the caller.
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Expression text as handed to the engine.
    pub fn text(&self) -> &str {
        &self.inner.text
    }

    pub fn context_variable(&self) -> &str {
        &self.inner.context_variable
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.static_ctx.dialect
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.inner.static_ctx
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E: QueryEngine> Clone for CompiledQuery<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: QueryEngine> fmt::Debug for CompiledQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("text", &self.inner.text)
            .field("context_variable", &self.inner.context_variable)
            .field("dialect", &self.inner.static_ctx.dialect)
            .finish_non_exhaustive()
    }
}

/// Compiles `text` with `context_variable` bound to the node a later execution
/// runs against.
///
/// Without a `prolog_boundary` the text is a path expression and the variable
/// is declared through the static context. With one, the text is a full query
/// and `declare variable $<context_variable> external;` is spliced in at that
/// offset, between the caller's prolog and the query body.
///
/// # Panics
///
/// If `context_variable` starts with `.`, which would make it a relative path.
pub fn compile<E: QueryEngine>(
    engine: &Arc<E>,
    text: &str,
    context_variable: &str,
    namespaces: &NamespaceMap,
    default_element_namespace: Option<&str>,
    prolog_boundary: Option<usize>,
) -> Result<CompiledQuery<E>, CompileError> {
    compile_with_variables(engine, text, context_variable, namespaces, default_element_namespace, prolog_boundary, &[])
}

/// [`compile`], additionally declaring `variables` as external variables.
pub fn compile_with_variables<E: QueryEngine>(
    engine: &Arc<E>,
    text: &str,
    context_variable: &str,
    namespaces: &NamespaceMap,
    default_element_namespace: Option<&str>,
    prolog_boundary: Option<usize>,
    variables: &[String],
) -> Result<CompiledQuery<E>, CompileError> {
    assert!(
        !context_variable.starts_with('.'),
        "context variable must not start with '.', got {context_variable:?}"
    );

    let dialect = if prolog_boundary.is_some() { Dialect::Query } else { Dialect::Path };
    let mut builder = StaticContextBuilder::new().with_dialect(dialect);
    let default_ns = default_element_namespace.or_else(|| namespaces.get(DEFAULT_ELEMENT_NAMESPACE_KEY).map(String::as_str));
    if let Some(ns) = default_ns {
        builder = builder.with_default_element_namespace(ns);
    }
    for (prefix, uri) in namespaces.iter().filter(|(prefix, _)| prefix.as_str() != DEFAULT_ELEMENT_NAMESPACE_KEY) {
        builder = builder.with_namespace(prefix.as_str(), uri.as_str());
    }
    for variable in variables {
        builder = builder.with_variable(variable.as_str());
    }

    let engine_text = match prolog_boundary {
        None => {
            builder = builder.with_variable(context_variable);
            text.to_owned()
        }
        Some(offset) => splice_context_declaration(text, offset, context_variable)?,
    };
    let static_ctx = builder.build();

    let compiled = engine.compile(&engine_text, &static_ctx).map_err(|source| CompileError::Engine {
        expression: text.to_owned(),
        context_variable: context_variable.to_owned(),
        source,
    })?;
    tracing::debug!(context_variable, ?dialect, "compiled query");

    Ok(CompiledQuery {
        inner: Arc::new(CompiledInner {
            engine: Arc::clone(engine),
            compiled,
            source: text.to_owned(),
            text: engine_text,
            context_variable: context_variable.to_owned(),
            static_ctx,
        }),
    })
}

fn splice_context_declaration(text: &str, offset: usize, context_variable: &str) -> Result<String, CompileError> {
    if !text.is_char_boundary(offset) {
        return Err(CompileError::PrologBoundary { offset, len: text.len() });
    }
    let (prolog, body) = text.split_at(offset);
    Ok(format!("{prolog}declare variable ${context_variable} external; {body}"))
}

/// Byte length of a string literal or comment at the start of `s`.
/// Unterminated ones extend to the end.
fn opaque_len(s: &str) -> Option<usize> {
    let quote = s.chars().next().filter(|c| matches!(c, '"' | '\''));
    if let Some(quote) = quote {
        let mut chars = s.char_indices().skip(1).peekable();
        while let Some((i, c)) = chars.next() {
            if c == quote {
                if chars.peek().is_some_and(|(_, next)| *next == quote) {
                    chars.next();
                    continue;
                }
                return Some(i + 1);
            }
        }
        return Some(s.len());
    }
    if !s.starts_with("(:") {
        return None;
    }
    let mut depth = 0usize;
    let mut i = 0;
    while i < s.len() {
        let rest = &s[i..];
        if rest.starts_with("(:") {
            depth += 1;
            i += 2;
        } else if rest.starts_with(":)") {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return Some(i);
            }
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    Some(s.len())
}

fn skip_trivia(s: &str, mut at: usize) -> usize {
    loop {
        let rest = &s[at..];
        let trimmed = rest.trim_start();
        at += rest.len() - trimmed.len();
        match opaque_len(trimmed) {
            Some(len) if trimmed.starts_with("(:") => at += len,
            _ => return at,
        }
    }
}

fn statement_end(s: &str, from: usize) -> Option<usize> {
    let mut i = from;
    while i < s.len() {
        let rest = &s[i..];
        if let Some(len) = opaque_len(rest) {
            i += len;
            continue;
        }
        let c = rest.chars().next()?;
        if c == ';' {
            return Some(i + 1);
        }
        i += c.len_utf8();
    }
    None
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    s.strip_prefix(keyword).and_then(|rest| rest.chars().next()).is_some_and(char::is_whitespace)
}

/// Offset separating a query's prolog (version declaration and `declare`
/// statements) from its body. `0` when there is no prolog.
pub fn find_prolog_boundary(text: &str) -> usize {
    let mut boundary = 0;
    let mut at = skip_trivia(text, 0);
    while starts_with_keyword(&text[at..], "xquery") || starts_with_keyword(&text[at..], "declare") {
        let Some(end) = statement_end(text, at) else {
            break;
        };
        boundary = end;
        at = skip_trivia(text, end);
    }
    boundary
}
