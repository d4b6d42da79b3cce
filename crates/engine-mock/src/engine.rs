use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use xqbridge_engine::{
    DynamicContext, EngineError, QueryEngine, StaticContext, XdmItem, XdmSequence, XdmValue,
};

use crate::lexer::{self, Prolog};
use crate::node::MockNode;

/// Evaluation callback registered for one expression.
pub type Script = Arc<dyn Fn(&ScriptContext<'_>) -> Result<XdmSequence<MockNode>, EngineError> + Send + Sync>;

/// What a script sees while it runs.
pub struct ScriptContext<'a> {
    pub static_ctx: &'a StaticContext,
    pub dynamic: &'a DynamicContext<MockNode>,
}

impl ScriptContext<'_> {
    /// The focus node of the evaluation.
    pub fn context_node(&self) -> Option<&MockNode> {
        self.dynamic.context_item.as_ref().and_then(XdmItem::as_node)
    }

    pub fn variable(&self, name: &str) -> Option<&XdmValue<MockNode>> {
        self.dynamic.variable(name)
    }

    pub fn default_element_namespace(&self) -> Option<&str> {
        self.static_ctx.default_element_namespace.as_deref()
    }
}

/// Expression compiled by [`ScriptedEngine`].
pub struct MockCompiled {
    pub text: String,
    pub body: String,
    pub static_ctx: StaticContext,
    /// Variables declared in the expression's own prolog.
    pub declared: Vec<String>,
    script: Script,
}

/// Engine whose "evaluation" is a closure registered per expression body.
///
/// Compilation still checks what a real engine would: balanced brackets and
/// literals, that every prefix used is bound and that every variable
/// referenced is declared.
#[derive(Default)]
pub struct ScriptedEngine {
    scripts: RwLock<HashMap<String, Script>>,
    compiled: Mutex<Vec<String>>,
    evaluations: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `script` as the evaluation of the expression body `body`.
    pub fn with_script<F>(self, body: impl Into<String>, script: F) -> Self
    where
        F: Fn(&ScriptContext<'_>) -> Result<XdmSequence<MockNode>, EngineError> + Send + Sync + 'static,
    {
        self.register(body, script);
        self
    }

    pub fn register<F>(&self, body: impl Into<String>, script: F)
    where
        F: Fn(&ScriptContext<'_>) -> Result<XdmSequence<MockNode>, EngineError> + Send + Sync + 'static,
    {
        self.scripts.write().unwrap_or_else(PoisonError::into_inner).insert(body.into(), Arc::new(script));
    }

    /// Every text handed to [`QueryEngine::compile`], in call order.
    pub fn compiled_texts(&self) -> Vec<String> {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn compile_count(&self) -> usize {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn evaluation_count(&self) -> usize {
        self.evaluations.load(Ordering::Acquire)
    }

    fn script_for(&self, body: &str) -> Option<Script> {
        self.scripts.read().unwrap_or_else(PoisonError::into_inner).get(body.trim()).cloned()
    }
}

impl QueryEngine for ScriptedEngine {
    type Node = MockNode;
    type Compiled = MockCompiled;

    fn compile(&self, text: &str, ctx: &StaticContext) -> Result<MockCompiled, EngineError> {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).push(text.to_owned());
        lexer::check_syntax(text)?;
        let Prolog { declared, prefixes, body } = lexer::split_prolog(text);
        for prefix in lexer::prefixes_used(body) {
            if ctx.namespaces.resolve(&prefix).is_none() && !prefixes.contains(&prefix) {
                return Err(EngineError::static_err(format!("namespace prefix '{prefix}' is not bound")));
            }
        }
        for variable in lexer::variables_referenced(body) {
            if !ctx.is_declared(&variable) && !declared.contains(&variable) {
                return Err(EngineError::static_err(format!("variable ${variable} is not declared")));
            }
        }
        let script = self
            .script_for(body)
            .ok_or_else(|| EngineError::static_err(format!("no script registered for '{}'", body.trim())))?;
        tracing::trace!(body = body.trim(), "compiled scripted expression");
        Ok(MockCompiled {
            text: text.to_owned(),
            body: body.trim().to_owned(),
            static_ctx: ctx.clone(),
            declared,
            script,
        })
    }

    fn evaluate(
        &self,
        compiled: &MockCompiled,
        ctx: &DynamicContext<MockNode>,
    ) -> Result<XdmSequence<MockNode>, EngineError> {
        self.evaluations.fetch_add(1, Ordering::AcqRel);
        (compiled.script)(&ScriptContext { static_ctx: &compiled.static_ctx, dynamic: ctx })
    }
}
