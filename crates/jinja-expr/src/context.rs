//! [`RenderContext`]: the scope stack, value pool handle, and renderer
//! sink threaded through one render.
//!
//! Grounded loosely on the map-adapter shape in the teacher's
//! `types/dict.rs`, but the scoping discipline itself comes from the
//! spec rather than the teacher's `namespace.rs` — that file resolves
//! Python's compile-time, slot-indexed scoping (`NamespaceId`), which
//! doesn't fit a Jinja-style name-keyed lookup that walks its scope stack
//! at render time. Each scope here is a plain name → value map; resolution
//! walks the stack top-down and stops at the first hit, falling through to
//! an empty value (never an error) on a full miss, per §7's `UnknownName`
//! row.

use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

use crate::config::EngineConfig;
use crate::pool::{InternalValueDataPool, ValueId};
use crate::value::InternalValue;

/// The output sink a `Render` call writes through — `GetRendererCallback()`
/// in operation terms. A host embeds one of these to receive rendered text
/// incrementally instead of collecting a full `String` from `eval`.
pub trait RendererCallback {
    fn write(&mut self, text: &str);
}

pub struct RenderContext<'a> {
    scopes: Vec<IndexMap<Rc<str>, InternalValue>>,
    /// Pool ids allocated while each scope was active; freed in one batch
    /// when that scope exits via `leave_scope`.
    scope_temporaries: Vec<Vec<ValueId>>,
    config: &'a EngineConfig,
    call_depth: u32,
    pool: InternalValueDataPool,
    renderer: Option<Box<dyn RendererCallback>>,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            scopes: vec![IndexMap::new()],
            scope_temporaries: vec![Vec::new()],
            config,
            call_depth: 0,
            pool: InternalValueDataPool::new(),
            renderer: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// The value pool handle (`GetPool()`): derived expression results
    /// (subscripts, filter chain steps) allocate into it so their
    /// `temporary`/`parent_ref` lifetime is tracked by something other than
    /// `Rc` clone semantics alone.
    pub fn pool(&self) -> &InternalValueDataPool {
        &self.pool
    }

    /// Registers `value` in the pool as a plain (non-temporary) entry and
    /// returns its id, for use as a `parent_ref` by a later temporary.
    pub fn track_value(&mut self, value: InternalValue) -> ValueId {
        self.pool.alloc(value)
    }

    /// Registers `value` as a temporary derived from `parent`, and ties its
    /// lifetime to the current scope: it is freed automatically the next
    /// time that scope exits via `leave_scope`.
    pub fn track_temporary(&mut self, value: InternalValue, parent: Option<ValueId>) -> ValueId {
        let id = self.pool.alloc_temporary(value, parent);
        self.scope_temporaries
            .last_mut()
            .expect("root scope always exists")
            .push(id);
        id
    }

    /// Installs the sink `Render` calls write through.
    pub fn set_renderer(&mut self, callback: Box<dyn RendererCallback>) {
        self.renderer = Some(callback);
    }

    /// `GetRendererCallback()`: the sink installed via [`Self::set_renderer`],
    /// if any.
    pub fn renderer_callback(&mut self) -> Option<&mut dyn RendererCallback> {
        self.renderer.as_deref_mut()
    }

    /// Pushes a new, empty lexical scope. Must be paired with
    /// [`Self::leave_scope`] — scopes nest strictly, never interleave.
    pub fn enter_scope(&mut self) {
        self.scopes.push(IndexMap::new());
        self.scope_temporaries.push(Vec::new());
    }

    pub fn leave_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "leave_scope without a matching enter_scope");
        self.scopes.pop();
        if let Some(ids) = self.scope_temporaries.pop() {
            for id in ids {
                self.pool.free(id);
            }
        }
    }

    pub fn set(&mut self, name: impl Into<Rc<str>>, value: InternalValue) {
        let scope = self.scopes.last_mut().expect("at least the root scope always exists");
        scope.insert(name.into(), value);
    }

    /// Top-down search through the scope stack; an unresolved name is
    /// silent (`Empty`), matching §7's `UnknownName` row exactly — this is
    /// the one place that row's logging happens.
    pub fn find(&self, name: &str) -> InternalValue {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = scope.get(name) {
                return v.clone();
            }
        }
        debug!(name, "unresolved name in expression; evaluating to empty");
        InternalValue::Empty
    }

    /// Tracks recursion depth through user callables; returns `false` once
    /// `max_call_depth` is reached so the caller can fail the call rather
    /// than overflow the Rust stack.
    pub fn enter_call(&mut self) -> bool {
        if self.call_depth >= self.config.max_call_depth {
            return false;
        }
        self.call_depth += 1;
        true
    }

    pub fn leave_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inner_scope_shadows_outer() {
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        ctx.set("x", InternalValue::Integer(1));
        ctx.enter_scope();
        ctx.set("x", InternalValue::Integer(2));
        assert!(matches!(ctx.find("x"), InternalValue::Integer(2)));
        ctx.leave_scope();
        assert!(matches!(ctx.find("x"), InternalValue::Integer(1)));
    }

    #[test]
    fn unresolved_name_is_empty() {
        let config = EngineConfig::default();
        let ctx = RenderContext::new(&config);
        assert!(matches!(ctx.find("nope"), InternalValue::Empty));
    }

    #[test]
    fn call_depth_cap_trips() {
        let mut config = EngineConfig::default();
        config.max_call_depth = 1;
        let mut ctx = RenderContext::new(&config);
        assert!(ctx.enter_call());
        assert!(!ctx.enter_call());
        ctx.leave_call();
        assert!(ctx.enter_call());
    }

    #[test]
    fn temporaries_freed_on_scope_exit() {
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        let parent = ctx.track_value(InternalValue::narrow("hello"));
        ctx.enter_scope();
        ctx.track_temporary(InternalValue::narrow("he"), Some(parent));
        assert_eq!(ctx.pool().len(), 2);
        ctx.leave_scope();
        assert_eq!(ctx.pool().len(), 1);
    }

    struct BufSink(std::rc::Rc<std::cell::RefCell<String>>);
    impl RendererCallback for BufSink {
        fn write(&mut self, text: &str) {
            self.0.borrow_mut().push_str(text);
        }
    }

    #[test]
    fn renderer_callback_is_retrievable_after_set() {
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        assert!(ctx.renderer_callback().is_none());
        let buf = std::rc::Rc::new(std::cell::RefCell::new(String::new()));
        ctx.set_renderer(Box::new(BufSink(buf.clone())));
        ctx.renderer_callback().unwrap().write("hi");
        assert_eq!(buf.borrow().as_str(), "hi");
    }
}
