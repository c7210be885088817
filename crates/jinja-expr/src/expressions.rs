//! The expression node tree and its evaluator.
//!
//! Grounded on the shape of the teacher's `Expr` enum (`expressions.rs`):
//! a flat tagged enum, child expressions boxed so the enum itself stays
//! small, calls carrying a name plus a boxed argument bundle rather than a
//! pre-resolved callable. The teacher resolves names at compile time into
//! `NameScope`-tagged `Identifier`s; this tree instead defers name
//! resolution to render time through [`crate::context::RenderContext::find`],
//! since there is no separate compile step here — `ValueRefExpression`
//! just carries the bare name.

use crate::args::{bind, CallParams};
use crate::context::RenderContext;
use crate::filters::FilterRegistry;
use crate::ops::{apply_binary, apply_unary, BinaryOp, UnaryOp};
use crate::testers::TesterRegistry;
use crate::value::{CallableKind, InternalValue, ListAdapter, SpecialFn};
use indexmap::IndexMap;

/// Bundles the two registries an evaluation needs alongside the render
/// context, so `eval` doesn't grow an ever-longer parameter list as more
/// expression kinds need lookups.
pub struct Registries<'a> {
    pub filters: &'a FilterRegistry,
    pub testers: &'a TesterRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// One step in a `FilteredExpression`'s chain: a filter name plus its own
/// (unevaluated) argument expressions.
#[derive(Debug, Clone)]
pub struct FilterStep {
    pub name: String,
    pub args: CallParams<Expr>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Constant(InternalValue),
    /// Silent on a miss — resolves to `Empty`, never raises. See §7.
    ValueRef(String),
    Subscript { base: Box<Expr>, index: Box<Expr> },
    /// Filters apply in source order: `m_parentFilter` (the first entry)
    /// runs before `this` (the last), so the chain here is just a `Vec`
    /// walked front-to-back.
    Filtered { base: Box<Expr>, chain: Vec<FilterStep> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Logical { op: LogicalOp, lhs: Box<Expr>, rhs: Box<Expr> },
    In { needle: Box<Expr>, haystack: Box<Expr> },
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Is { operand: Box<Expr>, tester: String, params: Vec<Expr> },
    If { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr> },
    /// A primary expression with an optional `if` guard — the top-level
    /// shape of an `{{ expr if cond }}` output statement.
    Full { primary: Box<Expr>, guard: Option<Box<Expr>> },
    Call { name: String, args: CallParams<Expr> },
}

impl Expr {
    pub fn eval(&self, ctx: &mut RenderContext, reg: &Registries) -> InternalValue {
        match self {
            Expr::Constant(v) => v.clone(),
            Expr::ValueRef(name) => ctx.find(name),
            Expr::Subscript { base, index } => {
                let base_val = base.eval(ctx, reg);
                let index_val = index.eval(ctx, reg);
                let base_id = ctx.track_temporary(base_val.clone(), None);
                let result = subscript(&base_val, &index_val);
                ctx.track_temporary(result.clone(), Some(base_id));
                result
            }
            Expr::Filtered { base, chain } => {
                let mut current = base.eval(ctx, reg);
                // Each step's result is tracked as a temporary parented to
                // the previous one, so the whole chain's intermediate
                // values are freed together when the enclosing scope exits
                // rather than relying solely on `Rc` drop timing.
                let mut parent_id = ctx.track_temporary(current.clone(), None);
                for step in chain {
                    let args = eval_call_params(&step.args, ctx, reg);
                    current =
                        reg.filters.apply(&step.name, &current, args, ctx.config(), reg.testers);
                    parent_id = ctx.track_temporary(current.clone(), Some(parent_id));
                }
                current
            }
            Expr::Unary { op, operand } => apply_unary(*op, &operand.eval(ctx, reg)),
            Expr::Binary { op, lhs, rhs } => {
                apply_binary(*op, &lhs.eval(ctx, reg), &rhs.eval(ctx, reg))
            }
            Expr::Logical { op, lhs, rhs } => eval_logical(*op, lhs, rhs, ctx, reg),
            Expr::In { needle, haystack } => {
                let needle_val = needle.eval(ctx, reg);
                let haystack_val = haystack.eval(ctx, reg);
                InternalValue::Boolean(contains(&haystack_val, &needle_val))
            }
            Expr::Tuple(items) => InternalValue::List(ListAdapter::from_vec(
                items.iter().map(|e| e.eval(ctx, reg)).collect(),
            )),
            Expr::Dict(pairs) => {
                let mut map = IndexMap::new();
                for (k, v) in pairs {
                    if let Some(key) = k.eval(ctx, reg).as_text() {
                        map.insert(key.into(), v.eval(ctx, reg));
                    }
                }
                InternalValue::Map(crate::value::MapAdapter::new(map))
            }
            Expr::Is { operand, tester, params } => {
                let value = operand.eval(ctx, reg);
                let param_values: Vec<InternalValue> =
                    params.iter().map(|p| p.eval(ctx, reg)).collect();
                InternalValue::Boolean(reg.testers.test(tester, &value, &param_values))
            }
            Expr::If { cond, then_branch, else_branch } => {
                if cond.eval(ctx, reg).is_truthy() {
                    then_branch.eval(ctx, reg)
                } else {
                    else_branch.eval(ctx, reg)
                }
            }
            Expr::Full { primary, guard } => match guard {
                Some(g) if !g.eval(ctx, reg).is_truthy() => InternalValue::Empty,
                _ => primary.eval(ctx, reg),
            },
            Expr::Call { name, args } => eval_call(name, args, ctx, reg),
        }
    }

    /// Writes this expression's rendered text straight to the context's
    /// renderer callback — the counterpart to `eval`, which hands the
    /// caller a value instead of a side effect. A guard that evaluates
    /// false (`Full { guard: Some(_), .. }`) writes nothing.
    pub fn render(&self, ctx: &mut RenderContext, reg: &Registries) {
        let value = self.eval(ctx, reg);
        let text = value.render_to_string();
        if let Some(sink) = ctx.renderer_callback() {
            sink.write(&text);
        }
    }
}

fn eval_call_params(
    params: &CallParams<Expr>,
    ctx: &mut RenderContext,
    reg: &Registries,
) -> CallParams<InternalValue> {
    let mut out = CallParams::new();
    for p in &params.positional {
        out.positional.push(p.eval(ctx, reg));
    }
    for (k, v) in &params.keyword {
        out.keyword.insert(k.clone(), v.eval(ctx, reg));
    }
    out
}

fn eval_logical(
    op: LogicalOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &mut RenderContext,
    reg: &Registries,
) -> InternalValue {
    let lhs_val = lhs.eval(ctx, reg);
    match op {
        LogicalOp::And => {
            if lhs_val.is_truthy() {
                rhs.eval(ctx, reg)
            } else {
                lhs_val
            }
        }
        LogicalOp::Or => {
            if lhs_val.is_truthy() {
                lhs_val
            } else {
                rhs.eval(ctx, reg)
            }
        }
    }
}

fn contains(haystack: &InternalValue, needle: &InternalValue) -> bool {
    match haystack {
        InternalValue::List(l) => l.iter().any(|v| values_equal(&v, needle)),
        InternalValue::Map(m) => needle.as_text().is_some_and(|k| m.contains_key(&k)),
        _ => match (haystack.as_text(), needle.as_text()) {
            (Some(h), Some(n)) => h.contains(&n),
            _ => false,
        },
    }
}

fn values_equal(a: &InternalValue, b: &InternalValue) -> bool {
    matches!(apply_binary(BinaryOp::Eq, a, b), InternalValue::Boolean(true))
}

/// Subscripting: list index (negative indexes from the end), map key, or
/// string character index. Out-of-range is `Empty`, never a panic.
fn subscript(base: &InternalValue, index: &InternalValue) -> InternalValue {
    match base {
        InternalValue::List(l) => {
            let Some(raw) = index.as_integer() else { return InternalValue::Empty };
            let len = l.len() as i64;
            let i = if raw < 0 { raw + len } else { raw };
            if i < 0 || i >= len {
                InternalValue::Empty
            } else {
                l.get(i as usize)
            }
        }
        InternalValue::Map(m) => index.as_text().map_or(InternalValue::Empty, |k| m.get(&k)),
        _ if base.is_string() => {
            let Some(text) = base.as_text() else { return InternalValue::Empty };
            let Some(raw) = index.as_integer() else { return InternalValue::Empty };
            let chars: Vec<char> = text.chars().collect();
            let len = chars.len() as i64;
            let i = if raw < 0 { raw + len } else { raw };
            if i < 0 || i >= len {
                InternalValue::Empty
            } else {
                InternalValue::target_string(chars[i as usize].to_string())
            }
        }
        _ => InternalValue::Empty,
    }
}

/// Resolves a call target name to a built-in special function, if it is
/// one — the only two are `range` and `loop.cycle`. Anything else falls
/// through to a render-context lookup in [`eval_call`].
fn resolve_special(name: &str) -> Option<SpecialFn> {
    match name {
        "range" => Some(SpecialFn::RangeFn),
        "loop.cycle" => Some(SpecialFn::LoopCycleFn),
        _ => None,
    }
}

/// Call dispatch: a name is first checked against the built-in special
/// functions (`range`, `loop.cycle`); anything else resolves through the
/// render context, and a `Callable` value found there goes through the
/// same call-parameter binder `call_callable` uses. A name that resolves
/// to neither is empty, per §7.
fn eval_call(
    name: &str,
    args: &CallParams<Expr>,
    ctx: &mut RenderContext,
    reg: &Registries,
) -> InternalValue {
    let evaluated = eval_call_params(args, ctx, reg);
    if let Some(special) = resolve_special(name) {
        let kind = CallableKind::SpecialFn(special);
        tracing::trace!(?kind, "dispatching built-in call");
        return match special {
            SpecialFn::RangeFn => eval_range(&evaluated),
            SpecialFn::LoopCycleFn => eval_loop_cycle(&evaluated, ctx),
        };
    }
    // Anything else resolves through the render context: a plain value
    // means `name(...)` was never callable, so it's empty per §7; a
    // `Callable` goes through the same binder `ArgMismatch` uses elsewhere.
    match ctx.find(name) {
        InternalValue::Callable(callable) => call_callable(&callable, evaluated, ctx),
        _ => InternalValue::Empty,
    }
}

fn call_callable(
    callable: &crate::value::Callable,
    args: CallParams<InternalValue>,
    ctx: &mut RenderContext,
) -> InternalValue {
    if !ctx.enter_call() {
        return InternalValue::Empty;
    }
    let parsed = bind(&callable.schema, args);
    let result = if parsed.succeeded {
        match &callable.body {
            crate::value::CallableBody::Expression(f) => f(&parsed),
        }
    } else {
        tracing::warn!(missing = ?parsed.missing, "call argument binding failed");
        InternalValue::Empty
    };
    ctx.leave_call();
    result
}

fn eval_range(args: &CallParams<InternalValue>) -> InternalValue {
    let nums: Vec<i64> = args.positional.iter().filter_map(InternalValue::as_integer).collect();
    let (start, stop, step) = match nums.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] if *step != 0 => (*start, *stop, *step),
        _ => return InternalValue::Empty,
    };
    let len = if step > 0 {
        ((stop - start).max(0) + step - 1) / step
    } else {
        ((start - stop).max(0) + (-step) - 1) / (-step)
    };
    InternalValue::List(ListAdapter::generated(len.max(0) as usize, move |i| {
        InternalValue::Integer(start + step * i as i64)
    }))
}

/// `loop.cycle(*args)`: reads `index0` off the `loop` value in the current
/// scope, then returns `args[index0 mod len(args)]`. Empty if there's no
/// enclosing `loop` variable or it was called with no arguments.
fn eval_loop_cycle(args: &CallParams<InternalValue>, ctx: &RenderContext) -> InternalValue {
    if args.positional.is_empty() {
        return InternalValue::Empty;
    }
    let index0 = match ctx.find("loop") {
        InternalValue::Map(m) => m.get("index0").as_integer(),
        _ => None,
    };
    let Some(index0) = index0 else { return InternalValue::Empty };
    let len = args.positional.len() as i64;
    let idx = index0.rem_euclid(len) as usize;
    args.positional[idx].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use pretty_assertions::assert_eq;

    fn registries() -> (FilterRegistry, TesterRegistry) {
        (FilterRegistry::with_builtins(), TesterRegistry::with_builtins())
    }

    #[test]
    fn logical_and_short_circuits() {
        let (filters, testers) = registries();
        let reg = Registries { filters: &filters, testers: &testers };
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        let expr = Expr::Logical {
            op: LogicalOp::And,
            lhs: Box::new(Expr::Constant(InternalValue::Boolean(false))),
            rhs: Box::new(Expr::Call { name: "range".into(), args: CallParams::new() }),
        };
        // rhs must never be forced: if it were, `range()` with no args
        // would still just return Empty, so assert on lhs's own value
        // surviving through instead.
        assert!(matches!(expr.eval(&mut ctx, &reg), InternalValue::Boolean(false)));
    }

    #[test]
    fn negative_index_counts_from_end() {
        let (filters, testers) = registries();
        let reg = Registries { filters: &filters, testers: &testers };
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        let list = Expr::Tuple(vec![
            Expr::Constant(InternalValue::Integer(1)),
            Expr::Constant(InternalValue::Integer(2)),
            Expr::Constant(InternalValue::Integer(3)),
        ]);
        let expr = Expr::Subscript {
            base: Box::new(list),
            index: Box::new(Expr::Constant(InternalValue::Integer(-1))),
        };
        assert!(matches!(expr.eval(&mut ctx, &reg), InternalValue::Integer(3)));
    }

    #[test]
    fn range_builtin_generates_lazily() {
        let (filters, testers) = registries();
        let reg = Registries { filters: &filters, testers: &testers };
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        let mut args = CallParams::new();
        args.positional.push(Expr::Constant(InternalValue::Integer(5)));
        let expr = Expr::Call { name: "range".into(), args };
        let InternalValue::List(list) = expr.eval(&mut ctx, &reg) else {
            panic!("expected list");
        };
        assert_eq!(list.materialize().len(), 5);
    }

    #[test]
    fn loop_cycle_reads_index0_from_scope() {
        let (filters, testers) = registries();
        let reg = Registries { filters: &filters, testers: &testers };
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        let mut loop_map = IndexMap::new();
        loop_map.insert("index0".into(), InternalValue::Integer(1));
        ctx.set("loop", InternalValue::Map(crate::value::MapAdapter::new(loop_map)));

        let mut args = CallParams::new();
        args.positional.push(Expr::Constant(InternalValue::narrow("a")));
        args.positional.push(Expr::Constant(InternalValue::narrow("b")));
        args.positional.push(Expr::Constant(InternalValue::narrow("c")));
        let expr = Expr::Call { name: "loop.cycle".into(), args };
        assert_eq!(expr.eval(&mut ctx, &reg).render_to_string(), "b");
    }

    #[test]
    fn filtered_chain_tracks_each_step_as_a_temporary() {
        let (filters, testers) = registries();
        let reg = Registries { filters: &filters, testers: &testers };
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        ctx.enter_scope();
        let expr = Expr::Filtered {
            base: Box::new(Expr::Constant(InternalValue::narrow("  hi  "))),
            chain: vec![FilterStep { name: "trim".into(), args: CallParams::new() }],
        };
        expr.eval(&mut ctx, &reg);
        // base + the one filter step's result were both tracked.
        assert_eq!(ctx.pool().len(), 2);
        ctx.leave_scope();
        assert_eq!(ctx.pool().len(), 0);
    }

    struct BufSink(std::rc::Rc<std::cell::RefCell<String>>);
    impl crate::context::RendererCallback for BufSink {
        fn write(&mut self, text: &str) {
            self.0.borrow_mut().push_str(text);
        }
    }

    #[test]
    fn render_writes_through_renderer_callback() {
        let (filters, testers) = registries();
        let reg = Registries { filters: &filters, testers: &testers };
        let config = EngineConfig::default();
        let mut ctx = RenderContext::new(&config);
        let buf = std::rc::Rc::new(std::cell::RefCell::new(String::new()));
        ctx.set_renderer(Box::new(BufSink(buf.clone())));

        let expr = Expr::Constant(InternalValue::Integer(42));
        expr.render(&mut ctx, &reg);
        assert_eq!(buf.borrow().as_str(), "42");
    }
}
