//! The call-parameter binder: reconciling a caller's [`CallParams`] against
//! a callee's [`ArgumentInfo`] schema to produce [`ParsedArguments`].
//!
//! Grounded directly on the teacher's `Signature::bind` (`signature.rs`):
//! a keyword-first pass that marks schema slots bound-by-name, then a
//! positional-scanning window starting at the first still-unbound mandatory
//! slot, then defaults, then collection of anything left over into
//! `*args`/`**kwargs`-equivalent buckets. The teacher tracks "which slots
//! are still unbound" with a 64-bit bitmap (`bound_params: u64`) because its
//! signatures are compile-time and small; this binder instead uses the two
//! parallel arrays the spec's own design notes call out as the
//! non-heap-allocated equivalent of a linked unbound-chain, since schemas
//! here are built at registration time rather than compiled.

use indexmap::IndexMap;

/// One parameter slot in a callee's schema.
#[derive(Debug, Clone)]
pub enum ArgumentInfo<V> {
    /// A normal named parameter; `default` is `None` for a mandatory slot.
    Named { name: String, default: Option<V> },
    /// `*args` — collects excess positionals. At most one per schema.
    VarPositional,
    /// `**kwargs` — collects excess keywords. At most one per schema.
    VarKeyword,
}

/// The caller's argument bundle, in source order.
#[derive(Debug, Clone, Default)]
pub struct CallParams<V> {
    pub positional: Vec<V>,
    pub keyword: IndexMap<String, V>,
}

impl<V> CallParams<V> {
    pub fn new() -> Self {
        Self { positional: Vec::new(), keyword: IndexMap::new() }
    }
}

/// The result of binding a [`CallParams`] against a schema.
#[derive(Debug, Clone, Default)]
pub struct ParsedArguments<V> {
    pub args: IndexMap<String, V>,
    pub extra_pos_args: Vec<V>,
    pub extra_kw_args: IndexMap<String, V>,
    pub succeeded: bool,
    /// Mandatory parameter names left unbound — populated only when
    /// `succeeded` is false, for the caller's diagnostic logging.
    pub missing: Vec<String>,
}

/// Binds `call` against `schema`. Never panics; on any mismatch returns
/// `succeeded = false` with whatever could still be determined, matching
/// §7's policy that `ArgMismatch` is the caller's problem to surface, not
/// this function's to raise.
pub fn bind<V: Clone>(schema: &[ArgumentInfo<V>], call: CallParams<V>) -> ParsedArguments<V> {
    let named_slots: Vec<(usize, &str, &Option<V>)> = schema
        .iter()
        .enumerate()
        .filter_map(|(i, a)| match a {
            ArgumentInfo::Named { name, default } => Some((i, name.as_str(), default)),
            _ => None,
        })
        .collect();

    let var_positional = schema.iter().any(|a| matches!(a, ArgumentInfo::VarPositional));
    let var_keyword = schema.iter().any(|a| matches!(a, ArgumentInfo::VarKeyword));

    // bound[i] tracks whether named_slots[i] has been filled (by keyword or
    // positional) — the parallel-array stand-in for the unbound chain.
    let mut bound = vec![false; named_slots.len()];
    let mut values: Vec<Option<V>> = vec![None; named_slots.len()];
    let mut extra_kw_args = IndexMap::new();

    // Pass 1: keywords, by name. A keyword with no matching slot lands in
    // `extra_kw_args` regardless of whether `**kwargs` exists to catch it —
    // `extras_ok` below is what actually turns that into a failed bind.
    for (key, value) in call.keyword {
        if let Some(slot) = named_slots.iter().position(|(_, name, _)| *name == key) {
            bound[slot] = true;
            values[slot] = Some(value);
        } else {
            extra_kw_args.insert(key, value);
        }
    }

    // Pass 2: positionals fill the first unbound slot in order, skipping
    // slots keywords already claimed (tie-break: keyword binding wins).
    let mut extra_pos_args = Vec::new();
    let mut pos_iter = call.positional.into_iter();
    for slot in 0..named_slots.len() {
        if bound[slot] {
            continue;
        }
        match pos_iter.next() {
            Some(v) => {
                bound[slot] = true;
                values[slot] = Some(v);
            }
            None => break,
        }
    }
    // Anything left over after the window lands in `extra_pos_args`; as
    // with keywords above, whether that's fine is decided by `extras_ok`.
    extra_pos_args.extend(pos_iter);

    // Pass 3: defaults for anything still unbound.
    for (slot, (_, _, default)) in named_slots.iter().enumerate() {
        if !bound[slot] {
            if let Some(d) = default {
                values[slot] = Some(d.clone());
                bound[slot] = true;
            }
        }
    }

    let mut missing = Vec::new();
    let mut args = IndexMap::new();
    for (slot, (_, name, _)) in named_slots.iter().enumerate() {
        if let Some(v) = values[slot].take() {
            args.insert((*name).to_string(), v);
        } else {
            missing.push((*name).to_string());
        }
    }

    let extras_ok = (extra_pos_args.is_empty() || var_positional)
        && (extra_kw_args.is_empty() || var_keyword);
    let succeeded = missing.is_empty() && extras_ok;

    ParsedArguments { args, extra_pos_args, extra_kw_args, succeeded, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn named(name: &str, default: Option<i64>) -> ArgumentInfo<i64> {
        ArgumentInfo::Named { name: name.to_string(), default }
    }

    #[test]
    fn keyword_binds_before_positional_window() {
        let schema = vec![named("a", None), named("b", None), named("c", Some(3))];
        let mut call = CallParams::new();
        call.positional.push(10);
        call.keyword.insert("b".to_string(), 20);
        let parsed = bind(&schema, call);
        assert!(parsed.succeeded);
        assert_eq!(parsed.args["a"], 10);
        assert_eq!(parsed.args["b"], 20);
        assert_eq!(parsed.args["c"], 3);
    }

    #[test]
    fn keyword_bound_slot_is_never_overwritten_by_positional() {
        let schema = vec![named("a", None), named("b", None)];
        let mut call = CallParams::new();
        call.keyword.insert("a".to_string(), 99);
        call.positional.push(1);
        call.positional.push(2);
        let parsed = bind(&schema, call);
        assert_eq!(parsed.args["a"], 99);
        assert_eq!(parsed.args["b"], 1);
        assert_eq!(parsed.extra_pos_args, vec![2]);
        assert!(!parsed.succeeded);
    }

    #[test]
    fn missing_mandatory_param_fails_bind() {
        let schema = vec![named("a", None)];
        let call: CallParams<i64> = CallParams::new();
        let parsed = bind(&schema, call);
        assert!(!parsed.succeeded);
        assert_eq!(parsed.missing, vec!["a".to_string()]);
    }

    #[test]
    fn extra_keyword_without_var_keyword_fails() {
        let schema = vec![named("a", None)];
        let mut call = CallParams::new();
        call.keyword.insert("a".to_string(), 1);
        call.keyword.insert("surprise".to_string(), 2);
        let parsed = bind(&schema, call);
        assert!(!parsed.succeeded);
        assert_eq!(parsed.extra_kw_args["surprise"], 2);
    }
}
