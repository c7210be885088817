//! Tester registry: `CreateTester(name, params)` in spec terms.
//!
//! Same construction-on-first-use registry shape as [`crate::filters`].

use crate::error::{EngineError, EngineResult};
use crate::value::InternalValue;
use ahash::AHashMap;
use std::sync::LazyLock;

pub type TesterFn = fn(&InternalValue, &[InternalValue]) -> bool;

static TESTER_TABLE: LazyLock<AHashMap<&'static str, TesterFn>> = LazyLock::new(|| {
    let mut m: AHashMap<&'static str, TesterFn> = AHashMap::default();
    m.insert("defined", |v, _| !v.is_empty_value());
    m.insert("odd", |v, _| v.as_integer().is_some_and(|i| i % 2 != 0));
    m.insert("even", |v, _| v.as_integer().is_some_and(|i| i % 2 == 0));
    m.insert("string", |v, _| v.is_string());
    m.insert("number", |v, _| v.is_number());
    m.insert("sequence", |v, _| v.is_sequence());
    m.insert("mapping", |v, _| v.is_mapping());
    m.insert("equalto", |v, params| {
        params.first().is_some_and(|p| values_equal(v, p))
    });
    m.insert("in", |v, params| {
        params.first().is_some_and(|haystack| value_in(haystack, v))
    });
    m
});

fn values_equal(a: &InternalValue, b: &InternalValue) -> bool {
    matches!(crate::ops::apply_binary(crate::ops::BinaryOp::Eq, a, b), InternalValue::Boolean(true))
}

fn value_in(haystack: &InternalValue, needle: &InternalValue) -> bool {
    match haystack {
        InternalValue::List(l) => l.iter().any(|v| values_equal(&v, needle)),
        InternalValue::Map(m) => needle.as_text().is_some_and(|k| m.contains_key(&k)),
        _ => match (haystack.as_text(), needle.as_text()) {
            (Some(h), Some(n)) => h.contains(&n),
            _ => false,
        },
    }
}

pub struct TesterRegistry;

impl TesterRegistry {
    pub fn with_builtins() -> Self {
        Self
    }

    pub fn create(&self, name: &str) -> EngineResult<()> {
        if TESTER_TABLE.contains_key(name) {
            Ok(())
        } else {
            Err(EngineError::UnknownTester { name: name.to_string() })
        }
    }

    pub fn test(&self, name: &str, value: &InternalValue, params: &[InternalValue]) -> bool {
        TESTER_TABLE.get(name).is_some_and(|f| f(value, params))
    }
}

impl Default for TesterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_even_distinguish_parity() {
        let reg = TesterRegistry::with_builtins();
        assert!(reg.test("odd", &InternalValue::Integer(3), &[]));
        assert!(reg.test("even", &InternalValue::Integer(4), &[]));
        assert!(!reg.test("odd", &InternalValue::Integer(4), &[]));
    }

    #[test]
    fn defined_is_false_for_empty() {
        let reg = TesterRegistry::with_builtins();
        assert!(!reg.test("defined", &InternalValue::Empty, &[]));
        assert!(reg.test("defined", &InternalValue::Integer(0), &[]));
    }

    #[test]
    fn unknown_tester_fails_at_construction() {
        let reg = TesterRegistry::with_builtins();
        assert!(reg.create("no_such_tester").is_err());
    }
}
