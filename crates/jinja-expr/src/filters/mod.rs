//! Filter registry: `CreateFilter(name, params, pool)` in spec terms.
//!
//! Grounded on the registry-plus-dispatch pattern repeated across the
//! teacher's `modules/*.rs` files (each module builds a
//! `static X: OnceLock<Mutex<...>>` map once, then dispatches a call by
//! name through it) — here realized as a `LazyLock<AHashMap<&str, ...>>`
//! built once per process, matching `intern.rs`'s `ASCII_STRS` construction
//! style rather than the `OnceLock<Mutex<_>>` ones, since these tables are
//! read-only after construction.

pub mod collection;
pub mod string;

use crate::args::CallParams;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::testers::TesterRegistry;
use crate::value::InternalValue;
use ahash::AHashMap;
use std::sync::LazyLock;

/// `select`/`reject` need the tester registry (they dispatch a tester by
/// name per element), so every filter takes one even though most ignore it —
/// a single uniform signature the registry table can hold without an enum.
pub type FilterFn =
    fn(&InternalValue, &CallParams<InternalValue>, &EngineConfig, &TesterRegistry) -> InternalValue;

static FILTER_TABLE: LazyLock<AHashMap<&'static str, FilterFn>> = LazyLock::new(|| {
    let mut m: AHashMap<&'static str, FilterFn> = AHashMap::default();
    m.insert("trim", string::trim_filter);
    m.insert("title", string::title_filter);
    m.insert("wordcount", string::wordcount_filter);
    m.insert("upper", string::upper_filter);
    m.insert("lower", string::lower_filter);
    m.insert("replace", string::replace_filter);
    m.insert("truncate", string::truncate_filter);
    m.insert("urlencode", string::urlencode_filter);
    m.insert("default", collection::default_filter);
    m.insert("d", collection::default_filter);
    m.insert("join", collection::join_filter);
    m.insert("list", collection::list_filter);
    m.insert("length", collection::length_filter);
    m.insert("count", collection::length_filter);
    m.insert("sort", collection::sort_filter);
    m.insert("map", collection::map_filter);
    m.insert("select", collection::select_filter);
    m.insert("reject", collection::reject_filter);
    m.insert("pprint", collection::pprint_filter);
    m
});

pub struct FilterRegistry;

impl FilterRegistry {
    pub fn with_builtins() -> Self {
        Self
    }

    /// Construction-time lookup: callers building a `FilteredExpression`
    /// should call this while parsing a filter name, surfacing
    /// `UnknownFilter` immediately rather than deferring it to render time.
    pub fn create(&self, name: &str) -> EngineResult<()> {
        if FILTER_TABLE.contains_key(name) {
            Ok(())
        } else {
            Err(EngineError::UnknownFilter { name: name.to_string() })
        }
    }

    /// Render-time application. Assumes `create` already validated `name`;
    /// a name that still isn't found (e.g. a registry swapped out between
    /// parse and render) evaluates to empty rather than panicking.
    pub fn apply(
        &self,
        name: &str,
        value: &InternalValue,
        args: CallParams<InternalValue>,
        config: &EngineConfig,
        testers: &TesterRegistry,
    ) -> InternalValue {
        match FILTER_TABLE.get(name) {
            Some(f) => f(value, &args, config, testers),
            None => InternalValue::Empty,
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_filter_fails_at_construction() {
        let reg = FilterRegistry::with_builtins();
        assert!(reg.create("upper").is_ok());
        assert!(reg.create("no_such_filter").is_err());
    }
}
