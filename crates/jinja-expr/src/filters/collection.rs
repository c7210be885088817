//! Non-string filters the registry needs to be a total function over the
//! names the interface lists — see `SPEC_FULL.md`'s "Ambient: filter
//! registry completeness". Ordinary Jinja2 semantics, implemented over the
//! same uniform list indexing `ListAdapter` already provides so `map`/`sort`
//! work against a `range(...)` result without materializing it first.

use crate::args::{bind, ArgumentInfo, CallParams};
use crate::config::EngineConfig;
use crate::testers::TesterRegistry;
use crate::value::{InternalValue, ListAdapter};

fn named(name: &str, default: InternalValue) -> ArgumentInfo<InternalValue> {
    ArgumentInfo::Named { name: name.to_string(), default: Some(default) }
}

fn default_schema() -> Vec<ArgumentInfo<InternalValue>> {
    vec![named("default_value", InternalValue::Empty), named("boolean", InternalValue::Boolean(false))]
}

pub fn default_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let parsed = bind(&default_schema(), args.clone());
    if !parsed.succeeded {
        return InternalValue::Empty;
    }
    let default_value = parsed.args.get("default_value").cloned().unwrap_or(InternalValue::Empty);
    let use_boolean = parsed.args.get("boolean").is_some_and(InternalValue::is_truthy);
    let missing = if use_boolean { !value.is_truthy() } else { value.is_empty_value() };
    if missing {
        default_value
    } else {
        value.clone()
    }
}

fn join_schema() -> Vec<ArgumentInfo<InternalValue>> {
    vec![named("sep", InternalValue::narrow(""))]
}

pub fn join_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let parsed = bind(&join_schema(), args.clone());
    if !parsed.succeeded {
        return InternalValue::Empty;
    }
    let sep = parsed.args.get("sep").and_then(InternalValue::as_text).unwrap_or_default();
    let items = as_list(value);
    let rendered = items
        .iter()
        .map(InternalValue::render_to_string)
        .collect::<Vec<_>>()
        .join(&sep);
    InternalValue::target_string(rendered)
}

pub fn list_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    InternalValue::List(ListAdapter::from_vec(as_list(value)))
}

pub fn length_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    value.len().map_or(InternalValue::Empty, |n| InternalValue::Integer(n as i64))
}

fn sort_schema() -> Vec<ArgumentInfo<InternalValue>> {
    vec![named("attribute", InternalValue::Empty), named("reverse", InternalValue::Boolean(false))]
}

pub fn sort_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let parsed = bind(&sort_schema(), args.clone());
    if !parsed.succeeded {
        return InternalValue::Empty;
    }
    let reverse = parsed.args.get("reverse").is_some_and(InternalValue::is_truthy);
    let attribute = parsed.args.get("attribute").and_then(InternalValue::as_text);
    let mut items = as_list(value);
    items.sort_by(|a, b| sort_key(a, &attribute).cmp(&sort_key(b, &attribute)));
    if reverse {
        items.reverse();
    }
    InternalValue::List(ListAdapter::from_vec(items))
}

fn sort_key(value: &InternalValue, attribute: &Option<String>) -> String {
    let projected = match attribute {
        Some(attr) => match value {
            InternalValue::Map(m) => m.get(attr),
            _ => value.clone(),
        },
        None => value.clone(),
    };
    projected.render_to_string()
}

fn map_schema() -> Vec<ArgumentInfo<InternalValue>> {
    vec![named("attribute", InternalValue::Empty), named("default", InternalValue::Empty)]
}

pub fn map_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let parsed = bind(&map_schema(), args.clone());
    if !parsed.succeeded {
        return InternalValue::Empty;
    }
    let attribute = parsed.args.get("attribute").and_then(InternalValue::as_text);
    let default = parsed.args.get("default").cloned().unwrap_or(InternalValue::Empty);
    let items = as_list(value);
    let mapped = items
        .into_iter()
        .map(|item| match (&attribute, &item) {
            (Some(attr), InternalValue::Map(m)) => {
                if m.contains_key(attr) {
                    m.get(attr)
                } else {
                    default.clone()
                }
            }
            _ => item,
        })
        .collect::<Vec<_>>();
    InternalValue::List(ListAdapter::from_vec(mapped))
}

fn select_reject_schema() -> Vec<ArgumentInfo<InternalValue>> {
    vec![named("tester", InternalValue::Empty), ArgumentInfo::VarPositional]
}

/// Shared body for `select`/`reject`: dispatches `tester` (by name, through
/// the tester registry) against each element, with no tester given falling
/// back to plain truthiness — `select` keeps matches, `reject` drops them.
fn select_or_reject(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    testers: &TesterRegistry,
    keep_matches: bool,
) -> InternalValue {
    let parsed = bind(&select_reject_schema(), args.clone());
    if !parsed.succeeded {
        return InternalValue::Empty;
    }
    let tester_name = parsed.args.get("tester").and_then(InternalValue::as_text);
    let params = parsed.extra_pos_args;
    let items = as_list(value);
    let filtered = items
        .into_iter()
        .filter(|item| {
            let matches = match &tester_name {
                Some(name) if !name.is_empty() => testers.test(name, item, &params),
                _ => item.is_truthy(),
            };
            matches == keep_matches
        })
        .collect();
    InternalValue::List(ListAdapter::from_vec(filtered))
}

pub fn select_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    testers: &TesterRegistry,
) -> InternalValue {
    select_or_reject(value, args, testers, true)
}

pub fn reject_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    testers: &TesterRegistry,
) -> InternalValue {
    select_or_reject(value, args, testers, false)
}

pub fn pprint_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    InternalValue::target_string(format!("{value:?}"))
}

fn as_list(value: &InternalValue) -> Vec<InternalValue> {
    match value {
        InternalValue::List(l) => l.materialize(),
        InternalValue::Map(m) => m.keys().map(InternalValue::narrow).collect(),
        _ if value.is_string() => value
            .as_text()
            .map(|t| t.chars().map(|c| InternalValue::narrow(c.to_string())).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_args() -> CallParams<InternalValue> {
        CallParams::new()
    }

    fn no_testers() -> TesterRegistry {
        TesterRegistry::with_builtins()
    }

    #[test]
    fn default_used_only_when_empty() {
        let mut args = no_args();
        args.positional.push(InternalValue::Integer(7));
        let v = default_filter(&InternalValue::Empty, &args, &EngineConfig::default(), &no_testers());
        assert!(matches!(v, InternalValue::Integer(7)));
        let v = default_filter(&InternalValue::Integer(1), &args, &EngineConfig::default(), &no_testers());
        assert!(matches!(v, InternalValue::Integer(1)));
    }

    #[test]
    fn join_renders_each_element() {
        let list = InternalValue::List(ListAdapter::from_vec(vec![
            InternalValue::Integer(1),
            InternalValue::Integer(2),
        ]));
        let mut args = no_args();
        args.positional.push(InternalValue::narrow(", "));
        let v = join_filter(&list, &args, &EngineConfig::default(), &no_testers());
        assert_eq!(v.render_to_string(), "1, 2");
    }

    #[test]
    fn length_counts_elements() {
        let list = InternalValue::List(ListAdapter::from_vec(vec![
            InternalValue::Integer(1),
            InternalValue::Integer(2),
            InternalValue::Integer(3),
        ]));
        assert!(matches!(
            length_filter(&list, &no_args(), &EngineConfig::default(), &no_testers()),
            InternalValue::Integer(3)
        ));
    }

    #[test]
    fn select_keeps_only_matches() {
        let list = InternalValue::List(ListAdapter::from_vec(vec![
            InternalValue::Integer(1),
            InternalValue::Integer(2),
            InternalValue::Integer(3),
            InternalValue::Integer(4),
        ]));
        let mut args = no_args();
        args.positional.push(InternalValue::narrow("even"));
        let v = select_filter(&list, &args, &EngineConfig::default(), &no_testers());
        let InternalValue::List(out) = v else { panic!("expected list") };
        assert_eq!(out.materialize().len(), 2);
    }

    #[test]
    fn reject_drops_matches_and_defaults_to_truthiness() {
        let list = InternalValue::List(ListAdapter::from_vec(vec![
            InternalValue::Integer(0),
            InternalValue::Integer(1),
            InternalValue::Empty,
        ]));
        let v = reject_filter(&list, &no_args(), &EngineConfig::default(), &no_testers());
        let InternalValue::List(out) = v else { panic!("expected list") };
        // No tester given: truthy elements are rejected, leaving the falsy ones.
        assert_eq!(out.materialize().len(), 2);
    }
}
