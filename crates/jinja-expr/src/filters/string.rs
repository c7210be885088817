//! The string filter suite: `trim`, `title`, `wordcount`, `upper`, `lower`,
//! `replace`, `truncate`, `urlencode`.
//!
//! `upper`/`lower`/`title`'s per-character case folding is grounded on the
//! teacher's `modules/string_mod.rs::capitalize_word` — `chars().next()`,
//! `to_uppercase()`, then folding the remainder through `to_lowercase()`
//! one `char` at a time, confirming std's Unicode case-conversion methods
//! are the idiom to follow rather than pulling in a casefolding crate.
//! `urlencode` is grounded on `modules/urllib_parse.rs::percent_encode_bytes`
//! (the `{b:02X}` hex-escape loop with a `plus_for_space` flag). `truncate`'s
//! word-boundary handling follows the same backward-scan-to-a-break
//! approach `modules/textwrap.rs` uses for wrapping, adapted to a single
//! cut point instead of a sequence of wrapped lines.

use crate::args::{bind, ArgumentInfo, CallParams};
use crate::config::{CasingMode, EngineConfig};
use crate::testers::TesterRegistry;
use crate::value::InternalValue;

fn text_arg(value: &InternalValue) -> Option<String> {
    value.as_text()
}

fn fold_case(c: char, upper: bool, casing: CasingMode) -> String {
    match casing {
        CasingMode::Unicode => {
            if upper {
                c.to_uppercase().collect()
            } else {
                c.to_lowercase().collect()
            }
        }
        CasingMode::AsciiOnly => {
            if !c.is_ascii() {
                c.to_string()
            } else if upper {
                c.to_ascii_uppercase().to_string()
            } else {
                c.to_ascii_lowercase().to_string()
            }
        }
    }
}

pub fn upper_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    InternalValue::target_string(
        text.chars().map(|c| fold_case(c, true, config.casing)).collect::<String>(),
    )
}

pub fn lower_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    InternalValue::target_string(
        text.chars().map(|c| fold_case(c, false, config.casing)).collect::<String>(),
    )
}

/// A single `is_delimiter` state bit, initialized `true` so the first
/// character of the string is always capitalized — directly the state
/// machine shape the teacher's word-boundary logic implies, specialized to
/// title-casing instead of line wrapping.
pub fn title_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.push_str(&fold_case(c, true, config.casing));
            } else {
                out.push_str(&fold_case(c, false, config.casing));
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    InternalValue::target_string(out)
}

/// Collapses internal whitespace runs to a single space and trims both
/// ends.
pub fn trim_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    InternalValue::target_string(collapsed)
}

/// Counts delimiter-to-alphanumeric transitions — i.e. word starts, not
/// whitespace-separated tokens, so `"a--b"` still counts as two words.
pub fn wordcount_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    let mut count = 0u64;
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    InternalValue::Integer(count as i64)
}

fn replace_schema() -> Vec<ArgumentInfo<InternalValue>> {
    vec![
        ArgumentInfo::Named { name: "old".to_string(), default: None },
        ArgumentInfo::Named { name: "new".to_string(), default: None },
        ArgumentInfo::Named {
            name: "count".to_string(),
            default: Some(InternalValue::Integer(0)),
        },
    ]
}

/// `replace(old, new, count=0)` — `count == 0` replaces every occurrence;
/// otherwise the first `count` non-overlapping matches, scanning left to
/// right. Bound through the call-parameter binder against `replace_schema`
/// so a keyword like `count=2` lands in the right slot regardless of
/// argument order, the same tie-break rule a real callable's arguments get.
pub fn replace_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    let parsed = bind(&replace_schema(), args.clone());
    if !parsed.succeeded {
        return InternalValue::Empty;
    }
    let Some(old) = parsed.args.get("old").and_then(InternalValue::as_text) else {
        return InternalValue::Empty;
    };
    let Some(new) = parsed.args.get("new").and_then(InternalValue::as_text) else {
        return InternalValue::Empty;
    };
    let count = parsed.args.get("count").and_then(InternalValue::as_integer).unwrap_or(0);

    if old.is_empty() {
        return InternalValue::target_string(text);
    }

    let replaced = if count <= 0 {
        text.replace(&old, &new)
    } else {
        let mut out = String::with_capacity(text.len());
        let mut remaining = text.as_str();
        let mut left = count;
        while left > 0 {
            match remaining.find(&old) {
                Some(pos) => {
                    out.push_str(&remaining[..pos]);
                    out.push_str(&new);
                    remaining = &remaining[pos + old.len()..];
                    left -= 1;
                }
                None => break,
            }
        }
        out.push_str(remaining);
        out
    };
    InternalValue::target_string(replaced)
}

fn truncate_schema() -> Vec<ArgumentInfo<InternalValue>> {
    vec![
        ArgumentInfo::Named {
            name: "length".to_string(),
            default: Some(InternalValue::Integer(255)),
        },
        ArgumentInfo::Named {
            name: "killwords".to_string(),
            default: Some(InternalValue::Boolean(false)),
        },
        ArgumentInfo::Named {
            name: "end".to_string(),
            default: Some(InternalValue::narrow("...")),
        },
        ArgumentInfo::Named {
            name: "leeway".to_string(),
            default: Some(InternalValue::Integer(5)),
        },
    ]
}

/// `truncate(length=255, killwords=false, end="...", leeway=5)`. Bound
/// through the call-parameter binder so e.g. `truncate(killwords=true, 9,
/// "X")` binds `killwords` by keyword first, then fills `length` and `end`
/// — the first two slots the keyword pass left unbound — with the
/// remaining positionals, in schema order.
pub fn truncate_filter(
    value: &InternalValue,
    args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    let parsed = bind(&truncate_schema(), args.clone());
    if !parsed.succeeded {
        return InternalValue::Empty;
    }
    let length = parsed.args.get("length").and_then(InternalValue::as_integer).unwrap_or(255).max(0) as usize;
    let killwords = parsed.args.get("killwords").is_some_and(InternalValue::is_truthy);
    let end = parsed
        .args
        .get("end")
        .and_then(InternalValue::as_text)
        .unwrap_or_else(|| "...".to_string());
    let leeway = parsed.args.get("leeway").and_then(InternalValue::as_integer).unwrap_or(5).max(0) as usize;

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= length + leeway {
        return InternalValue::target_string(text);
    }

    let mut cut = length.min(chars.len());
    if !killwords {
        // Back up to the start of the word we'd otherwise split.
        while cut > 0 && chars[cut - 1].is_alphanumeric() {
            cut -= 1;
        }
        // Trim the trailing whitespace this backward scan leaves behind.
        while cut > 0 && chars[cut - 1].is_whitespace() {
            cut -= 1;
        }
        if cut == 0 {
            cut = length.min(chars.len());
        }
    }

    let mut out: String = chars[..cut].iter().collect();
    out.push_str(&end);
    InternalValue::target_string(out)
}

/// Percent-encoding, grounded directly on `percent_encode_bytes`: unreserved
/// ASCII alphanumerics and `-_.~` pass through; space becomes `+`; anything
/// else (including all non-ASCII bytes) becomes `%XX` uppercase hex.
pub fn urlencode_filter(
    value: &InternalValue,
    _args: &CallParams<InternalValue>,
    _config: &EngineConfig,
    _testers: &TesterRegistry,
) -> InternalValue {
    use std::fmt::Write;
    let Some(text) = text_arg(value) else { return InternalValue::Empty };
    let mut out = String::with_capacity(text.len());
    for b in text.as_bytes() {
        let is_unreserved =
            b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~');
        if is_unreserved {
            out.push(*b as char);
        } else if *b == b' ' {
            out.push('+');
        } else {
            write!(&mut out, "%{b:02X}").expect("writing to a String never fails");
        }
    }
    InternalValue::target_string(out)
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
    fn trim_collapses_internal_runs() {
        let v = trim_filter(&InternalValue::narrow("  a   b  "), &no_args(), &EngineConfig::default(), &no_testers());
        assert_eq!(v.render_to_string(), "a b");
    }

    #[test]
    fn title_capitalizes_each_word() {
        let v = title_filter(&InternalValue::narrow("hello world-wide"), &no_args(), &EngineConfig::default(), &no_testers());
        assert_eq!(v.render_to_string(), "Hello World-Wide");
    }

    #[test]
    fn wordcount_counts_alnum_runs() {
        let v = wordcount_filter(&InternalValue::narrow("a--b c"), &no_args(), &EngineConfig::default(), &no_testers());
        assert!(matches!(v, InternalValue::Integer(3)));
    }

    #[test]
    fn urlencode_space_becomes_plus_and_reserved_is_escaped() {
        let v = urlencode_filter(&InternalValue::narrow("a b/c"), &no_args(), &EngineConfig::default(), &no_testers());
        assert_eq!(v.render_to_string(), "a+b%2Fc");
    }

    #[test]
    fn replace_count_limits_to_left_to_right_matches() {
        let mut args = no_args();
        args.positional.push(InternalValue::narrow("a"));
        args.positional.push(InternalValue::narrow("X"));
        args.positional.push(InternalValue::Integer(2));
        let v = replace_filter(&InternalValue::narrow("aaaa"), &args, &EngineConfig::default(), &no_testers());
        assert_eq!(v.render_to_string(), "XXaa");
    }

    #[test]
    fn truncate_backs_up_to_word_boundary() {
        let mut args = no_args();
        args.positional.push(InternalValue::Integer(9));
        let v = truncate_filter(
            &InternalValue::narrow("hello amazing world"),
            &args,
            &EngineConfig::default(),
            &no_testers(),
        );
        assert_eq!(v.render_to_string(), "hello...");
    }

    #[test]
    fn truncate_within_leeway_is_unchanged() {
        let mut args = no_args();
        args.positional.push(InternalValue::Integer(10));
        let v = truncate_filter(&InternalValue::narrow("hello world"), &args, &EngineConfig::default(), &no_testers());
        assert_eq!(v.render_to_string(), "hello world");
    }

    #[test]
    fn truncate_keyword_killwords_then_positionals_fill_remaining_slots() {
        // truncate(killwords=true, 9, "X") — `killwords` binds by keyword,
        // then the positionals fill `length` and `end`, the first two
        // still-unbound slots in schema order, not their own declared
        // indices.
        let mut args = no_args();
        args.keyword.insert("killwords".to_string(), InternalValue::Boolean(true));
        args.positional.push(InternalValue::Integer(9));
        args.positional.push(InternalValue::narrow("X"));
        let v = truncate_filter(
            &InternalValue::narrow("hello amazing world"),
            &args,
            &EngineConfig::default(),
            &no_testers(),
        );
        assert_eq!(v.render_to_string(), "hello amaX");
    }
}
