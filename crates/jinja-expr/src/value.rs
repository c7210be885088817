//! The value model: [`InternalValue`], its [`ListAdapter`]/[`MapAdapter`]
//! variants, and the [`Callable`] representation.
//!
//! Grounded on the tagged-union shape of the teacher's `Value` enum
//! (`value.rs`): a flat enum over primitive and reference-carrying variants,
//! matched everywhere with `match` rather than dynamic dispatch, kept small
//! enough to live on the stack for the scalar cases and to `Rc`-share the
//! heap-backed ones cheaply.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// A single logical value flowing through expression evaluation.
///
/// `Clone` is cheap: scalars copy, and the reference-carrying variants
/// (`NarrowString`, `WideString`, `List`, `Map`, `Callable`) share their
/// backing storage via `Rc`.
#[derive(Clone)]
pub enum InternalValue {
    Empty,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    /// UTF-8 narrow string.
    NarrowString(Rc<str>),
    /// Wide (UTF-32 code point) string — distinct from `NarrowString` per
    /// the non-goal against silently mixing the two representations in one
    /// value; conversion between them is always explicit.
    WideString(Rc<[char]>),
    /// A view into a parent narrow string: `(parent, start, len)` in bytes.
    /// Never outlives the parent on its own — see [`crate::pool`]'s
    /// `parent_ref` tracking for why subscripting and filtering keep the
    /// parent alive.
    NarrowStringView(Rc<str>, usize, usize),
    WideStringView(Rc<[char]>, usize, usize),
    List(ListAdapter),
    Map(MapAdapter),
    Callable(Callable),
    /// Fully rendered display text — the terminal form a `FilteredExpression`
    /// or concatenation produces; no further coercion is expected.
    TargetString(Rc<str>),
}

impl fmt::Debug for InternalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::NarrowString(s) | Self::TargetString(s) => write!(f, "{s:?}"),
            Self::WideString(s) => write!(f, "{:?}", s.iter().collect::<String>()),
            Self::NarrowStringView(s, start, len) => write!(f, "{:?}", &s[*start..*start + *len]),
            Self::WideStringView(s, start, len) => {
                write!(f, "{:?}", s[*start..*start + *len].iter().collect::<String>())
            }
            Self::List(l) => f.debug_list().entries(l.iter()).finish(),
            Self::Map(m) => f.debug_map().entries(m.iter()).finish(),
            Self::Callable(_) => write!(f, "<callable>"),
        }
    }
}

/// A sequence value: either materialized in a `Vec`, or generated on demand
/// from an index — the representation `range(...)` and `loop.cycle` use so
/// that iterating a huge range never allocates the whole thing.
#[derive(Clone)]
pub enum ListAdapter {
    Materialized(Rc<Vec<InternalValue>>),
    Generated {
        len: usize,
        gen: Rc<dyn Fn(usize) -> InternalValue>,
    },
}

impl ListAdapter {
    pub fn from_vec(values: Vec<InternalValue>) -> Self {
        Self::Materialized(Rc::new(values))
    }

    pub fn generated(len: usize, gen: impl Fn(usize) -> InternalValue + 'static) -> Self {
        Self::Generated { len, gen: Rc::new(gen) }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Materialized(v) => v.len(),
            Self::Generated { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `InternalValue::Empty` for an out-of-range index, matching
    /// the spec's OutOfRange-row policy (empty, never panics).
    pub fn get(&self, index: usize) -> InternalValue {
        match self {
            Self::Materialized(v) => v.get(index).cloned().unwrap_or(InternalValue::Empty),
            Self::Generated { len, gen } => {
                if index < *len {
                    gen(index)
                } else {
                    InternalValue::Empty
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = InternalValue> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn materialize(&self) -> Vec<InternalValue> {
        match self {
            Self::Materialized(v) => v.as_ref().clone(),
            Self::Generated { .. } => self.iter().collect(),
        }
    }
}

/// A string-keyed mapping value. Key uniqueness and reasonably stable
/// iteration order are the only contract; backed by `IndexMap`, the same
/// crate the teacher already depends on for its own ordered maps.
#[derive(Clone)]
pub struct MapAdapter(Rc<IndexMap<Rc<str>, InternalValue>>);

impl MapAdapter {
    pub fn new(map: IndexMap<Rc<str>, InternalValue>) -> Self {
        Self(Rc::new(map))
    }

    pub fn get(&self, key: &str) -> InternalValue {
        self.0.get(key).cloned().unwrap_or(InternalValue::Empty)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(AsRef::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InternalValue)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v))
    }
}

/// The kind discriminator for a [`Callable`] value, mirroring the teacher's
/// tagged `Builtins`/`ModuleFunctions`/`DefFunction` split in `value.rs`
/// collapsed to what a filter/tester/global-function core actually needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallableKind {
    GlobalFunc,
    UserCallable,
    Macro,
    SpecialFn(SpecialFn),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialFn {
    RangeFn,
    LoopCycleFn,
}

/// The body shape of a callable: either a pure expression, or (reserved for
/// a future statement-level renderer, out of scope here) a statement block.
#[derive(Clone)]
pub enum CallableBody {
    Expression(Rc<dyn Fn(&crate::args::ParsedArguments<InternalValue>) -> InternalValue>),
}

#[derive(Clone)]
pub struct Callable {
    pub kind: CallableKind,
    /// Schema the call-parameter binder reconciles caller arguments
    /// against before `body` ever runs.
    pub schema: Rc<[crate::args::ArgumentInfo<InternalValue>]>,
    pub body: CallableBody,
}

impl InternalValue {
    pub fn narrow<S: Into<Rc<str>>>(s: S) -> Self {
        Self::NarrowString(s.into())
    }

    pub fn target_string<S: Into<Rc<str>>>(s: S) -> Self {
        Self::TargetString(s.into())
    }

    pub fn is_empty_value(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Python/Jinja-style truthiness: used by `if`, `and`/`or`, and the
    /// `select`/`reject` filters.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Empty => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Double(d) => *d != 0.0,
            Self::NarrowString(s) | Self::TargetString(s) => !s.is_empty(),
            Self::WideString(s) => !s.is_empty(),
            Self::NarrowStringView(_, _, len) | Self::WideStringView(_, _, len) => *len != 0,
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
            Self::Callable(_) => true,
        }
    }

    /// Renders this value to its display string, per `RendererCallback`'s
    /// `write value` contract (spec §1/§6): the single point where every
    /// value variant collapses down to text.
    pub fn render_to_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Double(d) => format_double(*d),
            Self::NarrowString(s) | Self::TargetString(s) => s.to_string(),
            Self::WideString(s) => s.iter().collect(),
            Self::NarrowStringView(s, start, len) => s[*start..*start + *len].to_string(),
            Self::WideStringView(s, start, len) => s[*start..*start + *len].iter().collect(),
            Self::List(l) => l
                .iter()
                .map(|v| v.render_to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Self::Map(m) => m
                .iter()
                .map(|(k, v)| format!("{k}: {}", v.render_to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            Self::Callable(_) => String::new(),
        }
    }

    /// Coerces to `&str`-like text for the string filters; `None` for
    /// non-string-shaped values (caller falls back to empty per §7).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::NarrowString(s) | Self::TargetString(s) => Some(s.to_string()),
            Self::WideString(s) => Some(s.iter().collect()),
            Self::NarrowStringView(s, start, len) => Some(s[*start..*start + *len].to_string()),
            Self::WideStringView(s, start, len) => {
                Some(s[*start..*start + *len].iter().collect())
            }
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Boolean(b) => Some(i64::from(*b)),
            Self::Double(d) => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            Self::Integer(i) => Some(*i as f64),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Double(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Self::NarrowString(_)
                | Self::WideString(_)
                | Self::NarrowStringView(..)
                | Self::WideStringView(..)
                | Self::TargetString(_)
        )
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::List(_)) || self.is_string()
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Element/character/entry count, used by the `length` filter and by
    /// truthiness-adjacent callers; `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::List(l) => Some(l.len()),
            Self::Map(m) => Some(m.len()),
            Self::NarrowString(s) | Self::TargetString(s) => Some(s.chars().count()),
            Self::WideString(s) => Some(s.len()),
            Self::NarrowStringView(s, start, len) => {
                Some(s[*start..*start + *len].chars().count())
            }
            Self::WideStringView(_, _, len) => Some(*len),
            _ => None,
        }
    }
}

fn format_double(d: f64) -> String {
    if d.fract() == 0.0 && d.is_finite() {
        format!("{d:.1}")
    } else {
        format!("{d}")
    }
}
