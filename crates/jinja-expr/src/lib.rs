//! Expression evaluation and filter core for a Jinja2-compatible template
//! engine.
//!
//! This crate covers the value model, the expression evaluator, the
//! call-parameter binder, and the string filter suite — the pieces a
//! template renderer needs to turn a parsed expression tree and a render
//! context into values or text. It does not parse templates, render
//! statements (blocks, loops, macros), or perform any I/O; see
//! `SPEC_FULL.md` for the exact boundary.

pub mod args;
pub mod config;
pub mod context;
pub mod error;
pub mod expressions;
pub mod filters;
pub mod ops;
pub mod pool;
pub mod testers;
pub mod value;

pub use config::{CasingMode, EngineConfig};
pub use context::{RenderContext, RendererCallback};
pub use error::{EngineError, EngineResult};
pub use expressions::{Expr, Registries};
pub use filters::FilterRegistry;
pub use pool::{InternalValueDataPool, ValueId};
pub use testers::TesterRegistry;
pub use value::{Callable, InternalValue, ListAdapter, MapAdapter};
