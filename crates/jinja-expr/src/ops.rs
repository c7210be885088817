//! Arithmetic and comparison visitors.
//!
//! Grounded on the teacher's `bytecode/vm/binary.rs` dispatch style: a
//! fast path per concrete operand-type pair, matched directly rather than
//! routed through a trait object, with explicit handling for the
//! divide-by-zero and mixed-type cases instead of relying on panics. The
//! teacher additionally falls back to a dunder-overload protocol when both
//! native fast paths miss (`binary_op_with_dunder!`); that fallback has no
//! counterpart here since this value model has no user-defined operator
//! overloading.

use crate::value::InternalValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mul,
    Div,
    DivReminder,
    DivInteger,
    Pow,
    /// `~` — unconditionally coerces both operands to text and concatenates,
    /// unlike `Plus`, which only concatenates when both sides are already
    /// string-typed and otherwise does arithmetic.
    StringConcat,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
}

pub fn apply_unary(op: UnaryOp, operand: &InternalValue) -> InternalValue {
    match op {
        UnaryOp::LogicalNot => InternalValue::Boolean(!operand.is_truthy()),
        UnaryOp::Negate => match operand {
            InternalValue::Integer(i) => InternalValue::Integer(-i),
            InternalValue::Double(d) => InternalValue::Double(-d),
            InternalValue::Boolean(b) => InternalValue::Integer(-i64::from(*b)),
            _ => InternalValue::Empty,
        },
    }
}

/// Binary math/comparison dispatch (`BinaryMathOperation` in spec terms).
///
/// Division by zero and type mismatches resolve to `Empty` per §7 rather
/// than propagating an error — the core never aborts a render over a bad
/// operand pair.
pub fn apply_binary(op: BinaryOp, lhs: &InternalValue, rhs: &InternalValue) -> InternalValue {
    use BinaryOp::{Eq as BEq, Ge, Gt, Le, Lt, Ne, Plus, StringConcat};

    match op {
        BEq | Ne | Gt | Lt | Ge | Le => compare(op, lhs, rhs),
        StringConcat => InternalValue::target_string(format!(
            "{}{}",
            lhs.render_to_string(),
            rhs.render_to_string()
        )),
        _ => match (lhs, rhs) {
            (InternalValue::Integer(a), InternalValue::Integer(b)) => {
                integer_math(op, *a, *b)
            }
            (a, b) if a.is_number() && b.is_number() => {
                let (Some(x), Some(y)) = (a.as_double(), b.as_double()) else {
                    return InternalValue::Empty;
                };
                double_math(op, x, y)
            }
            (InternalValue::Integer(_) | InternalValue::Double(_), InternalValue::Boolean(_))
            | (InternalValue::Boolean(_), InternalValue::Integer(_) | InternalValue::Double(_)) => {
                let (Some(x), Some(y)) = (lhs.as_double(), rhs.as_double()) else {
                    return InternalValue::Empty;
                };
                double_math(op, x, y)
            }
            _ if matches!(op, Plus) && lhs.is_string() && rhs.is_string() => {
                string_concat(lhs, rhs)
            }
            _ => InternalValue::Empty,
        },
    }
}

fn integer_math(op: BinaryOp, a: i64, b: i64) -> InternalValue {
    use BinaryOp::{Div, DivInteger, DivReminder, Minus, Mul, Plus, Pow};
    match op {
        Plus => a.checked_add(b).map_or(InternalValue::Empty, InternalValue::Integer),
        Minus => a.checked_sub(b).map_or(InternalValue::Empty, InternalValue::Integer),
        Mul => a.checked_mul(b).map_or(InternalValue::Empty, InternalValue::Integer),
        Div => {
            if b == 0 {
                InternalValue::Empty
            } else {
                InternalValue::Double(a as f64 / b as f64)
            }
        }
        DivInteger => {
            if b == 0 {
                InternalValue::Empty
            } else {
                // Truncation toward zero (decided open question).
                InternalValue::Integer(a / b)
            }
        }
        DivReminder => {
            if b == 0 {
                InternalValue::Empty
            } else {
                // Sign follows the divisor when both operands are integers.
                let r = a % b;
                let r = if r != 0 && (r < 0) != (b < 0) { r + b } else { r };
                InternalValue::Integer(r)
            }
        }
        Pow => {
            if b >= 0 && b <= u32::MAX as i64 {
                a.checked_pow(b as u32).map_or(InternalValue::Empty, InternalValue::Integer)
            } else {
                InternalValue::Double((a as f64).powf(b as f64))
            }
        }
        _ => InternalValue::Empty,
    }
}

fn double_math(op: BinaryOp, a: f64, b: f64) -> InternalValue {
    use BinaryOp::{Div, DivInteger, DivReminder, Minus, Mul, Plus, Pow};
    match op {
        Plus => InternalValue::Double(a + b),
        Minus => InternalValue::Double(a - b),
        Mul => InternalValue::Double(a * b),
        Div => {
            if b == 0.0 {
                InternalValue::Empty
            } else {
                InternalValue::Double(a / b)
            }
        }
        DivInteger => {
            if b == 0.0 {
                InternalValue::Empty
            } else {
                InternalValue::Double((a / b).trunc())
            }
        }
        DivReminder => {
            if b == 0.0 {
                InternalValue::Empty
            } else {
                let r = a % b;
                let r = if r != 0.0 && r.is_sign_negative() != b.is_sign_negative() {
                    r + b
                } else {
                    r
                };
                InternalValue::Double(r)
            }
        }
        Pow => InternalValue::Double(a.powf(b)),
        _ => InternalValue::Empty,
    }
}

fn string_concat(lhs: &InternalValue, rhs: &InternalValue) -> InternalValue {
    let (Some(a), Some(b)) = (lhs.as_text(), rhs.as_text()) else {
        return InternalValue::Empty;
    };
    InternalValue::target_string(format!("{a}{b}"))
}

fn compare(op: BinaryOp, lhs: &InternalValue, rhs: &InternalValue) -> InternalValue {
    use BinaryOp::{Eq as BEq, Ge, Gt, Le, Lt, Ne};
    let ordering = if let (Some(a), Some(b)) = (lhs.as_double(), rhs.as_double()) {
        a.partial_cmp(&b)
    } else if let (Some(a), Some(b)) = (lhs.as_text(), rhs.as_text()) {
        Some(a.cmp(&b))
    } else {
        None
    };

    match op {
        BEq => InternalValue::Boolean(ordering == Some(std::cmp::Ordering::Equal)),
        Ne => InternalValue::Boolean(ordering != Some(std::cmp::Ordering::Equal)),
        Gt => InternalValue::Boolean(ordering == Some(std::cmp::Ordering::Greater)),
        Lt => InternalValue::Boolean(ordering == Some(std::cmp::Ordering::Less)),
        Ge => InternalValue::Boolean(matches!(
            ordering,
            Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
        )),
        Le => InternalValue::Boolean(matches!(
            ordering,
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        )),
        _ => InternalValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn i(v: i64) -> InternalValue {
        InternalValue::Integer(v)
    }

    #[test]
    fn division_by_zero_is_empty() {
        assert!(matches!(apply_binary(BinaryOp::Div, &i(1), &i(0)), InternalValue::Empty));
        assert!(matches!(apply_binary(BinaryOp::DivInteger, &i(1), &i(0)), InternalValue::Empty));
        assert!(matches!(apply_binary(BinaryOp::DivReminder, &i(1), &i(0)), InternalValue::Empty));
    }

    #[test]
    fn integer_division_truncates_toward_zero() {
        let v = apply_binary(BinaryOp::DivInteger, &i(-7), &i(2));
        assert!(matches!(v, InternalValue::Integer(-3)));
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        let v = apply_binary(BinaryOp::DivReminder, &i(-7), &i(2));
        assert!(matches!(v, InternalValue::Integer(1)));
        let v = apply_binary(BinaryOp::DivReminder, &i(7), &i(-2));
        assert!(matches!(v, InternalValue::Integer(-1)));
    }

    #[test]
    fn string_concat_coerces_width() {
        let v = apply_binary(
            BinaryOp::Plus,
            &InternalValue::narrow("a"),
            &InternalValue::WideString(vec!['b'].into()),
        );
        assert_eq!(v.render_to_string(), "ab");
    }

    #[test]
    fn string_concat_op_coerces_mixed_types() {
        let v = apply_binary(BinaryOp::StringConcat, &i(1), &InternalValue::narrow("x"));
        assert_eq!(v.render_to_string(), "1x");
        // Plus between the same pair stays arithmetic-or-empty, never text.
        let v = apply_binary(BinaryOp::Plus, &i(1), &InternalValue::narrow("x"));
        assert!(matches!(v, InternalValue::Empty));
    }
}
