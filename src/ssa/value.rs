//! Constant values and compile-time folding.
//!
//! [`ConstValue`] represents the literal values PHP source can spell directly. The folding
//! helpers follow PHP's runtime conversions closely enough for constant propagation:
//! integer arithmetic that overflows promotes to float, `.` converts both sides to
//! strings, and loose comparisons between numeric values compare numerically.
//!
//! Folding is conservative: anything that would raise at runtime (division by zero,
//! modulo by zero, negative shifts) or whose result depends on conversions this crate
//! does not model returns `None`, and the builder keeps the unfolded instruction.

use std::fmt;

use crate::ssa::{BinaryOp, SsaType, UnaryOp};

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// String literal
    String(String),
    /// `null`
    Null,
}

impl ConstValue {
    /// Returns the SSA type of this constant.
    #[must_use]
    pub fn ty(&self) -> SsaType {
        match self {
            ConstValue::Bool(_) => SsaType::bool(),
            ConstValue::Int(_) => SsaType::int(),
            ConstValue::Float(_) => SsaType::float64(),
            ConstValue::String(_) => SsaType::string(),
            ConstValue::Null => SsaType::null(),
        }
    }

    /// A key that is equal for two constants exactly when they are the same literal.
    ///
    /// Used to deduplicate constants per function; `1` and `1.0` get different keys.
    #[must_use]
    pub fn pool_key(&self) -> String {
        match self {
            ConstValue::Bool(b) => format!("b:{b}"),
            ConstValue::Int(i) => format!("i:{i}"),
            ConstValue::Float(v) => format!("f:{}", v.to_bits()),
            ConstValue::String(s) => format!("s:{s}"),
            ConstValue::Null => "n".to_string(),
        }
    }

    /// PHP truthiness.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            ConstValue::Bool(b) => *b,
            ConstValue::Int(i) => *i != 0,
            ConstValue::Float(v) => *v != 0.0,
            ConstValue::String(s) => !(s.is_empty() || s == "0"),
            ConstValue::Null => false,
        }
    }

    /// Converts to a string the way PHP's string conversion does.
    #[must_use]
    pub fn to_php_string(&self) -> String {
        match self {
            ConstValue::Bool(true) => "1".to_string(),
            ConstValue::Bool(false) | ConstValue::Null => String::new(),
            ConstValue::Int(i) => i.to_string(),
            ConstValue::Float(v) => format_float(*v),
            ConstValue::String(s) => s.clone(),
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            ConstValue::Int(i) => Some(Number::Int(*i)),
            ConstValue::Float(v) => Some(Number::Float(*v)),
            ConstValue::Bool(b) => Some(Number::Int(i64::from(*b))),
            ConstValue::Null => Some(Number::Int(0)),
            ConstValue::String(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Some(Number::Int(i))
                } else {
                    trimmed.parse::<f64>().ok().map(Number::Float)
                }
            }
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self.as_number()? {
            Number::Int(i) => Some(i),
            Number::Float(_) => None,
        }
    }

    /// Folds a binary operation over two constants.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use phpscope::ssa::{BinaryOp, ConstValue};
    ///
    /// let two = ConstValue::fold_binary(BinaryOp::Add, &ConstValue::Int(1), &ConstValue::Int(1));
    /// assert_eq!(two, Some(ConstValue::Int(2)));
    /// assert_eq!(two.unwrap().to_string(), "2");
    /// ```
    #[must_use]
    pub fn fold_binary(op: BinaryOp, left: &ConstValue, right: &ConstValue) -> Option<ConstValue> {
        match op {
            BinaryOp::Concat => Some(ConstValue::String(format!(
                "{}{}",
                left.to_php_string(),
                right.to_php_string()
            ))),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                arithmetic(op, left.as_number()?, right.as_number()?)
            }
            BinaryOp::Div => {
                let (l, r) = (left.as_number()?, right.as_number()?);
                if r.as_f64() == 0.0 {
                    return None;
                }
                match (l, r) {
                    (Number::Int(a), Number::Int(b)) if a.checked_rem(b) == Some(0) => {
                        a.checked_div(b).map(ConstValue::Int)
                    }
                    _ => Some(ConstValue::Float(l.as_f64() / r.as_f64())),
                }
            }
            BinaryOp::Mod => {
                let (a, b) = (left.as_int()?, right.as_int()?);
                a.checked_rem(b).map(ConstValue::Int)
            }
            BinaryOp::Pow => {
                let (l, r) = (left.as_number()?, right.as_number()?);
                match (l, r) {
                    (Number::Int(a), Number::Int(b)) if (0..=u32::MAX as i64).contains(&b) => {
                        match a.checked_pow(b as u32) {
                            Some(v) => Some(ConstValue::Int(v)),
                            None => Some(ConstValue::Float((a as f64).powf(b as f64))),
                        }
                    }
                    _ => Some(ConstValue::Float(l.as_f64().powf(r.as_f64()))),
                }
            }
            BinaryOp::BitAnd => Some(ConstValue::Int(left.as_int()? & right.as_int()?)),
            BinaryOp::BitOr => Some(ConstValue::Int(left.as_int()? | right.as_int()?)),
            BinaryOp::BitXor => Some(ConstValue::Int(left.as_int()? ^ right.as_int()?)),
            BinaryOp::Shl | BinaryOp::Shr => {
                let (a, b) = (left.as_int()?, right.as_int()?);
                if !(0..64).contains(&b) {
                    return None;
                }
                Some(ConstValue::Int(if op == BinaryOp::Shl {
                    a.wrapping_shl(b as u32)
                } else {
                    a >> b
                }))
            }
            BinaryOp::Identical => Some(ConstValue::Bool(strict_eq(left, right))),
            BinaryOp::NotIdentical => Some(ConstValue::Bool(!strict_eq(left, right))),
            BinaryOp::Eq => loose_cmp(left, right).map(|o| ConstValue::Bool(o.is_eq())),
            BinaryOp::NotEq => loose_cmp(left, right).map(|o| ConstValue::Bool(o.is_ne())),
            BinaryOp::Lt => loose_cmp(left, right).map(|o| ConstValue::Bool(o.is_lt())),
            BinaryOp::Le => loose_cmp(left, right).map(|o| ConstValue::Bool(o.is_le())),
            BinaryOp::Gt => loose_cmp(left, right).map(|o| ConstValue::Bool(o.is_gt())),
            BinaryOp::Ge => loose_cmp(left, right).map(|o| ConstValue::Bool(o.is_ge())),
            BinaryOp::Spaceship => loose_cmp(left, right).map(|o| ConstValue::Int(o as i64)),
            BinaryOp::Xor => Some(ConstValue::Bool(left.is_truthy() ^ right.is_truthy())),
            BinaryOp::InstanceOf => None,
        }
    }

    /// Folds a unary operation over a constant.
    #[must_use]
    pub fn fold_unary(op: UnaryOp, operand: &ConstValue) -> Option<ConstValue> {
        match op {
            UnaryOp::Not => Some(ConstValue::Bool(!operand.is_truthy())),
            UnaryOp::Neg => match operand.as_number()? {
                Number::Int(i) => Some(
                    i.checked_neg()
                        .map_or(ConstValue::Float(-(i as f64)), ConstValue::Int),
                ),
                Number::Float(v) => Some(ConstValue::Float(-v)),
            },
            UnaryOp::Plus => Some(operand.as_number()?.into()),
            UnaryOp::BitNot => Some(ConstValue::Int(!operand.as_int()?)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(v) => v,
        }
    }
}

impl From<Number> for ConstValue {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => ConstValue::Int(i),
            Number::Float(v) => ConstValue::Float(v),
        }
    }
}

fn arithmetic(op: BinaryOp, l: Number, r: Number) -> Option<ConstValue> {
    if let (Number::Int(a), Number::Int(b)) = (l, r) {
        let exact = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            _ => return None,
        };
        if let Some(v) = exact {
            return Some(ConstValue::Int(v));
        }
    }
    let (a, b) = (l.as_f64(), r.as_f64());
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => return None,
    };
    Some(ConstValue::Float(v))
}

fn strict_eq(left: &ConstValue, right: &ConstValue) -> bool {
    match (left, right) {
        (ConstValue::Float(a), ConstValue::Float(b)) => a == b,
        _ => left == right,
    }
}

fn loose_cmp(left: &ConstValue, right: &ConstValue) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (ConstValue::String(a), ConstValue::String(b))
            if a.trim().parse::<f64>().is_err() || b.trim().parse::<f64>().is_err() =>
        {
            Some(a.cmp(b))
        }
        (ConstValue::Bool(_), _) | (_, ConstValue::Bool(_)) => {
            Some(left.is_truthy().cmp(&right.is_truthy()))
        }
        (ConstValue::Null, ConstValue::Null) => Some(std::cmp::Ordering::Equal),
        _ => {
            let (a, b) = (left.as_number()?.as_f64(), right.as_number()?.as_f64());
            a.partial_cmp(&b)
        }
    }
}

fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else if v.is_nan() {
        "NAN".to_string()
    } else if v.is_infinite() {
        (if v > 0.0 { "INF" } else { "-INF" }).to_string()
    } else {
        v.to_string()
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(i) => write!(f, "{i}"),
            ConstValue::Float(v) => write!(f, "{}", format_float(*v)),
            ConstValue::String(s) => write!(f, "{s}"),
            ConstValue::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(op: BinaryOp, l: ConstValue, r: ConstValue) -> Option<ConstValue> {
        ConstValue::fold_binary(op, &l, &r)
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(
            fold(BinaryOp::Add, ConstValue::Int(1), ConstValue::Int(1)),
            Some(ConstValue::Int(2))
        );
        assert_eq!(
            fold(BinaryOp::Mul, ConstValue::Int(6), ConstValue::Int(7)),
            Some(ConstValue::Int(42))
        );
        assert_eq!(
            fold(BinaryOp::Add, ConstValue::Int(i64::MAX), ConstValue::Int(1)),
            Some(ConstValue::Float(i64::MAX as f64 + 1.0))
        );
    }

    #[test]
    fn test_division() {
        assert_eq!(
            fold(BinaryOp::Div, ConstValue::Int(6), ConstValue::Int(3)),
            Some(ConstValue::Int(2))
        );
        assert_eq!(
            fold(BinaryOp::Div, ConstValue::Int(1), ConstValue::Int(2)),
            Some(ConstValue::Float(0.5))
        );
        assert_eq!(
            fold(BinaryOp::Div, ConstValue::Int(1), ConstValue::Int(0)),
            None
        );
        assert_eq!(
            fold(BinaryOp::Mod, ConstValue::Int(1), ConstValue::Int(0)),
            None
        );
    }

    #[test]
    fn test_concat_and_strings() {
        assert_eq!(
            fold(
                BinaryOp::Concat,
                ConstValue::String("a".into()),
                ConstValue::Int(1)
            ),
            Some(ConstValue::String("a1".into()))
        );
        assert_eq!(
            fold(
                BinaryOp::Add,
                ConstValue::String("2".into()),
                ConstValue::Int(3)
            ),
            Some(ConstValue::Int(5))
        );
        assert_eq!(
            fold(
                BinaryOp::Add,
                ConstValue::String("abc".into()),
                ConstValue::Int(3)
            ),
            None
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            fold(BinaryOp::Lt, ConstValue::Int(1), ConstValue::Float(1.5)),
            Some(ConstValue::Bool(true))
        );
        assert_eq!(
            fold(
                BinaryOp::Eq,
                ConstValue::String("1".into()),
                ConstValue::Int(1)
            ),
            Some(ConstValue::Bool(true))
        );
        assert_eq!(
            fold(
                BinaryOp::Identical,
                ConstValue::String("1".into()),
                ConstValue::Int(1)
            ),
            Some(ConstValue::Bool(false))
        );
        assert_eq!(
            fold(BinaryOp::Spaceship, ConstValue::Int(3), ConstValue::Int(1)),
            Some(ConstValue::Int(1))
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            ConstValue::fold_unary(UnaryOp::Neg, &ConstValue::Int(5)),
            Some(ConstValue::Int(-5))
        );
        assert_eq!(
            ConstValue::fold_unary(UnaryOp::Not, &ConstValue::String("0".into())),
            Some(ConstValue::Bool(true))
        );
        assert_eq!(
            ConstValue::fold_unary(UnaryOp::BitNot, &ConstValue::Int(0)),
            Some(ConstValue::Int(-1))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ConstValue::Int(2).to_string(), "2");
        assert_eq!(ConstValue::Float(2.0).to_string(), "2");
        assert_eq!(ConstValue::Float(0.5).to_string(), "0.5");
        assert_eq!(ConstValue::Null.to_string(), "null");
        assert_ne!(
            ConstValue::Int(1).pool_key(),
            ConstValue::Float(1.0).pool_key()
        );
    }
}
