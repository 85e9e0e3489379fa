use std::cmp::Ordering;

use renzmc_core::{Diagnostic, Type};

use crate::error::{operand_error, type_error, value_error, zero_division};
use crate::value::Value;

pub(crate) fn symbol(ty: Type) -> &'static str {
    match ty {
        Type::Plus => "+",
        Type::Minus => "-",
        Type::Star => "*",
        Type::StarStar => "**",
        Type::Slash => "/",
        Type::SlashSlash => "//",
        Type::Percent => "%",
        Type::Amp => "&",
        Type::Pipe => "|",
        Type::Caret => "^",
        Type::LessLess => "<<",
        Type::GreaterGreater => ">>",
        Type::Less => "<",
        Type::LessEqual => "<=",
        Type::Greater => ">",
        Type::GreaterEqual => ">=",
        Type::EqualEqual => "==",
        Type::BangEqual => "!=",
        Type::Tilde => "~",
        Type::In => "dalam",
        Type::Not => "tidak",
        _ => "?",
    }
}

fn overflow() -> Diagnostic {
    value_error("Hasil operasi bilangan bulat terlalu besar")
}

pub(crate) fn binary(ty: Type, left: &Value, right: &Value) -> Result<Value, Diagnostic> {
    match ty {
        Type::EqualEqual => return Ok(Value::Bool(left == right)),
        Type::BangEqual => return Ok(Value::Bool(left != right)),
        Type::Less | Type::LessEqual | Type::Greater | Type::GreaterEqual => {
            return compare(ty, left, right).map(Value::Bool)
        }
        Type::In => return contains(right, left).map(Value::Bool),
        _ => {}
    }

    if let (Some(lhs), Some(rhs)) = (left.as_int(), right.as_int()) {
        return integer(ty, lhs, rhs, left, right);
    }
    if let (Some(lhs), Some(rhs)) = (left.as_number(), right.as_number()) {
        return float(ty, lhs, rhs, left, right);
    }

    let mismatch = || operand_error(symbol(ty), &left.type_name(), &right.type_name());
    match (ty, left, right) {
        (Type::Plus, Value::Str(lhs), Value::Str(rhs)) => Ok(Value::from(format!("{}{}", lhs, rhs))),
        (Type::Plus, Value::List(lhs), Value::List(rhs)) => {
            let mut values = lhs.borrow().clone();
            values.extend(rhs.borrow().iter().cloned());
            Ok(Value::list(values))
        }
        (Type::Plus, Value::Tuple(lhs), Value::Tuple(rhs)) => {
            Ok(Value::tuple(lhs.iter().chain(rhs.iter()).cloned().collect()))
        }
        (Type::Star, Value::Str(text), count) | (Type::Star, count, Value::Str(text)) => match count.as_int() {
            Some(n) => Ok(Value::from(text.repeat(n.max(0) as usize))),
            None => Err(mismatch()),
        },
        (Type::Star, Value::List(values), count) | (Type::Star, count, Value::List(values)) => {
            match count.as_int() {
                Some(n) => {
                    let values = values.borrow();
                    let mut repeated = Vec::with_capacity(values.len() * n.max(0) as usize);
                    for _ in 0..n.max(0) {
                        repeated.extend(values.iter().cloned());
                    }
                    Ok(Value::list(repeated))
                }
                None => Err(mismatch()),
            }
        }
        _ => Err(mismatch()),
    }
}

fn integer(ty: Type, lhs: i64, rhs: i64, left: &Value, right: &Value) -> Result<Value, Diagnostic> {
    let value = match ty {
        Type::Plus => lhs.checked_add(rhs).ok_or_else(overflow)?,
        Type::Minus => lhs.checked_sub(rhs).ok_or_else(overflow)?,
        Type::Star => lhs.checked_mul(rhs).ok_or_else(overflow)?,
        Type::Slash => {
            if rhs == 0 {
                return Err(zero_division("Pembagian dengan nol"));
            }
            return Ok(Value::Float(lhs as f64 / rhs as f64));
        }
        Type::SlashSlash => {
            if rhs == 0 {
                return Err(zero_division("Pembagian dengan nol"));
            }
            let quotient = lhs.checked_div(rhs).ok_or_else(overflow)?;
            if lhs % rhs != 0 && (lhs < 0) != (rhs < 0) {
                quotient - 1
            } else {
                quotient
            }
        }
        Type::Percent => {
            if rhs == 0 {
                return Err(zero_division("Modulo dengan nol"));
            }
            let remainder = lhs.checked_rem(rhs).unwrap_or(0);
            if remainder != 0 && (remainder < 0) != (rhs < 0) {
                remainder + rhs
            } else {
                remainder
            }
        }
        Type::StarStar => {
            if rhs < 0 {
                return Ok(Value::Float((lhs as f64).powf(rhs as f64)));
            }
            let exponent = u32::try_from(rhs).map_err(|_| overflow())?;
            lhs.checked_pow(exponent).ok_or_else(overflow)?
        }
        Type::Amp => lhs & rhs,
        Type::Pipe => lhs | rhs,
        Type::Caret => lhs ^ rhs,
        Type::LessLess | Type::GreaterGreater => {
            if rhs < 0 {
                return Err(value_error("Jumlah geser tidak boleh negatif"));
            }
            let shift = u32::try_from(rhs).map_err(|_| overflow())?;
            if ty == Type::LessLess {
                let shifted = lhs.checked_shl(shift).ok_or_else(overflow)?;
                if shifted >> shift != lhs {
                    return Err(overflow());
                }
                shifted
            } else {
                lhs.checked_shr(shift).unwrap_or(if lhs < 0 { -1 } else { 0 })
            }
        }
        _ => return Err(operand_error(symbol(ty), &left.type_name(), &right.type_name())),
    };

    // bool & bool stays a bool, as in the host language
    if matches!(ty, Type::Amp | Type::Pipe | Type::Caret)
        && matches!((left, right), (Value::Bool(_), Value::Bool(_)))
    {
        return Ok(Value::Bool(value != 0));
    }
    Ok(Value::Int(value))
}

fn float(ty: Type, lhs: f64, rhs: f64, left: &Value, right: &Value) -> Result<Value, Diagnostic> {
    let value = match ty {
        Type::Plus => lhs + rhs,
        Type::Minus => lhs - rhs,
        Type::Star => lhs * rhs,
        Type::Slash => {
            if rhs == 0.0 {
                return Err(zero_division("Pembagian dengan nol"));
            }
            lhs / rhs
        }
        Type::SlashSlash => {
            if rhs == 0.0 {
                return Err(zero_division("Pembagian dengan nol"));
            }
            (lhs / rhs).floor()
        }
        Type::Percent => {
            if rhs == 0.0 {
                return Err(zero_division("Modulo dengan nol"));
            }
            lhs - rhs * (lhs / rhs).floor()
        }
        Type::StarStar => lhs.powf(rhs),
        _ => return Err(operand_error(symbol(ty), &left.type_name(), &right.type_name())),
    };
    Ok(Value::Float(value))
}

pub(crate) fn unary(ty: Type, value: &Value) -> Result<Value, Diagnostic> {
    match (ty, value, value.as_int()) {
        (Type::Not, value, _) => Ok(Value::Bool(!value.is_truthy())),
        (Type::Minus, Value::Float(val), _) => Ok(Value::Float(-val)),
        (Type::Plus, Value::Float(val), _) => Ok(Value::Float(*val)),
        (Type::Minus, _, Some(val)) => val.checked_neg().map(Value::Int).ok_or_else(overflow),
        (Type::Plus, _, Some(val)) => Ok(Value::Int(val)),
        (Type::Tilde, _, Some(val)) => Ok(Value::Int(!val)),
        (ty, value, _) => Err(type_error(format!(
            "Operator unary {} tidak dapat digunakan pada '{}'",
            symbol(ty),
            value.type_name()
        ))),
    }
}

/// Total order used by comparisons, `urutkan`, `minimum` and `maksimum`.
pub(crate) fn ordering(left: &Value, right: &Value) -> Result<Ordering, Diagnostic> {
    match (left, right) {
        (Value::Str(lhs), Value::Str(rhs)) => Ok(lhs.cmp(rhs)),
        (Value::List(lhs), Value::List(rhs)) => sequence_ordering(&lhs.borrow(), &rhs.borrow()),
        (Value::Tuple(lhs), Value::Tuple(rhs)) => sequence_ordering(lhs, rhs),
        (lhs, rhs) => match (lhs.as_int(), rhs.as_int()) {
            (Some(lhs), Some(rhs)) => Ok(lhs.cmp(&rhs)),
            _ => match (lhs.as_number(), rhs.as_number()) {
                (Some(lhs), Some(rhs)) => Ok(lhs.partial_cmp(&rhs).unwrap_or(Ordering::Equal)),
                _ => Err(type_error(format!(
                    "Tidak dapat membandingkan '{}' dengan '{}'",
                    left.type_name(),
                    right.type_name()
                ))),
            },
        },
    }
}

fn sequence_ordering(left: &[Value], right: &[Value]) -> Result<Ordering, Diagnostic> {
    for (lhs, rhs) in left.iter().zip(right) {
        if lhs != rhs {
            return ordering(lhs, rhs);
        }
    }
    Ok(left.len().cmp(&right.len()))
}

fn compare(ty: Type, left: &Value, right: &Value) -> Result<bool, Diagnostic> {
    // NaN compares false with everything
    if let (Some(lhs), Some(rhs)) = (left.as_number(), right.as_number()) {
        if lhs.is_nan() || rhs.is_nan() {
            return Ok(false);
        }
    }

    let order = ordering(left, right).map_err(|_| operand_error(symbol(ty), &left.type_name(), &right.type_name()))?;
    Ok(match ty {
        Type::Less => order == Ordering::Less,
        Type::LessEqual => order != Ordering::Greater,
        Type::Greater => order == Ordering::Greater,
        _ => order != Ordering::Less,
    })
}

/// The `dalam` operator: `item dalam container`.
pub(crate) fn contains(container: &Value, item: &Value) -> Result<bool, Diagnostic> {
    match container {
        Value::Str(text) => match item {
            Value::Str(needle) => Ok(text.contains(needle.as_str())),
            other => Err(type_error(format!(
                "Operan kiri 'dalam' harus berupa teks, bukan '{}'",
                other.type_name()
            ))),
        },
        Value::List(values) => Ok(values.borrow().iter().any(|value| value == item)),
        Value::Tuple(values) => Ok(values.iter().any(|value| value == item)),
        Value::Dict(dict) => dict.borrow().contains(item),
        other => Err(type_error(format!(
            "Tipe '{}' tidak mendukung operator 'dalam'",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use renzmc_core::{ErrorKind, Type};

    use crate::ops::{binary, contains, unary};
    use crate::value::Value;

    #[test]
    fn test_arithmetic() {
        let cases = [
            (Type::Plus, Value::from(2), Value::from(3), Value::from(5)),
            (Type::Slash, Value::from(7), Value::from(2), Value::from(3.5)),
            (Type::SlashSlash, Value::from(-7), Value::from(2), Value::from(-4)),
            (Type::Percent, Value::from(-7), Value::from(3), Value::from(2)),
            (Type::Percent, Value::from(7), Value::from(-3), Value::from(-2)),
            (Type::StarStar, Value::from(2), Value::from(10), Value::from(1024)),
            (Type::StarStar, Value::from(2), Value::from(-1), Value::from(0.5)),
            (Type::Plus, Value::from(1), Value::from(0.5), Value::from(1.5)),
            (Type::Plus, Value::from("ab"), Value::from("cd"), Value::from("abcd")),
            (Type::Star, Value::from("ab"), Value::from(2), Value::from("abab")),
            (Type::LessLess, Value::from(1), Value::from(4), Value::from(16)),
            (Type::Amp, Value::from(true), Value::from(false), Value::from(false)),
        ];

        for (ty, left, right, expected) in cases {
            let result = binary(ty, &left, &right).unwrap();
            assert_eq!(result, expected, "{:?} {:?} {:?}", left, ty, right);
            assert_eq!(result.type_name(), expected.type_name());
        }
    }

    #[test]
    fn test_division_by_zero() {
        let error = binary(Type::Slash, &Value::from(1), &Value::from(0)).unwrap_err();
        assert_eq!(error.kind, ErrorKind::DivisionByZero);
        assert_eq!(error.message, "Pembagian dengan nol");

        let error = binary(Type::Percent, &Value::from(1.5), &Value::from(0.0)).unwrap_err();
        assert_eq!(error.message, "Modulo dengan nol");
    }

    #[test]
    fn test_overflow_is_reported() {
        let error = binary(Type::Star, &Value::from(i64::MAX), &Value::from(2)).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Value);
        assert!(unary(Type::Minus, &Value::from(i64::MIN)).is_err());
    }

    #[test]
    fn test_mismatched_operands() {
        let error = binary(Type::Minus, &Value::from("a"), &Value::from(1)).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Type);
        assert_eq!(
            error.message,
            "Operator - tidak dapat digunakan antara 'str' dan 'int'"
        );
        assert!(binary(Type::Less, &Value::from("a"), &Value::from(1)).is_err());
    }

    #[test]
    fn test_comparisons() {
        let lt = |l: Value, r: Value| binary(Type::Less, &l, &r).unwrap();
        assert_eq!(lt(Value::from(1), Value::from(1.5)), Value::from(true));
        assert_eq!(lt(Value::from("abc"), Value::from("abd")), Value::from(true));
        assert_eq!(
            lt(
                Value::list(vec![Value::from(1), Value::from(2)]),
                Value::list(vec![Value::from(1), Value::from(3)])
            ),
            Value::from(true)
        );
        assert_eq!(
            binary(Type::EqualEqual, &Value::from(1), &Value::from(1.0)).unwrap(),
            Value::from(true)
        );
    }

    #[test]
    fn test_contains() {
        let list = Value::list(vec![Value::from(1), Value::from("a")]);
        assert!(contains(&list, &Value::from("a")).unwrap());
        assert!(!contains(&list, &Value::from(2)).unwrap());
        assert!(contains(&Value::from("renzmc"), &Value::from("mc")).unwrap());
        assert!(contains(&Value::from(5), &Value::from(1)).is_err());
    }
}
