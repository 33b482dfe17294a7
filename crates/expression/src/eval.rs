//! Pure, deterministic evaluation of an [`Expr`] against a variable bag.

use serde_json::Value;

use crate::ast::{BinOp, Expr, UnOp};
use crate::EvalError;

/// Evaluate an expression tree against a JSON object acting as the root
/// variable scope (dotted paths resolve through nested objects).
pub(crate) fn eval(expr: &Expr, scope: &Value) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::from(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Path(segments) => Ok(resolve_path(scope, segments)),
        Expr::Unary(op, inner) => eval_unary(*op, &eval(inner, scope)?),
        Expr::Binary(lhs, op, rhs) => eval_binary(*op, lhs, rhs, scope),
    }
}

fn resolve_path(scope: &Value, segments: &[String]) -> Value {
    let mut current = scope;
    for segment in segments {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

fn eval_unary(op: UnOp, value: &Value) -> Result<Value, EvalError> {
    match op {
        UnOp::Not => Ok(Value::Bool(!truthy(value))),
        UnOp::Neg => as_number(value).map(|n| Value::from(-n)),
    }
}

fn eval_binary(op: BinOp, lhs: &Expr, rhs: &Expr, scope: &Value) -> Result<Value, EvalError> {
    // Short-circuit boolean operators evaluate their right side lazily.
    if op == BinOp::And {
        let l = eval(lhs, scope)?;
        return if !truthy(&l) {
            Ok(Value::Bool(false))
        } else {
            Ok(Value::Bool(truthy(&eval(rhs, scope)?)))
        };
    }
    if op == BinOp::Or {
        let l = eval(lhs, scope)?;
        return if truthy(&l) {
            Ok(Value::Bool(true))
        } else {
            Ok(Value::Bool(truthy(&eval(rhs, scope)?)))
        };
    }

    let l = eval(lhs, scope)?;
    let r = eval(rhs, scope)?;

    match op {
        BinOp::StrictEq => Ok(Value::Bool(strict_eq(&l, &r))),
        BinOp::StrictNotEq => Ok(Value::Bool(!strict_eq(&l, &r))),
        BinOp::LooseEq => Ok(Value::Bool(loose_eq(&l, &r))),
        BinOp::LooseNotEq => Ok(Value::Bool(!loose_eq(&l, &r))),
        BinOp::Lt => Ok(Value::Bool(as_number(&l)? < as_number(&r)?)),
        BinOp::Le => Ok(Value::Bool(as_number(&l)? <= as_number(&r)?)),
        BinOp::Gt => Ok(Value::Bool(as_number(&l)? > as_number(&r)?)),
        BinOp::Ge => Ok(Value::Bool(as_number(&l)? >= as_number(&r)?)),
        BinOp::Add => numeric_add(&l, &r),
        BinOp::Sub => Ok(Value::from(as_number(&l)? - as_number(&r)?)),
        BinOp::Mul => Ok(Value::from(as_number(&l)? * as_number(&r)?)),
        BinOp::Div => {
            let divisor = as_number(&r)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::from(as_number(&l)? / divisor))
        }
        BinOp::Mod => {
            let divisor = as_number(&r)?;
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::from(as_number(&l)? % divisor))
        }
        BinOp::And | BinOp::Or => unreachable!("handled above with short-circuiting"),
    }
}

/// String concatenation when either side is a string, numeric addition
/// otherwise — mirrors the one overload the grammar needs for `+`.
fn numeric_add(l: &Value, r: &Value) -> Result<Value, EvalError> {
    if l.is_string() || r.is_string() {
        Ok(Value::String(format!("{}{}", display(l), display(r))))
    } else {
        Ok(Value::from(as_number(l)? + as_number(r)?))
    }
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_number(v: &Value) -> Result<f64, EvalError> {
    v.as_f64().ok_or_else(|| EvalError::NotANumber(v.clone()))
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// `===` / `!==`: no implicit coercion, types must match exactly.
fn strict_eq(l: &Value, r: &Value) -> bool {
    l == r
}

/// `==` / `!=`: numeric/string values compare after coercing to string when
/// types differ, matching the spec's "scalar expression language" scope —
/// no coercion surprises beyond number/string interchange.
fn loose_eq(l: &Value, r: &Value) -> bool {
    if std::mem::discriminant(l) == std::mem::discriminant(r) {
        return l == r;
    }
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => display(l) == display(r),
    }
}
