//! # Conduit Expression
//!
//! The sandboxed scalar expression language from spec §6.5, used to
//! evaluate `condition.expression` strings when a workflow definition was
//! deserialized (closures are runtime-only and never cross the
//! serialization boundary — spec §9).
//!
//! Grammar: boolean/arithmetic expressions over identifiers resolved from a
//! variable bag. Operators `=== !== == != < <= > >= && || !`, arithmetic
//! `+ - * / %`, dotted member access `.`, parentheses. No function calls, no
//! assignment, no global access — evaluation is pure and deterministic.

mod ast;
mod eval;
mod lexer;
mod parser;

use serde_json::Value;

pub use lexer::LexError;
pub use parser::ParseError;

/// Failure evaluating an already-parsed expression against a scope.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EvalError {
    /// A binary/unary numeric operator was applied to a non-numeric value.
    #[error("expected a number, found {0}")]
    NotANumber(Value),
    /// Division or modulo by a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
}

/// Either stage of turning expression source into a result can fail.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// Tokenizing failed.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// Parsing the token stream into an AST failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Evaluating the AST against a scope failed.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A parsed, reusable expression.
///
/// Parsing is separated from evaluation so an engine can parse a workflow
/// definition's `condition.expression` once at load time and evaluate it
/// repeatedly per execution.
#[derive(Debug, Clone)]
pub struct Expression {
    ast: ast::Expr,
}

impl Expression {
    /// Parse expression source into a reusable [`Expression`].
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = lexer::lex(source)?;
        let ast = parser::Parser::new(&tokens).parse_expression()?;
        Ok(Self { ast })
    }

    /// Evaluate this expression against a scope.
    ///
    /// `scope` is a JSON object whose top-level keys are the roots
    /// identifiers may start from (e.g. `{"vars": ..., "evt": ...}`).
    pub fn evaluate(&self, scope: &Value) -> Result<Value, EvalError> {
        eval::eval(&self.ast, scope)
    }

    /// Evaluate and coerce the result to a boolean using the same
    /// truthiness rule `!` uses — the common case for `condition` nodes.
    pub fn evaluate_bool(&self, scope: &Value) -> Result<bool, EvalError> {
        Ok(match self.evaluate(scope)? {
            Value::Bool(b) => b,
            Value::Null => false,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_function_calls() {
        let err = Expression::parse("foo(1)");
        assert!(err.is_err());
    }

    #[test]
    fn rejects_assignment() {
        let err = Expression::parse("vars.x = 1");
        assert!(err.is_err());
    }

    #[test]
    fn condition_as_bool() {
        let expr = Expression::parse("vars.tier === \"premium\"").unwrap();
        let scope = serde_json::json!({"vars": {"tier": "premium"}});
        assert!(expr.evaluate_bool(&scope).unwrap());
    }
}
