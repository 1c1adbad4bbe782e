//! Boolean condition grammar for `IF` and `REQUIRE` lines.
//!
//! Precedence from lowest to highest: `OR`, `AND`, `NOT`, primary. A primary
//! is `HAS(item)`, a comparison `flag OP value`, a bare flag name (truthiness),
//! or a parenthesised sub-expression.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::lexer::{CompareOp, CondToken, lex_condition};
use crate::value::FlagValue;

/// Read access to the state a condition is evaluated against.
pub trait Facts {
    /// Current value of a flag, `None` when it was never set.
    fn flag(&self, name: &str) -> Option<&FlagValue>;

    /// Whether the item is in the inventory.
    fn has_item(&self, item: &str) -> bool;
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `HAS(item)`.
    Has(String),
    /// `flag OP value`.
    Compare {
        /// Flag name on the left-hand side.
        flag: String,
        /// Comparison operator.
        op: CompareOp,
        /// Literal on the right-hand side, coerced like `SET` values.
        value: FlagValue,
    },
    /// A bare flag name, true when the flag value is truthy.
    Flag(String),
    /// A fixed truth value (`true`/`false` literals).
    Literal(bool),
    /// Logical NOT.
    Not(Box<Condition>),
    /// Logical AND.
    And(Vec<Condition>),
    /// Logical OR.
    Or(Vec<Condition>),
}

/// Why a condition string could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    /// The condition text is empty.
    #[error("empty condition")]
    Empty,
    /// An unrecognised character.
    #[error("{0}")]
    Lex(String),
    /// A token appeared where it is not allowed.
    #[error("unexpected `{found}` in condition, expected {expected}")]
    Unexpected {
        /// The offending token.
        found: String,
        /// What the grammar expected instead.
        expected: &'static str,
    },
    /// The expression ended too early.
    #[error("condition ended early, expected {0}")]
    UnexpectedEnd(&'static str),
}

impl Condition {
    /// Parse a condition string.
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        if source.trim().is_empty() {
            return Err(ConditionError::Empty);
        }
        let tokens = lex_condition(source).map_err(|e| ConditionError::Lex(e.message))?;
        let mut parser = CondParser { tokens, pos: 0 };
        let condition = parser.or_expr()?;
        match parser.peek() {
            None => Ok(condition),
            Some(token) => Err(ConditionError::Unexpected {
                found: token.to_string(),
                expected: "end of condition",
            }),
        }
    }

    /// Evaluate the condition. Absent flags read as `false`.
    pub fn evaluate(&self, facts: &dyn Facts) -> bool {
        match self {
            Condition::Has(item) => facts.has_item(item),
            Condition::Compare { flag, op, value } => {
                let missing = FlagValue::Bool(false);
                let current = facts.flag(flag).unwrap_or(&missing);
                compare(current, *op, value)
            }
            Condition::Flag(name) => facts.flag(name).is_some_and(FlagValue::is_truthy),
            Condition::Literal(b) => *b,
            Condition::Not(inner) => !inner.evaluate(facts),
            Condition::And(conditions) => conditions.iter().all(|c| c.evaluate(facts)),
            Condition::Or(conditions) => conditions.iter().any(|c| c.evaluate(facts)),
        }
    }
}

fn compare(current: &FlagValue, op: CompareOp, expected: &FlagValue) -> bool {
    match op {
        CompareOp::Eq => current.loose_eq(expected),
        CompareOp::Ne => !current.loose_eq(expected),
        CompareOp::Gt => current.numeric_cmp(expected) == Some(Ordering::Greater),
        CompareOp::Lt => current.numeric_cmp(expected) == Some(Ordering::Less),
        CompareOp::Ge => matches!(
            current.numeric_cmp(expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Le => matches!(
            current.numeric_cmp(expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Has(item) => write!(f, "HAS({item})"),
            Condition::Compare { flag, op, value } => match value {
                FlagValue::Text(s) => write!(f, "{flag} {op} \"{s}\""),
                other => write!(f, "{flag} {op} {other}"),
            },
            Condition::Flag(name) => write!(f, "{name}"),
            Condition::Literal(b) => write!(f, "{b}"),
            Condition::Not(inner) => match inner.as_ref() {
                Condition::And(_) | Condition::Or(_) => write!(f, "NOT ({inner})"),
                _ => write!(f, "NOT {inner}"),
            },
            Condition::And(parts) => write_joined(f, parts, " AND ", |c| {
                matches!(c, Condition::Or(_))
            }),
            Condition::Or(parts) => write_joined(f, parts, " OR ", |_| false),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    parts: &[Condition],
    sep: &str,
    needs_parens: impl Fn(&Condition) -> bool,
) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if needs_parens(part) {
            write!(f, "({part})")?;
        } else {
            write!(f, "{part}")?;
        }
    }
    Ok(())
}

/// Recursive-descent parser over condition tokens.
struct CondParser {
    tokens: Vec<CondToken>,
    pos: usize,
}

impl CondParser {
    fn peek(&self) -> Option<&CondToken> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<CondToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &CondToken) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &CondToken, expected: &'static str) -> Result<(), ConditionError> {
        match self.next() {
            Some(ref t) if t == token => Ok(()),
            Some(t) => Err(ConditionError::Unexpected {
                found: t.to_string(),
                expected,
            }),
            None => Err(ConditionError::UnexpectedEnd(expected)),
        }
    }

    fn or_expr(&mut self) -> Result<Condition, ConditionError> {
        let mut parts = vec![self.and_expr()?];
        while self.eat(&CondToken::Or) {
            parts.push(self.and_expr()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::Or(parts)
        })
    }

    fn and_expr(&mut self) -> Result<Condition, ConditionError> {
        let mut parts = vec![self.not_expr()?];
        while self.eat(&CondToken::And) {
            parts.push(self.not_expr()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::And(parts)
        })
    }

    fn not_expr(&mut self) -> Result<Condition, ConditionError> {
        if self.eat(&CondToken::Not) {
            return Ok(Condition::Not(Box::new(self.not_expr()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Condition, ConditionError> {
        match self.next() {
            Some(CondToken::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&CondToken::RParen, "`)`")?;
                Ok(inner)
            }
            Some(CondToken::Has) => self.has_item(),
            Some(CondToken::Word(name)) => {
                if let Some(CondToken::Op(op)) = self.peek().cloned() {
                    self.pos += 1;
                    let value = self.literal()?;
                    return Ok(Condition::Compare {
                        flag: name,
                        op,
                        value,
                    });
                }
                Ok(match name.as_str() {
                    "true" => Condition::Literal(true),
                    "false" => Condition::Literal(false),
                    _ => Condition::Flag(name),
                })
            }
            Some(token) => Err(ConditionError::Unexpected {
                found: token.to_string(),
                expected: "a flag, HAS(...) or `(`",
            }),
            None => Err(ConditionError::UnexpectedEnd("a flag, HAS(...) or `(`")),
        }
    }

    fn has_item(&mut self) -> Result<Condition, ConditionError> {
        let parenthesised = self.eat(&CondToken::LParen);
        let item = match self.next() {
            Some(CondToken::Word(s) | CondToken::Quoted(s) | CondToken::Number(s)) => s,
            Some(token) => {
                return Err(ConditionError::Unexpected {
                    found: token.to_string(),
                    expected: "an item name",
                });
            }
            None => return Err(ConditionError::UnexpectedEnd("an item name")),
        };
        if parenthesised {
            self.expect(&CondToken::RParen, "`)` after item name")?;
        }
        Ok(Condition::Has(item))
    }

    fn literal(&mut self) -> Result<FlagValue, ConditionError> {
        match self.next() {
            Some(CondToken::Quoted(s)) => Ok(FlagValue::Text(s)),
            Some(CondToken::Number(s) | CondToken::Word(s)) => Ok(FlagValue::from_literal(&s)),
            Some(token) => Err(ConditionError::Unexpected {
                found: token.to_string(),
                expected: "a value",
            }),
            None => Err(ConditionError::UnexpectedEnd("a value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct TestFacts {
        flags: HashMap<String, FlagValue>,
        items: HashSet<String>,
    }

    impl TestFacts {
        fn with_flag(mut self, name: &str, value: impl Into<FlagValue>) -> Self {
            self.flags.insert(name.to_string(), value.into());
            self
        }

        fn with_item(mut self, item: &str) -> Self {
            self.items.insert(item.to_string());
            self
        }
    }

    impl Facts for TestFacts {
        fn flag(&self, name: &str) -> Option<&FlagValue> {
            self.flags.get(name)
        }

        fn has_item(&self, item: &str) -> bool {
            self.items.contains(item)
        }
    }

    fn eval(source: &str, facts: &TestFacts) -> bool {
        Condition::parse(source).unwrap().evaluate(facts)
    }

    #[test]
    fn or_binds_loosest() {
        let facts = TestFacts::default()
            .with_flag("flag1", true)
            .with_flag("flag2", false)
            .with_flag("flag3", true);
        assert!(eval("flag1 AND NOT flag2 OR flag3", &facts));

        let parsed = Condition::parse("flag1 AND NOT flag2 OR flag3").unwrap();
        assert_eq!(
            parsed,
            Condition::Or(vec![
                Condition::And(vec![
                    Condition::Flag("flag1".into()),
                    Condition::Not(Box::new(Condition::Flag("flag2".into()))),
                ]),
                Condition::Flag("flag3".into()),
            ])
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        let facts = TestFacts::default().with_flag("a", false).with_flag("c", true);
        assert!(!eval("a AND (b OR c)", &facts));
        assert!(eval("(a AND b) OR c", &facts));
    }

    #[test]
    fn has_and_not_has() {
        let facts = TestFacts::default().with_item("lamp");
        assert!(eval("HAS(lamp)", &facts));
        assert!(!eval("NOT HAS(lamp)", &facts));
        assert!(eval("NOT HAS(rope)", &facts));
        assert!(eval("HAS lamp", &facts));
    }

    #[test]
    fn comparisons_coerce_literals() {
        let facts = TestFacts::default()
            .with_flag("coins", 5)
            .with_flag("mood", "angry")
            .with_flag("door_open", true);
        assert!(eval("coins = 5", &facts));
        assert!(eval("coins == 5", &facts));
        assert!(eval("coins >= 5", &facts));
        assert!(eval("coins > 4", &facts));
        assert!(!eval("coins < 5", &facts));
        assert!(eval("coins <= 5", &facts));
        assert!(eval("coins != 3", &facts));
        assert!(eval("mood == angry", &facts));
        assert!(eval(r#"mood == "angry""#, &facts));
        assert!(eval("door_open == true", &facts));
    }

    #[test]
    fn missing_flags_read_false() {
        let facts = TestFacts::default();
        assert!(!eval("ghost", &facts));
        assert!(eval("NOT ghost", &facts));
        assert!(eval("ghost == false", &facts));
        assert!(!eval("ghost > 0", &facts));
    }

    #[test]
    fn word_boundaries_are_respected() {
        let facts = TestFacts::default().with_flag("ANDROID", true);
        assert!(eval("ANDROID", &facts));
        assert!(eval("ORACLE OR ANDROID", &facts));
    }

    #[test]
    fn malformed_conditions() {
        assert_eq!(Condition::parse("   "), Err(ConditionError::Empty));
        assert!(matches!(
            Condition::parse("(a AND b"),
            Err(ConditionError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            Condition::parse("a b"),
            Err(ConditionError::Unexpected { .. })
        ));
        assert!(matches!(Condition::parse("a # b"), Err(ConditionError::Lex(_))));
    }

    #[test]
    fn display_is_reparseable() {
        let source = "NOT (a OR HAS(key)) AND coins >= 3 OR mood == \"calm\"";
        let parsed = Condition::parse(source).unwrap();
        let reparsed = Condition::parse(&parsed.to_string()).unwrap();
        assert_eq!(parsed, reparsed);
    }
}
