//! Tokenizer for condition expressions (`IF` and `REQUIRE` lines).

use logos::Logos;
use std::fmt;

/// Token type for condition expressions.
///
/// Keywords are matched as whole words only: `ANDROID` lexes as a single
/// [`CondToken::Word`], never as `AND` followed by `ROID`.
#[derive(Debug, Clone, PartialEq)]
pub enum CondToken {
    /// Left parenthesis `(`.
    LParen,
    /// Right parenthesis `)`.
    RParen,
    /// `AND` or `&&`.
    And,
    /// `OR` or `||`.
    Or,
    /// `NOT` or `!`.
    Not,
    /// `HAS`.
    Has,
    /// A comparison operator.
    Op(CompareOp),
    /// A quoted literal, stored without its quotes.
    Quoted(String),
    /// A numeric literal as written.
    Number(String),
    /// A bare identifier or word.
    Word(String),
}

/// Comparison operators accepted between a flag and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=` or `==`.
    Eq,
    /// `!=`.
    Ne,
    /// `>`.
    Gt,
    /// `<`.
    Lt,
    /// `>=`.
    Ge,
    /// `<=`.
    Le,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        };
        f.write_str(s)
    }
}

impl fmt::Display for CondToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Not => write!(f, "NOT"),
            Self::Has => write!(f, "HAS"),
            Self::Op(op) => write!(f, "{op}"),
            Self::Quoted(s) => write!(f, "\"{s}\""),
            Self::Number(s) | Self::Word(s) => write!(f, "{s}"),
        }
    }
}

/// Internal logos token, converted to an owned [`CondToken`] after lexing.
#[derive(Logos, Debug)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("AND")]
    #[token("&&")]
    And,

    #[token("OR")]
    #[token("||")]
    Or,

    #[token("NOT")]
    #[token("!")]
    Not,

    #[token("HAS")]
    Has,

    #[token("==")]
    #[token("=")]
    Eq,

    #[token("!=")]
    Ne,

    #[token(">=")]
    Ge,

    #[token("<=")]
    Le,

    #[token(">")]
    Gt,

    #[token("<")]
    Lt,

    #[regex(r#""[^"]*""#)]
    #[regex(r"'[^']*'")]
    Quoted,

    #[regex(r"-?[0-9]+(\.[0-9]+)?")]
    Number,

    #[regex(r"[A-Za-z_][A-Za-z0-9_.\-]*")]
    Word,
}

/// A lexer error with its byte range inside the condition text.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// Byte range of the offending input.
    pub span: std::ops::Range<usize>,
    /// Human-readable description.
    pub message: String,
}

/// Lex a condition expression.
///
/// Stops at the first unrecognised character: conditions are short and a
/// partial token stream is never evaluated.
pub fn lex_condition(source: &str) -> Result<Vec<CondToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice();
        let token = match result {
            Ok(RawToken::LParen) => CondToken::LParen,
            Ok(RawToken::RParen) => CondToken::RParen,
            Ok(RawToken::And) => CondToken::And,
            Ok(RawToken::Or) => CondToken::Or,
            Ok(RawToken::Not) => CondToken::Not,
            Ok(RawToken::Has) => CondToken::Has,
            Ok(RawToken::Eq) => CondToken::Op(CompareOp::Eq),
            Ok(RawToken::Ne) => CondToken::Op(CompareOp::Ne),
            Ok(RawToken::Ge) => CondToken::Op(CompareOp::Ge),
            Ok(RawToken::Le) => CondToken::Op(CompareOp::Le),
            Ok(RawToken::Gt) => CondToken::Op(CompareOp::Gt),
            Ok(RawToken::Lt) => CondToken::Op(CompareOp::Lt),
            Ok(RawToken::Quoted) => CondToken::Quoted(slice[1..slice.len() - 1].to_string()),
            Ok(RawToken::Number) => CondToken::Number(slice.to_string()),
            Ok(RawToken::Word) => CondToken::Word(slice.to_string()),
            Err(()) => {
                return Err(LexError {
                    span: span.clone(),
                    message: format!("unexpected character: {:?}", &source[span]),
                });
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[CondToken]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn keywords_and_words() {
        let tokens = lex_condition("flag1 AND NOT flag2 OR flag3").unwrap();
        assert_eq!(
            tokens,
            vec![
                CondToken::Word("flag1".into()),
                CondToken::And,
                CondToken::Not,
                CondToken::Word("flag2".into()),
                CondToken::Or,
                CondToken::Word("flag3".into()),
            ]
        );
    }

    #[test]
    fn keyword_prefix_stays_a_word() {
        let tokens = lex_condition("ANDROID OR NOTE").unwrap();
        assert_eq!(
            tokens,
            vec![
                CondToken::Word("ANDROID".into()),
                CondToken::Or,
                CondToken::Word("NOTE".into()),
            ]
        );
    }

    #[test]
    fn has_call() {
        let tokens = lex_condition("NOT HAS(brass_key)").unwrap();
        assert_eq!(words(&tokens), vec!["NOT", "HAS", "(", "brass_key", ")"]);
    }

    #[test]
    fn comparison_operators() {
        let tokens = lex_condition("a = 1 b == 2 c != 3 d >= 4 e <= 5 f > 6 g < 7").unwrap();
        let ops: Vec<CompareOp> = tokens
            .into_iter()
            .filter_map(|t| match t {
                CondToken::Op(op) => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                CompareOp::Eq,
                CompareOp::Eq,
                CompareOp::Ne,
                CompareOp::Ge,
                CompareOp::Le,
                CompareOp::Gt,
                CompareOp::Lt,
            ]
        );
    }

    #[test]
    fn quoted_literals() {
        let tokens = lex_condition(r#"mood == "very angry""#).unwrap();
        assert_eq!(tokens[2], CondToken::Quoted("very angry".into()));
    }

    #[test]
    fn unexpected_character() {
        let err = lex_condition("a $ b").unwrap_err();
        assert_eq!(err.span, 2..3);
    }
}
