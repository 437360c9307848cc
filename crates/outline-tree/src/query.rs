//! Text query language.
//!
//! A query is a boolean expression over search terms:
//!
//! - bare words and `"quoted strings"` are terms,
//! - `&&` / `AND`, `||` / `OR` combine them, adjacent terms imply AND,
//! - `!` / `NOT` / a leading `-` negate,
//! - parentheses group.
//!
//! A term matches an item when it is a case-insensitive substring of the
//! item's filter string. Terms are escaped the same way filter strings are,
//! so `"Start Here"` finds `Name=Start_Here`.

use thiserror::Error;

/// Errors produced while parsing a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unbalanced parenthesis at position {0}")]
    UnbalancedParenthesis(usize),

    #[error("Operator '{0}' is missing an operand")]
    DanglingOperator(&'static str),

    #[error("Unterminated quoted string starting at position {0}")]
    UnterminatedQuote(usize),
}

/// Replaces characters that cannot appear in a query term: spaces become
/// `_` and `!` becomes `$`.
pub fn escape_filter_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' ' => '_',
            '!' => '$',
            other => other,
        })
        .collect()
}

/// Classification of a parsed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Nothing but whitespace.
    Empty,
    /// Text that failed to parse.
    Invalid,
    Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    /// Lowercased, escaped needle.
    Term(String),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    fn eval(&self, haystack: &str) -> bool {
        match self {
            Expr::Term(needle) => haystack.contains(needle.as_str()),
            Expr::Not(inner) => !inner.eval(haystack),
            Expr::And(items) => items.iter().all(|item| item.eval(haystack)),
            Expr::Or(items) => items.iter().any(|item| item.eval(haystack)),
        }
    }
}

/// A parsed text query.
#[derive(Debug, Clone, Default)]
pub struct TextQuery {
    source: String,
    expr: Option<Expr>,
    error: Option<QueryError>,
}

impl TextQuery {
    /// Parses query text. Never fails: malformed text yields an
    /// [`Invalid`](QueryKind::Invalid) query that matches nothing and
    /// counts as inactive.
    pub fn parse(text: &str) -> Self {
        let source = text.to_string();
        match tokenize(text).and_then(|tokens| Parser::new(tokens).parse()) {
            Ok(expr) => Self {
                source,
                expr,
                error: None,
            },
            Err(error) => Self {
                source,
                expr: None,
                error: Some(error),
            },
        }
    }

    pub fn kind(&self) -> QueryKind {
        match (&self.expr, &self.error) {
            (_, Some(_)) => QueryKind::Invalid,
            (Some(_), None) => QueryKind::Expression,
            (None, None) => QueryKind::Empty,
        }
    }

    /// Returns true when the query should drive matching.
    pub fn is_active(&self) -> bool {
        self.kind() == QueryKind::Expression
    }

    /// The parse error of an invalid query.
    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// The original text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the query against a filter string.
    pub fn matches(&self, filter_string: &str) -> bool {
        match &self.expr {
            Some(expr) => expr.eval(&filter_string.to_lowercase()),
            None => false,
        }
    }
}

// ─── Lexer ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Term(String),
    And,
    Or,
    Not,
    Open(usize),
    Close(usize),
}

fn is_word_break(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
        return true;
    }
    let next = chars.get(i + 1).copied();
    (c == '&' && next == Some('&')) || (c == '|' && next == Some('|'))
}

fn tokenize(text: &str) -> Result<Vec<Token>, QueryError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => {
                tokens.push(Token::Open(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close(i));
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '-' if next.is_some_and(|n| !n.is_whitespace()) => {
                tokens.push(Token::Not);
                i += 1;
            }
            '"' => {
                let start = i;
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == '"')
                    .ok_or(QueryError::UnterminatedQuote(start))?;
                let body: String = chars[i + 1..i + 1 + close].iter().collect();
                if !body.is_empty() {
                    tokens.push(Token::Term(body));
                }
                i += close + 2;
            }
            _ => {
                let start = i;
                while i < chars.len() && !(i > start && is_word_break(&chars, i)) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    _ => Token::Term(word),
                });
            }
        }
    }

    Ok(tokens)
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Recursive descent over
///
/// ```text
/// or    := and ( "||" and )*
/// and   := unary ( "&&"? unary )*
/// unary := "!" unary | primary
/// primary := TERM | "(" or ")"
/// ```
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Option<Expr>, QueryError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(Some(expr)),
            Some(Token::Close(at)) => Err(QueryError::UnbalancedParenthesis(*at)),
            Some(_) => Err(QueryError::DanglingOperator("||")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expr, QueryError> {
        let mut items = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.bump();
            items.push(self.operand("||", Self::parse_and)?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<Expr, QueryError> {
        let mut items = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.bump();
                    items.push(self.operand("&&", Self::parse_unary)?);
                }
                // Implicit AND between adjacent operands.
                Some(Token::Term(_)) | Some(Token::Not) | Some(Token::Open(_)) => {
                    items.push(self.parse_unary()?);
                }
                _ => break,
            }
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, QueryError> {
        if self.peek() == Some(&Token::Not) {
            self.bump();
            let inner = self.operand("!", Self::parse_unary)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        match self.bump() {
            Some(Token::Term(text)) => Ok(Expr::Term(escape_filter_text(&text).to_lowercase())),
            Some(Token::Open(at)) => {
                if matches!(self.peek(), Some(Token::Close(_))) {
                    return Err(QueryError::UnbalancedParenthesis(at));
                }
                let inner = self.parse_or()?;
                match self.bump() {
                    Some(Token::Close(_)) => Ok(inner),
                    _ => Err(QueryError::UnbalancedParenthesis(at)),
                }
            }
            Some(Token::Close(at)) => Err(QueryError::UnbalancedParenthesis(at)),
            Some(Token::And) => Err(QueryError::DanglingOperator("&&")),
            Some(Token::Or) => Err(QueryError::DanglingOperator("||")),
            Some(Token::Not) => Err(QueryError::DanglingOperator("!")),
            None => Err(QueryError::DanglingOperator("&&")),
        }
    }

    /// Parses the right-hand side of an operator, reporting the operator
    /// when the input ends or a closing parenthesis follows.
    fn operand(
        &mut self,
        op: &'static str,
        parse: fn(&mut Self) -> Result<Expr, QueryError>,
    ) -> Result<Expr, QueryError> {
        match self.peek() {
            None | Some(Token::Close(_)) | Some(Token::And) | Some(Token::Or) => {
                Err(QueryError::DanglingOperator(op))
            }
            _ => parse(self),
        }
    }
}
