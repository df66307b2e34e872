//! Marker expression evaluation against a target environment
//!
//! Requirement lines and extra-command specs can carry a boolean condition
//! over environment variables, e.g. `python_version < '3.8'` or the
//! non-standard `odoo_version >= '16.0' and odoo_version < '18.0'`.
//!
//! The grammar is the PEP 508 marker grammar: comparisons between variables
//! and quoted literals (either side may be the literal), the operators
//! `< <= > >= == != ~= === in`, `not in`, `and`/`or` with `and` binding
//! tighter, and parenthesized groups. Evaluation fails closed: an expression
//! that does not parse, or that references a variable absent from the
//! environment, never enables a requirement or a command.

use std::collections::BTreeMap;

use crate::version::Version;

/// The resolved set of variable values used to evaluate marker expressions
/// for one invocation.
///
/// Holds PEP-508-style keys (`python_version`, `sys_platform`, ...) plus the
/// non-standard `odoo_version`. Built once per run and treated as immutable
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct TargetEnv {
    vars: BTreeMap<String, String>,
}

impl TargetEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment seeded with the host platform keys and the
    /// given Odoo version.
    ///
    /// Interpreter-version keys are *not* set here; see
    /// [`TargetEnv::with_python_version`]. Kernel-level keys that cannot be
    /// known at provision time (`platform_release`, `platform_version`) are
    /// set to the empty string. A marker referencing an unset variable
    /// evaluates to `false`.
    pub fn for_platform(odoo_version: &str) -> Self {
        let mut env = Self::new();
        env.set("odoo_version", odoo_version);
        env.set("os_name", if cfg!(windows) { "nt" } else { "posix" });
        env.set(
            "sys_platform",
            match std::env::consts::OS {
                "macos" => "darwin",
                "windows" => "win32",
                other => other,
            },
        );
        env.set(
            "platform_system",
            match std::env::consts::OS {
                "macos" => "Darwin",
                "windows" => "Windows",
                "linux" => "Linux",
                other => other,
            },
        );
        env.set("platform_machine", std::env::consts::ARCH);
        env.set("platform_release", "");
        env.set("platform_version", "");
        env.set("platform_python_implementation", "CPython");
        env.set("implementation_name", "cpython");
        env
    }

    /// Set the interpreter version keys from a full version string,
    /// deriving `python_version` as the major.minor prefix.
    pub fn with_python_version(mut self, full_version: &str) -> Self {
        let major_minor = full_version
            .split('.')
            .take(2)
            .collect::<Vec<_>>()
            .join(".");
        self.set("python_version", &major_minor);
        self.set("python_full_version", full_version);
        self.set("implementation_version", full_version);
        self
    }

    /// Set a single variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Evaluate a marker expression against a target environment.
///
/// An empty expression is vacuously true. Evaluation never panics or
/// errors: a malformed expression, an unknown operator, or a reference to
/// an absent variable makes the whole expression `false`.
pub fn evaluate_marker(expr: &str, env: &TargetEnv) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        return true;
    }
    let tokens = match tokenize(expr) {
        Some(tokens) => tokens,
        None => return false,
    };
    let mut parser = Parser { tokens, pos: 0 };
    match parser.parse_or(env) {
        Some(value) if parser.at_end() => value,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    In,
    NotIn,
    Op(&'static str),
    Ident(String),
    Literal(String),
}

fn tokenize(expr: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => literal.push(c),
                        None => return None,
                    }
                }
                tokens.push(Token::Literal(literal));
            }
            '<' | '>' | '=' | '!' | '~' => {
                let mut op = String::new();
                op.push(ch);
                chars.next();
                while let Some(&next) = chars.peek() {
                    if next == '=' {
                        op.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let op = match op.as_str() {
                    "<" => "<",
                    "<=" => "<=",
                    ">" => ">",
                    ">=" => ">=",
                    "==" => "==",
                    "!=" => "!=",
                    "~=" => "~=",
                    "===" => "===",
                    _ => return None,
                };
                tokens.push(Token::Op(op));
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                let mut word = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' || next == '.' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "in" => tokens.push(Token::In),
                    "not" => {
                        // Only valid as part of 'not in'.
                        tokens.push(Token::NotIn);
                    }
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            _ => return None,
        }
    }
    // Fold "NotIn In" produced by the words 'not' 'in' into a single token,
    // rejecting a bare 'not'.
    let mut folded = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        if token == Token::NotIn {
            if iter.next() != Some(Token::In) {
                return None;
            }
            folded.push(Token::NotIn);
        } else {
            folded.push(token);
        }
    }
    Some(folded)
}

#[derive(Debug)]
enum Operand {
    Var(String),
    Lit(String),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos == self.tokens.len()
    }

    fn parse_or(&mut self, env: &TargetEnv) -> Option<bool> {
        // No short-circuiting: every arm must parse for the result to hold.
        let mut value = self.parse_and(env)?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.parse_and(env)?;
            value = value || rhs;
        }
        Some(value)
    }

    fn parse_and(&mut self, env: &TargetEnv) -> Option<bool> {
        let mut value = self.parse_atom(env)?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.parse_atom(env)?;
            value = value && rhs;
        }
        Some(value)
    }

    fn parse_atom(&mut self, env: &TargetEnv) -> Option<bool> {
        if self.peek() == Some(&Token::LParen) {
            self.next();
            let value = self.parse_or(env)?;
            if self.next() != Some(Token::RParen) {
                return None;
            }
            return Some(value);
        }
        let lhs = self.parse_operand()?;
        let op = self.next()?;
        let rhs = self.parse_operand()?;
        evaluate_comparison(&lhs, &op, &rhs, env)
    }

    fn parse_operand(&mut self) -> Option<Operand> {
        match self.next()? {
            Token::Ident(name) => Some(Operand::Var(name)),
            Token::Literal(value) => Some(Operand::Lit(value)),
            _ => None,
        }
    }
}

fn resolve<'a>(operand: &'a Operand, env: &'a TargetEnv) -> Option<&'a str> {
    match operand {
        Operand::Var(name) => env.get(name),
        Operand::Lit(value) => Some(value),
    }
}

fn evaluate_comparison(
    lhs: &Operand,
    op: &Token,
    rhs: &Operand,
    env: &TargetEnv,
) -> Option<bool> {
    let left = resolve(lhs, env)?;
    let right = resolve(rhs, env)?;
    match op {
        Token::In => Some(right.contains(left)),
        Token::NotIn => Some(!right.contains(left)),
        Token::Op("===") => Some(left == right),
        Token::Op("~=") => {
            let a = Version::parse(left)?;
            let b = Version::parse(right)?;
            let limit = b.compatible_release_bound()?;
            Some(a >= b && a < limit)
        }
        Token::Op(op) => Some(compare(left, op, right)),
        _ => None,
    }
}

/// Compare two values as dotted versions when both parse as such, falling
/// back to plain string comparison otherwise.
fn compare(actual: &str, op: &str, expected: &str) -> bool {
    match (Version::parse(actual), Version::parse(expected)) {
        (Some(a), Some(b)) => apply(op, a.cmp(&b)),
        _ => apply(op, actual.cmp(expected)),
    }
}

fn apply(op: &str, ordering: std::cmp::Ordering) -> bool {
    match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        ">=" => ordering.is_ge(),
        "==" => ordering.is_eq(),
        "!=" => ordering.is_ne(),
        _ => false,
    }
}
