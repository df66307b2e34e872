//! Addon manifest parsing
//!
//! Odoo addons declare metadata in a `__manifest__.py` file holding a single
//! Python dict literal. The dependency lists inside it
//! (`external_dependencies.python`) must be read without ever executing
//! Python, so this module implements a structural literal parser: strings,
//! numbers, booleans, `None`, lists, tuples and dicts. Any expression
//! beyond a literal is a parse error.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A parsed Python literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum PyLiteral {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<PyLiteral>),
    Dict(Vec<(PyLiteral, PyLiteral)>),
}

impl PyLiteral {
    /// Look up a string key in a dict literal.
    pub fn get(&self, key: &str) -> Option<&PyLiteral> {
        match self {
            Self::Dict(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Self::Str(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Recursively find all `__manifest__.py` files under the given addons
/// directories. Unreadable entries are skipped.
pub fn find_manifest_files(addons_paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut manifests = Vec::new();
    for root in addons_paths {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && entry.file_name() == "__manifest__.py" {
                manifests.push(entry.into_path());
            }
        }
    }
    manifests.sort();
    manifests
}

/// Read a manifest file and return its `external_dependencies.python` list.
///
/// An absent key yields an empty list; entries that are not strings are
/// skipped with a warning.
pub fn external_python_dependencies(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let manifest = parse_literal(&content).map_err(|message| Error::ManifestParse {
        path: path.to_path_buf(),
        message,
    })?;
    let Some(python_deps) = manifest
        .get("external_dependencies")
        .and_then(|deps| deps.get("python"))
    else {
        return Ok(Vec::new());
    };
    let PyLiteral::List(items) = python_deps else {
        tracing::warn!(
            "manifest {}: external_dependencies.python is not a list",
            path.display()
        );
        return Ok(Vec::new());
    };
    let mut deps = Vec::new();
    for item in items {
        match item {
            PyLiteral::Str(s) => deps.push(s.clone()),
            other => {
                tracing::warn!(
                    "manifest {}: skipping non-string dependency {:?}",
                    path.display(),
                    other
                );
            }
        }
    }
    Ok(deps)
}

/// Parse a single Python literal from source text.
///
/// Comments and whitespace around and inside the literal are skipped.
/// Trailing commas are allowed everywhere, matching Python syntax.
pub fn parse_literal(source: &str) -> std::result::Result<PyLiteral, String> {
    let mut parser = Parser {
        chars: source.chars().collect(),
        pos: 0,
    };
    parser.skip_trivia();
    let value = parser.parse_value()?;
    parser.skip_trivia();
    if parser.pos < parser.chars.len() {
        return Err(format!("trailing input at offset {}", parser.pos));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += 1;
            } else if ch == '#' {
                while let Some(ch) = self.peek() {
                    self.pos += 1;
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> std::result::Result<(), String> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(format!("expected '{expected}', found '{ch}'")),
            None => Err(format!("expected '{expected}', found end of input")),
        }
    }

    fn starts_with(&self, word: &str) -> bool {
        word.chars()
            .enumerate()
            .all(|(i, ch)| self.chars.get(self.pos + i) == Some(&ch))
    }

    fn parse_value(&mut self) -> std::result::Result<PyLiteral, String> {
        match self.peek() {
            Some('\'') | Some('"') => self.parse_string_sequence(),
            Some('{') => self.parse_dict(),
            Some('[') => self.parse_sequence('[', ']'),
            Some('(') => self.parse_sequence('(', ')'),
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '+' => self.parse_number(),
            _ if self.starts_with("True") => {
                self.pos += 4;
                Ok(PyLiteral::Bool(true))
            }
            _ if self.starts_with("False") => {
                self.pos += 5;
                Ok(PyLiteral::Bool(false))
            }
            _ if self.starts_with("None") => {
                self.pos += 4;
                Ok(PyLiteral::None)
            }
            Some(ch) => Err(format!("unexpected character '{ch}' at offset {}", self.pos)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    /// Strings, handling adjacent concatenation (`'a' 'b'` is `'ab'`).
    fn parse_string_sequence(&mut self) -> std::result::Result<PyLiteral, String> {
        let mut value = self.parse_string()?;
        loop {
            let before = self.pos;
            self.skip_trivia();
            if matches!(self.peek(), Some('\'') | Some('"')) {
                value.push_str(&self.parse_string()?);
            } else {
                self.pos = before;
                return Ok(PyLiteral::Str(value));
            }
        }
    }

    fn parse_string(&mut self) -> std::result::Result<String, String> {
        let quote = self.bump().ok_or("expected string")?;
        // Triple-quoted strings are common in manifest descriptions.
        let triple = self.peek() == Some(quote) && self.chars.get(self.pos + 1) == Some(&quote);
        if triple {
            self.pos += 2;
        }
        let mut value = String::new();
        loop {
            let Some(ch) = self.bump() else {
                return Err("unterminated string".to_string());
            };
            if ch == '\\' {
                match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\n') => {}
                    Some(other) => value.push(other),
                    None => return Err("unterminated escape".to_string()),
                }
            } else if ch == quote {
                if !triple {
                    return Ok(value);
                }
                if self.peek() == Some(quote) && self.chars.get(self.pos + 1) == Some(&quote) {
                    self.pos += 2;
                    return Ok(value);
                }
                value.push(ch);
            } else {
                value.push(ch);
            }
        }
    }

    fn parse_number(&mut self) -> std::result::Result<PyLiteral, String> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.pos += 1;
            } else if ch == '.' && !is_float {
                is_float = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(PyLiteral::Float)
                .map_err(|_| format!("invalid float '{text}'"))
        } else {
            text.parse::<i64>()
                .map(PyLiteral::Int)
                .map_err(|_| format!("invalid integer '{text}'"))
        }
    }

    fn parse_sequence(
        &mut self,
        open: char,
        close: char,
    ) -> std::result::Result<PyLiteral, String> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(PyLiteral::List(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(ch) if ch == close => {}
                _ => return Err(format!("expected ',' or '{close}'")),
            }
        }
    }

    fn parse_dict(&mut self) -> std::result::Result<PyLiteral, String> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(PyLiteral::Dict(entries));
            }
            let key = self.parse_value()?;
            self.skip_trivia();
            self.expect(':')?;
            self.skip_trivia();
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some('}') => {}
                _ => return Err("expected ',' or '}'".to_string()),
            }
        }
    }
}
