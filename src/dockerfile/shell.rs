//! Shell-style word processing
//!
//! Expands `$name`, `${name}` and the `${name:-word}`, `${name:+word}`,
//! `${name:?message}` modifiers (with and without the colon) against an
//! [`Environment`], and removes quoting the way the image builder does when it
//! evaluates COPY, ADD, WORKDIR and ENV words.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("unterminated quote in {0:?}")]
    UnterminatedQuote(String),

    #[error("missing '}}' in {0:?}")]
    UnterminatedBrace(String),

    #[error("unsupported modifier ({modifier}) in substitution {word:?}")]
    UnsupportedModifier { modifier: char, word: String },

    #[error("{name}: {message}")]
    Required { name: String, message: String },
}

/// Ordered variable assignments; a redefinition replaces the earlier value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(String, String)>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Expands variables in `word` and strips its quoting
pub fn process_word(word: &str, env: &Environment, escape: char) -> Result<String, ShellError> {
    let mut lexer = Lexer {
        chars: word.chars().collect(),
        pos: 0,
        word,
        env,
        escape,
    };
    lexer.process()
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    word: &'a str,
    env: &'a Environment,
    escape: char,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn process(&mut self) -> Result<String, ShellError> {
        let mut out = String::new();
        while let Some(ch) = self.next() {
            match ch {
                '\'' => out.push_str(&self.single_quoted()?),
                '"' => out.push_str(&self.double_quoted()?),
                '$' => out.push_str(&self.dollar()?),
                c if c == self.escape => match self.next() {
                    Some(escaped) => out.push(escaped),
                    None => out.push(c),
                },
                c => out.push(c),
            }
        }
        Ok(out)
    }

    fn single_quoted(&mut self) -> Result<String, ShellError> {
        let mut out = String::new();
        loop {
            match self.next() {
                Some('\'') => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(ShellError::UnterminatedQuote(self.word.to_string())),
            }
        }
    }

    fn double_quoted(&mut self) -> Result<String, ShellError> {
        let mut out = String::new();
        loop {
            match self.next() {
                Some('"') => return Ok(out),
                Some('$') => out.push_str(&self.dollar()?),
                Some(c) if c == self.escape => match self.next() {
                    Some(escaped) if escaped == '"' || escaped == '$' || escaped == self.escape => {
                        out.push(escaped)
                    }
                    Some(other) => {
                        out.push(c);
                        out.push(other);
                    }
                    None => return Err(ShellError::UnterminatedQuote(self.word.to_string())),
                },
                Some(c) => out.push(c),
                None => return Err(ShellError::UnterminatedQuote(self.word.to_string())),
            }
        }
    }

    fn dollar(&mut self) -> Result<String, ShellError> {
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.braced()
            }
            Some(c) if is_name_start(c) => {
                let name = self.name();
                Ok(self.env.get(&name).unwrap_or_default().to_string())
            }
            _ => Ok("$".to_string()),
        }
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !is_name_char(c) {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        name
    }

    fn braced(&mut self) -> Result<String, ShellError> {
        let name = self.name();
        let env = self.env;
        let value = env.get(&name);

        let (colon, modifier) = match self.next() {
            Some('}') => return Ok(value.unwrap_or_default().to_string()),
            Some(':') => (true, self.next()),
            other => (false, other),
        };
        let modifier =
            modifier.ok_or_else(|| ShellError::UnterminatedBrace(self.word.to_string()))?;

        let raw = self.until_closing_brace()?;
        let operand = process_word(&raw, self.env, self.escape)?;

        // with a colon, an empty value counts as unset
        let set = match value {
            Some(v) => !(colon && v.is_empty()),
            None => false,
        };

        match modifier {
            '-' => Ok(if set {
                value.unwrap_or_default().to_string()
            } else {
                operand
            }),
            '+' => Ok(if set { operand } else { String::new() }),
            '?' => {
                if set {
                    Ok(value.unwrap_or_default().to_string())
                } else {
                    let message = if operand.is_empty() {
                        "is not allowed to be unset".to_string()
                    } else {
                        operand
                    };
                    Err(ShellError::Required { name, message })
                }
            }
            other => Err(ShellError::UnsupportedModifier {
                modifier: other,
                word: self.word.to_string(),
            }),
        }
    }

    /// Raw text up to the matching `}`, honoring nested braces
    fn until_closing_brace(&mut self) -> Result<String, ShellError> {
        let mut depth = 0usize;
        let mut raw = String::new();
        while let Some(c) = self.next() {
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => return Ok(raw),
                '}' => depth -= 1,
                _ => {}
            }
            raw.push(c);
        }
        Err(ShellError::UnterminatedBrace(self.word.to_string()))
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        let mut env = Environment::new();
        env.set("APP", "/opt/app");
        env.set("EMPTY", "");
        env
    }

    fn expand(word: &str) -> Result<String, ShellError> {
        process_word(word, &env(), '\\')
    }

    #[test]
    fn test_plain_and_braced_references() {
        assert_eq!(expand("$APP/bin").unwrap(), "/opt/app/bin");
        assert_eq!(expand("${APP}_data").unwrap(), "/opt/app_data");
        assert_eq!(expand("$MISSING/x").unwrap(), "/x");
    }

    #[test]
    fn test_default_and_alternate_modifiers() {
        assert_eq!(expand("${MISSING:-fallback}").unwrap(), "fallback");
        assert_eq!(expand("${EMPTY:-fallback}").unwrap(), "fallback");
        assert_eq!(expand("${EMPTY-fallback}").unwrap(), "");
        assert_eq!(expand("${APP:+set}").unwrap(), "set");
        assert_eq!(expand("${MISSING:+set}").unwrap(), "");
        assert_eq!(expand("${MISSING:-$APP}").unwrap(), "/opt/app");
    }

    #[test]
    fn test_required_modifier() {
        let err = expand("${MISSING:?must be set}").unwrap_err();
        assert_eq!(err.to_string(), "MISSING: must be set");
    }

    #[test]
    fn test_quotes_are_removed() {
        assert_eq!(expand("'$APP'").unwrap(), "$APP");
        assert_eq!(expand("\"$APP dir\"").unwrap(), "/opt/app dir");
        assert_eq!(expand("a\\ b").unwrap(), "a b");
        assert_eq!(expand("\\$APP").unwrap(), "$APP");
    }

    #[test]
    fn test_unterminated_input() {
        assert!(matches!(expand("'open"), Err(ShellError::UnterminatedQuote(_))));
        assert!(matches!(expand("${APP:-x"), Err(ShellError::UnterminatedBrace(_))));
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        assert_eq!(expand("cost$").unwrap(), "cost$");
        assert_eq!(expand("$1").unwrap(), "$1");
    }

    #[test]
    fn test_environment_redefinition_replaces_in_place() {
        let mut env = Environment::new();
        env.set("A", "1");
        env.set("B", "2");
        env.set("A", "3");

        assert_eq!(env.get("A"), Some("3"));
        assert_eq!(env.len(), 2);
    }
}
