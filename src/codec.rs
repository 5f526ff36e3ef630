//! Line-oriented parser for tunnel config files.
//!
//! A config file is split into lines; each line is either a directive of one
//! of the requested [`Dialect`]s (active, or disabled by a one-character
//! comment prefix) or an opaque line kept verbatim. Switching toggles the
//! comment prefix of directive lines and writes everything else back
//! byte-for-byte.

use std::fs;
use std::path::Path;

use crate::constants;
use crate::error::{Result, SwitchError};

/// Grammar of one switchable directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// First whitespace-delimited token of the line.
    pub keyword: &'static str,
    /// Index of the token holding the endpoint.
    pub field: usize,
    /// Minimum number of tokens for a line to count as a directive.
    pub min_fields: usize,
    /// Prefix disabling the line.
    pub comment: char,
}

impl Dialect {
    /// `Endpoint = host:port`
    pub const WIREGUARD_ENDPOINT: Self = Self {
        keyword: constants::WIREGUARD_ENDPOINT_KEYWORD,
        field: 2,
        min_fields: 3,
        comment: constants::WIREGUARD_COMMENT,
    };

    /// `PublicKey = base64`
    pub const WIREGUARD_PUBLIC_KEY: Self = Self {
        keyword: constants::WIREGUARD_PUBLIC_KEY_KEYWORD,
        field: 2,
        min_fields: 3,
        comment: constants::WIREGUARD_COMMENT,
    };

    /// `remote host port [proto]`
    pub const OPENVPN_REMOTE: Self = Self {
        keyword: constants::OPENVPN_REMOTE_KEYWORD,
        field: 1,
        min_fields: 3,
        comment: constants::OPENVPN_COMMENT,
    };

    fn matches(&self, text: &str) -> bool {
        let mut tokens = text.split_whitespace();
        tokens.next() == Some(self.keyword) && tokens.count() + 1 >= self.min_fields
    }
}

/// A directive line, stored without its comment prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub dialect: Dialect,
    pub active: bool,
    text: String,
}

impl Directive {
    /// The endpoint carried by this line.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.text.split_whitespace().nth(self.dialect.field)
    }

    fn set_value(&mut self, value: &str) -> bool {
        let Some(token) = self.text.split_whitespace().nth(self.dialect.field) else {
            return false;
        };
        let start = token.as_ptr() as usize - self.text.as_ptr() as usize;
        let end = start + token.len();
        self.text.replace_range(start..end, value);
        true
    }

    fn render(&self) -> String {
        if self.active {
            self.text.clone()
        } else {
            format!("{}{}", self.dialect.comment, self.text)
        }
    }
}

/// One line of a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Directive(Directive),
    Other(String),
}

impl Line {
    fn parse(raw: &str, dialects: &[Dialect]) -> Self {
        for dialect in dialects {
            if dialect.matches(raw) {
                return Self::Directive(Directive {
                    dialect: *dialect,
                    active: true,
                    text: raw.to_string(),
                });
            }
            if let Some(rest) = raw.strip_prefix(dialect.comment) {
                if dialect.matches(rest) {
                    return Self::Directive(Directive {
                        dialect: *dialect,
                        active: false,
                        text: rest.to_string(),
                    });
                }
            }
        }
        Self::Other(raw.to_string())
    }
}

/// Parsed config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    lines: Vec<Line>,
}

impl ConfigFile {
    /// Parses `content`, recognising directives of the given dialects.
    #[must_use]
    pub fn parse(content: &str, dialects: &[Dialect]) -> Self {
        Self {
            lines: content
                .split('\n')
                .map(|raw| Line::parse(raw, dialects))
                .collect(),
        }
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Io`] if the file cannot be read.
    pub fn load(path: &Path, dialects: &[Dialect]) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SwitchError::io(path, e))?;
        Ok(Self::parse(&content, dialects))
    }

    /// Overwrites the file at `path` with the serialised document.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::Io`] if the file cannot be written.
    pub fn store(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render()).map_err(|e| SwitchError::io(path, e))
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| match line {
                Line::Directive(d) => d.render(),
                Line::Other(raw) => raw.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    fn directives(&self, dialect: &Dialect) -> impl Iterator<Item = &Directive> {
        let keyword = dialect.keyword;
        self.lines.iter().filter_map(move |line| match line {
            Line::Directive(d) if d.dialect.keyword == keyword => Some(d),
            _ => None,
        })
    }

    fn directives_mut(&mut self, dialect: &Dialect) -> impl Iterator<Item = &mut Directive> {
        let keyword = dialect.keyword;
        self.lines.iter_mut().filter_map(move |line| match line {
            Line::Directive(d) if d.dialect.keyword == keyword => Some(d),
            _ => None,
        })
    }

    /// Value of the last active directive, if any.
    #[must_use]
    pub fn current(&self, dialect: &Dialect) -> Option<&str> {
        self.directives(dialect)
            .filter(|d| d.active)
            .filter_map(Directive::value)
            .last()
    }

    /// Values of every directive, active or disabled, in file order.
    #[must_use]
    pub fn list(&self, dialect: &Dialect) -> Vec<String> {
        self.directives(dialect)
            .filter_map(Directive::value)
            .map(str::to_string)
            .collect()
    }

    /// Makes `target` the single active directive.
    ///
    /// Returns `Ok(false)` when `target` is already current and nothing
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError::NotFound`] if no directive carries `target`;
    /// the document is left untouched.
    pub fn select(&mut self, dialect: &Dialect, target: &str) -> Result<bool> {
        if !self.directives(dialect).any(|d| d.value() == Some(target)) {
            return Err(SwitchError::NotFound(target.to_string()));
        }
        if self.current(dialect) == Some(target) {
            return Ok(false);
        }
        let mut enabled = false;
        for directive in self.directives_mut(dialect) {
            directive.active = !enabled && directive.value() == Some(target);
            enabled |= directive.active;
        }
        Ok(true)
    }

    /// Rewrites the value of every active directive, returning how many
    /// lines changed.
    pub fn set_value(&mut self, dialect: &Dialect, value: &str) -> usize {
        self.directives_mut(dialect)
            .filter(|d| d.active)
            .map(|d| d.set_value(value))
            .filter(|changed| *changed)
            .count()
    }
}
