//! 書式指定（`%+v` など）

use std::fmt;
use std::str::FromStr;

/// 書式動詞
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `s`: ソースファイル
    Source,
    /// `d`: 行番号
    Line,
    /// `n`: 関数名
    Name,
    /// `v`: `s:d`
    Value,
}

impl Verb {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(Verb::Source),
            'd' => Some(Verb::Line),
            'n' => Some(Verb::Name),
            'v' => Some(Verb::Value),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Verb::Source => 's',
            Verb::Line => 'd',
            Verb::Name => 'n',
            Verb::Value => 'v',
        }
    }
}

/// 書式フラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags {
    /// `+`: 詳細表示
    pub plus: bool,
    /// `#`: デバッグ表示
    pub sharp: bool,
}

impl Flags {
    pub const NONE: Flags = Flags { plus: false, sharp: false };
    pub const PLUS: Flags = Flags { plus: true, sharp: false };
    pub const SHARP: Flags = Flags { plus: false, sharp: true };
}

/// 書式指定の解析エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("directive must start with '%': {0:?}")]
    MissingPercent(String),
    #[error("directive has no verb: {0:?}")]
    MissingVerb(String),
    #[error("unsupported flag {flag:?} in {directive:?}")]
    UnknownFlag { flag: char, directive: String },
    #[error("unexpected trailing input in {0:?}")]
    TrailingInput(String),
}

/// 動詞とフラグの組
///
/// 未知の動詞も保持し、描画時には何も出力しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directive {
    verb: char,
    flags: Flags,
}

impl Directive {
    pub const fn new(verb: Verb, flags: Flags) -> Self {
        let verb = match verb {
            Verb::Source => 's',
            Verb::Line => 'd',
            Verb::Name => 'n',
            Verb::Value => 'v',
        };
        Self { verb, flags }
    }

    /// `%s` `%+v` `%#v` のような文字列を解析する
    ///
    /// # Examples
    /// ```
    /// use stackfmt_core::{Directive, Verb};
    ///
    /// let directive = Directive::parse("%+v").unwrap();
    /// assert_eq!(directive.verb(), Some(Verb::Value));
    /// assert!(directive.flags().plus);
    /// ```
    pub fn parse(s: &str) -> Result<Self, DirectiveError> {
        let s = s.trim();
        let rest = s
            .strip_prefix('%')
            .ok_or_else(|| DirectiveError::MissingPercent(s.to_string()))?;

        let mut flags = Flags::NONE;
        let mut chars = rest.chars();
        let verb = loop {
            match chars.next() {
                Some('+') => flags.plus = true,
                Some('#') => flags.sharp = true,
                Some(c) if c.is_alphabetic() => break c,
                Some(c) => {
                    return Err(DirectiveError::UnknownFlag {
                        flag: c,
                        directive: s.to_string(),
                    })
                }
                None => return Err(DirectiveError::MissingVerb(s.to_string())),
            }
        };

        if chars.next().is_some() {
            return Err(DirectiveError::TrailingInput(s.to_string()));
        }

        Ok(Self { verb, flags })
    }

    /// 動詞（未知の文字ならNone）
    pub fn verb(&self) -> Option<Verb> {
        Verb::from_char(self.verb)
    }

    pub fn verb_char(&self) -> char {
        self.verb
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }
}

impl FromStr for Directive {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("%")?;
        if self.flags.plus {
            f.write_str("+")?;
        }
        if self.flags.sharp {
            f.write_str("#")?;
        }
        write!(f, "{}", self.verb)
    }
}
