//! 呼び出しフレーム

use crate::capture::capture_tokens;
use crate::errors;
use crate::render::Render;
use crate::{AddressToken, Directive, FrameResolver, ResolvedFacts, Verb};
use std::fmt;

/// スタックフレーム内のリターンアドレス
///
/// 取得時にはアドレスのみを保持し、ファイル名や関数名は表示するときに解決する。
///
/// 書式:
///
/// ```text
/// %s    ソースファイルのベース名
/// %d    行番号
/// %n    短縮した関数名
/// %v    %s:%d
/// %+s   関数名とソースファイルのパスを \n\t で区切ったもの
/// %+v   %+s:%d
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Frame(AddressToken);

impl Frame {
    pub const fn new(token: AddressToken) -> Self {
        Self(token)
    }

    /// 呼び出し元のフレームを取得する
    ///
    /// `skip` が0なら `Frame::caller` を呼んだ関数自身のフレーム。
    /// スタックがそれより浅い場合は無効トークンのフレームを返す。
    #[inline(never)]
    pub fn caller(skip: usize) -> Frame {
        capture_tokens(Frame::caller as usize, skip, 1)
            .first()
            .copied()
            .map(Frame::new)
            .unwrap_or_default()
    }

    pub fn token(&self) -> AddressToken {
        self.0
    }

    /// シンボル化に使うプログラムカウンタ（トークン - 1）
    pub fn pc(&self) -> Option<usize> {
        self.0.pc()
    }

    /// プロセス全体の解決器でシンボルを解決する
    pub fn resolve(&self) -> ResolvedFacts {
        self.resolve_with(FrameResolver::global())
    }

    pub fn resolve_with(&self, resolver: &FrameResolver) -> ResolvedFacts {
        resolver.resolve(self.0)
    }

    /// 関数を含むファイルのフルパス（未解決なら `unknown`）
    pub fn file(&self) -> String {
        self.resolve().file().to_string()
    }

    /// 行番号（未解決なら0）
    pub fn line(&self) -> u32 {
        self.resolve().line()
    }

    /// 完全修飾された関数名（未解決なら空）
    pub fn qualified_name(&self) -> String {
        self.resolve().qualified_name().to_string()
    }

    /// 動詞に従って描画する。`long` は `+` フラグに相当する。
    pub fn format(&self, verb: Verb, long: bool) -> String {
        self.resolve().format(verb, long)
    }
}

impl From<AddressToken> for Frame {
    fn from(token: AddressToken) -> Self {
        Self(token)
    }
}

impl Render for Frame {
    fn render(&self, directive: &Directive) -> String {
        match directive.verb() {
            Some(verb) => self.format(verb, directive.flags().plus),
            None => String::new(),
        }
    }
}

/// `{}` は `%v`、`{:#}` は `%+v`
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.format(Verb::Value, f.alternate());
        errors::write_str(f, &text);
        Ok(())
    }
}

/// 一覧の中で各フレームを区別できるよう `%v` で表示する
impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.format(Verb::Value, false);
        errors::write_str(f, &text);
        Ok(())
    }
}
