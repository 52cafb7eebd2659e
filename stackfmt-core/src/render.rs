//! 書式指定による描画と出力先への書き込み

use crate::errors;
use crate::{Directive, Flags, Verb};
use std::fmt;
use std::io;

/// 書式指定で文字列に描画できる値
pub trait Render {
    /// 書式指定に従って描画する。未知の動詞では空文字列。
    fn render(&self, directive: &Directive) -> String;

    /// 描画結果を書き込む
    ///
    /// 書き込みに失敗してもエラーは返さず、書き込みエラーハンドラに渡す。
    fn write_to<W: io::Write + ?Sized>(&self, w: &mut W, directive: &Directive)
    where
        Self: Sized,
    {
        errors::write_all(w, &self.render(directive));
    }

    /// `format!` などで使える表示用アダプタ
    fn display(&self, directive: Directive) -> Formatted<'_, Self>
    where
        Self: Sized,
    {
        Formatted {
            value: self,
            directive,
        }
    }
}

/// 書式指定を束縛した `Display` アダプタ
pub struct Formatted<'a, T: ?Sized> {
    value: &'a T,
    directive: Directive,
}

impl<T: Render + ?Sized> fmt::Display for Formatted<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        errors::write_str(f, &self.value.render(&self.directive));
        Ok(())
    }
}

/// 標準ライブラリの型だけで表せるスタックトレースの書式化
///
/// `fmt::Formatter` のフラグを書式フラグとして使う（`{:+}` が `+`、`{:#}` が `#`）。
/// トレースを表示するだけなら、具体的な型を知らずに `&dyn StackTraceFormatter` で扱える。
pub trait StackTraceFormatter {
    /// `verb` に従って `f` に書き込む。未知の動詞では何も書かない。
    fn format_stack_trace(&self, f: &mut fmt::Formatter<'_>, verb: char);
}

/// フォーマッタのフラグを書式フラグに変換する
fn formatter_flags(f: &fmt::Formatter<'_>) -> Flags {
    Flags {
        plus: f.sign_plus(),
        sharp: f.alternate(),
    }
}

/// `Verb` で描画できる値の `format_stack_trace` 実装
pub(crate) fn format_with_formatter(
    f: &mut fmt::Formatter<'_>,
    verb: char,
    render: impl FnOnce(Verb, Flags) -> String,
) {
    let Some(verb) = Verb::from_char(verb) else {
        return;
    };
    let text = render(verb, formatter_flags(f));
    errors::write_str(f, &text);
}
