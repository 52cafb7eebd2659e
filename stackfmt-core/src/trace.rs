//! スタックトレース

use crate::errors;
use crate::render::{format_with_formatter, Render, StackTraceFormatter};
use crate::{AddressToken, Directive, Flags, Frame, Verb};
use std::fmt;
use std::ops::Deref;

/// スタックトレースを取り出せる値
///
/// エラー型などが取得済みのスタックを公開するために実装する。
pub trait StackTracer {
    fn stack_trace(&self) -> StackTrace;
}

/// フレームの列（先頭が最も内側＝最新の呼び出し）
///
/// 書式:
///
/// ```text
/// %s    各フレームのソースファイル
/// %v    各フレームのソースファイルと行番号
/// %+v   各フレームの関数名・ファイルパス・行番号（フレームごとに改行）
/// %#v   デバッグ表示
/// ```
///
/// それ以外の動詞では何も出力しない。
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct StackTrace {
    frames: Vec<Frame>,
}

impl StackTrace {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// 内側から `n` フレームだけのトレース
    pub fn head(&self, n: usize) -> StackTrace {
        Self::from(&self.frames[..n.min(self.frames.len())])
    }

    /// 動詞とフラグに従って描画する
    pub fn format(&self, verb: Verb, flags: Flags) -> String {
        match verb {
            Verb::Value if flags.plus => self
                .frames
                .iter()
                .map(|frame| format!("\n{}", frame.format(Verb::Value, true)))
                .collect(),
            Verb::Value if flags.sharp => format!("{:?}", self),
            Verb::Value => self.list(Verb::Value),
            Verb::Source => self.list(Verb::Source),
            Verb::Line | Verb::Name => String::new(),
        }
    }

    /// `[a b c]` 形式
    fn list(&self, verb: Verb) -> String {
        let items: Vec<String> = self
            .frames
            .iter()
            .map(|frame| frame.format(verb, false))
            .collect();
        format!("[{}]", items.join(" "))
    }
}

impl Deref for StackTrace {
    type Target = [Frame];

    fn deref(&self) -> &[Frame] {
        &self.frames
    }
}

impl From<Vec<Frame>> for StackTrace {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl From<&[Frame]> for StackTrace {
    fn from(frames: &[Frame]) -> Self {
        Self {
            frames: frames.to_vec(),
        }
    }
}

impl FromIterator<Frame> for StackTrace {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StackTrace {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl StackTracer for StackTrace {
    fn stack_trace(&self) -> StackTrace {
        self.clone()
    }
}

impl Render for StackTrace {
    fn render(&self, directive: &Directive) -> String {
        match directive.verb() {
            Some(verb) => self.format(verb, directive.flags()),
            None => String::new(),
        }
    }
}

impl StackTraceFormatter for StackTrace {
    fn format_stack_trace(&self, f: &mut fmt::Formatter<'_>, verb: char) {
        format_with_formatter(f, verb, |verb, flags| self.format(verb, flags));
    }
}

/// `{}` は `%v`、`{:#}` は `%+v`
impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = if f.alternate() { Flags::PLUS } else { Flags::NONE };
        errors::write_str(f, &self.format(Verb::Value, flags));
        Ok(())
    }
}

/// `StackTrace([a.rs:9, b.rs:58])`
impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StackTrace").field(&self.frames).finish()
    }
}

/// 取得したままのリターンアドレス列
///
/// 取得は安価で、シンボル解決は `StackTrace` に変換して表示するときに行う。
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Stack {
    tokens: Vec<AddressToken>,
}

impl Stack {
    pub fn from_tokens(tokens: Vec<AddressToken>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[AddressToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.tokens.iter().copied().map(Frame::new).collect()
    }
}

impl StackTracer for Stack {
    fn stack_trace(&self) -> StackTrace {
        StackTrace::new(self.frames())
    }
}

impl Render for Stack {
    fn render(&self, directive: &Directive) -> String {
        self.stack_trace().render(directive)
    }
}

impl StackTraceFormatter for Stack {
    fn format_stack_trace(&self, f: &mut fmt::Formatter<'_>, verb: char) {
        self.stack_trace().format_stack_trace(f, verb);
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.stack_trace(), f)
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stack").field(&self.tokens).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directive(s: &str) -> Directive {
        Directive::parse(s).unwrap()
    }

    #[test]
    fn test_empty_stack_trace_format() {
        for trace in [StackTrace::default(), StackTrace::new(Vec::new())] {
            assert_eq!(trace.render(&directive("%s")), "[]");
            assert_eq!(trace.render(&directive("%v")), "[]");
            assert_eq!(trace.render(&directive("%+v")), "");
            assert_eq!(trace.render(&directive("%#v")), "StackTrace([])");
            assert_eq!(trace.to_string(), "[]");
            assert_eq!(format!("{:#}", trace), "");
        }
    }

    #[test]
    fn test_invalid_frames_format() {
        let trace: StackTrace = vec![Frame::default(), Frame::default()].into();
        assert_eq!(trace.render(&directive("%s")), "[unknown unknown]");
        assert_eq!(trace.render(&directive("%v")), "[unknown:0 unknown:0]");
        assert_eq!(trace.render(&directive("%+v")), "\nunknown\nunknown");
        assert_eq!(
            trace.render(&directive("%#v")),
            "StackTrace([unknown:0, unknown:0])"
        );
    }

    #[test]
    fn test_other_verbs_are_noop() {
        let trace: StackTrace = vec![Frame::default()].into();
        assert_eq!(trace.render(&directive("%d")), "");
        assert_eq!(trace.render(&directive("%n")), "");
        assert_eq!(trace.render(&directive("%x")), "");
        assert_eq!(trace.render(&directive("%+q")), "");
    }

    #[test]
    fn test_head() {
        let trace: StackTrace = (1..=4)
            .map(|addr| Frame::new(AddressToken::new(addr)))
            .collect();
        assert_eq!(trace.head(2).len(), 2);
        assert_eq!(trace.head(2)[1], trace[1]);
        assert_eq!(trace.head(10), trace);
        assert!(trace.head(0).is_empty());
    }

    #[test]
    fn test_stack_conversion() {
        let stack = Stack::from_tokens(vec![AddressToken::new(0x10), AddressToken::INVALID]);
        let trace = stack.stack_trace();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].token(), AddressToken::new(0x10));
        assert_eq!(trace[1].token(), AddressToken::INVALID);
        assert_eq!(stack.render(&directive("%v")), trace.render(&directive("%v")));
        assert_eq!(format!("{:?}", Stack::default()), "Stack([])");
    }

    /// 任意の `StackTraceFormatter` を `Display` で表示する
    struct Printed<'a>(&'a dyn StackTraceFormatter, char);

    impl fmt::Display for Printed<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.format_stack_trace(f, self.1);
            Ok(())
        }
    }

    #[test]
    fn test_stack_trace_formatter_object() {
        let trace: StackTrace = vec![Frame::default(), Frame::default()].into();
        let formatters: Vec<Box<dyn StackTraceFormatter>> = vec![
            Box::new(trace.clone()),
            Box::new(Stack::from_tokens(vec![AddressToken::INVALID; 2])),
        ];

        for formatter in &formatters {
            let formatter = formatter.as_ref();
            assert_eq!(format!("{}", Printed(formatter, 's')), "[unknown unknown]");
            assert_eq!(format!("{}", Printed(formatter, 'v')), "[unknown:0 unknown:0]");
            assert_eq!(format!("{:+}", Printed(formatter, 'v')), "\nunknown\nunknown");
            assert_eq!(
                format!("{:#}", Printed(formatter, 'v')),
                "StackTrace([unknown:0, unknown:0])"
            );
            assert_eq!(format!("{}", Printed(formatter, 'd')), "");
            assert_eq!(format!("{:+}", Printed(formatter, 'x')), "");
        }
    }

    #[test]
    fn test_render_object() {
        let trace: StackTrace = vec![Frame::default()].into();
        let stack = Stack::from_tokens(vec![AddressToken::INVALID]);
        let values: [&dyn Render; 3] = [&trace, &trace[0], &stack];

        let rendered: Vec<String> = values
            .iter()
            .map(|value| value.render(&directive("%v")))
            .collect();
        assert_eq!(rendered, ["[unknown:0]", "unknown:0", "[unknown:0]"]);
    }
}
