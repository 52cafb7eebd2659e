//! コールスタックの取得

use crate::{AddressToken, Stack};
use std::num::NonZeroUsize;

/// 取得する最大フレーム数の既定値
pub const DEFAULT_MAX_DEPTH: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(depth) => depth,
    None => unreachable!(),
};

/// 取得関数のフレームを見つけるまでにたどる最大フレーム数
const MAX_UNWIND_BEFORE_MARKER: usize = 256;

/// 取得オプション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    /// 取得する最大フレーム数（超えた分は切り捨てる）
    pub max_depth: NonZeroUsize,
    /// 呼び出し元から数えて読み飛ばすフレーム数
    pub skip: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            skip: 0,
        }
    }
}

impl Stack {
    /// 呼び出し元のさらに呼び出し元からスタックを取得する
    ///
    /// エラー型のコンストラクタなどから呼ぶと、コンストラクタを呼んだ位置から始まる。
    /// `Stack::capture_skip(1)` を同じ位置で呼んだ場合と同じフレームになる。
    #[inline(never)]
    pub fn capture() -> Stack {
        Stack::from_tokens(capture_tokens(
            Stack::capture as usize,
            1,
            DEFAULT_MAX_DEPTH.get(),
        ))
    }

    /// `skip` フレームを読み飛ばしてスタックを取得する
    ///
    /// `skip` が0なら、先頭は `capture_skip` を呼んだ関数のフレーム。
    #[inline(never)]
    pub fn capture_skip(skip: usize) -> Stack {
        Stack::from_tokens(capture_tokens(
            Stack::capture_skip as usize,
            skip,
            DEFAULT_MAX_DEPTH.get(),
        ))
    }

    /// オプションを指定してスタックを取得する
    #[inline(never)]
    pub fn capture_with(options: CaptureOptions) -> Stack {
        Stack::from_tokens(capture_tokens(
            Stack::capture_with as usize,
            options.skip,
            options.max_depth.get(),
        ))
    }
}

/// リターンアドレスを内側から順に集める
///
/// `marker` は公開している取得関数の先頭アドレス。そのフレームより内側
/// （アンワインダ自身のフレーム）は捨て、さらに `skip` フレーム読み飛ばす。
/// `marker` が見つからない場合はアンワインダのフレームも含めて返す。
pub(crate) fn capture_tokens(marker: usize, skip: usize, max_depth: usize) -> Vec<AddressToken> {
    let mut tokens = Vec::with_capacity(max_depth.min(DEFAULT_MAX_DEPTH.get()));
    let mut before_marker = Vec::new();
    let mut found = false;
    let mut remaining = skip;

    backtrace::trace(|frame| {
        let ip = frame.ip() as usize;

        if !found {
            if frame.symbol_address() as usize == marker {
                found = true;
                return true;
            }
            before_marker.push(ip);
            return before_marker.len() < MAX_UNWIND_BEFORE_MARKER;
        }

        if remaining > 0 {
            remaining -= 1;
            return true;
        }

        tokens.push(AddressToken::new(ip));
        tokens.len() < max_depth
    });

    if !found {
        tracing::debug!(
            frames = before_marker.len(),
            "capture marker frame not found, keeping unwinder frames"
        );
        return before_marker
            .into_iter()
            .skip(skip)
            .take(max_depth)
            .map(AddressToken::new)
            .collect();
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StackTracer, Verb};
    use pretty_assertions::assert_eq;

    #[inline(never)]
    fn capture_here(skip: usize) -> (Stack, u32) {
        (Stack::capture_skip(skip), line!())
    }

    #[inline(never)]
    fn default_capture() -> Stack {
        Stack::capture()
    }

    #[inline(never)]
    fn recurse(depth: usize) -> Stack {
        if depth == 0 {
            return Stack::capture_skip(0);
        }
        let stack = recurse(depth - 1);
        std::hint::black_box(stack)
    }

    #[test]
    fn test_capture_starts_at_caller() {
        let (stack, line) = capture_here(0);
        let trace = stack.stack_trace();
        assert!(!trace.is_empty());
        assert_eq!(trace[0].line(), line);
        assert_eq!(trace[0].format(Verb::Name, false), "capture_here");
    }

    #[test]
    fn test_capture_skip_one() {
        let (stack, line) = (capture_here(1).0, line!());
        let trace = stack.stack_trace();
        assert_eq!(trace[0].line(), line);
        assert_eq!(trace[0].format(Verb::Name, false), "test_capture_skip_one");
    }

    #[test]
    fn test_default_capture_elides_one_more_frame() {
        let (stack, line) = (default_capture(), line!());
        let trace = stack.stack_trace();
        assert_eq!(trace[0].line(), line);
        assert_eq!(
            trace[0].format(Verb::Name, false),
            "test_default_capture_elides_one_more_frame"
        );
    }

    #[test]
    fn test_capture_is_bounded() {
        let stack = recurse(64);
        assert_eq!(stack.len(), DEFAULT_MAX_DEPTH.get());

        let stack = Stack::capture_with(CaptureOptions {
            max_depth: NonZeroUsize::new(3).unwrap(),
            skip: 0,
        });
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_increasing_skip_drops_innermost_frames() {
        // 同じ呼び出し位置から取得し、外側のフレームを揃える
        let stacks: Vec<Stack> = (0..2).map(|skip| capture_here(skip).0).collect();
        let (outer, inner) = (&stacks[0], &stacks[1]);

        assert!(inner.len() <= outer.len());
        let overlap = inner.len().min(outer.len() - 1);
        assert_eq!(&inner.tokens()[..overlap], &outer.tokens()[1..=overlap]);
    }

    #[test]
    fn test_skip_beyond_depth_is_empty() {
        let stack = Stack::capture_skip(10_000);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_same_call_site_resolves_identically() {
        let mut facts = Vec::new();
        for _ in 0..2 {
            let (stack, _) = capture_here(0);
            facts.push(stack.stack_trace()[0].resolve());
        }
        assert_eq!(facts[0], facts[1]);
        assert!(!facts[0].is_unknown());
    }
}
