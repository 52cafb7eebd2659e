//! 出力書き込みエラーの報告
//!
//! 書式化は失敗を呼び出し元に返さない。書き込み先が失敗した場合は
//! プロセス全体で一つのハンドラに渡す。ハンドラは起動時に一度設定する想定で、
//! 未設定の間は `tracing` の警告として記録する。

use std::fmt;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};

/// 書き込み先のエラー
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write formatted output: {0}")]
    Fmt(#[from] fmt::Error),
    #[error("failed to write formatted output: {0}")]
    Io(#[from] io::Error),
}

type Handler = Arc<dyn Fn(&WriteError) + Send + Sync>;

static HANDLER: RwLock<Option<Handler>> = RwLock::new(None);

/// 書き込みエラーのハンドラを設定する（最後に設定したものが有効）
pub fn set_write_error_handler<F>(handler: F)
where
    F: Fn(&WriteError) + Send + Sync + 'static,
{
    *HANDLER.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
}

/// 既定のハンドラ（ログ出力）に戻す
pub fn reset_write_error_handler() {
    *HANDLER.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// 書き込みエラーをハンドラに渡す
pub fn report_write_error(err: &WriteError) {
    let handler = HANDLER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    match handler {
        Some(handler) => handler(err),
        None => tracing::warn!("{}", err),
    }
}

/// 文字列を書き込み、失敗はハンドラに渡す
pub(crate) fn write_str<W: fmt::Write + ?Sized>(w: &mut W, s: &str) {
    if let Err(e) = w.write_str(s) {
        report_write_error(&WriteError::Fmt(e));
    }
}

/// バイト列を書き込み、失敗はハンドラに渡す
pub(crate) fn write_all<W: io::Write + ?Sized>(w: &mut W, s: &str) {
    if let Err(e) = w.write_all(s.as_bytes()) {
        report_write_error(&WriteError::Io(e));
    }
}
