//! stackfmt スタックトレースのコア機能
//!
//! このクレートは、コールスタックをリターンアドレスの列として安価に取得し、
//! 表示が必要になったときにだけファイル名・行番号・関数名に解決して
//! 書式指定（`%s` `%d` `%n` `%v` と `+` `#` フラグ）に従って描画します。

pub mod capture;
pub mod errors;
pub mod frame;
pub mod name;
pub mod render;
pub mod resolver;
pub mod token;
pub mod trace;
pub mod verb;

pub use capture::{CaptureOptions, DEFAULT_MAX_DEPTH};
pub use errors::{reset_write_error_handler, set_write_error_handler, WriteError};
pub use frame::Frame;
pub use name::simplify;
pub use render::{Formatted, Render, StackTraceFormatter};
pub use resolver::{BacktraceSymbolizer, FrameResolver, ResolvedFacts, SymbolizerKind};
pub use token::AddressToken;
pub use trace::{Stack, StackTrace, StackTracer};
pub use verb::{Directive, DirectiveError, Flags, Verb};

// 独自のシンボル化を実装するために再エクスポート
pub use stackfmt_dwarf::{SymbolInfo, Symbolize};

/// stackfmtの結果型
pub type Result<T> = anyhow::Result<T>;
