//! stackfmt DWARF シンボル化
//!
//! このクレートは、実行中のプロセス自身のELFとDWARFデバッグ情報を読み込み、
//! プログラムカウンタをファイル名・行番号・関数名に変換する機能を提供します。

pub mod loader;
pub mod symbols;
pub mod lines;
pub mod maps;
pub mod symbolize;

pub use loader::DwarfLoader;
pub use symbols::{Symbol, SymbolResolver};
pub use lines::{LineInfo, LineInfoProvider};
pub use maps::{MemoryMapping, ModuleLayout};
pub use symbolize::{DwarfSymbolizer, SymbolInfo, Symbolize};

/// DWARF解析の結果型
pub type Result<T> = anyhow::Result<T>;
