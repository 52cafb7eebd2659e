//! アドレスのシンボル化
//!
//! 呼び出し元はリターンアドレスから1を引いたプログラムカウンタを渡す。
//! 解決できない場合はエラーではなくNoneを返す。

use crate::maps::{self, ModuleLayout};
use crate::{DwarfLoader, LineInfoProvider, Result, SymbolResolver};

/// アドレスから得られたシンボル情報
///
/// 各項目は独立して欠落しうる。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolInfo {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
}

/// プログラムカウンタをファイル・行・関数名に変換するサービス
///
/// 実装は複数スレッドから同時に呼ばれる。
pub trait Symbolize: Send + Sync {
    /// プログラムカウンタを解決する。未知のアドレスではNone。
    fn resolve_address(&self, pc: u64) -> Option<SymbolInfo>;
}

/// 実行中の実行可能ファイルのDWARFを使うシンボル化
pub struct DwarfSymbolizer {
    lines: LineInfoProvider,
    symbols: SymbolResolver,
    layout: ModuleLayout,
}

impl DwarfSymbolizer {
    /// 現在のプロセスの実行可能ファイルから構築する
    ///
    /// `/proc/self/maps` でロードバイアスを求めるため、Linux以外では失敗する。
    pub fn for_current_process() -> Result<Self> {
        let loader = DwarfLoader::load_current_exe()?;
        let mappings = maps::current_mappings()?;
        Self::from_loader(loader, &mappings)
    }

    /// 読み込み済みのファイルとマッピング情報から構築する
    pub fn from_loader(loader: DwarfLoader, mappings: &[maps::MemoryMapping]) -> Result<Self> {
        let first_segment = loader
            .first_segment_address()
            .ok_or_else(|| anyhow::anyhow!("No segment at file offset 0 in {:?}", loader.path()))?;
        let layout = ModuleLayout::from_mappings(mappings, loader.path(), first_segment)?;
        let symbols = SymbolResolver::new(&loader)?;

        tracing::debug!(
            path = %loader.path().display(),
            pie = loader.is_pie(),
            bias = layout.bias,
            symbols = symbols.len(),
            "DWARF symbolizer ready"
        );

        let lines = LineInfoProvider::new(loader.into_dwarf())?;

        Ok(Self {
            lines,
            symbols,
            layout,
        })
    }

    /// シンボルテーブルへの参照を取得
    pub fn symbols(&self) -> &SymbolResolver {
        &self.symbols
    }

    /// ロード配置を取得
    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }
}

impl Symbolize for DwarfSymbolizer {
    fn resolve_address(&self, pc: u64) -> Option<SymbolInfo> {
        let addr = self.layout.to_link_address(pc)?;

        let line_info = match self.lines.lookup(addr) {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!("line lookup failed at 0x{:x}: {}", pc, e);
                None
            }
        };

        let function = line_info
            .as_ref()
            .and_then(|info| info.function.clone())
            .or_else(|| {
                self.symbols
                    .reverse_resolve(addr)
                    .map(|sym| sym.display_name().to_string())
            });

        Some(SymbolInfo {
            file: line_info.as_ref().map(|info| info.file.clone()),
            line: line_info.as_ref().map(|info| info.line),
            function,
        })
    }
}
