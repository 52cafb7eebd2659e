//! ELFシンボルテーブル

use crate::{DwarfLoader, Result};
use object::{Object, ObjectSymbol, SymbolKind};

/// シンボル情報
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub demangled_name: String,
    /// リンク時アドレス
    pub address: u64,
    pub size: u64,
}

impl Symbol {
    pub fn new(name: String, address: u64, size: u64) -> Self {
        let demangled_name = demangle_symbol(&name);
        Self {
            name,
            demangled_name,
            address,
            size,
        }
    }

    /// 表示用の名前（Rustのシンボルはハッシュなしでデマングル済み）
    pub fn display_name(&self) -> &str {
        &self.demangled_name
    }
}

/// シンボル名をデマングルする
///
/// ハッシュ接尾辞（`::h0123...`）は付けない。
pub(crate) fn demangle_symbol(name: &str) -> String {
    if let Ok(demangled) = rustc_demangle::try_demangle(name) {
        return format!("{:#}", demangled);
    }

    // Rust以外のシンボルはそのまま返す
    name.to_string()
}

/// ELFシンボルテーブル
///
/// 関数名の補完に使うため、テキストシンボルのみをアドレス順に保持する。
pub struct SymbolResolver {
    symbols: Vec<Symbol>,
}

impl SymbolResolver {
    /// 読み込み済みファイルのシンボルテーブルから作成する
    pub fn new(loader: &DwarfLoader) -> Result<Self> {
        let mut symbols: Vec<Symbol> = loader
            .object_file()
            .symbols()
            .filter(|symbol| symbol.kind() == SymbolKind::Text)
            .filter_map(|symbol| {
                let name = symbol.name().ok().filter(|name| !name.is_empty())?;
                Some(Symbol::new(name.to_string(), symbol.address(), symbol.size()))
            })
            .collect();

        symbols.sort_by_key(|s| s.address);
        Ok(Self { symbols })
    }

    /// シンボル名（マングル名またはデマングル名）からアドレスを解決する
    pub fn resolve(&self, name: &str) -> Option<u64> {
        self.symbols
            .iter()
            .find(|s| s.name == name || s.demangled_name == name)
            .map(|s| s.address)
    }

    /// アドレスを含むシンボルを返す
    ///
    /// サイズ情報のないシンボルは、次のシンボルまでを範囲とみなす。
    pub fn reverse_resolve(&self, addr: u64) -> Option<&Symbol> {
        let idx = self.symbols.partition_point(|s| s.address <= addr);
        let sym = self.symbols.get(idx.checked_sub(1)?)?;
        (sym.size == 0 || addr < sym.address + sym.size).then_some(sym)
    }

    /// シンボル数
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// シンボルが一つもないか（strip済みバイナリなど）
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// マングル名またはデマングル名に `pattern` を含むシンボル
    pub fn find_symbols(&self, pattern: &str) -> Vec<&Symbol> {
        self.symbols
            .iter()
            .filter(|s| s.name.contains(pattern) || s.demangled_name.contains(pattern))
            .collect()
    }
}
