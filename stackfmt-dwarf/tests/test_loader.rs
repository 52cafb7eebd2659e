//! DWARFローダーとシンボル解決のテスト
//!
//! テストバイナリ自身のデバッグ情報を読み込む。

#![cfg(target_os = "linux")]

use stackfmt_dwarf::{DwarfLoader, DwarfSymbolizer, SymbolResolver, Symbolize};

const MARKER_FIRST_LINE: u32 = line!() + 2;
#[inline(never)]
fn marker_function() -> u32 {
    line!()
}
const MARKER_LAST_LINE: u32 = line!() - 1;

#[test]
fn test_load_current_exe() {
    let loader = DwarfLoader::load_current_exe()
        .expect("Failed to load DWARF from the test binary");

    let resolver = SymbolResolver::new(&loader)
        .expect("Failed to create symbol resolver");

    assert!(!resolver.is_empty(), "Test binary should carry a symbol table");

    let symbols = resolver.find_symbols("marker_function");
    assert!(!symbols.is_empty(), "Should find marker_function");

    let sym = symbols[0];
    assert!(sym.display_name().ends_with("marker_function"));
    assert_eq!(resolver.resolve(&sym.name), Some(sym.address));
    assert_eq!(resolver.resolve(&sym.demangled_name), Some(sym.address));

    // 関数内部のアドレスからも同じシンボルに戻る
    let found = resolver
        .reverse_resolve(sym.address + 1)
        .expect("Reverse resolve inside marker_function");
    assert_eq!(found.address, sym.address);
}

#[test]
fn test_reload_reuses_file_data() {
    let first = DwarfLoader::load_current_exe().unwrap();
    let second = DwarfLoader::load_current_exe().unwrap();
    assert!(std::ptr::eq(first.data(), second.data()));
    drop(first);

    // 作り直しても同じ内容を共有する
    let symbolizer = DwarfSymbolizer::for_current_process().unwrap();
    drop(symbolizer);
    let third = DwarfLoader::load_current_exe().unwrap();
    assert!(std::ptr::eq(second.data(), third.data()));
}

#[test]
fn test_first_segment_address() {
    let loader = DwarfLoader::load_current_exe().unwrap();
    let first = loader.first_segment_address();
    assert!(first.is_some(), "ELF should map file offset 0");
    if loader.is_pie() {
        assert_eq!(first, Some(0));
    }
}

#[test]
fn test_resolve_runtime_address() {
    let symbolizer = DwarfSymbolizer::for_current_process()
        .expect("Failed to build symbolizer for the test binary");

    let addr = marker_function as usize as u64;
    let info = symbolizer
        .resolve_address(addr)
        .expect("marker_function lies inside the executable");

    let function = info.function.expect("function name");
    assert!(function.ends_with("marker_function"), "got {}", function);

    let file = info.file.expect("file name");
    assert!(file.ends_with("test_loader.rs"), "got {}", file);

    // 先頭アドレスの行は関数の宣言から閉じ括弧までのどこか（コード生成次第）
    let line = info.line.expect("line number");
    assert!((MARKER_FIRST_LINE..=MARKER_LAST_LINE).contains(&marker_function()));
    assert!(
        (MARKER_FIRST_LINE..=MARKER_LAST_LINE).contains(&line),
        "got {}, expected {}..={}",
        line,
        MARKER_FIRST_LINE,
        MARKER_LAST_LINE
    );
}

#[test]
fn test_resolve_foreign_address() {
    let symbolizer = DwarfSymbolizer::for_current_process().unwrap();

    // どのマッピングにも属さないアドレス
    assert_eq!(symbolizer.resolve_address(0x10), None);
}

#[test]
fn test_resolve_is_idempotent() {
    let symbolizer = DwarfSymbolizer::for_current_process().unwrap();
    let addr = marker_function as usize as u64 + 1;

    let first = symbolizer.resolve_address(addr);
    let second = symbolizer.resolve_address(addr);
    assert!(first.is_some());
    assert_eq!(first, second);
}
