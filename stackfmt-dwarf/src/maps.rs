//! プロセスのメモリマッピング情報（/proc/self/maps）

use crate::Result;
use std::path::{Path, PathBuf};

/// メモリマッピング情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMapping {
    pub start: u64,
    pub end: u64,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    /// マッピング元ファイル内のオフセット
    pub offset: u64,
    /// マッピング元ファイル（匿名マッピングではNone）
    pub path: Option<PathBuf>,
}

/// 現在のプロセスのマッピングを読み取る
pub fn current_mappings() -> Result<Vec<MemoryMapping>> {
    let maps_path = "/proc/self/maps";
    let text = std::fs::read_to_string(maps_path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", maps_path, e))?;
    parse_maps(&text)
}

/// /proc/pid/maps の内容を解析する
///
/// フォーマット: "address perms offset dev inode pathname"
/// 例: "7f1234567000-7f1234568000 r-xp 00000000 08:01 123456 /lib/libc.so"
pub fn parse_maps(text: &str) -> Result<Vec<MemoryMapping>> {
    let mut mappings = Vec::new();

    for line in text.lines() {
        // pathname以外の5フィールドは単一スペース区切り、pathnameの前はパディングされる
        let parts: Vec<&str> = line.splitn(6, ' ').collect();
        if parts.len() < 5 {
            continue;
        }

        let Some((start, end)) = parts[0].split_once('-') else {
            continue;
        };
        let start = u64::from_str_radix(start, 16)
            .map_err(|e| anyhow::anyhow!("Failed to parse start address '{}': {}", start, e))?;
        let end = u64::from_str_radix(end, 16)
            .map_err(|e| anyhow::anyhow!("Failed to parse end address '{}': {}", end, e))?;

        let perms = parts[1];
        let readable = perms.chars().next() == Some('r');
        let writable = perms.chars().nth(1) == Some('w');
        let executable = perms.chars().nth(2) == Some('x');

        let offset = u64::from_str_radix(parts[2], 16)
            .map_err(|e| anyhow::anyhow!("Failed to parse segment offset '{}': {}", parts[2], e))?;

        let path = parts
            .get(5)
            .map(|p| p.trim_start())
            .filter(|p| !p.is_empty())
            .map(|p| PathBuf::from(p.strip_suffix(" (deleted)").unwrap_or(p)));

        mappings.push(MemoryMapping {
            start,
            end,
            readable,
            writable,
            executable,
            offset,
            path,
        });
    }

    Ok(mappings)
}

/// 実行可能ファイルのロード配置
#[derive(Debug, Clone)]
pub struct ModuleLayout {
    /// 実行時アドレス - リンク時アドレス
    pub bias: u64,
    /// このファイルがマッピングされている範囲
    pub ranges: Vec<(u64, u64)>,
}

impl ModuleLayout {
    /// マッピング一覧からファイルの配置を求める
    ///
    /// `first_segment_address` はファイルオフセット0のセグメントのリンク時アドレス。
    pub fn from_mappings(
        mappings: &[MemoryMapping],
        path: &Path,
        first_segment_address: u64,
    ) -> Result<Self> {
        let own: Vec<&MemoryMapping> = mappings
            .iter()
            .filter(|m| m.path.as_deref() == Some(path))
            .collect();

        let base = own
            .iter()
            .find(|m| m.offset == 0)
            .map(|m| m.start)
            .ok_or_else(|| anyhow::anyhow!("Could not find base mapping of {:?}", path))?;

        Ok(Self {
            bias: base.wrapping_sub(first_segment_address),
            ranges: own.iter().map(|m| (m.start, m.end)).collect(),
        })
    }

    /// 実行時アドレスをリンク時アドレスに変換する（範囲外ならNone）
    pub fn to_link_address(&self, addr: u64) -> Option<u64> {
        self.ranges
            .iter()
            .any(|&(start, end)| addr >= start && addr < end)
            .then(|| addr.wrapping_sub(self.bias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MAPS: &str = "\
55d0c8a00000-55d0c8a3e000 r--p 00000000 08:01 1048 /usr/bin/demo
55d0c8a3e000-55d0c8b20000 r-xp 0003e000 08:01 1048 /usr/bin/demo
55d0c8d21000-55d0c8d42000 rw-p 00000000 00:00 0                          [heap]
7f1234567000-7f1234568000 r-xp 00000000 08:01 123456                     /lib/libc.so
7f1234600000-7f1234601000 rw-p 00000000 00:00 0
7f1234700000-7f1234701000 r-xp 00000000 08:01 99 /tmp/my tool (deleted)
";

    #[test]
    fn test_parse_maps() {
        let mappings = parse_maps(MAPS).unwrap();
        assert_eq!(mappings.len(), 6);

        assert_eq!(mappings[1].start, 0x55d0c8a3e000);
        assert_eq!(mappings[1].end, 0x55d0c8b20000);
        assert_eq!(mappings[1].offset, 0x3e000);
        assert!(mappings[1].readable && mappings[1].executable && !mappings[1].writable);
        assert_eq!(mappings[1].path.as_deref(), Some(Path::new("/usr/bin/demo")));

        assert_eq!(mappings[2].path.as_deref(), Some(Path::new("[heap]")));
        assert_eq!(mappings[3].path.as_deref(), Some(Path::new("/lib/libc.so")));
        assert_eq!(mappings[4].path, None);
        assert_eq!(mappings[5].path.as_deref(), Some(Path::new("/tmp/my tool")));
    }

    #[test]
    fn test_parse_maps_invalid() {
        assert!(parse_maps("zzzz-0000 r-xp 00000000 08:01 1 /bin/x").is_err());
        assert!(parse_maps("garbage").unwrap().is_empty());
    }

    #[test]
    fn test_module_layout_pie() {
        let mappings = parse_maps(MAPS).unwrap();
        let layout = ModuleLayout::from_mappings(&mappings, Path::new("/usr/bin/demo"), 0).unwrap();

        assert_eq!(layout.bias, 0x55d0c8a00000);
        assert_eq!(layout.ranges.len(), 2);
        assert_eq!(layout.to_link_address(0x55d0c8a3e123), Some(0x3e123));
        // libcのアドレスは対象外
        assert_eq!(layout.to_link_address(0x7f1234567010), None);
    }

    #[test]
    fn test_module_layout_non_pie() {
        let maps = "00400000-00452000 r-xp 00000000 08:01 7 /usr/bin/static\n";
        let mappings = parse_maps(maps).unwrap();
        let layout =
            ModuleLayout::from_mappings(&mappings, Path::new("/usr/bin/static"), 0x400000).unwrap();

        assert_eq!(layout.bias, 0);
        assert_eq!(layout.to_link_address(0x401000), Some(0x401000));
    }

    #[test]
    fn test_module_layout_missing() {
        let mappings = parse_maps(MAPS).unwrap();
        assert!(ModuleLayout::from_mappings(&mappings, Path::new("/nope"), 0).is_err());
    }
}
