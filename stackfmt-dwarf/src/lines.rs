//! ソース行情報

use crate::loader::DwarfReader;
use crate::symbols::demangle_symbol;
use crate::Result;
use std::sync::Mutex;

/// ソース行情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo {
    pub file: String,
    pub line: u32,
    /// デマングル済みの関数名（インライン展開された場合は最も内側の関数）
    pub function: Option<String>,
}

/// ソース行情報の取得
pub struct LineInfoProvider {
    /// addr2lineのコンテキストは内部で遅延評価するため排他制御が必要
    context: Mutex<addr2line::Context<DwarfReader>>,
}

impl LineInfoProvider {
    /// DWARFからソース行情報プロバイダを作成する
    pub fn new(dwarf: gimli::Dwarf<DwarfReader>) -> Result<Self> {
        let context = addr2line::Context::from_dwarf(dwarf)
            .map_err(|e| anyhow::anyhow!("Failed to build addr2line context: {}", e))?;
        Ok(Self {
            context: Mutex::new(context),
        })
    }

    /// リンク時アドレスからソース行情報を取得する
    ///
    /// 行情報のないアドレスではNoneを返す。
    pub fn lookup(&self, addr: u64) -> Result<Option<LineInfo>> {
        let context = self
            .context
            .lock()
            .map_err(|_| anyhow::anyhow!("addr2line context lock poisoned"))?;

        let mut frames = context
            .find_frames(addr)
            .skip_all_loads()
            .map_err(|e| anyhow::anyhow!("Failed to look up 0x{:x}: {}", addr, e))?;

        // 最初のフレームがインライン展開の最も内側
        let Some(frame) = frames
            .next()
            .map_err(|e| anyhow::anyhow!("Failed to read frame at 0x{:x}: {}", addr, e))?
        else {
            return Ok(None);
        };

        let Some(location) = frame.location else {
            return Ok(None);
        };
        let (Some(file), Some(line)) = (location.file, location.line) else {
            return Ok(None);
        };

        let function = frame
            .function
            .and_then(|name| name.raw_name().ok().map(|raw| demangle_symbol(&raw)));

        Ok(Some(LineInfo {
            file: file.to_string(),
            line,
            function,
        }))
    }
}
