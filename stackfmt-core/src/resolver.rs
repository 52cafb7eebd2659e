//! フレームのシンボル解決

use crate::name::simplify;
use crate::{AddressToken, Result, Verb};
use stackfmt_dwarf::{DwarfSymbolizer, SymbolInfo, Symbolize};
use std::ffi::c_void;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// 解決できなかったフレームのファイル名
pub const UNKNOWN_FILE: &str = "unknown";

/// フレームから解決した情報
///
/// ファイル・行・関数名のすべてが得られた場合のみ解決済みとし、
/// それ以外は `unknown` / 0 / 空文字列になる。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedFacts {
    file: String,
    line: u32,
    qualified_name: String,
}

impl ResolvedFacts {
    /// 解決済みの情報を作成する
    pub fn new(file: impl Into<String>, line: u32, qualified_name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            qualified_name: qualified_name.into(),
        }
    }

    /// 未解決
    pub fn unknown() -> Self {
        Self {
            file: UNKNOWN_FILE.to_string(),
            line: 0,
            qualified_name: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.qualified_name.is_empty()
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// 動詞に従って描画する
    ///
    /// - `s`: ファイルのベース名。`long` なら `関数名\n\tファイルパス`（未解決は `unknown`）
    /// - `d`: 行番号
    /// - `n`: 短縮した関数名
    /// - `v`: `s:d`。`long` かつ未解決の場合は `unknown` のみ
    pub fn format(&self, verb: Verb, long: bool) -> String {
        match verb {
            Verb::Source if long => {
                if self.is_unknown() {
                    UNKNOWN_FILE.to_string()
                } else {
                    format!("{}\n\t{}", self.qualified_name, self.file)
                }
            }
            Verb::Source => base_name(&self.file).to_string(),
            Verb::Line => self.line.to_string(),
            Verb::Name => simplify(&self.qualified_name).to_string(),
            // 詳細表示の未解決フレームには `:0` を付けない
            Verb::Value if long && self.is_unknown() => UNKNOWN_FILE.to_string(),
            Verb::Value => format!("{}:{}", self.format(Verb::Source, long), self.line),
        }
    }
}

/// パスの最後の要素
fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return path;
    }
    match trimmed.rfind(['/', '\\']) {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// シンボル化の方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolizerKind {
    /// DWARFを優先し、解決できないアドレスはbacktraceで補う
    #[default]
    Auto,
    /// 実行可能ファイルのDWARFのみ
    Dwarf,
    /// backtraceクレートのシンボル化のみ
    Backtrace,
}

impl FromStr for SymbolizerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(SymbolizerKind::Auto),
            "dwarf" => Ok(SymbolizerKind::Dwarf),
            "backtrace" => Ok(SymbolizerKind::Backtrace),
            _ => Err(anyhow::anyhow!(
                "Unknown symbolizer '{}' (expected auto, dwarf or backtrace)",
                s
            )),
        }
    }
}

impl fmt::Display for SymbolizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolizerKind::Auto => "auto",
            SymbolizerKind::Dwarf => "dwarf",
            SymbolizerKind::Backtrace => "backtrace",
        })
    }
}

/// backtraceクレートによるシンボル化
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceSymbolizer;

impl Symbolize for BacktraceSymbolizer {
    fn resolve_address(&self, pc: u64) -> Option<SymbolInfo> {
        // backtrace::resolve は渡したアドレスから1を引いて引くので、リターンアドレスに戻す
        let addr = (pc as usize).wrapping_add(1) as *mut c_void;

        let mut info = None;
        backtrace::resolve(addr, |symbol| {
            // 最初に報告されるのがインライン展開の最も内側
            if info.is_some() {
                return;
            }
            info = Some(SymbolInfo {
                file: symbol.filename().map(|path| path.display().to_string()),
                line: symbol.lineno(),
                function: symbol.name().map(|name| format!("{:#}", name)),
            });
        });
        info
    }
}

/// 先頭から順に試し、完全な情報を返した最初の結果を使う
struct SymbolizerChain(Vec<Box<dyn Symbolize>>);

impl Symbolize for SymbolizerChain {
    fn resolve_address(&self, pc: u64) -> Option<SymbolInfo> {
        let mut partial = None;
        for symbolizer in &self.0 {
            match symbolizer.resolve_address(pc) {
                Some(info) if is_complete(&info) => return Some(info),
                Some(info) => partial = partial.or(Some(info)),
                None => {}
            }
        }
        partial
    }
}

fn is_complete(info: &SymbolInfo) -> bool {
    matches!(
        info,
        SymbolInfo {
            file: Some(file),
            line: Some(_),
            function: Some(function),
        } if !file.is_empty() && !function.is_empty()
    )
}

static GLOBAL: OnceLock<FrameResolver> = OnceLock::new();

/// リターンアドレストークンをファイル・行・関数名に解決する
///
/// 結果はキャッシュしない。同じトークンに対して何度呼んでも同じ結果を返す。
pub struct FrameResolver {
    symbolizer: Box<dyn Symbolize>,
}

impl FrameResolver {
    /// 任意のシンボル化サービスから作成する
    pub fn new(symbolizer: impl Symbolize + 'static) -> Self {
        Self {
            symbolizer: Box::new(symbolizer),
        }
    }

    /// 方式を指定して作成する
    ///
    /// `Dwarf` は実行可能ファイルを読めない環境では失敗する。
    pub fn from_kind(kind: SymbolizerKind) -> Result<Self> {
        match kind {
            SymbolizerKind::Auto => Ok(Self::auto()),
            SymbolizerKind::Dwarf => Ok(Self::new(DwarfSymbolizer::for_current_process()?)),
            SymbolizerKind::Backtrace => Ok(Self::new(BacktraceSymbolizer)),
        }
    }

    fn auto() -> Self {
        match DwarfSymbolizer::for_current_process() {
            Ok(dwarf) => Self::new(SymbolizerChain(vec![
                Box::new(dwarf),
                Box::new(BacktraceSymbolizer),
            ])),
            Err(e) => {
                tracing::debug!("DWARF symbolizer unavailable, using backtrace: {:#}", e);
                Self::new(BacktraceSymbolizer)
            }
        }
    }

    /// プロセス全体で共有する解決器
    ///
    /// 未設定なら初回呼び出し時に `SymbolizerKind::Auto` で作成し、以後は変更しない。
    pub fn global() -> &'static FrameResolver {
        GLOBAL.get_or_init(Self::auto)
    }

    /// プロセス全体の解決器を設定する
    ///
    /// 起動時に一度だけ呼ぶ。既に設定・使用済みの場合は渡した解決器を返す。
    pub fn install(resolver: FrameResolver) -> std::result::Result<(), FrameResolver> {
        GLOBAL.set(resolver)
    }

    /// トークンを解決する。失敗した場合は `ResolvedFacts::unknown()`。
    pub fn resolve(&self, token: AddressToken) -> ResolvedFacts {
        let Some(pc) = token.pc() else {
            return ResolvedFacts::unknown();
        };

        match self.symbolizer.resolve_address(pc as u64) {
            Some(SymbolInfo {
                file: Some(file),
                line: Some(line),
                function: Some(function),
            }) if !file.is_empty() && !function.is_empty() => {
                ResolvedFacts::new(file, line, function)
            }
            _ => ResolvedFacts::unknown(),
        }
    }
}

impl fmt::Debug for FrameResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameResolver").finish_non_exhaustive()
    }
}
