//! ELFとDWARFの読み込み機能

use crate::Result;
use object::{Object, ObjectSection, ObjectSegment};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// DWARFセクションのリーダー型
pub type DwarfReader = gimli::EndianSlice<'static, gimli::RunTimeEndian>;

/// DWARFローダー
pub struct DwarfLoader {
    /// 読み込んだファイルのパス
    path: PathBuf,
    data: &'static [u8],
    /// オブジェクトファイル
    object_file: object::File<'static>,
    /// DWARFコンテキスト
    dwarf: gimli::Dwarf<DwarfReader>,
}

impl DwarfLoader {
    /// ELFファイルからDWARF情報を読み込む
    ///
    /// ファイルの内容はプロセス終了まで保持し、同じパスを再び読み込むときは再利用する。
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_data = read_cached(path)?;

        let object_file = object::File::parse(file_data)
            .map_err(|e| anyhow::anyhow!("Failed to parse ELF file {:?}: {}", path, e))?;

        let dwarf = load_dwarf(&object_file)?;

        tracing::debug!(
            path = %path.display(),
            pie = matches!(object_file.kind(), object::ObjectKind::Dynamic),
            "loaded DWARF sections"
        );

        Ok(Self {
            path: path.to_path_buf(),
            data: file_data,
            object_file,
            dwarf,
        })
    }

    /// 実行中のプロセス自身の実行可能ファイルを読み込む
    pub fn load_current_exe() -> Result<Self> {
        let exe = std::env::current_exe()
            .map_err(|e| anyhow::anyhow!("Failed to locate current executable: {}", e))?;
        Self::load(exe)
    }

    /// 読み込んだファイルの内容
    pub fn data(&self) -> &'static [u8] {
        self.data
    }

    /// 読み込んだファイルのパスを取得
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// オブジェクトファイルへの参照を取得
    pub fn object_file(&self) -> &object::File<'static> {
        &self.object_file
    }

    /// addr2lineに渡すためにDWARFコンテキストを取り出す
    pub fn into_dwarf(self) -> gimli::Dwarf<DwarfReader> {
        self.dwarf
    }

    /// PIE（Position Independent Executable）かどうかを判定する
    ///
    /// PIE実行ファイルの場合、シンボルアドレスはオフセットであり、
    /// 実行時ベースアドレスを加算する必要があります。
    /// 非PIE実行ファイルの場合、シンボルアドレスは絶対アドレスです。
    pub fn is_pie(&self) -> bool {
        matches!(self.object_file.kind(), object::ObjectKind::Dynamic)
    }

    /// ファイルオフセット0から始まるセグメントのリンク時アドレス
    ///
    /// `/proc/self/maps` のオフセット0のマッピング開始アドレスからこの値を引くと、
    /// ロードバイアスになります。
    pub fn first_segment_address(&self) -> Option<u64> {
        self.object_file
            .segments()
            .find(|segment| segment.file_range().0 == 0)
            .map(|segment| segment.address())
    }
}

/// 読み込み済みファイルの内容（パスごとに一度だけ読み込む）
static LOADED_FILES: Mutex<Vec<(PathBuf, &'static [u8])>> = Mutex::new(Vec::new());

/// ファイルの内容を 'static で取得する
///
/// シンボルテーブルとDWARFはプロセス終了まで参照されるため解放しない。
fn read_cached(path: &Path) -> Result<&'static [u8]> {
    let mut loaded = LOADED_FILES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some((_, data)) = loaded.iter().find(|(loaded_path, _)| loaded_path == path) {
        return Ok(*data);
    }

    let data = fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {:?}: {}", path, e))?;
    let data: &'static [u8] = Box::leak(data.into_boxed_slice());
    loaded.push((path.to_path_buf(), data));
    Ok(data)
}

fn load_dwarf(object_file: &object::File<'static>) -> Result<gimli::Dwarf<DwarfReader>> {
    let endian = if object_file.is_little_endian() {
        gimli::RunTimeEndian::Little
    } else {
        gimli::RunTimeEndian::Big
    };

    let load_section = |id: gimli::SectionId| -> Result<DwarfReader> {
        let data = object_file
            .section_by_name(id.name())
            .and_then(|section| section.data().ok())
            .unwrap_or(&[]);
        Ok(gimli::EndianSlice::new(data, endian))
    };

    gimli::Dwarf::load(load_section)
        .map_err(|e| anyhow::anyhow!("Failed to load DWARF sections: {}", e))
}
