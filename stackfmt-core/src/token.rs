//! リターンアドレストークン

use std::fmt;

/// 呼び出しフレーム内のリターンアドレス
///
/// 呼び出し命令の直後を指すため、シンボル化には1を引いた値を使う。
/// 0は「無効・未解決」を表す。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AddressToken(usize);

impl AddressToken {
    /// 無効なトークン
    pub const INVALID: AddressToken = AddressToken(0);

    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// 生のアドレス値
    pub const fn get(self) -> usize {
        self.0
    }

    /// 無効トークンか
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }

    /// 呼び出し命令のアドレス（トークン - 1）
    ///
    /// 無効トークンではNone。
    pub const fn pc(self) -> Option<usize> {
        self.0.checked_sub(1)
    }
}

impl From<usize> for AddressToken {
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

impl From<AddressToken> for usize {
    fn from(token: AddressToken) -> Self {
        token.0
    }
}

impl fmt::Debug for AddressToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddressToken(0x{:x})", self.0)
    }
}
