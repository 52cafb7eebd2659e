//! REPLコマンド

/// REPLコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// バックトレース表示（書式指定は省略可）
    Backtrace(Option<String>),
    /// 指定した番号のフレームを表示
    Frame {
        index: usize,
        directive: Option<String>,
    },
    /// 関数名を短縮して表示
    Simplify(String),
    /// ヘルプ表示
    Help,
    /// 終了
    Quit,
}

impl Command {
    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return None;
        }

        match parts[0] {
            "backtrace" | "bt" => match parts.len() {
                1 => Some(Command::Backtrace(None)),
                2 => Some(Command::Backtrace(Some(parts[1].to_string()))),
                _ => None,
            },
            "frame" | "f" => {
                let index = parts.get(1)?.parse().ok()?;
                match parts.len() {
                    2 => Some(Command::Frame {
                        index,
                        directive: None,
                    }),
                    3 => Some(Command::Frame {
                        index,
                        directive: Some(parts[2].to_string()),
                    }),
                    _ => None,
                }
            }
            "simplify" | "s" => {
                if parts.len() > 1 {
                    Some(Command::Simplify(parts[1..].join(" ")))
                } else {
                    None
                }
            }
            "help" | "h" | "?" => Some(Command::Help),
            "quit" | "q" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}
