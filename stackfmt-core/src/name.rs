//! 関数名の短縮表示

/// 完全修飾された関数名からパッケージ・モジュールのパスを取り除く
///
/// - `github.com/org/pkg.(*Type).Method` のような名前は、最後の `/` までと
///   その後の最初の `.` までを取り除く（`(*Type).Method`）。
/// - `crate::module::Type::method::{{closure}}` のようなRustのパスは、
///   先頭のモジュールを取り除き、型と関数名とクロージャ部分を残す
///   （`Type::method::{{closure}}`）。
///
/// 空文字列は空文字列のまま返す。
pub fn simplify(name: &str) -> &str {
    let starts = path_segment_starts(name);
    if starts.len() > 1 {
        return simplify_path(name, &starts);
    }

    let name = match name.rfind('/') {
        Some(i) => &name[i + 1..],
        None => name,
    };
    match name.find('.') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// `<...>` の外側にある `::` で区切った各セグメントの開始位置
fn path_segment_starts(name: &str) -> Vec<usize> {
    let bytes = name.as_bytes();
    let mut starts = vec![0];
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            // `->` は山括弧ではない
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                starts.push(i + 2);
                i += 2;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    starts
}

fn simplify_path<'a>(name: &'a str, starts: &[usize]) -> &'a str {
    let segment = |idx: usize| -> &'a str {
        let end = starts.get(idx + 1).map_or(name.len(), |next| next - 2);
        &name[starts[idx]..end]
    };
    let first_char = |idx: usize| segment(idx).chars().next();

    // 末尾の `{{closure}}` などを除いた最後のセグメントが関数名
    let Some(function) = (0..starts.len())
        .rev()
        .find(|&idx| !matches!(first_char(idx), Some('{') | Some('<') | None))
    else {
        return name;
    };

    let mut first = function;
    while first > 0 {
        match first_char(first - 1) {
            Some(c) if c.is_uppercase() || c == '<' => first -= 1,
            _ => break,
        }
    }

    &name[starts[first]..]
}
