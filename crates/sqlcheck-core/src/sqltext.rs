//! Lexical view of raw SQL text.

/// Copy of `sql` with string literals, quoted identifiers and comments
/// replaced by spaces. Byte offsets into the result match `sql`, so spans
/// found in the blanked text slice the original directly.
pub fn blank_inert(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                blank(&mut out, c);
                // a doubled quote closes and re-opens; both halves are blanked
                for n in chars.by_ref() {
                    blank(&mut out, n);
                    if n == close {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                blank(&mut out, c);
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push(n);
                        break;
                    }
                    blank(&mut out, n);
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                blank(&mut out, c);
                if let Some(star) = chars.next() {
                    blank(&mut out, star);
                }
                let mut prev = '\0';
                for n in chars.by_ref() {
                    blank(&mut out, n);
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn blank(out: &mut String, c: char) {
    out.extend(std::iter::repeat(' ').take(c.len_utf8()));
}
