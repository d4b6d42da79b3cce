//! Just enough lexing to give the scripted engine a realistic static phase.

use xqbridge_engine::EngineError;

pub(crate) struct Prolog<'a> {
    pub declared: Vec<String>,
    pub prefixes: Vec<String>,
    pub body: &'a str,
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Byte length of the string literal or comment starting at `s`, if any.
/// `Err` when it is never closed.
fn skip_opaque(s: &str) -> Result<Option<usize>, EngineError> {
    if let Some(quote) = s.chars().next().filter(|c| matches!(c, '"' | '\'')) {
        let mut chars = s.char_indices().skip(1).peekable();
        while let Some((i, c)) = chars.next() {
            if c == quote {
                if chars.peek().is_some_and(|(_, next)| *next == quote) {
                    chars.next();
                    continue;
                }
                return Ok(Some(i + 1));
            }
        }
        return Err(EngineError::syntax("unterminated string literal"));
    }
    if s.starts_with("(:") {
        let mut depth = 0usize;
        let mut i = 0;
        while i < s.len() {
            let rest = &s[i..];
            if rest.starts_with("(:") {
                depth += 1;
                i += 2;
            } else if rest.starts_with(":)") {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Ok(Some(i));
                }
            } else {
                i += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
        return Err(EngineError::syntax("unterminated comment"));
    }
    Ok(None)
}

/// Calls `f` with each character outside literals and comments, with its byte offset.
fn scan(s: &str, mut f: impl FnMut(usize, char) -> bool) -> Result<(), EngineError> {
    let mut i = 0;
    while i < s.len() {
        if let Some(len) = skip_opaque(&s[i..])? {
            i += len;
            continue;
        }
        let Some(c) = s[i..].chars().next() else {
            break;
        };
        if !f(i, c) {
            return Ok(());
        }
        i += c.len_utf8();
    }
    Ok(())
}

pub(crate) fn check_syntax(text: &str) -> Result<(), EngineError> {
    if text.trim().is_empty() {
        return Err(EngineError::syntax("empty expression"));
    }
    let mut stack = Vec::new();
    let mut mismatch = None;
    scan(text, |_, c| {
        match c {
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(open) {
                    mismatch = Some(c);
                    return false;
                }
            }
            _ => {}
        }
        true
    })?;
    if let Some(c) = mismatch {
        return Err(EngineError::syntax(format!("unexpected '{c}'")));
    }
    if let Some(c) = stack.pop() {
        return Err(EngineError::syntax(format!("unclosed '{c}'")));
    }
    Ok(())
}

/// Offset just past the next `;` outside literals and comments.
fn statement_end(s: &str) -> Option<usize> {
    let mut end = None;
    scan(s, |i, c| {
        if c == ';' {
            end = Some(i + 1);
            return false;
        }
        true
    })
    .ok()?;
    end
}

fn skip_trivia(s: &str) -> &str {
    let mut rest = s.trim_start();
    while let Ok(Some(len)) = skip_opaque(rest) {
        if !rest.starts_with("(:") {
            break;
        }
        rest = rest[len..].trim_start();
    }
    rest
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    s.strip_prefix(keyword).and_then(|rest| rest.chars().next()).is_some_and(char::is_whitespace)
}

/// Splits leading `xquery version` and `declare` statements off the body.
pub(crate) fn split_prolog(text: &str) -> Prolog<'_> {
    let mut declared = Vec::new();
    let mut prefixes = Vec::new();
    let mut rest = skip_trivia(text);
    loop {
        if !(starts_with_keyword(rest, "xquery") || starts_with_keyword(rest, "declare")) {
            break;
        }
        let Some(end) = statement_end(rest) else {
            break;
        };
        let statement = &rest[..end];
        let words: Vec<&str> = statement.split_whitespace().take(3).collect();
        match words.as_slice() {
            ["declare", "variable", name] => {
                let name: String =
                    name.trim_start_matches('$').chars().take_while(|c| is_name_char(*c)).collect();
                declared.push(name);
            }
            ["declare", "namespace", prefix] => {
                prefixes.push(prefix.chars().take_while(|c| is_name_char(*c)).collect());
            }
            _ => {}
        }
        rest = skip_trivia(&rest[end..]);
    }
    Prolog { declared, prefixes, body: rest }
}

/// Namespace prefixes of qualified names in `body`, in order of first use.
pub(crate) fn prefixes_used(body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let chars: Vec<(usize, char)> = collect_chars(body);
    let mut idx = 0;
    while idx < chars.len() {
        let (_, c) = chars[idx];
        let after_dollar = idx > 0 && chars[idx - 1].1 == '$';
        if is_name_start(c) && (idx == 0 || !is_name_char(chars[idx - 1].1)) {
            let start = idx;
            while idx < chars.len() && is_name_char(chars[idx].1) {
                idx += 1;
            }
            let qualified = chars.get(idx).is_some_and(|(_, c)| *c == ':')
                && chars.get(idx + 1).is_some_and(|(_, c)| is_name_start(*c) || *c == '*');
            if qualified && !after_dollar {
                let prefix: String = chars[start..idx].iter().map(|(_, c)| c).collect();
                if !out.contains(&prefix) {
                    out.push(prefix);
                }
            }
            continue;
        }
        idx += 1;
    }
    out
}

/// Variable names referenced as `$name` in `body`, in order of first use.
pub(crate) fn variables_referenced(body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let chars = collect_chars(body);
    for (idx, (_, c)) in chars.iter().enumerate() {
        if *c != '$' {
            continue;
        }
        let name: String = chars[idx + 1..].iter().map(|(_, c)| *c).take_while(|c| is_name_char(*c)).collect();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Characters outside literals and comments. Skipped regions read as a space.
fn collect_chars(s: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut last = 0;
    let _ = scan(s, |i, c| {
        if i > last {
            out.push((last, ' '));
        }
        out.push((i, c));
        last = i + c.len_utf8();
        true
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a[b(c)]")]
    #[case("'(' || \"[\"")]
    #[case("a (: ) :) b")]
    #[case("'it''s'")]
    fn balanced_text_passes(#[case] text: &str) {
        check_syntax(text).unwrap();
    }

    #[rstest]
    #[case("")]
    #[case("a[b")]
    #[case("a)")]
    #[case("'open")]
    #[case("(: never closed")]
    fn broken_text_fails(#[case] text: &str) {
        assert!(check_syntax(text).is_err());
    }

    #[rstest]
    fn prolog_is_split_from_body() {
        let prolog = split_prolog(
            "xquery version '3.1'; (: c :) declare namespace p = 'urn;p'; declare variable $x external; p:a/$x",
        );
        assert_eq!(prolog.declared, ["x"]);
        assert_eq!(prolog.prefixes, ["p"]);
        assert_eq!(prolog.body, "p:a/$x");
    }

    #[rstest]
    fn prefixes_skip_axes_variables_and_literals() {
        assert_eq!(prefixes_used("child::p:a/q:*/@r:b['s:t']/$v"), ["p", "q", "r"]);
    }

    #[rstest]
    fn variables_are_listed_once() {
        assert_eq!(variables_referenced("$a + $b + $a + '$c'"), ["a", "b"]);
    }
}
