//! File name patterns in `filepath.Match` syntax, compiled onto `glob`
//!
//! Accepted syntax:
//!
//! ```text
//! *         any run of characters
//! ?         any single character
//! [abc]     one of the listed characters; ranges like [a-z] allowed
//! [^abc]    any character not listed
//! \c        the literal character c, also inside a class
//! ```
//!
//! `glob` negates a class with `!` and has no backslash escape, so the pattern
//! is rewritten before it is handed over.

use glob::Pattern;

/// Characters `glob` treats specially inside a class, in ascending order
const CLASS_SPECIALS: [char; 3] = ['!', '-', ']'];

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

/// Compile `pattern` into a `glob::Pattern`
pub(crate) fn compile(pattern: &str) -> Result<Pattern, String> {
    let translated = translate(pattern)?;
    Pattern::new(&translated).map_err(|e| e.to_string())
}

fn translate(pattern: &str) -> Result<String, String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // `glob` reserves `**` for recursive matching
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                out.push('*');
            }
            '?' => out.push('?'),
            '\\' => {
                let escaped = chars.next().ok_or("trailing backslash")?;
                push_literal(&mut out, escaped);
            }
            '[' => {
                let (negated, items) = parse_class(&mut chars)?;
                push_class(&mut out, negated, items);
            }
            c => push_literal(&mut out, c),
        }
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if matches!(c, '*' | '?' | '[' | ']') {
        out.push('[');
        out.push(c);
        out.push(']');
    } else {
        out.push(c);
    }
}

fn parse_class(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<(bool, Vec<ClassItem>), String> {
    let negated = chars.peek() == Some(&'^');
    if negated {
        chars.next();
    }

    let mut items = Vec::new();
    loop {
        let c = chars.next().ok_or("unclosed character class")?;
        if c == ']' && !items.is_empty() {
            return Ok((negated, items));
        }
        let lo = class_char(c, chars)?;
        if chars.peek() == Some(&'-') {
            chars.next();
            let next = chars.next().ok_or("unclosed character class")?;
            let hi = class_char(next, chars)?;
            items.push(ClassItem::Range(lo, hi));
        } else {
            items.push(ClassItem::Single(lo));
        }
    }
}

fn class_char(
    c: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<char, String> {
    match c {
        '-' | ']' => Err(format!("unexpected '{}' in character class", c)),
        '\\' => chars.next().ok_or_else(|| "trailing backslash".to_string()),
        c => Ok(c),
    }
}

/// Emit a class so `glob` reads it back as the same set
///
/// `]` must come first, `!` must not come first, and `-` must come last.
/// Ranges with one of those as an endpoint are split around it.
fn push_class(out: &mut String, negated: bool, items: Vec<ClassItem>) {
    let mut ranges = Vec::new();
    let mut singles = Vec::new();
    let mut specials = Vec::new();

    for item in items {
        match item {
            ClassItem::Single(c) => add_single(c, &mut singles, &mut specials),
            ClassItem::Range(lo, hi) if lo > hi => {}
            ClassItem::Range(lo, hi) => {
                let mut start = lo;
                for special in CLASS_SPECIALS.iter().copied().filter(|s| (lo..=hi).contains(s)) {
                    if start < special {
                        ranges.push((start, prev_char(special)));
                    }
                    add_single(special, &mut singles, &mut specials);
                    start = next_char(special);
                }
                if start <= hi {
                    ranges.push((start, hi));
                }
            }
        }
    }

    let mut body = String::new();
    if specials.contains(&']') {
        body.push(']');
    }
    for (lo, hi) in ranges {
        if lo == hi {
            body.push(lo);
        } else {
            body.push(lo);
            body.push('-');
            body.push(hi);
        }
    }
    body.extend(singles);
    if specials.contains(&'!') {
        body.push('!');
    }
    if specials.contains(&'-') {
        body.push('-');
    }

    match (negated, body.as_str()) {
        (false, "") => out.push_str("[/]"),
        (true, "") => out.push('?'),
        (false, "!") => out.push('!'),
        (false, "!-") => out.push_str("[-!]"),
        _ => {
            out.push('[');
            if negated {
                out.push('!');
            }
            out.push_str(&body);
            out.push(']');
        }
    }
}

fn add_single(c: char, singles: &mut Vec<char>, specials: &mut Vec<char>) {
    let bucket = if CLASS_SPECIALS.contains(&c) { specials } else { singles };
    if !bucket.contains(&c) {
        bucket.push(c);
    }
}

fn prev_char(c: char) -> char {
    char::from_u32(c as u32 - 1).unwrap_or(c)
}

fn next_char(c: char) -> char {
    char::from_u32(c as u32 + 1).unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glob::MatchOptions;

    fn matches(pattern: &str, name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        compile(pattern).unwrap().matches_with(name, options)
    }

    #[test]
    fn test_wildcards() {
        assert!(matches("*.yml", "a.yml"));
        assert!(matches("*.yml", ".hidden.yml"));
        assert!(matches("a?.yml", "a1.yml"));
        assert!(!matches("a?.yml", "a10.yml"));
        assert!(matches("a**.yml", "abc.yml"));
    }

    #[test]
    fn test_caret_negates_a_class() {
        assert!(matches("[^a]*.yml", "b.yml"));
        assert!(!matches("[^a]*.yml", "a.yml"));
        assert!(!matches("[^a-c]*.yml", "b.yml"));
        assert!(matches("[^a-c]*.yml", "d.yml"));
    }

    #[test]
    fn test_bang_is_literal_in_a_class() {
        assert!(matches("[!a].yml", "!.yml"));
        assert!(matches("[!a].yml", "a.yml"));
        assert!(!matches("[!a].yml", "b.yml"));
        assert!(matches("[!].yml", "!.yml"));
    }

    #[test]
    fn test_backslash_escapes() {
        assert!(matches(r"a\*.yml", "a*.yml"));
        assert!(!matches(r"a\*.yml", "ab.yml"));
        assert!(matches(r"\[x\].yml", "[x].yml"));
        assert!(matches(r"[\]\-]", "]"));
        assert!(matches(r"[\]\-]", "-"));
        assert!(!matches(r"[\]\-]", "a"));
        assert!(matches(r"\a.yml", "a.yml"));
    }

    #[test]
    fn test_ranges_around_special_characters() {
        assert!(matches("[ -#]", "!"));
        assert!(matches("[ -#]", "\""));
        assert!(!matches("[ -#]", "$"));
        assert!(matches(r"[Z-\]]", "]"));
        assert!(matches(r"[Z-\]]", "["));
        assert!(!matches(r"[Z-\]]", "^"));
    }

    #[test]
    fn test_malformed_patterns() {
        for pattern in ["[*.yml", "a\\", "[]", "[^]", "[-a]", "[a-]", "[a-", r"[\"] {
            assert!(compile(pattern).is_err(), "{:?}", pattern);
        }
    }
}
