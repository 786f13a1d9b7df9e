//! Splits template source into text runs and tokenized actions

use super::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `.`
    Dot,
    /// `.Name`
    Field(String),
    /// `$`
    Root,
    /// `$.Name`
    RootField(String),
    /// Bare identifier: keyword, function, `true`/`false`/`nil`
    Ident(String),
    Str(String),
    Int(i64),
    Pipe,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Item {
    Text(String),
    Action { tokens: Vec<Token>, line: usize },
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

pub(crate) fn lex(name: &str, source: &str) -> Result<Vec<Item>, TemplateError> {
    let mut lexer = Lexer {
        name,
        source,
        pos: 0,
        items: Vec::new(),
        trim_next: false,
    };
    lexer.run()?;
    Ok(lexer.items)
}

struct Lexer<'a> {
    name: &'a str,
    source: &'a str,
    pos: usize,
    items: Vec<Item>,
    trim_next: bool,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), TemplateError> {
        loop {
            let Some(offset) = self.source[self.pos..].find(OPEN) else {
                self.push_text(self.pos, self.source.len());
                return Ok(());
            };
            let start = self.pos + offset;
            self.push_text(self.pos, start);

            let line = self.line_at(start);
            let mut cursor = start + OPEN.len();
            if self.is_trim_marker(cursor) {
                self.trim_previous();
                cursor += 1;
            }

            let body = skip_whitespace(self.source, cursor);
            if self.source[body..].starts_with("/*") {
                self.pos = self.lex_comment(body, line)?;
                // Stops a later `{{-` from trimming text before the comment
                self.items.push(Item::Text(String::new()));
            } else {
                let (tokens, end) = self.lex_action(cursor, line)?;
                self.items.push(Item::Action { tokens, line });
                self.pos = end;
            }
        }
    }

    fn push_text(&mut self, from: usize, to: usize) {
        let mut text = &self.source[from..to];
        if self.trim_next {
            text = text.trim_start();
            self.trim_next = false;
        }
        if !text.is_empty() {
            self.items.push(Item::Text(text.to_string()));
        }
    }

    fn trim_previous(&mut self) {
        if let Some(Item::Text(text)) = self.items.last_mut() {
            let trimmed_len = text.trim_end().len();
            text.truncate(trimmed_len);
            if text.is_empty() {
                self.items.pop();
            }
        }
    }

    /// `{{- ` and ` -}}` need whitespace next to the dash; `{{-3}}` is a number.
    fn is_trim_marker(&self, at: usize) -> bool {
        let rest = &self.source[at..];
        rest.starts_with('-')
            && rest[1..]
                .chars()
                .next()
                .map_or(false, |c| c.is_whitespace())
    }

    fn line_at(&self, at: usize) -> usize {
        1 + self.source[..at].matches('\n').count()
    }

    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::parse(self.name, line, message)
    }

    fn lex_comment(&mut self, at: usize, line: usize) -> Result<usize, TemplateError> {
        let source = self.source;
        let Some(close) = source[at..].find("*/") else {
            return Err(self.error(line, "unclosed comment"));
        };
        let after = skip_whitespace(source, at + close + 2);
        let rest = &source[after..];
        if rest.starts_with("-}}") && after > at + close + 2 {
            self.trim_next = true;
            Ok(after + 3)
        } else if rest.starts_with(CLOSE) {
            Ok(after + CLOSE.len())
        } else {
            Err(self.error(line, "comment ends before closing delimiter"))
        }
    }

    fn lex_action(&mut self, mut at: usize, line: usize) -> Result<(Vec<Token>, usize), TemplateError> {
        let source = self.source;
        let mut tokens = Vec::new();
        loop {
            let skipped = skip_whitespace(source, at);
            let had_space = skipped > at;
            at = skipped;
            let rest = &source[at..];

            if rest.starts_with(CLOSE) {
                return Ok((tokens, at + CLOSE.len()));
            }
            if had_space && rest.starts_with("-}}") {
                self.trim_next = true;
                return Ok((tokens, at + 3));
            }

            let Some(c) = rest.chars().next() else {
                return Err(self.error(line, "unclosed action"));
            };

            match c {
                '"' => {
                    let (value, end) = self.lex_quoted(at, line)?;
                    tokens.push(Token::Str(value));
                    at = end;
                }
                '`' => {
                    let Some(close) = rest[1..].find('`') else {
                        return Err(self.error(line, "unterminated raw quoted string"));
                    };
                    tokens.push(Token::Str(rest[1..1 + close].to_string()));
                    at += close + 2;
                }
                '|' => {
                    tokens.push(Token::Pipe);
                    at += 1;
                }
                '(' => {
                    tokens.push(Token::LParen);
                    at += 1;
                }
                ')' => {
                    tokens.push(Token::RParen);
                    at += 1;
                }
                '.' => {
                    let ident = take_ident(&rest[1..]);
                    if ident.is_empty() {
                        tokens.push(Token::Dot);
                        at += 1;
                    } else {
                        tokens.push(Token::Field(ident.to_string()));
                        at += 1 + ident.len();
                    }
                }
                '$' => {
                    let ident = rest[1..].strip_prefix('.').map(take_ident).unwrap_or("");
                    if ident.is_empty() {
                        tokens.push(Token::Root);
                        at += 1;
                    } else {
                        tokens.push(Token::RootField(ident.to_string()));
                        at += 2 + ident.len();
                    }
                }
                c if c.is_ascii_digit() || (c == '-' && starts_with_digit(&rest[1..])) => {
                    let len = 1 + rest[1..]
                        .find(|ch: char| !ch.is_ascii_digit())
                        .unwrap_or(rest.len() - 1);
                    let literal = &rest[..len];
                    let value = literal
                        .parse::<i64>()
                        .map_err(|_| self.error(line, format!("bad number syntax: {}", literal)))?;
                    tokens.push(Token::Int(value));
                    at += len;
                }
                c if c.is_alphabetic() || c == '_' => {
                    let ident = take_ident(rest);
                    tokens.push(Token::Ident(ident.to_string()));
                    at += ident.len();
                }
                other => {
                    return Err(self.error(line, format!("unexpected {:?} in command", other)));
                }
            }
        }
    }

    fn lex_quoted(&self, at: usize, line: usize) -> Result<(String, usize), TemplateError> {
        let mut value = String::new();
        let mut chars = self.source[at + 1..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '"' => return Ok((value, at + 1 + offset + 1)),
                '\n' => break,
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, other)) => {
                        return Err(self.error(line, format!("unknown escape sequence: \\{}", other)))
                    }
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(self.error(line, "unterminated quoted string"))
    }
}

fn skip_whitespace(source: &str, at: usize) -> usize {
    let rest = &source[at..];
    at + (rest.len() - rest.trim_start().len())
}

fn take_ident(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    &s[..end]
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().next().map_or(false, |c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Item {
        Item::Text(s.to_string())
    }

    #[test]
    fn test_lex_plain_text() {
        assert_eq!(lex("t", "name: bob\n").unwrap(), vec![text("name: bob\n")]);
        assert!(lex("t", "").unwrap().is_empty());
    }

    #[test]
    fn test_lex_method_call() {
        let items = lex("t", r#"name: {{ .Get "name" }}"#).unwrap();
        assert_eq!(
            items,
            vec![
                text("name: "),
                Item::Action {
                    tokens: vec![Token::Field("Get".to_string()), Token::Str("name".to_string())],
                    line: 1,
                },
            ]
        );
    }

    #[test]
    fn test_lex_tokens() {
        let items = lex("t", "{{ index (.GetMap `db`) \"host\" | quote }}{{ $.Get -12 . $ }}").unwrap();
        let Item::Action { tokens, .. } = &items[0] else { panic!("expected action") };
        assert_eq!(
            tokens,
            &vec![
                Token::Ident("index".to_string()),
                Token::LParen,
                Token::Field("GetMap".to_string()),
                Token::Str("db".to_string()),
                Token::RParen,
                Token::Str("host".to_string()),
                Token::Pipe,
                Token::Ident("quote".to_string()),
            ]
        );
        let Item::Action { tokens, .. } = &items[1] else { panic!("expected action") };
        assert_eq!(
            tokens,
            &vec![Token::RootField("Get".to_string()), Token::Int(-12), Token::Dot, Token::Root]
        );
    }

    #[test]
    fn test_lex_trim_markers() {
        let items = lex("t", "a  \n {{- .Get \"x\" -}} \n  b").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], text("a"));
        assert_eq!(items[2], text("b"));
    }

    #[test]
    fn test_lex_comment_is_dropped() {
        let items = lex("t", "a {{/* note */}} b {{- /* trimmed */ -}} c").unwrap();
        assert_eq!(items, vec![text("a "), text(""), text(" b"), text(""), text("c")]);
    }

    #[test]
    fn test_lex_trim_stops_at_comment() {
        let items = lex("t", "a   {{/* c */}}{{- \"x\" }}").unwrap();
        assert_eq!(items[0], text("a   "));
        assert!(matches!(items[1], Item::Action { .. }));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_lex_line_numbers() {
        let items = lex("t", "a\nb\n{{ . }}").unwrap();
        assert!(matches!(items[1], Item::Action { line: 3, .. }));
    }

    #[test]
    fn test_lex_string_escapes() {
        let items = lex("t", r#"{{ "a\"b\\c\n" }}"#).unwrap();
        let Item::Action { tokens, .. } = &items[0] else { panic!("expected action") };
        assert_eq!(tokens, &vec![Token::Str("a\"b\\c\n".to_string())]);
    }

    #[test]
    fn test_lex_errors() {
        assert!(lex("t", "{{ .Get \"name\"").is_err());
        assert!(lex("t", "{{ .Get \"name }}").is_err());
        assert!(lex("t", "{{ /* open").is_err());
        assert!(lex("t", "{{ # }}").is_err());
        assert!(lex("t", "{{ \"\\q\" }}").is_err());
    }
}
