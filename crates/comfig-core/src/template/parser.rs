//! Builds the node tree from lexed items

use std::vec::IntoIter;

use super::lexer::{Item, Token};
use super::TemplateError;

/// Functions callable by name inside actions
pub(crate) const FUNCTIONS: &[&str] = &[
    "and", "default", "eq", "index", "join", "len", "ne", "not", "or", "quote",
];

const KEYWORDS: &[&str] = &["if", "else", "end", "range", "with"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action {
        pipeline: Pipeline,
        line: usize,
    },
    If {
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Vec<Node>,
        line: usize,
    },
    Range {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
        line: usize,
    },
    With {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
        line: usize,
    },
}

/// Commands chained with `|`; each result feeds the next as its last argument
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Dot,
    Root,
    Field(String),
    RootField(String),
    Func(String),
    Str(String),
    Int(i64),
    Bool(bool),
    Nil,
    Sub(Pipeline),
}

impl Operand {
    fn is_callable(&self) -> bool {
        matches!(self, Operand::Field(_) | Operand::RootField(_) | Operand::Func(_))
    }
}

enum Stop {
    Eof,
    End,
    Else { rest: Vec<Token>, line: usize },
}

pub(crate) fn parse(name: &str, items: Vec<Item>) -> Result<Vec<Node>, TemplateError> {
    let mut parser = Parser {
        name,
        items: items.into_iter(),
        last_line: 1,
    };
    let (nodes, stop) = parser.parse_list()?;
    match stop {
        Stop::Eof => Ok(nodes),
        Stop::End => Err(parser.error(parser.last_line, "unexpected {{end}}")),
        Stop::Else { line, .. } => Err(parser.error(line, "unexpected {{else}}")),
    }
}

struct Parser<'a> {
    name: &'a str,
    items: IntoIter<Item>,
    last_line: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::parse(self.name, line, message)
    }

    fn parse_list(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.next() {
            let (tokens, line) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { tokens, line } => (tokens, line),
            };
            self.last_line = line;

            let keyword = match tokens.first() {
                Some(Token::Ident(ident)) if KEYWORDS.contains(&ident.as_str()) => ident.clone(),
                _ => {
                    let pipeline = self.parse_pipeline(&tokens, line)?;
                    nodes.push(Node::Action { pipeline, line });
                    continue;
                }
            };

            let rest = &tokens[1..];
            match keyword.as_str() {
                "end" => {
                    if !rest.is_empty() {
                        return Err(self.error(line, "unexpected tokens after end"));
                    }
                    return Ok((nodes, Stop::End));
                }
                "else" => {
                    return Ok((nodes, Stop::Else { rest: rest.to_vec(), line }));
                }
                "if" => nodes.push(self.parse_if(rest, line)?),
                "range" => {
                    let pipeline = self.parse_pipeline(rest, line)?;
                    let (body, otherwise) = self.parse_body("range", line)?;
                    nodes.push(Node::Range { pipeline, body, otherwise, line });
                }
                "with" => {
                    let pipeline = self.parse_pipeline(rest, line)?;
                    let (body, otherwise) = self.parse_body("with", line)?;
                    nodes.push(Node::With { pipeline, body, otherwise, line });
                }
                _ => unreachable!("keyword list and match arms disagree"),
            }
        }
        Ok((nodes, Stop::Eof))
    }

    /// Body of a `range`/`with` block with an optional plain `else`
    fn parse_body(&mut self, context: &str, line: usize) -> Result<(Vec<Node>, Vec<Node>), TemplateError> {
        let (body, stop) = self.parse_list()?;
        match stop {
            Stop::End => Ok((body, Vec::new())),
            Stop::Else { rest, line: else_line } => {
                if !rest.is_empty() {
                    return Err(self.error(else_line, format!("unexpected tokens after else in {}", context)));
                }
                let (otherwise, stop) = self.parse_list()?;
                self.expect_end(stop, context, line)?;
                Ok((body, otherwise))
            }
            Stop::Eof => Err(self.error(line, format!("unexpected EOF in {}", context))),
        }
    }

    fn parse_if(&mut self, condition: &[Token], line: usize) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = self.parse_pipeline(condition, line)?;
        loop {
            let (body, stop) = self.parse_list()?;
            branches.push((condition, body));
            match stop {
                Stop::End => {
                    return Ok(Node::If { branches, otherwise: Vec::new(), line });
                }
                Stop::Else { rest, line: else_line } => match rest.first() {
                    None => {
                        let (otherwise, stop) = self.parse_list()?;
                        self.expect_end(stop, "if", line)?;
                        return Ok(Node::If { branches, otherwise, line });
                    }
                    Some(Token::Ident(ident)) if ident == "if" => {
                        condition = self.parse_pipeline(&rest[1..], else_line)?;
                    }
                    Some(_) => {
                        return Err(self.error(else_line, "unexpected tokens after else"));
                    }
                },
                Stop::Eof => return Err(self.error(line, "unexpected EOF in if")),
            }
        }
    }

    fn expect_end(&self, stop: Stop, context: &str, line: usize) -> Result<(), TemplateError> {
        match stop {
            Stop::End => Ok(()),
            Stop::Else { line, .. } => Err(self.error(line, format!("expected end; found else in {}", context))),
            Stop::Eof => Err(self.error(line, format!("unexpected EOF in {}", context))),
        }
    }

    fn parse_pipeline(&self, tokens: &[Token], line: usize) -> Result<Pipeline, TemplateError> {
        let mut cursor = Cursor {
            parser: self,
            tokens,
            pos: 0,
            line,
        };
        let pipeline = cursor.pipeline(false)?;
        Ok(pipeline)
    }
}

struct Cursor<'p, 'a> {
    parser: &'p Parser<'a>,
    tokens: &'p [Token],
    pos: usize,
    line: usize,
}

impl Cursor<'_, '_> {
    fn error(&self, message: impl Into<String>) -> TemplateError {
        self.parser.error(self.line, message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn pipeline(&mut self, nested: bool) -> Result<Pipeline, TemplateError> {
        let mut commands = Vec::new();
        loop {
            commands.push(self.command()?);
            match self.peek() {
                Some(Token::Pipe) => self.pos += 1,
                Some(Token::RParen) if nested => {
                    self.pos += 1;
                    return Ok(Pipeline { commands });
                }
                Some(Token::RParen) => return Err(self.error("unexpected right paren")),
                None if nested => return Err(self.error("unclosed left paren")),
                None => return Ok(Pipeline { commands }),
                Some(other) => return Err(self.error(format!("unexpected {:?} in operand", other))),
            }
        }
    }

    fn command(&mut self) -> Result<Command, TemplateError> {
        let mut operands = Vec::new();
        while let Some(token) = self.peek() {
            if matches!(token, Token::Pipe | Token::RParen) {
                break;
            }
            let operand = self.operand()?;
            if let Operand::Func(name) = &operand {
                if !operands.is_empty() {
                    return Err(self.error(format!(
                        "function {} used as an argument; wrap the call in parentheses",
                        name
                    )));
                }
            }
            operands.push(operand);
        }

        match operands.first() {
            None => Err(self.error("missing value for command")),
            Some(first) if operands.len() > 1 && !first.is_callable() => {
                Err(self.error(format!("can't give argument to non-function {:?}", first)))
            }
            Some(_) => Ok(Command { operands }),
        }
    }

    fn operand(&mut self) -> Result<Operand, TemplateError> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error("missing operand"));
        };
        self.pos += 1;
        let operand = match token {
            Token::Dot => Operand::Dot,
            Token::Root => Operand::Root,
            Token::Field(name) => Operand::Field(name),
            Token::RootField(name) => Operand::RootField(name),
            Token::Str(value) => Operand::Str(value),
            Token::Int(value) => Operand::Int(value),
            Token::LParen => Operand::Sub(self.pipeline(true)?),
            Token::Ident(ident) => match ident.as_str() {
                "true" => Operand::Bool(true),
                "false" => Operand::Bool(false),
                "nil" => Operand::Nil,
                name if FUNCTIONS.contains(&name) => Operand::Func(name.to_string()),
                name if KEYWORDS.contains(&name) => {
                    return Err(self.error(format!("unexpected keyword {} in operand", name)))
                }
                name => return Err(self.error(format!("function {:?} not defined", name))),
            },
            Token::Pipe | Token::RParen => {
                return Err(self.error(format!("unexpected {:?} in operand", token)))
            }
        };
        Ok(operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::lex;

    fn parse_src(src: &str) -> Result<Vec<Node>, TemplateError> {
        parse("t", lex("t", src)?)
    }

    #[test]
    fn test_parse_method_call() {
        let nodes = parse_src(r#"name: {{ .Get "name" }}"#).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[1],
            Node::Action {
                pipeline: Pipeline {
                    commands: vec![Command {
                        operands: vec![
                            Operand::Field("Get".to_string()),
                            Operand::Str("name".to_string()),
                        ],
                    }],
                },
                line: 1,
            }
        );
    }

    #[test]
    fn test_parse_pipes_and_parens() {
        let nodes = parse_src(r#"{{ index (.GetMap "db") "host" | quote }}"#).unwrap();
        let Node::Action { pipeline, .. } = &nodes[0] else { panic!("expected action") };
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(pipeline.commands[0].operands.len(), 3);
        assert!(matches!(pipeline.commands[0].operands[1], Operand::Sub(_)));
        assert_eq!(pipeline.commands[1].operands, vec![Operand::Func("quote".to_string())]);
    }

    #[test]
    fn test_parse_if_else_chain() {
        let nodes = parse_src(r#"{{ if .Get "a" }}A{{ else if .Get "b" }}B{{ else }}C{{ end }}"#).unwrap();
        let Node::If { branches, otherwise, .. } = &nodes[0] else { panic!("expected if") };
        assert_eq!(branches.len(), 2);
        assert_eq!(otherwise, &vec![Node::Text("C".to_string())]);
    }

    #[test]
    fn test_parse_range_and_with() {
        let nodes = parse_src("{{ range .GetArray \"xs\" }}- {{ . }}\n{{ else }}none{{ end }}{{ with .GetMap \"m\" }}{{ .host }}{{ end }}").unwrap();
        assert!(matches!(&nodes[0], Node::Range { otherwise, .. } if otherwise.len() == 1));
        assert!(matches!(&nodes[1], Node::With { body, .. } if body.len() == 1));
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            "{{ end }}",
            "{{ else }}",
            "{{ if .Get \"a\" }}unterminated",
            "{{ range .GetArray \"a\" }}{{ else }}{{ else }}{{ end }}",
            "{{ }}",
            "{{ nosuchfunc \"a\" }}",
            "{{ \"lit\" \"arg\" }}",
            "{{ index . len }}",
            "{{ (.Get \"a\" }}",
            "{{ .Get \"a\") }}",
            "{{ .Get \"a\" | }}",
            "{{ end extra }}",
        ];
        for case in cases {
            let err = parse_src(case).unwrap_err();
            assert!(matches!(err, TemplateError::Parse { .. }), "case {:?} gave {:?}", case, err);
        }
    }
}
