//! Layout parser
//!
//! Turns lexer items into a node tree. Function names are checked against
//! the registry here, so an unknown function is a syntax error raised before
//! any record is bound.

use serde_json::{Number, Value};

use crate::error::{RenderError, RenderResult};
use crate::funcs::Functions;
use crate::lexer::Item;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Output(Pipeline),
    If {
        cond: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    With {
        value: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        value: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// Commands joined by `|`; each stage receives the previous result as its last argument
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Call { name: String, args: Vec<Operand> },
    Operand(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// `.A.B` relative to dot; empty path is dot itself
    Field(Vec<String>),
    /// `$.A.B` relative to the root record
    Root(Vec<String>),
    Literal(Value),
    Nested(Box<Pipeline>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Root(Vec<String>),
    Ident(String),
    Literal(Value),
    Pipe,
    LParen,
    RParen,
}

const UNSUPPORTED_KEYWORDS: &[&str] = &["define", "template", "block", "break", "continue"];

/// How a nested list ended
enum Stop {
    Eof,
    End,
    Else,
    ElseIf(Pipeline),
}

pub(crate) fn parse(items: Vec<Item>, functions: &Functions) -> RenderResult<Vec<Node>> {
    let mut parser = Parser {
        items: items.into_iter(),
        functions,
        line: 1,
    };

    let (nodes, stop) = parser.parse_list()?;
    match stop {
        Stop::Eof => Ok(nodes),
        Stop::End => Err(RenderError::syntax(parser.line, "unexpected {{end}}")),
        Stop::Else | Stop::ElseIf(_) => {
            Err(RenderError::syntax(parser.line, "unexpected {{else}}"))
        }
    }
}

struct Parser<'f> {
    items: std::vec::IntoIter<Item>,
    functions: &'f Functions,
    /// Line of the action being parsed, for error messages
    line: usize,
}

impl Parser<'_> {
    fn parse_list(&mut self) -> RenderResult<(Vec<Node>, Stop)> {
        let mut nodes = Vec::new();

        while let Some(item) = self.items.next() {
            let (body, line) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { body, line } => (body, line),
            };
            self.line = line;

            let tokens = tokenize(&body, line)?;
            let keyword = match tokens.first() {
                Some(Token::Ident(name)) => name.as_str(),
                _ => "",
            };

            match keyword {
                "end" => {
                    if tokens.len() > 1 {
                        return Err(RenderError::syntax(line, "unexpected arguments to {{end}}"));
                    }
                    return Ok((nodes, Stop::End));
                }
                "else" => {
                    return match tokens.get(1) {
                        None => Ok((nodes, Stop::Else)),
                        Some(Token::Ident(kw)) if kw == "if" => {
                            let cond = self.pipeline(&tokens[2..], line)?;
                            Ok((nodes, Stop::ElseIf(cond)))
                        }
                        Some(_) => Err(RenderError::syntax(line, "unexpected arguments to {{else}}")),
                    };
                }
                "if" => {
                    let cond = self.pipeline(&tokens[1..], line)?;
                    nodes.push(self.parse_if(cond, line)?);
                }
                "with" => {
                    let value = self.pipeline(&tokens[1..], line)?;
                    let (then, otherwise) = self.parse_branches("with", line, false)?;
                    nodes.push(Node::With {
                        value,
                        then,
                        otherwise,
                    });
                }
                "range" => {
                    let value = self.pipeline(&tokens[1..], line)?;
                    let (body, otherwise) = self.parse_branches("range", line, false)?;
                    nodes.push(Node::Range {
                        value,
                        body,
                        otherwise,
                    });
                }
                kw if UNSUPPORTED_KEYWORDS.contains(&kw) => {
                    return Err(RenderError::syntax(line, format!("{{{{{kw}}}}} is not supported")));
                }
                _ => nodes.push(Node::Output(self.pipeline(&tokens, line)?)),
            }
        }

        Ok((nodes, Stop::Eof))
    }

    fn parse_if(&mut self, cond: Pipeline, line: usize) -> RenderResult<Node> {
        let (then, otherwise) = self.parse_branches("if", line, true)?;
        Ok(Node::If {
            cond,
            then,
            otherwise,
        })
    }

    /// Parses the body of a block up to its `{{end}}`, with an optional `{{else}}` branch
    fn parse_branches(
        &mut self,
        keyword: &str,
        line: usize,
        allow_else_if: bool,
    ) -> RenderResult<(Vec<Node>, Vec<Node>)> {
        let (then, stop) = self.parse_list()?;
        match stop {
            Stop::End => Ok((then, Vec::new())),
            Stop::Else => {
                let (otherwise, stop) = self.parse_list()?;
                match stop {
                    Stop::End => Ok((then, otherwise)),
                    Stop::Eof => Err(missing_end(keyword, line)),
                    Stop::Else | Stop::ElseIf(_) => Err(RenderError::syntax(
                        self.line,
                        format!("{{{{{keyword}}}}} has more than one {{{{else}}}}"),
                    )),
                }
            }
            Stop::ElseIf(cond) if allow_else_if => {
                // the nested if consumes the shared {{end}}
                let nested = self.parse_if(cond, self.line)?;
                Ok((then, vec![nested]))
            }
            Stop::ElseIf(_) => Err(RenderError::syntax(
                self.line,
                format!("{{{{else if}}}} is not allowed in {{{{{keyword}}}}}"),
            )),
            Stop::Eof => Err(missing_end(keyword, line)),
        }
    }

    fn pipeline(&self, tokens: &[Token], line: usize) -> RenderResult<Pipeline> {
        let mut stream = TokenStream {
            tokens,
            pos: 0,
            line,
            functions: self.functions,
        };
        let pipeline = stream.pipeline()?;
        if let Some(token) = stream.peek() {
            return Err(RenderError::syntax(line, format!("unexpected {token:?} in action")));
        }
        Ok(pipeline)
    }
}

fn missing_end(keyword: &str, line: usize) -> RenderError {
    RenderError::syntax(
        line,
        format!("missing {{{{end}}}} for {{{{{keyword}}}}} started here"),
    )
}

struct TokenStream<'t, 'f> {
    tokens: &'t [Token],
    pos: usize,
    line: usize,
    functions: &'f Functions,
}

impl TokenStream<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn at_stage_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Pipe) | Some(Token::RParen))
    }

    fn pipeline(&mut self) -> RenderResult<Pipeline> {
        let mut commands = Vec::new();
        loop {
            if self.at_stage_end() {
                return Err(RenderError::syntax(self.line, "missing value for command"));
            }
            let command = self.command()?;
            if !commands.is_empty() && matches!(command, Command::Operand(_)) {
                return Err(RenderError::syntax(
                    self.line,
                    format!("non executable command in pipeline stage {}", commands.len() + 1),
                ));
            }
            commands.push(command);

            if matches!(self.peek(), Some(Token::Pipe)) {
                self.pos += 1;
            } else {
                return Ok(Pipeline { commands });
            }
        }
    }

    fn command(&mut self) -> RenderResult<Command> {
        if let Some(Token::Ident(name)) = self.peek() {
            let name = name.clone();
            self.check_function(&name)?;
            self.pos += 1;

            let mut args = Vec::new();
            while !self.at_stage_end() {
                args.push(self.operand()?);
            }
            return Ok(Command::Call { name, args });
        }

        let operand = self.operand()?;
        if !self.at_stage_end() {
            return Err(RenderError::syntax(
                self.line,
                "can't give argument to non-function",
            ));
        }
        Ok(Command::Operand(operand))
    }

    fn operand(&mut self) -> RenderResult<Operand> {
        let line = self.line;
        let token = self
            .next()
            .cloned()
            .ok_or_else(|| RenderError::syntax(line, "missing operand"))?;

        match token {
            Token::Field(path) => Ok(Operand::Field(path)),
            Token::Root(path) => Ok(Operand::Root(path)),
            Token::Literal(value) => Ok(Operand::Literal(value)),
            Token::Ident(name) => {
                // niladic call used as an argument
                self.check_function(&name)?;
                Ok(Operand::Nested(Box::new(Pipeline {
                    commands: vec![Command::Call {
                        name,
                        args: Vec::new(),
                    }],
                })))
            }
            Token::LParen => {
                let inner = self.pipeline()?;
                match self.next() {
                    Some(Token::RParen) => Ok(Operand::Nested(Box::new(inner))),
                    _ => Err(RenderError::syntax(line, "unclosed left paren")),
                }
            }
            Token::Pipe | Token::RParen => {
                Err(RenderError::syntax(line, format!("unexpected {token:?}")))
            }
        }
    }

    fn check_function(&self, name: &str) -> RenderResult<()> {
        if self.functions.contains(name) {
            Ok(())
        } else {
            Err(RenderError::syntax(
                self.line,
                format!("function \"{name}\" not defined"),
            ))
        }
    }
}

fn tokenize(body: &str, line: usize) -> RenderResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '.' if !next_is_digit(&body[start + 1..]) => {
                tokens.push(Token::Field(field_path(body, &mut chars, line)?));
            }
            '$' => {
                chars.next();
                let path = if matches!(chars.peek(), Some((_, '.'))) {
                    field_path(body, &mut chars, line)?
                } else {
                    Vec::new()
                };
                if matches!(chars.peek(), Some((_, c)) if is_ident_char(*c)) {
                    return Err(RenderError::syntax(line, "template variables are not supported"));
                }
                tokens.push(Token::Root(path));
            }
            '"' => {
                chars.next();
                tokens.push(Token::Literal(Value::String(quoted(&mut chars, line)?)));
            }
            '`' => {
                chars.next();
                let mut raw = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) => break,
                        Some((_, c)) => raw.push(c),
                        None => return Err(RenderError::syntax(line, "unterminated raw quoted string")),
                    }
                }
                tokens.push(Token::Literal(Value::String(raw)));
            }
            c if c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && next_is_digit(&body[start + 1..])) => {
                let mut end = start + c.len_utf8();
                chars.next();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '.' || c == '_' || ((c == '-' || c == '+') && body[..i].ends_with(['e', 'E'])) {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Literal(Value::Number(number(&body[start..end], line)?)));
            }
            c if is_ident_start(c) => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if is_ident_char(c) {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &body[start..end];
                tokens.push(match word {
                    "true" => Token::Literal(Value::Bool(true)),
                    "false" => Token::Literal(Value::Bool(false)),
                    "nil" => Token::Literal(Value::Null),
                    _ => Token::Ident(word.to_string()),
                });
            }
            other => {
                return Err(RenderError::syntax(
                    line,
                    format!("unexpected character {other:?} in action"),
                ));
            }
        }
    }

    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

/// Reads `.A.B.C`; a lone `.` yields an empty path
fn field_path(body: &str, chars: &mut Chars<'_>, line: usize) -> RenderResult<Vec<String>> {
    let mut path = Vec::new();

    while let Some(&(_, '.')) = chars.peek() {
        chars.next();
        let start = match chars.peek() {
            Some(&(i, c)) if is_ident_start(c) => i,
            _ if path.is_empty() => return Ok(path),
            _ => return Err(RenderError::syntax(line, "bad field name after '.'")),
        };
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if is_ident_char(c) {
                end = i + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        path.push(body[start..end].to_string());
    }

    Ok(path)
}

fn quoted(chars: &mut Chars<'_>, line: usize) -> RenderResult<String> {
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => return Ok(out),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, other)) => {
                    return Err(RenderError::syntax(
                        line,
                        format!("unknown escape sequence \\{other}"),
                    ));
                }
                None => return Err(RenderError::syntax(line, "unterminated quoted string")),
            },
            Some((_, c)) => out.push(c),
            None => return Err(RenderError::syntax(line, "unterminated quoted string")),
        }
    }
}

fn number(text: &str, line: usize) -> RenderResult<Number> {
    let bad = || RenderError::syntax(line, format!("bad number syntax: {text:?}"));

    if let Ok(int) = text.parse::<i64>() {
        return Ok(Number::from(int));
    }
    let float = text.parse::<f64>().map_err(|_| bad())?;
    Number::from_f64(float).ok_or_else(bad)
}

fn next_is_digit(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
