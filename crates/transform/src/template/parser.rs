//! Template parser.
//!
//! Source is split into literal text and `{{ ... }}` actions, each action is
//! parsed with `nom`, and the flat sequence is then folded into a tree of
//! [`Node`]s by matching control actions with their `end`.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, recognize},
    error::ErrorKind,
    multi::many0,
    sequence::{delimited, preceded, tuple},
};
use serde_json::Value;

use super::{Command, Node, Operand, Pipeline};
use crate::error::TransformError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Identifiers that can never name a function.
const RESERVED: &[&str] = &["if", "else", "end", "range", "with", "true", "false", "null"];

enum Element {
    Text(String),
    Action(Action),
}

enum Action {
    Emit(Pipeline),
    If(Pipeline),
    ElseIf(Pipeline),
    Else,
    End,
    Range(Pipeline),
    With(Pipeline),
    Comment,
}

enum Terminator {
    Eof,
    ElseIf(Pipeline),
    Else,
    End,
}

/// Parse template source into its node tree.
pub(crate) fn parse_template(source: &str) -> Result<Vec<Node>, TransformError> {
    let mut elements = split(source)?.into_iter();
    let (nodes, terminator) = parse_block(&mut elements)?;
    match terminator {
        Terminator::Eof => Ok(nodes),
        Terminator::ElseIf(_) => Err(TransformError::Parse("unexpected {{else if}}".to_owned())),
        Terminator::Else => Err(TransformError::Parse("unexpected {{else}}".to_owned())),
        Terminator::End => Err(TransformError::Parse("unexpected {{end}}".to_owned())),
    }
}

// ---------------------------------------------------------------------------
// Splitting text from actions
// ---------------------------------------------------------------------------

fn split(source: &str) -> Result<Vec<Element>, TransformError> {
    let mut elements = Vec::new();
    let mut rest = source;
    let mut trim_leading = false;

    while let Some(start) = rest.find(OPEN) {
        let mut body = &rest[start + OPEN.len()..];
        let trim_trailing = has_left_trim_marker(body);
        if trim_trailing {
            body = &body[1..];
        }
        push_text(&mut elements, &rest[..start], trim_leading, trim_trailing);

        let end = find_close(body)
            .ok_or_else(|| TransformError::Parse("unclosed action".to_owned()))?;
        let mut action = &body[..end];
        rest = &body[end + CLOSE.len()..];

        trim_leading = has_right_trim_marker(action);
        if trim_leading {
            action = &action[..action.len() - 1];
        }
        elements.push(Element::Action(parse_action(action.trim())?));
    }
    push_text(&mut elements, rest, trim_leading, false);
    Ok(elements)
}

fn has_left_trim_marker(body: &str) -> bool {
    body.strip_prefix('-')
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

fn has_right_trim_marker(action: &str) -> bool {
    action
        .strip_suffix('-')
        .is_some_and(|rest| rest.ends_with(char::is_whitespace))
}

/// Whitespace-only text between actions is layout, not output.
fn push_text(elements: &mut Vec<Element>, text: &str, trim_leading: bool, trim_trailing: bool) {
    let mut text = text;
    if trim_leading {
        text = text.trim_start();
    }
    if trim_trailing {
        text = text.trim_end();
    }
    if !text.trim().is_empty() {
        elements.push(Element::Text(text.to_owned()));
    }
}

/// Offset of the closing delimiter, skipping over string literals.
fn find_close(body: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if body[i..].starts_with(CLOSE) {
            return Some(i);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

fn parse_action(body: &str) -> Result<Action, TransformError> {
    if body.starts_with("/*") && body.ends_with("*/") {
        return Ok(Action::Comment);
    }
    if body.is_empty() {
        return Err(TransformError::Parse("empty action".to_owned()));
    }
    let (rest, parsed) =
        action(body).map_err(|e| TransformError::Parse(format!("in action {body:?}: {e}")))?;
    let rest = rest.trim();
    if !rest.is_empty() {
        return Err(TransformError::Parse(format!(
            "unexpected {rest:?} in action {body:?}"
        )));
    }
    Ok(parsed)
}

fn action(input: &str) -> IResult<&str, Action> {
    alt((
        map(preceded(keyword("if"), pipeline), Action::If),
        map(
            preceded(tuple((keyword("else"), multispace1, keyword("if"))), pipeline),
            Action::ElseIf,
        ),
        map(keyword("else"), |_| Action::Else),
        map(keyword("end"), |_| Action::End),
        map(preceded(keyword("range"), pipeline), Action::Range),
        map(preceded(keyword("with"), pipeline), Action::With),
        map(pipeline, Action::Emit),
    ))(input)
}

/// Match `word` only when it is not the prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = tag(word)(input)?;
        if rest.chars().next().is_some_and(is_ident_char) {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                ErrorKind::Tag,
            )));
        }
        Ok((rest, matched))
    }
}

// ---------------------------------------------------------------------------
// Pipelines and commands
// ---------------------------------------------------------------------------

fn pipeline(input: &str) -> IResult<&str, Pipeline> {
    let (input, first) = command(input)?;
    let (input, rest) = many0(preceded(ws(char('|')), call))(input)?;
    let mut commands = Vec::with_capacity(rest.len() + 1);
    commands.push(first);
    commands.extend(rest);
    Ok((input, Pipeline { commands }))
}

fn command(input: &str) -> IResult<&str, Command> {
    let (input, _) = multispace0(input)?;
    alt((call, map(operand, Command::Operand)))(input)
}

/// `name arg arg ...`
fn call(input: &str) -> IResult<&str, Command> {
    let (input, _) = multispace0(input)?;
    let (input, name) = function_name(input)?;
    let (input, args) = many0(preceded(multispace1, operand))(input)?;
    Ok((
        input,
        Command::Call {
            name: name.to_owned(),
            args,
        },
    ))
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

// ---------------------------------------------------------------------------
// Operands
// ---------------------------------------------------------------------------

fn operand(input: &str) -> IResult<&str, Operand> {
    alt((
        map(dot_fields, Operand::Dot),
        map(preceded(char('$'), fields), Operand::Root),
        map(literal, Operand::Literal),
        sub_pipeline,
        map(function_name, |name| Operand::Function(name.to_owned())),
    ))(input)
}

/// `.` or `.a.b.0`
fn dot_fields(input: &str) -> IResult<&str, Vec<String>> {
    let (rest, _) = char('.')(input)?;
    let (rest, first) = opt(segment)(rest)?;
    let Some(first) = first else {
        return Ok((rest, Vec::new()));
    };
    let (rest, mut more) = fields(rest)?;
    more.insert(0, first.to_owned());
    Ok((rest, more))
}

/// Zero or more `.name` accessors.
fn fields(input: &str) -> IResult<&str, Vec<String>> {
    many0(map(preceded(char('.'), segment), |s: &str| s.to_owned()))(input)
}

fn segment(input: &str) -> IResult<&str, &str> {
    take_while1(is_ident_char)(input)
}

/// `( pipeline )` optionally followed by field accessors.
fn sub_pipeline(input: &str) -> IResult<&str, Operand> {
    let (input, inner) = delimited(char('('), pipeline, preceded(multispace0, char(')')))(input)?;
    let (input, fields) = fields(input)?;
    Ok((
        input,
        Operand::Sub {
            pipeline: Box::new(inner),
            fields,
        },
    ))
}

fn function_name(input: &str) -> IResult<&str, &str> {
    let (rest, name) = identifier(input)?;
    if RESERVED.contains(&name) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Tag,
        )));
    }
    Ok((rest, name))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    )))(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(keyword("null"), |_| Value::Null),
        map(keyword("true"), |_| Value::Bool(true)),
        map(keyword("false"), |_| Value::Bool(false)),
        number,
        map(string_literal, Value::String),
    ))(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
        opt(tuple((
            char('.'),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
    )))(input)?;

    let value = if text.contains('.') {
        text.parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    };
    match value {
        Some(value) => Ok((rest, value)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Digit,
        ))),
    }
}

/// A double-quoted string with `\n`, `\t`, `\\` and `\"` escapes.
fn string_literal(input: &str) -> IResult<&str, String> {
    let (body, _) = char('"')(input)?;
    let mut result = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[i + 1..], result)),
            '\\' => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, '"')) => result.push('"'),
                Some((_, other)) => {
                    result.push('\\');
                    result.push(other);
                }
                None => break,
            },
            other => result.push(other),
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        ErrorKind::Char,
    )))
}

// ---------------------------------------------------------------------------
// Tree building
// ---------------------------------------------------------------------------

type Elements = std::vec::IntoIter<Element>;

/// Collect nodes until a control action closes the current block.
fn parse_block(elements: &mut Elements) -> Result<(Vec<Node>, Terminator), TransformError> {
    let mut nodes = Vec::new();
    while let Some(element) = elements.next() {
        let action = match element {
            Element::Text(text) => {
                nodes.push(Node::Text(text));
                continue;
            }
            Element::Action(action) => action,
        };
        match action {
            Action::Comment => {}
            Action::Emit(pipeline) => nodes.push(Node::Emit(pipeline)),
            Action::If(condition) => nodes.push(parse_if(condition, elements)?),
            Action::Range(pipeline) => {
                let (body, otherwise) = parse_body("range", elements)?;
                nodes.push(Node::Range {
                    pipeline,
                    body,
                    otherwise,
                });
            }
            Action::With(pipeline) => {
                let (body, otherwise) = parse_body("with", elements)?;
                nodes.push(Node::With {
                    pipeline,
                    body,
                    otherwise,
                });
            }
            Action::ElseIf(pipeline) => return Ok((nodes, Terminator::ElseIf(pipeline))),
            Action::Else => return Ok((nodes, Terminator::Else)),
            Action::End => return Ok((nodes, Terminator::End)),
        }
    }
    Ok((nodes, Terminator::Eof))
}

fn parse_if(mut condition: Pipeline, elements: &mut Elements) -> Result<Node, TransformError> {
    let mut branches = Vec::new();
    loop {
        let (body, terminator) = parse_block(elements)?;
        branches.push((condition, body));
        match terminator {
            Terminator::ElseIf(next) => condition = next,
            Terminator::Else => {
                let (otherwise, terminator) = parse_block(elements)?;
                expect_end("if", terminator)?;
                return Ok(Node::If {
                    branches,
                    otherwise,
                });
            }
            Terminator::End => {
                return Ok(Node::If {
                    branches,
                    otherwise: Vec::new(),
                });
            }
            Terminator::Eof => return Err(unclosed("if")),
        }
    }
}

/// Body and optional `else` branch of `range` / `with`.
fn parse_body(
    keyword: &str,
    elements: &mut Elements,
) -> Result<(Vec<Node>, Vec<Node>), TransformError> {
    let (body, terminator) = parse_block(elements)?;
    match terminator {
        Terminator::End => Ok((body, Vec::new())),
        Terminator::Else => {
            let (otherwise, terminator) = parse_block(elements)?;
            expect_end(keyword, terminator)?;
            Ok((body, otherwise))
        }
        Terminator::ElseIf(_) => Err(TransformError::Parse(format!(
            "unexpected else if in {keyword}"
        ))),
        Terminator::Eof => Err(unclosed(keyword)),
    }
}

fn expect_end(keyword: &str, terminator: Terminator) -> Result<(), TransformError> {
    match terminator {
        Terminator::End => Ok(()),
        Terminator::Eof => Err(unclosed(keyword)),
        Terminator::Else | Terminator::ElseIf(_) => Err(TransformError::Parse(format!(
            "unexpected else after else in {keyword}"
        ))),
    }
}

fn unclosed(keyword: &str) -> TransformError {
    TransformError::Parse(format!("unclosed {keyword}: missing {{{{end}}}}"))
}
