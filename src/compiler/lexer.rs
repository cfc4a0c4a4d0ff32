/*!

  The tokenizer turns assembly source into a flat sequence of located tokens. The language is
  line oriented, and within a line the lexical forms are:
    ```text
    <word>       ::= [A-Za-z_] [A-Za-z0-9_]*       keyword, register, or identifier
    <integer>    ::= '-'? [0-9]+
    <character>  ::= '\'' ( [^\\'] | '\\' [nt0\\'] ) '\''
    <comment>    ::= ';' .*                        to the end of the line
    ```
  plus the punctuation `,` and `:`. A character literal becomes an integer token holding its
  code point. Whitespace and comments are ignored.

*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::tag,
  character::complete::{
    alpha1,
    alphanumeric1,
    char as one_char,
    digit1,
    none_of,
    space0
  },
  combinator::{map, opt, recognize, rest, value},
  multi::many0_count,
  sequence::{delimited, pair, preceded},
  IResult
};
use string_cache::DefaultAtom;
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::error::{CompileError, Location};
use crate::register::looks_like_register;

#[derive(StrumDisplay, EnumString, IntoStaticStr, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
  Push,
  Pop,
  Mov,
  Syscall,
  Add,
  Sub,
  Mul,
  Div,
  Jmp,
  Jmpi,
  Entry,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum TokenKind {
  Keyword(Keyword),
  Register,
  Identifier,
  Integer,
  Comma,
  Colon,
}

impl Display for TokenKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      TokenKind::Keyword(keyword) => write!(f, "`{}`", keyword),
      TokenKind::Register         => write!(f, "register"),
      TokenKind::Identifier       => write!(f, "identifier"),
      TokenKind::Integer          => write!(f, "integer literal"),
      TokenKind::Comma            => write!(f, "`,`"),
      TokenKind::Colon            => write!(f, "`:`"),
    }
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
  pub kind     : TokenKind,
  pub location : Location,
  /// The source text, except for character literals, which hold their decimal value.
  pub text     : String,
}

impl Display for Token {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "Token({}, {}, `{}`)", self.kind, self.location, self.text)
  }
}

/// Tokenizes `source`. `file` is only used to label token locations.
pub fn tokenize(source: &str, file: &str) -> Result<Vec<Token>, CompileError> {
  let file = DefaultAtom::from(file);
  let mut tokens = Vec::new();

  for (line_index, line) in source.lines().enumerate() {
    let mut input = skip(line);

    while !input.is_empty() {
      let column   = line[..line.len() - input.len()].chars().count() + 1;
      let location = Location::new(&file, line_index + 1, column);

      match ptoken(input) {
        Ok((remaining, (kind, text))) => {
          tokens.push(Token { kind, location, text });
          input = skip(remaining);
        }

        Err(_) => {
          let message =
            match input.starts_with('\'') {
              true  => "malformed character literal".to_string(),
              false => format!("invalid token `{}`", input.chars().next().unwrap_or(' ')),
            };
          return Err(CompileError::Syntax { location, message });
        }
      }
    }
  }

  Ok(tokens)
}

/// Skips whitespace and a trailing comment.
fn skip(input: &str) -> &str {
  match pskip(input) {
    Ok((remaining, _)) => remaining,
    Err(_)             => input
  }
}

fn pskip(i: &str) -> IResult<&str, ()> {
  value((), pair(space0, opt(preceded(one_char(';'), rest))))(i)
}

fn ptoken(i: &str) -> IResult<&str, (TokenKind, String)> {
  alt((
    map(pinteger, |text: &str| (TokenKind::Integer, text.to_string())),
    map(pcharacter, |c: char| (TokenKind::Integer, (c as u32).to_string())),
    map(pword, classify_word),
    value((TokenKind::Comma, ",".to_string()), one_char(',')),
    value((TokenKind::Colon, ":".to_string()), one_char(':')),
  ))(i)
}

/// <integer> ::= '-'? [0-9]+
fn pinteger(i: &str) -> IResult<&str, &str> {
  recognize(pair(opt(one_char('-')), digit1))(i)
}

/// <character> ::= '\'' ( [^\\'] | '\\' [nt0\\'] ) '\''
fn pcharacter(i: &str) -> IResult<&str, char> {
  delimited(
    one_char('\''),
    alt((
      preceded(
        one_char('\\'),
        alt((
          value('\n', one_char('n')),
          value('\t', one_char('t')),
          value('\0', one_char('0')),
          value('\\', one_char('\\')),
          value('\'', one_char('\'')),
        ))
      ),
      none_of("\\'")
    )),
    one_char('\'')
  )(i)
}

/// <word> ::= [A-Za-z_] [A-Za-z0-9_]*
fn pword(i: &str) -> IResult<&str, &str> {
  recognize(
    pair(
      alt((alpha1, tag("_"))),
      many0_count(alt((alphanumeric1, tag("_"))))
    )
  )(i)
}

fn classify_word(word: &str) -> (TokenKind, String) {
  let kind =
    match Keyword::from_str(word) {
      Ok(keyword)                          => TokenKind::Keyword(keyword),
      Err(_) if looks_like_register(word) => TokenKind::Register,
      Err(_)                               => TokenKind::Identifier,
    };
  (kind, word.to_string())
}
