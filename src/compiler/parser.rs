/*!

  A recursive descent parser over the token stream. The grammar is:
    ```text
    <program>    ::= <statement>*
    <statement>  ::= <identifier> ':'
                   | 'push' <operand>
                   | 'pop' <operand>
                   | 'mov' <operand> ',' <operand>
                   | 'jmp' <identifier>
                   | 'entry' <identifier>
                   | 'add' | 'sub' | 'mul' | 'div' | 'jmpi' | 'syscall'
    <operand>    ::= <integer> | <register> | <identifier>
    ```
  Statements need not be on separate lines; the grammar is unambiguous without line breaks.
  Operand kinds are not checked here: `mov 5, v0` parses, and the generator rejects it.

*/

use std::iter::Peekable;
use std::vec::IntoIter;

use string_cache::DefaultAtom;

use super::ast::{ArithmeticOperator, Operand, Program, Statement};
use super::lexer::{Keyword, Token, TokenKind};
use crate::error::{CompileError, Location};

struct Parser {
  tokens : Peekable<IntoIter<Token>>,
  /// Where the most recently consumed token was, for errors at the end of input.
  last   : Option<Location>,
}

/// Parses a complete program. The first malformed statement aborts parsing.
pub fn parse(tokens: Vec<Token>) -> Result<Program, CompileError> {
  let mut parser = Parser {
    tokens : tokens.into_iter().peekable(),
    last   : None,
  };

  let mut statements = Vec::new();
  while parser.tokens.peek().is_some() {
    statements.push(parser.parse_statement()?);
  }

  Ok(Program { statements })
}

impl Parser {

  fn next(&mut self) -> Option<Token> {
    let token = self.tokens.next();
    if let Some(token) = &token {
      self.last = Some(token.location.clone());
    }
    token
  }

  fn unexpected(&self, expected: &str, found: Option<&Token>) -> CompileError {
    match found {
      Some(token) => CompileError::Syntax {
        location : token.location.clone(),
        message  : format!("expected {}, but got `{}`", expected, token.text)
      },

      None => CompileError::Syntax {
        location : self.last.clone().unwrap_or_else(|| Location::new(&DefaultAtom::from(""), 1, 1)),
        message  : format!("expected {}, but reached the end of input", expected)
      }
    }
  }

  /// Consumes a token of kind `kind` or fails naming `expected`.
  fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, CompileError> {
    match self.next() {
      Some(token) if token.kind == kind => Ok(token),
      other                             => Err(self.unexpected(expected, other.as_ref()))
    }
  }

  fn parse_statement(&mut self) -> Result<Statement, CompileError> {
    let token =
      match self.next() {
        Some(token) => token,
        None        => return Err(self.unexpected("statement", None))
      };
    let location = token.location.clone();

    let keyword =
      match token.kind {
        TokenKind::Keyword(keyword) => keyword,

        TokenKind::Identifier => {
          self.expect(TokenKind::Colon, "`:` after label name")?;
          return Ok(Statement::Label { name: DefaultAtom::from(token.text), location });
        }

        _ => return Err(self.unexpected("statement", Some(&token)))
      };

    let statement =
      match keyword {
        Keyword::Push => Statement::Push { operand: self.parse_operand()?, location },

        Keyword::Pop => Statement::Pop { register: self.parse_operand()?, location },

        Keyword::Mov => {
          let target = self.parse_operand()?;
          self.expect(TokenKind::Comma, "`,`")?;
          let value = self.parse_operand()?;
          Statement::Mov { target, value, location }
        }

        Keyword::Jmp => {
          let target = self.expect(TokenKind::Identifier, "label name")?;
          Statement::Jump { target: DefaultAtom::from(target.text), location }
        }

        Keyword::Entry => {
          let label = self.expect(TokenKind::Identifier, "label name")?;
          Statement::Entry { label: DefaultAtom::from(label.text), location }
        }

        Keyword::Add     => Statement::Arithmetic { operator: ArithmeticOperator::Add, location },
        Keyword::Sub     => Statement::Arithmetic { operator: ArithmeticOperator::Sub, location },
        Keyword::Mul     => Statement::Arithmetic { operator: ArithmeticOperator::Mul, location },
        Keyword::Div     => Statement::Arithmetic { operator: ArithmeticOperator::Div, location },
        Keyword::Jmpi    => Statement::JumpIndirect { location },
        Keyword::Syscall => Statement::Syscall { location },
      };

    Ok(statement)
  }

  fn parse_operand(&mut self) -> Result<Operand, CompileError> {
    let token = self.next();

    match token {
      Some(Token { kind: TokenKind::Integer, text, location }) => {
        Ok(Operand::Integer { text, location })
      }

      Some(Token { kind: TokenKind::Register, text, location }) => {
        Ok(Operand::Register { name: DefaultAtom::from(text), location })
      }

      Some(Token { kind: TokenKind::Identifier, text, location }) => {
        Ok(Operand::Identifier { name: DefaultAtom::from(text), location })
      }

      other => Err(self.unexpected("operand", other.as_ref()))
    }
  }
}
