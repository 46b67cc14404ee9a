//! Tokenization for calculator input lines.
//!
//! The grammar is deliberately small and deterministic: input splits on
//! Unicode whitespace, and a token whose entire lexeme parses as an `f64`
//! literal is a number; anything else is a word (a command name or a
//! command argument). Blank input lexes to an empty token list.

use nom::{
    bytes::complete::take_till1,
    character::complete::multispace0,
    combinator::all_consuming,
    multi::many0,
    sequence::{preceded, terminated},
    IResult,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal, pushed onto the operand stack.
    Number(f64),
    /// A command name or argument.
    Word(String),
}

#[derive(Error, Debug)]
pub enum LexError {
    #[error("tokenize error: {0}")]
    Parse(String),
}

fn token(input: &str) -> IResult<&str, Token> {
    let (rest, lexeme) = take_till1(char::is_whitespace)(input)?;
    let token = match lexeme.parse::<f64>() {
        Ok(n) => Token::Number(n),
        Err(_) => Token::Word(lexeme.to_string()),
    };
    Ok((rest, token))
}

/// Tokenize one input line.
pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    let (_, tokens) = all_consuming(preceded(
        multispace0,
        many0(terminated(token, multispace0)),
    ))(input)
    .map_err(|e: nom::Err<nom::error::Error<&str>>| LexError::Parse(e.to_string()))?;
    Ok(tokens)
}
