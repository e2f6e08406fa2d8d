/*!
  Parsers for the fields of a MIXAL line.

  A line is split on whitespace into `LOC OP ADDRESS`, and whatever follows the address is a
  comment. The address field has the grammar

  ```text
  address   := a-part [ "," expression ] [ "(" expression ")" ]
  a-part    := "=" w-value "=" | expression | <empty>
  w-value   := expression [ "(" expression ")" ] { "," expression [ "(" expression ")" ] }
  expression:= [ "+" | "-" ] atom { operator atom }
  operator  := "+" | "-" | "*" | "/" | "//" | ":"
  atom      := number | symbol | "*"
  ```

  Numbers and symbols are both runs of letters and digits; a run without a letter is a number.
  That classification never fails, so there is no backtracking between the two.
*/

use nom::{
  branch::alt,
  bytes::complete::tag,
  character::complete::{alphanumeric1, char as one_char, one_of},
  combinator::{all_consuming, map, map_res, opt},
  multi::{many0, separated_nonempty_list},
  sequence::{delimited, pair, preceded, tuple},
  IResult
};

use crate::error::AssemblyError;

/// Symbols are at most this many characters long.
pub const MAX_SYMBOL_LENGTH: usize = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Atom<'a> {
  Number(i64),
  Symbol(&'a str),
  /// `*`, the location counter.
  Here
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOperator {
  Add,
  Subtract,
  Multiply,
  Divide,
  /// `a//b` is `(a * 64^5) / b`.
  FractionDivide,
  /// `a:b` is `8a + b`.
  Field
}

/// Evaluated strictly left to right. There is no precedence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Expression<'a> {
  pub negative : bool,
  pub first    : Atom<'a>,
  pub rest     : Vec<(BinaryOperator, Atom<'a>)>
}

impl<'a> Expression<'a> {
  /// The symbol and its sign, if the expression is a single, possibly signed, symbol. Only such
  /// expressions may refer to a symbol that is not defined yet.
  pub fn lone_symbol(&self) -> Option<(&'a str, bool)> {
    match (&self.first, self.rest.is_empty()) {
      (Atom::Symbol(name), true) => Some((name, self.negative)),
      _                          => None
    }
  }
}

/// One part `E(F)` of a W-value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WPart<'a> {
  pub value : Expression<'a>,
  pub field : Option<Expression<'a>>
}

pub type WValue<'a> = Vec<WPart<'a>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressPart<'a> {
  Empty,
  Expression(Expression<'a>),
  /// `=W=`, a literal constant.
  Literal(WValue<'a>)
}

/// The parsed address field of an instruction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operand<'a> {
  pub address : AddressPart<'a>,
  pub index   : Option<Expression<'a>>,
  pub field   : Option<Expression<'a>>
}

/// The fields of a source line. `operand` is the address field; `rest` is everything after the
/// operation, untouched, which `ALF` needs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Line<'a> {
  pub label     : Option<&'a str>,
  pub operation : &'a str,
  pub operand   : &'a str,
  pub rest      : &'a str
}

// region Line fields

/// Whole-line comments and blank lines.
pub fn is_comment(text: &str) -> bool {
  text.starts_with('*') || text.trim().is_empty()
}

fn next_token(text: &str) -> (&str, &str) {
  let text = text.trim_start();
  match text.find(char::is_whitespace) {
    Some(end) => (&text[..end], &text[end..]),
    None      => (text, "")
  }
}

/// Splits a line that is not a comment. A label is present iff the line does not start with
/// whitespace.
pub fn split_line(text: &str) -> Result<Line, AssemblyError> {
  let (label, text) = match text.starts_with(char::is_whitespace) {
    true  => (None, text),
    false => {
      let (label, text) = next_token(text);
      check_symbol(label)?;
      (Some(label), text)
    }
  };

  let (operation, rest) = next_token(text);
  if operation.is_empty() {
    return Err(AssemblyError::Syntax("missing operation".to_string()));
  }
  let (operand, _comment) = next_token(rest);

  Ok(Line{ label, operation, operand, rest })
}

/// A symbol is one to ten letters and digits, at least one of which is a letter.
pub fn check_symbol(text: &str) -> Result<(), AssemblyError> {
  let letters_and_digits = !text.is_empty() && text.bytes().all(|b| b.is_ascii_alphanumeric());
  match letters_and_digits && text.bytes().any(|b| b.is_ascii_alphabetic()) {
    true if text.len() > MAX_SYMBOL_LENGTH => {
      Err(AssemblyError::Syntax(
        format!("symbol `{}` is longer than {} characters", text, MAX_SYMBOL_LENGTH)
      ))
    }
    true  => Ok(()),
    false => Err(AssemblyError::Syntax(format!("`{}` is not a symbol", text)))
  }
}

/**
  The five characters of an `ALF` line. They begin after two blanks following the operation, or
  after one blank if the next character is not a blank. Short text is padded with blanks.
*/
pub fn alf_text(rest: &str) -> String {
  let mut chars = rest.chars();
  let text =
    match (rest.starts_with("  "), rest.starts_with(char::is_whitespace)) {
      (true, _)      => &rest[2..],
      // The blank may be more than one byte long.
      (false, true)  => {
        chars.next();
        chars.as_str()
      }
      (false, false) => rest
    };
  let mut characters: String = text.chars().take(5).collect();
  while characters.chars().count() < 5 {
    characters.push(' ');
  }
  characters
}

// endregion

// region Expressions

fn classify(token: &str) -> Result<Atom, std::num::ParseIntError> {
  match token.bytes().all(|b| b.is_ascii_digit()) {
    true  => token.parse::<i64>().map(Atom::Number),
    false => Ok(Atom::Symbol(token))
  }
}

fn atom(input: &str) -> IResult<&str, Atom> {
  alt((
    map(one_char('*'), |_| Atom::Here),
    map_res(alphanumeric1, classify)
  ))(input)
}

fn binary_operator(input: &str) -> IResult<&str, BinaryOperator> {
  alt((
    map(tag("//"), |_| BinaryOperator::FractionDivide),
    map(one_of("+-*/:"), |c| match c {
      '+' => BinaryOperator::Add,
      '-' => BinaryOperator::Subtract,
      '*' => BinaryOperator::Multiply,
      '/' => BinaryOperator::Divide,
      _   => BinaryOperator::Field
    })
  ))(input)
}

pub fn expression(input: &str) -> IResult<&str, Expression> {
  map(
    tuple((opt(one_of("+-")), atom, many0(pair(binary_operator, atom)))),
    |(sign, first, rest)| Expression{ negative: sign == Some('-'), first, rest }
  )(input)
}

fn field_part(input: &str) -> IResult<&str, Expression> {
  delimited(one_char('('), expression, one_char(')'))(input)
}

fn w_part(input: &str) -> IResult<&str, WPart> {
  map(
    pair(expression, opt(field_part)),
    |(value, field)| WPart{ value, field }
  )(input)
}

fn w_value(input: &str) -> IResult<&str, WValue> {
  separated_nonempty_list(one_char(','), w_part)(input)
}

fn address_part(input: &str) -> IResult<&str, AddressPart> {
  alt((
    map(delimited(one_char('='), w_value, one_char('=')), AddressPart::Literal),
    map(expression, AddressPart::Expression)
  ))(input)
}

fn operand(input: &str) -> IResult<&str, Operand> {
  map(
    tuple((
      opt(address_part),
      opt(preceded(one_char(','), expression)),
      opt(field_part)
    )),
    |(address, index, field)| Operand{
      address: address.unwrap_or(AddressPart::Empty),
      index,
      field
    }
  )(input)
}

// endregion

/// Parses the address field of an instruction. The whole text must be consumed.
pub fn parse_operand(text: &str) -> Result<Operand, AssemblyError> {
  all_consuming(operand)(text)
    .map(|(_, parsed)| parsed)
    .map_err(|_| AssemblyError::Syntax(format!("malformed address field `{}`", text)))
}

/// Parses the W-value of `CON`, `EQU`, `ORIG` or `END`. An empty field is the value zero.
pub fn parse_w_value(text: &str) -> Result<WValue, AssemblyError> {
  if text.is_empty() {
    return Ok(Vec::new());
  }
  all_consuming(w_value)(text)
    .map(|(_, parsed)| parsed)
    .map_err(|_| AssemblyError::Syntax(format!("malformed W-value `{}`", text)))
}


#[cfg(test)]
mod tests {
  use super::*;

  fn number(n: i64) -> Expression<'static> {
    Expression{ negative: false, first: Atom::Number(n), rest: vec![] }
  }

  #[test]
  fn lines(){
    let line = split_line("LOOP  LDA  2000,2(1:3)  load it").unwrap();
    assert_eq!(line.label, Some("LOOP"));
    assert_eq!(line.operation, "LDA");
    assert_eq!(line.operand, "2000,2(1:3)");

    let line = split_line("\tHLT").unwrap();
    assert_eq!(line.label, None);
    assert_eq!(line.operand, "");

    assert!(is_comment("* a comment"));
    assert!(is_comment("   "));
    assert!(!is_comment(" LDA 0"));
    assert!(split_line("LOOP").is_err());
    assert!(split_line("12 NOP").is_err());
    assert!(split_line("ABCDEFGHIJK NOP").is_err());
  }

  #[test]
  fn alf(){
    assert_eq!(alf_text("  HELLO WORLD"), "HELLO");
    assert_eq!(alf_text(" AB"), "AB   ");
    assert_eq!(alf_text("   X"), " X   ");
    assert_eq!(alf_text("\u{3000}AB"), "AB   ");
    assert_eq!(alf_text("\u{00A0}HELLO"), "HELLO");
  }

  #[test]
  fn address_fields(){
    let parsed = parse_operand("2000,2(0:3)").unwrap();
    assert_eq!(parsed.address, AddressPart::Expression(number(2000)));
    assert_eq!(parsed.index, Some(number(2)));
    assert_eq!(
      parsed.field,
      Some(Expression{
        negative : false,
        first    : Atom::Number(0),
        rest     : vec![(BinaryOperator::Field, Atom::Number(3))]
      })
    );

    let parsed = parse_operand("-2000,4").unwrap();
    assert!(matches!(parsed.address, AddressPart::Expression(Expression{ negative: true, .. })));
    assert_eq!(parsed.field, None);

    let parsed = parse_operand("").unwrap();
    assert_eq!(parsed.address, AddressPart::Empty);

    let parsed = parse_operand("(3)").unwrap();
    assert_eq!(parsed.address, AddressPart::Empty);
    assert_eq!(parsed.field, Some(number(3)));

    let parsed = parse_operand("=1-L=").unwrap();
    assert!(matches!(parsed.address, AddressPart::Literal(_)));
  }

  #[test]
  fn star_is_an_atom_and_an_operator(){
    let parsed = parse_operand("***").unwrap();
    assert_eq!(
      parsed.address,
      AddressPart::Expression(Expression{
        negative : false,
        first    : Atom::Here,
        rest     : vec![(BinaryOperator::Multiply, Atom::Here)]
      })
    );
    let parsed = parse_operand("1//3").unwrap();
    assert!(matches!(
      parsed.address,
      AddressPart::Expression(Expression{ ref rest, .. }) if rest[0].0 == BinaryOperator::FractionDivide
    ));
  }

  #[test]
  fn symbols_and_numbers(){
    let parsed = parse_operand("2B").unwrap();
    assert_eq!(
      parsed.address,
      AddressPart::Expression(Expression{ negative: false, first: Atom::Symbol("2B"), rest: vec![] })
    );
    match parsed.address {
      AddressPart::Expression(e) => assert_eq!(e.lone_symbol(), Some(("2B", false))),
      _ => unreachable!()
    }
  }

  #[test]
  fn malformed(){
    assert!(parse_operand("2000,2(0:3").is_err());
    assert!(parse_operand("2000)").is_err());
    assert!(parse_operand("2000+").is_err());
    assert!(parse_operand("2000,(1:3)").is_err());
    assert!(parse_w_value("1(0:2),").is_err());
    assert_eq!(parse_w_value("").unwrap(), vec![]);
    assert_eq!(parse_w_value("1,-1000(0:2)").unwrap().len(), 2);
  }
}
