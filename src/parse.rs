use crate::{BinaryOperation, Expression};
use std::{ops::Range, str::FromStr};
use thiserror::Error;

/// Parse an [`Expression`] tree from some (already normalized) text.
pub fn parse(s: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(s)?;
    Parser::new(&tokens).parse()
}

/// Split some text into [`Token`]s.
///
/// Tokenizing is all-or-nothing, the first character we don't recognise
/// fails the whole thing.
pub fn tokenize(s: &str) -> Result<Vec<Token<'_>>, ParseError> {
    Tokens::new(s).collect()
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { parse(s) }
}

/// A simple recursive descent parser for converting a list of tokens into an
/// expression tree.
///
/// The grammar:
///
/// ```text
/// expression     := term (("+" | "-") term)*
///
/// term           := power (("*" | "/") power)*
///
/// power          := unary ("^" power)?
///
/// unary          := ("+" | "-") unary
///                 | primary
///
/// primary        := NUMBER
///                 | IDENTIFIER "(" expression ")"
///                 | IDENTIFIER
///                 | "(" expression ")"
/// ```
///
/// Note that unary minus binds tighter than `^`, so `-x^2` is `(-x)^2`.
#[derive(Debug, Clone)]
pub(crate) struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    cursor: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    pub(crate) fn new(tokens: &'t [Token<'a>]) -> Self {
        Parser { tokens, cursor: 0 }
    }

    pub(crate) fn parse(mut self) -> Result<Expression, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let expr = self.expression()?;

        match self.tokens.get(self.cursor) {
            None => Ok(expr),
            Some(token) => Err(ParseError::TrailingTokens {
                found: token.kind,
                span: token.span.clone(),
            }),
        }
    }

    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.cursor).map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Result<&'t Token<'a>, ParseError> {
        let token = self
            .tokens
            .get(self.cursor)
            .ok_or(ParseError::UnexpectedEndOfInput)?;
        self.cursor += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        let token = self.advance()?;

        if token.kind == kind {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                found: token.kind,
                span: token.span.clone(),
                expected: expected_for(kind),
            })
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.term()?;

        self.left_associative(
            left,
            &[TokenKind::Plus, TokenKind::Minus],
            |p| p.term(),
        )
    }

    fn term(&mut self) -> Result<Expression, ParseError> {
        let left = self.power()?;

        self.left_associative(
            left,
            &[TokenKind::Times, TokenKind::Divide],
            |p| p.power(),
        )
    }

    fn left_associative<F>(
        &mut self,
        mut left: Expression,
        expected: &[TokenKind],
        mut operand: F,
    ) -> Result<Expression, ParseError>
    where
        F: FnMut(&mut Self) -> Result<Expression, ParseError>,
    {
        while let Some(kind) = self.peek() {
            if !expected.contains(&kind) {
                break;
            }

            // skip past the operator
            let _ = self.advance()?;
            // and parse the second bit
            let right = operand(self)?;

            left = Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op: kind.as_binary_op(),
            };
        }

        Ok(left)
    }

    fn power(&mut self) -> Result<Expression, ParseError> {
        let base = self.unary()?;

        if self.peek() == Some(TokenKind::Caret) {
            let _ = self.advance()?;
            let exponent = self.power()?;
            return Ok(base.pow(exponent));
        }

        Ok(base)
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        match self.peek() {
            Some(TokenKind::Plus) => {
                let _ = self.advance()?;
                self.unary()
            },
            Some(TokenKind::Minus) => {
                let _ = self.advance()?;
                let operand = self.unary()?;
                Ok(Expression::Negate(Box::new(operand)))
            },
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance()?;

        match token.kind {
            TokenKind::Number => Ok(Expression::number(token.text)),
            TokenKind::Identifier => self.variable_or_function_call(token),
            TokenKind::OpenParen => {
                let expr = self.expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expr)
            },
            // we couldn't parse the primary, return a nice error
            other => Err(ParseError::UnexpectedToken {
                found: other,
                span: token.span.clone(),
                expected: &[
                    TokenKind::Number,
                    TokenKind::Identifier,
                    TokenKind::OpenParen,
                ],
            }),
        }
    }

    fn variable_or_function_call(
        &mut self,
        ident: &Token<'a>,
    ) -> Result<Expression, ParseError> {
        debug_assert_eq!(ident.kind, TokenKind::Identifier);

        if self.peek() == Some(TokenKind::OpenParen) {
            let _ = self.advance()?;
            let argument = self.expression()?;
            self.expect(TokenKind::CloseParen)?;

            Ok(Expression::call(ident.text, argument))
        } else if ident.text == "x" {
            Ok(Expression::Variable)
        } else {
            Ok(Expression::symbol(ident.text))
        }
    }
}

fn expected_for(kind: TokenKind) -> &'static [TokenKind] {
    match kind {
        TokenKind::CloseParen => &[TokenKind::CloseParen],
        TokenKind::OpenParen => &[TokenKind::OpenParen],
        _ => &[],
    }
}

/// Possible errors that may occur while parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid character {character:?} at index {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("there is no expression to parse")]
    Empty,
    #[error("the expression ended unexpectedly")]
    UnexpectedEndOfInput,
    #[error("found {found:?} at {span:?} but expected one of {expected:?}")]
    UnexpectedToken {
        found: TokenKind,
        span: Range<usize>,
        expected: &'static [TokenKind],
    },
    #[error("unexpected {found:?} at {span:?} after a complete expression")]
    TrailingTokens {
        found: TokenKind,
        span: Range<usize>,
    },
}

impl ParseError {
    /// Did tokenizing fail, as opposed to the tokens being in the wrong order?
    pub fn is_invalid_character(&self) -> bool {
        match self {
            ParseError::InvalidCharacter { .. } => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn peek_nth(&self, n: usize) -> Option<char> { self.rest().chars().nth(n) }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    fn chomp(&mut self, kind: TokenKind) -> Option<Result<Token<'a>, ParseError>> {
        let start = self.cursor;
        self.advance()?;
        let end = self.cursor;

        Some(Ok(Token::from_text(self.src, start..end, kind)))
    }

    fn take_while<P>(&mut self, mut predicate: P) -> Range<usize>
    where
        P: FnMut(char) -> bool,
    {
        let start = self.cursor;

        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }

            self.advance();
        }

        start..self.cursor
    }

    fn chomp_number(&mut self) -> Token<'a> {
        let start = self.cursor;
        self.take_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') {
            // skip past the decimal
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        // an exponent, as in "1e-5", but only when digits follow
        if self.peek() == Some('e') {
            let has_exponent = match self.peek_nth(1) {
                Some('+') | Some('-') => {
                    self.peek_nth(2).map_or(false, |c| c.is_ascii_digit())
                },
                Some(c) => c.is_ascii_digit(),
                None => false,
            };

            if has_exponent {
                self.advance();
                if let Some('+') | Some('-') = self.peek() {
                    self.advance();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }

        Token::from_text(self.src, start..self.cursor, TokenKind::Number)
    }

    fn chomp_identifier(&mut self) -> Token<'a> {
        let mut seen_first_character = false;

        let span = self.take_while(|c| {
            if seen_first_character {
                c.is_ascii_alphanumeric() || c == '_'
            } else {
                seen_first_character = true;
                c.is_ascii_alphabetic() || c == '_'
            }
        });

        Token::from_text(self.src, span, TokenKind::Identifier)
    }

    fn invalid(&self, character: char) -> Option<Result<Token<'a>, ParseError>> {
        Some(Err(ParseError::InvalidCharacter {
            character,
            index: self.cursor,
        }))
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.advance();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen),
                ')' => self.chomp(TokenKind::CloseParen),
                '+' => self.chomp(TokenKind::Plus),
                '-' => self.chomp(TokenKind::Minus),
                '*' => self.chomp(TokenKind::Times),
                '/' => self.chomp(TokenKind::Divide),
                '^' => self.chomp(TokenKind::Caret),
                '_' | 'a'..='z' | 'A'..='Z' => {
                    Some(Ok(self.chomp_identifier()))
                },
                '0'..='9' => Some(Ok(self.chomp_number())),
                '.' if self.peek_nth(1).map_or(false, |c| c.is_ascii_digit()) => {
                    Some(Ok(self.chomp_number()))
                },
                other => self.invalid(other),
            };
        }
    }
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub span: Range<usize>,
    pub kind: TokenKind,
}

impl<'a> Token<'a> {
    fn from_text(
        original_source: &'a str,
        span: Range<usize>,
        kind: TokenKind,
    ) -> Self {
        Token {
            text: &original_source[span.clone()],
            span,
            kind,
        }
    }
}

/// The kinds of token that can appear in an [`Expression`]'s text form.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    Number,
    OpenParen,
    CloseParen,
    Plus,
    Minus,
    Times,
    Divide,
    Caret,
}

impl TokenKind {
    fn as_binary_op(self) -> BinaryOperation {
        match self {
            TokenKind::Plus => BinaryOperation::Plus,
            TokenKind::Minus => BinaryOperation::Minus,
            TokenKind::Times => BinaryOperation::Times,
            TokenKind::Divide => BinaryOperation::Divide,
            TokenKind::Caret => BinaryOperation::Power,
            other => unreachable!("{:?} is not a binary op", other),
        }
    }
}

#[cfg(test)]
mod tokenizer_tests {
    use super::*;

    macro_rules! tokenize_test {
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let mut tokens = Tokens::new($src);

                let got = tokens.next().unwrap().unwrap();

                let Range { start, end } = got.span;
                assert_eq!(start, 0);
                assert_eq!(end, $src.len());
                assert_eq!(got.kind, $should_be);

                assert!(
                    tokens.next().is_none(),
                    "{:?} should be empty",
                    tokens
                );
            }
        };
    }

    tokenize_test!(open_paren, "(", TokenKind::OpenParen);
    tokenize_test!(close_paren, ")", TokenKind::CloseParen);
    tokenize_test!(plus, "+", TokenKind::Plus);
    tokenize_test!(minus, "-", TokenKind::Minus);
    tokenize_test!(times, "*", TokenKind::Times);
    tokenize_test!(divide, "/", TokenKind::Divide);
    tokenize_test!(caret, "^", TokenKind::Caret);
    tokenize_test!(single_digit_integer, "3", TokenKind::Number);
    tokenize_test!(multi_digit_integer, "31", TokenKind::Number);
    tokenize_test!(number_with_trailing_dot, "31.", TokenKind::Number);
    tokenize_test!(simple_decimal, "3.14", TokenKind::Number);
    tokenize_test!(leading_dot, ".5", TokenKind::Number);
    tokenize_test!(scientific_notation, "1e-5", TokenKind::Number);
    tokenize_test!(unsigned_exponent, "2.5e10", TokenKind::Number);
    tokenize_test!(simple_identifier, "x", TokenKind::Identifier);
    tokenize_test!(longer_identifier, "sqrt", TokenKind::Identifier);
    tokenize_test!(
        identifiers_can_have_underscores,
        "hello_world",
        TokenKind::Identifier
    );
    tokenize_test!(
        identifiers_can_start_with_underscores,
        "_hello_world",
        TokenKind::Identifier
    );
    tokenize_test!(
        identifiers_can_contain_numbers,
        "var5",
        TokenKind::Identifier
    );

    #[test]
    fn a_number_only_has_one_decimal_point() {
        let kinds: Vec<_> = tokenize("1.2.3")
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();

        assert_eq!(kinds, vec!["1.2", ".3"]);
    }

    #[test]
    fn e_without_digits_is_an_identifier() {
        let texts: Vec<_> = tokenize("2e+x")
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();

        assert_eq!(texts, vec!["2", "e", "+", "x"]);
    }

    #[test]
    fn unknown_characters_fail_everything() {
        let inputs = vec![("x + $", '$', 4), ("2 % x", '%', 2), ("f'(x)", '\'', 1)];

        for (src, character, index) in inputs {
            let got = tokenize(src).unwrap_err();
            assert_eq!(got, ParseError::InvalidCharacter { character, index });
            assert!(got.is_invalid_character());
        }
    }
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    macro_rules! parser_test {
        ($name:ident, $src:expr) => {
            parser_test!($name, $src, $src);
        };
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let got = parse($src).unwrap();

                let round_tripped = got.to_string();
                assert_eq!(round_tripped, $should_be);
            }
        };
    }

    parser_test!(simple_integer, "1");
    parser_test!(one_plus_one, "1+1");
    parser_test!(spaces_are_ignored, "1 + 1", "1+1");
    parser_test!(one_plus_negative_one, "1+-1");
    parser_test!(one_plus_one_times_three, "1+1*3");
    parser_test!(one_plus_one_all_times_three, "(1+1)*3");
    parser_test!(negative_one, "-1");
    parser_test!(unary_plus_is_dropped, "+x", "x");
    parser_test!(negative_one_plus_x, "-1+x");
    parser_test!(number_in_parens, "(1)", "1");
    parser_test!(subtraction_is_left_associative, "1-2-3");
    parser_test!(subtract_a_group, "1-(2-3)");
    parser_test!(division_is_left_associative, "8/4/2");
    parser_test!(divide_by_a_product, "8/(4*2)");
    parser_test!(bimdas, "1*2+3*4/(5-2)*1-3");
    parser_test!(power, "x^2");
    parser_test!(power_is_right_associative, "2^3^2");
    parser_test!(grouped_power_on_the_left, "(2^3)^2");
    parser_test!(negation_binds_before_power, "-x^2", "(-x)^2");
    parser_test!(negated_power, "-(x^2)");
    parser_test!(function_call, "sin(x)");
    parser_test!(function_call_with_expression, "sin(1/x)");
    parser_test!(unknown_function, "f(x^2+1)");
    parser_test!(
        function_calls_function_calls_function_with_variable,
        "foo(bar(baz(pi)))"
    );
    parser_test!(scientific_literal, "1e-5*x");

    #[test]
    fn identifiers() {
        let inputs = vec![
            ("x", Expression::Variable),
            ("pi", Expression::symbol("pi")),
            ("xy", Expression::symbol("xy")),
            ("f(x)", Expression::call("f", Expression::Variable)),
            (
                "sin(2)",
                Expression::call("sin", Expression::number("2")),
            ),
        ];

        for (src, should_be) in inputs {
            let got = parse(src).unwrap();
            assert_eq!(got, should_be);
        }
    }

    #[test]
    fn precedence_and_associativity() {
        let x = || Expression::Variable;
        let n = |s: &str| Expression::number(s);

        let got = parse("x-1-2").unwrap();
        assert_eq!(got, (x() - n("1")) - n("2"));

        let got = parse("2*x^3").unwrap();
        assert_eq!(got, n("2") * x().pow(n("3")));

        let got = parse("x^2^3").unwrap();
        assert_eq!(got, x().pow(n("2").pow(n("3"))));

        let got = parse("-x^2").unwrap();
        assert_eq!(got, (-x()).pow(n("2")));

        let got = parse("2^-x").unwrap();
        assert_eq!(got, n("2").pow(-x()));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let inputs = vec![
            ("sin(x", ParseError::UnexpectedEndOfInput),
            ("x + ", ParseError::UnexpectedEndOfInput),
            ("", ParseError::Empty),
            ("   ", ParseError::Empty),
            (
                "(x",
                ParseError::UnexpectedEndOfInput,
            ),
            (
                "x)",
                ParseError::TrailingTokens {
                    found: TokenKind::CloseParen,
                    span: 1..2,
                },
            ),
            (
                "2 x",
                ParseError::TrailingTokens {
                    found: TokenKind::Identifier,
                    span: 2..3,
                },
            ),
            (
                "sin(x))",
                ParseError::TrailingTokens {
                    found: TokenKind::CloseParen,
                    span: 6..7,
                },
            ),
            (
                "x*/2",
                ParseError::UnexpectedToken {
                    found: TokenKind::Divide,
                    span: 2..3,
                    expected: &[
                        TokenKind::Number,
                        TokenKind::Identifier,
                        TokenKind::OpenParen,
                    ],
                },
            ),
            (
                "sin(x 2)",
                ParseError::UnexpectedToken {
                    found: TokenKind::Number,
                    span: 6..7,
                    expected: &[TokenKind::CloseParen],
                },
            ),
        ];

        for (src, should_be) in inputs {
            let got = parse(src).unwrap_err();
            assert_eq!(got, should_be, "{}", src);
            assert!(!got.is_invalid_character());
        }
    }
}
