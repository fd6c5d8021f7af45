//! A symbolic differentiation engine for walking students through calculus
//! problems step by step.
//!
//! The typical flow is raw text → [`normalize()`] → [`tokenize()`] →
//! [`parse()`] → [`ops::differentiate()`] → [`render()`] → [`simplify()`],
//! all of which is wrapped up in [`parse_and_differentiate()`].
//!
//! ```rust
//! let got = calculus_steps::parse_and_differentiate("x sin(x)").unwrap();
//!
//! assert_eq!(got.derivative, "sin(x)+x*cos(x)");
//! assert_eq!(got.trace_lines()[0], "Product rule: d(uv)=u'v + uv'");
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod chain;
pub mod classify;
mod derivation;
mod expr;
pub mod normalize;
pub mod ops;
mod parse;
pub mod simplify;

pub use chain::{chain_layers, ChainWork, Layer};
pub use classify::{classify, Classification, Tool};
pub use derivation::{
    parse_and_differentiate, parse_and_differentiate_with, Derivation, Options,
};
pub use expr::{render, BinaryOperation, Builtin, Expression};
pub use normalize::normalize;
pub use ops::Rule;
pub use parse::{parse, tokenize, ParseError, Token, TokenKind};
pub use simplify::simplify;
