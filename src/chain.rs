//! Breaking a composition like `sin(x^2)^3` into a chain of variables, the
//! way you would write it out when showing your work for the chain rule.

use crate::{
    ops::{self, fold_constants},
    BinaryOperation, Builtin, Expression,
};
use smol_str::SmolStr;
use std::fmt::{self, Display, Formatter};

/// One function applied to the next variable in the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// `name(u)`.
    Function(SmolStr),
    /// `u^n` for some numeric literal, `n`.
    Power(SmolStr),
}

impl Layer {
    /// Apply this layer to an inner expression.
    pub fn apply(&self, inner: Expression) -> Expression {
        match self {
            Layer::Function(name) => Expression::call(name.clone(), inner),
            Layer::Power(n) => inner.pow(Expression::number(n.clone())),
        }
    }

    /// The derivative of this layer with respect to `u`, or `None` if it is
    /// a function we don't know the derivative of.
    pub fn derivative(&self, u: &Expression) -> Option<Expression> {
        if let Layer::Function(name) = self {
            Builtin::from_name(name)?;
        }

        let (d, _) = ops::differentiate(&self.apply(Expression::Variable));

        Some(substitute_x(&fold_constants(&d), u))
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Function(name) => write!(f, "{}(u)", name),
            Layer::Power(n) => write!(f, "u^{}", n),
        }
    }
}

/// The worked chain rule for a single clean composition.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainWork {
    /// The layers, from the outermost (`u0`) inwards.
    pub layers: Vec<Layer>,
    /// The expression the innermost layer is applied to (`u_k`).
    pub innermost: Expression,
    /// `du_i/du_{i+1}` for each layer, in terms of `u_{i+1}`.
    pub factors: Vec<Option<Expression>>,
    /// `du_k/dx`.
    pub inner_derivative: Expression,
}

impl ChainWork {
    /// The name given to the `index`'th intermediate variable.
    pub fn variable(index: usize) -> Expression {
        Expression::symbol(format!("u{}", index))
    }

    /// The substitutions, starting from the innermost, that rebuild the
    /// original expression (`u2 = x^2`, `u1 = sin(u2)`, ...).
    pub fn substitutions(&self) -> Vec<(Expression, Expression)> {
        let k = self.layers.len();
        let mut subs = vec![(ChainWork::variable(k), self.innermost.clone())];

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let applied = layer.apply(ChainWork::variable(i + 1));
            subs.push((ChainWork::variable(i), applied));
        }

        subs
    }
}

impl Display for ChainWork {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let k = self.layers.len();

        for (name, value) in self.substitutions() {
            writeln!(f, "Let {} = {}", name, value)?;
        }
        writeln!(f, "Then y = u0")?;

        for (i, factor) in self.factors.iter().enumerate() {
            match factor {
                Some(d) => writeln!(f, "du{}/du{} = {}", i, i + 1, d)?,
                None => writeln!(f, "du{}/du{} = (unsupported)", i, i + 1)?,
            }
        }
        writeln!(f, "du{}/dx = {}", k, self.inner_derivative)?;

        write!(f, "dy/dx = ")?;
        for i in 0..k {
            write!(f, "(du{}/du{})", i, i + 1)?;
        }
        write!(f, "(du{}/dx)", k)
    }
}

/// Peel the outer functions and numeric powers off an expression.
///
/// Returns `None` when the expression isn't a composition at all (e.g. a sum
/// or product at the top level), or when one of the powers has a
/// non-numeric exponent.
pub fn chain_layers(expr: &Expression) -> Option<ChainWork> {
    let mut layers = Vec::new();
    let mut current = expr;

    loop {
        match current {
            Expression::FunctionCall { function, argument } => {
                layers.push(Layer::Function(function.clone()));
                current = &**argument;
            },
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Power,
            } => match &**right {
                Expression::Number(n) => {
                    layers.push(Layer::Power(n.clone()));
                    current = &**left;
                },
                _ => return None,
            },
            _ => break,
        }
    }

    if layers.is_empty() {
        return None;
    }

    let factors = layers
        .iter()
        .enumerate()
        .map(|(i, layer)| layer.derivative(&ChainWork::variable(i + 1)))
        .collect();
    let (inner_derivative, _) = ops::differentiate(current);

    Some(ChainWork {
        layers,
        innermost: current.clone(),
        factors,
        inner_derivative: fold_constants(&inner_derivative),
    })
}

/// Replace every `x` with something else.
fn substitute_x(expr: &Expression, with: &Expression) -> Expression {
    match expr {
        Expression::Variable => with.clone(),
        Expression::Number(_) | Expression::Symbol(_) => expr.clone(),
        Expression::Negate(inner) => -substitute_x(inner, with),
        Expression::FunctionCall { function, argument } => {
            Expression::call(function.clone(), substitute_x(argument, with))
        },
        Expression::Binary { left, right, op } => Expression::Binary {
            left: Box::new(substitute_x(left, with)),
            right: Box::new(substitute_x(right, with)),
            op: *op,
        },
    }
}
