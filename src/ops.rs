//! [`Expression`] operations.

use crate::{render, BinaryOperation, Builtin, Expression};
use smol_str::SmolStr;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;
use tracing::debug;

/// A calculus rule which was applied while differentiating.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// `d(C*g) = C*g'`, used instead of the product rule when one factor is
    /// free of `x`.
    ConstantMultiple,
    Product,
    Quotient,
    /// `d(g^n) = n*g^(n-1)*g'`.
    PowerChain,
    /// The chain rule through one of the [`Builtin`] functions.
    Chain(Builtin),
    /// The chain rule through a function we know nothing about, leaving a
    /// placeholder like `f'(u)`.
    UnknownFunction(SmolStr),
    /// `a^g(x)` needs logarithmic differentiation, which we don't do. The
    /// derivative was replaced with `0`, which is NOT the real answer.
    UnsupportedPower,
}

impl Rule {
    /// Is this a note about something we couldn't differentiate?
    pub fn is_unsupported(&self) -> bool {
        match self {
            Rule::UnsupportedPower => true,
            _ => false,
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Rule::ConstantMultiple => {
                write!(f, "Constant multiple rule: d(C*g)=C*g'")
            },
            Rule::Product => write!(f, "Product rule: d(uv)=u'v + uv'"),
            Rule::Quotient => {
                write!(f, "Quotient rule: d(u/v)=(u'v - uv')/v^2")
            },
            Rule::PowerChain => {
                write!(f, "Chain + power: d((g)^n)=n*(g)^(n-1)*g'")
            },
            Rule::Chain(builtin) => {
                let outer = match builtin {
                    Builtin::Sine => "cos(u)",
                    Builtin::Cosine => "-sin(u)",
                    Builtin::Tangent => "(1/cos(u)^2)",
                    Builtin::NaturalLog => "(1/u)",
                    Builtin::Sqrt => "(1/(2*sqrt(u)))",
                    Builtin::Exp => "exp(u)",
                };
                write!(f, "Chain rule: d({}(u))={}*u'", builtin, outer)
            },
            Rule::UnknownFunction(name) => {
                write!(f, "Chain rule: d({0}(u))={0}'(u)*u'", name)
            },
            Rule::UnsupportedPower => write!(
                f,
                "NOTE: General a^g(x) needs ln(a); not supported here, so the 0 is not a real answer."
            ),
        }
    }
}

/// A type that collects the steps taken while differentiating.
///
/// [`StepCollector`] is also implemented for the unit type `()`, for when
/// you only care about the result.
pub trait StepCollector<S> {
    fn push(&mut self, step: S);
}

impl<S> StepCollector<S> for () {
    #[inline]
    fn push(&mut self, _: S) {}
}

impl<S> StepCollector<S> for Vec<S> {
    #[inline]
    fn push(&mut self, step: S) { Vec::push(self, step); }
}

/// Differentiate an [`Expression`] with respect to `x`, returning the
/// derivative and the rules used along the way.
///
/// The derivative is left exactly as the rules produce it (`x^2` gives
/// `2*x^1*1`), use [`fold_constants()`] to tidy it up.
pub fn differentiate(expr: &Expression) -> (Expression, Vec<Rule>) {
    let mut steps = Vec::new();
    let derivative = derivative(expr, &mut steps);
    (derivative, steps)
}

/// Calculate an [`Expression`]'s derivative with respect to `x`, recording
/// each rule in `steps`.
pub fn derivative<S>(expr: &Expression, steps: &mut S) -> Expression
where
    S: StepCollector<Rule>,
{
    match expr {
        Expression::Number(_) | Expression::Symbol(_) => zero(),
        Expression::Variable => one(),
        Expression::Negate(inner) => -derivative(inner, steps),
        Expression::Binary { left, right, op } => {
            differentiate_binary(left, right, *op, steps)
        },
        Expression::FunctionCall { function, argument } => {
            differentiate_call(function, argument, steps)
        },
    }
}

fn fire<S: StepCollector<Rule>>(steps: &mut S, rule: Rule) {
    debug!(rule = %rule, "Applying a rule");
    steps.push(rule);
}

fn differentiate_binary<S>(
    left: &Expression,
    right: &Expression,
    op: BinaryOperation,
    steps: &mut S,
) -> Expression
where
    S: StepCollector<Rule>,
{
    match op {
        BinaryOperation::Plus => {
            derivative(left, steps) + derivative(right, steps)
        },
        BinaryOperation::Minus => {
            derivative(left, steps) - derivative(right, steps)
        },
        BinaryOperation::Times => {
            match (left.depends_on_x(), right.depends_on_x()) {
                (false, false) => zero(),
                (false, true) => {
                    fire(steps, Rule::ConstantMultiple);
                    left.clone() * derivative(right, steps)
                },
                (true, false) => {
                    fire(steps, Rule::ConstantMultiple);
                    derivative(left, steps) * right.clone()
                },
                (true, true) => {
                    // The product rule
                    fire(steps, Rule::Product);
                    let d_left = derivative(left, steps);
                    let d_right = derivative(right, steps);

                    d_left * right.clone() + left.clone() * d_right
                },
            }
        },
        BinaryOperation::Divide => {
            // The quotient rule
            fire(steps, Rule::Quotient);
            let d_left = derivative(left, steps);
            let d_right = derivative(right, steps);

            (d_left * right.clone() - left.clone() * d_right)
                / right.clone().pow(Expression::number("2"))
        },
        BinaryOperation::Power => differentiate_power(left, right, steps),
    }
}

fn differentiate_power<S>(
    base: &Expression,
    exponent: &Expression,
    steps: &mut S,
) -> Expression
where
    S: StepCollector<Rule>,
{
    if exponent.depends_on_x() {
        if let Expression::Symbol(name) = base {
            if name == "e" {
                // e^u is just exp(u) written differently
                let d_exponent = derivative(exponent, steps);
                fire(steps, Rule::Chain(Builtin::Exp));
                return base.clone().pow(exponent.clone()) * d_exponent;
            }
        }

        fire(steps, Rule::UnsupportedPower);
        return zero();
    }

    if !base.depends_on_x() {
        return zero();
    }

    fire(steps, Rule::PowerChain);
    let lowered = exponent_minus_one(exponent);
    let d_base = derivative(base, steps);

    exponent.clone() * base.clone().pow(lowered) * d_base
}

/// Calculate `n - 1`, exactly when `n` is an integer and symbolically
/// otherwise.
fn exponent_minus_one(exponent: &Expression) -> Expression {
    match as_integer(exponent).and_then(|n| n.checked_sub(1)) {
        Some(lowered) => integer(lowered),
        None => exponent.clone() - one(),
    }
}

fn differentiate_call<S>(
    function: &SmolStr,
    argument: &Expression,
    steps: &mut S,
) -> Expression
where
    S: StepCollector<Rule>,
{
    let u = argument.clone();
    let du = derivative(argument, steps);

    let builtin = match Builtin::from_name(function) {
        Some(b) => b,
        None => {
            // all we can do is the generic chain rule, f'(u)*u'
            fire(steps, Rule::UnknownFunction(function.clone()));
            let placeholder = format!("{}'({})", function, render(argument));
            return Expression::symbol(placeholder) * du;
        },
    };

    fire(steps, Rule::Chain(builtin));

    let outer = match builtin {
        Builtin::Sine => Expression::call("cos", u),
        Builtin::Cosine => -Expression::call("sin", u),
        Builtin::Tangent => {
            one() / Expression::call("cos", u).pow(Expression::number("2"))
        },
        Builtin::NaturalLog => one() / u,
        Builtin::Sqrt => {
            one() / (Expression::number("2") * Expression::call("sqrt", u))
        },
        Builtin::Exp => Expression::call("exp", u),
    };

    outer * du
}

fn zero() -> Expression { Expression::number("0") }

fn one() -> Expression { Expression::number("1") }

/// Interpret an expression as an integer, if it is an integer literal or the
/// negation of one.
fn as_integer(expr: &Expression) -> Option<i64> {
    match expr {
        Expression::Number(text)
            if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) =>
        {
            text.parse().ok()
        },
        Expression::Negate(inner) => as_integer(inner)?.checked_neg(),
        _ => None,
    }
}

fn integer(value: i64) -> Expression {
    if value < 0 {
        match value.checked_neg() {
            Some(positive) => -Expression::number(positive.to_string()),
            None => Expression::number(value.to_string()),
        }
    } else {
        Expression::number(value.to_string())
    }
}

/// Split a literal like `12.50e-3` into its integer digits, fraction digits
/// and exponent.
fn literal_parts(expr: &Expression) -> Option<(&str, &str, Option<&str>)> {
    let text = match expr {
        Expression::Number(text) => text.as_str(),
        _ => return None,
    };

    let (mantissa, exponent) = match text.find('e') {
        Some(index) => (&text[..index], Some(&text[index + 1..])),
        None => (text, None),
    };
    let (whole, fraction) = match mantissa.find('.') {
        Some(index) => (&mantissa[..index], &mantissa[index + 1..]),
        None => (mantissa, ""),
    };

    Some((whole, fraction, exponent))
}

fn all_zeros(digits: &str) -> bool { digits.bytes().all(|b| b == b'0') }

/// Is this literal exactly zero? Decided from the text, so `1e-400` isn't
/// mistaken for `0` after it underflows.
fn is_zero(expr: &Expression) -> bool {
    match literal_parts(expr) {
        Some((whole, fraction, _)) => {
            !(whole.is_empty() && fraction.is_empty())
                && all_zeros(whole)
                && all_zeros(fraction)
        },
        None => false,
    }
}

/// Is this literal exactly one (`1`, `1.0`, `01`, `1e0`)?
fn is_one(expr: &Expression) -> bool {
    match literal_parts(expr) {
        Some((whole, fraction, exponent)) => {
            let exponent_is_zero = exponent.map_or(true, |e| {
                let digits = e.trim_start_matches(|c| c == '+' || c == '-');
                !digits.is_empty() && all_zeros(digits)
            });

            whole.trim_start_matches('0') == "1"
                && all_zeros(fraction)
                && exponent_is_zero
        },
        None => false,
    }
}

/// Negate an (already folded) expression without leaving `--a` or `-0`
/// behind.
fn negate(expr: Expression) -> Expression {
    match expr {
        Expression::Negate(inner) => *inner,
        zero if is_zero(&zero) => zero,
        other => -other,
    }
}

/// Simplify an expression by evaluating constant integer arithmetic and
/// applying arithmetic's identity laws.
///
/// Number literals are never converted to floating point, so anything that
/// isn't integer arithmetic (or would overflow) is left as-is.
pub fn fold_constants(expr: &Expression) -> Expression {
    match expr {
        Expression::Binary { left, right, op } => {
            fold_binary_op(fold_constants(left), fold_constants(right), *op)
        },
        Expression::Negate(inner) => negate(fold_constants(inner)),
        Expression::FunctionCall { function, argument } => {
            Expression::FunctionCall {
                function: function.clone(),
                argument: Box::new(fold_constants(argument)),
            }
        },
        _ => expr.clone(),
    }
}

fn fold_binary_op(
    left: Expression,
    right: Expression,
    op: BinaryOperation,
) -> Expression {
    match op {
        BinaryOperation::Plus => fold_plus(left, right),
        BinaryOperation::Minus => fold_minus(left, right),
        BinaryOperation::Times => fold_times(left, right),
        BinaryOperation::Divide => fold_divide(left, right),
        BinaryOperation::Power => fold_power(left, right),
    }
}

fn fold_plus(left: Expression, right: Expression) -> Expression {
    // x + 0 = x
    if is_zero(&left) {
        return right;
    }
    if is_zero(&right) {
        return left;
    }

    if let (Some(l), Some(r)) = (as_integer(&left), as_integer(&right)) {
        if let Some(sum) = l.checked_add(r) {
            return integer(sum);
        }
    }

    match right {
        // x + -y = x - y
        Expression::Negate(inner) => fold_minus(left, *inner),
        right => left + right,
    }
}

fn fold_minus(left: Expression, right: Expression) -> Expression {
    // x - 0 = x
    if is_zero(&right) {
        return left;
    }
    // 0 - x = -x
    if is_zero(&left) {
        return negate(right);
    }
    if left == right {
        return zero();
    }

    if let (Some(l), Some(r)) = (as_integer(&left), as_integer(&right)) {
        if let Some(difference) = l.checked_sub(r) {
            return integer(difference);
        }
    }

    match right {
        // x - -y = x + y
        Expression::Negate(inner) => fold_plus(left, *inner),
        right => left - right,
    }
}

fn fold_times(left: Expression, right: Expression) -> Expression {
    // 0 * x = 0
    if is_zero(&left) || is_zero(&right) {
        return zero();
    }
    // 1 * x = x
    if is_one(&left) {
        return right;
    }
    if is_one(&right) {
        return left;
    }

    if let (Some(l), Some(r)) = (as_integer(&left), as_integer(&right)) {
        if let Some(product) = l.checked_mul(r) {
            return integer(product);
        }
    }

    match (left, right) {
        // pull the sign out so the constants can meet
        (Expression::Negate(inner), right) => {
            negate(fold_times(*inner, right))
        },
        (left, Expression::Negate(inner)) => negate(fold_times(left, *inner)),

        // c1 * (c2 * x) = (c1*c2) * x
        (
            constant,
            Expression::Binary {
                left: inner_left,
                right: inner_right,
                op: BinaryOperation::Times,
            },
        ) if as_integer(&constant).is_some() => {
            merge_constant_factors(constant, *inner_left, *inner_right)
        },
        (
            Expression::Binary {
                left: inner_left,
                right: inner_right,
                op: BinaryOperation::Times,
            },
            constant,
        ) if as_integer(&constant).is_some() => {
            merge_constant_factors(constant, *inner_left, *inner_right)
        },

        // Oh well, we tried
        (left, right) => left * right,
    }
}

/// Try to simplify `constant * (a * b)` where either `a` or `b` is an integer.
fn merge_constant_factors(
    constant: Expression,
    a: Expression,
    b: Expression,
) -> Expression {
    let c = as_integer(&constant);

    if let (Some(c), Some(a_value)) = (c, as_integer(&a)) {
        if let Some(product) = c.checked_mul(a_value) {
            return fold_times(integer(product), b);
        }
    }
    if let (Some(c), Some(b_value)) = (c, as_integer(&b)) {
        if let Some(product) = c.checked_mul(b_value) {
            return fold_times(integer(product), a);
        }
    }

    constant * (a * b)
}

fn fold_divide(left: Expression, right: Expression) -> Expression {
    // 0 / x = 0
    if is_zero(&left) {
        return zero();
    }
    // x / 1 = x
    if is_one(&right) {
        return left;
    }

    if let (Some(l), Some(r)) = (as_integer(&left), as_integer(&right)) {
        if l.checked_rem(r) == Some(0) {
            if let Some(quotient) = l.checked_div(r) {
                return integer(quotient);
            }
        }
    }

    match (left, right) {
        (Expression::Negate(inner), right) => {
            negate(fold_divide(*inner, right))
        },
        (left, Expression::Negate(inner)) => negate(fold_divide(left, *inner)),
        (left, right) => left / right,
    }
}

fn fold_power(base: Expression, exponent: Expression) -> Expression {
    // x^1 = x
    if is_one(&exponent) {
        return base;
    }
    // x^0 = 1, 1^x = 1
    if is_zero(&exponent) || is_one(&base) {
        return one();
    }

    if let (Some(b), Some(e)) = (as_integer(&base), as_integer(&exponent)) {
        if (0..=u32::MAX as i64).contains(&e) {
            if let Some(value) = b.checked_pow(e as u32) {
                return integer(value);
            }
        }
    }

    base.pow(exponent)
}

/// Contextual information used when evaluating an [`Expression`].
pub trait Context {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError>;

    fn evaluate_symbol(&self, name: &str) -> Result<f64, EvaluationError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("unknown function \"{name}\"")]
    UnknownFunction { name: SmolStr },
    #[error("unknown symbol \"{name}\"")]
    UnknownSymbol { name: SmolStr },
    #[error("\"{text}\" is not a valid number")]
    InvalidNumber { text: SmolStr },
}

/// The set of builtin functions and constants.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Builtins;

impl Context for Builtins {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError> {
        let builtin = Builtin::from_name(name).ok_or_else(|| {
            EvaluationError::UnknownFunction { name: name.into() }
        })?;

        let value = match builtin {
            Builtin::Sine => argument.sin(),
            Builtin::Cosine => argument.cos(),
            Builtin::Tangent => argument.tan(),
            Builtin::NaturalLog => argument.ln(),
            Builtin::Sqrt => argument.sqrt(),
            Builtin::Exp => argument.exp(),
        };

        Ok(value)
    }

    fn evaluate_symbol(&self, name: &str) -> Result<f64, EvaluationError> {
        match name {
            "pi" => Ok(std::f64::consts::PI),
            "e" => Ok(std::f64::consts::E),
            _ => Err(EvaluationError::UnknownSymbol { name: name.into() }),
        }
    }
}

/// Evaluate an [`Expression`] at a particular value of `x`.
pub fn evaluate<C>(
    expr: &Expression,
    x: f64,
    ctx: &C,
) -> Result<f64, EvaluationError>
where
    C: Context,
{
    match expr {
        Expression::Number(text) => text
            .parse()
            .map_err(|_| EvaluationError::InvalidNumber { text: text.clone() }),
        Expression::Variable => Ok(x),
        Expression::Symbol(name) => ctx.evaluate_symbol(name),
        Expression::Negate(inner) => Ok(-evaluate(inner, x, ctx)?),
        Expression::FunctionCall { function, argument } => {
            let argument = evaluate(argument, x, ctx)?;
            ctx.evaluate_function(function, argument)
        },
        Expression::Binary { left, right, op } => {
            let l = evaluate(left, x, ctx)?;
            let r = evaluate(right, x, ctx)?;

            let value = match op {
                BinaryOperation::Plus => l + r,
                BinaryOperation::Minus => l - r,
                BinaryOperation::Times => l * r,
                BinaryOperation::Divide => l / r,
                BinaryOperation::Power => l.powf(r),
            };

            Ok(value)
        },
    }
}
