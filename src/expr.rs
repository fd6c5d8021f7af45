use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};

/// An expression in the single independent variable, `x`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A numeric literal, kept as the text it was written with.
    Number(SmolStr),
    /// The independent variable, `x`.
    Variable,
    /// Any other identifier (`pi`, `e`, `a`, or a placeholder like `f'(x)`).
    Symbol(SmolStr),
    /// Negate the expression.
    Negate(Box<Expression>),
    /// An expression involving two operands.
    Binary {
        left: Box<Expression>,
        right: Box<Expression>,
        op: BinaryOperation,
    },
    /// Invoke a function with a single argument.
    ///
    /// The name is kept verbatim, use [`Builtin::from_name()`] to find out
    /// whether it is one we know how to differentiate.
    FunctionCall {
        function: SmolStr,
        argument: Box<Expression>,
    },
}

impl Expression {
    pub fn number<S: Into<SmolStr>>(text: S) -> Self {
        Expression::Number(text.into())
    }

    pub fn symbol<S: Into<SmolStr>>(name: S) -> Self {
        Expression::Symbol(name.into())
    }

    pub fn call<S: Into<SmolStr>>(function: S, argument: Expression) -> Self {
        Expression::FunctionCall {
            function: function.into(),
            argument: Box::new(argument),
        }
    }

    /// Raise this expression to some power.
    pub fn pow(self, exponent: Expression) -> Self {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(exponent),
            op: BinaryOperation::Power,
        }
    }

    /// Does `x` appear anywhere in this expression?
    pub fn depends_on_x(&self) -> bool {
        match self {
            Expression::Variable => true,
            Expression::Number(_) | Expression::Symbol(_) => false,
            Expression::Negate(inner) => inner.depends_on_x(),
            Expression::FunctionCall { argument, .. } => argument.depends_on_x(),
            Expression::Binary { left, right, .. } => {
                left.depends_on_x() || right.depends_on_x()
            },
        }
    }

    /// Is this a numeric literal with exactly this text?
    pub fn is_number(&self, text: &str) -> bool {
        match self {
            Expression::Number(n) => n == text,
            _ => false,
        }
    }

    fn is_binary(&self, ops: &[BinaryOperation]) -> bool {
        match self {
            Expression::Binary { op, .. } => ops.contains(op),
            _ => false,
        }
    }

    pub(crate) fn is_additive(&self) -> bool {
        self.is_binary(&[BinaryOperation::Plus, BinaryOperation::Minus])
    }

    fn is_negation(&self) -> bool {
        match self {
            Expression::Negate(_) => true,
            _ => false,
        }
    }

    /// Would a leading `-` attach to a power (or another negation) at the
    /// start of this expression, rather than to the whole thing?
    fn leads_with_power(&self) -> bool {
        match self {
            Expression::Binary {
                op: BinaryOperation::Power,
                ..
            } => true,
            Expression::Binary {
                left,
                op: BinaryOperation::Times,
                ..
            }
            | Expression::Binary {
                left,
                op: BinaryOperation::Divide,
                ..
            } => {
                !left.is_additive()
                    && (left.is_negation() || left.leads_with_power())
            },
            _ => false,
        }
    }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinaryOperation {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperation {
    pub fn symbol(self) -> char {
        match self {
            BinaryOperation::Plus => '+',
            BinaryOperation::Minus => '-',
            BinaryOperation::Times => '*',
            BinaryOperation::Divide => '/',
            BinaryOperation::Power => '^',
        }
    }
}

/// The functions with a built-in derivative.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Builtin {
    Sine,
    Cosine,
    Tangent,
    NaturalLog,
    Sqrt,
    Exp,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "sin" => Some(Builtin::Sine),
            "cos" => Some(Builtin::Cosine),
            "tan" => Some(Builtin::Tangent),
            "ln" => Some(Builtin::NaturalLog),
            "sqrt" => Some(Builtin::Sqrt),
            "exp" => Some(Builtin::Exp),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sine => "sin",
            Builtin::Cosine => "cos",
            Builtin::Tangent => "tan",
            Builtin::NaturalLog => "ln",
            Builtin::Sqrt => "sqrt",
            Builtin::Exp => "exp",
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Render an [`Expression`] back into text which will parse to an equivalent
/// tree.
pub fn render(expr: &Expression) -> String { expr.to_string() }

// define some operator overloads to make constructing an expression easier.

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Plus,
        }
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Minus,
        }
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Times,
        }
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Divide,
        }
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Box::new(self)) }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Number(text) => write!(f, "{}", text),
            Expression::Variable => write!(f, "x"),
            Expression::Symbol(name) => write!(f, "{}", name),
            Expression::Negate(inner) => {
                // "-x^2" and "-x^2*3" read back as "(-x)^2" and "(-x)^2*3"
                let wrap = inner.is_additive() || inner.leads_with_power();
                write!(f, "-")?;
                write_wrapped(inner, wrap, f)
            },
            Expression::FunctionCall { function, argument } => {
                write!(f, "{}({})", function, argument)
            },
            Expression::Binary { left, right, op } => {
                let (wrap_left, wrap_right) = match op {
                    BinaryOperation::Plus => (false, false),
                    BinaryOperation::Minus => (false, right.is_additive()),
                    BinaryOperation::Times => {
                        (left.is_additive(), right.is_additive())
                    },
                    BinaryOperation::Divide => (
                        left.is_additive(),
                        right.is_negation()
                            || right.is_binary(&[
                                BinaryOperation::Plus,
                                BinaryOperation::Minus,
                                BinaryOperation::Times,
                                BinaryOperation::Divide,
                            ]),
                    ),
                    // powers are right-associative, so a power on the left
                    // needs parentheses but one on the right doesn't
                    BinaryOperation::Power => (
                        left.is_negation() || left.is_binary(&ALL_OPS),
                        right.is_negation()
                            || right.is_binary(&ALL_OPS[..4]),
                    ),
                };

                write_wrapped(left, wrap_left, f)?;
                write!(f, "{}", op.symbol())?;
                write_wrapped(right, wrap_right, f)
            },
        }
    }
}

const ALL_OPS: [BinaryOperation; 5] = [
    BinaryOperation::Plus,
    BinaryOperation::Minus,
    BinaryOperation::Times,
    BinaryOperation::Divide,
    BinaryOperation::Power,
];

fn write_wrapped(
    expr: &Expression,
    wrap: bool,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    if wrap {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}
