//! Working out which differentiation rules an expression will need, before
//! actually differentiating it.

use crate::{
    normalize::normalize, parse, BinaryOperation, Expression, ParseError,
};
use std::fmt::{self, Display, Formatter};

/// The rules an expression will need, from the outside in.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// The input after normalizing.
    pub normalized: String,
    /// Is there a `/` at the top level?
    pub quotient: bool,
    /// Is there a `*` at the top level?
    pub product: bool,
    /// Is there a binary `+` or `-` at the top level?
    pub sum_difference: bool,
    /// Is something composed with a function anywhere?
    pub chain: bool,
}

impl Classification {
    /// The order the rules are typically applied in.
    pub fn rule_order(&self) -> Vec<&'static str> {
        let mut order = Vec::new();

        if self.quotient {
            order.push("Quotient rule (outside)");
        }
        if self.product {
            order.push("Product rule (outside)");
        }
        if self.sum_difference {
            order.push("Sum/Difference rule (outside)");
        }
        if self.chain {
            order.push("Chain rule (inside)");
        }

        if order.is_empty() {
            order.push("Basic rules only (power, constant, etc.)");
        }

        order
    }

    pub fn recommended_tool(&self) -> Tool {
        if self.chain || self.product || self.quotient {
            Tool::SymbolicSteps
        } else {
            Tool::Numeric
        }
    }
}

/// The kind of tool best suited to differentiating an expression.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Tool {
    /// Differentiate symbolically and show each rule.
    SymbolicSteps,
    /// Estimate the derivative at a point (or use the limit definition).
    Numeric,
}

impl Display for Tool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Tool::SymbolicSteps => write!(f, "Symbolic derivative (steps)"),
            Tool::Numeric => write!(
                f,
                "Numeric derivative at a point, or the limit definition"
            ),
        }
    }
}

/// Normalize and parse an expression, then work out which rules are needed
/// to differentiate it.
pub fn classify(raw: &str) -> Result<Classification, ParseError> {
    let normalized = normalize(raw);
    let expr = parse(&normalized)?;

    let mut classification = Classification {
        normalized,
        quotient: false,
        product: false,
        sum_difference: false,
        chain: has_composition(&expr),
    };
    classification.scan_terms(&expr);

    Ok(classification)
}

impl Classification {
    /// Walk the top-level sum, never looking inside parentheses.
    fn scan_terms(&mut self, expr: &Expression) {
        match expr {
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Plus,
            } => {
                self.sum_difference = true;
                self.scan_terms(left);
                self.scan_terms(right);
            },
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Minus,
            } => {
                self.sum_difference = true;
                self.scan_terms(left);
                if !right.is_additive() {
                    self.scan_terms(right);
                }
            },
            Expression::Negate(inner) if !inner.is_additive() => {
                self.scan_terms(inner)
            },
            other => self.scan_factors(other),
        }
    }

    fn scan_factors(&mut self, expr: &Expression) {
        match expr {
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            } => {
                // a constant multiple doesn't need the product rule
                if left.depends_on_x() && right.depends_on_x() {
                    self.product = true;
                }
                self.scan_nested_factor(left);
                self.scan_nested_factor(right);
            },
            Expression::Binary {
                left,
                op: BinaryOperation::Divide,
                ..
            } => {
                self.quotient = true;
                self.scan_nested_factor(left);
            },
            Expression::Negate(inner) => self.scan_nested_factor(inner),
            _ => {},
        }
    }

    fn scan_nested_factor(&mut self, expr: &Expression) {
        if !expr.is_additive() {
            self.scan_factors(expr);
        }
    }
}

fn has_composition(expr: &Expression) -> bool {
    match expr {
        Expression::FunctionCall { .. } => true,
        Expression::Number(_)
        | Expression::Variable
        | Expression::Symbol(_) => false,
        Expression::Negate(inner) => has_composition(inner),
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Power,
        } => {
            // x^n is just the power rule, (x+1)^n and e^x aren't
            let composed_base =
                **left != Expression::Variable && left.depends_on_x();
            composed_base
                || right.depends_on_x()
                || has_composition(left)
                || has_composition(right)
        },
        Expression::Binary { left, right, .. } => {
            has_composition(left) || has_composition(right)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! classify_test {
        ($name:ident, $src:expr => [$($rule:expr),* $(,)?], $tool:expr) => {
            #[test]
            fn $name() {
                let got = classify($src).unwrap();

                let should_be: Vec<&str> = vec![$($rule),*];
                assert_eq!(got.rule_order(), should_be);
                assert_eq!(got.recommended_tool(), $tool);
            }
        };
    }

    classify_test!(
        polynomial,
        "3x^2 + 5x" => ["Sum/Difference rule (outside)"],
        Tool::Numeric
    );
    classify_test!(
        plain_power,
        "x^3" => ["Basic rules only (power, constant, etc.)"],
        Tool::Numeric
    );
    classify_test!(
        negated_power,
        "-(x^3)" => ["Basic rules only (power, constant, etc.)"],
        Tool::Numeric
    );
    classify_test!(
        simple_chain,
        "sin(x^2)" => ["Chain rule (inside)"],
        Tool::SymbolicSteps
    );
    classify_test!(
        power_of_a_sum,
        "(x+1)^5" => ["Chain rule (inside)"],
        Tool::SymbolicSteps
    );
    classify_test!(
        e_to_the_x,
        "e^(2x)" => ["Chain rule (inside)"],
        Tool::SymbolicSteps
    );
    classify_test!(
        product_of_functions,
        "x sin(x)" => ["Product rule (outside)", "Chain rule (inside)"],
        Tool::SymbolicSteps
    );
    classify_test!(
        quotient,
        "(x^2+1)/(x-1)" => ["Quotient rule (outside)"],
        Tool::SymbolicSteps
    );
    classify_test!(
        everything,
        "x*cos(x) + ln(x)/x" => [
            "Quotient rule (outside)",
            "Product rule (outside)",
            "Sum/Difference rule (outside)",
            "Chain rule (inside)",
        ],
        Tool::SymbolicSteps
    );

    #[test]
    fn operators_inside_calls_arent_top_level() {
        let got = classify("sin(x*2 + 1)").unwrap();

        assert!(!got.product);
        assert!(!got.sum_difference);
        assert!(got.chain);
        assert_eq!(got.normalized, "sin(x*2+1)");
    }

    #[test]
    fn invalid_input_is_an_error() {
        assert!(classify("sin(x").is_err());
        assert!(classify("x $ 2").unwrap_err().is_invalid_character());
    }
}
