use crate::{
    normalize::normalize,
    ops::{self, Rule},
    parse, render,
    simplify::simplify,
    ParseError,
};
use tracing::debug;

/// Knobs for tweaking how a derivative is cleaned up before being displayed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Options {
    /// Fold constants and identities (`x*1`, `0+x`, `2*3`) in the derivative
    /// tree before rendering it.
    pub fold_constants: bool,
    /// Run the rendered derivative through [`simplify()`].
    pub simplify_text: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            fold_constants: true,
            simplify_text: true,
        }
    }
}

/// The result of differentiating an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    /// The input, redisplayed in canonical form.
    pub original: String,
    pub derivative: String,
    /// Every rule that was applied, in the order they were applied.
    pub trace: Vec<Rule>,
}

impl Derivation {
    /// Notes about things which couldn't be differentiated. These need to be
    /// shown to the user, otherwise they'll think the `0` is a real answer.
    pub fn notes(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.trace.iter().filter(|rule| rule.is_unsupported())
    }

    pub fn trace_lines(&self) -> Vec<String> {
        self.trace.iter().map(ToString::to_string).collect()
    }
}

/// Parse an expression and differentiate it with respect to `x`, using the
/// default [`Options`].
///
/// ```rust
/// let got = calculus_steps::parse_and_differentiate("3x^2 + sin(x)").unwrap();
///
/// assert_eq!(got.original, "3*x^2+sin(x)");
/// assert_eq!(got.derivative, "6*x+cos(x)");
/// ```
pub fn parse_and_differentiate(raw: &str) -> Result<Derivation, ParseError> {
    parse_and_differentiate_with(raw, &Options::default())
}

pub fn parse_and_differentiate_with(
    raw: &str,
    options: &Options,
) -> Result<Derivation, ParseError> {
    let normalized = normalize(raw);
    let expr = parse(&normalized)?;
    debug!(raw, expr = %expr, "Differentiating");

    let (mut derivative, trace) = ops::differentiate(&expr);

    if options.fold_constants {
        derivative = ops::fold_constants(&derivative);
    }

    let mut text = render(&derivative);

    if options.simplify_text {
        text = simplify(&text);
    }

    debug!(derivative = %text, rules = trace.len(), "Finished differentiating");

    Ok(Derivation {
        original: render(&expr),
        derivative: text,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ops::{evaluate, Builtins},
        Builtin, Expression,
    };
    use approx::relative_eq;
    use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

    const TEXT_ONLY: Options = Options {
        fold_constants: false,
        simplify_text: true,
    };

    const UNSIMPLIFIED: Options = Options {
        fold_constants: false,
        simplify_text: false,
    };

    #[test]
    fn known_derivatives() {
        let inputs = vec![
            ("x^2", "2*x"),
            ("x^3", "3*x^2"),
            ("sin(x)", "cos(x)"),
            ("1/x", "-1/x^2"),
            ("sqrt(x)", "1/(2*sqrt(x))"),
            ("sin(x^2)", "cos(x^2)*2*x"),
            ("3x^2 + 5x + 2", "6*x+5"),
            ("2e^x", "2*exp(x)"),
            ("e^(x^2)", "exp(x^2)*2*x"),
            ("x\u{00b7}sin(x)", "sin(x)+x*cos(x)"),
            ("ln(2x)", "1/(2*x)*2"),
            ("\u{03c0}x", "pi"),
            ("pi^2*cos(x)", "-(pi^2*sin(x))"),
            ("-(x^2*3)", "-6*x"),
            ("Pi(x+1)", "pi"),
            ("2Pix", "2*pi"),
            ("PIx^2", "pi*2*x"),
        ];

        for (src, should_be) in inputs {
            let got = parse_and_differentiate(src).unwrap();
            assert_eq!(got.derivative, should_be, "d/dx {}", src);
        }
    }

    #[test]
    fn text_simplifier_on_its_own() {
        let inputs = vec![
            ("x^2", "2*x"),
            ("sin(x)", "cos(x)"),
            ("7*sin(x)", "7*cos(x)"),
            ("1/x", "(-1)/x^2"),
            ("f(x)", "f'(x)"),
        ];

        for (src, should_be) in inputs {
            let got = parse_and_differentiate_with(src, &TEXT_ONLY).unwrap();
            assert_eq!(got.derivative, should_be, "d/dx {}", src);
        }
    }

    #[test]
    fn the_original_is_redisplayed_in_canonical_form() {
        let inputs = vec![
            ("3x^2", "3*x^2"),
            ("e^x", "exp(x)"),
            (" 2 ( x + 1 ) ", "2*(x+1)"),
            ("-(x^2)", "-(x^2)"),
            ("-(x^2*3)", "-(x^2*3)"),
            ("-(x^2/3)", "-(x^2/3)"),
            ("Pi(x+1)", "pi*(x+1)"),
            ("PIx", "pi*x"),
        ];

        for (src, should_be) in inputs {
            let got = parse_and_differentiate(src).unwrap();
            assert_eq!(got.original, should_be, "{}", src);
        }
    }

    #[test]
    fn constant_multiples_dont_log_the_product_rule() {
        let got = parse_and_differentiate("7*sin(x)").unwrap();

        assert!(!got.trace.contains(&Rule::Product));
        assert_eq!(
            got.trace_lines(),
            vec![
                "Constant multiple rule: d(C*g)=C*g'",
                "Chain rule: d(sin(u))=cos(u)*u'",
            ]
        );
    }

    #[test]
    fn products_log_the_product_rule() {
        let got = parse_and_differentiate("x*sin(x)").unwrap();

        assert_eq!(got.trace, vec![Rule::Product, Rule::Chain(Builtin::Sine)]);
    }

    #[test]
    fn unknown_functions_are_never_zero() {
        let got = parse_and_differentiate_with("f(x)", &UNSIMPLIFIED).unwrap();
        assert_eq!(got.derivative, "f'(x)*1");

        let got = parse_and_differentiate("f(x)").unwrap();
        assert_eq!(got.derivative, "f'(x)");
        assert_eq!(got.trace, vec![Rule::UnknownFunction("f".into())]);
    }

    #[test]
    fn unsupported_powers_come_with_a_note() {
        let got = parse_and_differentiate("2^x").unwrap();

        assert_eq!(got.derivative, "0");
        let notes: Vec<_> = got.notes().collect();
        assert_eq!(notes, vec![&Rule::UnsupportedPower]);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let inputs = vec![
            ("sin(x", ParseError::UnexpectedEndOfInput),
            ("x + ", ParseError::UnexpectedEndOfInput),
            ("", ParseError::Empty),
        ];

        for (src, should_be) in inputs {
            let got = parse_and_differentiate(src).unwrap_err();
            assert_eq!(got, should_be, "{:?}", src);
        }

        let got = parse_and_differentiate("x # 1").unwrap_err();
        assert!(got.is_invalid_character());
    }

    /// An arbitrary expression made from things the parser understands.
    #[derive(Debug, Clone)]
    struct RandomExpression(Expression);

    impl Arbitrary for RandomExpression {
        fn arbitrary(g: &mut Gen) -> Self {
            let depth = g.size().min(4);
            RandomExpression(random_expression(g, depth))
        }

        fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
            let children = match &self.0 {
                Expression::Negate(inner) => vec![(**inner).clone()],
                Expression::Binary { left, right, .. } => {
                    vec![(**left).clone(), (**right).clone()]
                },
                Expression::FunctionCall { argument, .. } => {
                    vec![(**argument).clone()]
                },
                _ => Vec::new(),
            };

            Box::new(children.into_iter().map(RandomExpression))
        }
    }

    fn random_expression(g: &mut Gen, depth: usize) -> Expression {
        if depth == 0 || u8::arbitrary(g) % 4 == 0 {
            let leaves = ["x", "x", "0", "1", "2", "0.5", "pi", "e"];

            return match *g.choose(&leaves).unwrap() {
                "x" => Expression::Variable,
                constant @ "pi" | constant @ "e" => Expression::symbol(constant),
                number => Expression::number(number),
            };
        }

        let depth = depth - 1;

        match u8::arbitrary(g) % 10 {
            0 => random_expression(g, depth) + random_expression(g, depth),
            1 => random_expression(g, depth) - random_expression(g, depth),
            2 => random_expression(g, depth) * random_expression(g, depth),
            3 => random_expression(g, depth) / random_expression(g, depth),
            4 => -random_expression(g, depth),
            5 => {
                let exponent = *g.choose(&["2", "3", "0.5"]).unwrap();
                random_expression(g, depth).pow(Expression::number(exponent))
            },
            6 => random_expression(g, depth).pow(-Expression::number("1")),
            7 => Expression::symbol("e").pow(random_expression(g, depth)),
            _ => {
                let functions = ["sin", "cos", "tan", "ln", "sqrt", "exp"];
                let function = *g.choose(&functions).unwrap();
                Expression::call(function, random_expression(g, depth))
            },
        }
    }

    const SAMPLE_POINTS: [f64; 3] = [-1.3, 0.7, 2.1];

    /// Do two expressions have the same value everywhere we look? Points
    /// where either can't be evaluated (or blows up) are skipped.
    fn same_values(left: &Expression, right: &Expression) -> bool {
        let ctx = Builtins::default();

        SAMPLE_POINTS.iter().all(|&x| {
            match (evaluate(left, x, &ctx), evaluate(right, x, &ctx)) {
                (Ok(l), Ok(r)) if l.is_finite() && l.abs() < 1e6 => {
                    relative_eq!(l, r, epsilon = 1e-6, max_relative = 1e-6)
                },
                _ => true,
            }
        })
    }

    #[test]
    fn rendering_round_trips() {
        fn prop(expr: RandomExpression) -> TestResult {
            let RandomExpression(expr) = expr;
            let rendered = render(&expr);

            let reparsed = match parse(&rendered) {
                Ok(e) => e,
                Err(e) => {
                    return TestResult::error(format!(
                        "unable to parse \"{}\": {}",
                        rendered, e
                    ))
                },
            };

            if !same_values(&expr, &reparsed) {
                return TestResult::error(format!(
                    "\"{}\" reads back as \"{:?}\"",
                    rendered, reparsed
                ));
            }

            let rendered_again = render(&reparsed);
            if rendered_again != rendered {
                return TestResult::error(format!(
                    "\"{}\" is rendered again as \"{}\"",
                    rendered, rendered_again
                ));
            }

            TestResult::passed()
        }

        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(RandomExpression) -> TestResult);
    }

    #[test]
    fn simplifying_rendered_derivatives_is_idempotent_and_harmless() {
        fn prop(expr: RandomExpression) -> TestResult {
            let RandomExpression(expr) = expr;
            let (derivative, _) = ops::differentiate(&expr);
            let rendered = render(&derivative);

            let once = simplify(&rendered);
            let twice = simplify(&once);
            if once != twice {
                return TestResult::failed();
            }

            match (parse(&rendered), parse(&once)) {
                (Ok(before), Ok(after)) => {
                    TestResult::from_bool(same_values(&before, &after))
                },
                _ => TestResult::failed(),
            }
        }

        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(RandomExpression) -> TestResult);
    }

    #[test]
    fn folding_never_changes_the_derivative() {
        fn prop(expr: RandomExpression) -> bool {
            let RandomExpression(expr) = expr;
            let (derivative, _) = ops::differentiate(&expr);

            same_values(&derivative, &ops::fold_constants(&derivative))
        }

        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(RandomExpression) -> bool);
    }
}
