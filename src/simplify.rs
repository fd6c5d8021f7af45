//! Cosmetic clean-up of rendered expressions.
//!
//! This works on text rather than on the tree, so every rule is guarded to
//! only fire on whole number literals (`*1` never touches `*10` or `*1.5`)
//! and only where dropping something can't change how the rest of the text
//! parses (`2/1*x` is left alone). Every rule makes the text strictly
//! shorter, so applying them until nothing changes always terminates.

use tracing::trace;

/// A rule either finds something to rewrite at a particular index or it
/// doesn't.
type Rule = fn(&[char], usize) -> Option<Rewrite>;

#[derive(Debug, Clone, PartialEq)]
struct Rewrite {
    start: usize,
    end: usize,
    replacement: &'static str,
}

impl Rewrite {
    fn new(start: usize, end: usize, replacement: &'static str) -> Self {
        debug_assert!(replacement.chars().count() < end - start);
        Rewrite {
            start,
            end,
            replacement,
        }
    }
}

const RULES: &[(&str, Rule)] = &[
    ("x*1 = x", times_one),
    ("1*x = x", one_times),
    ("x+0 = x", plus_zero),
    ("x-0 = x", minus_zero),
    ("0+x = x", leading_zero_plus),
    ("0-x = -x", leading_zero_minus),
    ("0*x = 0", zero_times_constant),
    ("x*0 = 0", constant_times_zero),
    ("double sign", double_sign),
    ("unary plus", unary_plus),
    ("(x) = x", parenthesized_x),
    ("x^1 = x", power_of_one),
];

/// Tidy up a rendered expression, removing things like `*1` and `+0`.
///
/// ```rust
/// # use calculus_steps::simplify;
/// assert_eq!(simplify("1*cos(x)*1+0"), "cos(x)");
/// assert_eq!(simplify("x*10+0.5"), "x*10+0.5");
/// ```
pub fn simplify(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();

    while let Some((name, rewrite)) = first_rewrite(&chars) {
        let replaced: Vec<char> = chars
            .splice(rewrite.start..rewrite.end, rewrite.replacement.chars())
            .collect();

        trace!(
            rule = name,
            replaced = %replaced.iter().collect::<String>(),
            result = %chars.iter().collect::<String>(),
            "Simplified",
        );
    }

    chars.into_iter().collect()
}

fn first_rewrite(chars: &[char]) -> Option<(&'static str, Rewrite)> {
    for (name, rule) in RULES {
        for i in 0..chars.len() {
            if let Some(rewrite) = rule(chars, i) {
                return Some((*name, rewrite));
            }
        }
    }

    None
}

fn at(chars: &[char], index: usize) -> Option<char> {
    chars.get(index).copied()
}

fn before(chars: &[char], index: usize) -> Option<char> {
    if index == 0 {
        None
    } else {
        at(chars, index - 1)
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '\''
}

/// Does this character end an operand (so a following `+` or `-` is binary)?
fn ends_operand(c: char) -> bool { is_word(c) || c == ')' }

/// Is the digit at `index` a whole number literal by itself, as opposed to
/// part of `10`, `0.5`, `x1`, `1e5` or `1e-5`?
fn is_lone_digit(chars: &[char], index: usize, digit: char) -> bool {
    at(chars, index) == Some(digit)
        && !before(chars, index).map_or(false, is_word)
        && !at(chars, index + 1).map_or(false, is_word)
        && !(index >= 1 && is_exponent_sign(chars, index - 1))
}

/// Could the text following a removed term be anything other than the end of
/// a sum?
fn ends_term(c: Option<char>) -> bool {
    match c {
        None | Some(')') | Some('+') | Some('-') => true,
        _ => false,
    }
}

/// Does a factor end here, so something like `*1` can be dropped?
fn ends_factor(c: Option<char>) -> bool {
    ends_term(c) || c == Some('*') || c == Some('/')
}

/// Can a factor start after this character without anything binding tighter
/// to it?
fn starts_factor(c: Option<char>) -> bool {
    match c {
        None | Some('(') | Some('+') | Some('-') | Some('*') => true,
        _ => false,
    }
}

/// Is there a `+` or `-` at `index` which is the sign of a scientific
/// literal like `1e-5`?
fn is_exponent_sign(chars: &[char], index: usize) -> bool {
    index >= 2
        && at(chars, index - 1) == Some('e')
        && at(chars, index - 2).map_or(false, |c| c.is_ascii_digit())
}

/// Where does the operand starting at `start` end? This is a number, a name
/// (optionally called with arguments) or a parenthesized group.
fn operand_end(chars: &[char], start: usize) -> usize {
    let mut end = start;

    while at(chars, end).map_or(false, is_word) {
        end += 1;
    }

    if at(chars, end) == Some('(') {
        let mut depth = 0;

        while let Some(c) = at(chars, end) {
            end += 1;
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                },
                _ => {},
            }
        }
    }

    end
}

/// Is the operand starting at `start` the base of a `^`?
fn raised_to_a_power(chars: &[char], start: usize) -> bool {
    at(chars, operand_end(chars, start)) == Some('^')
}

/// If the character at `index` is a sign, would it still mean the same thing
/// when placed directly in front of the operand at `next`?
///
/// A unary minus binds tighter than `^` so `-1*x^2` can't become `-x^2`, and
/// `a/-1*x` can't become `a/-x`.
fn can_join_sign(chars: &[char], index: usize, next: usize) -> bool {
    match at(chars, index) {
        Some('+') | Some('-') => {},
        _ => return true,
    }

    match before(chars, index) {
        Some(c) if ends_operand(c) => true,
        Some('/') | Some('^') => false,
        _ => !raised_to_a_power(chars, next),
    }
}

/// The names we treat as a single constant factor for `0*x`.
const FACTORS: &[&str] = &["x", "pi", "e"];

/// If one of [`FACTORS`] starts at `index`, how long is it?
fn factor_at(chars: &[char], index: usize) -> Option<usize> {
    if before(chars, index).map_or(false, is_word) {
        return None;
    }

    FACTORS.iter().find_map(|name| {
        let len = name.chars().count();
        let matches = chars.len() >= index + len
            && chars[index..index + len].iter().copied().eq(name.chars());
        let whole = !at(chars, index + len).map_or(false, is_word);

        if matches && whole {
            Some(len)
        } else {
            None
        }
    })
}

fn times_one(chars: &[char], i: usize) -> Option<Rewrite> {
    if at(chars, i) != Some('*') {
        return None;
    }

    if is_lone_digit(chars, i + 1, '1') && ends_factor(at(chars, i + 2)) {
        return Some(Rewrite::new(i, i + 2, ""));
    }

    // "*(1)"
    let parenthesized = at(chars, i + 1) == Some('(')
        && at(chars, i + 2) == Some('1')
        && at(chars, i + 3) == Some(')')
        && ends_factor(at(chars, i + 4));
    if parenthesized {
        return Some(Rewrite::new(i, i + 4, ""));
    }

    None
}

fn one_times(chars: &[char], i: usize) -> Option<Rewrite> {
    let matches = is_lone_digit(chars, i, '1')
        && at(chars, i + 1) == Some('*')
        && starts_factor(before(chars, i))
        && (i == 0 || can_join_sign(chars, i - 1, i + 2));

    if matches {
        Some(Rewrite::new(i, i + 2, ""))
    } else {
        None
    }
}

fn sign_then_zero(chars: &[char], i: usize, sign: char) -> Option<Rewrite> {
    let matches = at(chars, i) == Some(sign)
        && before(chars, i).map_or(false, ends_operand)
        && !is_exponent_sign(chars, i)
        && is_lone_digit(chars, i + 1, '0')
        && ends_term(at(chars, i + 2));

    if matches {
        Some(Rewrite::new(i, i + 2, ""))
    } else {
        None
    }
}

fn plus_zero(chars: &[char], i: usize) -> Option<Rewrite> {
    sign_then_zero(chars, i, '+')
}

fn minus_zero(chars: &[char], i: usize) -> Option<Rewrite> {
    sign_then_zero(chars, i, '-')
}

fn leading_zero(chars: &[char], i: usize, sign: char) -> bool {
    let at_start = match before(chars, i) {
        None | Some('(') => true,
        _ => false,
    };

    at_start && is_lone_digit(chars, i, '0') && at(chars, i + 1) == Some(sign)
}

fn leading_zero_plus(chars: &[char], i: usize) -> Option<Rewrite> {
    if leading_zero(chars, i, '+') {
        Some(Rewrite::new(i, i + 2, ""))
    } else {
        None
    }
}

fn leading_zero_minus(chars: &[char], i: usize) -> Option<Rewrite> {
    // "0-x^2" is not "-x^2", which reads as "(-x)^2"
    if leading_zero(chars, i, '-') && !raised_to_a_power(chars, i + 2) {
        Some(Rewrite::new(i, i + 2, "-"))
    } else {
        None
    }
}

fn zero_times_constant(chars: &[char], i: usize) -> Option<Rewrite> {
    let starts = is_lone_digit(chars, i, '0')
        && starts_factor(before(chars, i))
        && at(chars, i + 1) == Some('*');
    if !starts {
        return None;
    }

    let len = factor_at(chars, i + 2)?;
    let end = i + 2 + len;

    if at(chars, end) == Some('^') {
        None
    } else {
        Some(Rewrite::new(i, end, "0"))
    }
}

fn constant_times_zero(chars: &[char], i: usize) -> Option<Rewrite> {
    if !starts_factor(before(chars, i)) {
        return None;
    }

    let len = factor_at(chars, i)?;
    let star = i + len;
    let matches = at(chars, star) == Some('*')
        && is_lone_digit(chars, star + 1, '0')
        && at(chars, star + 2) != Some('^');

    if matches {
        Some(Rewrite::new(i, star + 2, "0"))
    } else {
        None
    }
}

fn double_sign(chars: &[char], i: usize) -> Option<Rewrite> {
    let replacement = match (at(chars, i)?, at(chars, i + 1)?) {
        ('+', '-') | ('-', '+') => "-",
        ('-', '-') | ('+', '+') => "+",
        _ => return None,
    };

    Some(Rewrite::new(i, i + 2, replacement))
}

fn unary_plus(chars: &[char], i: usize) -> Option<Rewrite> {
    if at(chars, i) != Some('+') {
        return None;
    }

    match before(chars, i) {
        None | Some('(') | Some('*') | Some('/') | Some('^') => {
            Some(Rewrite::new(i, i + 1, ""))
        },
        _ => None,
    }
}

fn parenthesized_x(chars: &[char], i: usize) -> Option<Rewrite> {
    let matches = at(chars, i) == Some('(')
        && at(chars, i + 1) == Some('x')
        && at(chars, i + 2) == Some(')')
        // "sin(x)" and "f'(x)" are calls
        && !before(chars, i).map_or(false, is_word);

    if matches {
        Some(Rewrite::new(i, i + 3, "x"))
    } else {
        None
    }
}

fn power_of_one(chars: &[char], i: usize) -> Option<Rewrite> {
    let matches = at(chars, i) == Some('^')
        && is_lone_digit(chars, i + 1, '1')
        && ends_factor(at(chars, i + 2));

    if matches {
        Some(Rewrite::new(i, i + 2, ""))
    } else {
        None
    }
}
