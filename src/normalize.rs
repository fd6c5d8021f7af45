//! Rewriting informal calculator syntax into something the parser accepts.
//!
//! Students type things like `2x`, `3sin(x)`, `e^(x^2)`, or paste a `π` from
//! somewhere. [`normalize()`] turns that into explicit syntax (`2*x`,
//! `3*sin(x)`, `exp(x^2)`, `pi`). It never fails, at worst the output is
//! something the tokenizer will reject.

use tracing::trace;

/// Typographic characters and their ASCII replacements.
const GLYPHS: &[(char, &str)] = &[
    ('\u{00d7}', "*"), // ×
    ('\u{00b7}', "*"), // ·
    ('\u{2219}', "*"), // ∙
    ('\u{22c5}', "*"), // ⋅
    ('\u{2022}', "*"), // •
    ('\u{2212}', "-"), // −
    ('\u{03c0}', "pi"), // π
    ('\u{03a0}', "pi"), // Π
];

/// Alternative spellings of `pi`.
const PI_ALIASES: &[&str] = &["PI", "Pi", "pI"];

/// Normalize a raw expression so it can be tokenized.
pub fn normalize(raw: &str) -> String {
    let mut s = map_glyphs(raw);
    s = canonicalize_pi(&s);
    s = rewrite_e_powers(&s);
    s = insert_implicit_multiplication(&s);
    s = multiply_pi_before_parens(&s);

    trace!(raw, normalized = %s, "Normalized an expression");
    s
}

fn map_glyphs(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for c in raw.chars().filter(|c| !c.is_whitespace()) {
        match GLYPHS.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, replacement)) => out.push_str(replacement),
            None => out.push(c),
        }
    }

    out
}

/// Spell every alias of `pi` as `pi`, so later steps only need to look for
/// one spelling.
fn canonicalize_pi(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        if is_pi_alias(&chars, i) {
            out.push_str("pi");
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

fn is_pi_alias(chars: &[char], i: usize) -> bool {
    let spelling: String = chars[i..].iter().take(2).collect();

    if !PI_ALIASES.contains(&spelling.as_str()) {
        return false;
    }
    if i > 0 && is_letter(chars[i - 1]) {
        return false;
    }

    match chars.get(i + 2) {
        // "PIx" is "pi*x", but "Pixel" is a word
        Some('x') => !chars.get(i + 3).map_or(false, |&c| is_letter(c)),
        Some(&c) => !is_ident(c),
        None => true,
    }
}

fn is_ident(c: char) -> bool { c.is_ascii_alphanumeric() || c == '_' }

fn is_letter(c: char) -> bool { c.is_ascii_alphabetic() || c == '_' }

/// Read a single "atom" starting at `start`, returning its text and the index
/// just past it.
///
/// An atom is a parenthesized group, a number, or an identifier optionally
/// followed by a parenthesized argument list. Anything else is read as a
/// single character. A trailing `^...` is never part of the atom, so `x^2`
/// only reads `x`.
fn read_atom(chars: &[char], start: usize) -> (String, usize) {
    let first = match chars.get(start) {
        Some(&c) => c,
        None => return (String::new(), start),
    };

    if first == '(' {
        let mut depth = 0;
        let mut end = start;

        while end < chars.len() {
            match chars[end] {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {},
            }
            end += 1;

            if depth == 0 {
                break;
            }
        }

        return (chars[start..end].iter().collect(), end);
    }

    if first.is_ascii_digit() || first == '.' {
        let mut seen_dot = false;
        let mut end = start;

        while let Some(&c) = chars.get(end) {
            if c == '.' && !seen_dot {
                seen_dot = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            end += 1;
        }

        return (chars[start..end].iter().collect(), end);
    }

    if is_letter(first) {
        let mut end = start;
        while chars.get(end).map_or(false, |&c| is_ident(c)) {
            end += 1;
        }

        let mut atom: String = chars[start..end].iter().collect();

        if chars.get(end) == Some(&'(') {
            let (args, after) = read_atom(chars, end);
            atom.push_str(&args);
            end = after;
        }

        return (atom, end);
    }

    (first.to_string(), start + 1)
}

/// Rewrite every `e^ATOM` into `exp(ATOM)`.
fn rewrite_e_powers(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        let is_bare_e = chars[i] == 'e'
            && chars.get(i + 1) == Some(&'^')
            && (i == 0 || !is_letter(chars[i - 1]));

        if !is_bare_e {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        // let "e^-x" mean "exp(-x)"
        let mut atom_start = i + 2;
        let mut sign = String::new();
        if let Some(&c) = chars.get(atom_start) {
            if c == '-' || c == '+' {
                sign.push(c);
                atom_start += 1;
            }
        }

        let (atom, end) = read_atom(&chars, atom_start);

        if atom.is_empty() {
            out.push_str("e^");
            out.push_str(&sign);
            i = atom_start;
            continue;
        }

        let wrapped = atom.len() >= 2
            && atom.starts_with('(')
            && atom.ends_with(')');

        if wrapped && sign.is_empty() {
            out.push_str("exp");
            out.push_str(&atom);
        } else {
            out.push_str("exp(");
            out.push_str(&sign);
            out.push_str(&atom);
            out.push(')');
        }

        i = end;
    }

    out
}

/// Is the character at `index` the variable `x`, as opposed to a letter
/// inside some longer identifier like `exp` or `max`?
fn is_variable_x(chars: &[char], index: usize) -> bool {
    if chars.get(index) != Some(&'x') {
        return false;
    }

    if index == 0 || !is_letter(chars[index - 1]) {
        return true;
    }

    // "pix" is "pi*x"
    index >= 2 && chars[index - 2] == 'p' && chars[index - 1] == 'i'
}

/// Is the digit at `index` part of a number (`2`, `3.5`) rather than the
/// tail of an identifier like `var5`?
fn is_numeric_digit(chars: &[char], index: usize) -> bool {
    if !chars[index].is_ascii_digit() {
        return false;
    }

    let mut i = index;
    while i > 0 && (chars[i - 1].is_ascii_digit() || chars[i - 1] == '.') {
        i -= 1;
    }

    i == 0 || !is_letter(chars[i - 1])
}

/// Does the `e` at `index` start the exponent of a literal like `1e-5`?
fn starts_scientific_exponent(chars: &[char], index: usize) -> bool {
    if chars.get(index) != Some(&'e') {
        return false;
    }

    match chars.get(index + 1) {
        Some(c) if c.is_ascii_digit() => true,
        Some('+') | Some('-') => {
            chars.get(index + 2).map_or(false, |c| c.is_ascii_digit())
        },
        _ => false,
    }
}

fn needs_implicit_times(chars: &[char], i: usize) -> bool {
    let a = chars[i];
    let b = chars[i + 1];
    let digit = is_numeric_digit(chars, i);
    let var_x = is_variable_x(chars, i);

    if digit && (b == 'x' || b == '(') {
        return true;
    }
    if var_x && (b.is_ascii_digit() || b == '(' || b == 'p') {
        return true;
    }
    if a == ')' && (b.is_ascii_digit() || b == 'x' || b == '(') {
        return true;
    }
    if a == 'i' && b == 'x' && i > 0 && chars[i - 1] == 'p' {
        return true;
    }
    if digit && starts_scientific_exponent(chars, i + 1) {
        return false;
    }

    (digit || var_x || a == ')') && is_letter(b)
}

/// Insert `*` wherever two operands are written next to each other (`2x`,
/// `x(x+1)`, `(x+1)(x-1)`, `2sin(x)`, `2pi`).
fn insert_implicit_multiplication(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);

    for i in 0..chars.len() {
        out.push(chars[i]);

        if i + 1 < chars.len() && needs_implicit_times(&chars, i) {
            out.push('*');
        }
    }

    out
}

/// `pi(x+1)` means `pi*(x+1)`, not a call to some function named `pi`.
fn multiply_pi_before_parens(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());

    for i in 0..chars.len() {
        out.push(chars[i]);

        let is_pi = i >= 1
            && chars[i] == 'i'
            && chars[i - 1] == 'p'
            && (i == 1 || !is_ident(chars[i - 2]));

        if is_pi && chars.get(i + 1) == Some(&'(') {
            out.push('*');
        }
    }

    out
}
