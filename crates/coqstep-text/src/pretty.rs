//! Display prettification of coqtop output.

use std::cmp::Reverse;

/// Multi-character operator notations and their display glyphs.
const OPERATOR_GLYPHS: &[(&str, &str)] = &[
    ("|-", "⊢"),
    ("||", "‖"),
    ("/\\", "∧"),
    ("\\/", "∨"),
    ("->", "→"),
    ("<-", "←"),
    ("<->", "↔"),
    ("=>", "⇒"),
    ("<=", "≤"),
    (">=", "≥"),
    ("<>", "≠"),
    (">->", "↣"),
    ("-->", "⟶"),
    ("<--", "⟵"),
    ("<-->", "⟷"),
    ("==>", "⟹"),
    ("<==", "⟸"),
    ("~~>", "⟿"),
    ("<~~", "⬳"),
];

/// Whole identifiers and their display glyphs, substituted only at word
/// boundaries.
const IDENTIFIER_GLYPHS: &[(&str, &str)] = &[
    ("True", "⊤"),
    ("False", "⊥"),
    ("fun", "λ"),
    ("forall", "∀"),
    ("exists", "∃"),
    ("nat", "ℕ"),
    ("Prop", "ℙ"),
    ("Real", "ℝ"),
    ("bool", "𝔹"),
];

/// Replaces Coq notation in coqtop output with display glyphs.
///
/// Operators are substituted longest-first so `<-->` is never clobbered by
/// its `<--` or `->` substrings. Identifiers are substituted only at word
/// boundaries: the character before must not be alphanumeric or `_`, and the
/// character after must not be alphanumeric, `_`, or `'` (primed variants
/// such as `nat'` are distinct names). Purely cosmetic; classification and
/// storage treat the prettified text exactly like the raw output.
#[must_use]
pub fn prettify(output: &str) -> String {
    let mut operators = OPERATOR_GLYPHS.to_vec();
    operators.sort_by_key(|(symbol, _)| Reverse(symbol.len()));

    let mut text = output.to_owned();
    for (symbol, glyph) in operators {
        text = text.replace(symbol, glyph);
    }
    for (name, glyph) in IDENTIFIER_GLYPHS {
        text = replace_identifier(&text, name, glyph);
    }
    text
}

/// Replaces whole-word occurrences of `name` with `glyph`.
fn replace_identifier(text: &str, name: &str, glyph: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for (index, _) in text.match_indices(name) {
        let before_ok = text[..index]
            .chars()
            .next_back()
            .is_none_or(|c| !is_word_char(c));
        let after_ok = text[index + name.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_word_char(c) && c != '\'');
        if before_ok && after_ok {
            out.push_str(&text[copied..index]);
            out.push_str(glyph);
            copied = index + name.len();
        }
    }
    out.push_str(&text[copied..]);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("A -> B", "A → B")]
    #[case("P <-> Q", "P ↔ Q")]
    #[case("X <--> Y", "X ⟷ Y")]
    #[case("H |- goal", "H ⊢ goal")]
    #[case("P ==> Q", "P ⟹ Q")]
    fn replaces_operators_longest_first(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(prettify(input), expected);
    }

    #[rstest]
    fn replaces_identifiers_at_word_boundaries() {
        assert_eq!(prettify("forall n : nat, True"), "∀ n : ℕ, ⊤");
    }

    #[rstest]
    #[case("natural")]
    #[case("snat")]
    #[case("nat'")]
    #[case("nat_list")]
    #[case("nat0")]
    fn leaves_longer_identifiers_untouched(#[case] input: &str) {
        assert_eq!(prettify(input), input);
    }

    #[rstest]
    fn replaces_fun_binder() {
        assert_eq!(prettify("fun x => x"), "λ x ⇒ x");
    }

    #[rstest]
    fn handles_multiple_occurrences() {
        assert_eq!(prettify("nat -> nat -> nat"), "ℕ → ℕ → ℕ");
    }

    #[rstest]
    fn preserves_failure_markers() {
        let output = "Error: The reference x was not found.";

        assert!(prettify(output).starts_with("Error:"));
    }

    #[rstest]
    fn empty_output_stays_empty() {
        assert_eq!(prettify(""), "");
    }
}
