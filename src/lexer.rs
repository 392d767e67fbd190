//! Lexical pipeline for C sources
//!
//! Two stages that together preserve the byte layout of the input:
//!
//! 1. **Masking**: string and character literals and block comments are
//!    replaced by runs of spaces of the same length; line comments are
//!    removed up to (not including) the newline.
//! 2. **Tokenization**: identifiers, hex literals, numeric literals,
//!    multi-character operators, and single-character punctuation, matched
//!    in that priority order. Anything else is skipped.
//!
//! The masked source keeps its positional layout so the loop-header scan in
//! `features` can walk it directly.

/// The two-character operators recognized by the tokenizer
const TWO_CHAR_OPS: [&str; 12] = [
    "==", "!=", "<=", ">=", "->", "++", "--", "&&", "||", "<<", ">>", "::",
];

/// Single-character punctuation accepted as tokens
const PUNCT: &str = "{}()[];,.:?~!%^&*+-/|<>=";

/// Mask literals and comments, preserving the source layout
///
/// The three passes run in a fixed order: literals first, then block
/// comments, then line comments. A quote opened inside a block comment is
/// therefore masked as a literal before the comment pass sees it.
pub fn mask_source(code: &str) -> String {
    strip_line_comments(&mask_block_comments(&mask_literals(code)))
}

/// Replace every `"…"` and `'…'` literal (delimiters included) with spaces
///
/// A backslash escapes the following character; literals may span lines.
/// An unterminated literal is left untouched.
fn mask_literals(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = chars.clone();
    let mut i = 0;
    while i < chars.len() {
        let quote = chars[i];
        if quote == '"' || quote == '\'' {
            let mut j = i + 1;
            let mut terminated = false;
            while j < chars.len() {
                if chars[j] == '\\' {
                    j += 2;
                    continue;
                }
                if chars[j] == quote {
                    terminated = true;
                    break;
                }
                j += 1;
            }
            if terminated {
                for c in out[i..=j].iter_mut() {
                    *c = ' ';
                }
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }
    out.into_iter().collect()
}

/// Replace every `/* … */` comment with spaces; the match is non-greedy
fn mask_block_comments(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = chars.clone();
    let mut i = 0;
    while i + 1 < chars.len() {
        if chars[i] == '/' && chars[i + 1] == '*' {
            let mut j = i + 2;
            let mut end = None;
            while j + 1 < chars.len() {
                if chars[j] == '*' && chars[j + 1] == '/' {
                    end = Some(j + 1);
                    break;
                }
                j += 1;
            }
            if let Some(e) = end {
                for c in out[i..=e].iter_mut() {
                    *c = ' ';
                }
                i = e + 1;
                continue;
            }
        }
        i += 1;
    }
    out.into_iter().collect()
}

/// Remove every `//…` comment up to the end of its line
fn strip_line_comments(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '/' && i + 1 < chars.len() && chars[i + 1] == '/' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True for a well-formed identifier token (`[A-Za-z_][A-Za-z_0-9]*`)
pub fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// Tokenize masked source into raw tokens in source order
///
/// Whitespace separates tokens and is discarded; bytes that match no token
/// class are skipped.
pub fn tokenize(code: &str) -> Vec<String> {
    let chars: Vec<char> = code.chars().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < n {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Identifier
        if is_ident_start(c) {
            let mut j = i + 1;
            while j < n && is_ident_continue(chars[j]) {
                j += 1;
            }
            tokens.push(chars[i..j].iter().collect());
            i = j;
            continue;
        }

        // Hexadecimal literal: lowercase `0x` prefix with at least one digit
        if c == '0' && i + 2 < n && chars[i + 1] == 'x' && chars[i + 2].is_ascii_hexdigit() {
            let mut j = i + 3;
            while j < n && chars[j].is_ascii_hexdigit() {
                j += 1;
            }
            tokens.push(chars[i..j].iter().collect());
            i = j;
            continue;
        }

        // Numeric literal: `\d+\.\d*` | `\d+`
        if c.is_ascii_digit() {
            let mut j = i + 1;
            while j < n && chars[j].is_ascii_digit() {
                j += 1;
            }
            if j < n && chars[j] == '.' {
                j += 1;
                while j < n && chars[j].is_ascii_digit() {
                    j += 1;
                }
            }
            tokens.push(chars[i..j].iter().collect());
            i = j;
            continue;
        }

        // Numeric literal: `\.\d+`
        if c == '.' && i + 1 < n && chars[i + 1].is_ascii_digit() {
            let mut j = i + 2;
            while j < n && chars[j].is_ascii_digit() {
                j += 1;
            }
            tokens.push(chars[i..j].iter().collect());
            i = j;
            continue;
        }

        // Multi-character operator
        if i + 1 < n {
            let pair: String = chars[i..i + 2].iter().collect();
            if TWO_CHAR_OPS.contains(&pair.as_str()) {
                tokens.push(pair);
                i += 2;
                continue;
            }
        }

        // Single-character punctuation
        if PUNCT.contains(c) {
            tokens.push(c.to_string());
            i += 1;
            continue;
        }

        i += 1;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(code: &str) -> Vec<String> {
        tokenize(&mask_source(code))
    }

    #[test]
    fn test_block_comment_masking() {
        let code = r#"int x = 1; /* y = "2"; */ int y = 2;"#;
        assert_eq!(
            toks(code),
            vec!["int", "x", "=", "1", ";", "int", "y", "=", "2", ";"]
        );
    }

    #[test]
    fn test_masking_preserves_length() {
        let code = "printf(\"hello\\n\");";
        let masked = mask_source(code);
        assert_eq!(masked.chars().count(), code.chars().count());
        assert_eq!(masked, "printf(         );");
    }

    #[test]
    fn test_string_with_escaped_quote() {
        let masked = mask_source(r#"puts("a\"b"); int z;"#);
        assert!(!masked.contains('a'));
        assert!(masked.contains("int z;"));
    }

    #[test]
    fn test_char_literal_masked() {
        assert_eq!(toks("c = 'x';"), vec!["c", "=", ";"]);
    }

    #[test]
    fn test_line_comment_removed() {
        let masked = mask_source("int a; // trailing \"quote\nint b;");
        assert_eq!(masked, "int a; \nint b;");
    }

    #[test]
    fn test_multiline_block_comment() {
        let code = "a/*1\n2\n3*/b";
        let masked = mask_source(code);
        assert_eq!(masked.chars().count(), code.chars().count());
        assert_eq!(toks(code), vec!["a", "b"]);
    }

    #[test]
    fn test_unterminated_string_left_as_is() {
        // The stray quote matches no token class and is skipped.
        assert_eq!(toks("x \"abc"), vec!["x", "abc"]);
    }

    #[test]
    fn test_hex_and_float_literals() {
        assert_eq!(toks("0xFF 0x 1.5 .5 12."), vec!["0xFF", "0", "x", "1.5", ".5", "12."]);
    }

    #[test]
    fn test_multichar_operators() {
        assert_eq!(
            toks("a->b ++ i <= j && k"),
            vec!["a", "->", "b", "++", "i", "<=", "j", "&&", "k"]
        );
    }

    #[test]
    fn test_arrow_vs_minus() {
        assert_eq!(toks("a - b"), vec!["a", "-", "b"]);
        assert_eq!(toks("a-->b"), vec!["a", "--", ">", "b"]);
    }

    #[test]
    fn test_unknown_bytes_skipped() {
        assert_eq!(toks("a @ # b"), vec!["a", "b"]);
    }
}
