//! Feature extraction
//!
//! Turns one C source file into the feature bundle the similarity kernel
//! consumes:
//! - normalized token stream (identifiers aliased `ID1`, `ID2`, ... in
//!   first-seen order)
//! - k-shingle set and token-frequency bag over the normalized stream
//! - raw identifier and function-call name sets
//! - compressed control-flow stream
//! - normalized `for`/`while` header signatures, scanned from the masked
//!   source with balanced-paren matching
//!
//! Extraction is pure per file: read bytes, mask, tokenize, derive, hash.
//! Tasks run in parallel from the coordinator in `lib.rs`.

use crate::lexer::{self, is_identifier};
use crate::types::{AnalysisConfig, Features};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// The C89/C99 keyword set, sorted for binary search
pub const C_KEYWORDS: [&str; 37] = [
    "_Bool", "_Complex", "_Imaginary", "auto", "break", "case", "char", "const", "continue",
    "default", "do", "double", "else", "enum", "extern", "float", "for", "goto", "if", "inline",
    "int", "long", "register", "restrict", "return", "short", "signed", "sizeof", "static",
    "struct", "switch", "typedef", "union", "unsigned", "void", "volatile", "while",
];

pub fn is_keyword(token: &str) -> bool {
    C_KEYWORDS.binary_search(&token).is_ok()
}

/// Alias every non-keyword identifier with `ID1`, `ID2`, ... in first-seen
/// order; keywords and non-identifier tokens pass through verbatim
pub fn normalize_identifiers(tokens: &[String]) -> Vec<String> {
    let mut aliases: HashMap<&str, String> = HashMap::new();
    let mut next = 1usize;
    tokens
        .iter()
        .map(|t| {
            if is_identifier(t) && !is_keyword(t) {
                aliases
                    .entry(t.as_str())
                    .or_insert_with(|| {
                        let alias = format!("ID{}", next);
                        next += 1;
                        alias
                    })
                    .clone()
            } else {
                t.clone()
            }
        })
        .collect()
}

/// All contiguous k-token windows, each joined with a single space
///
/// Empty when the stream is shorter than `k`.
pub fn shingle_set(tokens: &[String], k: usize) -> HashSet<String> {
    if tokens.len() < k {
        return HashSet::new();
    }
    tokens.windows(k).map(|w| w.join(" ")).collect()
}

/// Multiset of tokens
pub fn token_bag(tokens: &[String]) -> HashMap<String, u32> {
    let mut bag = HashMap::new();
    for t in tokens {
        *bag.entry(t.clone()).or_insert(0u32) += 1;
    }
    bag
}

/// Set of non-keyword identifiers from the raw stream
pub fn identifier_set(tokens: &[String]) -> HashSet<String> {
    tokens
        .iter()
        .filter(|t| is_identifier(t) && !is_keyword(t))
        .cloned()
        .collect()
}

/// Set of non-keyword identifiers immediately followed by `(`
///
/// No scoping and no definition-vs-call distinction.
pub fn call_set(tokens: &[String]) -> HashSet<String> {
    tokens
        .windows(2)
        .filter(|w| is_identifier(&w[0]) && !is_keyword(&w[0]) && w[1] == "(")
        .map(|w| w[0].clone())
        .collect()
}

fn control_tag(token: &str) -> Option<&'static str> {
    let lower = token.to_ascii_lowercase();
    let tag = match lower.as_str() {
        "if" => "IF",
        "else" => "ELSE",
        "for" => "FOR",
        "while" => "WHILE",
        "do" => "DO",
        "switch" => "SWITCH",
        "case" => "CASE",
        "default" => "DEFAULT",
        "return" => "RETURN",
        "break" => "BREAK",
        "continue" => "CONTINUE",
        _ => return None,
    };
    Some(tag)
}

/// Compressed control-flow stream over the raw token stream
///
/// Control keywords emit their uppercase tag, braces emit `BRACE{`/`BRACE}`,
/// `;` emits `SEMI`. Consecutive duplicates collapse, so the result never
/// holds two equal adjacent elements.
pub fn control_stream(tokens: &[String]) -> Vec<String> {
    let mut stream: Vec<String> = Vec::new();
    for t in tokens {
        let symbol = if let Some(tag) = control_tag(t) {
            Some(tag.to_string())
        } else if t == "{" || t == "}" {
            Some(format!("BRACE{}", t))
        } else if t == ";" {
            Some("SEMI".to_string())
        } else {
            None
        };
        if let Some(s) = symbol {
            if stream.last() != Some(&s) {
                stream.push(s);
            }
        }
    }
    stream
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Map identifier runs to `ID` and number runs (`\d+(\.\d+)?`) to `NUM`
fn map_ids_and_nums(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if lexer::is_ident_start(c) {
            while i < chars.len() && lexer::is_ident_continue(chars[i]) {
                i += 1;
            }
            out.push_str("ID");
        } else if c.is_ascii_digit() {
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            out.push_str("NUM");
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn init_class(stripped: &str) -> &'static str {
    if stripped.is_empty() {
        "NONE"
    } else if stripped.contains('=') {
        "ASSIGN_OR_DECL"
    } else {
        "OTHER"
    }
}

fn cond_class(stripped: &str) -> &'static str {
    if stripped.is_empty() {
        return "NONE";
    }
    let s = map_ids_and_nums(stripped);
    if s.contains("ID<NUM") || s.contains("ID<=NUM") {
        "ID<NUM"
    } else if s.contains("ID>NUM") || s.contains("ID>=NUM") {
        "ID>NUM"
    } else if s.contains("ID==ID") || s.contains("ID==NUM") {
        "EQ"
    } else {
        "COND"
    }
}

fn incr_class(stripped: &str) -> &'static str {
    if stripped.is_empty() {
        "NONE"
    } else if stripped.contains("++") || stripped.contains("--") {
        "INCDEC"
    } else if stripped.contains("+=")
        || stripped.contains("-=")
        // Literal textual test against the stripped header text.
        || stripped.contains("=ID+NUM")
        || stripped.contains("=ID-NUM")
    {
        "ARITH"
    } else {
        "OTHER"
    }
}

fn for_signature(inside: &str) -> String {
    let mut parts: Vec<&str> = inside.split(';').collect();
    while parts.len() < 3 {
        parts.push("");
    }
    let init = strip_whitespace(parts[0]);
    let cond = strip_whitespace(parts[1]);
    let incr = strip_whitespace(parts[2]);
    format!(
        "FOR[{};{};{}]",
        init_class(&init),
        cond_class(&cond),
        incr_class(&incr)
    )
}

fn while_class(inside: &str) -> &'static str {
    let s = map_ids_and_nums(&strip_whitespace(inside));
    if s.contains("ID<NUM") || s.contains("ID>NUM") {
        "CMP_NUM"
    } else if s.contains("ID") && !s.contains("NUM") {
        "COND_ID"
    } else {
        "COND"
    }
}

/// Find the whole word `word` at or after `from`, honoring word boundaries
fn find_word(chars: &[char], word: &str, from: usize) -> Option<usize> {
    let w: Vec<char> = word.chars().collect();
    let n = chars.len();
    if w.len() > n {
        return None;
    }
    let mut i = from;
    while i + w.len() <= n {
        if chars[i..i + w.len()] == w[..]
            && (i == 0 || !lexer::is_ident_continue(chars[i - 1]))
            && (i + w.len() == n || !lexer::is_ident_continue(chars[i + w.len()]))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Index of the `)` balancing the `(` at `open`, by depth counting
fn find_matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Scan the masked source for `for`/`while` headers and collect their
/// normalized signatures
pub fn loop_signatures(masked: &str) -> HashSet<String> {
    let chars: Vec<char> = masked.chars().collect();
    let n = chars.len();
    let mut sigs = HashSet::new();
    let mut i = 0;

    while i < n {
        let next_for = find_word(&chars, "for", i);
        let next_while = find_word(&chars, "while", i);
        let (start, word_len, is_for) = match (next_for, next_while) {
            (Some(f), Some(w)) if f < w => (f, 3, true),
            (Some(f), None) => (f, 3, true),
            (_, Some(w)) => (w, 5, false),
            (None, None) => break,
        };

        i = start + word_len;
        let mut j = i;
        while j < n && chars[j].is_whitespace() {
            j += 1;
        }
        if j >= n || chars[j] != '(' {
            continue;
        }
        let Some(close) = find_matching_paren(&chars, j) else {
            continue;
        };
        let inside: String = chars[j + 1..close].iter().collect();
        let sig = if is_for {
            for_signature(&inside)
        } else {
            format!("WHILE[{}]", while_class(&inside))
        };
        sigs.insert(sig);
        i = close + 1;
    }

    sigs
}

/// Derive the full feature bundle from already-decoded source text
///
/// The content hash is filled in by `extract_file`, which owns the raw
/// bytes.
pub fn extract_from_source(code: &str, config: &AnalysisConfig) -> Features {
    let masked = lexer::mask_source(code);
    let raw = lexer::tokenize(&masked);

    if raw.len() < config.min_tokens {
        return Features {
            too_short: true,
            ..Features::default()
        };
    }

    let normalized = if config.normalize_identifiers {
        normalize_identifiers(&raw)
    } else {
        raw.clone()
    };

    Features {
        too_short: false,
        error: None,
        content_hash: String::new(),
        shingles: shingle_set(&normalized, config.k),
        token_freq: token_bag(&normalized),
        idents: identifier_set(&raw),
        calls: call_set(&raw),
        control: control_stream(&raw),
        loop_sigs: loop_signatures(&masked),
        tokens_norm: normalized,
    }
}

/// Read one file and extract its features
///
/// I/O failures are recorded on the bundle instead of propagating; a failed
/// file is skipped in every pair but never aborts the batch.
pub fn extract_file(path: &Path, config: &AnalysisConfig) -> Features {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => return Features::from_error(format!("{}: {}", path.display(), e)),
    };
    let code = String::from_utf8_lossy(&bytes);
    let mut features = extract_from_source(&code, config);
    if !features.too_short {
        features.content_hash = blake3::hash(&bytes).to_hex().to_string();
    }
    features
}
