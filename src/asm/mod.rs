//! Architecture-aware assembly tokenizer and normalizer.
//!
//! Produces two artifacts from raw assembly text: a canonical normalized
//! string (used for checksumming) and an ordered token list (used for
//! shingling). Never fails on content — malformed or empty input degrades
//! to empty outputs rather than an error.

mod registers;

pub use registers::is_register;

/// Size-prefix keywords that normalize to `MEM_SIZE`.
const SIZE_PREFIXES: &[&str] = &["DWORD", "WORD", "BYTE", "QWORD", "PTR"];

/// Strip a NASM-style `;` comment from a single line, returning the
/// comment-free prefix.
fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Split a comment-stripped line into raw lexical tokens.
///
/// Tokens are maximal runs of alphanumeric/`_`/`$`/`.` characters, plus
/// `:` emitted as its own single-character token so label boundaries
/// survive into the token stream.
fn lex_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' || c == '$' || c == '.' {
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if c == ':' {
            tokens.push(":".to_string());
        }
        // All other punctuation (commas, brackets, +, -) is a separator
        // and otherwise discarded.
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Raw (non-normalized) token values for the whole snippet, stripped of
/// comments, used by [`normalize`].
fn raw_tokens(code: &str) -> Vec<String> {
    code.lines()
        .flat_map(|line| lex_line(strip_comment(line)))
        .filter(|t| t != ":")
        .collect()
}

/// Produce the canonical normalized string used for checksumming: the
/// whitespace-joined concatenation of every non-comment, non-whitespace
/// token in `code`, case-folded to uppercase so that checksums (and thus
/// deduplication) are invariant under mnemonic/register case alone.
pub fn normalize(code: &str) -> String {
    raw_tokens(code)
        .iter()
        .map(|t| t.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if `token` is a decimal, hex (`0x...`), octal, or binary
/// numeric literal.
fn is_numeric_literal(token: &str) -> bool {
    let t = token.trim_start_matches('-');
    if t.is_empty() {
        return false;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(bin) = t.strip_prefix("0b").or_else(|| t.strip_prefix("0B")) {
        return !bin.is_empty() && bin.chars().all(|c| c == '0' || c == '1');
    }
    // Trailing h/o/b radix suffixes as used in NASM-style immediates.
    let (body, suffix) = t.split_at(t.len() - 1);
    if matches!(suffix, "h" | "H") && !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit())
    {
        return true;
    }
    t.chars().all(|c| c.is_ascii_digit())
}

/// Returns true if `token` is a size-prefix keyword (`dword`, `word`,
/// `byte`, `qword`, `ptr`), case-insensitive.
fn is_size_prefix(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    SIZE_PREFIXES.contains(&upper.as_str())
}

/// Branch/call mnemonics whose sole operand is a jump target rather than an
/// ordinary value, used to tag label *references* (as opposed to label
/// *definitions*, which are recognized by a trailing `:`).
static BRANCH_MNEMONICS: &[&str] = &[
    "JMP", "JE", "JNE", "JZ", "JNZ", "JG", "JGE", "JL", "JLE", "JA", "JAE", "JB", "JBE", "JC",
    "JNC", "JO", "JNO", "JS", "JNS", "JP", "JNP", "JCXZ", "JECXZ", "JRCXZ", "LOOP", "LOOPE",
    "LOOPNE", "LOOPZ", "LOOPNZ", "CALL",
];

fn is_branch_mnemonic(token: &str) -> bool {
    BRANCH_MNEMONICS.contains(&token.to_ascii_uppercase().as_str())
}

/// A single normalized (or raw) token in a tokenized stream.
pub type Token = String;

/// Tokenize assembly `code` into an ordered list of uppercased token
/// values. When `normalize` is true, registers collapse to `REG`, numeric
/// literals to `IMM`, labels to `LABEL`, and size prefixes to `MEM_SIZE`.
///
/// A token is recognized as a label either where it is *defined* (`name:`)
/// or where it is the operand of a branch/call mnemonic (e.g. `jnz
/// copy_loop`), mirroring a lexer that tags jump targets by syntactic
/// position rather than requiring the target to be defined in the same
/// snippet.
pub fn tokenize(code: &str, normalize: bool) -> Vec<Token> {
    let mut out = Vec::new();
    for line in code.lines() {
        let lexed = lex_raw_with_labels(strip_comment(line));
        let mut prev_raw: Option<String> = None;
        for (raw, is_label_def) in lexed {
            let is_label = is_label_def || prev_raw.as_deref().is_some_and(is_branch_mnemonic);
            prev_raw = Some(raw.clone());

            if !normalize {
                out.push(raw.to_ascii_uppercase());
                continue;
            }
            if is_register(&raw) {
                out.push("REG".to_string());
            } else if is_numeric_literal(&raw) {
                out.push("IMM".to_string());
            } else if is_label {
                out.push("LABEL".to_string());
            } else if is_size_prefix(&raw) {
                out.push("MEM_SIZE".to_string());
            } else {
                out.push(raw.to_ascii_uppercase());
            }
        }
    }
    out
}

/// Lex a comment-stripped line into `(token, is_label)` pairs. A token is
/// flagged as a label when it is immediately followed by `:`.
fn lex_raw_with_labels(line: &str) -> Vec<(String, bool)> {
    let raw = lex_line(line);
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == ":" {
            i += 1;
            continue;
        }
        let is_label = raw.get(i + 1).map(|t| t == ":").unwrap_or(false);
        out.push((raw[i].clone(), is_label));
        i += 1;
    }
    out
}
