//! Selector Derivation
//!
//! Turns human-readable function signatures into canonical form
//! (`name(type1,type2)`) and hashes them into 4-byte selectors.
//!
//! ## Accepted input
//!
//! - encoded selectors: `0xa9059cbb` (validated and passed through)
//! - canonical signatures: `transfer(address,uint256)`
//! - Solidity-style declarations:
//!   `function transfer(address to, uint256 amount) external returns (bool)`
//!
//! Parameter names, data locations (`memory`, `calldata`, `storage`),
//! `indexed` and `payable` are dropped. Type aliases are expanded
//! (`uint` → `uint256`, `int` → `int256`, `byte` → `bytes1`). Tuples keep
//! their nesting and array suffixes.
//!
//! ## Hashing
//!
//! The hash is pluggable through [`SignatureHasher`]. [`Keccak256Hasher`]
//! implements the EVM convention (first four bytes of Keccak-256).

use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::constants::{limits, selector};
use crate::errors::{DiamondError, DiamondResult};
use crate::types::Selector;
use crate::{String, ToString, Vec};

// ============ Hashers ============

/// Maps a canonical signature to a selector
///
/// Implementations must be deterministic: equal canonical signatures
/// always produce equal selectors.
pub trait SignatureHasher {
    /// Hash a canonical signature (already validated)
    fn selector_of(&self, canonical: &str) -> Selector;
}

/// EVM selector hash: first 4 bytes of Keccak-256
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keccak256Hasher;

impl SignatureHasher for Keccak256Hasher {
    fn selector_of(&self, canonical: &str) -> Selector {
        truncate(&Keccak256::digest(canonical.as_bytes()))
    }
}

/// First 4 bytes of SHA-256
///
/// Not an EVM selector; useful where the hash must be swapped out, e.g.
/// when checking that planning does not depend on the concrete hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sha256Hasher;

impl SignatureHasher for Sha256Hasher {
    fn selector_of(&self, canonical: &str) -> Selector {
        truncate(&Sha256::digest(canonical.as_bytes()))
    }
}

fn truncate(digest: &[u8]) -> Selector {
    let mut bytes = [0u8; selector::LEN];
    bytes.copy_from_slice(&digest[..selector::LEN]);
    Selector(bytes)
}

// ============ Selector Derivation ============

/// Derive the selector of an encoded selector or a signature, using Keccak-256
pub fn to_selector(input: &str) -> DiamondResult<Selector> {
    to_selector_with(&Keccak256Hasher, input)
}

/// Derive the selector of an encoded selector or a signature with a custom hasher
pub fn to_selector_with<H: SignatureHasher + ?Sized>(
    hasher: &H,
    input: &str,
) -> DiamondResult<Selector> {
    let trimmed = input.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return trimmed.parse();
    }
    let canonical = canonical_signature(trimmed)?;
    Ok(hasher.selector_of(&canonical))
}

/// Canonical form of a human-readable function signature
///
/// # Errors
///
/// `MalformedSignature` on invalid names, unbalanced parentheses, empty
/// parameter types or anything that is not a function declaration.
pub fn canonical_signature(input: &str) -> DiamondResult<String> {
    let malformed = |reason| DiamondError::MalformedSignature {
        input: input.to_string(),
        reason,
    };

    let mut text = input.trim();
    if let Some(rest) = text.strip_prefix("function") {
        if rest.starts_with(char::is_whitespace) {
            text = rest.trim_start();
        }
    }

    let open = text.find('(').ok_or_else(|| malformed("missing parameter list"))?;
    let name = text[..open].trim_end();
    if !is_identifier(name) {
        return Err(malformed("invalid function name"));
    }

    let close = matching_paren(text, open).ok_or_else(|| malformed("unbalanced parentheses"))?;
    let params = &text[open + 1..close];

    // Modifiers and return clause after the parameter list are ignored,
    // but they still have to be well-formed.
    let trailer = text[close + 1..].trim();
    if !trailer.is_empty() {
        if !trailer.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(malformed("unexpected input after parameter list"));
        }
        if !parens_balanced(trailer) {
            return Err(malformed("unbalanced parentheses"));
        }
    }

    let types = canonical_params(params, 0).map_err(malformed)?;

    let mut out = String::with_capacity(name.len() + types.len() + 2);
    out.push_str(name);
    out.push('(');
    out.push_str(&types);
    out.push(')');
    Ok(out)
}

/// Canonical form of one ABI type (`uint` → `uint256`, tuples expanded)
pub fn canonical_type(ty: &str) -> DiamondResult<String> {
    canonical_param(ty, 0).map_err(|reason| DiamondError::MalformedSignature {
        input: ty.to_string(),
        reason,
    })
}

/// Returns true for a valid Solidity identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

// ============ Parsing Helpers ============

type ParseResult<T> = Result<T, &'static str>;

/// Comma-joined canonical types of a parameter list body
fn canonical_params(params: &str, depth: usize) -> ParseResult<String> {
    if depth > limits::MAX_TUPLE_DEPTH {
        return Err("tuple nesting too deep");
    }
    if params.trim().is_empty() {
        return Ok(String::new());
    }

    let mut types = Vec::new();
    for param in split_top_level(params)? {
        types.push(canonical_param(param, depth)?);
    }
    Ok(types.join(","))
}

/// Canonical type of one parameter declaration (`uint amount`, `(uint,address)[] memory xs`)
fn canonical_param(param: &str, depth: usize) -> ParseResult<String> {
    let param = param.trim();
    if param.is_empty() {
        return Err("empty parameter type");
    }

    let tuple_body = param.strip_prefix("tuple").filter(|rest| rest.starts_with('('));
    if param.starts_with('(') || tuple_body.is_some() {
        let body = tuple_body.unwrap_or(param);
        let close = matching_paren(body, 0).ok_or("unbalanced parentheses")?;
        let inner = canonical_params(&body[1..close], depth + 1)?;
        let (suffix, rest) = split_array_suffix(&body[close + 1..])?;
        check_declaration_tail(rest)?;

        let mut out = String::with_capacity(inner.len() + suffix.len() + 2);
        out.push('(');
        out.push_str(&inner);
        out.push(')');
        out.push_str(suffix);
        return Ok(out);
    }

    let mut tokens = param.split_whitespace();
    let ty = tokens.next().ok_or("empty parameter type")?;
    let tail: Vec<&str> = tokens.collect();
    if tail.len() > 3 || tail.iter().any(|token| !is_identifier(token)) {
        return Err("invalid parameter declaration");
    }

    let base_len = ty.find('[').unwrap_or(ty.len());
    let (base, suffix) = ty.split_at(base_len);
    let (suffix, rest) = split_array_suffix(suffix)?;
    if !rest.is_empty() {
        return Err("invalid array suffix");
    }
    if !is_elementary_type(base) {
        return Err("invalid parameter type");
    }

    let mut out = String::with_capacity(ty.len() + 3);
    out.push_str(normalize_base(base));
    out.push_str(suffix);
    Ok(out)
}

/// Expands Solidity type aliases
fn normalize_base(base: &str) -> &str {
    match base {
        "uint" => "uint256",
        "int" => "int256",
        "byte" => "bytes1",
        "fixed" => "fixed128x18",
        "ufixed" => "ufixed128x18",
        other => other,
    }
}

/// Elementary ABI types; user-defined names never reach a selector
fn is_elementary_type(base: &str) -> bool {
    match base {
        "address" | "bool" | "string" | "bytes" | "function" | "byte" => return true,
        "uint" | "int" | "fixed" | "ufixed" => return true,
        _ => {}
    }
    if let Some(bits) = base.strip_prefix("uint").or_else(|| base.strip_prefix("int")) {
        return parse_width(bits).is_some_and(is_integer_width);
    }
    if let Some(size) = base.strip_prefix("bytes") {
        return parse_width(size).is_some_and(|n| (1..=32).contains(&n));
    }
    if let Some(spec) = base.strip_prefix("ufixed").or_else(|| base.strip_prefix("fixed")) {
        let Some((bits, decimals)) = spec.split_once('x') else {
            return false;
        };
        return parse_width(bits).is_some_and(is_integer_width)
            && parse_width(decimals).is_some_and(|n| n <= 80);
    }
    false
}

fn is_integer_width(bits: u32) -> bool {
    (8..=256).contains(&bits) && bits % 8 == 0
}

/// Decimal width without sign or leading zeros
fn parse_width(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

/// Splits a leading run of `[]` / `[N]` suffixes off `text`
fn split_array_suffix(text: &str) -> ParseResult<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut end = 0;
    while end < bytes.len() && bytes[end] == b'[' {
        let close = text[end..].find(']').ok_or("unbalanced brackets")? + end;
        if !text[end + 1..close].bytes().all(|b| b.is_ascii_digit()) {
            return Err("invalid array size");
        }
        end = close + 1;
    }
    Ok((&text[..end], &text[end..]))
}

/// After a tuple type only a data location, `indexed` and a name may follow
fn check_declaration_tail(rest: &str) -> ParseResult<()> {
    if rest.is_empty() {
        return Ok(());
    }
    if !rest.starts_with(char::is_whitespace) {
        return Err("invalid tuple declaration");
    }
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.len() > 3 || tokens.iter().any(|token| !is_identifier(token)) {
        return Err("invalid tuple declaration");
    }
    Ok(())
}

/// Splits on commas outside of parentheses
fn split_top_level(params: &str) -> ParseResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or("unbalanced parentheses")?,
            ',' if depth == 0 => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses");
    }
    parts.push(&params[start..]);
    Ok(parts)
}

/// Index of the parenthesis closing the one at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parens_balanced(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
