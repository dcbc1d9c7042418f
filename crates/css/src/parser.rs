//! Rule and declaration parsing.
//!
//! Two entry points with different error policies: [`parse_rule`] is strict
//! (the `insertRule` contract: exactly one valid rule or an error) while
//! [`parse_stylesheet`] skips anything it cannot understand, as a `<style>`
//! element does.

use crate::error::CssError;
use crate::selector::{ComplexSelector, parse_selector_list_from_tokens};
use crate::token::{CssToken, CssTokenizer};

/// A component value inside a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    Keyword(String),
    String(String),
    Number(f64),
    Percentage(f64),
    Dimension { value: f64, unit: String },
    Function { name: String, args: Vec<CssValue> },
    Comma,
    Delim(char),
}

impl CssValue {
    /// Interpret a `<time>` value in milliseconds.
    pub fn as_time_ms(&self) -> Option<f64> {
        match self {
            CssValue::Dimension { value, unit } if unit.eq_ignore_ascii_case("s") => {
                Some(value * 1000.0)
            }
            CssValue::Dimension { value, unit } if unit.eq_ignore_ascii_case("ms") => Some(*value),
            _ => None,
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            CssValue::Keyword(k) => Some(k),
            _ => None,
        }
    }
}

/// `property: value [!important]`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Lower-cased property name.
    pub name: String,
    pub value: Vec<CssValue>,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selectors: Vec<ComplexSelector>,
    pub declarations: Vec<Declaration>,
}

/// One block inside `@keyframes`, e.g. `from, 50% { … }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    /// Offsets in `0.0..=1.0`.
    pub offsets: Vec<f32>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesRule {
    pub name: String,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    Style(StyleRule),
    Keyframes(KeyframesRule),
}

impl CssRule {
    pub fn keyframes_name(&self) -> Option<&str> {
        match self {
            CssRule::Keyframes(k) => Some(&k.name),
            CssRule::Style(_) => None,
        }
    }
}

/// Parse exactly one rule.
pub fn parse_rule(input: &str) -> Result<CssRule, CssError> {
    let tokens = CssTokenizer::new(input).tokenize_all();
    let mut pos = 0;
    let rule = match next_rule(&tokens, &mut pos) {
        Some(rule) => rule?,
        None => return Err(CssError::RuleCount(0)),
    };
    skip_whitespace(&tokens, &mut pos);
    if pos < tokens.len() {
        return Err(CssError::RuleCount(2));
    }
    Ok(rule)
}

/// Parse a whole stylesheet, dropping rules that fail to parse.
pub fn parse_stylesheet(input: &str) -> Vec<CssRule> {
    let tokens = CssTokenizer::new(input).tokenize_all();
    let mut pos = 0;
    let mut rules = Vec::new();
    while let Some(rule) = next_rule(&tokens, &mut pos) {
        if let Ok(rule) = rule {
            rules.push(rule);
        }
    }
    rules
}

/// Parse the body of a declaration block, e.g. an inline `style` attribute.
pub fn parse_declaration_block(input: &str) -> Vec<Declaration> {
    let tokens = CssTokenizer::new(input).tokenize_all();
    declarations(&tokens)
}

fn skip_whitespace(tokens: &[CssToken], pos: &mut usize) {
    while tokens.get(*pos) == Some(&CssToken::Whitespace) {
        *pos += 1;
    }
}

/// Consume a `{ … }` block starting at `open` and return its inner tokens.
/// `pos` ends after the closing brace (or at end of input if unbalanced).
fn block<'a>(tokens: &'a [CssToken], open: usize, pos: &mut usize) -> &'a [CssToken] {
    let mut depth = 0usize;
    let mut i = open;
    while i < tokens.len() {
        match tokens[i] {
            CssToken::LBrace => depth += 1,
            CssToken::RBrace => {
                depth -= 1;
                if depth == 0 {
                    *pos = i + 1;
                    return &tokens[open + 1..i];
                }
            }
            _ => {}
        }
        i += 1;
    }
    *pos = tokens.len();
    &tokens[(open + 1).min(tokens.len())..]
}

/// Consume the next rule. Returns `None` once only whitespace remains.
fn next_rule(tokens: &[CssToken], pos: &mut usize) -> Option<Result<CssRule, CssError>> {
    skip_whitespace(tokens, pos);
    if *pos >= tokens.len() {
        return None;
    }

    let start = *pos;
    let mut i = start;
    while i < tokens.len() && !matches!(tokens[i], CssToken::LBrace | CssToken::Semicolon) {
        i += 1;
    }
    let prelude = &tokens[start..i];

    if i >= tokens.len() {
        *pos = tokens.len();
        return Some(Err(CssError::UnexpectedEof));
    }
    if tokens[i] == CssToken::Semicolon {
        *pos = i + 1;
        return Some(Err(match prelude.first() {
            Some(CssToken::AtKeyword(name)) => CssError::UnsupportedAtRule(name.to_ascii_lowercase()),
            _ => CssError::UnexpectedToken("`;` in rule prelude".into()),
        }));
    }

    let body = block(tokens, i, pos);

    if let Some(CssToken::AtKeyword(name)) = prelude.first() {
        let lower = name.to_ascii_lowercase();
        return Some(match lower.as_str() {
            "keyframes" | "-webkit-keyframes" | "-moz-keyframes" => {
                keyframes_rule(&prelude[1..], body).map(CssRule::Keyframes)
            }
            _ => Err(CssError::UnsupportedAtRule(lower)),
        });
    }

    Some(parse_selector_list_from_tokens(prelude).map(|selectors| {
        CssRule::Style(StyleRule {
            selectors,
            declarations: declarations(body),
        })
    }))
}

fn keyframes_rule(prelude: &[CssToken], body: &[CssToken]) -> Result<KeyframesRule, CssError> {
    let significant: Vec<&CssToken> = prelude
        .iter()
        .filter(|t| **t != CssToken::Whitespace)
        .collect();
    let name = match significant.as_slice() {
        [CssToken::Ident(n)] if !n.eq_ignore_ascii_case("none") => n.clone(),
        [CssToken::String(n)] => n.clone(),
        _ => return Err(CssError::InvalidKeyframesName),
    };

    let mut keyframes = Vec::new();
    let mut pos = 0;
    loop {
        skip_whitespace(body, &mut pos);
        if pos >= body.len() {
            break;
        }
        let start = pos;
        while pos < body.len() && body[pos] != CssToken::LBrace {
            pos += 1;
        }
        if pos >= body.len() {
            return Err(CssError::UnexpectedEof);
        }
        let offsets = keyframe_offsets(&body[start..pos])?;
        let inner = block(body, pos, &mut pos);
        keyframes.push(Keyframe {
            offsets,
            declarations: declarations(inner),
        });
    }

    Ok(KeyframesRule { name, keyframes })
}

fn keyframe_offsets(prelude: &[CssToken]) -> Result<Vec<f32>, CssError> {
    let mut offsets = Vec::new();
    for part in prelude.split(|t| *t == CssToken::Comma) {
        let significant: Vec<&CssToken> =
            part.iter().filter(|t| **t != CssToken::Whitespace).collect();
        let offset = match significant.as_slice() {
            [CssToken::Ident(k)] if k.eq_ignore_ascii_case("from") => 0.0,
            [CssToken::Ident(k)] if k.eq_ignore_ascii_case("to") => 1.0,
            [CssToken::Percentage(p)] if (0.0..=100.0).contains(p) => (*p / 100.0) as f32,
            _ => return Err(CssError::InvalidKeyframeSelector),
        };
        offsets.push(offset);
    }
    Ok(offsets)
}

/// Parse declarations, skipping malformed ones.
fn declarations(tokens: &[CssToken]) -> Vec<Declaration> {
    let mut out = Vec::new();
    for chunk in split_top_level(tokens, |t| *t == CssToken::Semicolon) {
        if let Some(decl) = declaration(chunk) {
            out.push(decl);
        }
    }
    out
}

fn declaration(tokens: &[CssToken]) -> Option<Declaration> {
    let mut pos = 0;
    skip_whitespace(tokens, &mut pos);
    let name = match tokens.get(pos)? {
        CssToken::Ident(n) => n.to_ascii_lowercase(),
        _ => return None,
    };
    pos += 1;
    skip_whitespace(tokens, &mut pos);
    if tokens.get(pos) != Some(&CssToken::Colon) {
        return None;
    }
    pos += 1;

    let mut rest: Vec<&CssToken> = tokens[pos..]
        .iter()
        .filter(|t| **t != CssToken::Whitespace)
        .collect();

    let important = matches!(
        rest.as_slice(),
        [.., CssToken::Delim('!'), CssToken::Ident(imp)] if imp.eq_ignore_ascii_case("important")
    );
    if important {
        rest.truncate(rest.len() - 2);
    }
    if rest.is_empty() {
        return None;
    }

    let mut idx = 0;
    let value = values(&rest, &mut idx);
    Some(Declaration {
        name,
        value,
        important,
    })
}

fn values(tokens: &[&CssToken], idx: &mut usize) -> Vec<CssValue> {
    let mut out = Vec::new();
    while let Some(tok) = tokens.get(*idx) {
        *idx += 1;
        let value = match tok {
            CssToken::RParen => return out,
            CssToken::Ident(k) => CssValue::Keyword(k.to_ascii_lowercase()),
            CssToken::String(s) => CssValue::String(s.clone()),
            CssToken::Number(n) => CssValue::Number(*n),
            CssToken::Percentage(p) => CssValue::Percentage(*p),
            CssToken::Dimension { value, unit } => CssValue::Dimension {
                value: *value,
                unit: unit.to_ascii_lowercase(),
            },
            CssToken::Function(name) => CssValue::Function {
                name: name.to_ascii_lowercase(),
                args: values(tokens, idx),
            },
            CssToken::Comma => CssValue::Comma,
            CssToken::Delim(c) => CssValue::Delim(*c),
            CssToken::Hash { value, .. } => CssValue::Keyword(format!("#{value}")),
            _ => continue,
        };
        out.push(value);
    }
    out
}

/// Split on `sep` tokens that are not nested in parens or braces.
fn split_top_level(
    tokens: &[CssToken],
    sep: impl Fn(&CssToken) -> bool,
) -> Vec<&[CssToken]> {
    let mut chunks = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            CssToken::LParen | CssToken::Function(_) | CssToken::LBrace | CssToken::LBracket => {
                depth += 1
            }
            CssToken::RParen | CssToken::RBrace | CssToken::RBracket => depth -= 1,
            t if depth == 0 && sep(t) => {
                chunks.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    chunks.push(&tokens[start..]);
    chunks
}
