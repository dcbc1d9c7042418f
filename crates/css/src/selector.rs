//! Selector model and parser.
//!
//! Parsing is strict: anything a browser's `insertRule` / `Element.matches`
//! would reject (dangling combinators, unknown pseudo-classes, stray
//! delimiters such as a leading `!`) is reported as a [`CssError`].

use crate::error::CssError;
use crate::token::{CssToken, CssTokenizer};

/// Combinator between compound selectors in a complex selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: ancestor descendant
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

/// Attribute selector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=val]`
    Eq,
    /// `[attr~=val]`
    Includes,
    /// `[attr|=val]`
    DashMatch,
    /// `[attr^=val]`
    Prefix,
    /// `[attr$=val]`
    Suffix,
    /// `[attr*=val]`
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    /// `:nth-child(an+b)` as `(a, b)`.
    NthChild(i32, i32),
    /// `:nth-last-child(an+b)` as `(a, b)`.
    NthLastChild(i32, i32),
    /// `:not(a, b, …)`; each argument is a compound selector.
    Not(Vec<CompoundSelector>),
    Checked,
    Disabled,
    Enabled,
    /// Interaction states. A headless document never enters them.
    Hover,
    Active,
    Focus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoElement {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Type(String),
    Universal,
    Id(String),
    Class(String),
    Attribute {
        name: String,
        op: AttrOp,
        value: Option<String>,
    },
    PseudoClass(PseudoClass),
    PseudoElement(PseudoElement),
}

/// A sequence of simple selectors with no combinator between them (`div.a#b`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

impl CompoundSelector {
    pub fn pseudo_element(&self) -> Option<PseudoElement> {
        self.simples.iter().find_map(|s| match s {
            SimpleSelector::PseudoElement(pe) => Some(*pe),
            _ => None,
        })
    }
}

/// A chain of compound selectors joined by combinators.
///
/// Stored right-to-left: `parts[0]` is the subject. Each entry carries the
/// combinator that leads to the *next* entry; the last one has `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<(CompoundSelector, Option<Combinator>)>,
}

impl ComplexSelector {
    pub fn subject(&self) -> &CompoundSelector {
        &self.parts[0].0
    }
}

/// CSS specificity `(a, b, c)`: ids, classes/attributes/pseudo-classes,
/// types/pseudo-elements. Ordered lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    pub a: u32,
    pub b: u32,
    pub c: u32,
}

impl Specificity {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { a, b, c }
    }

    fn add(self, other: Specificity) -> Specificity {
        Specificity::new(self.a + other.a, self.b + other.b, self.c + other.c)
    }
}

pub fn compute_specificity(selector: &ComplexSelector) -> Specificity {
    selector
        .parts
        .iter()
        .fold(Specificity::default(), |acc, (compound, _)| {
            acc.add(compound_specificity(compound))
        })
}

fn compound_specificity(compound: &CompoundSelector) -> Specificity {
    compound
        .simples
        .iter()
        .fold(Specificity::default(), |acc, simple| {
            acc.add(match simple {
                SimpleSelector::Id(_) => Specificity::new(1, 0, 0),
                SimpleSelector::Class(_) | SimpleSelector::Attribute { .. } => {
                    Specificity::new(0, 1, 0)
                }
                // :not() takes the specificity of its most specific argument.
                SimpleSelector::PseudoClass(PseudoClass::Not(args)) => args
                    .iter()
                    .map(compound_specificity)
                    .max()
                    .unwrap_or_default(),
                SimpleSelector::PseudoClass(_) => Specificity::new(0, 1, 0),
                SimpleSelector::Type(_) | SimpleSelector::PseudoElement(_) => {
                    Specificity::new(0, 0, 1)
                }
                SimpleSelector::Universal => Specificity::default(),
            })
        })
}

/// Parse a comma-separated selector list.
pub fn parse_selector_list(input: &str) -> Result<Vec<ComplexSelector>, CssError> {
    let tokens = CssTokenizer::new(input).tokenize_all();
    parse_selector_list_from_tokens(&tokens)
}

/// Parse a selector list from an already-tokenized prelude.
pub fn parse_selector_list_from_tokens(
    tokens: &[CssToken],
) -> Result<Vec<ComplexSelector>, CssError> {
    let mut parser = SelectorParser { tokens, pos: 0 };
    let mut list = Vec::new();
    loop {
        parser.skip_whitespace();
        list.push(parser.complex()?);
        parser.skip_whitespace();
        match parser.peek() {
            None => return Ok(list),
            Some(CssToken::Comma) => parser.pos += 1,
            Some(other) => return Err(CssError::UnexpectedToken(format!("{other:?}"))),
        }
    }
}

struct SelectorParser<'a> {
    tokens: &'a [CssToken],
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn peek(&self) -> Option<&'a CssToken> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a CssToken> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek() == Some(&CssToken::Whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn complex(&mut self) -> Result<ComplexSelector, CssError> {
        let mut ltr: Vec<(CompoundSelector, Option<Combinator>)> = Vec::new();
        let first = self.compound()?;
        ltr.push((first, None));

        loop {
            let had_ws = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(CssToken::Comma) => break,
                Some(CssToken::Delim('>')) => Combinator::Child,
                Some(CssToken::Delim('+')) => Combinator::NextSibling,
                Some(CssToken::Delim('~')) => Combinator::SubsequentSibling,
                Some(_) if had_ws => Combinator::Descendant,
                Some(other) => return Err(CssError::UnexpectedToken(format!("{other:?}"))),
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }
            let compound = self.compound()?;
            ltr.push((compound, Some(combinator)));
        }

        // Left-to-right, each combinator says how a compound relates to the one
        // before it, which is exactly the right-to-left traversal step.
        ltr.reverse();
        Ok(ComplexSelector { parts: ltr })
    }

    fn compound(&mut self) -> Result<CompoundSelector, CssError> {
        let mut simples = Vec::new();

        match self.peek() {
            Some(CssToken::Ident(name)) => {
                simples.push(SimpleSelector::Type(name.to_ascii_lowercase()));
                self.pos += 1;
            }
            Some(CssToken::Delim('*')) => {
                simples.push(SimpleSelector::Universal);
                self.pos += 1;
            }
            _ => {}
        }

        loop {
            if simples
                .iter()
                .any(|s| matches!(s, SimpleSelector::PseudoElement(_)))
                && matches!(
                    self.peek(),
                    Some(CssToken::Hash { .. })
                        | Some(CssToken::Delim('.'))
                        | Some(CssToken::LBracket)
                        | Some(CssToken::Colon)
                )
            {
                return Err(CssError::UnexpectedToken("after pseudo-element".into()));
            }
            match self.peek() {
                Some(CssToken::Hash { value, is_id: true }) => {
                    simples.push(SimpleSelector::Id(value.clone()));
                    self.pos += 1;
                }
                Some(CssToken::Hash { value, .. }) => {
                    return Err(CssError::UnexpectedToken(format!("#{value}")));
                }
                Some(CssToken::Delim('.')) => {
                    self.pos += 1;
                    match self.bump() {
                        Some(CssToken::Ident(name)) => {
                            simples.push(SimpleSelector::Class(name.clone()))
                        }
                        Some(other) => {
                            return Err(CssError::UnexpectedToken(format!("{other:?}")));
                        }
                        None => return Err(CssError::UnexpectedEof),
                    }
                }
                Some(CssToken::LBracket) => {
                    self.pos += 1;
                    simples.push(self.attribute()?);
                }
                Some(CssToken::Colon) => {
                    self.pos += 1;
                    simples.push(self.pseudo()?);
                }
                _ => break,
            }
        }

        if simples.is_empty() {
            return match self.peek() {
                None => Err(CssError::EmptySelector),
                Some(other) => Err(CssError::UnexpectedToken(format!("{other:?}"))),
            };
        }
        Ok(CompoundSelector { simples })
    }

    fn attribute(&mut self) -> Result<SimpleSelector, CssError> {
        self.skip_whitespace();
        let name = match self.bump() {
            Some(CssToken::Ident(n)) => n.clone(),
            _ => return Err(CssError::MalformedAttribute),
        };
        self.skip_whitespace();

        let op = match self.bump() {
            Some(CssToken::RBracket) => {
                return Ok(SimpleSelector::Attribute {
                    name,
                    op: AttrOp::Exists,
                    value: None,
                });
            }
            Some(CssToken::Delim('=')) => AttrOp::Eq,
            Some(CssToken::Delim(c)) => {
                let op = match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => return Err(CssError::MalformedAttribute),
                };
                if self.bump() != Some(&CssToken::Delim('=')) {
                    return Err(CssError::MalformedAttribute);
                }
                op
            }
            _ => return Err(CssError::MalformedAttribute),
        };

        self.skip_whitespace();
        let value = match self.bump() {
            Some(CssToken::Ident(v)) | Some(CssToken::String(v)) => v.clone(),
            _ => return Err(CssError::MalformedAttribute),
        };
        self.skip_whitespace();
        if self.bump() != Some(&CssToken::RBracket) {
            return Err(CssError::MalformedAttribute);
        }
        Ok(SimpleSelector::Attribute {
            name,
            op,
            value: Some(value),
        })
    }

    fn pseudo(&mut self) -> Result<SimpleSelector, CssError> {
        if self.peek() == Some(&CssToken::Colon) {
            self.pos += 1;
            return match self.bump() {
                Some(CssToken::Ident(name)) => pseudo_element(name),
                _ => Err(CssError::UnexpectedEof),
            };
        }

        match self.bump() {
            Some(CssToken::Ident(name)) => {
                let lower = name.to_ascii_lowercase();
                let pc = match lower.as_str() {
                    "root" => PseudoClass::Root,
                    "empty" => PseudoClass::Empty,
                    "first-child" => PseudoClass::FirstChild,
                    "last-child" => PseudoClass::LastChild,
                    "only-child" => PseudoClass::OnlyChild,
                    "first-of-type" => PseudoClass::FirstOfType,
                    "last-of-type" => PseudoClass::LastOfType,
                    "only-of-type" => PseudoClass::OnlyOfType,
                    "checked" => PseudoClass::Checked,
                    "disabled" => PseudoClass::Disabled,
                    "enabled" => PseudoClass::Enabled,
                    "hover" => PseudoClass::Hover,
                    "active" => PseudoClass::Active,
                    "focus" => PseudoClass::Focus,
                    // Legacy single-colon pseudo-elements.
                    "before" | "after" => return pseudo_element(&lower),
                    _ => return Err(CssError::UnknownPseudoClass(lower)),
                };
                Ok(SimpleSelector::PseudoClass(pc))
            }
            Some(CssToken::Function(name)) => {
                let lower = name.to_ascii_lowercase();
                let pc = match lower.as_str() {
                    "nth-child" => {
                        let (a, b) = self.nth_args()?;
                        PseudoClass::NthChild(a, b)
                    }
                    "nth-last-child" => {
                        let (a, b) = self.nth_args()?;
                        PseudoClass::NthLastChild(a, b)
                    }
                    "not" => PseudoClass::Not(self.not_args()?),
                    _ => return Err(CssError::UnknownPseudoClass(lower)),
                };
                Ok(SimpleSelector::PseudoClass(pc))
            }
            Some(other) => Err(CssError::UnexpectedToken(format!("{other:?}"))),
            None => Err(CssError::UnexpectedEof),
        }
    }

    fn not_args(&mut self) -> Result<Vec<CompoundSelector>, CssError> {
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            args.push(self.compound()?);
            self.skip_whitespace();
            match self.bump() {
                Some(CssToken::Comma) => continue,
                Some(CssToken::RParen) => return Ok(args),
                Some(other) => return Err(CssError::UnexpectedToken(format!("{other:?}"))),
                None => return Err(CssError::UnexpectedEof),
            }
        }
    }

    fn nth_args(&mut self) -> Result<(i32, i32), CssError> {
        let mut args = Vec::new();
        loop {
            match self.bump() {
                Some(CssToken::RParen) => break,
                Some(CssToken::Whitespace) => {}
                Some(tok) => args.push(tok),
                None => return Err(CssError::UnexpectedEof),
            }
        }
        parse_an_plus_b(&args).ok_or(CssError::MalformedNth)
    }
}

fn pseudo_element(name: &str) -> Result<SimpleSelector, CssError> {
    match name.to_ascii_lowercase().as_str() {
        "before" => Ok(SimpleSelector::PseudoElement(PseudoElement::Before)),
        "after" => Ok(SimpleSelector::PseudoElement(PseudoElement::After)),
        other => Err(CssError::UnknownPseudoElement(other.to_string())),
    }
}

/// Parse the `an+b` microsyntax from the non-whitespace argument tokens.
fn parse_an_plus_b(args: &[&CssToken]) -> Option<(i32, i32)> {
    let as_int = |v: f64| (v.fract() == 0.0).then_some(v as i32);

    let (a, rest, tail): (i32, String, &[&CssToken]) = match args {
        [CssToken::Ident(s)] if s.eq_ignore_ascii_case("odd") => return Some((2, 1)),
        [CssToken::Ident(s)] if s.eq_ignore_ascii_case("even") => return Some((2, 0)),
        [CssToken::Number(b)] => return Some((0, as_int(*b)?)),
        [CssToken::Dimension { value, unit }, tail @ ..] => {
            let rest = unit.to_ascii_lowercase().strip_prefix('n')?.to_string();
            (as_int(*value)?, rest, tail)
        }
        [CssToken::Delim('+'), CssToken::Ident(s), tail @ ..] => {
            let rest = s.to_ascii_lowercase().strip_prefix('n')?.to_string();
            (1, rest, tail)
        }
        [CssToken::Ident(s), tail @ ..] => {
            let lower = s.to_ascii_lowercase();
            if let Some(rest) = lower.strip_prefix("-n") {
                (-1, rest.to_string(), tail)
            } else {
                (1, lower.strip_prefix('n')?.to_string(), tail)
            }
        }
        _ => return None,
    };

    let b = match (rest.as_str(), tail) {
        ("", []) => 0,
        ("", [CssToken::Number(b)]) => as_int(*b)?,
        ("", [CssToken::Delim('+'), CssToken::Number(b)]) if *b >= 0.0 => as_int(*b)?,
        ("", [CssToken::Delim('-'), CssToken::Number(b)]) if *b >= 0.0 => -as_int(*b)?,
        ("-", [CssToken::Number(b)]) if *b >= 0.0 => -as_int(*b)?,
        (digits, []) if digits.starts_with('-') => -digits[1..].parse::<i32>().ok()?,
        _ => return None,
    };
    Some((a, b))
}
