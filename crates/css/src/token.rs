//! CSS tokenizer.
//!
//! Covers the subset of CSS Syntax Level 3 needed to read selectors, style
//! rules and `@keyframes` blocks: identifiers, functions, at-keywords, hashes,
//! strings, numeric tokens and the structural punctuation. Comments are
//! dropped; runs of whitespace collapse into a single token.

/// A single CSS token.
#[derive(Debug, Clone, PartialEq)]
pub enum CssToken {
    Ident(String),
    /// An identifier immediately followed by `(`. The paren is consumed.
    Function(String),
    AtKeyword(String),
    /// `#name`. `is_id` is set when the name would also be a valid identifier.
    Hash { value: String, is_id: bool },
    String(String),
    Number(f64),
    Percentage(f64),
    Dimension { value: f64, unit: String },
    Whitespace,
    Colon,
    Semicolon,
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Delim(char),
}

/// Turns CSS source text into [`CssToken`]s.
pub struct CssTokenizer {
    chars: Vec<char>,
    pos: usize,
}

impl CssTokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize_all(&mut self) -> Vec<CssToken> {
        let mut out = Vec::new();
        while let Some(tok) = self.next_token() {
            out.push(tok);
        }
        out
    }

    /// Return the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<CssToken> {
        self.skip_comments();
        let ch = self.current()?;

        if is_whitespace(ch) {
            while self.current().is_some_and(is_whitespace) {
                self.pos += 1;
            }
            // A comment between two whitespace runs must not yield two tokens.
            self.skip_comments();
            while self.current().is_some_and(is_whitespace) {
                self.pos += 1;
            }
            return Some(CssToken::Whitespace);
        }

        let tok = match ch {
            '"' | '\'' => self.string(ch),
            '#' => {
                self.pos += 1;
                if self.current().is_some_and(is_name_char) || self.at_escape(self.pos) {
                    let is_id = self.starts_ident(self.pos);
                    CssToken::Hash {
                        value: self.name(),
                        is_id,
                    }
                } else {
                    CssToken::Delim('#')
                }
            }
            '@' => {
                self.pos += 1;
                if self.starts_ident(self.pos) {
                    CssToken::AtKeyword(self.name())
                } else {
                    CssToken::Delim('@')
                }
            }
            ':' => self.single(CssToken::Colon),
            ';' => self.single(CssToken::Semicolon),
            ',' => self.single(CssToken::Comma),
            '[' => self.single(CssToken::LBracket),
            ']' => self.single(CssToken::RBracket),
            '(' => self.single(CssToken::LParen),
            ')' => self.single(CssToken::RParen),
            '{' => self.single(CssToken::LBrace),
            '}' => self.single(CssToken::RBrace),
            _ if self.starts_number(self.pos) => self.numeric(),
            _ if self.starts_ident(self.pos) => self.ident_like(),
            _ => self.single(CssToken::Delim(ch)),
        };
        Some(tok)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }

    fn single(&mut self, tok: CssToken) -> CssToken {
        self.pos += 1;
        tok
    }

    fn skip_comments(&mut self) {
        while self.current() == Some('/') && self.at(self.pos + 1) == Some('*') {
            self.pos += 2;
            loop {
                match self.current() {
                    None => return,
                    Some('*') if self.at(self.pos + 1) == Some('/') => {
                        self.pos += 2;
                        break;
                    }
                    Some(_) => self.pos += 1,
                }
            }
        }
    }

    fn at_escape(&self, idx: usize) -> bool {
        self.at(idx) == Some('\\') && self.at(idx + 1).is_some_and(|c| c != '\n')
    }

    fn starts_ident(&self, idx: usize) -> bool {
        match self.at(idx) {
            Some('-') => match self.at(idx + 1) {
                Some(c) if is_name_start_char(c) || c == '-' => true,
                Some('\\') => self.at_escape(idx + 1),
                _ => false,
            },
            Some('\\') => self.at_escape(idx),
            Some(c) => is_name_start_char(c),
            None => false,
        }
    }

    fn starts_number(&self, idx: usize) -> bool {
        match self.at(idx) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+') | Some('-') => match self.at(idx + 1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('.') => self.at(idx + 2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            },
            Some('.') => self.at(idx + 1).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn escape(&mut self) -> char {
        // Caller has consumed the backslash.
        let Some(first) = self.current() else {
            return '\u{FFFD}';
        };
        self.pos += 1;
        if !first.is_ascii_hexdigit() {
            return first;
        }
        let mut code = first.to_digit(16).unwrap_or(0);
        let mut digits = 1;
        while digits < 6 {
            match self.current().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    code = code * 16 + d;
                    digits += 1;
                    self.pos += 1;
                }
                None => break,
            }
        }
        if self.current().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        char::from_u32(code).filter(|&c| c != '\0').unwrap_or('\u{FFFD}')
    }

    fn name(&mut self) -> String {
        let mut out = String::new();
        loop {
            match self.current() {
                Some(c) if is_name_char(c) => {
                    out.push(c);
                    self.pos += 1;
                }
                Some('\\') if self.at_escape(self.pos) => {
                    self.pos += 1;
                    out.push(self.escape());
                }
                _ => return out,
            }
        }
    }

    fn ident_like(&mut self) -> CssToken {
        let name = self.name();
        if self.current() == Some('(') {
            self.pos += 1;
            CssToken::Function(name)
        } else {
            CssToken::Ident(name)
        }
    }

    fn numeric(&mut self) -> CssToken {
        let start = self.pos;
        if matches!(self.current(), Some('+') | Some('-')) {
            self.pos += 1;
        }
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.current() == Some('.') && self.at(self.pos + 1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            let sign = usize::from(matches!(self.at(self.pos + 1), Some('+') | Some('-')));
            if self.at(self.pos + 1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1 + sign;
                while self.current().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let repr: String = self.chars[start..self.pos].iter().collect();
        let value = repr.parse::<f64>().unwrap_or(0.0);

        if self.starts_ident(self.pos) {
            return CssToken::Dimension {
                value,
                unit: self.name(),
            };
        }
        if self.current() == Some('%') {
            self.pos += 1;
            return CssToken::Percentage(value);
        }
        CssToken::Number(value)
    }

    fn string(&mut self, quote: char) -> CssToken {
        self.pos += 1;
        let mut out = String::new();
        while let Some(c) = self.current() {
            self.pos += 1;
            match c {
                _ if c == quote => break,
                '\n' => break,
                '\\' => match self.current() {
                    None => break,
                    Some('\n') => self.pos += 1,
                    Some(_) => out.push(self.escape()),
                },
                _ => out.push(c),
            }
        }
        CssToken::String(out)
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c.is_ascii_digit() || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<CssToken> {
        CssTokenizer::new(input).tokenize_all()
    }

    #[test]
    fn class_selector_tokens() {
        assert_eq!(
            lex(".test-div"),
            vec![CssToken::Delim('.'), CssToken::Ident("test-div".into())]
        );
    }

    #[test]
    fn keyframes_prelude() {
        assert_eq!(
            lex("@keyframes sentinel-1f{"),
            vec![
                CssToken::AtKeyword("keyframes".into()),
                CssToken::Whitespace,
                CssToken::Ident("sentinel-1f".into()),
                CssToken::LBrace,
            ]
        );
    }

    #[test]
    fn time_dimension() {
        assert_eq!(
            lex("0.0001s"),
            vec![CssToken::Dimension {
                value: 0.0001,
                unit: "s".into()
            }]
        );
    }

    #[test]
    fn percentage_and_number() {
        assert_eq!(
            lex("50% 3"),
            vec![
                CssToken::Percentage(50.0),
                CssToken::Whitespace,
                CssToken::Number(3.0)
            ]
        );
    }

    #[test]
    fn hash_and_function() {
        assert_eq!(
            lex("#main:not("),
            vec![
                CssToken::Hash {
                    value: "main".into(),
                    is_id: true
                },
                CssToken::Colon,
                CssToken::Function("not".into()),
            ]
        );
    }

    #[test]
    fn comments_collapse_into_whitespace() {
        assert_eq!(
            lex("a /* x */ b"),
            vec![
                CssToken::Ident("a".into()),
                CssToken::Whitespace,
                CssToken::Ident("b".into())
            ]
        );
    }

    #[test]
    fn strings_with_escapes() {
        assert_eq!(lex(r#""a\"b""#), vec![CssToken::String("a\"b".into())]);
        assert_eq!(lex("'x'"), vec![CssToken::String("x".into())]);
    }

    #[test]
    fn marker_is_a_delim() {
        assert_eq!(
            lex("!node-inserted"),
            vec![CssToken::Delim('!'), CssToken::Ident("node-inserted".into())]
        );
    }

    #[test]
    fn hex_escape_in_ident() {
        assert_eq!(lex("\\31 a"), vec![CssToken::Ident("1a".into())]);
    }
}
