use crate::error::SheetError;
use crate::parser::{CssRule, KeyframesRule, parse_rule, parse_stylesheet};

/// A rule held by a [`StyleSheet`], optionally tagged with the key of
/// whoever inserted it.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRule {
    pub rule: CssRule,
    pub owner: Option<String>,
}

/// A mutable, ordered list of rules (the `CSSStyleSheet` shape).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSheet {
    rules: Vec<SheetRule>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sheet from source text. Invalid rules are dropped.
    pub fn parse(css: &str) -> Self {
        Self {
            rules: parse_stylesheet(css)
                .into_iter()
                .map(|rule| SheetRule { rule, owner: None })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &SheetRule> {
        self.rules.iter()
    }

    pub fn get(&self, index: usize) -> Option<&SheetRule> {
        self.rules.get(index)
    }

    /// Parse `text` as a single rule and insert it at `index`.
    pub fn insert_rule(
        &mut self,
        text: &str,
        index: usize,
        owner: Option<String>,
    ) -> Result<usize, SheetError> {
        if index > self.rules.len() {
            return Err(SheetError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        let rule = parse_rule(text)?;
        self.rules.insert(index, SheetRule { rule, owner });
        Ok(index)
    }

    pub fn delete_rule(&mut self, index: usize) -> Result<SheetRule, SheetError> {
        if index >= self.rules.len() {
            return Err(SheetError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        Ok(self.rules.remove(index))
    }

    pub fn owner(&self, index: usize) -> Option<&str> {
        self.rules.get(index)?.owner.as_deref()
    }

    /// The `@keyframes` rule named `name`. Later definitions win.
    pub fn keyframes(&self, name: &str) -> Option<&KeyframesRule> {
        self.rules.iter().rev().find_map(|r| match &r.rule {
            CssRule::Keyframes(k) if k.name == name => Some(k),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CssError;

    #[test]
    fn insert_at_front_shifts_existing_rules() {
        let mut sheet = StyleSheet::new();
        sheet.insert_rule("a{}", 0, None).unwrap();
        sheet
            .insert_rule("@keyframes k{from{}to{}}", 0, Some(".x".into()))
            .unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.owner(0), Some(".x"));
        assert_eq!(sheet.owner(1), None);
        assert!(sheet.keyframes("k").is_some());
    }

    #[test]
    fn out_of_range_index() {
        let mut sheet = StyleSheet::new();
        assert_eq!(
            sheet.insert_rule("a{}", 1, None),
            Err(SheetError::IndexOutOfRange { index: 1, len: 0 })
        );
        assert!(sheet.delete_rule(0).is_err());
    }

    #[test]
    fn syntax_error_leaves_sheet_untouched() {
        let mut sheet = StyleSheet::parse("a{} b{}");
        assert!(matches!(
            sheet.insert_rule("!bad{}", 0, None),
            Err(SheetError::Syntax(_))
        ));
        assert_eq!(
            sheet.insert_rule("a{} b{}", 0, None),
            Err(SheetError::Syntax(CssError::RuleCount(2)))
        );
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn delete_returns_rule_with_owner() {
        let mut sheet = StyleSheet::new();
        sheet.insert_rule("a{}", 0, Some("a".into())).unwrap();
        let removed = sheet.delete_rule(0).unwrap();
        assert_eq!(removed.owner.as_deref(), Some("a"));
        assert!(sheet.is_empty());
    }

    #[test]
    fn last_keyframes_definition_wins() {
        let sheet = StyleSheet::parse(
            "@keyframes k { from { opacity: 0 } } @keyframes k { to { opacity: 1 } }",
        );
        let k = sheet.keyframes("k").unwrap();
        assert_eq!(k.keyframes[0].offsets, vec![1.0]);
        assert!(sheet.keyframes("missing").is_none());
    }
}
