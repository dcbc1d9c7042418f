pub mod error;
pub mod parser;
pub mod selector;
pub mod sheet;
pub mod token;

pub use error::{CssError, SheetError};
pub use parser::{
    CssRule, CssValue, Declaration, Keyframe, KeyframesRule, StyleRule, parse_declaration_block,
    parse_rule, parse_stylesheet,
};
pub use selector::{
    AttrOp, Combinator, ComplexSelector, CompoundSelector, PseudoClass, PseudoElement,
    SimpleSelector, Specificity, compute_specificity, parse_selector_list,
};
pub use sheet::{SheetRule, StyleSheet};
pub use token::{CssToken, CssTokenizer};
