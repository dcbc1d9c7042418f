use thiserror::Error;

/// Errors raised while parsing selectors and rules.
///
/// The stylesheet object model turns these into the host's `SyntaxError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssError {
    #[error("empty selector")]
    EmptySelector,

    #[error("unexpected token in selector: {0}")]
    UnexpectedToken(String),

    #[error("unknown pseudo-class :{0}")]
    UnknownPseudoClass(String),

    #[error("unknown pseudo-element ::{0}")]
    UnknownPseudoElement(String),

    #[error("malformed attribute selector")]
    MalformedAttribute,

    #[error("malformed an+b expression")]
    MalformedNth,

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected exactly one rule, found {0}")]
    RuleCount(usize),

    #[error("unsupported at-rule @{0}")]
    UnsupportedAtRule(String),

    #[error("invalid @keyframes name")]
    InvalidKeyframesName,

    #[error("invalid keyframe selector")]
    InvalidKeyframeSelector,
}

/// Errors from the stylesheet object model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    #[error(transparent)]
    Syntax(#[from] CssError),

    #[error("rule index {index} out of range for sheet of {len} rules")]
    IndexOutOfRange { index: usize, len: usize },
}
