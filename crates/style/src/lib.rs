//! Style engine: selector matching, the animation cascade, and running
//! animation bookkeeping.

pub mod animation;
pub mod cascade;
pub mod matching;

pub use animation::{AnimationState, AnimationTracker};
pub use cascade::{
    AnimationStyle, MatchedRule, apply_declaration, collect_matching_rules, resolve_animation_style,
};
pub use matching::{matches_any, matches_compound, matches_selector};
