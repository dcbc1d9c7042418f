//! Watcher configuration.

use serde::{Deserialize, Serialize};

use crate::error::SentinelError;

/// How fired animation names are resolved to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One generated `@keyframes` plus one binding rule per selector; an
    /// event is resolved by its animation name alone.
    #[default]
    Direct,
    /// One shared animation bound to `*`; plain selectors insert no rules
    /// and are re-checked against each event target.
    Matching,
}

/// What happens when a callback panics mid-firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackFailure {
    /// The panic unwinds into the host; later callbacks for that firing
    /// do not run.
    #[default]
    Propagate,
    /// The panic is caught and logged; remaining callbacks still run.
    Isolate,
}

/// Configuration for a [`Sentinel`](crate::Sentinel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SentinelConfig {
    /// Prefix that marks a selector as an external animation name. Default: `!`.
    pub marker: Option<char>,
    /// Prefix for generated animation names. Default: `sentinel-`.
    pub animation_prefix: Option<String>,
    /// Duration written into binding rules. Default: `0.0001s`.
    pub duration: Option<String>,
    /// Event types the listener is installed for.
    /// Default: `animationstart`, `webkitAnimationStart`, `mozAnimationStart`.
    pub event_types: Option<Vec<String>>,
    /// Default: [`DispatchMode::Direct`].
    pub dispatch_mode: Option<DispatchMode>,
    /// Default: [`CallbackFailure::Propagate`].
    pub callback_failure: Option<CallbackFailure>,
    /// `id` attribute of the generated `<style>` element. Default: `sentineljs`.
    pub style_element_id: Option<String>,
}

impl SentinelConfig {
    /// Load config from a TOML string, falling back to defaults for missing
    /// fields. The result is validated.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, SentinelError> {
        let config: SentinelConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn effective_marker(&self) -> char {
        self.marker.unwrap_or('!')
    }

    pub fn effective_animation_prefix(&self) -> &str {
        self.animation_prefix.as_deref().unwrap_or("sentinel-")
    }

    pub fn effective_duration(&self) -> &str {
        self.duration.as_deref().unwrap_or("0.0001s")
    }

    pub fn effective_event_types(&self) -> Vec<String> {
        match &self.event_types {
            Some(types) => types.clone(),
            None => ["animationstart", "webkitAnimationStart", "mozAnimationStart"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }

    pub fn effective_dispatch_mode(&self) -> DispatchMode {
        self.dispatch_mode.unwrap_or_default()
    }

    pub fn effective_callback_failure(&self) -> CallbackFailure {
        self.callback_failure.unwrap_or_default()
    }

    pub fn effective_style_element_id(&self) -> &str {
        self.style_element_id.as_deref().unwrap_or("sentineljs")
    }

    /// Name of the animation shared by every element in
    /// [`DispatchMode::Matching`].
    pub fn shared_animation_name(&self) -> String {
        format!("{}animation-name", self.effective_animation_prefix())
    }

    /// Reject values that would produce invalid CSS.
    pub fn validate(&self) -> Result<(), SentinelError> {
        let marker = self.effective_marker();
        if marker.is_whitespace() || marker.is_alphanumeric() || matches!(marker, '.' | '#' | '*' | '[' | ':') {
            return Err(SentinelError::Config(format!(
                "marker {marker:?} could start a CSS selector"
            )));
        }

        let prefix = self.effective_animation_prefix();
        let valid_ident = prefix.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
            && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_ident {
            return Err(SentinelError::Config(format!(
                "animation prefix {prefix:?} is not a CSS identifier"
            )));
        }

        let duration = self.effective_duration();
        let number = duration
            .strip_suffix("ms")
            .or_else(|| duration.strip_suffix('s'))
            .and_then(|n| n.parse::<f64>().ok());
        if !number.is_some_and(|n| n.is_finite() && n >= 0.0) {
            return Err(SentinelError::Config(format!(
                "duration {duration:?} is not a CSS time"
            )));
        }

        if self.effective_event_types().iter().all(|t| t.trim().is_empty()) {
            return Err(SentinelError::Config("no event types configured".into()));
        }
        Ok(())
    }
}
