//! Serializable popup settings.
//!
//! [`PopupSettings`] holds every setting of a suggestion popup that is not a
//! host capability. It can be loaded from TOML or JSON and handed to
//! [`SuggestionWindowBuilder::settings`](crate::SuggestionWindowBuilder::settings).
//!
//! ```
//! use horizon_suggest::{Gravity, PopupSettings};
//!
//! let settings = PopupSettings::from_toml_str(r#"
//!     gravity = "start"
//!     min_characters = 2
//!     query_throttle_ms = 250
//!
//!     [margins]
//!     top = 8
//!     vertical_safe = 16
//! "#).unwrap();
//!
//! assert_eq!(settings.gravity, Gravity::Start);
//! assert_eq!(settings.margins.vertical_safe, 16);
//! assert!(settings.hide_on_blur);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::appearance::Background;
use crate::error::ConfigError;
use crate::geometry::{Gravity, Margins, PreferredPosition};
use crate::lifecycle::DEFAULT_ELEVATION;
use crate::trigger::MinCharactersRule;

/// Settings of one suggestion popup.
///
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupSettings {
    pub preferred_position: PreferredPosition,
    pub gravity: Gravity,
    /// Hide the popup when the anchor loses focus.
    pub hide_on_blur: bool,
    /// Size and align the popup to the anchor instead of the visible frame.
    pub constrain_to_anchor_bounds: bool,
    pub min_characters: usize,
    pub min_characters_rule: MinCharactersRule,
    /// Listen to the anchor's text edits.
    pub attach_text_change_listener: bool,
    /// Debounce window of the query callback; zero queries immediately.
    pub query_throttle_ms: u64,
    pub dismiss_on_back_press: bool,
    pub elevation: f32,
    /// `None` falls back to a solid white background and is written as
    /// `kind = "none"`.
    #[serde(with = "background_setting")]
    pub background: Option<Background>,
    pub margins: Margins,
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            preferred_position: PreferredPosition::BestFit,
            gravity: Gravity::Center,
            hide_on_blur: true,
            constrain_to_anchor_bounds: true,
            min_characters: 0,
            min_characters_rule: MinCharactersRule::Exceeds,
            attach_text_change_listener: true,
            query_throttle_ms: 0,
            dismiss_on_back_press: true,
            elevation: DEFAULT_ELEVATION,
            background: Some(Background::rounded_white()),
            margins: Margins::default(),
        }
    }
}

impl PopupSettings {
    /// Parse and validate settings from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate settings from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to a pretty-printed TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize to a pretty-printed JSON document.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check value ranges the types cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.elevation.is_finite() || self.elevation < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "elevation must be a non-negative number, got {}",
                self.elevation
            )));
        }
        self.margins.validate()?;
        if let Some(Background::Rounded { radius, .. }) = self.background {
            if !radius.is_finite() || radius < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "background radius must be >= 0, got {radius}"
                )));
            }
        }
        Ok(())
    }

    /// The query throttle as a duration.
    pub fn query_throttle(&self) -> Duration {
        Duration::from_millis(self.query_throttle_ms)
    }
}

/// An unset background is written as `kind = "none"`.
mod background_setting {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::appearance::{Background, Color};

    #[derive(Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    enum Repr {
        None,
        Solid { color: Color },
        Rounded { color: Color, radius: f32 },
    }

    pub fn serialize<S: Serializer>(
        background: &Option<Background>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let repr = match *background {
            None => Repr::None,
            Some(Background::Solid { color }) => Repr::Solid { color },
            Some(Background::Rounded { color, radius }) => Repr::Rounded { color, radius },
        };
        repr.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Background>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::None => None,
            Repr::Solid { color } => Some(Background::Solid { color }),
            Repr::Rounded { color, radius } => Some(Background::Rounded { color, radius }),
        })
    }
}
