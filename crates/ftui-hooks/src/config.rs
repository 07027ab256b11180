#![forbid(unsafe_code)]

//! Configuration for shapers and the outside-interaction detector.
//!
//! Every config has a usable [`Default`], `with_*` builders, and a
//! `validate()` that rejects misuse up front. With the `policy-config`
//! feature, [`HooksConfig::from_toml_str`] loads the same settings from a
//! policy file:
//!
//! ```toml
//! [debounce]
//! delay_ms = 150
//!
//! [outside]
//! pointer_kinds = ["pointerdown", "touchstart"]
//! keyboard = true
//! activation_key = "Enter"
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::host::EventKind;

/// Default quiet period for debounced calls.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Default keyboard activation key for outside detection.
pub const DEFAULT_ACTIVATION_KEY: &str = "Enter";

/// Debounce settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Quiet period after the last call before it fires.
    pub delay: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DEBOUNCE,
        }
    }
}

impl DebounceConfig {
    /// Config with an explicit delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Config from a signed millisecond count.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NegativeDelay`] when `ms < 0`.
    pub fn from_millis(ms: i64) -> Result<Self, ConfigError> {
        let ms = u64::try_from(ms).map_err(|_| ConfigError::NegativeDelay(ms))?;
        Ok(Self::new(Duration::from_millis(ms)))
    }
}

/// Outside-interaction detector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutsideConfig {
    /// Pointer-modality kinds listened for on the document.
    pub pointer_kinds: Vec<EventKind>,
    /// Whether keyboard activation is also treated as an interaction.
    pub keyboard: bool,
    /// Key that counts as keyboard activation.
    pub activation_key: String,
}

impl Default for OutsideConfig {
    fn default() -> Self {
        Self {
            pointer_kinds: vec![EventKind::POINTER_DOWN, EventKind::TOUCH_START],
            keyboard: true,
            activation_key: DEFAULT_ACTIVATION_KEY.to_owned(),
        }
    }
}

impl OutsideConfig {
    /// Replace the pointer kinds.
    #[must_use]
    pub fn with_pointer_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.pointer_kinds = kinds.into_iter().collect();
        self
    }

    /// Enable or disable keyboard activation.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: bool) -> Self {
        self.keyboard = keyboard;
        self
    }

    /// Set the activation key.
    #[must_use]
    pub fn with_activation_key(mut self, key: impl Into<String>) -> Self {
        self.activation_key = key.into();
        self
    }

    /// Reject configurations that could never detect anything.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoModalities`] with no pointer kinds and no keyboard.
    /// - [`ConfigError::EmptyActivationKey`] with keyboard on and an empty key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pointer_kinds.is_empty() && !self.keyboard {
            return Err(ConfigError::NoModalities);
        }
        if self.keyboard && self.activation_key.is_empty() {
            return Err(ConfigError::EmptyActivationKey);
        }
        Ok(())
    }
}

/// All hooks-core settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HooksConfig {
    pub debounce: DebounceConfig,
    pub outside: OutsideConfig,
}

impl HooksConfig {
    /// Set the debounce settings.
    #[must_use]
    pub fn with_debounce(mut self, debounce: DebounceConfig) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the outside-detection settings.
    #[must_use]
    pub fn with_outside(mut self, outside: OutsideConfig) -> Self {
        self.outside = outside;
        self
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// The first section error, see [`OutsideConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.outside.validate()
    }

    /// Parse and validate a TOML policy. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, otherwise any validation error.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: policy::RawPolicy =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let config = raw.into_config()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(feature = "policy-config")]
mod policy {
    use serde::Deserialize;

    use super::{DebounceConfig, HooksConfig, OutsideConfig};
    use crate::error::ConfigError;
    use crate::host::EventKind;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    pub(super) struct RawPolicy {
        debounce: RawDebounce,
        outside: RawOutside,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct RawDebounce {
        delay_ms: Option<i64>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct RawOutside {
        pointer_kinds: Option<Vec<String>>,
        keyboard: Option<bool>,
        activation_key: Option<String>,
    }

    impl RawPolicy {
        pub(super) fn into_config(self) -> Result<HooksConfig, ConfigError> {
            let debounce = match self.debounce.delay_ms {
                Some(ms) => DebounceConfig::from_millis(ms)?,
                None => DebounceConfig::default(),
            };
            let mut outside = OutsideConfig::default();
            if let Some(kinds) = self.outside.pointer_kinds {
                outside = outside.with_pointer_kinds(kinds.into_iter().map(EventKind::from));
            }
            if let Some(keyboard) = self.outside.keyboard {
                outside = outside.with_keyboard(keyboard);
            }
            if let Some(key) = self.outside.activation_key {
                outside = outside.with_activation_key(key);
            }
            Ok(HooksConfig { debounce, outside })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = HooksConfig::default();
        assert_eq!(config.debounce.delay, DEFAULT_DEBOUNCE);
        assert_eq!(config.outside.activation_key, "Enter");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_millis_rejected() {
        assert_eq!(
            DebounceConfig::from_millis(-1),
            Err(ConfigError::NegativeDelay(-1))
        );
        assert_eq!(
            DebounceConfig::from_millis(0).map(|c| c.delay),
            Ok(Duration::ZERO)
        );
    }

    #[test]
    fn no_modalities_rejected() {
        let outside = OutsideConfig::default()
            .with_pointer_kinds([])
            .with_keyboard(false);
        assert_eq!(outside.validate(), Err(ConfigError::NoModalities));
    }

    #[test]
    fn keyboard_only_is_fine() {
        let outside = OutsideConfig::default().with_pointer_kinds([]);
        assert!(outside.validate().is_ok());
    }

    #[test]
    fn empty_key_rejected_only_with_keyboard() {
        let outside = OutsideConfig::default().with_activation_key("");
        assert_eq!(outside.validate(), Err(ConfigError::EmptyActivationKey));
        assert!(outside.with_keyboard(false).validate().is_ok());
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn toml_policy_round() {
        let config = HooksConfig::from_toml_str(
            r#"
            [debounce]
            delay_ms = 50

            [outside]
            pointer_kinds = ["mousedown"]
            activation_key = " "
            "#,
        )
        .unwrap();
        assert_eq!(config.debounce.delay, Duration::from_millis(50));
        assert_eq!(config.outside.pointer_kinds, vec![EventKind::MOUSE_DOWN]);
        assert!(config.outside.keyboard);
        assert_eq!(config.outside.activation_key, " ");
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn toml_policy_rejects_negative_delay() {
        let err = HooksConfig::from_toml_str("[debounce]\ndelay_ms = -10\n").unwrap_err();
        assert_eq!(err, ConfigError::NegativeDelay(-10));
    }

    #[cfg(feature = "policy-config")]
    #[test]
    fn toml_policy_rejects_garbage() {
        assert!(matches!(
            HooksConfig::from_toml_str("[debounce\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
