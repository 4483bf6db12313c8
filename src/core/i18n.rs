//! Translations for user-facing text.
//!
//! Seven languages ship with the binary. The preferred language is stored in
//! the key-value table; anything unknown falls back to English, and a key
//! missing from a table is returned as-is.

use crate::errors::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Languages with a bundled translation table
pub const SUPPORTED_LANGUAGES: [&str; 7] = ["en", "es", "fr", "te", "ta", "ar", "sw"];

/// Language used when nothing (or nothing usable) is stored
pub const DEFAULT_LANGUAGE: &str = "en";

fn bundled_table(lang: &str) -> Option<&'static str> {
    match lang {
        "en" => Some(include_str!("../../translations/en.json")),
        "es" => Some(include_str!("../../translations/es.json")),
        "fr" => Some(include_str!("../../translations/fr.json")),
        "te" => Some(include_str!("../../translations/te.json")),
        "ta" => Some(include_str!("../../translations/ta.json")),
        "ar" => Some(include_str!("../../translations/ar.json")),
        "sw" => Some(include_str!("../../translations/sw.json")),
        _ => None,
    }
}

/// Whether `lang` has a bundled table
#[must_use]
pub fn is_supported(lang: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&lang)
}

/// Checks a language code before it is stored.
pub fn validate_language(lang: &str) -> Result<()> {
    if is_supported(lang) {
        Ok(())
    } else {
        Err(Error::UnsupportedLanguage {
            language: lang.to_string(),
        })
    }
}

/// Key lookup over one loaded translation table.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    language: String,
    entries: HashMap<String, String>,
}

impl Translator {
    /// Loads the table for `lang`.
    ///
    /// Unsupported codes and unreadable tables fall back to English. If even
    /// English cannot be loaded the translator is empty and every lookup
    /// returns its key.
    #[must_use]
    pub fn for_language(lang: &str) -> Self {
        let lang = if is_supported(lang) {
            lang
        } else {
            debug!("Language '{}' is not supported, using {}", lang, DEFAULT_LANGUAGE);
            DEFAULT_LANGUAGE
        };

        match Self::parse(lang) {
            Ok(translator) => translator,
            Err(e) if lang != DEFAULT_LANGUAGE => {
                warn!("Translation table for '{}' is unusable: {}", lang, e);
                Self::for_language(DEFAULT_LANGUAGE)
            }
            Err(e) => {
                warn!("English translation table is unusable: {}", e);
                Self {
                    language: DEFAULT_LANGUAGE.to_string(),
                    entries: HashMap::new(),
                }
            }
        }
    }

    fn parse(lang: &str) -> Result<Self> {
        let raw = bundled_table(lang).ok_or_else(|| Error::UnsupportedLanguage {
            language: lang.to_string(),
        })?;
        Ok(Self {
            language: lang.to_string(),
            entries: serde_json::from_str(raw)?,
        })
    }

    /// Language of the loaded table
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Translated text for `key`, or the key itself when the table has no entry
    #[must_use]
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map_or(key, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_in_supported_language() {
        let translator = Translator::for_language("sw");
        assert_eq!(translator.language(), "sw");
        assert_eq!(translator.get("back"), "Rudi");
    }

    #[test]
    fn test_unsupported_language_falls_back_to_english() {
        let translator = Translator::for_language("de");
        assert_eq!(translator.language(), "en");
        assert_eq!(translator.get("overhead_tank"), "Overhead Tank");
    }

    #[test]
    fn test_missing_key_returns_the_key() {
        let translator = Translator::for_language("fr");
        assert_eq!(translator.get("no_such_key"), "no_such_key");
    }

    #[test]
    fn test_empty_entry_is_kept() {
        assert_eq!(Translator::for_language("en").get("water_management"), "");
    }

    #[test]
    fn test_every_bundled_table_has_the_english_keys() {
        let english = Translator::for_language("en");
        assert!(!english.entries.is_empty());
        for lang in SUPPORTED_LANGUAGES {
            let translator = Translator::for_language(lang);
            assert_eq!(translator.language(), lang);
            for key in english.entries.keys() {
                assert!(translator.entries.contains_key(key), "{lang} lacks {key}");
            }
        }
    }

    #[test]
    fn test_validate_language() {
        assert!(validate_language("ta").is_ok());
        assert!(matches!(
            validate_language("xx"),
            Err(Error::UnsupportedLanguage { ref language }) if language == "xx"
        ));
    }
}
