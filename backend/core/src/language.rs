//! Supported narration and response languages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A language a scan result can be localized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Ta,
    Te,
    Bn,
    Mr,
    Kn,
    Ml,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Self::En,
        Self::Hi,
        Self::Ta,
        Self::Te,
        Self::Bn,
        Self::Mr,
        Self::Kn,
        Self::Ml,
    ];

    /// Look up a language by its ISO 639-1 code. Case-insensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    /// Resolve a requested code, falling back to English when unsupported.
    pub fn resolve(code: &str) -> Self {
        Self::from_code(code).unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Ta => "ta",
            Self::Te => "te",
            Self::Bn => "bn",
            Self::Mr => "mr",
            Self::Kn => "kn",
            Self::Ml => "ml",
        }
    }

    /// English display name, as used inside model instructions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Ta => "Tamil",
            Self::Te => "Telugu",
            Self::Bn => "Bengali",
            Self::Mr => "Marathi",
            Self::Kn => "Kannada",
            Self::Ml => "Malayalam",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Language::from_code(" HI "), Some(Language::Hi));
    }

    #[test]
    fn unknown_resolves_to_english() {
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::resolve("fr"), Language::En);
        assert_eq!(Language::resolve("kn").name(), "Kannada");
    }
}
