//! Interview Languages
//!
//! The fixed set of locales a session can be conducted in. A session's
//! language is resolved once at start and never changes afterwards.

use serde::Serialize;

/// Code used when the requested language is missing or unsupported
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// A supported interview locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    /// BCP-47 style code, e.g. `es-MX`
    pub code: &'static str,
    /// Display label in the language itself
    pub label: &'static str,
}

const SUPPORTED: &[Language] = &[
    Language { code: "en-US", label: "English (US)" },
    Language { code: "en-GB", label: "English (UK)" },
    Language { code: "es-ES", label: "Español (España)" },
    Language { code: "es-MX", label: "Español (México)" },
    Language { code: "fr-FR", label: "Français" },
    Language { code: "de-DE", label: "Deutsch" },
    Language { code: "it-IT", label: "Italiano" },
    Language { code: "pt-BR", label: "Português (Brasil)" },
    Language { code: "ja-JP", label: "日本語" },
    Language { code: "ko-KR", label: "한국어" },
    Language { code: "ru-RU", label: "Русский" },
    Language { code: "zh-CN", label: "中文（简体）" },
    Language { code: "hi-IN", label: "हिन्दी" },
];

impl Language {
    /// All supported languages in display order
    pub fn supported() -> &'static [Language] {
        SUPPORTED
    }

    /// Resolve any requested code to a supported language.
    pub fn resolve(code: Option<&str>) -> Language {
        let normalized = normalize_language_code(code);
        SUPPORTED
            .iter()
            .copied()
            .find(|l| l.code == normalized)
            .unwrap_or(SUPPORTED[0])
    }

    /// Lower-case family prefix (`es` for `es-MX`)
    pub fn family(&self) -> &'static str {
        self.code.split('-').next().unwrap_or(self.code)
    }
}

/// Lower-case family prefix of an arbitrary code.
pub fn language_family(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Normalize a requested code onto the supported set.
///
/// Exact match first (case-insensitive, `_` accepted for `-`), then the first
/// supported code of the same family, then [`DEFAULT_LANGUAGE`].
pub fn normalize_language_code(code: Option<&str>) -> &'static str {
    let requested = code.map(str::trim).unwrap_or_default().replace('_', "-");
    if requested.is_empty() {
        return DEFAULT_LANGUAGE;
    }

    if let Some(exact) = SUPPORTED.iter().find(|l| l.code.eq_ignore_ascii_case(&requested)) {
        return exact.code;
    }

    let family = language_family(&requested);
    SUPPORTED
        .iter()
        .find(|l| l.family() == family)
        .map(|l| l.code)
        .unwrap_or(DEFAULT_LANGUAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(normalize_language_code(Some("es-MX")), "es-MX");
        assert_eq!(normalize_language_code(Some("pt_br")), "pt-BR");
    }

    #[test]
    fn test_family_fallback() {
        assert_eq!(normalize_language_code(Some("es-AR")), "es-ES");
        assert_eq!(normalize_language_code(Some("en-AU")), "en-US");
        assert_eq!(normalize_language_code(Some("zh-TW")), "zh-CN");
    }

    #[test]
    fn test_default() {
        assert_eq!(normalize_language_code(None), DEFAULT_LANGUAGE);
        assert_eq!(normalize_language_code(Some("  ")), DEFAULT_LANGUAGE);
        assert_eq!(normalize_language_code(Some("sw-KE")), DEFAULT_LANGUAGE);
    }

    #[test]
    fn test_resolve_and_family() {
        let lang = Language::resolve(Some("fr-CA"));
        assert_eq!(lang.code, "fr-FR");
        assert_eq!(lang.label, "Français");
        assert_eq!(lang.family(), "fr");
        assert_eq!(language_family("DE-at"), "de");
        assert_eq!(Language::supported().len(), 13);
    }
}
