#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLanguage {
    pub code: &'static str,
    pub name: &'static str,
}

pub const DEFAULT_TARGET_LANGUAGE: &str = "es";

/// Target languages offered for selection.
pub const SUPPORTED_LANGUAGES: &[TargetLanguage] = &[
    TargetLanguage { code: "es", name: "Spanish" },
    TargetLanguage { code: "fr", name: "French" },
    TargetLanguage { code: "de", name: "German" },
    TargetLanguage { code: "it", name: "Italian" },
    TargetLanguage { code: "pt", name: "Portuguese" },
    TargetLanguage { code: "nl", name: "Dutch" },
    TargetLanguage { code: "ru", name: "Russian" },
    TargetLanguage { code: "ja", name: "Japanese" },
    TargetLanguage { code: "ko", name: "Korean" },
    TargetLanguage { code: "zh", name: "Chinese (Simplified)" },
    TargetLanguage { code: "hi", name: "Hindi" },
    TargetLanguage { code: "ar", name: "Arabic" },
    TargetLanguage { code: "tr", name: "Turkish" },
    TargetLanguage { code: "pl", name: "Polish" },
    TargetLanguage { code: "vi", name: "Vietnamese" },
];

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| lang.code.eq_ignore_ascii_case(code.trim()))
        .map(|lang| lang.name)
}
