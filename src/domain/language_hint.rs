use std::fmt;

const AUTO: &str = "auto";

/// Source language requested by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LanguageHint {
    #[default]
    Auto,
    Code(String),
}

impl LanguageHint {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO) {
            LanguageHint::Auto
        } else {
            LanguageHint::Code(trimmed.to_lowercase())
        }
    }

    /// Explicit language code, `None` when the engine should detect it.
    pub fn code(&self) -> Option<&str> {
        match self {
            LanguageHint::Auto => None,
            LanguageHint::Code(code) => Some(code),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LanguageHint::Auto => AUTO,
            LanguageHint::Code(code) => code,
        }
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
