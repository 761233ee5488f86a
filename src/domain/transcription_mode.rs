use std::fmt;

/// Per-request trade-off between latency and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptionMode {
    #[default]
    Fast,
    Accurate,
}

impl TranscriptionMode {
    /// Anything other than `accurate` selects the fast profile.
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("accurate") {
            TranscriptionMode::Accurate
        } else {
            TranscriptionMode::Fast
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionMode::Fast => "fast",
            TranscriptionMode::Accurate => "accurate",
        }
    }
}

impl fmt::Display for TranscriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
