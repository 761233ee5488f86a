use std::fmt;

/// Container format inferred from upload metadata, never from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SniffedFormat {
    Webm,
    Mp4,
    Wav,
    Ogg,
    /// Nothing matched. Treated as webm for file naming, but decoded with
    /// auto-detection because the label is a guess.
    UnknownDefaultWebm,
}

const SNIFF_ORDER: [SniffedFormat; 4] = [
    SniffedFormat::Webm,
    SniffedFormat::Mp4,
    SniffedFormat::Wav,
    SniffedFormat::Ogg,
];

impl SniffedFormat {
    /// Classifies an upload from its declared content type and filename.
    ///
    /// The content type is inspected first, then the filename
    /// (case-insensitive). Unmatched pairs fall back to webm, the dominant
    /// browser recorder container. This is a heuristic, not a guarantee.
    pub fn sniff(content_type: &str, filename: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if let Some(format) = SNIFF_ORDER
            .iter()
            .find(|f| content_type.contains(f.token()))
        {
            return *format;
        }

        let filename = filename.to_ascii_lowercase();
        SNIFF_ORDER
            .iter()
            .find(|f| filename.contains(f.token()))
            .copied()
            .unwrap_or(SniffedFormat::UnknownDefaultWebm)
    }

    fn token(&self) -> &'static str {
        match self {
            SniffedFormat::Webm | SniffedFormat::UnknownDefaultWebm => "webm",
            SniffedFormat::Mp4 => "mp4",
            SniffedFormat::Wav => "wav",
            SniffedFormat::Ogg => "ogg",
        }
    }

    /// File extension used when staging the upload on disk.
    pub fn extension(&self) -> &'static str {
        self.token()
    }

    /// Extension hint for the primary decoder. `None` means auto-detect.
    pub fn decoder_hint(&self) -> Option<&'static str> {
        match self {
            SniffedFormat::UnknownDefaultWebm => None,
            other => Some(other.token()),
        }
    }

    pub fn is_wav(&self) -> bool {
        matches!(self, SniffedFormat::Wav)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SniffedFormat::Webm => "webm",
            SniffedFormat::Mp4 => "mp4",
            SniffedFormat::Wav => "wav",
            SniffedFormat::Ogg => "ogg",
            SniffedFormat::UnknownDefaultWebm => "unknown-default-webm",
        }
    }
}

impl fmt::Display for SniffedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
