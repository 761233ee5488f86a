/// Raw audio upload as received from the client. Owned by a single request.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    pub data: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl UploadedAudio {
    pub fn new(data: Vec<u8>, filename: Option<String>, content_type: Option<String>) -> Self {
        Self {
            data,
            filename,
            content_type,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or("")
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or("")
    }
}
