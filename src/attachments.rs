use bytes::Bytes;
use std::fmt;
use std::fs;
use std::path::Path;

/// Document types the graph service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Txt,
    Pdf,
    Docx,
    Csv,
}

impl Extension {
    /// Derive the extension from the text after the last `.` of a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, suffix) = name.rsplit_once('.')?;
        match suffix.to_lowercase().as_str() {
            "txt" => Some(Extension::Txt),
            "pdf" => Some(Extension::Pdf),
            "docx" => Some(Extension::Docx),
            "csv" => Some(Extension::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::Txt => "txt",
            Extension::Pdf => "pdf",
            Extension::Docx => "docx",
            Extension::Csv => "csv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Extension::Txt => "text/plain",
            Extension::Pdf => "application/pdf",
            Extension::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Extension::Csv => "text/csv",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file picked by the user, before the extension filter runs.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub content: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk. The handle is named after the final path component.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let content = fs::read(path)?;
        Ok(Self::new(name, content))
    }
}

/// A file accepted for inclusion in a generation request.
#[derive(Debug, Clone)]
pub struct Attachment {
    name: String,
    size_bytes: u64,
    extension: Extension,
    content: Bytes,
}

impl Attachment {
    fn from_handle(handle: FileHandle) -> Option<Self> {
        let extension = Extension::from_file_name(&handle.name)?;
        Some(Self {
            size_bytes: handle.content.len() as u64,
            name: handle.name,
            extension,
            content: handle.content,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn extension(&self) -> Extension {
        self.extension
    }

    /// Raw file content. Cloning is cheap.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Size in kilobytes with one decimal, e.g. `"12.5 KB"`.
    pub fn display_size(&self) -> String {
        format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
    }
}

/// Ordered list of attachments. Position is identity.
#[derive(Debug, Clone, Default)]
pub struct AttachmentManager {
    items: Vec<Attachment>,
}

impl AttachmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every file with an accepted extension, in input order.
    /// Anything else is dropped without error. Returns how many were kept.
    pub fn add(&mut self, files: impl IntoIterator<Item = FileHandle>) -> usize {
        let before = self.items.len();
        for file in files {
            let name = file.name.clone();
            match Attachment::from_handle(file) {
                Some(attachment) => self.items.push(attachment),
                None => tracing::debug!(file = %name, "Dropping file with unsupported extension"),
            }
        }
        self.items.len() - before
    }

    /// Remove the attachment at `index`. Out of range is a no-op.
    pub fn remove_at(&mut self, index: usize) -> Option<Attachment> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_content(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
