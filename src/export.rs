use crate::workflow::GenerationResult;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Html,
    Json,
}

impl ExportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Html => "knowledge_graph.html",
            ExportFormat::Json => "knowledge_graph.json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Html => "text/html",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(ExportFormat::Html),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("Unsupported export format: {}", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        })
    }
}

/// A downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub bytes: Vec<u8>,
    pub filename: &'static str,
    pub mime_type: &'static str,
}

impl Export {
    /// Save under `dir` using the artifact's file name.
    pub fn write_into(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.filename);
        std::fs::write(&path, &self.bytes)?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Exported graph");
        Ok(path)
    }
}

/// Serialize the held result. Returns `None` when there is no result.
pub fn export(result: Option<&GenerationResult>, format: ExportFormat) -> Option<Export> {
    let result = result?;
    let bytes = match format {
        ExportFormat::Html => result.html.as_bytes().to_vec(),
        // Serializing a `Value` cannot fail.
        ExportFormat::Json => serde_json::to_vec_pretty(&result.raw).ok()?,
    };
    Some(Export {
        bytes,
        filename: format.file_name(),
        mime_type: format.mime_type(),
    })
}
