//! File loading and text extraction.

use super::extractors::{DocxExtractor, PdfExtractor};
use lexrag_core::config::normalize_extension;
use lexrag_core::error::{LexragError, Result};
use std::path::Path;
use std::sync::Arc;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Turns the raw bytes of one file type into plain text.
pub trait TextExtractor: Send + Sync {
    /// Dot-prefixed, lower-case extensions this extractor handles.
    fn extensions(&self) -> &[&'static str];

    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Extractor for `.txt` files. Invalid UTF-8 is replaced, never rejected.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extensions(&self) -> &[&'static str] {
        &[".txt"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// A file read from disk, ready for chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name, used as the source identifier of every chunk
    pub source_id: String,
    pub extension: String,
    pub size_mb: f64,
    /// BLAKE3 hex digest of the raw bytes
    pub content_hash: String,
    pub text: String,
}

/// Reads files and dispatches to the extractor registered for their type.
pub struct DocumentLoader {
    extractors: Vec<Arc<dyn TextExtractor>>,
    max_file_size_mb: u64,
}

impl DocumentLoader {
    /// Loader with the built-in `.txt`, `.pdf` and `.docx` extractors.
    pub fn new(max_file_size_mb: u64) -> Self {
        Self {
            extractors: vec![
                Arc::new(PlainTextExtractor),
                Arc::new(PdfExtractor),
                Arc::new(DocxExtractor),
            ],
            max_file_size_mb,
        }
    }

    /// Registers an additional extractor. Later registrations win.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractors.insert(0, extractor);
        self
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.extractor_for(&normalize_extension(extension)).is_some()
    }

    /// Fails when any of `extensions` has no registered extractor.
    ///
    /// # Errors
    ///
    /// `LexragError::Config` naming every unsupported extension.
    pub fn ensure_supports(&self, extensions: &[String]) -> Result<()> {
        let missing: Vec<&str> = extensions
            .iter()
            .map(String::as_str)
            .filter(|ext| !self.supports(ext))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LexragError::config(format!(
                "no text extractor is available for allowed extension(s): {}",
                missing.join(", ")
            )))
        }
    }

    fn extractor_for(&self, extension: &str) -> Option<&Arc<dyn TextExtractor>> {
        self.extractors
            .iter()
            .find(|extractor| extractor.extensions().contains(&extension))
    }

    pub async fn load(&self, path: &Path) -> Result<LoadedDocument> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LexragError::not_found("file", path.display().to_string())
            } else {
                LexragError::from(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(LexragError::not_found("file", path.display().to_string()));
        }

        let size_mb = metadata.len() as f64 / BYTES_PER_MB;
        if size_mb > self.max_file_size_mb as f64 {
            return Err(LexragError::FileTooLarge {
                size_mb,
                max_mb: self.max_file_size_mb,
            });
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(normalize_extension)
            .unwrap_or_default();
        let extractor = self.extractor_for(&extension).ok_or_else(|| {
            LexragError::UnsupportedFileType {
                extension: extension.clone(),
                reason: "no text extractor is available for this type".to_string(),
            }
        })?;

        let bytes = tokio::fs::read(path).await?;
        let content_hash = blake3::hash(&bytes).to_hex().to_string();
        let text = extractor.extract(&bytes)?;

        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(LoadedDocument {
            source_id,
            extension,
            size_mb,
            content_hash,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::extractors::tests::{docx_bytes, pdf_bytes};

    #[tokio::test]
    async fn loads_text_with_lossy_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Contract.TXT");
        std::fs::write(&path, b"Term: 12 months \xff end").unwrap();

        let doc = DocumentLoader::new(50).load(&path).await.unwrap();
        assert_eq!(doc.source_id, "Contract.TXT");
        assert_eq!(doc.extension, ".txt");
        assert!(doc.text.starts_with("Term: 12 months"));
        assert!(doc.text.contains('\u{FFFD}'));
        assert_eq!(doc.content_hash.len(), 64);
    }

    #[tokio::test]
    async fn same_bytes_same_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "identical").unwrap();
        std::fs::write(&b, "identical").unwrap();

        let loader = DocumentLoader::new(50);
        let first = loader.load(&a).await.unwrap();
        let second = loader.load(&b).await.unwrap();
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[tokio::test]
    async fn rejects_types_without_extractor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brief.rtf");
        std::fs::write(&path, b"{\\rtf1 brief}").unwrap();

        let err = DocumentLoader::new(50).load(&path).await.unwrap_err();
        assert!(matches!(err, LexragError::UnsupportedFileType { ref extension, .. } if extension == ".rtf"));
    }

    #[tokio::test]
    async fn loads_pdf_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.pdf");
        std::fs::write(&path, pdf_bytes(&["This Agreement is governed by the laws of Delaware."]))
            .unwrap();

        let doc = DocumentLoader::new(50).load(&path).await.unwrap();
        assert_eq!(doc.source_id, "contract.pdf");
        assert_eq!(doc.extension, ".pdf");
        assert!(doc.text.contains("governed by the laws of Delaware"));
    }

    #[tokio::test]
    async fn loads_docx_contract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Engagement.DOCX");
        std::fs::write(
            &path,
            docx_bytes("<w:p><w:r><w:t>Fees are payable within 30 days.</w:t></w:r></w:p>"),
        )
        .unwrap();

        let doc = DocumentLoader::new(50).load(&path).await.unwrap();
        assert_eq!(doc.extension, ".docx");
        assert_eq!(doc.text, "Fees are payable within 30 days.");
    }

    #[test]
    fn default_loader_covers_default_allow_list() {
        let loader = DocumentLoader::new(50);
        let defaults = lexrag_core::config::RagConfig::default().allowed_extensions;
        assert!(loader.ensure_supports(&defaults).is_ok());

        let err = loader
            .ensure_supports(&[".txt".to_string(), ".rtf".to_string()])
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(".rtf"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = DocumentLoader::new(50)
            .load(Path::new("/nonexistent/lease.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, LexragError::NotFound { .. }));
    }

    #[tokio::test]
    async fn custom_extractor_is_used() {
        struct Upper;
        impl TextExtractor for Upper {
            fn extensions(&self) -> &[&'static str] {
                &[".md"]
            }
            fn extract(&self, bytes: &[u8]) -> Result<String> {
                Ok(String::from_utf8_lossy(bytes).to_uppercase())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "clause").unwrap();

        let loader = DocumentLoader::new(50).with_extractor(Arc::new(Upper));
        assert!(loader.supports("md"));
        assert_eq!(loader.load(&path).await.unwrap().text, "CLAUSE");
    }
}
