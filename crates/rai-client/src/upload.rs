//! # Document Upload
//!
//! A session takes two documents: the financial statements (required) and
//! the notes (optional here, though the server only advances the session
//! once both are present). Files are checked locally before any bytes are
//! sent.

use std::path::Path;

use thiserror::Error;

/// Accepted file extensions, lower case.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "docx", "xlsx", "csv", "txt"];

/// Largest accepted document.
pub const MAX_FILE_BYTES: usize = 50 * 1024 * 1024;

/// A document rejected before upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("financial statements document is required")]
    MissingFinancialStatements,

    #[error("{file_name} is empty")]
    EmptyFile { file_name: String },

    #[error("{file_name}: unsupported file type; expected one of pdf, docx, xlsx, csv, txt")]
    UnsupportedExtension { file_name: String },

    #[error("{file_name} is {size} bytes; the limit is {MAX_FILE_BYTES}")]
    TooLarge { file_name: String, size: usize },

    #[error("cannot read {path}: {message}")]
    Unreadable { path: String, message: String },
}

/// One document to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a document from disk.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path).map_err(|e| UploadError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, bytes })
    }

    /// MIME type sent with the part.
    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("pdf") => "application/pdf",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("csv") => "text/csv",
            _ => "text/plain",
        }
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    fn validate(&self) -> Result<(), UploadError> {
        let ext = self.extension();
        if !ext
            .as_deref()
            .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e))
        {
            return Err(UploadError::UnsupportedExtension {
                file_name: self.file_name.clone(),
            });
        }
        if self.bytes.is_empty() {
            return Err(UploadError::EmptyFile {
                file_name: self.file_name.clone(),
            });
        }
        if self.bytes.len() > MAX_FILE_BYTES {
            return Err(UploadError::TooLarge {
                file_name: self.file_name.clone(),
                size: self.bytes.len(),
            });
        }
        Ok(())
    }
}

/// The documents of one upload call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub financial_statements: Option<UploadDocument>,
    pub notes: Option<UploadDocument>,
}

impl UploadRequest {
    pub fn validate(&self) -> Result<(), UploadError> {
        let fs = self
            .financial_statements
            .as_ref()
            .ok_or(UploadError::MissingFinancialStatements)?;
        fs.validate()?;
        if let Some(notes) = &self.notes {
            notes.validate()?;
        }
        Ok(())
    }

    pub fn has_notes(&self) -> bool {
        self.notes.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, len: usize) -> UploadDocument {
        UploadDocument::new(name, vec![b'x'; len])
    }

    #[test]
    fn financial_statements_required() {
        let req = UploadRequest {
            financial_statements: None,
            notes: Some(doc("notes.pdf", 10)),
        };
        assert_eq!(req.validate(), Err(UploadError::MissingFinancialStatements));
    }

    #[test]
    fn empty_and_unsupported_files_rejected() {
        let req = UploadRequest {
            financial_statements: Some(doc("fs.pdf", 0)),
            notes: None,
        };
        assert!(matches!(req.validate(), Err(UploadError::EmptyFile { .. })));

        let req = UploadRequest {
            financial_statements: Some(doc("fs.exe", 10)),
            notes: None,
        };
        assert!(matches!(
            req.validate(),
            Err(UploadError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn notes_are_checked_when_present() {
        let req = UploadRequest {
            financial_statements: Some(doc("FS.PDF", 10)),
            notes: Some(doc("notes", 10)),
        };
        assert!(req.validate().is_err());
        let req = UploadRequest {
            financial_statements: Some(doc("FS.PDF", 10)),
            notes: Some(doc("notes.docx", 10)),
        };
        req.validate().unwrap();
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(doc("a.PDF", 1).content_type(), "application/pdf");
        assert_eq!(doc("a.csv", 1).content_type(), "text/csv");
        assert_eq!(doc("a.txt", 1).content_type(), "text/plain");
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = UploadDocument::from_path(Path::new("/nonexistent/fs.pdf")).unwrap_err();
        assert!(matches!(err, UploadError::Unreadable { .. }));
    }
}
