//! Text extraction for ingested files.
//!
//! PDFs go through `pdf-extract`; Markdown and plain text are read as
//! UTF-8. Table text is produced by an external extractor and dropped next
//! to the source as `<file>.tables.txt`.

use std::path::{Path, PathBuf};

/// Suffix of table sidecar files.
pub const TABLE_SIDECAR_SUFFIX: &str = ".tables.txt";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extract the body text of `path`, dispatching on its extension.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => {
            let bytes = read(path)?;
            extract_pdf(&bytes)
        }
        "md" | "markdown" | "txt" => {
            let bytes = read(path)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        other => Err(ExtractError::UnsupportedType(other.to_string())),
    }
}

pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// `report.pdf` → `report.pdf.tables.txt`.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TABLE_SIDECAR_SUFFIX);
    PathBuf::from(name)
}

pub fn is_sidecar(path: &Path) -> bool {
    path.to_string_lossy().ends_with(TABLE_SIDECAR_SUFFIX)
}

/// Table text for `path`, if a non-blank sidecar exists.
pub fn read_table_sidecar(path: &Path) -> Result<Option<String>, ExtractError> {
    let sidecar = sidecar_path(path);
    if !sidecar.is_file() {
        return Ok(None);
    }
    let bytes = read(&sidecar)?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    Ok(if text.trim().is_empty() { None } else { Some(text) })
}

fn read(path: &Path) -> Result<Vec<u8>, ExtractError> {
    std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_markdown_and_text() {
        let tmp = TempDir::new().unwrap();
        let md = tmp.path().join("a.md");
        std::fs::write(&md, "# Title\n\nBody").unwrap();
        assert_eq!(extract_file(&md).unwrap(), "# Title\n\nBody");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = extract_file(Path::new("slides.pptx")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(ref e) if e == "pptx"));
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        assert!(matches!(extract_pdf(b"not a pdf"), Err(ExtractError::Pdf(_))));
    }

    #[test]
    fn test_sidecar_naming() {
        let path = Path::new("docs/report.pdf");
        assert_eq!(sidecar_path(path), PathBuf::from("docs/report.pdf.tables.txt"));
        assert!(is_sidecar(&sidecar_path(path)));
        assert!(!is_sidecar(path));
    }

    #[test]
    fn test_blank_sidecar_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("r.txt");
        std::fs::write(&doc, "body").unwrap();
        assert_eq!(read_table_sidecar(&doc).unwrap(), None);

        std::fs::write(sidecar_path(&doc), "  \n").unwrap();
        assert_eq!(read_table_sidecar(&doc).unwrap(), None);

        std::fs::write(sidecar_path(&doc), "a | b").unwrap();
        assert_eq!(read_table_sidecar(&doc).unwrap().as_deref(), Some("a | b"));
    }
}
