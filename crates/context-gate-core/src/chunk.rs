//! Deterministic sliding-window chunker.
//!
//! Splits document text into overlapping [`Fragment`]s of at most
//! `chunk_size` characters. The window advances by `chunk_size - overlap`
//! characters and the loop stops once the window start reaches the end of
//! the text, so the last window may be shorter than `chunk_size`.
//!
//! Offsets are measured in Unicode scalar values, not bytes. Each window is
//! stripped of leading and trailing whitespace; windows that are empty
//! after stripping are dropped. Offsets recorded in the metadata are those
//! of the window before stripping.
//!
//! # Fragment identity
//!
//! A fragment id is the hex SHA-1 of `source_id ++ start ++ prefix`, where
//! `start` is the decimal window offset and `prefix` is the first
//! [`ID_PREFIX_CHARS`] characters of the stripped text. Re-chunking the
//! same document with the same parameters reproduces the same ids, which
//! makes index writes idempotent. Changing `chunk_size` or `overlap` moves
//! the window offsets and yields new ids, so the index grows additively.
//!
//! # Example
//!
//! ```rust
//! use context_gate_core::chunk::Chunker;
//! use context_gate_core::models::SourceMetadata;
//!
//! let chunker = Chunker::new(10, 2).unwrap();
//! let fragments = chunker.split("abcdefghijklmnopqrst", &SourceMetadata::new("doc"));
//! assert_eq!(fragments.len(), 3);
//! assert_eq!(fragments[1].metadata.start, 8);
//! ```

use sha1::{Digest, Sha1};

use crate::document::IngestedDocument;
use crate::error::ConfigError;
use crate::models::{Fragment, FragmentMetadata, Section, SourceMetadata};

/// Number of leading characters of a fragment that feed its id.
pub const ID_PREFIX_CHARS: usize = 100;

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_OVERLAP: usize = 100;

/// Fixed-size character window chunker with overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
    strategy: String,
}

impl Chunker {
    /// Create a chunker tagged with the default strategy name
    /// (`char_window_{chunk_size}_overlap_{overlap}`).
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        Self::with_strategy(chunk_size, overlap, strategy_name(chunk_size, overlap))
    }

    /// Create a chunker with an explicit strategy tag.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroChunkSize`] or [`ConfigError::OverlapTooLarge`]
    /// when `overlap >= chunk_size`.
    pub fn with_strategy(
        chunk_size: usize,
        overlap: usize,
        strategy: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
            strategy: strategy.into(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Split `text` into overlapping fragments.
    ///
    /// Returns an empty vector for empty or whitespace-only input.
    pub fn split(&self, text: &str, source: &SourceMetadata) -> Vec<Fragment> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the string.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;
        let stride = self.chunk_size - self.overlap;

        let mut fragments = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            let window = text[bounds[start]..bounds[end]].trim();

            if !window.is_empty() {
                fragments.push(Fragment {
                    id: fragment_id(&source.source_id, start, window),
                    text: window.to_string(),
                    metadata: FragmentMetadata {
                        source_id: source.source_id.clone(),
                        start,
                        end,
                        strategy: self.strategy.clone(),
                        section: Section::Text,
                        extra: source.extra.clone(),
                    },
                });
            }

            start += stride;
        }

        fragments
    }
}

/// Chunk an ingested document and tag fragments that begin inside the
/// table part of its combined text as [`Section::Table`].
pub fn chunk_document(doc: &IngestedDocument, chunker: &Chunker) -> Vec<Fragment> {
    let source = SourceMetadata {
        source_id: doc.source_id.clone(),
        extra: doc.metadata.clone(),
    };
    let table_start = doc.table_start();

    let mut fragments = chunker.split(&doc.combined_text, &source);
    for fragment in &mut fragments {
        if matches!(table_start, Some(ts) if fragment.metadata.start >= ts) {
            fragment.metadata.section = Section::Table;
        }
    }
    fragments
}

/// Default strategy tag for a window size and overlap.
pub fn strategy_name(chunk_size: usize, overlap: usize) -> String {
    format!("char_window_{}_overlap_{}", chunk_size, overlap)
}

/// Stable fragment id: SHA-1 over source id, decimal start offset and the
/// first [`ID_PREFIX_CHARS`] characters of the stripped text.
pub fn fragment_id(source_id: &str, start: usize, text: &str) -> String {
    let prefix: String = text.chars().take(ID_PREFIX_CHARS).collect();

    let mut hasher = Sha1::new();
    hasher.update(source_id.as_bytes());
    hasher.update(start.to_string().as_bytes());
    hasher.update(prefix.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceMetadata {
        SourceMetadata::new("report.pdf")
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        assert_eq!(
            Chunker::new(100, 100),
            Err(ConfigError::OverlapTooLarge {
                overlap: 100,
                chunk_size: 100
            })
        );
        assert!(Chunker::new(100, 150).is_err());
        assert_eq!(Chunker::new(0, 0), Err(ConfigError::ZeroChunkSize));
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        let chunker = Chunker::new(800, 100).unwrap();
        assert!(chunker.split("", &source()).is_empty());
        assert!(chunker.split("   \n\t  ", &source()).is_empty());
    }

    #[test]
    fn test_short_text_single_fragment() {
        let chunker = Chunker::new(800, 100).unwrap();
        let fragments = chunker.split("  Hello, world!  ", &source());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "Hello, world!");
        assert_eq!(fragments[0].metadata.start, 0);
        assert_eq!(fragments[0].metadata.end, 17);
        assert_eq!(fragments[0].metadata.strategy, "char_window_800_overlap_100");
        assert_eq!(fragments[0].metadata.source_id, "report.pdf");
    }

    #[test]
    fn test_windows_and_tail() {
        let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunker = Chunker::new(800, 100).unwrap();
        let fragments = chunker.split(&text, &source());

        let ranges: Vec<(usize, usize)> = fragments
            .iter()
            .map(|f| (f.metadata.start, f.metadata.end))
            .collect();
        assert_eq!(ranges, vec![(0, 800), (700, 1000)]);
        assert_eq!(fragments[1].text.chars().count(), 300);
    }

    #[test]
    fn test_consecutive_fragments_overlap_exactly() {
        let text: String = "lorem ipsum dolor sit amet ".repeat(200);
        for (size, overlap) in [(50, 10), (120, 0), (333, 332), (800, 100)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            let fragments = chunker.split(&text, &source());
            assert!(fragments.len() > 1);
            let n = fragments.len();
            for pair in fragments[..n - 1].windows(2) {
                let (a, b) = (&pair[0].metadata, &pair[1].metadata);
                if b.end - b.start < size {
                    continue;
                }
                assert_eq!(a.end - b.start, overlap, "size={} overlap={}", size, overlap);
            }
        }
    }

    #[test]
    fn test_deterministic_ids() {
        let text = "Alpha section.\n\nBeta section with more words.\n\nGamma.".repeat(40);
        let chunker = Chunker::new(120, 30).unwrap();
        let a = chunker.split(&text, &source());
        let b = chunker.split(&text, &source());
        assert_eq!(a, b);

        let ids: std::collections::HashSet<&str> = a.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids.len(), a.len());
    }

    #[test]
    fn test_id_formula() {
        let chunker = Chunker::new(800, 100).unwrap();
        let fragments = chunker.split("Hello", &source());
        assert_eq!(fragments[0].id, fragment_id("report.pdf", 0, "Hello"));
        assert_eq!(fragments[0].id.len(), 40);
    }

    #[test]
    fn test_id_depends_on_source_and_parameters() {
        let text = "x".repeat(500);
        let a = Chunker::new(200, 50).unwrap().split(&text, &source());
        let b = Chunker::new(200, 50)
            .unwrap()
            .split(&text, &SourceMetadata::new("other.pdf"));
        let c = Chunker::new(250, 50).unwrap().split(&text, &source());
        assert_ne!(a[0].id, b[0].id);
        // Same start offset and same prefix: same id regardless of window size.
        assert_eq!(a[0].id, c[0].id);
        assert_ne!(a[1].id, c[1].id);
    }

    #[test]
    fn test_id_ignores_text_past_prefix() {
        let shared: String = "p".repeat(ID_PREFIX_CHARS);
        assert_eq!(
            fragment_id("s", 0, &format!("{}AAA", shared)),
            fragment_id("s", 0, &format!("{}BBB", shared))
        );
        assert_ne!(fragment_id("s", 0, "abc"), fragment_id("s", 1, "abc"));
    }

    #[test]
    fn test_whitespace_windows_dropped() {
        let text = format!("{}{}{}", "a".repeat(10), " ".repeat(30), "b".repeat(10));
        let chunker = Chunker::new(10, 0).unwrap();
        let fragments = chunker.split(&text, &source());
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaaaaaaaa", "bbbbbbbbbb"]);
        assert_eq!(fragments[1].metadata.start, 40);
    }

    #[test]
    fn test_multibyte_offsets_are_chars() {
        let text = "┌──┐ héllo wörld ┌──┐".repeat(5);
        let chunker = Chunker::new(7, 2).unwrap();
        let fragments = chunker.split(&text, &source());
        let total = text.chars().count();
        assert!(!fragments.is_empty());
        for f in &fragments {
            assert!(f.metadata.end <= total);
            assert!(f.text.chars().count() <= 7);
        }
    }

    #[test]
    fn test_chunk_document_tags_table_section() {
        let doc = IngestedDocument::assemble(
            "report.pdf",
            &"Body text. ".repeat(20),
            Some("| year | count |\n| 2020 | 12 |"),
            12_000,
        );
        let table_start = doc.table_start().unwrap();
        let chunker = Chunker::new(60, 10).unwrap();
        let fragments = chunk_document(&doc, &chunker);

        assert!(fragments.iter().any(|f| f.metadata.section == Section::Table));
        for f in &fragments {
            let expected = if f.metadata.start >= table_start {
                Section::Table
            } else {
                Section::Text
            };
            assert_eq!(f.metadata.section, expected);
        }
    }

    #[test]
    fn test_chunk_document_without_tables() {
        let doc = IngestedDocument::assemble("notes.md", "Just prose.", None, 12_000);
        let fragments = chunk_document(&doc, &Chunker::new(800, 100).unwrap());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].metadata.section, Section::Text);
    }
}
