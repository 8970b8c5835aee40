//! Ingested documents as handed to the chunker.
//!
//! Text and table extraction happen outside this crate. What arrives here
//! is a source id, the body text, optional table text, and free-form
//! metadata. [`IngestedDocument::assemble`] joins body and tables with a
//! fixed separator and trims the result to a character budget, keeping
//! table text intact and cutting the body first.

use serde_json::{Map, Value};

/// Width of the `=` rules around the table heading.
const RULE_WIDTH: usize = 80;

/// Separator placed between body text and table text.
pub fn table_separator() -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n\n{rule}\nTABLES FROM DOCUMENT IMAGES:\n{rule}\n")
}

/// A document ready for chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedDocument {
    pub source_id: String,
    /// Body followed (when present) by the table separator and table text.
    pub combined_text: String,
    /// Table text as extracted, before any trimming of the body.
    pub table_text: Option<String>,
    pub metadata: Map<String, Value>,
}

impl IngestedDocument {
    /// Build the combined text for a document.
    ///
    /// When the combined text exceeds `max_context_chars` characters and
    /// tables are present, the body is cut so that body, separator and
    /// tables fit together. If even the tables alone do not fit, the
    /// tables are dropped and the body is cut to the budget.
    pub fn assemble(
        source_id: &str,
        body: &str,
        table_text: Option<&str>,
        max_context_chars: usize,
    ) -> Self {
        let table_text = table_text.filter(|t| !t.trim().is_empty());
        let separator = table_separator();

        let combined_text = match table_text {
            Some(tables) => {
                let full_len =
                    body.chars().count() + separator.chars().count() + tables.chars().count();
                if full_len <= max_context_chars {
                    format!("{body}{separator}{tables}")
                } else {
                    let reserved = tables.chars().count() + separator.chars().count();
                    if max_context_chars > reserved {
                        let body_part = take_chars(body, max_context_chars - reserved);
                        format!("{body_part}{separator}{tables}")
                    } else {
                        take_chars(body, max_context_chars).to_string()
                    }
                }
            }
            None => take_chars(body, max_context_chars).to_string(),
        };

        let mut metadata = Map::new();
        metadata.insert(
            "total_chars".to_string(),
            Value::from(combined_text.chars().count()),
        );
        metadata.insert("has_tables".to_string(), Value::from(table_text.is_some()));

        Self {
            source_id: source_id.to_string(),
            combined_text,
            table_text: table_text.map(str::to_string),
            metadata,
        }
    }

    /// Character offset at which the table separator begins, if the
    /// combined text contains tables.
    pub fn table_start(&self) -> Option<usize> {
        self.table_text.as_ref()?;
        let byte = self.combined_text.find(&table_separator())?;
        Some(self.combined_text[..byte].chars().count())
    }
}

/// Prefix of `s` holding at most `n` characters.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}
