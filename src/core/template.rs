//! Placeholder substitution inside `.docx` archives.
//!
//! Word freely splits a typed `{{NAME}}` into several runs, so the braces and
//! the key may be separated by XML tags and whitespace. A placeholder is
//! `{{KEY}}` or `{KEY}}` (a common typo in the templates); keys match
//! case-insensitively.

use crate::domain::model::ReportData;
use crate::utils::error::{BotError, Result};
use regex::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const TAGS_AND_SPACE: &str = r"\s*(?:</?[^>]+>)*\s*";

/// Compiled placeholder matcher for one set of report values.
///
/// All keys share one alternation so each part is scanned once and inserted
/// values are never themselves searched for placeholders.
pub struct PlaceholderSet {
    pattern: Option<Regex>,
    values: HashMap<String, String>,
}

impl PlaceholderSet {
    pub fn new(data: &ReportData) -> Result<Self> {
        let values: HashMap<String, String> = data
            .iter()
            .map(|(key, value)| (key.to_uppercase(), escape_xml(value)))
            .collect();

        if values.is_empty() {
            return Ok(Self {
                pattern: None,
                values,
            });
        }

        let keys: Vec<String> = data.iter().map(|(key, _)| regex::escape(key)).collect();
        let source = format!(
            r"\{{\{{?{tags}({keys}){tags}\}}\}}",
            tags = TAGS_AND_SPACE,
            keys = keys.join("|")
        );
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| BotError::TemplateError {
                message: format!("invalid placeholder pattern: {}", e),
            })?;

        Ok(Self {
            pattern: Some(pattern),
            values,
        })
    }

    /// Returns `None` when nothing matched, so untouched parts are copied as-is.
    pub fn apply(&self, xml: &str) -> Option<String> {
        let pattern = self.pattern.as_ref()?;
        let replaced = pattern.replace_all(xml, |caps: &Captures| {
            let key = caps[1].to_uppercase();
            self.values.get(&key).cloned().unwrap_or_default()
        });
        match replaced {
            Cow::Borrowed(_) => None,
            Cow::Owned(filled) => Some(filled),
        }
    }
}

/// Parts Word keeps text in: the body, headers, footers, drawings, ...
fn is_word_xml_part(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("word/") && lower.ends_with(".xml")
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Fills every placeholder in `template` and returns the new `.docx` bytes.
pub fn fill_docx(template: &[u8], data: &ReportData) -> Result<Vec<u8>> {
    let placeholders = PlaceholderSet::new(data)?;
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut touched_parts = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;

        if is_word_xml_part(&name) {
            match std::str::from_utf8(&bytes) {
                Ok(xml) => {
                    if let Some(filled) = placeholders.apply(xml) {
                        tracing::debug!(part = %name, "placeholders replaced");
                        touched_parts += 1;
                        bytes = filled.into_bytes();
                    }
                }
                Err(_) => {
                    tracing::warn!(part = %name, "skipping part that is not valid UTF-8");
                }
            }
        }

        writer.start_file(name, options)?;
        writer.write_all(&bytes)?;
    }

    let cursor = writer.finish()?;
    tracing::debug!(touched_parts, "template filled");
    Ok(cursor.into_inner())
}
