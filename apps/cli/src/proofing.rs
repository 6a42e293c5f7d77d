//! Spell-check of the rendered résumé text. Advisory only: findings are
//! logged as a warning and never stop a run.

use std::collections::{BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::Path;

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::render::html::markdown_options;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("word pattern is valid"));

#[derive(Debug, Clone, Default, Serialize)]
pub struct SpellingReport {
    /// Unknown words, lowercased, sorted, de-duplicated.
    pub misspelled: Vec<String>,
    pub words_checked: usize,
}

impl SpellingReport {
    pub fn is_clean(&self) -> bool {
        self.misspelled.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpellChecker {
    known: HashSet<String>,
}

impl SpellChecker {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut checker = Self::default();
        checker.add_words(words);
        checker
    }

    pub fn add_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known.extend(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
    }

    /// Loads the base word list plus the custom dictionary.
    ///
    /// Returns `None` (after a warning) when the base word list cannot be
    /// read: without it every word would be flagged. A missing custom
    /// dictionary is treated as empty.
    pub async fn load(word_list: &Path, custom_dictionary: &Path) -> Option<Self> {
        let base = match tokio::fs::read_to_string(word_list).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Spell-check skipped: cannot read word list {}: {e}. \
                     Install a system word list or pass --word-list <file>.",
                    word_list.display()
                );
                return None;
            }
        };
        let mut checker = Self::from_words(base.lines());

        match tokio::fs::read_to_string(custom_dictionary).await {
            Ok(custom) => checker.add_words(custom.lines()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No custom dictionary at {}", custom_dictionary.display());
            }
            Err(e) => warn!(
                "Ignoring custom dictionary {}: {e}",
                custom_dictionary.display()
            ),
        }
        debug!(words = checker.known.len(), "Spell-check dictionary loaded");
        Some(checker)
    }

    pub fn check_markdown(&self, markdown: &str) -> SpellingReport {
        self.check_text(&rendered_text(markdown))
    }

    pub fn check_text(&self, text: &str) -> SpellingReport {
        let mut misspelled = BTreeSet::new();
        let mut words_checked = 0;
        for word in WORD.find_iter(text).map(|m| m.as_str()) {
            if !should_check(word) {
                continue;
            }
            words_checked += 1;
            let lower = word.to_lowercase();
            if !self.is_known(&lower) {
                misspelled.insert(lower);
            }
        }
        SpellingReport {
            misspelled: misspelled.into_iter().collect(),
            words_checked,
        }
    }

    /// `\w` includes `_`, so `snake_case` tokens are checked piecewise.
    fn is_known(&self, lower: &str) -> bool {
        self.known.contains(lower)
            || (lower.contains('_')
                && lower
                    .split('_')
                    .filter(|p| should_check(p))
                    .all(|p| self.known.contains(p)))
    }
}

/// Skips single characters and anything containing a digit (dates, versions, metrics).
fn should_check(word: &str) -> bool {
    word.chars().count() > 1 && !word.chars().any(|c| c.is_ascii_digit())
}

/// Visible text of the rendered Markdown: no link targets, no code.
pub fn rendered_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());
    let mut in_code_block = false;
    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(t) if !in_code_block => {
                text.push_str(&t);
                text.push(' ');
            }
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Runs the check and logs the outcome.
pub fn warn_on_misspellings(checker: &SpellChecker, markdown: &str) -> SpellingReport {
    let report = checker.check_markdown(markdown);
    if report.is_clean() {
        debug!(words = report.words_checked, "No spelling errors found");
    } else {
        warn!(
            "Spelling errors found: {}",
            report.misspelled.join(", ")
        );
    }
    report
}
