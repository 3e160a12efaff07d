//! Loading and querying the book corpus

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::types::*;
use crate::error::{Error, Result};
use crate::patterns::{PatternSummary, PatternType};

/// Search keywords for the reading that covers each motif
pub fn topics_for_pattern(pattern: PatternType) -> &'static [&'static str] {
    match pattern {
        PatternType::HangingPiece => &["hanging", "undefended", "loose piece"],
        PatternType::KnightFork => &["fork", "double attack"],
        PatternType::Pin => &["pin"],
        PatternType::BackRank => &["back rank", "king safety"],
    }
}

/// Books keyed by title
#[derive(Debug, Clone, Default)]
pub struct BookLibrary {
    books: BTreeMap<String, Book>,
}

impl BookLibrary {
    /// Loads every `*.json` file in `dir`. Files that fail to parse are
    /// logged and skipped; a missing directory gives an empty library.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "books directory not found");
            return Ok(Self::default());
        }

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut books = Vec::new();
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|text| serde_json::from_str::<Book>(&text).map_err(Error::from));
            match parsed {
                Ok(book) => {
                    info!(
                        title = %book.metadata.title,
                        sections = book.metadata.total_sections,
                        games = book.metadata.total_games,
                        "loaded book"
                    );
                    books.push(book);
                }
                Err(e) => warn!(path = %path.display(), "failed to load book: {}", e),
            }
        }

        Ok(Self::from_books(books))
    }

    /// Later books replace earlier ones with the same title
    pub fn from_books(books: impl IntoIterator<Item = Book>) -> Self {
        let books = books
            .into_iter()
            .map(|b| (b.metadata.title.clone(), b))
            .collect();
        Self { books }
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    pub fn infos(&self) -> Vec<BookInfo> {
        self.books.values().map(|b| BookInfo::from(&b.metadata)).collect()
    }

    pub fn get(&self, title: &str) -> Option<&Book> {
        self.books.get(title)
    }

    pub fn get_section(&self, title: &str, section_number: u32) -> Option<&Section> {
        self.books
            .get(title)?
            .sections()
            .map(|(_, section)| section)
            .find(|s| s.section_number == section_number)
    }

    /// Sections whose topics or title contain any keyword, ignoring case.
    /// A section matching several keywords is reported once.
    pub fn search_topics<S: AsRef<str>>(&self, keywords: &[S]) -> Vec<SectionHit> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for (title, book) in &self.books {
            for (chapter, section) in book.sections() {
                let section_title = section.title.to_lowercase();
                let topics: Vec<String> = section.topics.iter().map(|t| t.to_lowercase()).collect();

                let matched = keywords
                    .iter()
                    .any(|kw| section_title.contains(kw) || topics.iter().any(|t| t.contains(kw)));
                if matched {
                    hits.push(SectionHit {
                        book: title.clone(),
                        chapter: chapter.title.clone(),
                        section_number: section.section_number,
                        section_title: section.title.clone(),
                        topics: section.topics.clone(),
                    });
                }
            }
        }
        hits
    }

    /// Sections covering the motifs found in `summary`, most frequent
    /// motif first, without duplicates
    pub fn suggested_reading(&self, summary: &PatternSummary, limit: usize) -> Vec<SectionHit> {
        let mut ranked: Vec<(PatternType, usize)> = summary
            .tactical_patterns
            .iter()
            .filter(|(_, findings)| !findings.is_empty())
            .map(|(pattern, findings)| (*pattern, findings.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let mut seen = BTreeSet::new();
        let mut reading = Vec::new();
        for (pattern, _) in ranked {
            for hit in self.search_topics(topics_for_pattern(pattern)) {
                if reading.len() >= limit {
                    return reading;
                }
                if seen.insert((hit.book.clone(), hit.section_number)) {
                    reading.push(hit);
                }
            }
        }
        reading.truncate(limit);
        reading
    }

    /// Renders a whole book as plain text for a model prompt.
    /// Unknown titles give an empty string.
    pub fn format_for_prompt(&self, title: &str) -> String {
        let Some(book) = self.books.get(title) else {
            return String::new();
        };

        let meta = &book.metadata;
        let mut header = format!("=== {} by {}", meta.title.to_uppercase(), meta.author);
        if let Some(year) = meta.year {
            header.push_str(&format!(" ({})", year));
        }
        header.push_str(" ===");

        let mut lines = vec![header, String::new()];

        for part in &book.parts {
            lines.push(format!("PART {}", part.part_number));
            lines.push(String::new());

            for chapter in &part.chapters {
                lines.push(format!("CHAPTER {}: {}", chapter.chapter_number, chapter.title));
                lines.push(String::new());

                for section in &chapter.sections {
                    let heading = format!("Section {}: {}", section.section_number, section.title);
                    let rule = "-".repeat(heading.chars().count());
                    lines.push(heading);
                    lines.push(rule);
                    lines.push(section.content.clone());
                    lines.push(String::new());
                }
            }
        }

        if !book.illustrative_games.is_empty() {
            lines.push("ILLUSTRATIVE GAMES".to_string());
            lines.push(String::new());

            for game in &book.illustrative_games {
                let heading = format!(
                    "Game {}: {} vs {} - {} ({})",
                    game.game_number, game.white, game.black, game.opening, game.event
                );
                let rule = "-".repeat(heading.chars().count());
                lines.push(heading);
                lines.push(rule);
                lines.push(game.content.clone());
                lines.push(String::new());
            }
        }

        lines.join("\n")
    }
}
