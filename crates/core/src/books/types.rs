//! Structured book corpus types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub total_sections: u32,
    #[serde(default)]
    pub total_games: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub section_number: u32,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_number: u32,
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub part_number: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllustrativeGame {
    pub game_number: u32,
    #[serde(default)]
    pub white: String,
    #[serde(default)]
    pub black: String,
    #[serde(default)]
    pub opening: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub metadata: BookMetadata,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub illustrative_games: Vec<IllustrativeGame>,
}

impl Book {
    /// Every section with the chapter that contains it, in reading order
    pub fn sections(&self) -> impl Iterator<Item = (&Chapter, &Section)> {
        self.parts
            .iter()
            .flat_map(|part| part.chapters.iter())
            .flat_map(|chapter| chapter.sections.iter().map(move |s| (chapter, s)))
    }
}

/// A section matched by a topic search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHit {
    pub book: String,
    pub chapter: String,
    pub section_number: u32,
    pub section_title: String,
    pub topics: Vec<String>,
}

/// Listing entry for a loaded book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInfo {
    pub title: String,
    pub author: String,
    pub year: Option<u32>,
    pub total_sections: u32,
    pub total_games: u32,
}

impl From<&BookMetadata> for BookInfo {
    fn from(meta: &BookMetadata) -> Self {
        Self {
            title: meta.title.clone(),
            author: meta.author.clone(),
            year: meta.year,
            total_sections: meta.total_sections,
            total_games: meta.total_games,
        }
    }
}
