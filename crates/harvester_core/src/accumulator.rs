use std::collections::HashSet;

use crate::{ArticleRecord, Provenance, RawArticle};

/// Cross-unit record collection keyed by URL. First-seen wins.
///
/// URLs are compared exactly as delivered; no normalization is applied.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    seen: HashSet<String>,
    records: Vec<ArticleRecord>,
    duplicates: usize,
    missing_url: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one unit's articles and return how many were new.
    pub fn merge(&mut self, articles: Vec<RawArticle>, provenance: &Provenance) -> usize {
        let mut added = 0;
        for article in articles {
            let Some(url) = article.key().map(str::to_owned) else {
                self.missing_url += 1;
                continue;
            };
            if !self.seen.insert(url.clone()) {
                self.duplicates += 1;
                continue;
            }
            self.records.push(ArticleRecord {
                url,
                article,
                provenance: provenance.clone(),
            });
            added += 1;
        }
        added
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn records(&self) -> &[ArticleRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ArticleRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Articles discarded because their URL was already present.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Articles discarded because they carried no URL.
    pub fn missing_url(&self) -> usize {
        self.missing_url
    }
}
