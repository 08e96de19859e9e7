use serde::{Deserialize, Serialize};

/// One entry of the remote `artlist` response, kept exactly as delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArticle {
    pub url: Option<String>,
    pub url_mobile: Option<String>,
    pub title: Option<String>,
    pub seendate: Option<String>,
    pub socialimage: Option<String>,
    pub domain: Option<String>,
    pub language: Option<String>,
    pub sourcecountry: Option<String>,
}

impl RawArticle {
    /// The deduplication key. Empty strings count as missing.
    pub fn key(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// The unit that first contributed a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Provenance {
    pub query: String,
    pub window: String,
}

/// A deduplicated article tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub url: String,
    pub article: RawArticle,
    pub provenance: Provenance,
}

/// Outcome of one fetch. A degraded result never carries partial records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult {
    Complete { articles: Vec<RawArticle> },
    Degraded { reason: String },
}

impl FetchResult {
    pub fn complete(articles: Vec<RawArticle>) -> Self {
        Self::Complete { articles }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
        }
    }

    pub fn articles(&self) -> &[RawArticle] {
        match self {
            Self::Complete { articles } => articles,
            Self::Degraded { .. } => &[],
        }
    }

    pub fn into_articles(self) -> Vec<RawArticle> {
        match self {
            Self::Complete { articles } => articles,
            Self::Degraded { .. } => Vec::new(),
        }
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Self::Complete { .. } => None,
            Self::Degraded { reason } => Some(reason),
        }
    }
}
