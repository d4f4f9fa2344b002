pub mod providers;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Search provider abstraction - different search APIs can be plugged in
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fetch results for a query in the given category
    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SearchError>;
}

/// Kind of results a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Web,
    Image,
    Video,
    Place,
    News,
    Shopping,
    Scholarly,
    Patent,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Web,
        Category::Image,
        Category::Video,
        Category::Place,
        Category::News,
        Category::Shopping,
        Category::Scholarly,
        Category::Patent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Web => "web",
            Category::Image => "image",
            Category::Video => "video",
            Category::Place => "place",
            Category::News => "news",
            Category::Shopping => "shopping",
            Category::Scholarly => "scholarly",
            Category::Patent => "patent",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" | "search" => Ok(Category::Web),
            "image" | "images" => Ok(Category::Image),
            "video" | "videos" => Ok(Category::Video),
            "place" | "places" => Ok(Category::Place),
            "news" => Ok(Category::News),
            "shopping" => Ok(Category::Shopping),
            "scholarly" | "scholar" => Ok(Category::Scholarly),
            "patent" | "patents" => Ok(Category::Patent),
            other => Err(format!("Unknown category: {other}")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user submission: free text plus the category it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub category: Category,
}

impl Query {
    pub fn new(text: impl Into<String>, category: Category) -> Self {
        Self {
            text: text.into(),
            category,
        }
    }
}

/// Individual search result
///
/// The populated fields are fixed by the category: `details` carries one
/// variant per [`Category`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Result URL
    pub link: String,
    #[serde(flatten)]
    pub details: ResultDetails,
}

impl SearchResult {
    pub fn category(&self) -> Category {
        self.details.category()
    }

    /// Snippet text, for categories that carry one
    pub fn snippet(&self) -> Option<&str> {
        match &self.details {
            ResultDetails::Web { snippet }
            | ResultDetails::News { snippet, .. }
            | ResultDetails::Scholarly { snippet, .. }
            | ResultDetails::Patent { snippet } => Some(snippet),
            _ => None,
        }
    }
}

/// Category-specific fields of a [`SearchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultDetails {
    Web {
        snippet: String,
    },
    Image {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    Video {
        thumbnail: String,
        duration: String,
        channel: String,
        views: String,
    },
    Place {
        address: String,
        rating: String,
        reviews: String,
    },
    News {
        snippet: String,
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    Shopping {
        price: String,
        rating: String,
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
    Scholarly {
        snippet: String,
        authors: Vec<String>,
        year: String,
        publisher: String,
    },
    Patent {
        snippet: String,
    },
}

impl ResultDetails {
    pub fn category(&self) -> Category {
        match self {
            ResultDetails::Web { .. } => Category::Web,
            ResultDetails::Image { .. } => Category::Image,
            ResultDetails::Video { .. } => Category::Video,
            ResultDetails::Place { .. } => Category::Place,
            ResultDetails::News { .. } => Category::News,
            ResultDetails::Shopping { .. } => Category::Shopping,
            ResultDetails::Scholarly { .. } => Category::Scholarly,
            ResultDetails::Patent { .. } => Category::Patent,
        }
    }
}

/// Search-related errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search API key is not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("Invalid search API key")]
    InvalidApiKey,

    #[error("Search rate limit exceeded")]
    RateLimitExceeded,

    #[error("Search API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
