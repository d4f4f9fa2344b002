use crate::config::SearchSettings;
use crate::search::{Category, Query, ResultDetails, SearchError, SearchProvider, SearchResult};
use serde_json::Value;
use std::time::Duration;

const SERPER_BASE_URL: &str = "https://google.serper.dev";

/// Serper.dev (Google results) search provider
///
/// Requires an API key, read from the environment variable named in
/// `search.api_key_env` (default `SERPER_API_KEY`).
/// Documentation: https://serper.dev/
pub struct SerperSearchProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    gl: &'static str,
    hl: &'static str,
    num_results: usize,
}

impl SerperSearchProvider {
    /// Create a provider from search settings, resolving the key from the environment
    pub fn from_settings(settings: &SearchSettings) -> Result<Self, SearchError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(env = %settings.api_key_env, "search API key not set, searches will fail");
        }

        let (gl, hl) = match settings.language.as_str() {
            "ar" => ("sa", "ar"),
            _ => ("us", "en"),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: SERPER_BASE_URL.to_string(),
            api_key,
            api_key_env: settings.api_key_env.clone(),
            gl,
            hl,
            num_results: settings.num_results,
        })
    }

    /// Override the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Point the provider at a different host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Serper endpoint path for a category
    pub fn endpoint_path(category: Category) -> &'static str {
        match category {
            Category::Web => "search",
            Category::Image => "images",
            Category::Video => "videos",
            Category::Place => "places",
            Category::News => "news",
            Category::Shopping => "shopping",
            Category::Scholarly => "scholar",
            Category::Patent => "patents",
        }
    }
}

#[async_trait::async_trait]
impl SearchProvider for SerperSearchProvider {
    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SearchError::MissingApiKey(self.api_key_env.clone()));
        };

        let url = format!("{}/{}", self.base_url, Self::endpoint_path(query.category));

        tracing::debug!(
            query = %query.text,
            category = %query.category,
            num = self.num_results,
            "performing serper search"
        );

        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "q": query.text,
                "gl": self.gl,
                "hl": self.hl,
                "num": self.num_results,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            tracing::warn!(
                status = %status,
                error = %crate::logging::redact_secrets(&error_text),
                "serper search api error"
            );

            return match status.as_u16() {
                401 | 403 => Err(SearchError::InvalidApiKey),
                429 => Err(SearchError::RateLimitExceeded),
                _ => Err(SearchError::Api(
                    format!("HTTP {}: {}", status, error_text).trim().to_string(),
                )),
            };
        }

        let json: Value = response.json().await?;
        let results = parse_results(query.category, &json);

        tracing::debug!(
            query = %query.text,
            result_count = results.len(),
            "serper search completed"
        );

        Ok(results)
    }
}

/// Map a Serper response body to results of the given category
pub fn parse_results(category: Category, json: &Value) -> Vec<SearchResult> {
    let items = match category {
        Category::Image => items(json, &["images", "images_results"]),
        Category::Video => items(json, &["videos", "video_results"]),
        Category::News => items(json, &["news", "news_results"]),
        Category::Shopping => items(json, &["shopping", "shopping_results"]),
        Category::Scholarly => items(json, &["organic", "scholar"]),
        Category::Place => items(json, &["places", "organic", "organic_results"]),
        Category::Web | Category::Patent => items(json, &["organic", "organic_results"]),
    };

    items
        .iter()
        .filter_map(|item| {
            let link = text(item, &["link", "url", "imageUrl", "thumbnailUrl", "website"]);
            if link.is_empty() {
                tracing::trace!("skipping serper item without a link");
                return None;
            }

            let details = match category {
                Category::Web => ResultDetails::Web {
                    snippet: text(item, &["snippet", "description"]),
                },
                Category::Patent => ResultDetails::Patent {
                    snippet: text(item, &["snippet", "description"]),
                },
                Category::Image => ResultDetails::Image {
                    image_url: text(item, &["thumbnailUrl", "imageUrl"]),
                },
                Category::Video => ResultDetails::Video {
                    thumbnail: text(item, &["thumbnail", "thumbnailUrl", "imageUrl"]),
                    duration: text(item, &["duration"]),
                    channel: text(item, &["channel", "source"]),
                    views: text(item, &["views"]),
                },
                Category::News => ResultDetails::News {
                    snippet: text(item, &["snippet", "summary"]),
                    image_url: text(item, &["imageUrl", "thumbnail"]),
                },
                Category::Shopping => ResultDetails::Shopping {
                    price: text(item, &["price", "priceFormatted"]),
                    rating: text(item, &["rating", "stars"]),
                    image_url: text(item, &["imageUrl", "thumbnail"]),
                },
                Category::Place => ResultDetails::Place {
                    address: text(item, &["address"]),
                    rating: text(item, &["rating"]),
                    reviews: text(item, &["ratingCount", "reviews"]),
                },
                Category::Scholarly => ResultDetails::Scholarly {
                    snippet: text(item, &["snippet", "description"]),
                    authors: authors(item),
                    year: text(item, &["year"]),
                    publisher: text(item, &["publication", "publisher", "publicationInfo"]),
                },
            };

            let title = match text(item, &["title", "source"]) {
                t if t.is_empty() => "Untitled".to_string(),
                t => t,
            };

            Some(SearchResult {
                title,
                link,
                details,
            })
        })
        .collect()
}

fn items<'a>(json: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| json.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// First non-empty field among `keys`, stringifying numbers
fn text(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match item.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn authors(item: &Value) -> Vec<String> {
    match item.get("authors") {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(|a| match a {
                Value::String(s) => Some(s.clone()),
                Value::Object(_) => a.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
