use crate::config::Config;
use crate::llm::{
    AiResponse, Orchestrator, ProviderRegistry, ReqwestTransport, RetryPolicy, SummarizeError,
};
use crate::prompt::build_prompt;
use crate::search::providers::SerperSearchProvider;
use crate::search::{Query, SearchProvider, SearchResult};
use crate::search_log::SearchLog;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider name recorded when no provider produced a summary
const NO_PROVIDER: &str = "unavailable";

/// Search results together with their summary
#[derive(Debug, Clone)]
pub struct Summary {
    pub query: Query,
    pub results: Vec<SearchResult>,
    pub response: AiResponse,
}

impl Summary {
    /// Standalone Markdown document: heading, metadata, summary, then sources.
    pub fn to_markdown(&self, saved_at: DateTime<Utc>) -> String {
        let mut doc = format!(
            "# {}\n\n- Category: {}\n- Summarized by: {}\n- Saved: {}\n\n{}\n",
            self.query.text,
            self.query.category,
            self.response.provider,
            saved_at.to_rfc3339(),
            self.response.text.trim_end(),
        );

        if !self.results.is_empty() {
            doc.push_str("\n## Search Results\n\n");
            for result in &self.results {
                doc.push_str(&format!("- [{}]({})\n", result.title, result.link));
            }
        }
        doc
    }

    /// Write the summary into `dir` as `<date>_<query>.md`; never overwrites.
    pub fn save_markdown(&self, dir: &Path) -> Result<PathBuf> {
        let now = Utc::now();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let stem = format!("{}_{}", now.format("%Y-%m-%d"), file_stem(&self.query.text));
        let mut path = dir.join(format!("{stem}.md"));
        let mut n = 1u32;
        while path.exists() {
            path = dir.join(format!("{stem}-{n}.md"));
            n += 1;
        }

        std::fs::write(&path, self.to_markdown(now))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved summary");
        Ok(path)
    }
}

/// Query text reduced to a safe file name fragment
fn file_stem(query: &str) -> String {
    let stem: String = query
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(60)
        .collect();
    if stem.is_empty() {
        "summary".to_string()
    } else {
        stem
    }
}

/// Search, then summarize the results with the first provider that answers.
pub struct Summarizer {
    search: Arc<dyn SearchProvider>,
    orchestrator: Orchestrator,
    search_log: Option<SearchLog>,
}

impl Summarizer {
    pub fn new(search: Arc<dyn SearchProvider>, orchestrator: Orchestrator) -> Self {
        Self {
            search,
            orchestrator,
            search_log: None,
        }
    }

    pub fn with_search_log(mut self, search_log: SearchLog) -> Self {
        self.search_log = Some(search_log);
        self
    }

    /// Wire up the production collaborators from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = ProviderRegistry::from_settings(&config.providers)
            .context("Invalid provider configuration")?;
        let orchestrator = Orchestrator::new(Arc::new(registry), Arc::new(ReqwestTransport::new()))
            .with_retry(RetryPolicy::from(&config.retry))
            .with_probe_first(config.probe_before_attempt);

        let search = SerperSearchProvider::from_settings(&config.search)
            .context("Failed to create search client")?;

        let mut summarizer = Self::new(Arc::new(search), orchestrator);
        if config.search_log.enabled {
            summarizer = summarizer.with_search_log(SearchLog::from_config(config)?);
        }
        Ok(summarizer)
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub async fn summarize(
        &self,
        query: &Query,
        preferred_provider: &str,
        cancel: &CancellationToken,
    ) -> Result<Summary, SummarizeError> {
        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SummarizeError::Cancelled),
            results = self.search.search(query) => results?,
        };

        if results.is_empty() {
            tracing::info!(query = %query.text, category = %query.category, "no search results, skipping summary");
            return Err(SummarizeError::NoResults);
        }

        let prompt = build_prompt(&query.text, &results, query.category);
        let outcome = self
            .orchestrator
            .run(&prompt, preferred_provider, cancel)
            .await;

        let served_by = match &outcome {
            Ok(response) => Some(response.provider.as_str()),
            Err(SummarizeError::Cancelled) => None,
            Err(_) => Some(NO_PROVIDER),
        };
        if let (Some(log), Some(provider)) = (&self.search_log, served_by) {
            // Detached write; never awaited here.
            let _ = log.record_query(&query.text, query.category.as_str(), provider);
        }

        Ok(Summary {
            query: query.clone(),
            results,
            response: outcome?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Category, ResultDetails};
    use tempfile::TempDir;

    fn summary(query: &str) -> Summary {
        Summary {
            query: Query::new(query, Category::News),
            results: vec![SearchResult {
                title: "Launch".to_string(),
                link: "https://example.com/launch".to_string(),
                details: ResultDetails::News {
                    snippet: "It flew".to_string(),
                    image_url: String::new(),
                },
            }],
            response: AiResponse {
                text: "## Headline Summary\nIt flew.\n".to_string(),
                provider: "groq".to_string(),
            },
        }
    }

    #[test]
    fn markdown_carries_metadata_summary_and_sources() {
        let saved_at = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let doc = summary("rocket launch").to_markdown(saved_at);

        assert!(doc.starts_with("# rocket launch\n"));
        assert!(doc.contains("- Category: news"));
        assert!(doc.contains("- Summarized by: groq"));
        assert!(doc.contains("- Saved: 2026-03-01T12:00:00+00:00"));
        assert!(doc.contains("## Headline Summary\nIt flew.\n"));
        assert!(doc.ends_with("- [Launch](https://example.com/launch)\n"));
    }

    #[test]
    fn save_uses_dated_sanitized_name_without_overwriting() {
        let dir = TempDir::new().unwrap();
        let s = summary("rust / async?");

        let first = s.save_markdown(dir.path()).unwrap();
        let second = s.save_markdown(dir.path()).unwrap();

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let name = first.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with(&date));
        assert!(name.ends_with("_rust___async_.md"), "{name}");
        assert_ne!(first, second);
        assert!(std::fs::read_to_string(&second).unwrap().contains("It flew."));
    }

    #[test]
    fn blank_query_gets_fallback_stem() {
        assert_eq!(file_stem("   "), "summary");
        assert_eq!(file_stem("مرحبا بك"), "مرحبا_بك");
    }
}
