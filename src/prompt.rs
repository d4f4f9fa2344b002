//! Prompt construction for result summaries.
//!
//! Pure functions: the same query, results and category always produce the
//! same prompt.

use crate::search::{Category, SearchResult};

/// Outbound prompt, split the way chat backends expect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_instruction: String,
    pub user_content: String,
}

impl Prompt {
    /// Single-string form for generate-style backends
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system_instruction, self.user_content)
    }
}

const STYLE_RULES: &str = "You are a research assistant that writes clear, well-structured \
summaries of search results in Markdown.

Formatting rules:
- Use **bold** for emphasis on key terms and conclusions.
- Use > blockquotes for notable excerpts taken from the results.
- Use `inline code` for technical terms, identifiers and commands.
- Use numbered lists for ordered steps or rankings and bulleted lists otherwise.
- Cite every source you reference as a Markdown link: [text](url).
- Only state facts supported by the provided results.";

/// Section headings the summary must contain, per category
pub fn section_headings(category: Category) -> &'static [&'static str] {
    match category {
        Category::Web => &["Summary", "Key Findings", "Sources", "Conclusion"],
        Category::Image => &["Visual Overview", "Notable Images", "Sources", "Conclusion"],
        Category::Video => &["Overview", "Featured Videos", "Key Themes", "Sources"],
        Category::Place => &["Overview", "Top Places", "Practical Details", "Sources"],
        Category::News => &[
            "Headline Summary",
            "Key Developments",
            "Timeline",
            "Sources",
            "Outlook",
        ],
        Category::Shopping => &[
            "Overview",
            "Top Products",
            "Price Comparison",
            "Recommendations",
            "Sources",
        ],
        Category::Scholarly => &[
            "Research Overview",
            "Key Findings",
            "Methodology Patterns",
            "Research Impact",
            "Future Directions",
        ],
        Category::Patent => &["Overview", "Key Patents", "Technical Themes", "Sources"],
    }
}

/// Build the summary prompt for a query and its results.
pub fn build_prompt(query: &str, results: &[SearchResult], category: Category) -> Prompt {
    let mut system_instruction = String::from(STYLE_RULES);
    system_instruction.push_str("\n\nStructure the answer with these sections, in order, each as a `##` heading:\n");
    for (idx, heading) in section_headings(category).iter().enumerate() {
        system_instruction.push_str(&format!("{}. {}\n", idx + 1, heading));
    }

    // Serializing plain strings and vectors cannot fail.
    let serialized = serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string());

    let user_content = format!(
        "Query: \"{query}\" ({category})\n\n\
         Search results ({count}):\n{serialized}\n\n\
         Summarize these results for the query above.",
        count = results.len(),
    );

    Prompt {
        system_instruction,
        user_content,
    }
}
