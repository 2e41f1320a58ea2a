//! Topic summary generation via an external text-completion service.
//!
//! Thin adapter: sample a few members per side to bound prompt size, ask for
//! a structured title/summary payload, parse defensively, and substitute
//! deterministic fallback strings on any failure. Topic assembly must never
//! block on the summarizer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::util::json::{extract_json_object, non_empty_str};

use super::types::ContentItem;

/// External text-completion interface. Expected to sometimes return
/// non-conforming output; callers parse defensively.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String>;
}

/// Structured summary payload for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub title: String,
    pub summary: String,
    pub support_summary: Option<String>,
    pub oppose_summary: Option<String>,
}

impl TopicSummary {
    /// Deterministic fallback used whenever the completion service fails or
    /// returns an unusable payload.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            title: "Trending Discussion".to_string(),
            summary: "Multiple posts are discussing this topic.".to_string(),
            support_summary: Some("Posts in favor of this position.".to_string()),
            oppose_summary: Some("Posts against this position.".to_string()),
        }
    }
}

/// Tagged result of one summary attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Parsed(TopicSummary),
    Fallback { reason: String },
}

impl SummaryOutcome {
    /// The usable summary either way.
    #[must_use]
    pub fn into_summary(self) -> TopicSummary {
        match self {
            Self::Parsed(summary) => summary,
            Self::Fallback { .. } => TopicSummary::fallback(),
        }
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

pub struct SummaryGenerator {
    completion: Arc<dyn Completion>,
    max_tokens: u32,
    sample_per_side: usize,
}

impl SummaryGenerator {
    #[must_use]
    pub fn new(completion: Arc<dyn Completion>, max_tokens: u32, sample_per_side: usize) -> Self {
        Self {
            completion,
            max_tokens,
            sample_per_side: sample_per_side.max(1),
        }
    }

    /// Generate a title/summary/per-side payload for one cluster.
    ///
    /// Samples the first `sample_per_side` members of each side. Any
    /// transport error or unparsable payload yields
    /// [`SummaryOutcome::Fallback`], never an error.
    pub async fn generate(
        &self,
        support: &[ContentItem],
        oppose: &[ContentItem],
    ) -> SummaryOutcome {
        let prompt = self.build_prompt(support, oppose);

        let raw = match self.completion.complete(&prompt, self.max_tokens).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "completion request failed, using fallback summary");
                return SummaryOutcome::Fallback {
                    reason: format!("completion request failed: {error:#}"),
                };
            }
        };

        match Self::parse_payload(&raw) {
            Some(summary) => SummaryOutcome::Parsed(summary),
            None => {
                warn!(
                    payload_len = raw.len(),
                    "completion payload unparsable, using fallback summary"
                );
                SummaryOutcome::Fallback {
                    reason: "unparsable completion payload".to_string(),
                }
            }
        }
    }

    fn build_prompt(&self, support: &[ContentItem], oppose: &[ContentItem]) -> String {
        let mut prompt = String::from(
            "You are summarizing a public discussion. Given posts for and against \
             a position, respond with a JSON object containing exactly these keys: \
             \"title\" (under 10 words), \"summary\" (1-2 neutral sentences), \
             \"support_summary\" and \"oppose_summary\" (one sentence each).\n",
        );

        prompt.push_str("\nSupporting posts:\n");
        for member in support.iter().take(self.sample_per_side) {
            prompt.push_str("- ");
            prompt.push_str(member.content.trim());
            prompt.push('\n');
        }
        prompt.push_str("\nOpposing posts:\n");
        for member in oppose.iter().take(self.sample_per_side) {
            prompt.push_str("- ");
            prompt.push_str(member.content.trim());
            prompt.push('\n');
        }
        prompt.push_str("\nJSON:");
        prompt
    }

    /// Defensive parse: bracket extraction over the raw payload, requiring at
    /// least a non-empty title and summary.
    fn parse_payload(raw: &str) -> Option<TopicSummary> {
        let value = extract_json_object(raw)?;
        let title = non_empty_str(&value, "title")?.to_string();
        let summary = non_empty_str(&value, "summary")?.to_string();
        Some(TopicSummary {
            title,
            summary,
            support_summary: non_empty_str(&value, "support_summary").map(ToString::to_string),
            oppose_summary: non_empty_str(&value, "oppose_summary").map(ToString::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::Utc;
    use uuid::Uuid;

    struct StaticCompletion {
        response: Result<String, String>,
    }

    #[async_trait]
    impl Completion for StaticCompletion {
        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> anyhow::Result<String> {
            match &self.response {
                Ok(raw) => Ok(raw.clone()),
                Err(message) => Err(anyhow!(message.clone())),
            }
        }
    }

    fn member(content: &str) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            content: content.to_string(),
            embedding: vec![1.0],
            author_id: Uuid::new_v4(),
            created_at: Utc::now(),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            state: None,
            city: None,
        }
    }

    fn generator(response: Result<String, String>) -> SummaryGenerator {
        SummaryGenerator::new(Arc::new(StaticCompletion { response }), 512, 3)
    }

    #[tokio::test]
    async fn parses_well_formed_payload() {
        let raw = r#"{"title": "Transit Funding", "summary": "Debate over the new levy.",
                      "support_summary": "Backers cite congestion.",
                      "oppose_summary": "Opponents cite cost."}"#;
        let outcome = generator(Ok(raw.to_string()))
            .generate(&[member("pro")], &[member("anti")])
            .await;
        let summary = outcome.into_summary();
        assert_eq!(summary.title, "Transit Funding");
        assert_eq!(summary.oppose_summary.as_deref(), Some("Opponents cite cost."));
    }

    #[tokio::test]
    async fn parses_payload_wrapped_in_prose() {
        let raw = "Here you go:\n```json\n{\"title\": \"Parks\", \"summary\": \"Park budget debate.\"}\n```";
        let outcome = generator(Ok(raw.to_string()))
            .generate(&[member("pro")], &[member("anti")])
            .await;
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.into_summary().title, "Parks");
    }

    #[tokio::test]
    async fn service_error_yields_deterministic_fallback() {
        let outcome = generator(Err("connection refused".to_string()))
            .generate(&[member("pro")], &[member("anti")])
            .await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.into_summary(), TopicSummary::fallback());
    }

    #[tokio::test]
    async fn unparsable_payload_yields_fallback() {
        let outcome = generator(Ok("I cannot answer that.".to_string()))
            .generate(&[member("pro")], &[member("anti")])
            .await;
        assert!(outcome.is_fallback());
        assert_eq!(outcome.into_summary().title, "Trending Discussion");
    }

    #[tokio::test]
    async fn missing_title_is_treated_as_unparsable() {
        let outcome = generator(Ok(r#"{"summary": "no title here"}"#.to_string()))
            .generate(&[member("pro")], &[member("anti")])
            .await;
        assert!(outcome.is_fallback());
    }

    #[test]
    fn prompt_samples_bounded_members_per_side() {
        let generator = generator(Ok(String::new()));
        let support: Vec<_> = (0..10).map(|i| member(&format!("pro {i}"))).collect();
        let oppose: Vec<_> = (0..10).map(|i| member(&format!("anti {i}"))).collect();
        let prompt = generator.build_prompt(&support, &oppose);
        assert!(prompt.contains("pro 2"));
        assert!(!prompt.contains("pro 3"));
        assert!(!prompt.contains("anti 5"));
    }
}
