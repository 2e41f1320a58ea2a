//! Topic scoring heuristics.
//!
//! Four independent scores composed from cluster membership and metadata:
//! relevance, trending, complexity, and evidence quality. Missing signals
//! (e.g. no controversy measure) substitute a neutral 0 instead of failing.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{ContentItem, GeographicScope};

/// Decay constant shared by the relevance and trending scores: a 48-hour
/// exponential decay, `exp(-age_hours / 48)`.
const DECAY_HOURS: f64 = 48.0;

/// Viewer geography used for the relevance geographic bonus.
#[derive(Debug, Clone, Default)]
pub struct ViewerLocation {
    pub state: Option<String>,
    pub city: Option<String>,
}

fn age_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - created_at).num_seconds().max(0) as f64;
    seconds / 3600.0
}

/// Relevance: per-member recency decay and engagement, plus a velocity bonus
/// for members under six hours old and a geographic bonus for members near
/// the viewer.
#[must_use]
pub fn relevance_score(
    members: &[ContentItem],
    scope: GeographicScope,
    viewer: &ViewerLocation,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = 0.0;
    for member in members {
        let age = age_hours(member.created_at, now);
        let recency_factor = (-age / DECAY_HOURS).exp();
        let engagement_factor =
            f64::from(member.like_count) * 2.0 + f64::from(member.comment_count) * 3.0;
        score += recency_factor * 10.0 + engagement_factor;

        if age < 6.0 {
            score += 5.0;
        }

        score += match scope {
            GeographicScope::Local => {
                let city_match = viewer.city.is_some() && member.city == viewer.city;
                let state_match = viewer.state.is_some() && member.state == viewer.state;
                if city_match && state_match { 10.0 } else { 0.0 }
            }
            GeographicScope::State => {
                if viewer.state.is_some() && member.state == viewer.state {
                    7.0
                } else {
                    0.0
                }
            }
            GeographicScope::National => 0.0,
        };
    }
    score
}

/// Inputs to the trending score that come from cluster metadata rather than
/// raw membership.
#[derive(Debug, Clone, Copy)]
pub struct TrendingInputs {
    pub post_count: usize,
    pub unique_participants: usize,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Engagement-disagreement signal in [0, 1]; 0 when unavailable.
    pub controversy: f64,
}

/// Trending: base volume/participation term, multiplied by a recent-activity
/// factor, decayed by topic age, and boosted by controversy. Holding the
/// other inputs fixed this is strictly decreasing in topic age.
#[must_use]
pub fn trending_score(inputs: &TrendingInputs, now: DateTime<Utc>) -> f64 {
    let base =
        inputs.post_count as f64 * 0.1 + inputs.unique_participants as f64 * 0.2;

    let hours_since_activity = age_hours(inputs.last_activity, now);
    let activity_multiplier = if hours_since_activity < 1.0 {
        2.0
    } else if hours_since_activity < 6.0 {
        1.5
    } else if hours_since_activity < 24.0 {
        1.2
    } else {
        1.0
    };

    let decay = (-age_hours(inputs.created_at, now) / DECAY_HOURS).exp();
    let controversy_boost = 1.0 + inputs.controversy * 0.5;

    base * activity_multiplier * decay * controversy_boost
}

/// Keyword families marking distinct argument types. Matching is
/// case-insensitive; each family counts at most once per cluster.
const ARGUMENT_FAMILIES: [(&str, &[&str]); 4] = [
    (
        "counterargument",
        &[
            "however",
            "on the other hand",
            "critics argue",
            "despite",
            "counterpoint",
            "that said",
        ],
    ),
    (
        "evidence-based",
        &[
            "study",
            "research",
            "according to",
            "data shows",
            "statistics",
            "survey",
        ],
    ),
    (
        "experiential",
        &[
            "in my experience",
            "personally",
            "i've seen",
            "as someone who",
            "firsthand",
        ],
    ),
    (
        "economic",
        &["cost", "budget", "tax", "economy", "jobs", "funding", "afford"],
    ),
];

static ARGUMENT_MATCHERS: Lazy<Vec<AhoCorasick>> = Lazy::new(|| {
    ARGUMENT_FAMILIES
        .iter()
        .map(|(_, patterns)| {
            AhoCorasickBuilder::new()
                .ascii_case_insensitive(true)
                .build(*patterns)
                .expect("argument family patterns are static")
        })
        .collect()
});

static EVIDENCE_KEYWORDS: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build([
            "study",
            "research",
            "data",
            "statistics",
            "report",
            "survey",
            "source",
            "evidence",
        ])
        .expect("evidence keywords are static")
});

static LINK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("link pattern is valid"));

static NUMERIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d+)?\s*%|[$€£]\s*\d+|\b\d+(?:,\d{3})+\b|\b\d+(?:\.\d+)?\b")
        .expect("numeric pattern is valid")
});

/// Complexity in [0, 1]: average length, question ratio, and distinct
/// argument-type families, each capped before summation so no single factor
/// dominates.
#[must_use]
pub fn complexity_score(members: &[ContentItem]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }

    let total_len: usize = members.iter().map(|member| member.content.len()).sum();
    let avg_len = total_len as f64 / members.len() as f64;
    let length_factor = (avg_len / 500.0).min(0.4);

    let questions = members
        .iter()
        .filter(|member| member.content.contains('?'))
        .count();
    let question_factor = (questions as f64 / members.len() as f64) * 0.3;

    let families = ARGUMENT_MATCHERS
        .iter()
        .filter(|matcher| {
            members
                .iter()
                .any(|member| matcher.is_match(&member.content))
        })
        .count();
    let argument_factor = (families as f64 * 0.1).min(0.3);

    (length_factor + question_factor + argument_factor).min(1.0)
}

/// Evidence quality in [0, 1]: per-member partial credit for evidence
/// keywords, embedded links, and numeric/percentage/currency patterns, each
/// member capped at 1.0 before averaging.
#[must_use]
pub fn evidence_quality_score(members: &[ContentItem]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }

    let total: f64 = members
        .iter()
        .map(|member| {
            let mut credit = 0.0_f64;
            if EVIDENCE_KEYWORDS.is_match(&member.content) {
                credit += 0.4;
            }
            if LINK_PATTERN.is_match(&member.content) {
                credit += 0.3;
            }
            if NUMERIC_PATTERN.is_match(&member.content) {
                credit += 0.3;
            }
            credit.min(1.0)
        })
        .sum();

    total / members.len() as f64
}

/// Locally derived controversy signal in [0, 1]: how balanced the two stance
/// sides are. 50/50 yields 1.0, a fully one-sided cluster yields 0.0.
#[must_use]
pub fn stance_balance_controversy(support_count: usize, oppose_count: usize) -> f64 {
    let total = support_count + oppose_count;
    if total == 0 {
        return 0.0;
    }
    let imbalance =
        (support_count as f64 - oppose_count as f64).abs() / total as f64;
    1.0 - imbalance
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;
    use uuid::Uuid;

    fn member_at(now: DateTime<Utc>, hours_old: i64, content: &str) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            content: content.to_string(),
            embedding: vec![1.0],
            author_id: Uuid::new_v4(),
            created_at: now - Duration::hours(hours_old),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            state: Some("CA".to_string()),
            city: Some("Oakland".to_string()),
        }
    }

    #[test]
    fn fresh_member_gets_velocity_bonus() {
        let now = Utc::now();
        let fresh = vec![member_at(now, 1, "post")];
        let stale = vec![member_at(now, 12, "post")];
        let viewer = ViewerLocation::default();
        let fresh_score = relevance_score(&fresh, GeographicScope::National, &viewer, now);
        let stale_score = relevance_score(&stale, GeographicScope::National, &viewer, now);
        assert!(fresh_score > stale_score + 4.0);
    }

    #[test]
    fn engagement_feeds_relevance() {
        let now = Utc::now();
        let mut liked = member_at(now, 1, "post");
        liked.like_count = 10;
        liked.comment_count = 4;
        let plain = member_at(now, 1, "post");
        let viewer = ViewerLocation::default();
        let with = relevance_score(&[liked], GeographicScope::National, &viewer, now);
        let without = relevance_score(&[plain], GeographicScope::National, &viewer, now);
        // likes*2 + comments*3 = 32
        assert!((with - without - 32.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(GeographicScope::Local, 10.0)]
    #[case(GeographicScope::State, 7.0)]
    #[case(GeographicScope::National, 0.0)]
    fn geographic_bonus_by_scope(#[case] scope: GeographicScope, #[case] bonus: f64) {
        let now = Utc::now();
        let matching = member_at(now, 1, "post");
        let viewer = ViewerLocation {
            state: Some("CA".to_string()),
            city: Some("Oakland".to_string()),
        };
        let stranger = ViewerLocation {
            state: Some("TX".to_string()),
            city: Some("Austin".to_string()),
        };
        let near = relevance_score(&[matching.clone()], scope, &viewer, now);
        let far = relevance_score(&[matching], scope, &stranger, now);
        assert!((near - far - bonus).abs() < 1e-9);
    }

    #[test]
    fn trending_strictly_decreases_with_age() {
        let now = Utc::now();
        let mut previous = f64::INFINITY;
        for hours in [1, 6, 24, 48, 96] {
            let inputs = TrendingInputs {
                post_count: 10,
                unique_participants: 6,
                last_activity: now - Duration::hours(30),
                created_at: now - Duration::hours(hours),
                controversy: 0.5,
            };
            let score = trending_score(&inputs, now);
            assert!(score < previous, "score did not decrease at {hours}h");
            previous = score;
        }
    }

    #[test]
    fn recent_activity_multiplies_trending() {
        let now = Utc::now();
        let base = TrendingInputs {
            post_count: 10,
            unique_participants: 5,
            last_activity: now - Duration::hours(30),
            created_at: now - Duration::hours(36),
            controversy: 0.0,
        };
        let hot = TrendingInputs {
            last_activity: now - Duration::minutes(30),
            ..base
        };
        let quiet = trending_score(&base, now);
        let active = trending_score(&hot, now);
        assert!((active / quiet - 2.0).abs() < 1e-9);
    }

    #[test]
    fn controversy_boosts_trending() {
        let now = Utc::now();
        let calm = TrendingInputs {
            post_count: 10,
            unique_participants: 5,
            last_activity: now,
            created_at: now,
            controversy: 0.0,
        };
        let contested = TrendingInputs {
            controversy: 1.0,
            ..calm
        };
        assert!((trending_score(&contested, now) / trending_score(&calm, now) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn complexity_is_bounded_and_sensitive_to_argument_markers() {
        let now = Utc::now();
        let plain = vec![member_at(now, 1, "short post")];
        let rich = vec![
            member_at(
                now,
                1,
                "According to a recent study, the budget impact is real. However, \
                 critics argue the data shows otherwise. In my experience the cost \
                 is worth it. What do others think?",
            ),
            member_at(now, 1, "Research and statistics back this up?"),
        ];
        let low = complexity_score(&plain);
        let high = complexity_score(&rich);
        assert!(high > low);
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
    }

    #[test]
    fn empty_membership_scores_zero() {
        assert_eq!(complexity_score(&[]), 0.0);
        assert_eq!(evidence_quality_score(&[]), 0.0);
    }

    #[test]
    fn evidence_quality_caps_per_member_credit() {
        let now = Utc::now();
        let loaded = vec![member_at(
            now,
            1,
            "A study with data: 45% of respondents, $3,000 cost, see https://example.org/report",
        )];
        let score = evidence_quality_score(&loaded);
        assert!(score <= 1.0);
        assert!(score >= 0.9);
    }

    #[rstest]
    #[case(3, 3, 1.0)]
    #[case(4, 0, 0.0)]
    #[case(3, 1, 0.5)]
    #[case(0, 0, 0.0)]
    fn stance_balance_controversy_cases(
        #[case] support: usize,
        #[case] oppose: usize,
        #[case] expected: f64,
    ) {
        assert!((stance_balance_controversy(support, oppose) - expected).abs() < 1e-9);
    }
}
