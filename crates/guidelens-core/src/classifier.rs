//! Keyword-based message tagging.
//!
//! Case-insensitive substring matching against fixed tables: universal
//! tags for every category, plus per-category extras layered on top.
//! Best-effort heuristic; unmatched text yields an empty set, which is a
//! valid non-error outcome.

use std::collections::BTreeSet;

use guidelens_schema::{ActivityCategory, MessageTag};

const UNIVERSAL: &[(MessageTag, &[&str])] = &[
    (
        MessageTag::HelpRequest,
        &["help", "stuck", "lost", "confused", "what do i do"],
    ),
    (
        MessageTag::CompletionSignal,
        &["done", "finished", "complete", "next step", "ready to move on"],
    ),
    (
        MessageTag::IssueReport,
        &["problem", "issue", "wrong", "broke", "not working", "mistake"],
    ),
    (
        MessageTag::TechniqueQuestion,
        &["how do i", "how to", "technique", "method", "best way"],
    ),
    (
        MessageTag::ExplanationRequest,
        &["why", "what does", "explain", "what is the point"],
    ),
];

const COOKING: &[(MessageTag, &[&str])] = &[
    (
        MessageTag::TemperatureQuery,
        &["temperature", "degrees", "preheat", "too hot", "too cold"],
    ),
    (
        MessageTag::TimingQuery,
        &["how long", "minutes", "timer", "overcook", "undercook"],
    ),
];

const CRAFTING: &[(MessageTag, &[&str])] = &[(
    MessageTag::MaterialQuestion,
    &["material", "fabric", "glue", "yarn", "substitute", "instead of"],
)];

const DIY: &[(MessageTag, &[&str])] = &[
    (
        MessageTag::SafetyConcern,
        &["safe", "safety", "danger", "hazard", "shock", "injure"],
    ),
    (
        MessageTag::MeasurementQuery,
        &["measure", "level", "inches", "centimeter", "fit"],
    ),
];

const TUTORIAL: &[(MessageTag, &[&str])] = &[(
    MessageTag::PrerequisiteQuestion,
    &["prerequisite", "before this", "need to know", "skip ahead"],
)];

fn category_table(category: ActivityCategory) -> &'static [(MessageTag, &'static [&'static str])] {
    match category {
        ActivityCategory::Cooking => COOKING,
        ActivityCategory::Crafting => CRAFTING,
        ActivityCategory::Diy => DIY,
        ActivityCategory::Tutorial => TUTORIAL,
    }
}

/// Tag free text. Multiple tags may apply; order is irrelevant.
pub fn classify(text: &str, category: ActivityCategory) -> BTreeSet<MessageTag> {
    let lower = text.to_lowercase();
    let mut tags = BTreeSet::new();

    for (tag, keywords) in UNIVERSAL.iter().chain(category_table(category)) {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            tags.insert(*tag);
        }
    }

    tags
}
