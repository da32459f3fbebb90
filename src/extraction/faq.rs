//! `faq` strategy: question/answer pairs.

use super::text::pick_text;
use super::{ExtractedUnit, ExtractionError, ExtractionStrategy};
use crate::request::RequestContext;
use async_trait::async_trait;
use serde_json::Value;

const QUESTION_KEYS: [&str; 3] = ["question", "q", "title"];
const ANSWER_KEYS: [&str; 3] = ["answer", "a", "text"];
const ALTERNATES_KEYS: [&str; 2] = ["alternateQuestions", "alt_questions"];

/// One unit per FAQ pair, text `"question\n\nanswer"`, numbered by position.
#[derive(Default)]
pub struct FaqStrategy;

impl FaqStrategy {
    /// Stateless strategy.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExtractionStrategy for FaqStrategy {
    fn name(&self) -> &str {
        "faq"
    }

    async fn execute(
        &self,
        context: &RequestContext,
    ) -> Result<Vec<ExtractedUnit>, ExtractionError> {
        let mut units = Vec::new();
        for (item, ordinal) in context.values("faqs").iter().zip(1u32..) {
            let Value::Object(fields) = item else {
                tracing::warn!(position = ordinal, "Skipping FAQ entry that is not an object");
                continue;
            };
            let question = pick_text(fields, &QUESTION_KEYS).unwrap_or_default();
            let answer = pick_text(fields, &ANSWER_KEYS).unwrap_or_default();
            if question.trim().is_empty() && answer.trim().is_empty() {
                tracing::warn!(position = ordinal, "Skipping empty FAQ entry");
                continue;
            }

            let text = format!("{}\n\n{}", question.trim(), answer.trim())
                .trim()
                .to_string();
            let mut unit = ExtractedUnit::new(text)
                .with_ordinal(ordinal)
                .with_meta("question", question)
                .with_meta("answer", answer);
            if let Some(alternates) = ALTERNATES_KEYS
                .iter()
                .find_map(|key| fields.get(*key).filter(|value| value.is_array()))
            {
                unit = unit.with_meta("alternateQuestions", alternates.clone());
            }
            units.push(unit);
        }
        Ok(units)
    }
}
