//! Markdown rendering of answers and retrieved context for display.

use lawguide_common::{Answer, AnswerOutcome, Passage};
use serde::Serialize;

/// Characters of each passage shown when displaying retrieved context.
pub const CONTEXT_PREVIEW_CHARS: usize = 800;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedAnswer {
    pub formatted_answer: String,
    pub raw_answer: String,
}

pub fn format_answer(answer: &Answer) -> FormattedAnswer {
    let raw_answer = answer.answer.trim().to_string();
    let header = format!("### Question Asked\n**{}**\n\n---\n\n", answer.question.trim());

    let body = match answer.outcome {
        AnswerOutcome::Grounded => format!("### Legal Assistant's Response\n{}", raw_answer),
        AnswerOutcome::NotFound => "### Based on the documents reviewed\n\n\
             - The retrieved documents relate to other provisions.\n\
             - However, **they do not contain specific information about your query**.\n\
             - No matching Article, Clause, or related law was identified in this context.\n\n\
             ---\n\n\
             *Tip: Try rephrasing your query or narrowing it down to a specific Article or keyword.*"
            .to_string(),
    };

    FormattedAnswer {
        formatted_answer: format!("{}{}", header, body),
        raw_answer,
    }
}

/// Numbered passages with sources, each cut to `max_chars` characters.
pub fn format_context(passages: &[Passage], max_chars: usize) -> String {
    if passages.is_empty() {
        return "No specific context found.".to_string();
    }

    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            format!(
                "#### Chunk {} ({})\n{}",
                i + 1,
                passage.source,
                truncate_chars(passage.text.trim(), max_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
