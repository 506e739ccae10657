use crate::generator::GenerationRequest;
use lawguide_common::{Passage, NOT_FOUND_SENTINEL};

/// Instruction block sent as the system turn of every grounded question.
pub fn system_prompt() -> String {
    format!(
        "You are a highly accurate legal assistant specialized in Indian constitutional law.\n\
         \n\
         Use only the information provided in the <context> block to answer the user's legal question.\n\
         \n\
         If a specific Article, Clause, Section, Entry, or Schedule is mentioned in the context, quote it \
         accurately first, then explain it in clear and simple terms.\n\
         \n\
         If Article numbers are only indirectly referenced, infer the most likely related Article based \
         solely on the legal phrasing in the context.\n\
         \n\
         If the question is partially answered in the context, clearly state what is explicitly present \
         and what is missing or not found.\n\
         \n\
         Do not guess or fabricate legal content.\n\
         Do not mislabel Article numbers.\n\
         If the answer is not found in the context, respond exactly with:\n\
         {}\n\
         \n\
         Otherwise provide a detailed, clear and well-structured answer in complete sentences, \
         explaining legal terms simply.",
        NOT_FOUND_SENTINEL
    )
}

/// Numbered passages with their source labels, best first.
pub fn format_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| format!("[Source {}] {}\n{}", i + 1, passage.source, passage.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_request(question: &str, passages: &[Passage]) -> GenerationRequest {
    GenerationRequest {
        system: system_prompt(),
        user: format!(
            "<context>\n{}\n</context>\n\nQuestion: {}\n\nAnswer:",
            format_context(passages),
            question.trim()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawguide_common::SourceRef;

    #[test]
    fn test_system_prompt_contains_sentinel() {
        let prompt = system_prompt();
        assert!(prompt.contains(NOT_FOUND_SENTINEL));
        assert!(prompt.contains("Schedule"));
    }

    #[test]
    fn test_context_is_numbered_with_sources() {
        let passages = vec![
            Passage::new("Article 21. Protection of life.", SourceRef::new("constitution.pdf", 9), 0),
            Passage::new("Article 22. Protection against arrest.", SourceRef::new("constitution.pdf", 10), 1),
        ];
        let context = format_context(&passages);
        assert!(context.starts_with("[Source 1] constitution.pdf, page 9\nArticle 21."));
        assert!(context.contains("\n\n[Source 2] constitution.pdf, page 10\n"));
    }

    #[test]
    fn test_build_request_places_question_after_context() {
        let passages = vec![Passage::new("Article 14.", SourceRef::new("a.pdf", 1), 0)];
        let request = build_request("  What is Article 14?  ", &passages);
        let context_at = request.user.find("Article 14.").unwrap();
        let question_at = request.user.find("Question: What is Article 14?").unwrap();
        assert!(context_at < question_at);
        assert!(request.user.ends_with("Answer:"));
    }
}
