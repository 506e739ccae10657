use crate::generator::AnswerGenerator;
use crate::prompt;
use lawguide_common::{Answer, LawGuideError, Passage, Result, ScoredPassage, NOT_FOUND_SENTINEL};
use lawguide_knowledge::PassageRetriever;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Retrieve, prompt, generate. Holds no per-question state, so one instance
/// serves concurrent callers.
#[derive(Clone)]
pub struct GroundingPipeline {
    retriever: Arc<dyn PassageRetriever>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
}

impl GroundingPipeline {
    pub fn new(retriever: Arc<dyn PassageRetriever>, generator: Arc<dyn AnswerGenerator>, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = validate_question(question)?;

        let context = self.retriever.retrieve(question, self.top_k).await?;
        if context.is_empty() {
            warn!("No passages retrieved; answering with the not-found response");
            return Ok(Answer::new(question, NOT_FOUND_SENTINEL, context));
        }
        debug!("Grounding answer on {} passages", context.len());

        let request = prompt::build_request(question, &context);
        let generated = self.generator.generate(&request).await?;

        let answer = Answer::new(question, generated, context);
        info!(
            "Answered question ({} chars) with outcome {:?}",
            question.chars().count(),
            answer.outcome
        );
        Ok(answer)
    }

    /// Context passages for `question` without generation.
    pub async fn retrieve(&self, question: &str, k: Option<usize>) -> Result<Vec<Passage>> {
        let question = validate_question(question)?;
        self.retriever.retrieve(question, k.unwrap_or(self.top_k)).await
    }

    pub async fn retrieve_scored(&self, question: &str, k: Option<usize>) -> Result<Vec<ScoredPassage>> {
        let question = validate_question(question)?;
        self.retriever.retrieve_scored(question, k.unwrap_or(self.top_k)).await
    }
}

fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(LawGuideError::InvalidInput("question must not be empty".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockAnswerGenerator;
    use async_trait::async_trait;
    use lawguide_common::{AnswerOutcome, SourceRef};

    struct FixedRetriever(Vec<Passage>);

    #[async_trait]
    impl PassageRetriever for FixedRetriever {
        async fn retrieve_scored(&self, _query: &str, k: usize) -> Result<Vec<ScoredPassage>> {
            Ok(self
                .0
                .iter()
                .take(k)
                .map(|p| ScoredPassage {
                    passage: p.clone(),
                    score: 1.0,
                })
                .collect())
        }
    }

    fn passages() -> Vec<Passage> {
        vec![
            Passage::new("Article 25. Freedom of conscience and religion.", SourceRef::new("c.pdf", 12), 0),
            Passage::new("Article 26. Freedom to manage religious affairs.", SourceRef::new("c.pdf", 12), 1),
        ]
    }

    #[tokio::test]
    async fn test_answer_passes_context_to_generator() {
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .withf(|req| req.user.contains("Article 25.") && req.user.contains("Question: What is Article 25?"))
            .times(1)
            .returning(|_| Ok("Article 25 guarantees freedom of religion.".to_string()));

        let pipeline = GroundingPipeline::new(Arc::new(FixedRetriever(passages())), Arc::new(generator), 4);
        let answer = pipeline.answer("What is Article 25?").await.unwrap();

        assert_eq!(answer.outcome, AnswerOutcome::Grounded);
        assert_eq!(answer.context, passages());
        assert_eq!(answer.answer, "Article 25 guarantees freedom of religion.");
    }

    #[tokio::test]
    async fn test_blank_question_skips_generation() {
        let mut generator = MockAnswerGenerator::new();
        generator.expect_generate().times(0);

        let pipeline = GroundingPipeline::new(Arc::new(FixedRetriever(passages())), Arc::new(generator), 4);
        assert!(matches!(pipeline.answer(" \t ").await, Err(LawGuideError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_empty_context_short_circuits() {
        let mut generator = MockAnswerGenerator::new();
        generator.expect_generate().times(0);

        let pipeline = GroundingPipeline::new(Arc::new(FixedRetriever(vec![])), Arc::new(generator), 4);
        let answer = pipeline.answer("What is Article 370?").await.unwrap();
        assert!(answer.is_not_found());
        assert_eq!(answer.answer, NOT_FOUND_SENTINEL);
        assert!(answer.context.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(LawGuideError::GenerationUnavailable("timeout".to_string())));

        let pipeline = GroundingPipeline::new(Arc::new(FixedRetriever(passages())), Arc::new(generator), 4);
        assert!(matches!(
            pipeline.answer("What is Article 25?").await,
            Err(LawGuideError::GenerationUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_uses_explicit_k() {
        let generator = MockAnswerGenerator::new();
        let pipeline = GroundingPipeline::new(Arc::new(FixedRetriever(passages())), Arc::new(generator), 4);
        assert_eq!(pipeline.retrieve("religion", Some(1)).await.unwrap().len(), 1);
        assert_eq!(pipeline.retrieve_scored("religion", None).await.unwrap().len(), 2);
    }
}
