pub mod prompt;


use tracing::debug;

use crate::config::{AnswerConfig, Config, PolicyKind, RetrievalConfig};
use crate::index::{SearchResult, VectorStore};
use crate::openai::OpenAiClient;
use crate::query::prompt::{PromptTemplate, REFUSAL_PHRASE, build_context};
use crate::{Result, SopError};

/// Advisory appended to suspiciously short answers. A heuristic guard
/// against truncated or low-confidence generations, not a correctness
/// guarantee.
pub const ADVISORY_NOTE: &str = "Note: this answer may be incomplete. \
Confirm against the full procedure document before acting on it.";

/// A generated answer plus the documents that informed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    /// Deduplicated source file names, in retrieval order
    pub sources: Vec<String>,
    /// Whether the short-answer advisory was appended
    pub advisory_added: bool,
}

/// Per-request question answering over an opened index.
///
/// Owns the opened vector store and the API client; created once at
/// startup and passed by reference to whatever surface serves requests.
/// Requests run start-to-finish: validate, embed the question, retrieve,
/// render the prompt, generate, post-process.
pub struct QueryEngine {
    store: VectorStore,
    client: OpenAiClient,
    template: PromptTemplate,
    retrieval: RetrievalConfig,
    answer_config: AnswerConfig,
}

impl QueryEngine {
    /// Open the persisted index and set up the engine. A missing index is
    /// fatal here, before any question is accepted.
    #[inline]
    pub async fn open(config: &Config, api_key: String) -> Result<Self> {
        let client = OpenAiClient::new(&config.api, api_key)
            .map_err(|e| SopError::Config(format!("{e:#}")))?;

        let store = VectorStore::open(
            &config.storage.index_dir,
            config.api.embedding_dimension as usize,
        )
        .await?;

        let template = match &config.answer.prompt_template {
            Some(template) => PromptTemplate::new(template.clone())?,
            None => PromptTemplate::default(),
        };

        Ok(Self {
            store,
            client,
            template,
            retrieval: config.retrieval.clone(),
            answer_config: config.answer.clone(),
        })
    }

    /// Answer one question. Validation failures and service failures are
    /// reported per request; the engine stays usable afterwards.
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let question = validate_question(question)?;

        let query_vector = self
            .client
            .embed(question)
            .map_err(|e| SopError::Embedding(format!("{e:#}")))?;

        let candidates = self
            .store
            .search(&query_vector, fetch_limit(&self.retrieval))
            .await?;
        let retrieved = apply_policy(candidates, &self.retrieval);

        debug!(
            "Retrieved {} chunks for question ({} chars)",
            retrieved.len(),
            question.len()
        );

        let context = build_context(&retrieved);
        let rendered = self.template.render(&context, question);

        let generated = self
            .client
            .complete(&rendered)
            .map_err(|e| SopError::Generation(format!("{e:#}")))?;

        let (text, advisory_added) = apply_length_advisory(generated, &self.answer_config);

        Ok(Answer {
            text,
            sources: source_files(&retrieved),
            advisory_added,
        })
    }
}

/// Reject empty or whitespace-only questions before any external call.
fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(SopError::Validation(
            "question is empty; type something to search the procedures".to_string(),
        ));
    }
    Ok(trimmed)
}

/// How many neighbors to fetch from the index before policy filtering.
fn fetch_limit(retrieval: &RetrievalConfig) -> usize {
    match retrieval.policy {
        PolicyKind::TopK => retrieval.top_k,
        PolicyKind::Threshold => retrieval.cap,
    }
}

/// Apply the configured retrieval policy to the ranked candidates. An
/// empty outcome is valid and distinct from an error.
fn apply_policy(candidates: Vec<SearchResult>, retrieval: &RetrievalConfig) -> Vec<SearchResult> {
    match retrieval.policy {
        PolicyKind::TopK => candidates.into_iter().take(retrieval.top_k).collect(),
        PolicyKind::Threshold => candidates
            .into_iter()
            .filter(|r| r.similarity >= retrieval.threshold)
            .take(retrieval.cap)
            .collect(),
    }
}

/// Deduplicated source file names in retrieval order.
fn source_files(results: &[SearchResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        if !sources.contains(&result.metadata.source_file) {
            sources.push(result.metadata.source_file.clone());
        }
    }
    sources
}

/// Append the advisory when a non-refusal answer comes back shorter than
/// the configured word count.
fn apply_length_advisory(text: String, config: &AnswerConfig) -> (String, bool) {
    if !config.length_advisory
        || text.contains(REFUSAL_PHRASE)
        || text.split_whitespace().count() >= config.min_answer_words
    {
        return (text, false);
    }

    (format!("{text}\n\n{ADVISORY_NOTE}"), true)
}
