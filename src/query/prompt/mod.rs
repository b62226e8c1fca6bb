
use crate::index::SearchResult;
use crate::{Result, SopError};

/// Substitution slot for the retrieved procedure excerpts
pub const CONTEXT_SLOT: &str = "{context}";

/// Substitution slot for the user's question
pub const QUESTION_SLOT: &str = "{question}";

/// Canonical phrase the model is instructed to answer with when the
/// excerpts do not cover the question. The post-processing heuristic and
/// the tests key off this exact string.
pub const REFUSAL_PHRASE: &str =
    "No specific guidance on this topic was found in the available procedures.";

/// Default instruction template, filled with the retrieved context and the
/// question on every request.
pub const DEFAULT_TEMPLATE: &str = "\
You are a field operations assistant for standard operating procedure (SOP) manuals.
Your job is to guide technicians and line electricians using only the procedure
excerpts provided below.

Rules:
1. Base every statement on the provided excerpts.
2. If the excerpts do not clearly answer the question, reply exactly:
   \"No specific guidance on this topic was found in the available procedures.\"
3. Do not invent steps or supplement from outside knowledge.
4. Cite the procedure code (for example \"POP 4.2\") whenever it appears in an excerpt.
5. Prefer short numbered steps; always call out required PPE, specific tools, and
   safety risks.

Procedure excerpts:
{context}

Question:
{question}

Answer clearly and concisely:
";

/// Separator placed between chunk texts in the rendered context section
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// A prompt template with a context slot and a question slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    #[inline]
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Build a template, rejecting strings that lost either slot.
    #[inline]
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();

        for slot in [CONTEXT_SLOT, QUESTION_SLOT] {
            if !template.contains(slot) {
                return Err(SopError::Config(format!(
                    "prompt template is missing the {slot} slot"
                )));
            }
        }

        Ok(Self { template })
    }

    /// Render the template for one request. An empty context renders the
    /// full instruction text with an empty excerpts section.
    #[inline]
    pub fn render(&self, context: &str, question: &str) -> String {
        self.template
            .replace(CONTEXT_SLOT, context)
            .replace(QUESTION_SLOT, question)
    }
}

/// Concatenate retrieved chunk texts into the context section.
#[inline]
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.metadata.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
