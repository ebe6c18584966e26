
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::generation::{ChatMessage, Generator};
use crate::retrieval::{RetrievedContext, Retriever};
use crate::vector_store::{FlatIndex, MetadataRecord};
use crate::{RagError, Result};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const SUMMARIZER_PROMPT: &str = "You are a helpful summarizer.";
const ANSWER_MAX_TOKENS: u32 = 512;
const SUMMARY_MAX_TOKENS: u32 = 100;

const BANGLA_BLOCK_START: char = '\u{0980}';
const BANGLA_BLOCK_END: char = '\u{09FF}';

/// Detected query language, driving snippet policy and answer instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Bangla,
    English,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bangla => write!(f, "Bangla"),
            Self::English => write!(f, "English"),
        }
    }
}

/// Classify a query by script presence: one code point in the Bangla Unicode
/// block makes the whole query Bangla. This is deliberately a presence test,
/// not a majority vote, so mixed-script questions get Bangla treatment.
#[inline]
pub fn detect_language(query: &str) -> Language {
    if query
        .chars()
        .any(|ch| (BANGLA_BLOCK_START..=BANGLA_BLOCK_END).contains(&ch))
    {
        Language::Bangla
    } else {
        Language::English
    }
}

/// Truncate text to at most `max_chars` characters, cutting back to the last
/// line boundary inside the truncated span so snippets never end mid-line,
/// then append an ellipsis. Text already within the limit is returned
/// unchanged, with no ellipsis.
#[inline]
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    let head = truncated
        .rsplit_once('\n')
        .map_or(truncated.as_str(), |(head, _)| head);
    format!("{head}…")
}

/// Per-snippet truncation and summarization policy.
///
/// English queries always get a cross-lingual English summary of each snippet;
/// Bangla queries keep the truncated verbatim text unless the hit's similarity
/// fell below the threshold, in which case the likely-tangential snippet is
/// compressed into a short Bangla summary instead of dominating the prompt.
#[derive(Debug, Clone, Copy)]
pub struct SnippetPolicy {
    pub max_chars: usize,
    pub summary_threshold: f32,
}

impl SnippetPolicy {
    /// Convert one retrieved context into a prompt-ready snippet.
    ///
    /// Stateless aside from the summarization call against the generation
    /// service.
    #[inline]
    pub fn prepare(
        &self,
        context: &RetrievedContext,
        language: Language,
        generator: &dyn Generator,
    ) -> Result<String> {
        let truncated = truncate_snippet(&context.text, self.max_chars);

        let snippet = match language {
            Language::English => summarize(&truncated, Language::English, generator)?,
            Language::Bangla => {
                if context.score < self.summary_threshold {
                    debug!(
                        "Summarizing low-similarity snippet {} (score {:.3} < {:.3})",
                        context.id, context.score, self.summary_threshold
                    );
                    summarize(&truncated, Language::Bangla, generator)?
                } else {
                    truncated
                }
            }
        };

        Ok(snippet)
    }
}

fn summarize(text: &str, language: Language, generator: &dyn Generator) -> Result<String> {
    let messages = [
        ChatMessage::system(SUMMARIZER_PROMPT),
        ChatMessage::user(format!(
            "Summarize this text in {language} in 1-2 sentences:\n\n{text}"
        )),
    ];
    let summary = generator.complete(&messages, SUMMARY_MAX_TOKENS)?;
    Ok(summary.trim().to_string())
}

/// Bounded conversational memory for one session.
///
/// Owned by exactly one caller; the pipeline never shares sessions between
/// conversations. A turn is one user message plus one assistant reply, so the
/// message cap is `2 * max_turns`. Old exchanges are dropped as whole pairs
/// from the front before a new exchange is inserted, never after, so the
/// window never transiently holds an extra pair.
#[derive(Debug, Clone)]
pub struct Session {
    turns: Vec<ChatMessage>,
    max_turns: usize,
}

impl Session {
    #[inline]
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    /// Stored history, oldest first.
    #[inline]
    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Prune the oldest whole exchanges until the incoming pair fits, then
    /// record the user turn. Called before retrieval; if generation fails
    /// afterwards, the user turn stays recorded (no rollback).
    #[inline]
    pub fn begin_exchange(&mut self, query: &str) {
        let cap = self.max_turns.saturating_mul(2);
        while !self.turns.is_empty() && self.turns.len() + 2 > cap {
            let pair = self.turns.len().min(2);
            self.turns.drain(..pair);
        }
        self.turns.push(ChatMessage::user(query));
    }

    /// Record the assistant reply completing the current exchange.
    #[inline]
    pub fn record_answer(&mut self, answer: &str) {
        self.turns.push(ChatMessage::assistant(answer));
    }
}

/// The caller-facing result of one pipeline call: the generated answer plus
/// the retrieved contexts that grounded it, in retrieval order.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub contexts: Vec<RetrievedContext>,
}

/// Retrieval-augmented generation pipeline.
///
/// Holds the read-only index and metadata plus the two service adapters.
/// Everything mutable lives in the [`Session`] passed per call, so one
/// pipeline can serve many conversations as long as calls do not overlap.
pub struct RagPipeline<E: Embedder, G: Generator> {
    index: FlatIndex,
    metadata: Vec<MetadataRecord>,
    embedder: E,
    generator: G,
    policy: SnippetPolicy,
}

impl<E: Embedder, G: Generator> RagPipeline<E, G> {
    /// Assemble a pipeline from loaded artifacts, re-checking that the index
    /// and metadata belong together.
    #[inline]
    pub fn new(
        index: FlatIndex,
        metadata: Vec<MetadataRecord>,
        embedder: E,
        generator: G,
        policy: SnippetPolicy,
    ) -> Result<Self> {
        if metadata.len() != index.len() {
            return Err(RagError::IndexIntegrity(format!(
                "metadata has {} records but the index has {} vectors",
                metadata.len(),
                index.len()
            )));
        }

        Ok(Self {
            index,
            metadata,
            embedder,
            generator,
            policy,
        })
    }

    /// Retrieve the `top_k` most similar chunks for a query.
    #[inline]
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedContext>> {
        Retriever::new(&self.index, &self.metadata).retrieve(query, top_k, &self.embedder)
    }

    /// Answer a query grounded in retrieved contexts, updating the session.
    ///
    /// Strictly sequential: retrieve, assemble snippets in retrieval order,
    /// generate once. The user turn is recorded before generation and the
    /// assistant turn after, matching the memory semantics in
    /// [`Session::begin_exchange`].
    #[inline]
    pub fn ask(&self, session: &mut Session, query: &str, top_k: usize) -> Result<QueryResult> {
        session.begin_exchange(query);

        let contexts = self.retrieve(query, top_k)?;
        let language = detect_language(query);

        info!(
            "Answering {} query with {} contexts",
            language,
            contexts.len()
        );

        let snippets = contexts
            .iter()
            .map(|context| self.policy.prepare(context, language, &self.generator))
            .collect::<Result<Vec<_>>>()?;

        let answer = self.generate(session.turns(), query, &snippets, language)?;
        session.record_answer(&answer);

        Ok(QueryResult { answer, contexts })
    }

    /// Build the role-tagged message sequence and invoke the generation
    /// service once. Snippets are numbered in retrieval order, never
    /// re-sorted. The answer is returned verbatim.
    fn generate(
        &self,
        history: &[ChatMessage],
        query: &str,
        snippets: &[String],
        language: Language,
    ) -> Result<String> {
        let contexts_block = snippets
            .iter()
            .enumerate()
            .map(|(i, snippet)| format!("[{}] {snippet}", i + 1))
            .join("\n\n");

        let prompt = format!(
            "Use these contexts to answer the question in {language}:\n\n\
             {contexts_block}\n\n\
             Question: {query}\n\
             Answer in {language}:"
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(prompt));

        self.generator.complete(&messages, ANSWER_MAX_TOKENS)
    }
}
