#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end pipeline tests over a small corpus, with the embedding and
// generation services replaced by deterministic fakes.

use std::collections::HashMap;
use tempfile::TempDir;

use polyglot_rag::embeddings::Embedder;
use polyglot_rag::generation::{ChatMessage, Generator, Role};
use polyglot_rag::rag::{QueryResult, RagPipeline, Session, SnippetPolicy};
use polyglot_rag::vector_store::{FlatIndex, MetadataRecord, l2_normalize, load_artifacts, save_metadata};
use polyglot_rag::{RagError, Result};

const CHUNK_CAPITAL: &str = "Dhaka is the capital of Bangladesh.";
const CHUNK_POPULATION: &str = "Dhaka has a population of over 8 million.";
const CHUNK_CATS: &str = "Cats are small mammals.";

const QUERY_EN: &str = "What is the capital of Bangladesh?";
const QUERY_BN: &str = "বাংলাদেশের রাজধানী কী?";

/// Deterministic embedder backed by a fixed text-to-vector table.
struct FakeEmbedder {
    vectors: HashMap<&'static str, Vec<f32>>,
}

impl FakeEmbedder {
    fn new() -> Self {
        Self {
            vectors: HashMap::from([
                (CHUNK_CAPITAL, vec![1.0, 0.0, 0.0]),
                (CHUNK_POPULATION, vec![0.6, 0.8, 0.0]),
                (CHUNK_CATS, vec![0.0, 0.0, 1.0]),
                // Queries about the capital point near the capital chunk.
                (QUERY_EN, vec![1.0, 0.2, 0.0]),
                (QUERY_BN, vec![1.0, 0.1, 0.0]),
            ]),
        }
    }

    fn lookup(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| RagError::Embedding(format!("no fake vector for: {text}")))
    }
}

impl Embedder for FakeEmbedder {
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.lookup(query)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.lookup(t)).collect()
    }
}

/// Generator fake: summarization calls return the summarized text with a
/// marker prefix; answer calls echo the assembled prompt so assertions can
/// inspect exactly what the model would have seen.
struct FakeGenerator;

impl Generator for FakeGenerator {
    fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String> {
        let system = messages.first().ok_or_else(|| {
            RagError::Generation("fake generator got no system message".to_string())
        })?;
        let user = messages.last().ok_or_else(|| {
            RagError::Generation("fake generator got no user message".to_string())
        })?;

        if system.content.contains("summarizer") {
            let text = user
                .content
                .rsplit_once("\n\n")
                .map_or(user.content.as_str(), |(_, text)| text);
            Ok(format!("(summary) {text}"))
        } else {
            Ok(user.content.clone())
        }
    }
}

fn build_corpus(embedder: &FakeEmbedder) -> (FlatIndex, Vec<MetadataRecord>) {
    let texts: Vec<String> = [CHUNK_CAPITAL, CHUNK_POPULATION, CHUNK_CATS]
        .iter()
        .map(|t| (*t).to_string())
        .collect();

    let mut vectors = embedder.embed_batch(&texts).expect("should embed corpus");
    for v in &mut vectors {
        l2_normalize(v);
    }
    let index = FlatIndex::build(vectors).expect("should build index");

    let metadata = texts
        .iter()
        .enumerate()
        .map(|(i, text)| MetadataRecord {
            chunk_id: format!("chunk_{i:04}"),
            text: text.clone(),
        })
        .collect();

    (index, metadata)
}

fn build_pipeline() -> RagPipeline<FakeEmbedder, FakeGenerator> {
    let embedder = FakeEmbedder::new();
    let (index, metadata) = build_corpus(&embedder);
    let policy = SnippetPolicy {
        max_chars: 1000,
        summary_threshold: 0.4,
    };
    RagPipeline::new(index, metadata, embedder, FakeGenerator, policy)
        .expect("should build pipeline")
}

fn ask(pipeline: &RagPipeline<FakeEmbedder, FakeGenerator>, query: &str, top_k: usize) -> QueryResult {
    let mut session = Session::new(5);
    pipeline.ask(&mut session, query, top_k).expect("should answer")
}

#[test]
fn capital_query_ranks_dhaka_chunks_above_cats() {
    let pipeline = build_pipeline();
    let result = ask(&pipeline, QUERY_EN, 2);

    assert_eq!(result.contexts.len(), 2);
    assert_eq!(result.contexts[0].id, "chunk_0000");
    assert_eq!(result.contexts[0].text, CHUNK_CAPITAL);
    assert_eq!(result.contexts[1].id, "chunk_0001");
    assert!(result.contexts[0].score > result.contexts[1].score);
}

#[test]
fn answer_is_grounded_and_never_mentions_cats() {
    let pipeline = build_pipeline();
    let result = ask(&pipeline, QUERY_EN, 2);

    assert!(result.answer.contains("Dhaka is the capital of Bangladesh."));
    assert!(!result.answer.to_lowercase().contains("cats"));
    assert!(result.answer.contains(&format!("Question: {QUERY_EN}")));
}

#[test]
fn english_query_summarizes_every_snippet() {
    let pipeline = build_pipeline();
    let result = ask(&pipeline, QUERY_EN, 2);

    // Both snippets went through the cross-lingual summarization path and
    // kept their retrieval-rank numbering.
    assert!(result.answer.contains("[1] (summary)"));
    assert!(result.answer.contains("[2] (summary)"));
    assert!(result.answer.contains("Answer in English:"));
}

#[test]
fn bangla_query_keeps_confident_snippets_verbatim() {
    let pipeline = build_pipeline();
    let result = ask(&pipeline, QUERY_BN, 3);

    // High-similarity hits stay verbatim; only the tangential cat chunk
    // falls under the summary threshold.
    assert!(result.answer.contains(&format!("[1] {CHUNK_CAPITAL}")));
    assert!(result.answer.contains(&format!("[2] {CHUNK_POPULATION}")));
    assert!(result.answer.contains("[3] (summary)"));
    assert!(result.answer.contains("Answer in Bangla:"));
}

#[test]
fn top_k_beyond_corpus_size_returns_the_whole_corpus() {
    let pipeline = build_pipeline();
    let contexts = pipeline.retrieve(QUERY_EN, 50).expect("should retrieve");
    assert_eq!(contexts.len(), 3);
}

#[test]
fn session_records_both_sides_of_the_exchange() {
    let pipeline = build_pipeline();
    let mut session = Session::new(5);

    let result = pipeline
        .ask(&mut session, QUERY_EN, 2)
        .expect("should answer");

    assert_eq!(session.turns().len(), 2);
    assert_eq!(session.turns()[0].role, Role::User);
    assert_eq!(session.turns()[0].content, QUERY_EN);
    assert_eq!(session.turns()[1].role, Role::Assistant);
    assert_eq!(session.turns()[1].content, result.answer);
}

#[test]
fn history_is_visible_to_later_prompts() {
    let pipeline = build_pipeline();
    let mut session = Session::new(5);

    pipeline
        .ask(&mut session, QUERY_EN, 2)
        .expect("should answer first question");
    let second = pipeline
        .ask(&mut session, QUERY_BN, 2)
        .expect("should answer second question");

    // The fake generator echoes the final prompt, which follows the history;
    // the first exchange lives in the session, not inside the second prompt.
    assert_eq!(session.turns().len(), 4);
    assert_eq!(session.turns()[0].content, QUERY_EN);
    assert!(second.answer.contains(&format!("Question: {QUERY_BN}")));
}

#[test]
fn memory_window_drops_whole_pairs_across_calls() {
    let pipeline = build_pipeline();
    let max_turns = 2;
    let mut session = Session::new(max_turns);

    for _ in 0..(max_turns + 3) {
        pipeline
            .ask(&mut session, QUERY_EN, 2)
            .expect("should answer");
    }

    assert_eq!(session.turns().len(), 2 * max_turns);
    assert_eq!(session.turns()[0].role, Role::User);
    assert_eq!(session.turns()[1].role, Role::Assistant);
}

#[test]
fn pipeline_round_trips_through_persisted_artifacts() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("kb.index");
    let meta_path = temp_dir.path().join("kb.index.meta.json");

    let embedder = FakeEmbedder::new();
    let (index, metadata) = build_corpus(&embedder);
    index.save(&index_path).expect("should save index");
    save_metadata(&metadata, &meta_path).expect("should save metadata");

    let (loaded_index, loaded_metadata) =
        load_artifacts(&index_path, &meta_path).expect("should load artifacts");
    let policy = SnippetPolicy {
        max_chars: 1000,
        summary_threshold: 0.4,
    };
    let pipeline = RagPipeline::new(loaded_index, loaded_metadata, embedder, FakeGenerator, policy)
        .expect("should build pipeline");

    let result = ask(&pipeline, QUERY_EN, 2);
    assert_eq!(result.contexts[0].text, CHUNK_CAPITAL);
}

#[test]
fn mismatched_artifacts_are_rejected_at_pipeline_construction() {
    let embedder = FakeEmbedder::new();
    let (index, mut metadata) = build_corpus(&embedder);
    metadata.pop();

    let policy = SnippetPolicy {
        max_chars: 1000,
        summary_threshold: 0.4,
    };
    let result = RagPipeline::new(index, metadata, embedder, FakeGenerator, policy);
    assert!(matches!(result, Err(RagError::IndexIntegrity(_))));
}
