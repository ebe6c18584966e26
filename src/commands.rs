use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::chunking::chunk_by_chars;
use crate::config::Config;
use crate::embeddings::{Embedder, HfClient};
use crate::eval::{evaluate, load_suite};
use crate::generation::GroqClient;
use crate::preprocess::clean_text;
use crate::rag::{RagPipeline, Session, SnippetPolicy, truncate_snippet};
use crate::retrieval::Retriever;
use crate::vector_store::{FlatIndex, MetadataRecord, l2_normalize, load_artifacts, save_metadata};

/// Ingest an extracted text file into a named knowledge base:
/// clean, chunk, embed, normalize, index, persist.
#[inline]
pub fn ingest(input: &Path, kb: &str) -> Result<()> {
    let config = Config::load()?;

    info!("Ingesting {} into knowledge base '{}'", input.display(), kb);

    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let cleaned = clean_text(&raw).context("Failed to clean input text")?;

    let chunks = chunk_by_chars(&cleaned, config.chunking.max_chars, config.chunking.overlap)?;
    if chunks.is_empty() {
        bail!("input file produced no chunks after cleaning");
    }
    println!("Prepared {} chunks from {}", chunks.len(), input.display());

    let client = HfClient::new(&config)?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(chunks.len() as u64).with_style(
            ProgressStyle::with_template("{bar:30} [{pos}/{len}] Embedding chunks")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(config.hf.batch_size as usize) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embedded = client
            .embed_batch(&texts)
            .context("Failed to embed chunk batch")?;
        for mut vector in embedded {
            l2_normalize(&mut vector);
            vectors.push(vector);
        }
        bar.inc(batch.len() as u64);
    }
    bar.finish_and_clear();

    let index = FlatIndex::build(vectors)?;
    let metadata: Vec<MetadataRecord> = chunks
        .into_iter()
        .map(|chunk| MetadataRecord {
            chunk_id: chunk.id,
            text: chunk.text,
        })
        .collect();

    let (index_path, meta_path) = config.index_paths(kb);
    index.save(&index_path)?;
    save_metadata(&metadata, &meta_path)?;

    println!(
        "Built index at {} with {} vectors (dimension {})",
        index_path.display(),
        index.len(),
        index.dimension()
    );

    Ok(())
}

/// Preview the top-k retrieved chunks for a query, without generation.
#[inline]
pub fn retrieve(query: &str, top_k: usize, kb: &str) -> Result<()> {
    let config = Config::load()?;
    let (index_path, meta_path) = config.index_paths(kb);
    let (index, metadata) = load_artifacts(&index_path, &meta_path)?;
    let embedder = HfClient::new(&config)?;

    let contexts = Retriever::new(&index, &metadata).retrieve(query, top_k, &embedder)?;

    println!("Top {} chunks for query: “{}”", contexts.len(), query);
    println!();
    for context in &contexts {
        println!("[{}] (score={:.4})", context.id, context.score);
        println!("{}", truncate_snippet(&context.text, 300));
        println!("{}", "-".repeat(80));
    }

    Ok(())
}

/// Answer a single question with a fresh, empty conversation.
#[inline]
pub fn ask(query: &str, top_k: usize, kb: &str) -> Result<()> {
    let config = Config::load()?;
    let pipeline = load_pipeline(&config, kb)?;
    let mut session = Session::new(config.short_term.max_turns);

    let result = pipeline.ask(&mut session, query, top_k)?;

    println!("Answer:");
    println!("{}", result.answer);
    println!();
    println!("Contexts:");
    for context in &result.contexts {
        println!("- [{}] score={:.3}", context.id, context.score);
        println!("  {}", truncate_snippet(&context.text, 200));
    }

    Ok(())
}

/// Interactive chat holding one conversation session across questions.
#[inline]
pub fn chat(top_k: usize, kb: &str) -> Result<()> {
    let config = Config::load()?;
    let pipeline = load_pipeline(&config, kb)?;
    let mut session = Session::new(config.short_term.max_turns);

    eprintln!(
        "{}",
        style("Interactive chat. Empty input or 'exit' quits.").dim()
    );

    loop {
        let line: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        let query = line.trim();

        if query.is_empty() || query.eq_ignore_ascii_case("exit") {
            break;
        }

        match pipeline.ask(&mut session, query, top_k) {
            Ok(result) => {
                println!("{} {}", style("Assistant:").bold().green(), result.answer);
                let ids: Vec<&str> = result.contexts.iter().map(|c| c.id.as_str()).collect();
                println!("{}", style(format!("(contexts: {})", ids.join(", "))).dim());
            }
            Err(e) => {
                error!("Pipeline call failed: {}", e);
                eprintln!("{} {e}", style("Error:").bold().red());
            }
        }
    }

    Ok(())
}

/// Score a TOML suite of query/expected pairs against the live pipeline.
///
/// The whole suite shares one session, so later cases see earlier exchanges
/// through conversation memory, the same way a real session would.
#[inline]
pub fn eval(tests: &Path, top_k: usize, kb: &str) -> Result<()> {
    let config = Config::load()?;
    let suite = load_suite(tests)?;
    let pipeline = load_pipeline(&config, kb)?;
    let mut session = Session::new(config.short_term.max_turns);

    let report = evaluate(&suite, |query| {
        Ok(pipeline.ask(&mut session, query, top_k)?.answer)
    })?;

    println!(
        "Overall Accuracy: {}/{} = {:.2}%",
        report.correct,
        report.total,
        report.accuracy()
    );

    Ok(())
}

fn load_pipeline(config: &Config, kb: &str) -> Result<RagPipeline<HfClient, GroqClient>> {
    let (index_path, meta_path) = config.index_paths(kb);
    let (index, metadata) = load_artifacts(&index_path, &meta_path)?;
    let embedder = HfClient::new(config)?;
    let generator = GroqClient::new(config)?;
    let policy = SnippetPolicy {
        max_chars: config.summarization.max_chars,
        summary_threshold: config.summarization.summary_threshold,
    };

    Ok(RagPipeline::new(index, metadata, embedder, generator, policy)?)
}
