//! Pipeline assembly and the `ask` / `retrieve` commands.

use anyhow::Result;
use std::sync::Arc;

use context_gate_core::embedding::Embedder;
use context_gate_core::generate::Generator;
use context_gate_core::rerank::{ReRanker, RelevanceScorer};
use context_gate_core::store::VectorIndex;
use context_gate_core::{Answer, Pipeline, Policy};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::scoring::create_scorer;
use crate::sqlite_index::SqliteIndex;

/// Wire a pipeline from explicit collaborators, taking budgets and the
/// policy from `config`.
pub fn assemble_pipeline(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    scorer: Arc<dyn RelevanceScorer>,
    generator: Arc<dyn Generator>,
) -> Result<Pipeline> {
    let reranker = ReRanker::new(scorer, config.rerank.params.clone())?;
    Ok(Pipeline::new(embedder, index, reranker, generator)
        .with_top_k(config.retrieval.top_k)
        .with_policy(config.retrieval.policy))
}

/// Build the configured providers over `index`.
pub fn build_pipeline(config: &Config, index: Arc<dyn VectorIndex>) -> Result<Pipeline> {
    assemble_pipeline(
        config,
        create_embedder(&config.embedding)?,
        index,
        create_scorer(&config.rerank)?,
        create_generator(&config.generation)?,
    )
}

pub async fn run_ask(config: &Config, question: &str, policy: Option<Policy>) -> Result<()> {
    let index = SqliteIndex::open(config).await?;
    let pipeline = build_pipeline(config, Arc::new(index.clone()))?;
    let answer = pipeline
        .answer_with_policy(question, policy.unwrap_or(pipeline.policy()))
        .await?;
    print_answer(&answer);
    index.close().await;
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    println!();
    println!("confidence: {}", answer.confidence);
    if answer.fragments.is_empty() {
        return;
    }
    println!("sources:");
    for (i, f) in answer.fragments.iter().enumerate() {
        let score = match f.relevance {
            Some(r) => format!("relevance {:.3}", r),
            None => format!("vector {:.3}", f.fragment.vector_score),
        };
        println!(
            "  {}. {} {} [{}] ({})",
            i + 1,
            f.fragment.metadata.source_id,
            f.fragment.metadata.section.label(),
            short_id(&f.fragment.id),
            score
        );
    }
}

/// Print raw vector candidates without re-ranking or generation.
pub async fn run_retrieve(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let index = SqliteIndex::open(config).await?;
    let embedder = create_embedder(&config.embedding)?;
    let embedding = embedder.embed(question).await?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let results = index.query(&embedding, top_k).await?.into_fragments();

    if results.is_empty() {
        println!("No results.");
    }
    for (i, f) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} {} ({})",
            i + 1,
            f.vector_score,
            f.metadata.source_id,
            f.metadata.section.label(),
            short_id(&f.id)
        );
        println!("    {}", snippet(&f.text, 160));
    }

    index.close().await;
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}…", cut)
}
