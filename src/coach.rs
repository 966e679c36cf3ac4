//! `symq ask` and `symq chat`: the fitness-coach front end.
//!
//! Both commands build a [`Pipeline`] from configuration and send questions
//! against a corpus file or the built-in knowledge. In `chat`, the index is
//! built on the first question and reused for every later one; a failed
//! question is reported and the session carries on.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;

use symmetriq_core::error::RagError;
use symmetriq_core::models::{Answer, Grounding};

use crate::config::Config;
use crate::corpus::Corpus;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::pipeline::Pipeline;

/// Shown for any external-service failure.
pub const SERVICE_UNAVAILABLE: &str = "could not reach the coaching assistant, try again";

/// Build a pipeline with the providers named in `config`.
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let embedder = create_embedder(&config.embedding).context("Failed to create embedder")?;
    let generator = create_generator(&config.generation).context("Failed to create generator")?;
    Ok(Pipeline::new(config.pipeline_config(), embedder, generator)?)
}

/// User-facing text for a pipeline error.
pub fn describe_error(err: &RagError) -> String {
    if err.is_service_error() {
        format!("{} ({})", SERVICE_UNAVAILABLE, err)
    } else {
        err.to_string()
    }
}

fn render_answer(answer: &Answer) -> String {
    let mut out = format!("CoachBot: {}", answer.text);
    match answer.grounding {
        Grounding::Retrieved => {
            let sources: Vec<String> = answer.sources.iter().map(|i| format!("#{}", i)).collect();
            out.push_str(&format!("\n  (sources: segments {})", sources.join(", ")));
        }
        Grounding::NoRelevantContext => {
            out.push_str("\n  (no matching reference material; general guidance)");
        }
    }
    out
}

/// Run `symq ask`.
pub async fn run_ask(
    config: &Config,
    corpus_path: Option<&Path>,
    question: &str,
    json: bool,
) -> Result<()> {
    if question.trim().is_empty() {
        return Ok(());
    }

    let corpus = Corpus::from_file_or_default(corpus_path)?;
    let pipeline = build_pipeline(config)?;

    match pipeline.ask(&corpus, question).await {
        Ok(answer) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", render_answer(&answer));
            }
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(describe_error(&e))),
    }
}

/// Answer questions read line by line from `input` until EOF or `exit`.
///
/// Returns the number of questions answered successfully.
pub async fn chat_loop<R, W>(
    pipeline: &Pipeline,
    corpus: &Corpus,
    input: R,
    mut output: W,
) -> Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let question = line.trim();
        if question == "exit" || question == "quit" {
            break;
        }
        if !question.is_empty() {
            match pipeline.ask(corpus, question).await {
                Ok(answer) => {
                    writeln!(output, "{}", render_answer(&answer))?;
                    answered += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "question failed");
                    writeln!(output, "{}", describe_error(&e))?;
                }
            }
        }
        write!(output, "> ")?;
        output.flush()?;
    }

    writeln!(output)?;
    Ok(answered)
}

/// Run `symq chat` on stdin/stdout.
pub async fn run_chat(config: &Config, corpus_path: Option<&Path>) -> Result<()> {
    let corpus = Corpus::from_file_or_default(corpus_path)?;
    let pipeline = build_pipeline(config)?;

    println!("Ask a question about training, nutrition, or body proportions (empty line skips, `exit` quits).");
    let stdin = std::io::stdin();
    let answered = chat_loop(&pipeline, &corpus, stdin.lock(), std::io::stdout()).await?;
    tracing::info!(answered, "chat session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_service_error() {
        let msg = describe_error(&RagError::GenerationService("503".into()));
        assert!(msg.starts_with(SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_describe_validation_error() {
        let msg = describe_error(&RagError::invalid("corpus", "is empty"));
        assert_eq!(msg, "invalid corpus: is empty");
    }

    #[test]
    fn test_render_sources() {
        let answer = Answer {
            text: "Eat protein.".to_string(),
            sources: vec![2, 0],
            grounding: Grounding::Retrieved,
        };
        let out = render_answer(&answer);
        assert!(out.starts_with("CoachBot: Eat protein."));
        assert!(out.contains("segments #2, #0"));
    }

    #[tokio::test]
    async fn test_ask_empty_question_is_noop() {
        // No services are constructed for an empty question.
        run_ask(&Config::default(), None, "  ", false).await.unwrap();
    }
}
