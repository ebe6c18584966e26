
use anyhow::{Context, Result};
use console::style;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// One question with the answer fragment it is expected to contain.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EvalCase {
    pub query: String,
    pub expected: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EvalSuite {
    pub cases: Vec<EvalCase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalReport {
    pub total: usize,
    pub correct: usize,
}

impl EvalReport {
    #[inline]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

/// Load an evaluation suite from a TOML file of `[[cases]]` entries.
#[inline]
pub fn load_suite(path: &Path) -> Result<EvalSuite> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read eval suite: {}", path.display()))?;
    let suite: EvalSuite = toml::from_str(&content)
        .with_context(|| format!("Failed to parse eval suite: {}", path.display()))?;
    Ok(suite)
}

/// Run every case through `answer_fn` and score by case-insensitive
/// containment of the expected fragment.
#[inline]
pub fn evaluate<F>(suite: &EvalSuite, mut answer_fn: F) -> Result<EvalReport>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut correct = 0;

    for case in &suite.cases {
        let answer = answer_fn(&case.query)?;
        let hit = answer.to_lowercase().contains(&case.expected.to_lowercase());

        let marker = if hit {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!("Q: {}", case.query);
        println!("Expected: {}", case.expected);
        println!("Got: {answer}");
        println!("Result: {marker}");
        println!();

        if hit {
            correct += 1;
        }
    }

    let report = EvalReport {
        total: suite.cases.len(),
        correct,
    };

    info!(
        "Evaluation finished: {}/{} correct ({:.2}%)",
        report.correct,
        report.total,
        report.accuracy()
    );

    Ok(report)
}
