//! Bulk loading of example questions into a collection.

use ontopic_common::{Result, ResultExt};
use ontopic_memory::VectorCollection;
use serde::{Deserialize, Serialize};

/// One example question as submitted to the bulk-load endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleQuestion {
    pub question: String,
}

impl ExampleQuestion {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Summary of a bulk load into one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub collection: String,
    /// Size of each batch, in load order
    pub batches: Vec<usize>,
    /// Total number of questions stored
    pub loaded: usize,
}

/// Append `questions` to `collection` in batches of `batch_size`.
///
/// Every batch adds to what is already stored. A failing batch aborts the
/// load; batches stored before it stay in the collection.
pub async fn load_examples(
    collection: &dyn VectorCollection,
    questions: &[String],
    batch_size: usize,
) -> Result<LoadReport> {
    let batch_size = batch_size.max(1);
    let mut report = LoadReport {
        collection: collection.name().to_string(),
        batches: Vec::with_capacity(questions.len().div_ceil(batch_size)),
        loaded: 0,
    };

    for (index, batch) in questions.chunks(batch_size).enumerate() {
        let stored = collection
            .add_texts(batch)
            .await
            .context(format!("Loading batch {} into '{}'", index + 1, collection.name()))?;
        tracing::debug!(
            collection = %collection.name(),
            batch = index + 1,
            size = batch.len(),
            "Stored example batch"
        );
        report.batches.push(batch.len());
        report.loaded += stored;
    }

    tracing::info!(
        collection = %report.collection,
        loaded = report.loaded,
        batches = report.batches.len(),
        "Example questions loaded"
    );
    Ok(report)
}
