//! `campusfed extract`: Merge text extracted from an uploaded document into
//! a student's profile.

use campusfed_core::student::StudentId;
use campusfed_gateway::{AppState, BoxError};
use campusfed_pipeline::EtlOutcome;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    student_id: i64,
    document_type: String,
    text: Option<String>,
    file: Option<&Path>,
) -> Result<(), BoxError> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(file)) => std::fs::read_to_string(file)
            .map_err(|e| format!("Failed to read {}: {e}", file.display()))?,
        (None, None) => return Err("pass the extracted text with --text or --file".into()),
    };

    tracing::debug!(student_id, chars = text.len(), "Extracted text loaded");

    let config = super::load_config(config_path)?;
    let state = AppState::from_config(config).await?;

    let outcome = state
        .updater
        .update_profile(StudentId(student_id), &document_type, &text)
        .await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let EtlOutcome::Failed { reason } = outcome {
        return Err(reason.into());
    }
    Ok(())
}
