//! `campusfed ask`: Answer a single question without starting the server.

use campusfed_core::query::Query;
use campusfed_core::student::StudentId;
use campusfed_gateway::{AppState, BoxError};
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    question: String,
    student_id: Option<i64>,
    trace: bool,
) -> Result<(), BoxError> {
    let config = super::load_config(config_path)?;
    let state = AppState::from_config(config).await?;

    let query = Query::new(question, student_id.map(StudentId));
    if trace {
        let trace = state.pipeline.answer_with_trace(&query).await;
        println!("{}", serde_json::to_string_pretty(&trace)?);
        return Ok(());
    }

    let answer = state.pipeline.answer(&query).await;
    if answer.is_error() {
        return Err(answer.text().to_string().into());
    }
    println!("{}", answer.text());
    Ok(())
}
