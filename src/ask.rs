//! `docqa ask`: answer one question from the command line.

use anyhow::Result;

use docqa_core::models::{AnswerStatus, AskRequest};

use crate::context::AppContext;

pub async fn run_ask(ctx: &AppContext, question: &str, year: Option<i32>) -> Result<()> {
    let answer = ctx
        .ask(&AskRequest {
            question: question.to_string(),
            year,
        })
        .await?;

    println!("{}", answer.answer);

    match answer.status {
        AnswerStatus::Answered => {}
        AnswerStatus::NotFound => println!("\n(no relevant documents found)"),
        AnswerStatus::GenerationUnavailable => {
            println!("\n(answer generation unavailable; showing retrieved sources)")
        }
    }

    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in answer.sources.iter().enumerate() {
            let year = source
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "undated".to_string());
            println!("  {}. {} ({})", i + 1, source.filename, year);
            println!("     {}", source.preview.replace('\n', " "));
        }
    }

    Ok(())
}
