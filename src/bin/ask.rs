use anyhow::{Context, Result};
use clap::Parser;
use lawguide::init_tracing;
use lawguide_core::{format_answer, format_context, AppContext, Settings, CONTEXT_PREVIEW_CHARS};

#[derive(Parser, Debug)]
#[command(name = "lawguide-ask", about = "Answer a legal question from the indexed documents")]
struct AskCli {
    /// The question to answer
    question: String,

    /// Also print the passages the answer was grounded on
    #[arg(long)]
    show_context: bool,

    /// Print the generator output without formatting
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Keep stdout for the answer; only warnings go to stderr by default.
    init_tracing("warn");
    let cli = AskCli::parse();
    anyhow::ensure!(!cli.question.trim().is_empty(), "Please enter a valid legal question.");

    let settings = Settings::load().context("failed to load configuration")?;
    let context = AppContext::initialize(settings)
        .await
        .context("failed to initialize the question-answering pipeline")?;

    let answer = context.pipeline().answer(&cli.question).await?;

    if cli.raw {
        println!("{}", answer.answer.trim());
    } else {
        println!("{}", format_answer(&answer).formatted_answer);
    }

    if cli.show_context {
        println!("\n### Retrieved Context\n");
        println!("{}", format_context(&answer.context, CONTEXT_PREVIEW_CHARS));
    }
    Ok(())
}
