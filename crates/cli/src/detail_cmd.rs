use anyhow::Result;
use satya_client::DetailView;
use satya_core::VoteValue;

use crate::app::App;
use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

impl From<Direction> for VoteValue {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => VoteValue::Up,
            Direction::Down => VoteValue::Down,
        }
    }
}

async fn open_loaded(verification_id: &str) -> Result<(App, DetailView)> {
    let app = App::open(&format!("/verify/{verification_id}"))?;
    app.require_store()?;
    app.start().await?;
    let view = app.ctx.open_detail();
    view.load(verification_id, app.session().as_ref()).await?;
    Ok((app, view))
}

pub async fn run_show(verification_id: &str, format: OutputFormat) -> Result<()> {
    let (app, view) = open_loaded(verification_id).await?;
    if let Some(detail) = view.detail() {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&detail)?),
            OutputFormat::Text => print!("{}", output::detail(&detail)),
        }
    }
    view.teardown();
    app.finish()
}

pub async fn run_comment(verification_id: &str, words: Vec<String>) -> Result<()> {
    let (app, view) = open_loaded(verification_id).await?;
    let comment = view
        .post_comment(app.session().as_ref(), &words.join(" "))
        .await?;
    println!("Comment posted.");
    println!("{}", output::comment_line(&comment));
    view.teardown();
    app.finish()
}

/// Voting the same direction twice clears the vote.
pub async fn run_vote(verification_id: &str, comment_id: &str, direction: Direction) -> Result<()> {
    let (app, view) = open_loaded(verification_id).await?;
    let tally = view
        .vote(app.session().as_ref(), comment_id, direction.into())
        .await?;
    let mine = match tally.user_vote {
        VoteValue::Up => "up",
        VoteValue::Down => "down",
        VoteValue::Neutral => "none",
    };
    println!("Votes: {:+} (yours: {mine})", tally.count);
    view.teardown();
    app.finish()
}
