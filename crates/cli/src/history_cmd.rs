use anyhow::Result;

use crate::app::App;
use crate::output::{self, OutputFormat};

/// The signed-in user's verifications, newest first. `more` fetches that
/// many additional older pages.
pub async fn run_history(query: Option<String>, more: usize, format: OutputFormat) -> Result<()> {
    let app = App::open("/dashboard")?;
    app.require_store()?;
    app.start().await?;

    app.ctx.refresh_history().await?;
    for _ in 0..more {
        if app.ctx.load_more_history().await? == 0 {
            break;
        }
    }

    let history = app.ctx.history();
    let items = match query.as_deref() {
        Some(q) => history.filtered(q),
        None => history.snapshot(),
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No verifications yet. Try `satya verify <claim>`.");
            }
            for item in &items {
                println!("{}", output::summary_line(item));
            }
            if query.is_some() {
                println!("\n{} of {} shown", items.len(), history.len());
            }
        }
    }
    app.finish()
}
