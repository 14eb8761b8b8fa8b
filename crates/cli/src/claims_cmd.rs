use anyhow::{Context, Result};
use satya_core::catalog::{VerdictFilter, filter_claims};

use crate::app::App;
use crate::output::{self, OutputFormat};

pub async fn run_verify(words: Vec<String>) -> Result<()> {
    let app = App::open("/verify")?;
    app.start().await?;

    let claim = words.join(" ");
    println!("Verifying claim...");
    let result = app
        .ctx
        .submitter()
        .submit(app.session().as_ref(), &claim)
        .await?;
    println!();
    print!("{}", output::verdict_result(&result));
    app.finish()
}

pub async fn run_claims(query: Option<String>, verdict: &str, format: OutputFormat) -> Result<()> {
    let filter: VerdictFilter = verdict
        .parse()
        .with_context(|| format!("unknown verdict filter {verdict:?}"))?;
    let app = App::open("/explore")?;
    app.start().await?;

    let page = app.ctx.catalog().load().await;
    if let Some(notice) = &page.notice {
        eprintln!("{notice}");
    }
    let shown = filter_claims(&page.claims, query.as_deref().unwrap_or(""), filter);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        OutputFormat::Text => {
            if shown.is_empty() {
                println!("No claims match.");
            }
            for claim in shown {
                println!("{}", output::claim_line(claim));
            }
        }
    }
    app.finish()
}

pub async fn run_health() -> Result<()> {
    let app = App::open("/")?;
    let health = app
        .api
        .health()
        .await
        .with_context(|| format!("verdict service at {} is unreachable", app.api.base_url()))?;
    println!("Service:  {}", app.api.base_url());
    println!("Status:   {}", health.status);
    println!(
        "Store:    {}",
        if health.store_connected {
            "connected"
        } else {
            "disconnected"
        }
    );
    if let Some(timestamp) = health.timestamp {
        println!("Time:     {timestamp}");
    }
    app.finish()
}
