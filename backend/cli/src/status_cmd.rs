//! `sanjeevani status`: probe a running server.

use anyhow::Result;
use serde_json::Value;

use crate::terminal_output::{note_error, note_success, note_warn, render_table, Column};

pub async fn run(base_url: &str) -> Result<()> {
    let url = format!("{}/api/health", base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();

    let body: Value = match client.get(&url).send().await {
        Ok(resp) => resp.json().await?,
        Err(_) => {
            note_error(&format!("Sanjeevani is not running at {base_url}"));
            return Ok(());
        }
    };

    note_success(&format!(
        "{} {} up for {}s",
        body["service"].as_str().unwrap_or("sanjeevani"),
        body["version"].as_str().unwrap_or("?"),
        body["uptime_seconds"].as_u64().unwrap_or(0)
    ));

    let rows: Vec<Vec<String>> = ["vision", "text", "speech"]
        .iter()
        .map(|name| {
            let state = body["providers"][name].as_str().unwrap_or("unknown");
            vec![name.to_string(), state.to_string()]
        })
        .collect();
    println!("{}", render_table(&[Column::left("Provider"), Column::left("State")], &rows));

    if rows.iter().any(|row| row[1] == "missing_configuration") {
        note_warn("Scans will fail until the missing API keys are set.");
    }
    Ok(())
}
