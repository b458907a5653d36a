//! `sanjeevani scan`: run the whole pipeline on a local photo.
//!
//! Nothing is persisted; history stays in memory for the run.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::Engine;
use serde_json::json;

use sanjeevani_config::ServiceConfig;
use sanjeevani_core::{ScanRequest, ScanResult, ScanType};
use sanjeevani_history::InMemoryHistoryStore;
use sanjeevani_media::detect_mime_type;
use sanjeevani_pipeline::{ScanOutcome, ScanPipeline};

use crate::terminal_output::{note_info, note_success, note_warn, render_table, Column};

pub async fn run(
    config: &ServiceConfig,
    image: &Path,
    scan_type: ScanType,
    language: &str,
    out: Option<&Path>,
) -> Result<()> {
    let image_bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("reading {}", image.display()))?;

    // keep the audio in memory so it can be written wherever --out says
    let mut config = config.clone();
    config.limits.max_embedded_audio_bytes = usize::MAX;
    let pipeline = ScanPipeline::from_config(&config, Arc::new(InMemoryHistoryStore::new()));

    note_info(&format!("Scanning {} as {scan_type} ({language})", image.display()));
    let outcome = pipeline
        .run(ScanRequest {
            image_bytes,
            mime_type: Some(detect_mime_type(image).to_string()),
            scan_type,
            language_code: language.to_string(),
            user_id: None,
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&json!({ "success": true, "data": outcome.result }))?);
    print_summary(&outcome);

    if let Some(path) = out {
        write_audio(&outcome, path).await?;
    }
    Ok(())
}

fn print_summary(outcome: &ScanOutcome) {
    match &outcome.result {
        ScanResult::Fallback(_) => {
            note_warn("The text model's reply could not be structured; showing it raw.");
            return;
        }
        ScanResult::Prescription(rx) if !rx.medicines.is_empty() => {
            let rows: Vec<Vec<String>> = rx
                .medicines
                .iter()
                .map(|m| vec![m.name.clone(), m.dosage.clone(), m.dose_slots().join(", ")])
                .collect();
            let columns = [Column::left("Medicine"), Column::left("Dose"), Column::left("When")];
            println!("\n{}", render_table(&columns, &rows));
        }
        _ => {}
    }

    if let Some(narration) = &outcome.narration {
        note_info(&format!("Narration ({}): {}", narration.speech_language(), narration.text()));
    }
    if let Some(english) = outcome.result.english_advice_for_display() {
        note_info(&format!("In English: {english}"));
    }
}

async fn write_audio(outcome: &ScanOutcome, path: &Path) -> Result<()> {
    let Some(data_uri) = outcome.audio.as_ref().and_then(|a| a.embedded()) else {
        note_warn("No narration audio was produced.");
        return Ok(());
    };
    let Some((_, encoded)) = data_uri.split_once(";base64,") else {
        bail!("unexpected audio encoding");
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("decoding narration audio")?;
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    note_success(&format!("Wrote {} bytes of audio to {}", bytes.len(), path.display()));
    Ok(())
}
