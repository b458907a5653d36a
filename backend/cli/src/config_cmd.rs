//! `sanjeevani config`: print the effective configuration.

use anyhow::Result;
use sanjeevani_config::{redacted_snapshot, ServiceConfig};

pub fn run(config: &ServiceConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&redacted_snapshot(config))?);
    Ok(())
}
