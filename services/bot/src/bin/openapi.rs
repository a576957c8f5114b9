//! services/bot/src/bin/openapi.rs
//!
//! Dumps the HTTP API description for the event relay's developers.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use bot_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    if let Some(parent) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let document = ApiDoc::openapi();
    std::fs::write(&output, document.to_pretty_json()?)?;
    println!(
        "Wrote {} paths of the attendance bot API to {}",
        document.paths.paths.len(),
        output.display()
    );
    Ok(())
}
