use jdkstore::{ResolvedLocation, StoreRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct Resolution<'a> {
    name: &'a str,
    release: Option<&'a str>,
    module: Option<&'a str>,
    location: Option<ResolvedLocation>,
    size: Option<usize>,
}

pub fn run(
    registry: &StoreRegistry,
    home: &Path,
    name: &str,
    release: Option<&str>,
    module: Option<&str>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = registry.resolve_bytes(home, release, name, module)?;

    if let (Some(bytes), Some(output)) = (&bytes, &output) {
        std::fs::write(output, &bytes.bytes)?;
        info!("Wrote {} bytes to {}", bytes.bytes.len(), output.display());
    }

    let resolution = Resolution {
        name,
        release,
        module,
        size: bytes.as_ref().map(|b| b.bytes.len()),
        location: bytes.map(|b| b.location),
    };
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}
