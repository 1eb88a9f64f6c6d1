use jdkstore::StoreRegistry;
use std::path::Path;

pub fn run(
    registry: &StoreRegistry,
    home: &Path,
    name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let modules = match name {
        Some(name) => registry.modules_of(home, name)?.modules().to_vec(),
        None => registry.live_store(home)?.modules().to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&modules)?);
    Ok(())
}
