use jdkstore::StoreRegistry;
use std::path::Path;

pub fn run(registry: &StoreRegistry, home: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let identity = registry.identity(home)?;
    println!("{}", serde_json::to_string_pretty(&*identity)?);
    Ok(())
}
