use jdkstore::StoreRegistry;
use std::path::Path;

pub fn run(
    registry: &StoreRegistry,
    home: &Path,
    release: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match registry.release_roots(home, release)? {
        Some(roots) => {
            println!("{}", serde_json::to_string_pretty(&*roots)?);
            if roots.defers_to_live() {
                println!("Release {} is served by the live image", release);
            }
        }
        None => println!("{} has no ct.sym archive", home.display()),
    }
    Ok(())
}
