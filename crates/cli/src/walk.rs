use jdkstore::StoreRegistry;
use jdkstore::live::{ImageVisitor, NotifyMask, WalkControl};
use std::path::Path;

/// Prints one line per visited node, indented by depth.
struct Printer {
    count: usize,
}

impl ImageVisitor for Printer {
    fn visit_module(&mut self, module: &str) -> jdkstore::Result<WalkControl> {
        self.count += 1;
        println!("{}", module);
        Ok(WalkControl::Continue)
    }

    fn visit_package(&mut self, _module: &str, package: &str) -> jdkstore::Result<WalkControl> {
        self.count += 1;
        println!("  {}", package);
        Ok(WalkControl::Continue)
    }

    fn visit_file(
        &mut self,
        _module: &str,
        package: &str,
        file: &str,
    ) -> jdkstore::Result<WalkControl> {
        self.count += 1;
        println!("    {}/{}", package, file);
        Ok(WalkControl::Continue)
    }
}

pub fn run(
    registry: &StoreRegistry,
    home: &Path,
    packages: bool,
    files: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mask = NotifyMask::MODULES;
    if packages {
        mask = mask | NotifyMask::PACKAGES;
    }
    if files {
        mask = mask | NotifyMask::FILES;
    }

    let mut printer = Printer { count: 0 };
    registry.walk_live(home, &mut printer, mask)?;
    eprintln!("{} entries", printer.count);
    Ok(())
}
