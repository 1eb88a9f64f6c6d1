mod identity;
mod modules;
mod resolve;
mod roots;
mod walk;

use clap::{Parser, Subcommand};
use jdkstore::discover::find_java_home;
use jdkstore::{InterruptPolicy, StoreConfig, StoreRegistry};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "jdkstore",
    version,
    about = "Resolve class file bytes from a JDK's runtime image or ct.sym archive",
    long_about = "jdkstore answers which bytes a compiler targeting a given --release would see \
                  for a class, reading the JDK's live module image or its historical ct.sym \
                  signature archive."
)]
pub struct Cli {
    /// JDK home to read. Defaults to JAVA_HOME or a discovered installation.
    #[arg(long, global = true, value_name = "JDK_HOME")]
    pub jdk: Option<PathBuf>,

    /// JSON configuration file; flags below override it
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bypass the path and byte caches
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Fail on interrupted reads instead of reporting the class as absent
    #[arg(long, global = true)]
    pub propagate_interrupts: bool,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a class or signature file and report where it was found
    Resolve {
        /// Slash separated file name, e.g. java/util/List.class
        #[arg(value_name = "NAME")]
        name: String,
        /// Target release, e.g. 8 or 11. Defaults to the JDK's own release.
        #[arg(long)]
        release: Option<String>,
        /// Module to look in
        #[arg(long)]
        module: Option<String>,
        /// Write the raw bytes to this file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List the live image's modules, or the modules owning a class's package
    Modules {
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },
    /// Show the ct.sym directories serving a release
    Roots {
        #[arg(value_name = "RELEASE")]
        release: String,
    },
    /// Show the JDK's version and release
    Identity,
    /// Walk the live image
    Walk {
        /// Only visit these modules (comma separated)
        #[arg(long, value_delimiter = ',')]
        modules: Vec<String>,
        /// Report packages
        #[arg(long)]
        packages: bool,
        /// Report files
        #[arg(long)]
        files: bool,
    },
}

impl Cli {
    fn config(&self) -> jdkstore::Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::from_json_file(path)?,
            None => StoreConfig::from_env(),
        };
        if self.no_cache {
            config.cache_enabled = false;
        }
        if self.propagate_interrupts {
            config.interrupt_policy = InterruptPolicy::Propagate;
        }
        if let Commands::Walk { modules, .. } = &self.command {
            if !modules.is_empty() {
                config.module_allowlist = Some(modules.iter().cloned().collect());
            }
        }
        Ok(config)
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = jdkstore::logging::init_logging("cli", cli.verbose);

    let home = match cli.jdk.clone().or_else(find_java_home) {
        Some(home) => home,
        None => return Err("no JDK found; pass --jdk or set JAVA_HOME".into()),
    };
    debug!("Using JDK at {}", home.display());

    let registry = StoreRegistry::new(cli.config()?);

    match cli.command {
        Commands::Resolve {
            name,
            release,
            module,
            output,
        } => resolve::run(
            &registry,
            &home,
            &name,
            release.as_deref(),
            module.as_deref(),
            output,
        ),
        Commands::Modules { name } => modules::run(&registry, &home, name.as_deref()),
        Commands::Roots { release } => roots::run(&registry, &home, &release),
        Commands::Identity => identity::run(&registry, &home),
        Commands::Walk {
            packages, files, ..
        } => walk::run(&registry, &home, packages, files),
    }
}
