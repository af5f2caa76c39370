use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use lspotato::bundle::cache::ArchiveCache;
use lspotato::bundle::catalog::{LATEST, VersionCatalog};
use lspotato::bundle::fetcher::{Fetcher, HttpFetcher};
use lspotato::bundle::manager::BundleManager;
use lspotato::bundle::update::UpdateChecker;
use lspotato::config::{self, Config, LSCHERRY_OWNER};
use lspotato::link::host::{HeadlessHost, LinkHost};
use lspotato::link::registry::LinkRegistry;
use lspotato::link::store::{LinkStore, SqliteLinkStore};
use lspotato::link::types::RepairReport;
use lspotato::registry::credentials::CredentialTable;
use lspotato::registry::install::RegistryInstaller;
use lspotato::registry::resolver::RegistryResolver;
use lspotato::registry::{METADATA_DIR, REGISTRY_DIR};

/// Directory under the document holding the link table
const STATE_DIR: &str = ".lspotato";

#[derive(Parser)]
#[command(name = "lspotato")]
#[command(version, about = "Download, cache and link LSCherry and LSRegistry bundles")]
struct Cli {
    /// Directory of the document the links belong to
    #[arg(short, long, default_value = ".")]
    document_dir: PathBuf,

    /// Configuration file (defaults to <data_dir>/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also print debug logs to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List known LSCherry versions, newest first
    Versions,
    /// List downloaded LSCherry versions
    Cached,
    /// Download a version and link it into the document
    Get {
        #[arg(default_value = LATEST)]
        version: String,
    },
    /// Relocate the existing link to another version in place
    Remap { version: String },
    /// Show the links held by the document
    Status,
    /// Re-download and re-link broken LSCherry links
    Repair,
    /// Delete every downloaded LSCherry version
    Purge,
    /// Namespace registry packages
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
    /// Check whether a newer LSPotato release exists
    CheckUpdate,
}

#[derive(Subcommand)]
enum RegistryAction {
    /// Install namespace:version entries
    Get {
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// List installed registry packages
    List,
    /// Remove every link of a namespace
    Remove { namespace: String },
    /// Re-download and re-link broken registry links
    Repair,
}

/// Shared collaborators for one invocation
struct App {
    config: Config,
    document_dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn LinkStore>,
    host: Arc<dyn LinkHost>,
}

impl App {
    fn new(config: Config, document_dir: PathBuf) -> anyhow::Result<Self> {
        let state_dir = document_dir.join(STATE_DIR);
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("creating {}", state_dir.display()))?;

        let store = SqliteLinkStore::open(&state_dir.join("links.db"))?;
        let fetcher = HttpFetcher::new(&config.network)?;

        Ok(Self {
            config,
            document_dir,
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
            host: Arc::new(HeadlessHost),
        })
    }

    fn bundle_manager(&self) -> anyhow::Result<BundleManager> {
        let cache = ArchiveCache::new(self.config.cache_root(), self.fetcher.clone())?;
        let links = LinkRegistry::new(
            self.store.clone(),
            self.host.clone(),
            self.document_dir.clone(),
            LSCHERRY_OWNER,
        );
        Ok(BundleManager::new(VersionCatalog::builtin(), cache, links))
    }

    fn registry_installer(&self) -> anyhow::Result<RegistryInstaller> {
        let registry_dir = self.document_dir.join(REGISTRY_DIR);
        let resolver = RegistryResolver::new(
            self.fetcher.clone(),
            self.config.registry.clone(),
            CredentialTable::new(self.config.credentials.clone()),
            registry_dir.join(METADATA_DIR),
        );
        let cache =
            ArchiveCache::new(registry_dir, self.fetcher.clone())?.with_reserved(METADATA_DIR);
        Ok(RegistryInstaller::new(
            Arc::new(resolver),
            cache,
            self.store.clone(),
            self.host.clone(),
            self.document_dir.clone(),
        ))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = lspotato::logging::init(&config::log_path(), cli.verbose)?;

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, config))
        .inspect_err(|e| error!("{:#}", e))
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let document_dir = absolute(&cli.document_dir)?;
    let open = || {
        info!("Using document directory {:?}", document_dir);
        App::new(config.clone(), document_dir.clone())
    };

    match cli.command {
        Command::Versions => {
            let manager = open()?.bundle_manager()?;
            let cached: Vec<String> = manager
                .cached()?
                .into_iter()
                .map(|entry| entry.identifier)
                .collect();
            for version in manager.catalog().list() {
                let marker = if cached.contains(&version) { "*" } else { " " };
                println!("{marker} {version}");
            }
        }
        Command::Cached => {
            for entry in open()?.bundle_manager()?.cached()? {
                let extracted = entry
                    .extracted_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}",
                    entry.identifier,
                    extracted,
                    entry.local_path.display()
                );
            }
        }
        Command::Get { version } => {
            let outcome = open()?.bundle_manager()?.get(&version).await?;
            match outcome.previous {
                Some(previous) => println!(
                    "Changed LSCherry {} to {}",
                    previous, outcome.record.identifier
                ),
                None => println!("Linked LSCherry {}", outcome.record.identifier),
            }
        }
        Command::Remap { version } => {
            let record = open()?.bundle_manager()?.remap(&version).await?;
            println!("{} now links {}", record.anchor_name, record.backing_path);
        }
        Command::Status => {
            let statuses = open()?.bundle_manager()?.status()?;
            if statuses.is_empty() {
                println!("No LSCherry links");
            }
            for status in statuses {
                let state = if status.broken { "broken" } else { "ok" };
                println!(
                    "{}\t{}\t{}\t{}",
                    status.record.anchor_name,
                    status.record.identifier,
                    state,
                    status.record.backing_path
                );
            }
        }
        Command::Repair => print_repair(&open()?.bundle_manager()?.repair().await?),
        Command::Purge => {
            open()?.bundle_manager()?.purge()?;
            println!("Removed all downloaded LSCherry versions");
        }
        Command::Registry { action } => registry(&open()?, action).await?,
        Command::CheckUpdate => check_update(&config).await?,
    }

    Ok(())
}

async fn registry(app: &App, action: RegistryAction) -> anyhow::Result<()> {
    let installer = app.registry_installer()?;

    match action {
        RegistryAction::Get { entries } => {
            let report = installer.install_all(&entries.join("\n")).await?;
            for id in &report.installed {
                println!("installed\t{id}");
            }
            for issue in &report.skipped {
                println!("skipped\t{}\t{}", issue.entry, issue.reason);
            }
            for issue in &report.failed {
                println!("failed\t{}\t{}", issue.entry, issue.reason);
            }
            if !report.failed.is_empty() {
                anyhow::bail!("{} registry package(s) failed", report.failed.len());
            }
        }
        RegistryAction::List => {
            for id in installer.installed()? {
                println!("{id}");
            }
        }
        RegistryAction::Remove { namespace } => {
            let removed = installer.remove(&namespace)?;
            println!("Removed {removed} link(s) of {namespace}");
        }
        RegistryAction::Repair => print_repair(&installer.repair().await?),
    }

    Ok(())
}

async fn check_update(config: &Config) -> anyhow::Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(&config.network)?);
    let checker = UpdateChecker::new(fetcher, config.registry.github_api_url.clone());
    let status = checker.check(env!("CARGO_PKG_VERSION")).await?;

    if status.update_available() {
        println!(
            "Update available: {} (running {})",
            status.latest, status.current
        );
    } else {
        println!("No update available (latest {})", status.latest);
    }
    Ok(())
}

fn print_repair(report: &RepairReport) {
    println!("Repaired {} link(s)", report.repaired);
    for issue in &report.skipped {
        println!(
            "skipped\t{}\t{}\t{}",
            issue.anchor_name, issue.identifier, issue.reason
        );
    }
    for issue in &report.failed {
        println!(
            "failed\t{}\t{}\t{}",
            issue.anchor_name, issue.identifier, issue.reason
        );
    }
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("resolving {}", path.display()))
}
