//! Drift Site - Main Entry Point
//!
//! Drives the content engine headlessly over a fragment store and prints
//! where a sequence of navigation steps ends up.

mod step;

use anyhow::{Context, Result};
use clap::Parser;
use drift_content::{LifecycleManager, LoaderConfig, NavigationOutcome};
use drift_dom::{MemorySurface, Surface};
use drift_net::{DirectoryStore, FragmentPaths, FragmentStore, HttpFragmentStore, ResourceCache};
use drift_script::{ModuleRegistry, ScriptSandbox, VariableRegistry};
use std::path::PathBuf;
use std::rc::Rc;
use step::Step;
use tracing_subscriber::EnvFilter;

/// Page shell used when none is given
const DEFAULT_SHELL: &str = r#"
<nav class="navbar">
  <a id="navbar__logo">home</a>
  <input class="search-input" type="text" placeholder="search">
</nav>
"#;

#[derive(Parser, Debug)]
#[command(name = "drift-site")]
#[command(about = "Walk a content site through the Drift engine")]
struct Args {
    /// Fetch fragments over HTTP from this base URL
    #[arg(long, conflicts_with = "root")]
    base_url: Option<String>,

    /// Read fragments from a local site directory
    #[arg(long)]
    root: Option<PathBuf>,

    /// Loader configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Shell markup file; a minimal navbar by default
    #[arg(long)]
    shell: Option<PathBuf>,

    /// Steps to run after start: <page>, back, forward, search:<name>, crumb:<n>
    steps: Vec<Step>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!("Starting Drift site driver...");

    let executor = smol::LocalExecutor::new();
    smol::block_on(executor.run(run(args)))
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.store.base_url = base_url.clone();
    }
    config.validate().context("validating config")?;

    let store: Rc<dyn FragmentStore> = match &args.root {
        Some(root) => Rc::new(DirectoryStore::new(root)),
        None => Rc::new(HttpFragmentStore::new(config.retry_policy()).context("building HTTP client")?),
    };
    let paths = FragmentPaths::new(&config.store.base_url)
        .context("parsing store base URL")?
        .with_dirs(&config.store.content_dir, &config.store.script_dir);
    let cache = Rc::new(ResourceCache::new(store, paths));

    let vars = Rc::new(VariableRegistry::new());
    let sandbox = ScriptSandbox::new(ModuleRegistry::with_builtins(), vars.clone());
    #[cfg(feature = "quickjs")]
    let sandbox = sandbox.with_engine(Box::new(
        drift_script::QuickJsEngine::new(vars.clone()).context("starting QuickJS")?,
    ));

    let shell = match &args.shell {
        Some(path) => smol::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading shell {}", path.display()))?,
        None => DEFAULT_SHELL.to_string(),
    };

    let manager = LifecycleManager::new(config, MemorySurface::with_shell(&shell), cache, sandbox);
    report_outcome("start", &manager.start().await);

    for step in &args.steps {
        let outcome = match step {
            Step::Open(id) => manager.navigate(id, true).await,
            Step::Back => manager.back().await,
            Step::Forward => manager.forward().await,
            Step::Search(query) => manager.search(query).await,
            Step::Crumb(index) => manager.activate_crumb(*index).await,
        };
        report_outcome(&step.to_string(), &outcome);
    }

    print_state(&manager, &vars);
    manager.shutdown();
    Ok(())
}

fn report_outcome(step: &str, outcome: &NavigationOutcome) {
    match outcome {
        NavigationOutcome::Completed(id) => println!("{step:>12}  -> {id}"),
        NavigationOutcome::Unchanged => println!("{step:>12}  (unchanged)"),
        NavigationOutcome::Superseded => println!("{step:>12}  (superseded)"),
        NavigationOutcome::Failed { target, error } => println!("{step:>12}  !! {target}: {error}"),
        NavigationOutcome::Rejected(reason) => println!("{step:>12}  rejected: {reason}"),
    }
}

fn print_state(manager: &LifecycleManager<MemorySurface>, vars: &VariableRegistry) {
    let current = manager
        .current()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "(none)".into());
    let crumbs: Vec<String> = manager.breadcrumbs().stack().iter().map(|id| id.to_string()).collect();
    let history = manager.history();
    let history_states: Vec<&str> = history.entries().iter().map(|e| e.state.as_str()).collect();

    println!();
    println!("current:     {current}");
    println!("phase:       {}", manager.phase());
    println!("breadcrumbs: {}", crumbs.join(" > "));
    println!("history:     [{}] at {}", history_states.join(", "), history.index());

    let surface = manager.surface();
    println!("styles:      {}", surface.style_ids().join(", "));
    println!(
        "background:  {}",
        surface.background_color().unwrap_or_else(|| "(unset)".into())
    );
    println!("layers:      {}", surface.layers().join(", "));

    let stats = manager.cache().stats();
    println!(
        "cache:       {} hits, {} misses, {} failures",
        stats.hits, stats.misses, stats.failures
    );
    if !vars.is_empty() {
        for key in vars.keys() {
            if let Some(value) = vars.read(&key) {
                println!("var:         {key} = {value}");
            }
        }
    }
    println!();
    println!("{}", surface.content_html());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_steps() {
        let args = Args::try_parse_from(["drift-site", "--root", "site", "projects", "back", "crumb:0"]).unwrap();
        assert_eq!(args.root, Some(PathBuf::from("site")));
        assert_eq!(args.steps.len(), 3);
        assert_eq!(args.steps[1], Step::Back);
    }

    #[test]
    fn test_args_reject_both_stores() {
        assert!(Args::try_parse_from(["drift-site", "--root", "site", "--base-url", "http://x/"]).is_err());
    }
}
