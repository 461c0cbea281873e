use anyhow::Context;
use blueprintflow::{logging, settings, StoreManager, UserPaths};

fn main() -> anyhow::Result<()> {
    let paths = UserPaths::from_system()?;
    paths.ensure_dirs()?;
    logging::init_tracing(Some(&paths.log_file()))?;

    println!("BlueprintFlow knowledge store v{}", blueprintflow::version());
    println!("==========================================");
    println!("Config: {}", paths.config_dir().display());
    println!("Data:   {}", paths.data_dir().display());
    println!();

    let loaded = settings::load_user_settings(&paths)
        .with_context(|| format!("loading {}", paths.settings_file().display()))?;
    let settings = blueprintflow::Settings::init_global(loaded);

    let manager = StoreManager::open(&paths, settings).context("opening the knowledge store")?;

    println!("Vector tables:");
    for name in manager.vector().table_names()? {
        println!("  {}", name);
    }
    if let Some(graph) = manager.graph() {
        println!("Graph tables:");
        for name in graph.table_names()? {
            println!("  {}", name);
        }
    }
    Ok(())
}
