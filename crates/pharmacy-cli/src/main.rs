mod args;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;

use args::{Cli, Commands};
use pharmacy_core::export::csv_template;
use pharmacy_core::models::StockStatus;
use pharmacy_core::{
    AttributeFilter, Catalog, CatalogError, CsvParseResult, Medicine, MedicinePatch, NewMedicine,
    PharmacyConfig, UploadedFile,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = PharmacyConfig::load(cli.config.as_deref())?;
    tracing::debug!("Using cache at {}", config.cache_path.display());
    let catalog = Catalog::from_config(config).context("could not open catalog")?;

    run(cli.command, &catalog).await
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, catalog: &Catalog) -> Result<()> {
    match command {
        Commands::List { search, by, json } => {
            let medicines = match search {
                Some(query) => catalog.search(&query, by.into()).await,
                None => catalog.list().await,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&medicines)?);
            } else {
                print_medicines(&medicines);
            }
        }
        Commands::Related { formula } => {
            print_medicines(&catalog.related(&formula).await);
        }
        Commands::Alternatives {
            id,
            any_formula,
            dosage,
            formulation,
        } => {
            let filter = AttributeFilter {
                formula: !any_formula,
                dosage,
                formulation,
            };
            print_medicines(&catalog.alternatives(&id, filter).await?);
        }
        Commands::Add {
            name,
            formula,
            dosage,
            formulation,
            stock,
        } => {
            let fields = NewMedicine {
                name,
                formula,
                dosage,
                formulation,
                stock,
            };
            let added = admin(catalog.add(fields).await)?;
            println!("Added {} ({})", added.name, added.id);
        }
        Commands::Update {
            id,
            name,
            formula,
            dosage,
            formulation,
            stock,
        } => {
            let patch = MedicinePatch {
                name,
                formula,
                dosage,
                formulation,
                stock,
            };
            if patch.is_empty() {
                bail!("nothing to update: pass at least one field");
            }
            let updated = admin(catalog.update(&id, patch).await)?;
            println!("Updated {} ({})", updated.name, updated.id);
        }
        Commands::Delete { id } => {
            admin(catalog.delete(&id).await)?;
            println!("Deleted {}", id);
        }
        Commands::BulkAdd { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("could not read {}", file.display()))?;
            let rows: Vec<NewMedicine> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of medicines", file.display()))?;
            let outcome = admin(catalog.bulk_add(rows).await)?;
            println!(
                "Added {} medicine(s), {} failed",
                outcome.added.len(),
                outcome.failed.len()
            );
        }
        Commands::Import {
            file,
            keep_duplicates,
            dry_run,
        } => import(catalog, &file, keep_duplicates, dry_run).await?,
        Commands::Export { output } => {
            let export = catalog.export_csv().await?;
            let path = output.unwrap_or_else(|| export.file_name.clone().into());
            std::fs::write(&path, &export.content)
                .with_context(|| format!("could not write {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Commands::Template { output } => {
            let template = csv_template()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &template)
                        .with_context(|| format!("could not write {}", path.display()))?;
                    println!("Template written to {}", path.display());
                }
                None => println!("{}", template),
            }
        }
        Commands::Seed => {
            admin(catalog.seed_defaults().await)?;
            println!("Catalog seeded (skipped if the store already had data)");
        }
        Commands::Sync { watch } => sync(catalog, watch).await?,
        Commands::Login { password } => {
            if !catalog.login(&password) {
                bail!("invalid password");
            }
            println!("Logged in as admin");
        }
        Commands::Logout => {
            catalog.logout();
            println!("Logged out");
        }
        Commands::Status => {
            match catalog.session().expires_at() {
                Some(expires) => println!("Admin session active until {}", expires.to_rfc3339()),
                None => println!("Not logged in"),
            }
            match catalog.sync().last_synced_at() {
                Some(at) => {
                    let age = chrono::Utc::now() - at;
                    println!(
                        "Cache holds {} medicine(s), synced {}s ago{}",
                        catalog.sync().cached().len(),
                        age.num_seconds(),
                        if catalog.should_sync() { " (stale)" } else { "" }
                    );
                }
                None => println!("Cache is empty"),
            }
        }
    }
    Ok(())
}

/// Turn a missing admin session into a hint.
fn admin<T>(result: Result<T, CatalogError>) -> Result<T> {
    match result {
        Err(CatalogError::Unauthorized) => bail!("admin login required: run `pharmacy login` first"),
        other => Ok(other?),
    }
}

async fn import(catalog: &Catalog, file: &Path, keep_duplicates: bool, dry_run: bool) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("could not read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let files = [UploadedFile::from_path_bytes(name, bytes)];

    if dry_run {
        let preview = catalog.preview_upload(&files).await;
        print_preview(&preview);
        return Ok(());
    }

    let report = admin(catalog.import_upload(&files, !keep_duplicates).await)?;
    for error in &report.row_errors {
        eprintln!("  row {}: {}", error.row, error.message);
    }
    println!("{}", report.summary());
    Ok(())
}

async fn sync(catalog: &Catalog, watch: bool) -> Result<()> {
    let resolved = catalog.refresh().await;
    println!(
        "{} medicine(s) from {:?}",
        resolved.medicines.len(),
        resolved.source
    );
    if !watch {
        return Ok(());
    }

    let background = catalog.start_background_sync();
    let mut updates = background.subscribe();
    println!("Watching for changes, Ctrl-C to stop");
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = updates.borrow_and_update().len();
                println!("Refreshed: {} medicine(s)", count);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    background.stop();
    Ok(())
}

fn print_medicines(medicines: &[Medicine]) {
    if medicines.is_empty() {
        println!("No medicines found");
        return;
    }
    println!(
        "{:<38} {:<24} {:<22} {:<14} {:<12} {:>6}",
        "ID", "NAME", "FORMULA", "DOSAGE", "FORM", "STOCK"
    );
    for m in medicines {
        let flag = match m.stock_status() {
            StockStatus::OutOfStock => " out",
            StockStatus::Low => " low",
            StockStatus::InStock => "",
        };
        println!(
            "{:<38} {:<24} {:<22} {:<14} {:<12} {:>6}{}",
            m.id, m.name, m.formula, m.dosage, m.formulation, m.stock, flag
        );
    }
}

fn print_preview(preview: &CsvParseResult) {
    println!(
        "{} row(s): {} valid, {} error(s), {} duplicate(s)",
        preview.total_rows,
        preview.valid_records.len(),
        preview.errors.len(),
        preview.duplicates.len()
    );
    for error in &preview.errors {
        match &error.field {
            Some(field) => println!("  row {} [{}]: {}", error.row, field, error.message),
            None => println!("  row {}: {}", error.row, error.message),
        }
    }
    for dup in &preview.duplicates {
        println!("  row {}: {} already exists ({})", dup.row, dup.name, dup.existing_id);
    }
}
