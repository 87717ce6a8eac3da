/// Catalog maintenance and query tool
///
/// Usage:
/// ```bash
/// cargo run --bin catalog-cli -- <COMMAND> [OPTIONS]
/// ```
///
/// Commands:
/// - `derive-schemas`: Derive every record schema and print its columns
/// - `migrate`: Create the catalog tables on PostgreSQL
/// - `search <q>`: Free-text search over channels, playlists and videos
/// - `search-videos <q>`: Free-text video search
/// - `popular <region> [category]`: Newest videos not blocked in a region
///
/// Options:
/// - `--max <N>`: Page size (clamped by `CATALOG_MAX_PAGE_SIZE`)
/// - `--page <token>`: Token returned by the previous page
use anyhow::{bail, Context, Result};
use catalog_service::{
    catalog_registry, run_migrations, telemetry, BackendKind, CatalogConfig, CatalogService,
    CatalogStore, PageParams,
};
use catalog_store::{create_pool, PgBackend, SearchFilter};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
enum Command {
    DeriveSchemas,
    Migrate,
    Search { q: String },
    SearchVideos { q: String },
    Popular { region: String, category: Option<String> },
}

#[derive(Debug)]
struct Args {
    command: Command,
    page: PageParams,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = CatalogConfig::from_env().context("Failed to load configuration")?;
    telemetry::init_tracing(config.catalog_log_json);

    let args = parse_args()?;
    info!("Running catalog-cli with {:?}", args.command);

    let result = match args.command {
        Command::DeriveSchemas => return derive_schemas(),
        Command::Migrate => {
            let pool = create_pool(&config.database()?)
                .await
                .context("Failed to create database pool")?;
            run_migrations(&pool).await.context("Migration failed")?;
            info!("Catalog tables are up to date");
            return Ok(());
        }
        Command::Search { q } => {
            let filter = SearchFilter {
                q: Some(q),
                ..Default::default()
            };
            let page = connect(&config)
                .await?
                .search(&filter, &[], &args.page)
                .await?;
            serde_json::to_value(page)?
        }
        Command::SearchVideos { q } => {
            let filter = SearchFilter {
                q: Some(q),
                ..Default::default()
            };
            let page = connect(&config)
                .await?
                .search_videos(&filter, &[], &args.page)
                .await?;
            serde_json::to_value(page)?
        }
        Command::Popular { region, category } => {
            let page = connect(&config)
                .await?
                .get_popular_videos(&region, category.as_deref(), &[], &args.page)
                .await?;
            serde_json::to_value(page)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn connect(config: &CatalogConfig) -> Result<CatalogService<PgBackend>> {
    if config.catalog_backend != BackendKind::Postgres {
        bail!("catalog-cli only connects to the postgres backend");
    }
    let pool = create_pool(&config.database()?)
        .await
        .context("Failed to create database pool")?;
    let store = CatalogStore::new(Arc::new(PgBackend::new(pool)), config.store.clone())?;
    Ok(CatalogService::new(store).with_default_region(config.catalog_default_region.clone()))
}

fn derive_schemas() -> Result<()> {
    let registry = catalog_registry().context("Record schema is misdeclared")?;
    let mut schemas: Vec<_> = registry.schemas().collect();
    schemas.sort_by_key(|schema| schema.table().to_string());

    for schema in schemas {
        println!("{}", schema.table());
        for column in schema.columns() {
            println!(
                "  {:<24} {:<10}{}",
                column.name,
                column.kind.as_str(),
                if column.key { " key" } else { "" }
            );
        }
    }
    Ok(())
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut positional = Vec::new();
    let mut page = PageParams::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--max" => {
                if i + 1 >= args.len() {
                    bail!("--max requires a value");
                }
                page.max = Some(args[i + 1].parse().context("Invalid page size")?);
                i += 2;
            }
            "--page" => {
                if i + 1 >= args.len() {
                    bail!("--page requires a token");
                }
                page.next_page_token = args[i + 1].clone();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let command = match positional.as_slice() {
        [cmd] if cmd == "derive-schemas" => Command::DeriveSchemas,
        [cmd] if cmd == "migrate" => Command::Migrate,
        [cmd, q] if cmd == "search" => Command::Search { q: q.clone() },
        [cmd, q] if cmd == "search-videos" => Command::SearchVideos { q: q.clone() },
        [cmd, region] if cmd == "popular" => Command::Popular {
            region: region.clone(),
            category: None,
        },
        [cmd, region, category] if cmd == "popular" => Command::Popular {
            region: region.clone(),
            category: Some(category.clone()),
        },
        _ => {
            print_help();
            bail!("Unknown command: {}", positional.join(" "));
        }
    };

    Ok(Args { command, page })
}

fn print_help() {
    println!(
        r#"catalog-cli

USAGE:
    catalog-cli derive-schemas
    catalog-cli migrate
    catalog-cli search <q> [--max <N>] [--page <token>]
    catalog-cli search-videos <q> [--max <N>] [--page <token>]
    catalog-cli popular <region> [category] [--max <N>] [--page <token>]

ENVIRONMENT:
    DATABASE_URL             PostgreSQL connection string
    CATALOG_BACKEND          postgres | cassandra (default: postgres)
    CATALOG_MAX_PAGE_SIZE    Upper bound on --max (default: 50)
"#
    );
}
