use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use vitrina::api::client::CatalogClient;
use vitrina::filters::query;
use vitrina::filters::state::{BrandSelectionMode, FilterState, SortKey};
use vitrina::pagination::pages::{visible_pages, PageItem};
use vitrina::session::CatalogSession;
use vitrina::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "vitrina", version, about = "Storefront catalog CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Fetch one catalog page for a nomenclature and print the grid
    Browse {
        /// Nomenclature (subcategory) id
        nomenclature: String,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Brand ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        brand: Vec<String>,
        /// Category ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        category: Vec<String>,
        #[arg(long)]
        min_price: Option<i64>,
        #[arg(long)]
        max_price: Option<i64>,
        /// Sort key: default, price-asc, price-desc, newest
        #[arg(long, default_value = "default")]
        sort: String,
        /// Use the alternate rost feed
        #[arg(long, default_value_t = false)]
        rost: bool,
    },
    /// List all brands
    Brands,
    /// Per-brand product counts for a nomenclature
    BrandCounts { nomenclature: String },
    /// Show one product by id
    Product { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    vitrina::tracing::init_tracing("info")?;

    let cli = Cli::parse();
    let client = CatalogClient::from_env().context("building catalog client")?;

    match cli.command {
        Commands::Browse {
            nomenclature,
            page,
            brand,
            category,
            min_price,
            max_price,
            sort,
            rost,
        } => {
            let state = FilterState {
                brands: brand,
                categories: category,
                min_price,
                max_price,
                sort: SortKey::parse(&sort)
                    .ok_or_else(|| anyhow::anyhow!("unknown sort key: {sort}"))?,
                in_stock_only: false,
                page,
                rost,
            };
            browse(client, &nomenclature, state).await?;
        }
        Commands::Brands => {
            let brands = client.brands().await.context("fetching brands")?;
            if brands.is_empty() {
                println!("no brands found");
            }
            for brand in brands {
                println!("{:<12} {}", brand.id, brand.name);
            }
        }
        Commands::BrandCounts { nomenclature } => {
            let counts = client
                .brand_counts(&nomenclature)
                .await
                .context("fetching brand counts")?;
            println!(
                "{} products across {} brands",
                counts.total_products, counts.total_brands
            );
            let mut entries: Vec<_> = counts.brand_counts.into_iter().collect();
            entries.sort_by(|a, b| b.1.cmp(&a.1));
            for (brand_id, count) in entries {
                println!("{:<12} {}", brand_id, count);
            }
        }
        Commands::Product { id } => match client.product(&id).await? {
            Some(product) => {
                println!("{} [{}]", product.name, product.code);
                println!("brand: {}", product.brand());
                match product.pret_redus {
                    Some(redus) => println!("price: {} (was {})", redus, product.pret),
                    None => println!("price: {}", product.pret),
                }
                println!("in stock: {} ({})", product.in_stock, product.stock_quantity);
                let rail = client
                    .related_products(&product.subcategorie.id, 4)
                    .await;
                println!("related:");
                for related in rail {
                    println!("  {} — {}", related.name, related.effective_price());
                }
            }
            None => println!("product {id} not found"),
        },
    }
    Ok(())
}

async fn browse(client: CatalogClient, nomenclature: &str, state: FilterState) -> Result<()> {
    // The brand rail loads independently of the product grid.
    let facet_client = client.clone();
    let facet_nomenclature = nomenclature.to_string();
    let counts = tokio::spawn(async move { facet_client.brand_counts(&facet_nomenclature).await });

    let mut session = CatalogSession::new(client, nomenclature, BrandSelectionMode::Single);
    let query_string = query::encode(&state, None);
    info!(query = %query_string, "browsing");
    session.navigate(&query_string).await;

    let controller = session.controller();
    let grid = controller.visible();
    if grid.is_empty() {
        println!("no products found");
    }
    for product in &grid {
        let image = controller.images().valid_image_for(product);
        let price = match product.pret_redus {
            Some(redus) => format!("{redus} (was {})", product.pret),
            None => product.pret.to_string(),
        };
        println!("{:<10} {:<40} {:>14}  {}", product.id, product.name, price, image);
    }

    let strip: Vec<String> = visible_pages(controller.total_pages(), controller.display_page())
        .into_iter()
        .map(|item| match item {
            PageItem::Page(p) if p == controller.display_page() => format!("[{p}]"),
            PageItem::Page(p) => p.to_string(),
            PageItem::Ellipsis => "…".to_string(),
        })
        .collect();
    println!(
        "page {} of {} ({} products)   {}",
        controller.display_page(),
        controller.total_pages(),
        controller.total(),
        strip.join(" ")
    );

    if let Ok(Ok(counts)) = counts.await {
        println!(
            "brands: {} with stock across {} products",
            counts.total_brands, counts.total_products
        );
    }
    Ok(())
}
