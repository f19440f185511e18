use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use storefront::catalog::{CatalogClient, Product, ProductsParams};
use storefront::config::StorefrontConfig;
use storefront::error::{format_for_log, ErrorKind, ErrorLog, NormalizedError};
use storefront::hooks::ErrorCapture;
use storefront::logging::{init_logging, LoggingConfig};
use storefront::notification::{NotificationRenderer, TerminalNotifier};

/// Exit code for configuration problems.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(version)]
#[command(about = "Browse the dummyjson product catalog with automatic retry")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable colors (also respects NO_COLOR environment variable)
    #[arg(long, global = true)]
    no_color: bool,

    /// Suppress retry notifications and logs except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List products, optionally within a category
    Products {
        /// Category slug
        #[arg(long)]
        category: Option<String>,

        /// Page size
        #[arg(long, default_value = "10")]
        limit: u32,

        /// Number of products to skip
        #[arg(long, default_value = "0")]
        skip: u32,
    },

    /// List product categories
    Categories,

    /// Search products by text
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Show one product
    Product { id: u64 },

    /// Fetch categories and the first page of products concurrently
    Overview,
}

#[derive(Serialize)]
struct Overview {
    categories: Vec<String>,
    products: Vec<Product>,
    total: u64,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let use_color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    if let Err(e) = init_logging(LoggingConfig::from_flags(cli.verbose, cli.quiet).with_ansi(use_color)) {
        eprintln!("warning: logging already initialised: {}", e);
    }
    let renderer = NotificationRenderer::new().with_color(use_color);

    let config = match StorefrontConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", renderer.render_error(&e.to_string(), Some("Configuration error")));
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    let error_log = Arc::new(ErrorLog::new(config.log.capacity));
    let mut catalog = match CatalogClient::from_config(&config, Some(error_log.clone())) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{}", renderer.render_error(&e.to_string(), Some("Configuration error")));
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    let notifier = Arc::new(TerminalNotifier::new(renderer.clone()));
    if !cli.quiet {
        catalog = catalog.with_notifier(notifier.clone());
    }

    let errors = ErrorCapture::with_notifier(notifier);
    let output = errors
        .run_guarded(|| run_command(&cli.command, &catalog, &renderer, cli.json))
        .await;

    match output {
        Some(text) => {
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            if cli.verbose > 0 {
                for entry in error_log.entries() {
                    eprintln!("{}", format_for_log(&entry.error));
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_command(
    command: &Commands,
    catalog: &CatalogClient,
    renderer: &NotificationRenderer,
    json: bool,
) -> Result<String, NormalizedError> {
    match command {
        Commands::Products {
            category,
            limit,
            skip,
        } => {
            let mut params = ProductsParams::new(*limit, *skip);
            if let Some(category) = category {
                params = params.with_category(category.as_str());
            }
            let page = catalog.fetch_products(&params).await?;
            if json {
                return to_json(&page);
            }

            let mut lines: Vec<String> = page.products.iter().map(product_line).collect();
            lines.push(page_summary(renderer, page.skip, page.products.len(), page.total));
            Ok(lines.join("\n"))
        }
        Commands::Categories => {
            let categories = catalog.fetch_categories().await?;
            if json {
                return to_json(&categories);
            }
            Ok(categories.join("\n"))
        }
        Commands::Search { query, limit } => {
            let products = catalog.search_products(query, *limit).await?;
            if json {
                return to_json(&products);
            }
            if products.is_empty() {
                return Ok(renderer.render_warning(&format!("No products match '{}'", query)));
            }
            Ok(products.iter().map(product_line).collect::<Vec<_>>().join("\n"))
        }
        Commands::Product { id } => {
            let product = catalog.fetch_product(*id).await?;
            if json {
                return to_json(&product);
            }
            Ok(product_details(&product))
        }
        Commands::Overview => {
            let params = ProductsParams::default();
            let (categories, page) = futures::join!(
                catalog.fetch_categories(),
                catalog.fetch_products(&params)
            );
            let categories = categories?;
            let page = page?;
            let overview = Overview {
                categories,
                total: page.total,
                products: page.products,
            };
            if json {
                return to_json(&overview);
            }

            let mut lines = vec![format!(
                "{} categories: {}",
                overview.categories.len(),
                overview.categories.join(", ")
            )];
            lines.extend(overview.products.iter().map(product_line));
            lines.push(page_summary(
                renderer,
                0,
                overview.products.len(),
                overview.total,
            ));
            Ok(lines.join("\n"))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, NormalizedError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| NormalizedError::new(ErrorKind::Unknown, e.to_string()))
}

fn product_line(product: &Product) -> String {
    format!(
        "#{:<4} {:<40} ${:>9.2}",
        product.id,
        product.title,
        product.discounted_price()
    )
}

fn page_summary(renderer: &NotificationRenderer, skip: u64, shown: usize, total: u64) -> String {
    if shown == 0 {
        return renderer.render_warning(&format!("No products (total {})", total));
    }
    renderer.render_success(&format!(
        "Showing {}-{} of {}",
        skip + 1,
        skip + shown as u64,
        total
    ))
}

fn product_details(product: &Product) -> String {
    let mut lines = vec![
        format!("#{} {}", product.id, product.title),
        format!(
            "Price: ${:.2} ({:.1}% off ${:.2})",
            product.discounted_price(),
            product.discount_percentage,
            product.price
        ),
        format!("Rating: {:.2}", product.rating),
        format!(
            "Stock: {}",
            if product.in_stock() {
                product.stock.to_string()
            } else {
                "out of stock".to_string()
            }
        ),
    ];
    if !product.brand.is_empty() {
        lines.push(format!("Brand: {}", product.brand));
    }
    if !product.category.is_empty() {
        lines.push(format!("Category: {}", product.category));
    }
    if let Some(status) = &product.availability_status {
        lines.push(format!("Availability: {}", status));
    }
    if !product.description.is_empty() {
        lines.push(String::new());
        lines.push(product.description.clone());
    }
    lines.join("\n")
}
