//! Shahi Medicals CLI - Cart, catalog and checkout from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! shahi catalog list
//! shahi catalog list --category "Pain Relief"
//!
//! # Work with a customer's cart (persisted under SHAHI_SNAPSHOT_DIR)
//! shahi --user 2b7e1516 cart add 42
//! shahi --user 2b7e1516 cart set 42 3
//! shahi --user 2b7e1516 cart show
//!
//! # Place the order
//! shahi --user 2b7e1516 checkout --name "Ayesha Khan" --phone 0300-1234567 --address "12 Mall Road"
//!
//! # Staff only
//! shahi --user admin --admin order list
//! shahi --user admin --admin order status <order-id> shipped
//! shahi --user admin --admin catalog update 42 --price 27.50 --stock 80
//! ```
//!
//! # Environment Variables
//!
//! - `SHAHI_BACKEND_URL` - Base URL of the hosted backend
//! - `SHAHI_BACKEND_ANON_KEY` - Public API key
//! - `SHAHI_ACCESS_TOKEN` - Access token of the signed-in user (optional)
//! - `SHAHI_SNAPSHOT_DIR` - Cart snapshot directory (default `.shahi/carts`)
//! - `SENTRY_DSN` - Error tracking (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shahi_core::{ProductId, UserId};
use shahi_storefront::config::StorefrontConfig;
use shahi_storefront::error::{AppError, set_sentry_user};
use shahi_storefront::session::{AuthenticatedUser, SessionContext};
use shahi_storefront::state::AppState;

mod commands;

#[derive(Parser)]
#[command(name = "shahi")]
#[command(author, version, about = "Shahi Medicals storefront CLI")]
struct Cli {
    /// Act as this signed-in user (anonymous when omitted)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Treat the user as staff
    #[arg(long, global = true, requires = "user")]
    admin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse or manage the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Place an order for everything in the cart
    Checkout {
        /// Full name for delivery
        #[arg(long)]
        name: String,

        /// Contact phone number
        #[arg(long)]
        phone: String,

        /// Delivery address
        #[arg(long)]
        address: String,

        /// Email for the receipt
        #[arg(long)]
        email: Option<String>,
    },
    /// Manage orders (staff only)
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        product_id: String,
    },
    /// Remove a product entirely
    Remove {
        /// Product ID
        product_id: String,
    },
    /// Set a product's quantity (0 or less removes it)
    Set {
        /// Product ID
        product_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List active products
    List {
        /// Only show this category (exact name)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Add a product (staff only)
    Create {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Unit price, e.g. 25.99
        #[arg(short, long)]
        price: Decimal,

        /// Units in stock
        #[arg(short, long, default_value_t = 0)]
        stock: i32,

        /// Catalog category
        #[arg(short, long, default_value = "General")]
        category: String,

        /// Product description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Edit an active product; omitted fields keep their value (staff only)
    Update {
        /// Product ID
        product_id: String,

        /// Product name
        #[arg(short, long)]
        name: Option<String>,

        /// Unit price, e.g. 25.99
        #[arg(short, long)]
        price: Option<Decimal>,

        /// Units in stock
        #[arg(short, long)]
        stock: Option<i32>,

        /// Catalog category
        #[arg(short, long)]
        category: Option<String>,

        /// Product description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Hide a product from the storefront (staff only)
    Deactivate {
        /// Product ID
        product_id: String,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List every order, newest first
    List,
    /// Move an order to a new status
    Status {
        /// Order ID
        order_id: String,

        /// One of pending, processing, shipped, delivered, completed, cancelled
        status: String,
    },
    /// Delete an order and its items
    Delete {
        /// Order ID
        order_id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration first so Sentry can start before tracing
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shahi_storefront=info,shahi_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            tracing::error!("Command failed: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Resolve the session from the command-line flags.
fn session(cli: &Cli) -> SessionContext {
    let user = cli.user.as_deref().map(|id| AuthenticatedUser {
        id: UserId::new(id),
        email: None,
        is_admin: cli.admin,
    });
    if let Some(user) = &user {
        set_sentry_user(&user.id, None);
    }
    SessionContext::resolve(user)
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    let state = AppState::new(config)?;
    let session = session(&cli);

    match cli.command {
        Commands::Cart { action } => {
            let mut cart = state.cart_for(&session);
            match action {
                CartAction::Show => {}
                CartAction::Add { product_id } => {
                    commands::cart::add(&state, &mut cart, &ProductId::new(product_id)).await?;
                }
                CartAction::Remove { product_id } => {
                    commands::cart::remove(&mut cart, &ProductId::new(product_id))?;
                }
                CartAction::Set {
                    product_id,
                    quantity,
                } => {
                    commands::cart::set(&mut cart, &ProductId::new(product_id), quantity)?;
                }
                CartAction::Clear => commands::cart::clear(&mut cart),
            }
            cart.flush().await;
            commands::cart::show(&cart);
        }
        Commands::Catalog { action } => match action {
            CatalogAction::List { category } => {
                commands::catalog::list(&state, category.as_deref()).await?;
            }
            CatalogAction::Create {
                name,
                price,
                stock,
                category,
                description,
            } => {
                let product = shahi_storefront::services::NewProduct {
                    name,
                    description,
                    price,
                    image: String::new(),
                    category,
                    stock,
                };
                commands::catalog::create(&state, &session, &product).await?;
            }
            CatalogAction::Update {
                product_id,
                name,
                price,
                stock,
                category,
                description,
            } => {
                let changes = commands::catalog::ProductChanges {
                    name,
                    price,
                    stock,
                    category,
                    description,
                };
                commands::catalog::update(&state, &session, &ProductId::new(product_id), changes)
                    .await?;
            }
            CatalogAction::Deactivate { product_id } => {
                commands::catalog::deactivate(&state, &session, &ProductId::new(product_id))
                    .await?;
            }
        },
        Commands::Checkout {
            name,
            phone,
            address,
            email,
        } => {
            let customer = shahi_storefront::services::CustomerInfo {
                name,
                phone,
                address,
                email: email.or_else(|| session.email().map(String::from)),
            };
            let mut cart = state.cart_for(&session);
            let placed = commands::checkout::place(&state, &mut cart, &customer).await;
            cart.flush().await;
            placed?;
        }
        Commands::Order { action } => match action {
            OrderAction::List => commands::checkout::list(&state, &session).await?,
            OrderAction::Status { order_id, status } => {
                commands::checkout::set_status(&state, &session, &order_id, &status).await?;
            }
            OrderAction::Delete { order_id } => {
                commands::checkout::delete(&state, &session, &order_id).await?;
            }
        },
    }
    Ok(())
}
