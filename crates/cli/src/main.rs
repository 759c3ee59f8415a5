//! Marketfront CLI - exercise the storefront client from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart
//! marketfront cart fetch
//!
//! # Add a product (with an optional variation)
//! marketfront cart add --product 42 --quantity 2
//! marketfront cart add --product 42 --quantity 1 --variation 7
//!
//! # Change a line item
//! marketfront cart update --item item-42-0 --quantity 3
//! marketfront cart remove --item item-42-0
//!
//! # Authenticate
//! marketfront login --email you@example.com
//! marketfront whoami
//!
//! # Place an order
//! marketfront order --address 3 --method card
//! ```
//!
//! Configuration comes from the environment (`MARKETFRONT_BASE_URL` etc.);
//! see `marketfront_client::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Terminal output is this binary's job.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketfront_client::auth::{AuthContext, FileTokenStore, MemoryTokenStore, TokenStore};
use marketfront_client::cart::{Cart, CartSynchronizer};
use marketfront_client::checkout::{CheckoutState, PaymentMethod};
use marketfront_client::config::StorefrontConfig;
use marketfront_client::graphql::GraphQlClient;
use marketfront_client::http::Transport;
use marketfront_core::{AddressId, CartItemId, ProductId, VariationId};

#[derive(Parser)]
#[command(name = "marketfront")]
#[command(author, version, about = "Marketfront storefront client CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cart operations
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Log in and store the bearer token
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (prompted from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show the current user
    Whoami,
    /// Walk the checkout steps and place an order
    Order {
        /// Shipping address ID
        #[arg(short, long)]
        address: i64,

        /// Payment method
        #[arg(short, long, value_enum, default_value = "card")]
        method: PaymentArg,
    },
    /// Log out and discard the bearer token
    Logout,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PaymentArg {
    Card,
    Paypal,
    Cod,
}

impl From<PaymentArg> for PaymentMethod {
    fn from(arg: PaymentArg) -> Self {
        match arg {
            PaymentArg::Card => Self::Card,
            PaymentArg::Paypal => Self::Paypal,
            PaymentArg::Cod => Self::CashOnDelivery,
        }
    }
}

#[derive(Subcommand)]
enum CartAction {
    /// Fetch and display the cart
    Fetch,
    /// Add a product to the cart
    Add {
        /// Product ID
        #[arg(short, long)]
        product: i64,

        /// Quantity to add
        #[arg(short, long, default_value = "1")]
        quantity: u32,

        /// Variation ID (size/color/sku combination)
        #[arg(short, long)]
        variation: Option<i64>,
    },
    /// Set the quantity of a line item
    Update {
        /// Line item ID
        #[arg(short, long)]
        item: String,

        /// New quantity
        #[arg(short, long)]
        quantity: u32,
    },
    /// Remove a line item
    Remove {
        /// Line item ID
        #[arg(short, long)]
        item: String,
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

fn token_store(config: &StorefrontConfig) -> Arc<dyn TokenStore> {
    config.token_dir.as_ref().map_or_else(
        || Arc::new(MemoryTokenStore::new()) as Arc<dyn TokenStore>,
        |dir| Arc::new(FileTokenStore::new(dir.clone())) as Arc<dyn TokenStore>,
    )
}

fn print_cart(cart: &Cart) {
    if cart.items.is_empty() {
        println!("cart {} is empty", cart.id);
        return;
    }

    println!("cart {} ({} items)", cart.id, cart.item_count);
    for item in &cart.items {
        let variation = item.variation.as_ref().map_or_else(String::new, |v| {
            format!(
                " [{}]",
                v.sku.clone().unwrap_or_else(|| v.id.to_string())
            )
        });
        println!(
            "  {} x{} {}{} = {}",
            item.id,
            item.quantity,
            item.product.title,
            variation,
            item.line_price(cart.currency).display()
        );
    }
    println!("total: {}", cart.total_price().display());
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let transport = Transport::new(&config)?;
    let tokens = token_store(&config);
    let auth = AuthContext::new();

    match cli.command {
        Commands::Cart { action } => {
            let cart = CartSynchronizer::new(&transport, &config, Arc::clone(&tokens));
            let state = match action {
                CartAction::Fetch => cart.fetch_cart().await?,
                CartAction::Add {
                    product,
                    quantity,
                    variation,
                } => {
                    cart.add_item(
                        ProductId::new(product),
                        quantity,
                        variation.map(VariationId::new),
                    )
                    .await?
                }
                CartAction::Update { item, quantity } => {
                    // Mutations resolve the item against fetched state.
                    cart.fetch_cart().await?;
                    cart.update_quantity(&CartItemId::from(item), quantity).await?
                }
                CartAction::Remove { item } => {
                    cart.fetch_cart().await?;
                    cart.remove_item(&CartItemId::from(item)).await?
                }
            };
            print_cart(&state);
        }
        Commands::Login { email, password } => {
            let graphql = GraphQlClient::new(&transport, &config, Arc::clone(&tokens))?;
            let password = match password {
                Some(p) => p,
                None => {
                    let mut line = String::new();
                    std::io::stdin().read_line(&mut line)?;
                    line.trim_end().to_string()
                }
            };
            let user = graphql.login(&auth, &email, &password).await?;
            println!("logged in as {} ({:?})", user.email, user.role);
        }
        Commands::Whoami => {
            let graphql = GraphQlClient::new(&transport, &config, Arc::clone(&tokens))?;
            match graphql.load_current_user(&auth).await? {
                Some(user) => println!("{} ({:?})", user.email, user.role),
                None => println!("not logged in"),
            }
        }
        Commands::Order { address, method } => {
            let graphql = GraphQlClient::new(&transport, &config, Arc::clone(&tokens))?;
            // The step guard requires the same progression the UI walks.
            let mut checkout = CheckoutState::new();
            checkout.select_address(AddressId::new(address));
            checkout.choose_payment(method.into())?;
            let order_id = graphql.place_order_from(&mut checkout).await?;
            println!("order placed: {order_id}");
        }
        Commands::Logout => {
            auth.logout(tokens.as_ref());
            println!("logged out");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketfront_client=info,marketfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
