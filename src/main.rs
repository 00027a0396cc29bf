//! CLI entry point for folio-rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_rs::commands::cart::CartAction;

#[derive(Parser)]
#[command(name = "folio-rs")]
#[command(version)]
#[command(about = "A static site generator and storefront toolkit for Markdown content sites", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Create a new post, page or audio excerpt
    New {
        /// Kind of content (post, page, audio)
        kind: String,

        /// Title of the new entry
        title: String,

        /// File or directory name (defaults to the slugified title)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Watch for file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Start a local preview server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Enable static mode (no file watching)
        #[arg(long)]
        r#static: bool,
    },

    /// Clean the public folder
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, page, audio, slug)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Inspect or edit the persisted cart
    Cart {
        #[command(subcommand)]
        action: Option<CartCommand>,
    },

    /// Create a checkout session for the cart and print its URL
    Checkout {
        /// Query string the payments provider redirected back with
        #[arg(long)]
        return_query: Option<String>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum CartCommand {
    /// Show the cart
    Show,

    /// Add a price from the product catalog
    Add {
        price_id: String,

        #[arg(short, long, default_value = "1")]
        qty: u32,
    },

    /// Remove a product, or a single price variant
    Remove { id: String },

    /// Set the quantity of a price variant (0 removes it)
    Update {
        price_id: String,

        #[arg(allow_negative_numbers = true)]
        qty: i64,
    },

    /// Empty the cart
    Clear,
}

impl From<CartCommand> for CartAction {
    fn from(command: CartCommand) -> Self {
        match command {
            CartCommand::Show => CartAction::Show,
            CartCommand::Add { price_id, qty } => CartAction::Add {
                price_id,
                quantity: qty,
            },
            CartCommand::Remove { id } => CartAction::Remove { id },
            CartCommand::Update { price_id, qty } => CartAction::Update {
                price_id,
                quantity: qty,
            },
            CartCommand::Clear => CartAction::Clear,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "folio_rs=debug,info"
    } else {
        "folio_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            folio_rs::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::New { kind, title, path } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            tracing::info!("Creating new {} with title: {}", kind, title);
            let file = folio_rs::commands::new::create(&folio, &kind, &title, path.as_deref())?;
            println!("Created: {:?}", file);
        }

        Commands::Generate { watch } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            tracing::info!("Generating static files...");

            folio.generate()?;
            println!("Generated successfully!");

            if watch {
                folio_rs::commands::generate::watch(&folio).await?;
            }
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let folio = folio_rs::Folio::new(&base_dir)?;

            // Generate first
            tracing::info!("Generating static files...");
            folio.generate()?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            folio_rs::server::start(&folio, &ip, port, !r#static, open).await?;
        }

        Commands::Clean => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            folio.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            folio_rs::commands::list::run(&folio, &r#type)?;
        }

        Commands::Cart { action } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            let action = action.map(CartAction::from).unwrap_or(CartAction::Show);
            folio_rs::commands::cart::run(&folio, action)?;
        }

        Commands::Checkout { return_query } => {
            let folio = folio_rs::Folio::new(&base_dir)?;
            folio_rs::commands::checkout::run(&folio, return_query.as_deref()).await?;
        }

        Commands::Version => {
            println!("folio-rs version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
