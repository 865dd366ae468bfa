//! # Storeview CLI (`sv`)
//!
//! ## Usage
//!
//! ```bash
//! sv --config ./config/sv.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sv views` | List configured views |
//! | `sv view <name>` | Print one page of a view |
//! | `sv summary <name>` | Count filtered records per class |
//! | `sv totals <name>` | Sum an amount over filtered records |
//! | `sv serve` | Start the JSON HTTP API |
//! | `sv completions <shell>` | Print shell completions |

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use storeview::config;
use storeview::logging;
use storeview::server;
use storeview::summary::{self, SummaryQuery, TotalsQuery};
use storeview::views::{self, ViewQuery};

/// Storeview CLI: derived-collection views over remote storefront records.
///
/// All commands except `completions` read a TOML configuration file
/// given by `--config`.
#[derive(Parser)]
#[command(
    name = "sv",
    about = "Storeview: join, filter, paginate, and summarize storefront records",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sv.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by `view`, `summary`, and `totals`.
#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Case-insensitive text to look for in the view's search fields.
    #[arg(long)]
    search: Option<String>,

    /// Only records dated on or after this day (YYYY-MM-DD).
    #[arg(long)]
    since: Option<String>,

    /// Only records dated on or before this day (YYYY-MM-DD).
    #[arg(long)]
    until: Option<String>,
}

impl FilterArgs {
    fn into_query(self) -> ViewQuery {
        ViewQuery {
            search: self.search,
            since: self.since,
            until: self.until,
            page: None,
            page_size: None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List configured views.
    Views,

    /// Print one page of a view.
    ///
    /// Fetches the view's collections, joins and filters them, and prints
    /// the requested page. Pages past the end show the last page.
    View {
        /// View name from `[views.<name>]`.
        name: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// 1-based page number.
        #[arg(long)]
        page: Option<usize>,

        /// Override the configured page size.
        #[arg(long)]
        page_size: Option<usize>,

        /// Print the page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Count filtered records per class (e.g. order status).
    Summary {
        name: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Field to classify by (defaults to the view's `status_field`).
        #[arg(long, conflicts_with = "by_join")]
        by: Option<String>,

        /// Classify by whether the join matched.
        #[arg(long)]
        by_join: bool,

        #[arg(long)]
        json: bool,
    },

    /// Sum an amount over filtered records.
    Totals {
        name: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Amount field (defaults to the view's `amount_field`).
        #[arg(long)]
        field: Option<String>,

        /// Quantity field multiplied into each amount.
        #[arg(long)]
        quantity: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Start the JSON HTTP API on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "sv", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Views => {
            views::run_list_views(&cfg)?;
        }
        Commands::View {
            name,
            filters,
            page,
            page_size,
            json,
        } => {
            let query = ViewQuery {
                page,
                page_size,
                ..filters.into_query()
            };
            views::run_view(&cfg, &name, query, json).await?;
        }
        Commands::Summary {
            name,
            filters,
            by,
            by_join,
            json,
        } => {
            let query = SummaryQuery {
                query: filters.into_query(),
                by,
                by_join,
            };
            summary::run_summary(&cfg, &name, query, json).await?;
        }
        Commands::Totals {
            name,
            filters,
            field,
            quantity,
            json,
        } => {
            let query = TotalsQuery {
                query: filters.into_query(),
                field,
                quantity,
            };
            summary::run_totals(&cfg, &name, query, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
