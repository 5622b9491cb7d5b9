//! Command-line argument definitions.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Latest price for a symbol |
//! | `overview` | Company overview |
//! | `sectors` | Sector performance |
//! | `income` | Income statements |
//! | `bulk` | Full time series for several symbols, paced |
//! | `job` | Run a refresh job given as JSON |

use clap::{Parser, Subcommand};

/// Rate-limited, cache-backed Alpha Vantage client.
///
/// Reads `ALPHA_VANTAGE_API_KEY` and the `VANTAGE_*` settings from the
/// environment or a `.env` file.
#[derive(Debug, Parser)]
#[command(name = "vantage", author, version, about)]
pub(crate) struct Cli {
    /// Print compact JSON instead of pretty-printed JSON.
    #[arg(long, global = true)]
    pub(crate) compact: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Latest price for a symbol.
    Quote {
        /// Ticker, e.g. IBM.
        symbol: String,
    },
    /// Company overview (market cap, EPS, description).
    Overview {
        /// Ticker.
        symbol: String,
    },
    /// Sector performance.
    Sectors,
    /// Income statements.
    Income {
        /// Ticker.
        symbol: String,
    },
    /// Full time series for several symbols, fetched one at a time.
    Bulk {
        /// Tickers, fetched in this order.
        #[arg(required = true)]
        symbols: Vec<String>,
        /// Series function, e.g. TIME_SERIES_DAILY_ADJUSTED.
        #[arg(long)]
        function: Option<String>,
    },
    /// Run a refresh job, e.g. '{"job": "refresh_stock_price", "symbol": "IBM"}'.
    Job {
        /// Job as JSON.
        json: String,
    },
}
