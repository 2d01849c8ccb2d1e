//! Constants for the HTN status bot
//!
//! Endpoints, fixed wallet identifiers and timing defaults live here.
//! Anything an operator is expected to change is read from the environment
//! in the `config` module instead.

/// Default refresh cadence for channel names and presence (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 60;

/// Total HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// TCP/TLS connect timeout (in seconds)
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Socket read timeout (in seconds)
pub const READ_TIMEOUT_SECS: u64 = 10;

/// User agent presented on metric API requests
pub const USER_AGENT: &str = "htn-discord-bot";

/// Hoosat API endpoint for the HTN price
pub const PRICE_ENDPOINT: &str = "/info/price";

/// Hoosat API endpoint for the network hashrate (TH/s)
pub const HASHRATE_ENDPOINT: &str = "/info/hashrate?stringOnly=false";

/// Hoosat API endpoint for the market capitalization
pub const MARKETCAP_ENDPOINT: &str = "/info/marketcap?stringOnly=false";

/// Sompi per HTN (8-decimal fixed point)
pub const SOMPI_PER_HTN: f64 = 100_000_000.0;

/// Address prefix accepted by the balance command
pub const HOOSAT_ADDRESS_PREFIX: &str = "hoosat:";

/// TronGrid public ledger API
pub const TRONGRID_API_URL: &str = "https://api.trongrid.io/v1/accounts";

/// TRC20 USDT token contract
pub const TRON_USDT_CONTRACT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// Smallest units per USDT (6-decimal fixed point)
pub const TRC20_USDT_UNITS: f64 = 1_000_000.0;

/// Listing funding wallet on the Hoosat chain
pub const FUNDING_HTN_WALLET: &str =
    "hoosat:qqqht7hgt5jay507ragnk73rkjgwvjqzq238krdd9mpfryr6jcah28ejmxruv";

/// Listing funding wallet on TRON (holds TRC20 USDT)
pub const FUNDING_TRON_USDT_WALLET: &str = "TQQzQS1hepsZNuCdhBnGYryCCDegpiASHm";

/// Replacement for the ASCII decimal point in displayed numbers (ONE DOT LEADER)
pub const DECIMAL_MARKER: char = '\u{2024}';

/// Maximum presence text length accepted by Discord
pub const PRESENCE_MAX_CHARS: usize = 128;

/// Discord REST API base URL
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Discord gateway URL
pub const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// User agent required by the Discord REST API
pub const DISCORD_USER_AGENT: &str = "DiscordBot (htn-status-bot, 0.1.0)";

/// Delay before re-establishing a dropped gateway session (in seconds)
pub const GATEWAY_RECONNECT_DELAY_SECS: u64 = 5;
