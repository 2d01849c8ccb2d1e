//! Slash command handling
//!
//! Each command is a pure function of the metric sources and the formatter.
//! Handlers share the HTTP client with the refresher and never wait on it.

use crate::{
    error::PlatformError,
    format,
    platform::{
        gateway::{Interaction, INTERACTION_APPLICATION_COMMAND},
        DiscordRest,
    },
    source::MetricSources,
    sources::is_hoosat_address,
    types::MetricValue,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const UNAVAILABLE: &str = "Unavailable";

/// Option type for string arguments in command definitions
const OPTION_STRING: u8 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Value of the first field called `name`
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Answer to a command
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    /// Only the invoking user sees the reply
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            ephemeral: true,
            ..Self::text(content)
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
            ephemeral: false,
        }
    }
}

/// Supported slash commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Price,
    Hashrate,
    MarketCap,
    Status,
    Wallets,
    Balance { address: String },
}

impl Command {
    /// Parses an interaction into a command
    pub fn from_interaction(interaction: &Interaction) -> Option<Self> {
        if interaction.kind != INTERACTION_APPLICATION_COMMAND {
            return None;
        }
        let name = interaction.data.as_ref()?.name.as_str();
        Self::parse(name, interaction.option_str("address"))
    }

    pub fn parse(name: &str, address: Option<&str>) -> Option<Self> {
        match name {
            "ping" => Some(Command::Ping),
            "price" => Some(Command::Price),
            "hashrate" => Some(Command::Hashrate),
            "marketcap" => Some(Command::MarketCap),
            "status" => Some(Command::Status),
            "wallets" => Some(Command::Wallets),
            "balance" => Some(Command::Balance {
                address: address.unwrap_or_default().trim().to_string(),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Price => "price",
            Command::Hashrate => "hashrate",
            Command::MarketCap => "marketcap",
            Command::Status => "status",
            Command::Wallets => "wallets",
            Command::Balance { .. } => "balance",
        }
    }

    /// Commands that fan out to several requests are acknowledged first
    ///
    /// Returns the visibility of the deferred answer.
    pub fn deferral(&self) -> Option<bool> {
        match self {
            Command::Status | Command::Wallets => Some(false),
            Command::Balance { .. } => Some(true),
            _ => None,
        }
    }

    fn needs_api(&self) -> bool {
        !matches!(self, Command::Ping | Command::Wallets)
    }
}

/// Registration payload for every command
pub fn definitions() -> Value {
    json!([
        { "name": "ping", "description": "Check bot latency" },
        { "name": "price", "description": "Get current HTN price" },
        { "name": "hashrate", "description": "Get current HTN network hashrate" },
        { "name": "marketcap", "description": "Get current HTN market cap" },
        { "name": "status", "description": "Get HTN price/hashrate/marketcap in one message" },
        { "name": "wallets", "description": "Show funding wallet balances" },
        {
            "name": "balance",
            "description": "Get HTN balance for a hoosat: address",
            "options": [{
                "type": OPTION_STRING,
                "name": "address",
                "description": "Address starting with hoosat:",
                "required": true
            }]
        }
    ])
}

fn or_unavailable(value: MetricValue, render: impl FnOnce(f64) -> String) -> String {
    value
        .value()
        .map(render)
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// Answers commands from the shared sources
pub struct Responder {
    sources: MetricSources,
    api_configured: bool,
    latency_ms: Arc<AtomicU64>,
}

impl Responder {
    pub fn new(
        sources: MetricSources,
        api_configured: bool,
        latency_ms: Arc<AtomicU64>,
    ) -> Self {
        Self {
            sources,
            api_configured,
            latency_ms,
        }
    }

    /// Replies that need no fetching: configuration and argument errors
    pub fn precheck(&self, command: &Command) -> Option<Reply> {
        if command.needs_api() && !self.api_configured {
            return Some(Reply::ephemeral("API_URL is not configured."));
        }
        if let Command::Balance { address } = command {
            if !is_hoosat_address(address) {
                return Some(Reply::ephemeral(
                    "Invalid address. Expected format like: `hoosat:...`",
                ));
            }
        }
        None
    }

    /// Answers an interaction over REST
    ///
    /// Rejections are sent immediately. Slow commands are deferred first and
    /// their answer replaces the placeholder.
    pub async fn answer(
        &self,
        rest: &DiscordRest,
        interaction: &Interaction,
        command: &Command,
    ) -> Result<(), PlatformError> {
        if let Some(reply) = self.precheck(command) {
            return rest.respond(interaction.id, &interaction.token, &reply).await;
        }

        match command.deferral() {
            Some(ephemeral) => {
                rest.defer(interaction.id, &interaction.token, ephemeral).await?;
                let reply = self.respond(command).await;
                rest.edit_original(interaction.application_id, &interaction.token, &reply)
                    .await
            }
            None => {
                let reply = self.respond(command).await;
                rest.respond(interaction.id, &interaction.token, &reply).await
            }
        }
    }

    /// Runs a command to completion
    pub async fn respond(&self, command: &Command) -> Reply {
        if let Some(reply) = self.precheck(command) {
            return reply;
        }

        match command {
            Command::Ping => Reply::text(format!(
                "Pong! {}ms",
                self.latency_ms.load(Ordering::Relaxed)
            )),
            Command::Price => match self.sources.price.fetch().await.value() {
                Some(p) => Reply::text(format!("HTN price: ${}", format::price(p))),
                None => Reply::ephemeral("Failed to fetch price."),
            },
            Command::Hashrate => match self.sources.hashrate.fetch().await.value() {
                Some(h) => Reply::text(format!("HTN hashrate: {} GH/s", format::hashrate_gh(h))),
                None => Reply::ephemeral("Failed to fetch hashrate."),
            },
            Command::MarketCap => match self.sources.marketcap.fetch().await.value() {
                Some(mc) => Reply::text(format!("HTN market cap: {} USDT", format::amount(mc))),
                None => Reply::ephemeral("Failed to fetch market cap."),
            },
            Command::Status => self.status().await,
            Command::Wallets => self.wallets().await,
            Command::Balance { address } => self.balance(address).await,
        }
    }

    async fn status(&self) -> Reply {
        let (price, hashrate, marketcap) = tokio::join!(
            self.sources.price.fetch(),
            self.sources.hashrate.fetch(),
            self.sources.marketcap.fetch(),
        );

        if !(price.is_available() || hashrate.is_available() || marketcap.is_available()) {
            return Reply::ephemeral("Failed to fetch status.");
        }

        Reply::embed(
            Embed::new("HTN Status")
                .field(
                    "Price",
                    or_unavailable(price, |p| format!("${}", format::price(p))),
                    true,
                )
                .field(
                    "Hashrate",
                    or_unavailable(hashrate, |h| format!("{} GH/s", format::hashrate_gh(h))),
                    true,
                )
                .field(
                    "Market cap",
                    or_unavailable(marketcap, |mc| format!("{} USDT", format::amount(mc))),
                    true,
                ),
        )
    }

    async fn wallets(&self) -> Reply {
        let (htn, usdt) = tokio::join!(
            self.sources.htn_wallet.fetch(),
            self.sources.usdt_wallet.fetch(),
        );

        Reply::embed(
            Embed::new("Funding Wallets")
                .field("HTN", or_unavailable(htn, format::amount), true)
                .field("TRC20 USDT", or_unavailable(usdt, format::amount), true),
        )
    }

    async fn balance(&self, address: &str) -> Reply {
        let (balance, price) = tokio::join!(
            self.sources.balances.balance_of(address),
            self.sources.price.fetch(),
        );

        let Some(htn) = balance.value() else {
            return Reply::text("Failed to fetch balance.");
        };

        Reply::embed(
            Embed::new("Hoosat Address Balance")
                .field("Address", address, false)
                .field("HTN", format!("{} HTN", format::htn_exact(htn)), true)
                .field(
                    "USDT",
                    or_unavailable(price, |p| format!("{} USDT", format::usdt(htn * p))),
                    true,
                ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::build_http_client;
    use crate::source::mock::{MockBalance, MockSource};
    use crate::types::MetricKind;
    use mockito::Matcher;

    fn sources(price: MockSource, balance: Option<f64>) -> MetricSources {
        MetricSources {
            price: Arc::new(price),
            hashrate: Arc::new(MockSource::value(MetricKind::Hashrate, 1.5)),
            marketcap: Arc::new(MockSource::failing(MetricKind::MarketCap)),
            htn_wallet: Arc::new(MockSource::failing(MetricKind::HtnWallet)),
            usdt_wallet: Arc::new(MockSource::value(MetricKind::UsdtWallet, 0.0)),
            balances: Arc::new(MockBalance(balance)),
        }
    }

    fn responder(price: MockSource, balance: Option<f64>) -> Responder {
        Responder::new(sources(price, balance), true, Arc::new(AtomicU64::new(42)))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("ping", None), Some(Command::Ping));
        assert_eq!(
            Command::parse("balance", Some("  hoosat:qq ")),
            Some(Command::Balance {
                address: "hoosat:qq".to_string()
            })
        );
        assert_eq!(Command::parse("unknown", None), None);
        assert_eq!(Command::Status.deferral(), Some(false));
        assert_eq!(Command::parse("balance", None).unwrap().deferral(), Some(true));
        assert_eq!(Command::Price.deferral(), None);
    }

    #[test]
    fn test_definitions_cover_every_command() {
        let defs = definitions();
        let names: Vec<&str> = defs
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        for name in names {
            assert!(Command::parse(name, Some("hoosat:x")).is_some(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_ping_reports_latency() {
        let reply = responder(MockSource::value(MetricKind::Price, 1.0), None)
            .respond(&Command::Ping)
            .await;
        assert_eq!(reply, Reply::text("Pong! 42ms"));
    }

    #[tokio::test]
    async fn test_single_value_commands() {
        let ok = responder(MockSource::value(MetricKind::Price, 0.01), None);
        assert_eq!(
            ok.respond(&Command::Price).await,
            Reply::text("HTN price: $0\u{2024}010000")
        );
        assert_eq!(
            ok.respond(&Command::Hashrate).await,
            Reply::text("HTN hashrate: 1500\u{2024}00 GH/s")
        );
        assert_eq!(
            ok.respond(&Command::MarketCap).await,
            Reply::ephemeral("Failed to fetch market cap.")
        );

        let failing = responder(MockSource::failing(MetricKind::Price), None);
        assert_eq!(
            failing.respond(&Command::Price).await,
            Reply::ephemeral("Failed to fetch price.")
        );
    }

    #[tokio::test]
    async fn test_api_not_configured() {
        let responder = Responder::new(
            sources(MockSource::value(MetricKind::Price, 1.0), None),
            false,
            Arc::new(AtomicU64::new(0)),
        );
        assert_eq!(
            responder.respond(&Command::Status).await,
            Reply::ephemeral("API_URL is not configured.")
        );
        // wallets and ping still work without the API
        assert!(responder.precheck(&Command::Wallets).is_none());
        assert!(responder.precheck(&Command::Ping).is_none());
    }

    #[tokio::test]
    async fn test_status_shows_partial_results() {
        let reply = responder(MockSource::failing(MetricKind::Price), None)
            .respond(&Command::Status)
            .await;
        let embed = reply.embed.expect("embed");
        assert_eq!(embed.title, "HTN Status");
        assert_eq!(embed.value_of("Price"), Some(UNAVAILABLE));
        assert_eq!(embed.value_of("Hashrate"), Some("1500\u{2024}00 GH/s"));
        assert_eq!(embed.value_of("Market cap"), Some(UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_wallets_distinguish_zero_from_unavailable() {
        let reply = responder(MockSource::value(MetricKind::Price, 1.0), None)
            .respond(&Command::Wallets)
            .await;
        let embed = reply.embed.expect("embed");
        assert_eq!(embed.value_of("HTN"), Some(UNAVAILABLE));
        assert_eq!(embed.value_of("TRC20 USDT"), Some("0\u{2024}00"));
    }

    #[tokio::test]
    async fn test_balance_command() {
        let responder = responder(MockSource::value(MetricKind::Price, 0.5), Some(12.5));
        let command = Command::Balance {
            address: "hoosat:qq".to_string(),
        };

        let embed = responder.respond(&command).await.embed.expect("embed");
        assert_eq!(embed.value_of("Address"), Some("hoosat:qq"));
        assert_eq!(embed.value_of("HTN"), Some("12\u{2024}50000000 HTN"));
        assert_eq!(embed.value_of("USDT"), Some("6\u{2024}25 USDT"));
    }

    #[tokio::test]
    async fn test_balance_without_price() {
        let responder = responder(MockSource::failing(MetricKind::Price), Some(1.0));
        let command = Command::Balance {
            address: "hoosat:qq".to_string(),
        };
        let embed = responder.respond(&command).await.embed.expect("embed");
        assert_eq!(embed.value_of("USDT"), Some(UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_balance_rejects_bad_address_and_failed_lookup() {
        let responder = responder(MockSource::value(MetricKind::Price, 1.0), None);
        let invalid = Command::Balance {
            address: "kaspa:qq".to_string(),
        };
        assert!(responder.respond(&invalid).await.ephemeral);

        let valid = Command::Balance {
            address: "hoosat:qq".to_string(),
        };
        assert_eq!(
            responder.respond(&valid).await,
            Reply::text("Failed to fetch balance.")
        );
    }

    fn interaction(name: &str, address: Option<&str>) -> Interaction {
        let options: Vec<Value> = address
            .map(|a| json!({ "name": "address", "type": 3, "value": a }))
            .into_iter()
            .collect();
        serde_json::from_value(json!({
            "id": "1100",
            "application_id": "77",
            "type": 2,
            "token": "tok",
            "data": { "name": name, "options": options }
        }))
        .unwrap()
    }

    fn rest(server: &mockito::Server) -> DiscordRest {
        DiscordRest::with_base_url(build_http_client().unwrap(), server.url(), "secret")
    }

    #[tokio::test]
    async fn test_answer_quick_command_immediately() {
        let mut server = mockito::Server::new_async().await;
        let callback = server
            .mock("POST", "/interactions/1100/tok/callback")
            .match_body(Matcher::Json(json!({
                "type": 4,
                "data": { "content": "HTN price: $0\u{2024}010000", "embeds": [] }
            })))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let interaction = interaction("price", None);
        let command = Command::from_interaction(&interaction).unwrap();
        responder(MockSource::value(MetricKind::Price, 0.01), None)
            .answer(&rest(&server), &interaction, &command)
            .await
            .unwrap();
        callback.assert_async().await;
    }

    #[tokio::test]
    async fn test_answer_defers_then_edits() {
        let mut server = mockito::Server::new_async().await;
        let defer = server
            .mock("POST", "/interactions/1100/tok/callback")
            .match_body(Matcher::Json(json!({ "type": 5, "data": { "flags": 0 } })))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let edit = server
            .mock("PATCH", "/webhooks/77/tok/messages/@original")
            .match_body(Matcher::Regex("HTN Status".to_string()))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let interaction = interaction("status", None);
        let command = Command::from_interaction(&interaction).unwrap();
        responder(MockSource::value(MetricKind::Price, 0.01), None)
            .answer(&rest(&server), &interaction, &command)
            .await
            .unwrap();
        defer.assert_async().await;
        edit.assert_async().await;
    }

    #[tokio::test]
    async fn test_answer_rejects_bad_address_without_deferring() {
        let mut server = mockito::Server::new_async().await;
        let rejection = server
            .mock("POST", "/interactions/1100/tok/callback")
            .match_body(Matcher::Json(json!({
                "type": 4,
                "data": {
                    "content": "Invalid address. Expected format like: `hoosat:...`",
                    "embeds": [],
                    "flags": 64
                }
            })))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let edit = server
            .mock("PATCH", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let interaction = interaction("balance", Some("hoosat:x/../../info/price"));
        let command = Command::from_interaction(&interaction).unwrap();
        responder(MockSource::value(MetricKind::Price, 1.0), Some(1.0))
            .answer(&rest(&server), &interaction, &command)
            .await
            .unwrap();
        rejection.assert_async().await;
        edit.assert_async().await;
    }
}
