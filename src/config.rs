//! Types and functions for parsing and validating configuration from a YAML file.

use std::fmt;
use std::path::Path;

use anyhow::{bail, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::{
    channel::DEFAULT_CAPACITY,
    dispatcher::Backoff,
    ingestor::OverflowPolicy,
    messages::InstrumentId,
    utils::deserialize_using_parse,
};

static CURRENCY_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,6}_[a-z]{2,6}$").expect("valid currency pair regex"));

/// Currency pair for reasoning about how the exchange presents symbols at various
/// places in its API: "usdcusdt" in stream names, "USDCUSDT" in event payloads.
/// We'll use lowercase internally and the type will enforce this.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Hash)]
#[serde(try_from = "String")]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    pub fn base(&self) -> &str {
        self.base.as_str()
    }
    pub fn quote(&self) -> &str {
        self.quote.as_str()
    }

    /// Symbol as used in stream names, e.g. "usdcusdt".
    pub fn symbol(&self) -> String {
        [self.base(), self.quote()].join("")
    }

    /// Symbol as reported inside depth events, e.g. "USDCUSDT".
    pub fn symbol_upper(&self) -> String {
        self.symbol().to_uppercase()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.quote)
    }
}

impl std::str::FromStr for CurrencyPair {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !CURRENCY_PAIR_RE.is_match(s) {
            bail!("invalid currency_pair format: {s}");
        }
        match s.split_once('_') {
            Some((base, quote)) => Ok(Self {
                base: base.to_owned(),
                quote: quote.to_owned(),
            }),
            None => bail!("invalid currency_pair format: {s}"),
        }
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = anyhow::Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A target structure for deserializing the YAML config file.
/// Any field left out takes its value from [Config::default].
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base websocket url; the per-instrument stream path is appended to it.
    pub ws_base_url: String,
    /// Stream suffix, e.g. "depth@100ms".
    pub stream: String,
    pub channel_capacity: usize,
    #[serde(deserialize_with = "deserialize_using_parse")]
    pub dispatcher_backoff: Backoff,
    pub on_channel_full: OverflowPolicy,
    /// Instruments in id order: the first entry is [InstrumentId]\(0\).
    pub instruments: Vec<CurrencyPair>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_base_url: "wss://stream.binance.com:9443/ws".to_owned(),
            stream: "depth@100ms".to_owned(),
            channel_capacity: DEFAULT_CAPACITY,
            dispatcher_backoff: Backoff::default(),
            on_channel_full: OverflowPolicy::default(),
            instruments: vec![
                CurrencyPair {
                    base: "usdc".to_owned(),
                    quote: "usdt".to_owned(),
                },
                CurrencyPair {
                    base: "fdusd".to_owned(),
                    quote: "usdc".to_owned(),
                },
            ],
        }
    }
}

impl Config {
    /// Parse a YAML document and validate it.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).context("failed to parse config")?;
        config.validate()
    }

    /// Validate the configuration.
    fn validate(self) -> anyhow::Result<Self> {
        if self.instruments.is_empty() {
            bail!("number of instruments must be > 0")
        }
        if self.instruments.len() > usize::from(u8::MAX) + 1 {
            bail!("at most 256 instruments are supported")
        }
        for (i, pair) in self.instruments.iter().enumerate() {
            if self.instruments[..i].contains(pair) {
                bail!("duplicate instrument: {pair}")
            }
        }
        if !self.channel_capacity.is_power_of_two() {
            bail!(
                "channel_capacity must be a non-zero power of two, got {}",
                self.channel_capacity
            )
        }
        let base = Url::parse(&self.ws_base_url).context("invalid ws_base_url")?;
        if !matches!(base.scheme(), "ws" | "wss") {
            bail!("ws_base_url must use ws or wss, got {}", base.scheme())
        }
        if self.stream.is_empty() {
            bail!("stream must not be empty")
        }
        Ok(self)
    }

    /// The configured instruments paired with their ids.
    pub fn instrument_ids(&self) -> impl Iterator<Item = (InstrumentId, &CurrencyPair)> {
        // validate() caps the table at 256 entries, so the index always fits
        self.instruments
            .iter()
            .enumerate()
            .map(|(i, pair)| (InstrumentId(i as u8), pair))
    }

    /// Streaming endpoint for one instrument, e.g.
    /// `wss://stream.binance.com:9443/ws/usdcusdt@depth@100ms`.
    pub fn endpoint(&self, pair: &CurrencyPair) -> Result<Url, url::ParseError> {
        let base = self.ws_base_url.trim_end_matches('/');
        Url::parse(&format!("{base}/{}@{}", pair.symbol(), self.stream))
    }
}

/// Read and validate the config file at `path`.
/// A missing file is not an error: the defaults are used instead.
pub fn read_config(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("no config file at {}, using defaults", path.display());
        return Config::default().validate();
    }
    let f = std::fs::File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    let config: Config = serde_yaml::from_reader(f).context("failed to parse config file")?;
    config.validate().context("invalid config")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parse_currency_pair() {
        let pair: CurrencyPair = "fdusd_usdc".parse().unwrap();
        assert_eq!(pair.base(), "fdusd");
        assert_eq!(pair.quote(), "usdc");
        assert_eq!(pair.symbol(), "fdusdusdc");
        assert_eq!(pair.symbol_upper(), "FDUSDUSDC");
        assert_eq!(pair.to_string(), "fdusd_usdc");

        assert!("USDC_USDT".parse::<CurrencyPair>().is_err());
        assert!("usdcusdt".parse::<CurrencyPair>().is_err());
        assert!("usdc_usdt_x".parse::<CurrencyPair>().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default().validate().unwrap();
        assert_eq!(config.channel_capacity, 1024);
        assert_eq!(config.on_channel_full, OverflowPolicy::Drop);
        assert_eq!(config.dispatcher_backoff, Backoff::Sleep(Duration::from_micros(1)));
        let ids: Vec<_> = config.instrument_ids().map(|(id, p)| (id, p.symbol())).collect();
        assert_eq!(
            ids,
            vec![
                (InstrumentId(0), "usdcusdt".to_owned()),
                (InstrumentId(1), "fdusdusdc".to_owned())
            ]
        );
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
ws_base_url: wss://example.com/ws/
stream: depth
channel_capacity: 16
dispatcher_backoff: spin
on_channel_full: rearm
instruments:
  - eth_btc
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.dispatcher_backoff, Backoff::Spin);
        assert_eq!(config.on_channel_full, OverflowPolicy::Rearm);
        let pair = &config.instruments[0];
        assert_eq!(
            config.endpoint(pair).unwrap().as_str(),
            "wss://example.com/ws/ethbtc@depth"
        );
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config = Config::from_yaml("channel_capacity: 64\n").unwrap();
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.instruments.len(), 2);
        assert_eq!(
            config.endpoint(&config.instruments[0]).unwrap().as_str(),
            "wss://stream.binance.com:9443/ws/usdcusdt@depth@100ms"
        );
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(Config::from_yaml("channel_capacity: 1000\n").is_err());
        assert!(Config::from_yaml("channel_capacity: 0\n").is_err());
        assert!(Config::from_yaml("instruments: []\n").is_err());
        assert!(Config::from_yaml("instruments: [eth_btc, eth_btc]\n").is_err());
        assert!(Config::from_yaml("instruments: [ETHBTC]\n").is_err());
        assert!(Config::from_yaml("ws_base_url: https://example.com\n").is_err());
        assert!(Config::from_yaml("on_channel_full: retry\n").is_err());
        assert!(Config::from_yaml("dispatcher_backoff: soon\n").is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = read_config("/nonexistent/depth_quotes/config.yml").unwrap();
        assert_eq!(config.instruments, Config::default().instruments);
    }
}
