pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ingestor;
pub mod messages;
pub mod orderbook;
pub mod tracker;
pub mod websocket;

pub(crate) mod utils {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{Deserialize, Deserializer};

    /// Deserialize a string field through the target type's [FromStr] impl.
    pub fn deserialize_using_parse<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        String::deserialize(deserializer)?
            .parse::<T>()
            .map_err(serde::de::Error::custom)
    }
}
