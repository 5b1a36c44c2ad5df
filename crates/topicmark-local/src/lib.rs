//! Local (reqwest-backed) implementations for topicmark: the transcript
//! acquisition strategies, the fallback-chain resolver, and the
//! Gemini-backed topic locator.

use std::time::Duration;
use topicmark_core::{Error, Result, TranscriptStrategy};

pub mod captions;
pub mod gemini;
pub mod innertube;
pub mod locator;
pub mod media;
pub mod mirrors;
pub mod resolver;
pub mod transcript_api;

pub use gemini::GeminiClient;
pub use locator::{LocatorBackend, TopicLocator};
pub use resolver::TranscriptResolver;

/// Shared HTTP client for every strategy and the Gemini backend.
///
/// Safety defaults: avoid "hang forever" on DNS/TLS/body stalls. Individual
/// requests still set their own (usually tighter) timeouts.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("topicmark/0.1")
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::Strategy(format!("http client: {e}")))
}

/// The production fallback chain, in decreasing order of trust/fidelity and
/// increasing latency tolerance: maintained captions client, then the three
/// player-API client identities, then the public mirrors.
pub fn default_resolver(client: &reqwest::Client) -> TranscriptResolver {
    let strategies: Vec<Box<dyn TranscriptStrategy>> = vec![
        Box::new(transcript_api::TranscriptApiStrategy::from_env()),
        Box::new(innertube::InnertubeStrategy::new(
            client.clone(),
            innertube::ANDROID,
        )),
        Box::new(innertube::InnertubeStrategy::new(
            client.clone(),
            innertube::IOS,
        )),
        Box::new(innertube::InnertubeStrategy::new(
            client.clone(),
            innertube::TV_EMBEDDED,
        )),
        Box::new(mirrors::MirrorStrategy::from_env(client.clone())),
    ];
    TranscriptResolver::new(strategies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_has_five_strategies_in_priority_order() {
        let client = http_client().unwrap();
        let resolver = default_resolver(&client);
        assert_eq!(
            resolver.strategy_names(),
            vec![
                "transcript_api",
                "innertube_android",
                "innertube_ios",
                "innertube_tv",
                "mirrors",
            ]
        );
    }
}
