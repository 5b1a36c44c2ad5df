//! Transcript resolution: the ordered fallback chain.
//!
//! The platform actively blocks non-browser clients by source IP or client
//! fingerprint, so no single acquisition path is reliable. Resilience comes
//! from trying architecturally distinct strategies in decreasing order of
//! trust until one succeeds. Strategies run strictly sequentially; they are
//! fallbacks for availability, not parallel races.

use topicmark_core::{Error, Result, Transcript, TranscriptStrategy, VideoId};

/// Per-strategy failure messages are clipped before aggregation so the
/// exhaustion diagnostic stays one readable line.
const FAILURE_SNIPPET_CHARS: usize = 50;

pub struct TranscriptResolver {
    strategies: Vec<Box<dyn TranscriptStrategy>>,
}

impl TranscriptResolver {
    pub fn new(strategies: Vec<Box<dyn TranscriptStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try every configured strategy in order, short-circuiting on the first
    /// success. Fails with `AllStrategiesFailed` carrying every strategy's
    /// label and clipped failure message, in attempt order.
    pub async fn resolve(&self, video_id: &VideoId) -> Result<Transcript> {
        let mut failures: Vec<String> = Vec::new();
        for strategy in &self.strategies {
            match strategy.attempt(video_id).await {
                Ok(t) if !t.is_empty() => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        entries = t.len(),
                        "transcript resolved"
                    );
                    return Ok(t);
                }
                // An empty transcript is a failure, not an empty success.
                Ok(_) => failures.push(format!("{}: empty transcript", strategy.name())),
                Err(e) => {
                    tracing::debug!(strategy = strategy.name(), error = %e, "strategy failed");
                    failures.push(format!("{}: {}", strategy.name(), clip(&e.to_string())));
                }
            }
        }
        Err(Error::AllStrategiesFailed(failures.join("; ")))
    }

    /// Legacy resolution mode kept for parity with an earlier iteration of
    /// this service: inspect the primary strategy's failure text, and only
    /// fall through to a single fallback when the failure looks like the
    /// platform refusing the client ("blocking", "bot", "ip"); any other
    /// primary failure is returned immediately.
    ///
    /// The exhaustive [`resolve`](Self::resolve) chain supersedes this.
    pub async fn resolve_sniffing(&self, video_id: &VideoId) -> Result<Transcript> {
        let mut chain = self.strategies.iter();
        let Some(primary) = chain.next() else {
            return Err(Error::AllStrategiesFailed(
                "no strategies configured".to_string(),
            ));
        };
        let primary_err = match primary.attempt(video_id).await {
            Ok(t) if !t.is_empty() => return Ok(t),
            Ok(_) => Error::Strategy(format!("{}: empty transcript", primary.name())),
            Err(e) => e,
        };

        let msg = primary_err.to_string().to_ascii_lowercase();
        let looks_blocked = ["blocking", "bot", "ip"].iter().any(|n| msg.contains(n));
        if !looks_blocked {
            return Err(primary_err);
        }
        match chain.next() {
            Some(fallback) => fallback.attempt(video_id).await,
            None => Err(primary_err),
        }
    }
}

fn clip(s: &str) -> String {
    if s.chars().count() <= FAILURE_SNIPPET_CHARS {
        return s.to_string();
    }
    s.chars().take(FAILURE_SNIPPET_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use topicmark_core::TranscriptEntry;

    struct FakeStrategy {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        outcome: fn() -> Result<Transcript>,
    }

    #[async_trait::async_trait]
    impl TranscriptStrategy for FakeStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, _video_id: &VideoId) -> Result<Transcript> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn ok_transcript() -> Result<Transcript> {
        Ok(Transcript {
            entries: vec![TranscriptEntry {
                text: "hello".to_string(),
                start: 1.0,
            }],
        })
    }

    fn strategy(
        name: &'static str,
        outcome: fn() -> Result<Transcript>,
    ) -> (Box<dyn TranscriptStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let s = FakeStrategy {
            name,
            calls: calls.clone(),
            outcome,
        };
        (Box::new(s), calls)
    }

    fn vid() -> VideoId {
        VideoId::from_raw("dQw4w9WgXcQ").unwrap()
    }

    #[tokio::test]
    async fn first_success_short_circuits_the_rest() {
        let (s1, c1) = strategy("one", ok_transcript);
        let (s2, c2) = strategy("two", ok_transcript);
        let (s3, c3) = strategy("three", ok_transcript);
        let r = TranscriptResolver::new(vec![s1, s2, s3]);

        let t = r.resolve(&vid()).await.unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 0);
        assert_eq!(c3.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhaustion_reports_every_strategy_label() {
        let (s1, _) = strategy("alpha", || Err(Error::Strategy("down".to_string())));
        let (s2, _) = strategy("beta", || Err(Error::Strategy("403".to_string())));
        let (s3, _) = strategy("gamma", || Err(Error::Strategy("parse".to_string())));
        let (s4, _) = strategy("delta", || Err(Error::Strategy("dns".to_string())));
        let (s5, _) = strategy("epsilon", || Err(Error::Strategy("tls".to_string())));
        let r = TranscriptResolver::new(vec![s1, s2, s3, s4, s5]);

        let err = r.resolve(&vid()).await.unwrap_err();
        let msg = err.to_string();
        for label in ["alpha", "beta", "gamma", "delta", "epsilon"] {
            assert!(msg.contains(label), "missing {label} in {msg}");
        }
    }

    #[tokio::test]
    async fn empty_success_falls_through_to_next_strategy() {
        let (s1, _) = strategy("empty", || Ok(Transcript::default()));
        let (s2, c2) = strategy("full", ok_transcript);
        let r = TranscriptResolver::new(vec![s1, s2]);

        let t = r.resolve(&vid()).await.unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_messages_are_clipped() {
        let (s1, _) = strategy("long", || Err(Error::Strategy("x".repeat(500))));
        let r = TranscriptResolver::new(vec![s1]);
        let msg = r.resolve(&vid()).await.unwrap_err().to_string();
        // label + clipped snippet, not the 500-char original
        assert!(msg.len() < 200, "message too long: {} chars", msg.len());
    }

    #[tokio::test]
    async fn sniffing_mode_falls_back_only_on_block_like_failures() {
        let (s1, _) = strategy("primary", || {
            Err(Error::Strategy("YouTube is blocking requests".to_string()))
        });
        let (s2, c2) = strategy("fallback", ok_transcript);
        let (s3, c3) = strategy("never", ok_transcript);
        let r = TranscriptResolver::new(vec![s1, s2, s3]);

        let t = r.resolve_sniffing(&vid()).await.unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
        // Exactly one fallback, never the rest of the chain.
        assert_eq!(c3.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sniffing_mode_reraises_other_failures_immediately() {
        let (s1, _) = strategy("primary", || {
            Err(Error::Strategy("captions disabled".to_string()))
        });
        let (s2, c2) = strategy("fallback", ok_transcript);
        let r = TranscriptResolver::new(vec![s1, s2]);

        let err = r.resolve_sniffing(&vid()).await.unwrap_err();
        assert!(err.to_string().contains("captions disabled"));
        assert_eq!(c2.load(Ordering::SeqCst), 0);
    }
}
