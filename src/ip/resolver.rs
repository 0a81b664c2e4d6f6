use anyhow::Result;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use super::fetcher::{FetchResult, Fetcher, HttpFetcher};
use super::report::ConsistencyReport;
use crate::config::Settings;

/// Looks up the external address through a fixed list of echo servers.
pub struct IpGetter<F = HttpFetcher> {
    servers: Vec<String>,
    fetcher: F,
    max_attempts: usize,
}

impl IpGetter<HttpFetcher> {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let fetcher = HttpFetcher::new(&settings.fetch)?;
        Ok(Self::new(
            settings.servers.clone(),
            fetcher,
            settings.fetch.max_attempts,
        ))
    }
}

impl<F: Fetcher> IpGetter<F> {
    pub fn new(servers: Vec<String>, fetcher: F, max_attempts: usize) -> Self {
        Self {
            servers,
            fetcher,
            max_attempts,
        }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    fn pick_server(&self) -> Option<&str> {
        self.servers
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// Asks randomly chosen servers until one reports an address, giving up
    /// after `max_attempts` tries. Servers may repeat between attempts.
    pub async fn resolve(&self) -> FetchResult {
        for attempt in 1..=self.max_attempts {
            let Some(server) = self.pick_server() else {
                warn!("No servers configured");
                return None;
            };

            debug!("Attempt {}/{}: {}", attempt, self.max_attempts, server);
            if let Some(ip) = self.fetcher.fetch(server).await {
                return Some(ip);
            }
        }

        warn!(
            "No external IP found after {} attempts",
            self.max_attempts
        );
        None
    }

    /// Queries every server exactly once, in order. All results should agree.
    pub async fn consistency_check(&self) -> ConsistencyReport {
        let mut report = ConsistencyReport::new();

        for server in &self.servers {
            let ip = self.fetcher.fetch(server).await;
            report.record(server, ip);
        }

        info!(
            "Checked {} servers, {} failed",
            report.server_count(),
            report.failed().len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    const IP: Ipv4Addr = Ipv4Addr::new(1, 2, 3, 4);

    /// Fails the first `failures` calls, then answers with `IP`.
    struct FlakyFetcher {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyFetcher {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, _endpoint: &str) -> FetchResult {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (call >= self.failures).then_some(IP)
        }
    }

    /// Answers from a fixed table and remembers every endpoint it was asked.
    struct TableFetcher {
        answers: HashMap<String, FetchResult>,
        seen: Mutex<Vec<String>>,
    }

    impl TableFetcher {
        fn new(answers: &[(&str, FetchResult)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(server, ip)| (server.to_string(), *ip))
                    .collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Fetcher for TableFetcher {
        async fn fetch(&self, endpoint: &str) -> FetchResult {
            self.seen.lock().unwrap().push(endpoint.to_string());
            self.answers.get(endpoint).copied().flatten()
        }
    }

    fn servers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_resolve_first_try() {
        let getter = IpGetter::new(servers(&["A", "B"]), FlakyFetcher::new(0), 5);
        assert_eq!(getter.resolve().await, Some(IP));
        assert_eq!(getter.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolve_retries_until_success() {
        for failures in 1..5 {
            let getter = IpGetter::new(servers(&["A", "B", "C"]), FlakyFetcher::new(failures), 5);
            assert_eq!(getter.resolve().await, Some(IP));
            assert_eq!(getter.fetcher.calls(), failures + 1);
        }
    }

    #[tokio::test]
    async fn test_resolve_gives_up_after_max_attempts() {
        let getter = IpGetter::new(servers(&["A", "B", "C"]), FlakyFetcher::new(usize::MAX), 5);
        assert_eq!(getter.resolve().await, None);
        assert_eq!(getter.fetcher.calls(), 5);
    }

    #[tokio::test]
    async fn test_resolve_fifth_attempt_succeeds() {
        let getter = IpGetter::new(servers(&["A"]), FlakyFetcher::new(4), 5);
        assert_eq!(getter.resolve().await, Some(IP));
        assert_eq!(getter.fetcher.calls(), 5);
    }

    #[tokio::test]
    async fn test_resolve_without_servers() {
        let getter = IpGetter::new(Vec::new(), FlakyFetcher::new(0), 5);
        assert_eq!(getter.resolve().await, None);
        assert_eq!(getter.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_resolve_only_uses_configured_servers() {
        let fetcher = TableFetcher::new(&[("A", None), ("B", None)]);
        let getter = IpGetter::new(servers(&["A", "B"]), fetcher, 5);

        assert_eq!(getter.resolve().await, None);
        let seen = getter.fetcher.seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|s| s == "A" || s == "B"));
    }

    #[tokio::test]
    async fn test_consistency_check() {
        let fetcher = TableFetcher::new(&[("A", Some(IP)), ("B", Some(IP)), ("C", None)]);
        let getter = IpGetter::new(servers(&["A", "B", "C"]), fetcher, 5);

        let report = getter.consistency_check().await;

        assert_eq!(*getter.fetcher.seen.lock().unwrap(), servers(&["A", "B", "C"]));
        assert_eq!(report.server_count(), 3);
        assert_eq!(report.get("A"), Some(Some(IP)));
        assert_eq!(report.get("C"), Some(None));

        let frequencies = report.frequencies();
        assert_eq!(frequencies[&Some(IP)], 2);
        assert_eq!(frequencies[&None], 1);
        assert_eq!(report.failed(), vec!["C"]);
    }

    #[tokio::test]
    async fn test_consistency_check_does_not_retry() {
        let getter = IpGetter::new(servers(&["A", "B", "C", "D"]), FlakyFetcher::new(usize::MAX), 5);

        let report = getter.consistency_check().await;

        assert_eq!(getter.fetcher.calls(), 4);
        assert_eq!(report.failed().len(), 4);
        assert_eq!(report.frequencies().values().sum::<usize>(), 4);
    }

    #[test]
    fn test_from_settings() {
        let getter = IpGetter::from_settings(&Settings::default()).unwrap();
        assert_eq!(getter.servers().len(), 27);
        assert_eq!(getter.max_attempts, 5);
    }
}
