use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde_json::{json, Value};

use super::fetcher::FetchResult;

const BROKEN_SERVER: &str = "broken server";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResult {
    pub server: String,
    pub ip: FetchResult,
}

/// Per-server results of querying every configured endpoint once.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyReport {
    results: Vec<ServerResult>,
}

impl ConsistencyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the result for `server`, replacing an earlier one.
    pub fn record(&mut self, server: &str, ip: FetchResult) {
        match self.results.iter_mut().find(|r| r.server == server) {
            Some(existing) => existing.ip = ip,
            None => self.results.push(ServerResult {
                server: server.to_string(),
                ip,
            }),
        }
    }

    pub fn results(&self) -> &[ServerResult] {
        &self.results
    }

    pub fn get(&self, server: &str) -> Option<FetchResult> {
        self.results
            .iter()
            .find(|r| r.server == server)
            .map(|r| r.ip)
    }

    pub fn server_count(&self) -> usize {
        self.results.len()
    }

    /// Number of servers per distinct result, `None` counting failures.
    pub fn frequencies(&self) -> BTreeMap<FetchResult, usize> {
        let mut counts = BTreeMap::new();
        for result in &self.results {
            *counts.entry(result.ip).or_insert(0) += 1;
        }
        counts
    }

    pub fn failed(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.ip.is_none())
            .map(|r| r.server.as_str())
            .collect()
    }

    /// The single address every server agreed on, if there is one.
    pub fn consensus(&self) -> Option<Ipv4Addr> {
        let mut values = self.frequencies().into_keys();
        match (values.next(), values.next()) {
            (Some(Some(ip)), None) => Some(ip),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        let results: serde_json::Map<String, Value> = self
            .results
            .iter()
            .map(|r| (r.server.clone(), json!(r.ip)))
            .collect();

        let frequencies: serde_json::Map<String, Value> = self
            .frequencies()
            .into_iter()
            .map(|(ip, count)| (label(ip), json!(count)))
            .collect();

        json!({
            "servers": self.server_count(),
            "results": results,
            "frequencies": frequencies,
            "failed": self.failed(),
            "consensus": self.consensus(),
        })
    }
}

fn label(ip: FetchResult) -> String {
    match ip {
        Some(ip) => ip.to_string(),
        None => BROKEN_SERVER.to_string(),
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of servers: {}", self.server_count())?;
        writeln!(f, "IP's:")?;

        for (ip, count) in self.frequencies() {
            let noun = if count == 1 {
                "occurrence"
            } else {
                "occurrences"
            };
            writeln!(f, "{} = {} {}", label(ip), count, noun)?;
        }

        let failed = self.failed();
        if !failed.is_empty() {
            writeln!(f)?;
            writeln!(f, "________list of failed servers_______")?;
            for server in failed {
                writeln!(f, "{}", server)?;
            }
        }

        Ok(())
    }
}
