//! Subscriber registrations and client presence.

use serde::{Deserialize, Serialize};

/// A live subscriber process registered against a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisteredService {
    pub component_name: String,
    pub friendly_name: String,
    /// Base URL; refresh notifications go to `{callback_base_url}/refresh`.
    pub callback_base_url: String,
    /// Unix seconds of the last registration.
    pub last_updated: u64,
    pub subscriber_client_id: String,
}

impl RegisteredService {
    /// Two entries describe the same subscriber when they share a client id,
    /// or, lacking one, the same callback URL.
    pub fn same_subscriber(&self, other: &RegisteredService) -> bool {
        if !self.subscriber_client_id.is_empty() || !other.subscriber_client_id.is_empty() {
            return self.subscriber_client_id == other.subscriber_client_id;
        }
        self.callback_base_url == other.callback_base_url
    }

    pub fn is_stale(&self, now: u64, threshold_secs: u64) -> bool {
        now.saturating_sub(self.last_updated) > threshold_secs
    }
}

/// A recently seen client of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveClient {
    pub client_id: String,
    /// Unix seconds.
    pub last_activity: u64,
}

impl ActiveClient {
    pub fn is_stale(&self, now: u64, threshold_secs: u64) -> bool {
        now.saturating_sub(self.last_activity) > threshold_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(client_id: &str, url: &str) -> RegisteredService {
        RegisteredService {
            subscriber_client_id: client_id.into(),
            callback_base_url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_subscriber() {
        assert!(service("a", "http://x").same_subscriber(&service("a", "http://y")));
        assert!(!service("a", "http://x").same_subscriber(&service("b", "http://x")));
        assert!(service("", "http://x").same_subscriber(&service("", "http://x")));
        assert!(!service("", "http://x").same_subscriber(&service("a", "http://x")));
    }

    #[test]
    fn test_staleness() {
        let mut svc = service("a", "http://x");
        svc.last_updated = 100;
        assert!(!svc.is_stale(150, 60));
        assert!(svc.is_stale(161, 60));

        let client = ActiveClient { client_id: "c".into(), last_activity: 200 };
        assert!(!client.is_stale(100, 10));
    }
}
