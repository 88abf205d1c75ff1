//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Desktop network monitor implementation
///
/// Reachability is a TCP connect to a well-known address. Desktop
/// connections are reported as unmetered and of type `Other`.
#[derive(Clone)]
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
    poll_interval: Duration,
    last_info: Arc<Mutex<Option<NetworkInfo>>>,
}

impl DesktopNetworkMonitor {
    pub fn new() -> Self {
        Self {
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            last_info: Arc::new(Mutex::new(None)),
        }
    }

    /// Probe a different `host:port` for reachability
    pub fn with_probe_addr(mut self, addr: impl Into<String>) -> Self {
        self.probe_addr = addr.into();
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Interval between polls in [`NetworkMonitor::subscribe_changes`] streams
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Most recent result of a probe, if any ran
    pub async fn last_known(&self) -> Option<NetworkInfo> {
        self.last_info.lock().await.clone()
    }

    async fn probe(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.probe().await;
        let info = match status {
            NetworkStatus::Connected => NetworkInfo::connected(Some(NetworkType::Other)),
            _ => NetworkInfo::disconnected(),
        };

        *self.last_info.lock().await = Some(info.clone());
        debug!(status = ?status, probe = %self.probe_addr, "Network info updated");

        Ok(info)
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        let last_status = self.last_known().await.map(|info| info.status);
        Ok(Box::new(DesktopNetworkChangeStream {
            monitor: self.clone(),
            last_status,
        }))
    }
}

/// Polling stream that yields only when the status flips
struct DesktopNetworkChangeStream {
    monitor: DesktopNetworkMonitor,
    last_status: Option<NetworkStatus>,
}

#[async_trait]
impl NetworkChangeStream for DesktopNetworkChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            if let Ok(info) = self.monitor.get_network_info().await {
                if self.last_status != Some(info.status) {
                    self.last_status = Some(info.status);
                    return Some(info);
                }
            }
            tokio::time::sleep(self.monitor.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reachable_probe_reports_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let monitor = DesktopNetworkMonitor::new().with_probe_addr(addr.to_string());

        let info = monitor.get_network_info().await.unwrap();
        assert!(info.is_online());
        assert!(monitor.is_connected().await);
        assert_eq!(monitor.last_known().await, Some(info));
    }

    #[tokio::test]
    async fn test_unreachable_probe_reports_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let monitor = DesktopNetworkMonitor::new()
            .with_probe_addr(addr.to_string())
            .with_probe_timeout(Duration::from_millis(500));

        let info = monitor.get_network_info().await.unwrap();
        assert_eq!(info.status, NetworkStatus::Disconnected);
        assert!(!info.is_metered);
        assert!(!monitor.is_connected().await);
    }

    #[tokio::test]
    async fn test_change_stream_yields_initial_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let monitor = DesktopNetworkMonitor::new()
            .with_probe_addr(addr.to_string())
            .with_poll_interval(Duration::from_millis(10));

        let mut stream = monitor.subscribe_changes().await.unwrap();
        let info = stream.next().await.unwrap();
        assert!(info.is_online());
    }
}
