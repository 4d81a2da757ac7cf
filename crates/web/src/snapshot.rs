//! Domain snapshot store and its refresh loop
//!
//! A single refresh task owns the hypervisor connection and publishes
//! complete [`DomainSnapshot`]s; request handlers only ever read the latest
//! published one.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use yak_common::config::HypervisorConfig;
use yak_common::{DomainFilter, DomainSnapshot, Error, Hypervisor, Result};

/// Latest published domain snapshot.
///
/// The lock only guards the `Arc` swap; snapshots are built before the
/// write lock is taken, so readers never wait on the hypervisor.
#[derive(Debug)]
pub struct DomainSnapshotStore {
    current: RwLock<Arc<DomainSnapshot>>,
}

impl DomainSnapshotStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(DomainSnapshot::empty())),
        }
    }

    /// Most recently published snapshot
    pub fn current(&self) -> Arc<DomainSnapshot> {
        self.current.read().clone()
    }

    /// Replace the snapshot with `names` in one swap
    pub fn publish(&self, names: Vec<String>) -> Arc<DomainSnapshot> {
        let mut current = self.current.write();
        let next = Arc::new(DomainSnapshot::new(names, current.generation + 1));
        *current = next.clone();
        next
    }
}

impl Default for DomainSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically refreshes a [`DomainSnapshotStore`] from a hypervisor
pub struct SnapshotRefresher<H> {
    hypervisor: H,
    store: Arc<DomainSnapshotStore>,
    filter: DomainFilter,
    interval: Duration,
    timeout: Duration,
}

impl<H: Hypervisor> SnapshotRefresher<H> {
    pub fn new(hypervisor: H, store: Arc<DomainSnapshotStore>, config: &HypervisorConfig) -> Self {
        Self {
            hypervisor,
            store,
            filter: DomainFilter::from_active_only(config.active_only),
            interval: config.refresh_interval(),
            timeout: config.refresh_timeout(),
        }
    }

    /// Run one refresh cycle.
    ///
    /// On error or timeout the store keeps its previous snapshot.
    pub async fn refresh(&self) -> Result<Arc<DomainSnapshot>> {
        let names = tokio::time::timeout(self.timeout, self.collect_names())
            .await
            .map_err(|_| Error::Timeout {
                millis: self.timeout.as_millis() as u64,
            })??;

        let snapshot = self.store.publish(names);
        debug!(
            "Published domain snapshot {} ({} domains)",
            snapshot.generation,
            snapshot.len()
        );
        Ok(snapshot)
    }

    async fn collect_names(&self) -> Result<Vec<String>> {
        let domains = self.hypervisor.list_domains(self.filter).await?;

        let mut names = Vec::with_capacity(domains.len());
        for domain in &domains {
            match self.hypervisor.domain_name(domain).await {
                Ok(name) => names.push(name),
                Err(e) => warn!("Skipping domain {}: {}", domain, e),
            }
        }
        Ok(names)
    }

    /// Refresh on a fixed interval until `shutdown` fires, then hand the
    /// hypervisor connection back to the caller.
    pub async fn run(self, shutdown: CancellationToken) -> H {
        info!("Domain refresh loop started (every {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        warn!("Domain refresh failed, keeping previous snapshot: {}", e);
                    }
                }
            }
        }

        info!("Domain refresh loop stopped");
        self.hypervisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use yak_common::DomainRef;

    /// One scripted `list_domains` answer: (id, name) pairs, `None` name = lookup fails
    type Tick = Result<Vec<(&'static str, Option<&'static str>)>>;

    struct ScriptedHypervisor {
        ticks: Mutex<VecDeque<Tick>>,
        names: Mutex<Vec<(&'static str, Option<&'static str>)>>,
        delay: Option<Duration>,
    }

    impl ScriptedHypervisor {
        fn new(ticks: Vec<Tick>) -> Self {
            Self {
                ticks: Mutex::new(ticks.into()),
                names: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(vec![Ok(vec![("1", Some("web1"))])])
            }
        }
    }

    #[async_trait]
    impl Hypervisor for ScriptedHypervisor {
        async fn list_domains(&self, _filter: DomainFilter) -> Result<Vec<DomainRef>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let tick = self
                .ticks
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Hypervisor("script exhausted".into())))?;
            let refs = tick.iter().map(|(id, _)| DomainRef::new(*id)).collect();
            *self.names.lock() = tick;
            Ok(refs)
        }

        async fn domain_name(&self, domain: &DomainRef) -> Result<String> {
            let names = self.names.lock();
            match names.iter().find(|(id, _)| *id == domain.as_str()) {
                Some((_, Some(name))) => Ok(name.to_string()),
                _ => Err(Error::DomainLookup {
                    domain: domain.to_string(),
                    reason: "domain vanished".into(),
                }),
            }
        }
    }

    fn refresher(hv: ScriptedHypervisor) -> (SnapshotRefresher<ScriptedHypervisor>, Arc<DomainSnapshotStore>) {
        let store = Arc::new(DomainSnapshotStore::new());
        let config = HypervisorConfig {
            refresh_interval_ms: 10,
            refresh_timeout_ms: 50,
            ..Default::default()
        };
        (SnapshotRefresher::new(hv, store.clone(), &config), store)
    }

    #[tokio::test]
    async fn test_removed_domain_disappears_on_next_tick() {
        let (refresher, store) = refresher(ScriptedHypervisor::new(vec![
            Ok(vec![("1", Some("web1")), ("2", Some("db1"))]),
            Ok(vec![("1", Some("web1"))]),
        ]));

        assert!(store.current().is_empty());

        refresher.refresh().await.unwrap();
        assert_eq!(store.current().names, vec!["web1", "db1"]);

        refresher.refresh().await.unwrap();
        assert_eq!(store.current().names, vec!["web1"]);
        assert_eq!(store.current().generation, 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let (refresher, store) = refresher(ScriptedHypervisor::new(vec![
            Ok(vec![("1", Some("web1")), ("2", Some("db1"))]),
            Err(Error::Hypervisor("libvirtd went away".into())),
        ]));

        refresher.refresh().await.unwrap();
        let before = store.current();

        assert!(refresher.refresh().await.is_err());
        assert_eq!(store.current(), before);
        assert_eq!(store.current().names, vec!["web1", "db1"]);
    }

    #[tokio::test]
    async fn test_name_lookup_failure_skips_domain() {
        let (refresher, store) = refresher(ScriptedHypervisor::new(vec![Ok(vec![
            ("1", Some("web1")),
            ("2", None),
            ("3", Some("db1")),
        ])]));

        refresher.refresh().await.unwrap();
        assert_eq!(store.current().names, vec!["web1", "db1"]);
    }

    #[tokio::test]
    async fn test_timeout_keeps_previous_snapshot() {
        let (refresher, store) = refresher(ScriptedHypervisor::slow(Duration::from_secs(5)));
        store.publish(vec!["web1".into()]);

        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(err, Error::Timeout { millis: 50 }));
        assert_eq!(store.current().names, vec!["web1"]);
        assert_eq!(store.current().generation, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_returns_connection() {
        let (refresher, store) = refresher(ScriptedHypervisor::new(vec![
            Ok(vec![("1", Some("web1"))]),
            Ok(vec![("1", Some("web1")), ("2", Some("db1"))]),
        ]));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(refresher.run(shutdown.clone()));

        for _ in 0..200 {
            if store.current().generation >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        let hv = handle.await.unwrap();

        assert_eq!(store.current().names, vec!["web1", "db1"]);
        assert!(hv.ticks.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_mixed_snapshots() {
        let store = Arc::new(DomainSnapshotStore::new());
        let first: Vec<String> = (0..64).map(|i| format!("a{}", i)).collect();
        let second: Vec<String> = (0..64).map(|i| format!("b{}", i)).collect();
        store.publish(first.clone());

        let writer = {
            let store = store.clone();
            let (first, second) = (first.clone(), second.clone());
            tokio::spawn(async move {
                for i in 0..500 {
                    let names = if i % 2 == 0 { second.clone() } else { first.clone() };
                    store.publish(names);
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                let (first, second) = (first.clone(), second.clone());
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let snap = store.current();
                        assert!(snap.names == first || snap.names == second);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.current().generation, 501);
    }
}
