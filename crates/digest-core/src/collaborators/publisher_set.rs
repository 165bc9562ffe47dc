//! [`PublisherSet`] broadcasts a publish to every registered sink, since
//! Aggregate requires *all* publishers to succeed before `MarkPublished`.

use std::sync::Arc;

use super::trait_def::Publisher;

/// A fixed collection of [`Publisher`]s, all of which must succeed for the
/// digest to be considered published.
#[derive(Default)]
pub struct PublisherSet {
    publishers: Vec<Arc<dyn Publisher>>,
}

impl PublisherSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, publisher: Arc<dyn Publisher>) {
        self.publishers.push(publisher);
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// Publish to every registered sink. Returns the name of the first
    /// publisher that failed, with its error, or `Ok(())` if all
    /// succeeded. Aggregate treats any failure as "retry the whole
    /// Aggregate phase on the next tick" -- it does not track partial
    /// per-publisher success across ticks.
    pub async fn publish_all(&self, markdown: &str, date: chrono::NaiveDate) -> anyhow::Result<()> {
        for publisher in &self.publishers {
            publisher
                .publish(markdown, date)
                .await
                .map_err(|e| anyhow::anyhow!("publisher {} failed: {e}", publisher.name()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPublisher {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for CountingPublisher {
        fn name(&self) -> &str {
            "counting"
        }

        async fn publish(&self, _markdown: &str, _date: chrono::NaiveDate) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("simulated failure");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn publish_all_calls_every_publisher() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = PublisherSet::new();
        set.add(Arc::new(CountingPublisher {
            calls: calls.clone(),
            fail: false,
        }));
        set.add(Arc::new(CountingPublisher {
            calls: calls.clone(),
            fail: false,
        }));

        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
        set.publish_all("# digest", date).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn publish_all_stops_and_errors_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = PublisherSet::new();
        set.add(Arc::new(CountingPublisher {
            calls: calls.clone(),
            fail: true,
        }));

        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
        let err = set.publish_all("# digest", date).await.unwrap_err();
        assert!(err.to_string().contains("counting"));
    }
}
