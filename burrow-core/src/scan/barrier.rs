use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Counts outstanding work units of one depth level.
///
/// Every unit arrives exactly once, whether it produced an outcome, failed,
/// or was skipped because the crawl was cancelled. `wait` resolves once the
/// count reaches zero.
#[derive(Debug)]
pub struct DepthBarrier {
    remaining: AtomicUsize,
    notify: Notify,
}

impl DepthBarrier {
    pub fn new(units: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(units),
            notify: Notify::new(),
        }
    }

    /// # Panics
    ///
    /// Panics when more units arrive than were registered.
    pub fn arrive(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => panic!("depth barrier: more arrivals than registered units"),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_barrier_is_open() {
        let barrier = DepthBarrier::new(0);
        barrier.wait().await;
    }

    #[tokio::test]
    async fn test_wait_resolves_after_last_arrival() {
        let barrier = Arc::new(DepthBarrier::new(3));

        let mut handles = Vec::new();
        for i in 0..3u64 {
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5 * i)).await;
                barrier.arrive();
            }));
        }

        tokio::time::timeout(Duration::from_secs(5), barrier.wait())
            .await
            .expect("barrier never opened");
        assert_eq!(barrier.remaining(), 0);

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_wait_blocks_while_units_outstanding() {
        let barrier = DepthBarrier::new(2);
        barrier.arrive();
        let result = tokio::time::timeout(Duration::from_millis(20), barrier.wait()).await;
        assert!(result.is_err());
        assert_eq!(barrier.remaining(), 1);
    }

    #[test]
    #[should_panic(expected = "more arrivals")]
    fn test_extra_arrival_panics() {
        let barrier = DepthBarrier::new(1);
        barrier.arrive();
        barrier.arrive();
    }
}
