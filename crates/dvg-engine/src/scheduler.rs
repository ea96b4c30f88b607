use async_trait::async_trait;

/// Cooperative yield point used between units of engine work.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn yield_now(&self);
}

/// Yields to the tokio scheduler so other tasks on the same worker can run.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }
}

/// Never yields. For batch contexts with nothing to interleave with.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

#[async_trait]
impl Scheduler for ImmediateScheduler {
    async fn yield_now(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(flavor = "current_thread")]
    async fn tokio_scheduler_lets_other_tasks_run() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

        TokioScheduler.yield_now().await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn immediate_scheduler_is_a_no_op() {
        ImmediateScheduler.yield_now().await;
    }
}
