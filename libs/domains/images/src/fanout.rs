//! Run two fallible branches concurrently with a shared cancellation signal.

use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::error::{ImageError, ImageResult};

enum Branch<A, B> {
    First(ImageResult<A>),
    Second(ImageResult<B>),
    Cancelled,
}

/// Await `first` and `second` concurrently.
///
/// Both results are returned when both succeed. The first branch to fail
/// flips the shared cancellation signal, the sibling stops at its next await
/// point, and that first error is returned. Dropping the returned future
/// aborts both branches.
pub async fn try_join_cancellable<A, B, FA, FB>(first: FA, second: FB) -> ImageResult<(A, B)>
where
    A: Send + 'static,
    B: Send + 'static,
    FA: Future<Output = ImageResult<A>> + Send + 'static,
    FB: Future<Output = ImageResult<B>> + Send + 'static,
{
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut branches = JoinSet::new();

    let mut cancelled = cancel_rx.clone();
    branches.spawn(async move {
        tokio::select! {
            _ = cancelled.wait_for(|c| *c) => Branch::Cancelled,
            result = first => Branch::First(result),
        }
    });

    let mut cancelled = cancel_rx;
    branches.spawn(async move {
        tokio::select! {
            _ = cancelled.wait_for(|c| *c) => Branch::Cancelled,
            result = second => Branch::Second(result),
        }
    });

    let (mut a, mut b) = (None, None);
    while let Some(joined) = branches.join_next().await {
        let failure = match joined {
            Ok(Branch::First(Ok(value))) => {
                a = Some(value);
                continue;
            }
            Ok(Branch::Second(Ok(value))) => {
                b = Some(value);
                continue;
            }
            Ok(Branch::Cancelled) => continue,
            Ok(Branch::First(Err(e))) | Ok(Branch::Second(Err(e))) => e,
            Err(join_error) => ImageError::Internal(format!("Branch task failed: {}", join_error)),
        };

        let _ = cancel_tx.send(true);
        branches.abort_all();
        return Err(failure);
    }

    match (a, b) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ImageError::Internal(
            "Concurrent branch finished without a result".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_both_succeed() {
        let (a, b) = try_join_cancellable(async { Ok(1u8) }, async { Ok("two") })
            .await
            .unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, "two");
    }

    #[tokio::test]
    async fn test_first_error_cancels_slow_sibling() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let started = std::time::Instant::now();
        let result = try_join_cancellable(
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err::<(), _>(ImageError::Embedding("model offline".to_string()))
            },
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(ImageError::Embedding(msg)) if msg == "model offline"));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_second_branch_error_is_returned() {
        let result = try_join_cancellable(
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
            async { Err::<(), _>(ImageError::Storage("bucket missing".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(ImageError::Storage(_))));
    }

    #[tokio::test]
    async fn test_earliest_failure_wins() {
        let result = try_join_cancellable(
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err::<(), _>(ImageError::Embedding("late".to_string()))
            },
            async { Err::<(), _>(ImageError::Storage("early".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(ImageError::Storage(msg)) if msg == "early"));
    }

    #[tokio::test]
    async fn test_panicking_branch_is_internal_error() {
        let result = try_join_cancellable(
            async { Ok(()) },
            async {
                if true {
                    panic!("boom");
                }
                Ok::<(), ImageError>(())
            },
        )
        .await;

        assert!(matches!(result, Err(ImageError::Internal(_))));
    }
}
