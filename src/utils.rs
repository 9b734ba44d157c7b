use once_cell::sync::Lazy;
use std::future::Future;
use tokio::task::JoinHandle;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

/// Aborts the wrapped task when dropped, tying it to the owner's lifetime.
#[derive(Debug)]
pub struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(fut))
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        format!("http://{}", trimmed)
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn adds_missing_scheme() {
        assert_eq!(normalize_url(" chat.example.com "), "https://chat.example.com");
        assert_eq!(normalize_url("localhost:3001"), "http://localhost:3001");
        assert_eq!(normalize_url("http://10.0.0.2:3001"), "http://10.0.0.2:3001");
        assert_eq!(normalize_url("  "), "");
    }

    #[tokio::test]
    async fn guard_aborts_on_drop() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let guard = TaskGuard::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            let _ = tx.send(());
        });
        drop(guard);
        // sender dropped by the abort, never sent
        assert!(rx.await.is_err());
    }
}
