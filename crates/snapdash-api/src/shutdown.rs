//! Signal-driven shutdown with a bounded drain.
//!
//! After SIGINT or SIGTERM the listener closes and in-flight requests get
//! up to the drain timeout to finish. Realtime sockets never finish on
//! their own, so the drain deadline is what closes them.

use std::future::{Future, IntoFuture};
use std::io;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GracefulShutdown {
    pub drain_timeout: Duration,
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new(DEFAULT_DRAIN_TIMEOUT)
    }
}

impl GracefulShutdown {
    pub fn new(drain_timeout: Duration) -> Self {
        Self { drain_timeout }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
        })
    }
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() -> ShutdownSignal {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownSignal::Interrupt,
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGINT");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                ShutdownSignal::Terminate
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<ShutdownSignal>();

    tokio::select! {
        signal = interrupt => signal,
        signal = terminate => signal,
    }
}

/// Serve on `0.0.0.0:port` until SIGINT/SIGTERM, then drain
pub async fn serve_with_shutdown(
    router: axum::Router,
    port: u16,
    shutdown: GracefulShutdown,
) -> io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!(
        port,
        drain_timeout = ?shutdown.drain_timeout,
        "Dashboard listening; OpenAPI at /api-docs/openapi.json"
    );

    serve_until(listener, router, shutdown.drain_timeout, async {
        let signal = shutdown_signal().await;
        tracing::info!(%signal, "Shutting down");
    })
    .await
}

/// Serve until `signal` resolves, then wait at most `drain_timeout` for
/// open connections before returning.
pub async fn serve_until<F>(
    listener: TcpListener,
    router: axum::Router,
    drain_timeout: Duration,
    signal: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stopping_tx, stopping_rx) = oneshot::channel::<()>();

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            signal.await;
            let _ = stopping_tx.send(());
        })
        .into_future();

    let deadline = async move {
        match stopping_rx.await {
            Ok(()) => tokio::time::sleep(drain_timeout).await,
            // Server ended without a signal; let its result win
            Err(_) => std::future::pending().await,
        }
    };

    tokio::select! {
        result = server => {
            result?;
            tracing::info!("All connections drained");
        }
        () = deadline => {
            tracing::warn!(?drain_timeout, "Drain timed out, closing remaining connections");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[test]
    fn test_default_drain_timeout() {
        assert_eq!(GracefulShutdown::default().drain_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn test_serve_until_stops_on_signal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let router = axum::Router::new().route("/", get(|| async { "ok" }));
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(serve_until(
            listener,
            router,
            Duration::from_secs(5),
            async move {
                let _ = rx.await;
            },
        ));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_drain_deadline_closes_open_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = axum::Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }),
        );
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(serve_until(
            listener,
            router,
            Duration::from_millis(100),
            async move {
                let _ = rx.await;
            },
        ));

        // Hold one request open across the signal
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(
            &mut stream,
            b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n",
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("drain deadline not enforced")
            .unwrap();
        assert!(result.is_ok());
    }
}
