use clap::Parser;
use common::ShutdownMessage;
use proxy::config::AdapterArgs;
use proxy::executor::Executor;
use proxy::ratelimit::RateLimiter;
use proxy::server::connection;
use proxy::store::redis_store::RedisStore;
use proxy::store::BackingStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

async fn shutdown_signal() -> ShutdownMessage {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl+c handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => ShutdownMessage::Cancel("ctrl_c".to_string()),
        _ = terminate => ShutdownMessage::Cancel("sigterm".to_string()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AdapterArgs::parse();

    common::init_tracing(&args.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("mini-mysql-redis")
        .build()?;

    info!(?args, "starting mini-mysql-redis adapter");

    runtime.block_on(async move {
        let store: Arc<dyn BackingStore> = match RedisStore::connect(&args.redis_url) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                error!(error = %e, "failed to construct redis connection pool");
                std::process::exit(1);
            }
        };

        if let Err(e) = store.ping().await {
            error!(error = %e, "backing store unreachable at startup");
            std::process::exit(1);
        }

        let listener = match TcpListener::bind(args.listen_addr()).await {
            Ok(l) => l,
            Err(e) => {
                error!(port = args.port, error = %e, "failed to bind listener");
                std::process::exit(1);
            }
        };

        let limiter = Arc::new(RateLimiter::new(args.rate_limit, args.rate_window));
        let executor = Arc::new(Executor::new(Arc::clone(&store), &args));

        let (shutdown_tx, _shutdown_rx) = watch::channel(ShutdownMessage::Init);

        loop {
            tokio::select! {
                shutdown_msg = shutdown_signal() => {
                    let _ = shutdown_tx.send(shutdown_msg);
                    info!("shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let client_ip = addr.ip().to_string();
                            let store = Arc::clone(&store);
                            let limiter = Arc::clone(&limiter);
                            let executor = Arc::clone(&executor);
                            tokio::spawn(async move {
                                let (reader, writer) = stream.into_split();
                                if let Err(e) = connection::serve(reader, writer, client_ip, store, limiter, executor).await {
                                    warn!(error = %e, "connection ended with error");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
            }
        }

        Ok(())
    })
}
