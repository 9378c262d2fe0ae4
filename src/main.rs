use std::{env, io, process, sync::Arc};

use chrono::Utc;
use log::{error, info};
use tokio::net::TcpListener;

use events_ics::{
    cache::RecordCache,
    export,
    server::{self, AppState},
    BackendConfig, Encoder, EncoderConfig, SupabaseStore,
};

mod cli;

#[tokio::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = cli::parse(env::args().skip(1).collect());

    let source = match BackendConfig::from_env().map(SupabaseStore::new) {
        Ok(Ok(source)) => source,
        Ok(Err(err)) => {
            eprintln!("Failed to set up upstream client: {err}");
            process::exit(1);
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let encoder = Encoder::new(EncoderConfig {
        time_zone: args.time_zone,
        product_id: args.product_id,
        ..Default::default()
    });

    if let Some(dir) = args.export_dir {
        let today = Utc::now().with_timezone(&args.time_zone).date_naive();
        return match export::export_upcoming(&source, &encoder, today, args.export_limit, &dir).await
        {
            Ok(summary) => {
                println!("Wrote {} files to {}", summary.written.len(), dir.display());
                Ok(())
            }
            Err(err) => {
                error!("Export failed: {err}");
                process::exit(1);
            }
        };
    }

    let cache = if args.enable_cache {
        RecordCache::with_ttl(args.cache_ttl)
    } else {
        RecordCache::disabled()
    };
    if cache.is_enabled() {
        info!("Caching events for {}s", args.cache_ttl.as_secs());
    }

    let router = server::router(Arc::new(AppState {
        source,
        encoder,
        cache,
    }));

    let listener = TcpListener::bind(args.address).await?;
    info!("Listening at http://{}", args.address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "events_ics=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}
