//! The `serve` command.

use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

use crate::config::Config;
use crate::error::ResultExt;
use crate::protocol::server::spawn_idle_sweep;
use crate::protocol::{AlbumArtService, Server};

/// Run the album art server until Ctrl-C.
pub fn cmd_serve(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = Arc::new(AlbumArtService::from_config(config)?);

        let sweeper = config.cache.idle_limit().map(|max_idle| {
            info!(
                "Dropping art transfers idle for more than {:?} (checked every {:?})",
                max_idle,
                config.cache.sweep_interval()
            );
            spawn_idle_sweep(service.cache().clone(), max_idle, config.cache.sweep_interval())
        });

        let server = Server::bind(
            &config.server.bind,
            service.clone(),
            &config.server.protocol_version,
        )
        .await
        .with_context(format!("Failed to bind {}", config.server.bind))?;

        println!("Serving album art on {}", server.local_addr()?);
        server
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await?;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        Ok::<(), anyhow::Error>(())
    })
}
