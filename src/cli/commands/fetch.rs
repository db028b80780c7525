//! The `fetch` command: a one-shot client of the album art service.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::protocol::{AlbumArtService, ArtReply};

/// Fetch the art for `identifier` and write or summarize it.
pub fn cmd_fetch(
    rt: &Runtime,
    config: &Config,
    identifier: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = AlbumArtService::from_config(config)?;
        let image = download(&service, identifier).await?;

        match output {
            Some(path) => {
                tokio::fs::write(path, &image).await?;
                println!("Wrote {} bytes to {:?}", image.len(), path);
            }
            None => println!("{}: {} bytes of album art", identifier, image.len()),
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Request chunks from offset 0 until the whole image has arrived.
async fn download(service: &AlbumArtService, identifier: &str) -> anyhow::Result<Vec<u8>> {
    let mut image = Vec::new();
    loop {
        let offset = image.len() as u64;
        let (total_size, data) = match service.albumart(identifier, offset).await {
            ArtReply::Chunk { total_size, data } => (total_size, data),
            ArtReply::NoArt => anyhow::bail!("No album art for {}", identifier),
        };

        if data.is_empty() && offset < total_size {
            anyhow::bail!("Transfer of {} stalled at offset {}", identifier, offset);
        }
        image.extend_from_slice(&data);

        if image.len() as u64 >= total_size {
            return Ok(image);
        }
    }
}
