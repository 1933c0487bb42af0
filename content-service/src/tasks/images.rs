use base64::{Engine as _, engine::general_purpose::STANDARD};
use content_kit::{ContentSection, DocumentRequest, FooterCell, ImageSource};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use std::net::IpAddr;
use tracing::{info, warn};

/// Downloads every remote image in `request` and inlines it.
///
/// Only public `http`/`https` URLs are fetched, and bodies over `max_bytes`
/// are refused. A failed download leaves the source untouched; the generator
/// then skips that image. Returns the number of images resolved.
pub async fn resolve_remote_images(
    client: &reqwest::Client,
    request: &mut DocumentRequest,
    max_bytes: usize,
) -> usize {
    let mut resolved = 0;

    for source in image_sources(request) {
        let ImageSource::Remote { url } = source else {
            continue;
        };
        let url = url.clone();

        match fetch_image(client, &url, max_bytes).await {
            Ok(inline) => {
                *source = inline;
                resolved += 1;
            }
            Err(e) => warn!(url = %url, "Failed to fetch image: {}", e),
        }
    }

    if resolved > 0 {
        info!("Resolved {} remote images", resolved);
    }
    resolved
}

fn image_sources(request: &mut DocumentRequest) -> Vec<&mut ImageSource> {
    let mut sources = Vec::new();

    for section in &mut request.sections {
        if let ContentSection::TextImage { image, .. } = section {
            sources.push(image);
        }
    }

    let layouts = &mut request.layouts;
    for group in [&mut layouts.cover, &mut layouts.toc, &mut layouts.content] {
        if let Some(footer) = group.footer.as_mut() {
            for cell in [&mut footer.left, &mut footer.center, &mut footer.right] {
                if let Some(FooterCell::Image { image }) = cell {
                    sources.push(image);
                }
            }
        }
    }

    sources
}

/// Rejects URLs that are not plain web addresses, and literal hosts that
/// point back into the local network.
fn checked_url(url: &str) -> anyhow::Result<Url> {
    let parsed = Url::parse(url)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("unsupported scheme {}", parsed.scheme());
    }

    let host = parsed.host_str().unwrap_or_default();
    if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
        anyhow::bail!("refusing local host {:?}", host);
    }
    if let Ok(ip) = host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        if is_internal(ip) {
            anyhow::bail!("refusing internal address {}", ip);
        }
    }
    Ok(parsed)
}

fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal(IpAddr::V4(v4)),
            None => {
                v6.is_loopback()
                    || v6.is_unspecified()
                    || v6.is_unique_local()
                    || v6.is_unicast_link_local()
            }
        },
    }
}

/// Reads at most `limit` bytes of body, checking the declared length first.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> anyhow::Result<Vec<u8>> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            anyhow::bail!("image is {} bytes, limit is {}", length, limit);
        }
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() + chunk.len() > limit {
            anyhow::bail!("image exceeds {} bytes", limit);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn fetch_image(client: &reqwest::Client, url: &str, max_bytes: usize) -> anyhow::Result<ImageSource> {
    let url = checked_url(url)?;
    let response = client.get(url).send().await?.error_for_status()?;
    let mime_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
        .filter(|value| value.starts_with("image/"));
    let bytes = read_capped(response, max_bytes).await?;

    Ok(ImageSource::Inline {
        data: STANDARD.encode(&bytes),
        mime_type,
    })
}
