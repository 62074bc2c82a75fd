//! Resource filter: blocks non-essential resource types per tab.
//!
//! Installed through the CDP Fetch domain before a tab's first navigation.
//! Every request pauses at the Request stage; images, fonts, stylesheets,
//! and media are failed with `BlockedByClient`, everything else continues
//! untouched. Documents and scripts are never blocked — the extraction
//! script depends on them.

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tracing::debug;

/// Should a request of this resource type be blocked?
///
/// Uniform policy, no per-category exceptions.
pub fn should_block(resource_type: &ResourceType) -> bool {
    matches!(
        resource_type,
        ResourceType::Image | ResourceType::Font | ResourceType::Stylesheet | ResourceType::Media
    )
}

/// Enable Fetch-domain interception on the page and spawn the handler task
/// that fails blocked resource types and continues the rest.
///
/// Must run before the first navigation so no early request slips through.
pub async fn install_resource_filter(page: &Page) -> Result<()> {
    let mut events = page.event_listener::<EventRequestPaused>().await?;
    page.execute(EnableParams::default()).await?;

    let page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let outcome = if should_block(&event.resource_type) {
                debug!(request_id = ?event.request_id, "blocking {:?}", event.resource_type);
                match FailRequestParams::builder()
                    .request_id(event.request_id.clone())
                    .error_reason(ErrorReason::BlockedByClient)
                    .build()
                {
                    Ok(params) => page.execute(params).await.map(|_| ()),
                    Err(_) => Ok(()),
                }
            } else {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };
            // The tab is gone; stop handling.
            if outcome.is_err() {
                break;
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_heavy_resource_types() {
        assert!(should_block(&ResourceType::Image));
        assert!(should_block(&ResourceType::Font));
        assert!(should_block(&ResourceType::Stylesheet));
        assert!(should_block(&ResourceType::Media));
    }

    #[test]
    fn test_never_blocks_document_or_script() {
        assert!(!should_block(&ResourceType::Document));
        assert!(!should_block(&ResourceType::Script));
        assert!(!should_block(&ResourceType::Xhr));
        assert!(!should_block(&ResourceType::Fetch));
    }
}
