use common::domain::{site_index_key, DomainResult, SiteIndexStore, StoredRecord};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Read side of the per-site index.
pub struct SiteHistoryService {
    store: Arc<dyn SiteIndexStore>,
}

impl SiteHistoryService {
    pub fn new(store: Arc<dyn SiteIndexStore>) -> Self {
        Self { store }
    }

    /// All stored readings of a site, oldest event first. Unknown sites have
    /// an empty history; members that do not decode are left out.
    #[instrument(skip(self))]
    pub async fn site_readings(&self, site_id: &str) -> DomainResult<Vec<StoredRecord>> {
        let members = self.store.list(&site_index_key(site_id)).await?;

        Ok(members
            .iter()
            .filter_map(|member| match StoredRecord::from_member(member) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(site_id = %site_id, error = %e, "skipping undecodable index member");
                    None
                }
            })
            .collect())
    }

    pub async fn store_connected(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "site index ping failed");
                false
            }
        }
    }
}
