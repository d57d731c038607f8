use async_trait::async_trait;
use wolt_tools::{OrderDetails, VenueInfo, WoltApiError, WoltConfig, WoltGroup};

/// One joined (or about to be joined) external group order.
#[async_trait]
pub trait GroupOrderApi: Send + Sync {
    async fn join(&self) -> Result<(), WoltApiError>;

    /// Tells the group that this participant has finished choosing items.
    async fn mark_as_ready(&self) -> Result<(), WoltApiError>;

    async fn details(&self) -> Result<OrderDetails, WoltApiError>;

    async fn venue(&self, venue_id: &str) -> Result<VenueInfo, WoltApiError>;
}

/// Creates group handles from the ids found in shared links.
pub trait GroupOrderProvider: Send + Sync + 'static {
    type Group: GroupOrderApi + 'static;

    fn open_group(&self, group_id: &str) -> Result<Self::Group, WoltApiError>;
}

#[async_trait]
impl GroupOrderApi for WoltGroup {
    async fn join(&self) -> Result<(), WoltApiError> {
        WoltGroup::join(self).await
    }

    async fn mark_as_ready(&self) -> Result<(), WoltApiError> {
        WoltGroup::mark_as_ready(self).await
    }

    async fn details(&self) -> Result<OrderDetails, WoltApiError> {
        WoltGroup::details(self).await
    }

    async fn venue(&self, venue_id: &str) -> Result<VenueInfo, WoltApiError> {
        WoltGroup::venue(self, venue_id).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct WoltProvider {
    config: WoltConfig,
}

impl WoltProvider {
    pub fn new(config: WoltConfig) -> Self {
        Self { config }
    }
}

impl GroupOrderProvider for WoltProvider {
    type Group = WoltGroup;

    fn open_group(&self, group_id: &str) -> Result<Self::Group, WoltApiError> {
        WoltGroup::new(self.config.clone(), group_id)
    }
}
