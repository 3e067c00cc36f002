use std::sync::Arc;

use classsight_config::GatewaySettings;

use crate::client::AnalyticsClient;

#[derive(Clone)]
pub struct GatewayState {
    pub client: AnalyticsClient,
    pub settings: Arc<GatewaySettings>,
}

impl GatewayState {
    pub fn new(settings: GatewaySettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: AnalyticsClient::new(&settings)?,
            settings: Arc::new(settings),
        })
    }
}
