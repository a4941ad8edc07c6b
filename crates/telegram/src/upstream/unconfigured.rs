//! Factory used when no protocol library is linked in.

use async_trait::async_trait;

use super::{ClientFactory, ConnectParams, UpstreamClient, UpstreamError};

/// Rejects every connection attempt.
///
/// The gateway binary ships with this factory; every operation that needs
/// an upstream connection fails with `UpstreamRejected` while the rest of
/// the API (accounts, session records, webhooks config) stays usable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredClientFactory;

pub const UNCONFIGURED_MESSAGE: &str = "no upstream client library configured";

#[async_trait]
impl ClientFactory for UnconfiguredClientFactory {
    async fn connect(
        &self,
        params: ConnectParams<'_>,
    ) -> Result<Box<dyn UpstreamClient>, UpstreamError> {
        tracing::warn!(api_id = params.api_id, "Upstream connect refused: {UNCONFIGURED_MESSAGE}");
        Err(UpstreamError::Rejected(UNCONFIGURED_MESSAGE.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_connect_is_rejected() {
        let result = UnconfiguredClientFactory
            .connect(ConnectParams {
                api_id: 1,
                api_hash: "x",
                session: None,
                device_model: "test",
            })
            .await;
        match result {
            Err(e) => assert_eq!(e, UpstreamError::Rejected(UNCONFIGURED_MESSAGE.into())),
            Ok(_) => panic!("connect must be rejected"),
        }
    }
}
