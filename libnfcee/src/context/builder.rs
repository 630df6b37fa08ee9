// libnfcee/src/context/builder.rs

use std::sync::Arc;

use crate::config::RoutingConfig;
use crate::context::handle::{NfcContext, Uninitialized};
use crate::ee::{Quirks, create_quirks_for};
use crate::listener::{NoopListener, ServiceListener};
use crate::transport::Transport;
use crate::{Error, Result};

/// Helper to construct an `NfcContext` with optional configuration.
pub struct NfcContextBuilder {
    transport: Option<Box<dyn Transport>>,
    config: RoutingConfig,
    listener: Arc<dyn ServiceListener>,
    quirks: Option<Arc<dyn Quirks>>,
}

impl Default for NfcContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NfcContextBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            config: RoutingConfig::default(),
            listener: Arc::new(NoopListener),
            quirks: None,
        }
    }

    /// Provide the controller transport (e.g. `MockTransport`).
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Routing configuration. Defaults to `RoutingConfig::default()`.
    pub fn with_config(mut self, config: RoutingConfig) -> Self {
        self.config = config;
        self
    }

    /// Receiver of upward notifications. Defaults to `NoopListener`.
    pub fn with_listener(mut self, listener: Arc<dyn ServiceListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Override the errata policy otherwise chosen from the configured chip.
    pub fn with_quirks(mut self, quirks: Arc<dyn Quirks>) -> Self {
        self.quirks = Some(quirks);
        self
    }

    /// Consume the builder and return an uninitialized context. Requires a
    /// transport; otherwise returns `TransportMissing`.
    pub fn build_uninitialized(self) -> Result<NfcContext<Uninitialized>> {
        let transport = self.transport.ok_or(Error::TransportMissing)?;
        let quirks = self
            .quirks
            .unwrap_or_else(|| Arc::from(create_quirks_for(self.config.chip)));
        NfcContext::new_with_transport(transport, self.config, self.listener, quirks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ee::ChipId;
    use crate::config::RoutingConfigBuilder;
    use crate::transport::MockTransport;

    #[test]
    fn builder_requires_transport() {
        assert!(matches!(
            NfcContextBuilder::new().build_uninitialized(),
            Err(Error::TransportMissing)
        ));
    }

    #[test]
    fn builder_with_mock_transport() {
        let ctx = NfcContextBuilder::new()
            .with_transport(Box::new(MockTransport::new()))
            .with_config(RoutingConfigBuilder::new().with_chip(ChipId::Pn66T).build())
            .build_uninitialized()
            .unwrap();
        assert_eq!(ctx.config().chip, ChipId::Pn66T);
        assert!(ctx.registry().is_empty());
    }
}
