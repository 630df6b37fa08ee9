// libnfcee/src/async_api.rs

//! Async facade over the blocking routing operations. Each call runs on
//! the tokio blocking pool so acknowledgement waits never stall the
//! executor.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{Initialized, NfcContext};
use crate::routing::RoutingTable;
use crate::types::{PowerMask, RouteKind, RouteKindMask, ScreenState};
use crate::{Error, Result};

/// Routing operations for async callers.
#[async_trait]
pub trait AsyncRoutingApi: Send + Sync {
    async fn add_aid_routing(&self, aid: Vec<u8>, route: u16, power: PowerMask, is_prefix: bool) -> Result<()>;
    async fn remove_aid_routing(&self, aid: Vec<u8>) -> Result<()>;
    async fn set_default_route(&self, default_route: u8, proto_route: u8, tech_route: u8) -> Result<()>;
    async fn set_routing_entry(&self, kind: RouteKind, value: u8, route: u16, power: PowerMask) -> Result<()>;
    async fn clear_routing_entry(&self, kinds: RouteKindMask) -> Result<()>;
    async fn clear_aid_table(&self) -> Result<()>;
    async fn commit_routing(&self) -> Result<()>;
    async fn get_routing(&self) -> Result<RoutingTable>;
    async fn set_screen_state(&self, state: ScreenState) -> Result<()>;
}

/// Shareable async handle on an initialized context.
#[derive(Clone)]
pub struct AsyncNfcContext {
    inner: Arc<NfcContext<Initialized>>,
}

impl AsyncNfcContext {
    /// Wrap an initialized context.
    pub fn new(context: NfcContext<Initialized>) -> Self {
        Self {
            inner: Arc::new(context),
        }
    }

    /// Blocking context behind the wrapper.
    pub fn context(&self) -> &NfcContext<Initialized> {
        &self.inner
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&NfcContext<Initialized>) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

#[async_trait]
impl AsyncRoutingApi for AsyncNfcContext {
    async fn add_aid_routing(&self, aid: Vec<u8>, route: u16, power: PowerMask, is_prefix: bool) -> Result<()> {
        self.run(move |ctx| ctx.add_aid_routing(&aid, route, power, is_prefix))
            .await
    }

    async fn remove_aid_routing(&self, aid: Vec<u8>) -> Result<()> {
        self.run(move |ctx| ctx.remove_aid_routing(&aid)).await
    }

    async fn set_default_route(&self, default_route: u8, proto_route: u8, tech_route: u8) -> Result<()> {
        self.run(move |ctx| ctx.set_default_route(default_route, proto_route, tech_route))
            .await
    }

    async fn set_routing_entry(&self, kind: RouteKind, value: u8, route: u16, power: PowerMask) -> Result<()> {
        self.run(move |ctx| ctx.set_routing_entry(kind, value, route, power))
            .await
    }

    async fn clear_routing_entry(&self, kinds: RouteKindMask) -> Result<()> {
        self.run(move |ctx| ctx.clear_routing_entry(kinds)).await
    }

    async fn clear_aid_table(&self) -> Result<()> {
        self.run(|ctx| ctx.clear_aid_table()).await
    }

    async fn commit_routing(&self) -> Result<()> {
        self.run(|ctx| ctx.commit_routing()).await
    }

    async fn get_routing(&self) -> Result<RoutingTable> {
        self.run(|ctx| ctx.get_routing()).await
    }

    async fn set_screen_state(&self, state: ScreenState) -> Result<()> {
        self.run(move |ctx| ctx.set_screen_state(state)).await
    }
}
