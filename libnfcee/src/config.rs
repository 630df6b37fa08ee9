// libnfcee/src/config.rs

//! Routing and lifecycle configuration.
//!
//! `RoutingConfig` collects what the platform configuration files used to
//! provide: the default secure element, host listen and forwarding
//! switches, the UICC listen mask, power-state strictness, the chip family
//! and every timeout the session waits on.

use std::time::Duration;

use crate::ee::quirks::ChipId;
use crate::types::{GenericEeId, TechMask};
use crate::utils::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_COMMIT_TIMEOUT_MS, DEFAULT_REACTIVATE_TIMEOUT_MS,
    DEFAULT_TRANSACTION_WAIT_MS, ms, secs,
};

/// Routing and timing options for one context.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoutingConfig {
    /// Preferred secure element for ISO-DEP and UICC listen reconfiguration
    pub default_se: GenericEeId,
    /// Generic route for AIDs added without an explicit destination
    pub default_offhost_route: u8,
    pub host_listen: bool,
    /// Route the technology the default EE lacks (A or B) to the host
    pub forwarding: bool,
    /// Kill switch for `add_aid_routing`
    pub add_aid_enabled: bool,
    pub uicc_listen_tech: TechMask,
    /// Honour screen-off and screen-lock power buckets
    pub strict_power_states: bool,
    /// Fall back to the host when the ISO-DEP destination is not present
    pub check_default_proto_se: bool,
    pub chip: ChipId,
    pub ack_timeout_ms: u64,
    pub commit_timeout_ms: u64,
    pub reactivate_timeout_ms: u64,
    pub transaction_wait_ms: u64,
    pub reader_start_timeout_s: u64,
    pub reader_tag_op_timeout_s: u64,
    /// Value reported with the reader-mode start timeout notification
    pub disc_ntf_timeout: u8,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_se: GenericEeId::Uicc,
            default_offhost_route: 0x02,
            host_listen: true,
            forwarding: false,
            add_aid_enabled: true,
            uicc_listen_tech: TechMask::ALL,
            strict_power_states: false,
            check_default_proto_se: false,
            chip: ChipId::default(),
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            commit_timeout_ms: DEFAULT_COMMIT_TIMEOUT_MS,
            reactivate_timeout_ms: DEFAULT_REACTIVATE_TIMEOUT_MS,
            transaction_wait_ms: DEFAULT_TRANSACTION_WAIT_MS,
            reader_start_timeout_s: 1,
            reader_tag_op_timeout_s: 1,
            disc_ntf_timeout: 10,
        }
    }
}

impl RoutingConfig {
    /// Bound on each command acknowledgement.
    pub fn ack_timeout(&self) -> Duration {
        ms(self.ack_timeout_ms)
    }

    /// Bound on the commit acknowledgement.
    pub fn commit_timeout(&self) -> Duration {
        ms(self.commit_timeout_ms)
    }

    /// Bound on the reactivation that ends an EE reset.
    pub fn reactivate_timeout(&self) -> Duration {
        ms(self.reactivate_timeout_ms)
    }

    /// Bound on waiting for a transaction before a reset.
    pub fn transaction_wait(&self) -> Duration {
        ms(self.transaction_wait_ms)
    }

    /// Protection window after the reader-mode start notification.
    pub fn reader_start_timeout(&self) -> Duration {
        secs(self.reader_start_timeout_s)
    }

    /// Tag operation window once reader mode has started.
    pub fn reader_tag_op_timeout(&self) -> Duration {
        ms(2000 * self.reader_tag_op_timeout_s)
    }
}

/// Builder for `RoutingConfig`.
#[derive(Debug, Default)]
pub struct RoutingConfigBuilder {
    config: RoutingConfig,
}

impl RoutingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preferred SE for ISO-DEP and UICC listen reconfiguration.
    pub fn with_default_se(mut self, id: GenericEeId) -> Self {
        self.config.default_se = id;
        self
    }

    /// Generic route used by `add_offhost_aid_routing`.
    pub fn with_default_offhost_route(mut self, route: u8) -> Self {
        self.config.default_offhost_route = route;
        self
    }

    /// Let the host take ISO-DEP and T3T traffic.
    pub fn with_host_listen(mut self, on: bool) -> Self {
        self.config.host_listen = on;
        self
    }

    /// Route the technology the default EE lacks to the host.
    pub fn with_forwarding(mut self, on: bool) -> Self {
        self.config.forwarding = on;
        self
    }

    /// Allow or refuse `add_aid_routing`.
    pub fn with_add_aid(mut self, on: bool) -> Self {
        self.config.add_aid_enabled = on;
        self
    }

    pub fn with_uicc_listen_tech(mut self, tech: TechMask) -> Self {
        self.config.uicc_listen_tech = tech;
        self
    }

    /// Honour the screen-off and screen-lock power buckets.
    pub fn with_strict_power_states(mut self, on: bool) -> Self {
        self.config.strict_power_states = on;
        self
    }

    /// Fall back to the host when the ISO-DEP destination is missing.
    pub fn with_check_default_proto_se(mut self, on: bool) -> Self {
        self.config.check_default_proto_se = on;
        self
    }

    /// Controller model, picks the quirks.
    pub fn with_chip(mut self, chip: ChipId) -> Self {
        self.config.chip = chip;
        self
    }

    pub fn with_ack_timeout_ms(mut self, v: u64) -> Self {
        self.config.ack_timeout_ms = v;
        self
    }

    pub fn with_commit_timeout_ms(mut self, v: u64) -> Self {
        self.config.commit_timeout_ms = v;
        self
    }

    pub fn with_reactivate_timeout_ms(mut self, v: u64) -> Self {
        self.config.reactivate_timeout_ms = v;
        self
    }

    pub fn with_transaction_wait_ms(mut self, v: u64) -> Self {
        self.config.transaction_wait_ms = v;
        self
    }

    /// Reader-mode start and tag-operation timeouts, in seconds.
    pub fn with_reader_timeouts(mut self, start_s: u64, tag_op_s: u64) -> Self {
        self.config.reader_start_timeout_s = start_s;
        self.config.reader_tag_op_timeout_s = tag_op_s;
        self
    }

    pub fn with_disc_ntf_timeout(mut self, v: u8) -> Self {
        self.config.disc_ntf_timeout = v;
        self
    }

    /// Finish with the accumulated settings.
    pub fn build(self) -> RoutingConfig {
        self.config
    }
}
