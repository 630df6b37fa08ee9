// libnfcee/src/routing/plan.rs

//! Pure computation of the command sequences that reprogram listen-mode
//! routing. Nothing here talks to the controller; `RoutingManager` runs the
//! resulting steps one acknowledgement at a time.

use std::fmt;

use crate::config::RoutingConfig;
use crate::ee::EeRegistry;
use crate::routing::RouteDescriptor;
use crate::transport::NfaCommand;
use crate::types::{
    EeHandle, PowerMask, PowerTable, ProtoMask, RouteKind, RouteKindMask, TechMask,
};
use crate::{Error, Result};

/// Routable EEs and their listen capabilities at planning time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EeView {
    ees: Vec<(EeHandle, TechMask)>,
}

impl EeView {
    /// Host-only view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Active EEs from `registry` with their listen technologies.
    pub fn from_registry(registry: &EeRegistry) -> Self {
        let ees = registry
            .active_handles()
            .into_iter()
            .map(|h| (h, registry.supported_technology(h)))
            .collect();
        Self { ees }
    }

    /// Add or replace one EE.
    pub fn with_ee(mut self, handle: EeHandle, support: TechMask) -> Self {
        self.ees.retain(|(h, _)| *h != handle);
        self.ees.push((handle, support));
        self
    }

    pub fn handles(&self) -> impl Iterator<Item = EeHandle> + '_ {
        self.ees.iter().map(|(h, _)| *h)
    }

    /// The host always counts as active.
    pub fn is_active(&self, handle: EeHandle) -> bool {
        handle.is_host() || self.ees.iter().any(|(h, _)| *h == handle)
    }

    /// Listen technologies of `handle`; everything for the host.
    pub fn supported(&self, handle: EeHandle) -> TechMask {
        if handle.is_host() {
            return TechMask::ALL;
        }
        self.ees
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, t)| *t)
            .unwrap_or(TechMask::NONE)
    }
}

/// Ordered commands for one routing change, without the final commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingPlan {
    steps: Vec<NfaCommand>,
}

impl RoutingPlan {
    /// Commands in submission order.
    pub fn steps(&self) -> &[NfaCommand] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Commands in the order they must be issued.
    pub fn into_steps(self) -> Vec<NfaCommand> {
        self.steps
    }

    fn push(&mut self, command: NfaCommand) {
        self.steps.push(command);
    }
}

impl fmt::Display for RoutingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|c| c.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Per-handle assignments merged by OR, kept in first-touch order.
struct Assignments<M> {
    entries: Vec<(EeHandle, PowerTable<M>)>,
}

impl<M> Assignments<M>
where
    M: Copy + Default + PartialEq + std::ops::BitOr<Output = M> + std::ops::BitAnd<Output = M>,
{
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add(&mut self, handle: EeHandle, table: PowerTable<M>) {
        if table.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|(h, _)| *h == handle) {
            Some((_, existing)) => *existing = existing.merge(table),
            None => self.entries.push((handle, table)),
        }
    }
}

/// Technology the destination cannot take but the host should, when
/// forwarding is on and the destination has exactly one of A and B.
fn forwarded_tech(support: TechMask) -> Option<TechMask> {
    let a = support.contains(TechMask::A);
    let b = support.contains(TechMask::B);
    match (a, b) {
        (false, true) => Some(TechMask::A),
        (true, false) => Some(TechMask::B),
        _ => None,
    }
}

fn switch_on_table<M>(value: M, strict: bool) -> PowerTable<M>
where
    M: Copy + Default + PartialEq + std::ops::BitOr<Output = M> + std::ops::BitAnd<Output = M>,
{
    let mut power = PowerMask::SWITCH_ON;
    if strict {
        power = power | PowerMask::SCREEN_OFF;
    }
    PowerTable::from_power(power, value, strict)
}

fn uicc_listen_target(view: &EeView, config: &RoutingConfig) -> Option<EeHandle> {
    config
        .default_se
        .handle()
        .filter(|h| !h.is_host() && view.is_active(*h))
}

fn push_uicc_listen(plan: &mut RoutingPlan, target: Option<EeHandle>, config: &RoutingConfig) {
    if config.uicc_listen_tech.is_empty() {
        return;
    }
    if let Some(handle) = target {
        plan.push(NfaCommand::ConfigureUiccListenTech {
            handle,
            tech: TechMask::NONE,
        });
        plan.push(NfaCommand::ConfigureUiccListenTech {
            handle,
            tech: config.uicc_listen_tech & TechMask::ALL,
        });
    }
}

/// Build the full default-route reprogramming sequence.
pub fn build_default_route_plan(
    default_route: RouteDescriptor,
    proto_route: RouteDescriptor,
    tech_route: RouteDescriptor,
    view: &EeView,
    config: &RoutingConfig,
) -> RoutingPlan {
    let strict = config.strict_power_states;
    let host_listen = config.host_listen;
    let host_allowed = |h: EeHandle| host_listen || !h.is_host();
    let mut plan = RoutingPlan::default();

    let mut cleared: Vec<EeHandle> = view.handles().collect();
    if !cleared.contains(&EeHandle::DH) {
        cleared.push(EeHandle::DH);
    }
    for handle in cleared {
        plan.push(NfaCommand::SetDefaultTechRouting {
            handle,
            routing: PowerTable::default(),
        });
        plan.push(NfaCommand::SetDefaultProtoRouting {
            handle,
            routing: PowerTable::default(),
        });
    }

    if host_listen {
        plan.push(NfaCommand::RegisterAidWildcardOnHost);
    }

    let mut proto_route = proto_route;
    if config.check_default_proto_se && !view.is_active(proto_route.destination) {
        proto_route = RouteDescriptor::new(EeHandle::DH, PowerMask::SWITCH_ON);
    }

    let mut protos: Assignments<ProtoMask> = Assignments::new();
    if proto_route.destination == default_route.destination {
        let dest = default_route.destination;
        if host_allowed(dest) {
            let mut table = PowerTable::from_power(default_route.power, ProtoMask::ISO7816, strict)
                .merge(PowerTable::from_power(
                    proto_route.power,
                    ProtoMask::ISO_DEP,
                    strict,
                ));
            if strict && dest.is_host() {
                table.switch_on = table.switch_on | ProtoMask::T3T;
            }
            protos.add(dest, table);
        }
    } else {
        for (route, proto) in [
            (default_route, ProtoMask::ISO7816),
            (proto_route, ProtoMask::ISO_DEP),
        ] {
            if !host_allowed(route.destination) {
                continue;
            }
            let mut table = PowerTable::from_power(route.power, proto, strict);
            if strict && route.destination.is_host() && route.power.contains(PowerMask::SWITCH_ON)
            {
                table.switch_on = table.switch_on | ProtoMask::T3T;
            }
            protos.add(route.destination, table);
        }
    }
    if host_listen && !default_route.destination.is_host() && !proto_route.destination.is_host()
    {
        protos.add(EeHandle::DH, switch_on_table(ProtoMask::T3T, strict));
    }

    let mut techs: Assignments<TechMask> = Assignments::new();
    let ab = TechMask::A | TechMask::B;
    let tech_dest = tech_route.destination;
    if tech_dest == EeHandle::UICC {
        let table = PowerTable::from_power(tech_route.power, ab, strict)
            .merge(PowerTable::from_power(PowerMask::ALL, TechMask::F, strict))
            .mask(view.supported(EeHandle::UICC));
        techs.add(EeHandle::UICC, table);
    } else {
        techs.add(
            tech_dest,
            PowerTable::from_power(tech_route.power, ab, strict).mask(view.supported(tech_dest)),
        );
        techs.add(
            EeHandle::UICC,
            PowerTable::from_power(PowerMask::ALL, TechMask::F, strict)
                .mask(view.supported(EeHandle::UICC)),
        );
    }
    if host_listen && config.forwarding {
        if let Some(missing) = forwarded_tech(view.supported(tech_dest)) {
            techs.add(EeHandle::DH, switch_on_table(missing, strict));
        }
    }

    for (handle, routing) in protos.entries {
        plan.push(NfaCommand::SetDefaultProtoRouting { handle, routing });
    }
    for (handle, routing) in techs.entries {
        plan.push(NfaCommand::SetDefaultTechRouting { handle, routing });
    }

    push_uicc_listen(&mut plan, uicc_listen_target(view, config), config);
    plan
}

/// Build the commands for a single technology or protocol entry. Unknown
/// or inactive EEs fall back to the host.
pub fn build_entry_plan(
    kind: RouteKind,
    value: u8,
    route: u16,
    power: PowerMask,
    view: &EeView,
    config: &RoutingConfig,
) -> Result<RoutingPlan> {
    let strict = config.strict_power_states;
    let mut handle = EeHandle::from_route(route).ok_or(Error::InvalidRoute(route))?;
    if !view.is_active(handle) {
        handle = EeHandle::DH;
    }
    let mut plan = RoutingPlan::default();

    match kind {
        RouteKind::Technology => {
            let support = view.supported(handle);
            let mut techs: Assignments<TechMask> = Assignments::new();
            if config.host_listen && config.forwarding && !handle.is_host() {
                if let Some(missing) = forwarded_tech(support) {
                    techs.add(EeHandle::DH, switch_on_table(missing, strict));
                }
            }
            let table = PowerTable::from_power(power, TechMask::new(value), strict).mask(support);
            techs.add(handle, table);
            if techs.entries.is_empty() {
                // nothing routable; still clear the target so the entry is explicit
                techs.entries.push((handle, PowerTable::default()));
            }
            for (handle, routing) in techs.entries {
                plan.push(NfaCommand::SetDefaultTechRouting { handle, routing });
            }
        }
        RouteKind::Protocol => {
            let proto = match value {
                0x01 => ProtoMask::ISO_DEP,
                0x02 => ProtoMask::NFC_DEP,
                other => {
                    return Err(Error::UnsupportedOperation(format!(
                        "protocol route value {:#04x}",
                        other
                    )));
                }
            };
            plan.push(NfaCommand::SetDefaultProtoRouting {
                handle,
                routing: PowerTable::from_power(power, proto, strict),
            });
        }
        RouteKind::Aid => {
            return Err(Error::UnsupportedOperation(
                "aid entries go through add_aid_routing".into(),
            ));
        }
    }

    let target = if handle.is_host() {
        uicc_listen_target(view, config)
    } else {
        Some(handle)
    };
    push_uicc_listen(&mut plan, target, config);
    Ok(plan)
}

/// Zero technology and/or protocol routing on the host, UICC and eSE.
/// The AID bit is handled by the caller.
pub fn build_clear_plan(kinds: RouteKindMask) -> RoutingPlan {
    let mut plan = RoutingPlan::default();
    for handle in [EeHandle::DH, EeHandle::UICC, EeHandle::ESE] {
        if kinds.contains(RouteKindMask::TECHNOLOGY) {
            plan.push(NfaCommand::SetDefaultTechRouting {
                handle,
                routing: PowerTable::default(),
            });
        }
        if kinds.contains(RouteKindMask::PROTOCOL) {
            plan.push(NfaCommand::SetDefaultProtoRouting {
                handle,
                routing: PowerTable::default(),
            });
        }
    }
    plan
}
