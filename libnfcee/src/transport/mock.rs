// libnfcee/src/transport/mock.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::constants::{DEFAULT_AID_TABLE_CAPACITY, TLV_AID, TLV_PROTOCOL, TLV_TECHNOLOGY};
use crate::transport::traits::Transport;
use crate::transport::{AckKind, EventSender, NfaCommand, NfaEvent, Status};
use crate::types::{
    Aid, EeHandle, EeInfo, EeMode, EeStatus, Nfcid2, PowerMask, PowerTable, ProtoMask,
    ScreenState, SystemCode, TechMask,
};
use crate::{Error, Result};

/// One AID row of the simulated controller table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAidEntry {
    pub aid: Aid,
    pub handle: EeHandle,
    pub power: PowerMask,
    pub prefix: bool,
}

#[derive(Debug)]
struct MockState {
    events: Option<EventSender>,
    sent: Vec<NfaCommand>,
    ees: Vec<EeInfo>,
    tech_routes: BTreeMap<EeHandle, PowerTable<TechMask>>,
    proto_routes: BTreeMap<EeHandle, PowerTable<ProtoMask>>,
    aids: Vec<MockAidEntry>,
    aid_capacity: usize,
    discovery_started: bool,
    mutations_while_discovering: usize,
    commits: usize,
    uicc_listen: Vec<(EeHandle, TechMask)>,
    standby: Vec<bool>,
    polling: Option<(TechMask, bool)>,
    screen_states: Vec<ScreenState>,
    felica: BTreeMap<u16, (SystemCode, Nfcid2)>,
    next_felica_handle: u16,
    rejected: HashSet<&'static str>,
    failing: HashSet<&'static str>,
    silenced: HashSet<&'static str>,
    silence_activation: bool,
    delays: HashMap<&'static str, Duration>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            events: None,
            sent: Vec::new(),
            ees: Vec::new(),
            tech_routes: BTreeMap::new(),
            proto_routes: BTreeMap::new(),
            aids: Vec::new(),
            aid_capacity: DEFAULT_AID_TABLE_CAPACITY,
            discovery_started: false,
            mutations_while_discovering: 0,
            commits: 0,
            uicc_listen: Vec::new(),
            standby: Vec::new(),
            polling: None,
            screen_states: Vec::new(),
            felica: BTreeMap::new(),
            next_felica_handle: 0x01,
            rejected: HashSet::new(),
            failing: HashSet::new(),
            silenced: HashSet::new(),
            silence_activation: false,
            delays: HashMap::new(),
        }
    }
}

/// Mock transport for tests. It simulates the controller routing table,
/// records every submitted command and acknowledges each one on the event
/// channel unless told otherwise.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Cloneable view on a `MockTransport` that stays usable after the
/// transport itself has been boxed into a context.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the EE list returned by `GetEeInfo`.
    pub fn with_ees(self, ees: Vec<EeInfo>) -> Self {
        self.state.lock().ees = ees;
        self
    }

    /// AID table size reported to the routing manager.
    pub fn with_aid_capacity(self, capacity: usize) -> Self {
        self.state.lock().aid_capacity = capacity;
        self
    }

    /// Inspection and injection handle sharing this mock's state.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MockState {
    fn emit(&self, event: NfaEvent) {
        if let Some(tx) = &self.events {
            // receiver gone means the session is shutting down
            let _ = tx.send(event);
        }
    }

    fn ack(&self, kind: AckKind, status: Status) {
        self.emit(NfaEvent::ack(kind, status));
    }

    fn ee_status_mut(&mut self, handle: EeHandle) -> Option<&mut EeStatus> {
        self.ees
            .iter_mut()
            .find(|e| e.handle == handle)
            .map(|e| &mut e.status)
    }

    fn apply(&mut self, command: &NfaCommand) {
        let kind = command.ack_kind();
        if self.failing.contains(command.name()) {
            self.ack(kind, Status::Failed);
            return;
        }
        match command {
            NfaCommand::GetEeInfo => {
                self.emit(NfaEvent::EeInfo {
                    ees: self.ees.clone(),
                });
            }
            NfaCommand::ModeSet { handle, mode } => {
                if *mode == EeMode::Activate && self.silence_activation {
                    return;
                }
                let new_status = match mode {
                    EeMode::Activate => EeStatus::Active,
                    EeMode::Deactivate => EeStatus::Inactive,
                };
                if let Some(status) = self.ee_status_mut(*handle) {
                    *status = new_status;
                }
                self.emit(NfaEvent::ModeSet {
                    status: Status::Ok,
                    handle: *handle,
                    ee_status: new_status,
                });
            }
            NfaCommand::SetDefaultTechRouting { handle, routing } => {
                if routing.is_empty() {
                    self.tech_routes.remove(handle);
                } else {
                    self.tech_routes.insert(*handle, *routing);
                }
                self.ack(kind, Status::Ok);
            }
            NfaCommand::SetDefaultProtoRouting { handle, routing } => {
                if routing.is_empty() {
                    self.proto_routes.remove(handle);
                } else {
                    self.proto_routes.insert(*handle, *routing);
                }
                self.ack(kind, Status::Ok);
            }
            NfaCommand::AddAidRouting {
                handle,
                aid,
                power,
                prefix,
            } => {
                let entry = MockAidEntry {
                    aid: aid.clone(),
                    handle: *handle,
                    power: *power,
                    prefix: *prefix,
                };
                if let Some(existing) = self.aids.iter_mut().find(|e| e.aid == *aid) {
                    *existing = entry;
                } else if self.aids.len() >= self.aid_capacity {
                    self.ack(kind, Status::BufferFull);
                    return;
                } else {
                    self.aids.push(entry);
                }
                self.ack(kind, Status::Ok);
            }
            NfaCommand::RemoveAidRouting { aid } => {
                if aid.is_remove_all() {
                    self.aids.clear();
                } else {
                    self.aids.retain(|e| e.aid != *aid);
                }
                self.ack(kind, Status::Ok);
            }
            NfaCommand::UpdateNow => {
                self.commits += 1;
                self.ack(kind, Status::Ok);
            }
            NfaCommand::GetRouting => {
                let tlvs = self.routing_tlvs();
                self.emit(NfaEvent::RoutingTable {
                    status: Status::Ok,
                    tlvs,
                });
            }
            NfaCommand::ConfigureUiccListenTech { handle, tech } => {
                self.uicc_listen.push((*handle, *tech));
                self.ack(kind, Status::Ok);
            }
            NfaCommand::StartRfDiscovery => {
                self.discovery_started = true;
                self.ack(kind, Status::Ok);
            }
            NfaCommand::StopRfDiscovery => {
                self.discovery_started = false;
                self.ack(kind, Status::Ok);
            }
            NfaCommand::EnablePolling { tech, reader_mode } => {
                self.polling = Some((*tech, *reader_mode));
                self.ack(kind, Status::Ok);
            }
            NfaCommand::DisablePolling => {
                self.polling = None;
                self.ack(kind, Status::Ok);
            }
            NfaCommand::RegisterFelicaSystemCodeOnHost {
                system_code,
                nfcid2,
            } => {
                let handle = self.next_felica_handle;
                self.next_felica_handle += 1;
                self.felica.insert(handle, (*system_code, *nfcid2));
                self.emit(NfaEvent::CeRegistered {
                    status: Status::Ok,
                    handle,
                });
            }
            NfaCommand::DeregisterFelicaSystemCodeOnHost { handle } => {
                self.felica.remove(handle);
                self.emit(NfaEvent::CeDeregistered {
                    status: Status::Ok,
                    handle: *handle,
                });
            }
            NfaCommand::SetScreenState(state) => {
                self.screen_states.push(*state);
                self.ack(kind, Status::Ok);
            }
            NfaCommand::RegisterEeCallback
            | NfaCommand::DeregisterEeCallback
            | NfaCommand::RegisterAidWildcardOnHost => {
                self.ack(kind, Status::Ok);
            }
        }
    }

    /// Encode the simulated table the way the controller reports it:
    /// `[more][count]` followed by `{type, len, nfcee_id, power, value..}`.
    fn routing_tlvs(&self) -> Vec<u8> {
        let mut entries: Vec<(u8, Vec<u8>)> = Vec::new();
        for (handle, table) in &self.tech_routes {
            for (bit, code) in [(TechMask::A, 0x00), (TechMask::B, 0x01), (TechMask::F, 0x02)] {
                let power = power_of(table.buckets().map(|m| m.contains(bit)));
                if power != 0 {
                    entries.push((TLV_TECHNOLOGY, vec![handle.nfcee_id(), power, code]));
                }
            }
        }
        for (handle, table) in &self.proto_routes {
            for (bit, code) in [
                (ProtoMask::T3T, 0x03),
                (ProtoMask::ISO_DEP, 0x04),
                (ProtoMask::NFC_DEP, 0x05),
            ] {
                let power = power_of(table.buckets().map(|m| m.contains(bit)));
                if power != 0 {
                    entries.push((TLV_PROTOCOL, vec![handle.nfcee_id(), power, code]));
                }
            }
        }
        for e in &self.aids {
            let mut value = vec![e.handle.nfcee_id(), e.power.bits()];
            value.extend_from_slice(e.aid.as_bytes());
            let ty = if e.prefix { TLV_AID | 0x10 } else { TLV_AID };
            entries.push((ty, value));
        }

        let mut out = vec![0x00, entries.len() as u8];
        for (ty, value) in entries {
            out.push(ty);
            out.push(value.len() as u8);
            out.extend(value);
        }
        out
    }
}

fn power_of(flags: [bool; 5]) -> u8 {
    flags
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .fold(0u8, |acc, (i, _)| acc | (1 << i))
}

impl Transport for MockTransport {
    fn attach(&mut self, events: EventSender) -> Result<()> {
        self.state.lock().events = Some(events);
        Ok(())
    }

    fn submit(&mut self, command: &NfaCommand) -> Result<()> {
        let delay = self.state.lock().delays.get(command.name()).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let mut s = self.state.lock();
        s.sent.push(command.clone());
        if command.is_routing_mutation() && s.discovery_started {
            s.mutations_while_discovering += 1;
        }
        if s.rejected.contains(command.name()) {
            return Err(Error::CommandRejected {
                command: command.name(),
                status: Status::Rejected.as_u8(),
            });
        }
        if s.silenced.contains(command.name()) {
            return Ok(());
        }
        s.apply(command);
        Ok(())
    }

    fn aid_table_capacity(&self) -> usize {
        self.state.lock().aid_capacity
    }

    fn set_standby(&mut self, high: bool) -> Result<()> {
        self.state.lock().standby.push(high);
        Ok(())
    }

    fn detach(&mut self) {
        self.state.lock().events = None;
    }
}

impl MockHandle {
    /// Every command submitted so far, in order.
    pub fn sent(&self) -> Vec<NfaCommand> {
        self.state.lock().sent.clone()
    }

    /// Names of every command submitted so far.
    pub fn sent_names(&self) -> Vec<&'static str> {
        self.state.lock().sent.iter().map(|c| c.name()).collect()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// How many times the named command was submitted.
    pub fn count(&self, name: &str) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }

    /// Technology routing currently programmed for `handle`.
    pub fn tech_routing(&self, handle: EeHandle) -> PowerTable<TechMask> {
        self.state
            .lock()
            .tech_routes
            .get(&handle)
            .copied()
            .unwrap_or_default()
    }

    pub fn proto_routing(&self, handle: EeHandle) -> PowerTable<ProtoMask> {
        self.state
            .lock()
            .proto_routes
            .get(&handle)
            .copied()
            .unwrap_or_default()
    }

    /// Handles holding a non-empty technology assignment.
    pub fn tech_handles(&self) -> Vec<EeHandle> {
        self.state.lock().tech_routes.keys().copied().collect()
    }

    pub fn proto_handles(&self) -> Vec<EeHandle> {
        self.state.lock().proto_routes.keys().copied().collect()
    }

    /// Simulated AID table, in insertion order.
    pub fn aid_entries(&self) -> Vec<MockAidEntry> {
        self.state.lock().aids.clone()
    }

    pub fn discovery_started(&self) -> bool {
        self.state.lock().discovery_started
    }

    /// Routing mutations that reached the controller while discovery ran.
    pub fn mutations_while_discovering(&self) -> usize {
        self.state.lock().mutations_while_discovering
    }

    /// Number of `UpdateNow` commands handled.
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// Listen technologies written to UICC handles, oldest first.
    pub fn uicc_listen_history(&self) -> Vec<(EeHandle, TechMask)> {
        self.state.lock().uicc_listen.clone()
    }

    /// Every level driven on the standby line, oldest first.
    pub fn standby_history(&self) -> Vec<bool> {
        self.state.lock().standby.clone()
    }

    pub fn polling(&self) -> Option<(TechMask, bool)> {
        self.state.lock().polling
    }

    pub fn screen_states(&self) -> Vec<ScreenState> {
        self.state.lock().screen_states.clone()
    }

    /// Registered host Felica entries as (handle, system code, NFCID2).
    pub fn felica_registrations(&self) -> Vec<(u16, SystemCode, Nfcid2)> {
        self.state
            .lock()
            .felica
            .iter()
            .map(|(h, (sc, id))| (*h, *sc, *id))
            .collect()
    }

    /// Simulated status of `handle`.
    pub fn ee_status(&self, handle: EeHandle) -> Option<EeStatus> {
        self.state
            .lock()
            .ees
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.status)
    }

    pub fn ees(&self) -> Vec<EeInfo> {
        self.state.lock().ees.clone()
    }

    /// Replace the EE list returned by later `GetEeInfo` requests.
    pub fn set_ees(&self, ees: Vec<EeInfo>) {
        self.state.lock().ees = ees;
    }

    pub fn set_aid_capacity(&self, capacity: usize) {
        self.state.lock().aid_capacity = capacity;
    }

    /// Make `submit` refuse the named command.
    pub fn reject(&self, name: &'static str) {
        self.state.lock().rejected.insert(name);
    }

    /// Acknowledge the named command with `Status::Failed`.
    pub fn fail(&self, name: &'static str) {
        self.state.lock().failing.insert(name);
    }

    /// Accept the named command but never acknowledge it.
    pub fn silence(&self, name: &'static str) {
        self.state.lock().silenced.insert(name);
    }

    /// Leave activation mode-set requests unanswered.
    pub fn set_silence_activation(&self, on: bool) {
        self.state.lock().silence_activation = on;
    }

    /// Stall `submit` of the named command for `delay` before handling it.
    pub fn delay(&self, name: &'static str, delay: Duration) {
        self.state.lock().delays.insert(name, delay);
    }

    /// Undo every failure, silence and delay injection.
    pub fn clear_failures(&self) {
        let mut s = self.state.lock();
        s.delays.clear();
        s.rejected.clear();
        s.failing.clear();
        s.silenced.clear();
        s.silence_activation = false;
    }

    /// Deliver an unsolicited event as if the controller raised it. EE
    /// status changes are mirrored into the simulated EE list.
    pub fn inject(&self, event: NfaEvent) {
        let mut s = self.state.lock();
        match &event {
            NfaEvent::NewEe { handle, ee_status } => {
                if let Some(st) = s.ee_status_mut(*handle) {
                    *st = *ee_status;
                }
            }
            NfaEvent::EeDiscover { ees } => s.ees = ees.clone(),
            _ => {}
        }
        s.emit(event);
    }
}
