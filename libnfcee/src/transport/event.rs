// libnfcee/src/transport/event.rs

use crossbeam_channel::Sender;

use crate::constants::{STATUS_BUFFER_FULL, STATUS_FAILED, STATUS_OK, STATUS_REJECTED};
use crate::types::{DataStatus, EeHandle, EeInfo, EeStatus, RfMode};

/// Sending half handed to a transport on attach.
pub type EventSender = Sender<NfaEvent>;

/// Controller status carried by acknowledgement events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Rejected,
    Failed,
    BufferFull,
    Other(u8),
}

impl Status {
    /// Map a raw NFA status byte.
    pub fn from_u8(v: u8) -> Self {
        match v {
            STATUS_OK => Self::Ok,
            STATUS_REJECTED => Self::Rejected,
            STATUS_FAILED => Self::Failed,
            STATUS_BUFFER_FULL => Self::BufferFull,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Ok => STATUS_OK,
            Self::Rejected => STATUS_REJECTED,
            Self::Failed => STATUS_FAILED,
            Self::BufferFull => STATUS_BUFFER_FULL,
            Self::Other(v) => v,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Acknowledgement classes used to correlate commands with their results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    EeInfo,
    EeRegistered,
    EeDeregistered,
    ModeSet,
    SetTech,
    SetProto,
    AddAid,
    RemoveAid,
    Updated,
    RoutingTable,
    UiccListenConfigured,
    HostAidRegistered,
    DiscoveryStarted,
    DiscoveryStopped,
    PollingEnabled,
    PollingDisabled,
    CeRegistered,
    CeDeregistered,
    ScreenStateSet,
}

/// What caused an EE action notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTrigger {
    Select { aid: Vec<u8> },
    AppInit { aid: Vec<u8>, data: Vec<u8> },
    RfProtocol(u8),
    RfTechnology(u8),
    Other(u8),
}

/// Operation of one entry in a discover request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverOp {
    Add,
    Remove,
}

/// Per-EE poll-mode request as reported by a discover request event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverRequest {
    pub handle: EeHandle,
    pub op: DiscoverOp,
    pub pa_protocol: u8,
    pub pb_protocol: u8,
}

/// Asynchronous events delivered by the controller stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NfaEvent {
    EeRegistered { status: Status },
    EeDeregistered { status: Status },
    /// Response to `GetEeInfo`
    EeInfo { ees: Vec<EeInfo> },
    /// Unsolicited EE discover snapshot
    EeDiscover { ees: Vec<EeInfo> },
    NewEe { handle: EeHandle, ee_status: EeStatus },
    ModeSet {
        status: Status,
        handle: EeHandle,
        ee_status: EeStatus,
    },
    SetTech { status: Status },
    SetProto { status: Status },
    AddAid { status: Status },
    RemoveAid { status: Status },
    Updated { status: Status },
    RoutingTable { status: Status, tlvs: Vec<u8> },
    UiccListenConfigured { status: Status },
    HostAidRegistered { status: Status },
    Action { handle: EeHandle, trigger: ActionTrigger },
    Connectivity { handle: EeHandle },
    DiscoverReq { requests: Vec<DiscoverRequest> },
    RfField { on: bool },
    Activated { mode: RfMode, protocol: u8 },
    Deactivated { mode: RfMode },
    HostCeActivated,
    HostCeDeactivated,
    HostCeData { status: DataStatus, data: Vec<u8> },
    CeRegistered { status: Status, handle: u16 },
    CeDeregistered { status: Status, handle: u16 },
    DiscoveryStarted { status: Status },
    DiscoveryStopped { status: Status },
    PollingEnabled { status: Status },
    PollingDisabled { status: Status },
    ScreenStateSet { status: Status },
}

impl NfaEvent {
    /// The acknowledgement class this event completes, if any.
    pub fn ack_kind(&self) -> Option<AckKind> {
        let kind = match self {
            Self::EeRegistered { .. } => AckKind::EeRegistered,
            Self::EeDeregistered { .. } => AckKind::EeDeregistered,
            Self::EeInfo { .. } => AckKind::EeInfo,
            Self::ModeSet { .. } => AckKind::ModeSet,
            Self::SetTech { .. } => AckKind::SetTech,
            Self::SetProto { .. } => AckKind::SetProto,
            Self::AddAid { .. } => AckKind::AddAid,
            Self::RemoveAid { .. } => AckKind::RemoveAid,
            Self::Updated { .. } => AckKind::Updated,
            Self::RoutingTable { .. } => AckKind::RoutingTable,
            Self::UiccListenConfigured { .. } => AckKind::UiccListenConfigured,
            Self::HostAidRegistered { .. } => AckKind::HostAidRegistered,
            Self::CeRegistered { .. } => AckKind::CeRegistered,
            Self::CeDeregistered { .. } => AckKind::CeDeregistered,
            Self::DiscoveryStarted { .. } => AckKind::DiscoveryStarted,
            Self::DiscoveryStopped { .. } => AckKind::DiscoveryStopped,
            Self::PollingEnabled { .. } => AckKind::PollingEnabled,
            Self::PollingDisabled { .. } => AckKind::PollingDisabled,
            Self::ScreenStateSet { .. } => AckKind::ScreenStateSet,
            _ => return None,
        };
        Some(kind)
    }

    /// Status of an acknowledgement event. Events without a status field
    /// report `Ok`.
    pub fn status(&self) -> Status {
        match self {
            Self::EeRegistered { status }
            | Self::EeDeregistered { status }
            | Self::ModeSet { status, .. }
            | Self::SetTech { status }
            | Self::SetProto { status }
            | Self::AddAid { status }
            | Self::RemoveAid { status }
            | Self::Updated { status }
            | Self::RoutingTable { status, .. }
            | Self::UiccListenConfigured { status }
            | Self::HostAidRegistered { status }
            | Self::CeRegistered { status, .. }
            | Self::CeDeregistered { status, .. }
            | Self::DiscoveryStarted { status }
            | Self::DiscoveryStopped { status }
            | Self::PollingEnabled { status }
            | Self::PollingDisabled { status }
            | Self::ScreenStateSet { status } => *status,
            _ => Status::Ok,
        }
    }

    /// Build the acknowledgement of `kind` carrying `status`. Kinds whose
    /// event has a payload get an empty one.
    pub fn ack(kind: AckKind, status: Status) -> Self {
        match kind {
            AckKind::EeInfo => Self::EeInfo { ees: Vec::new() },
            AckKind::EeRegistered => Self::EeRegistered { status },
            AckKind::EeDeregistered => Self::EeDeregistered { status },
            AckKind::ModeSet => Self::ModeSet {
                status,
                handle: EeHandle::new(0),
                ee_status: EeStatus::Other(0xFF),
            },
            AckKind::SetTech => Self::SetTech { status },
            AckKind::SetProto => Self::SetProto { status },
            AckKind::AddAid => Self::AddAid { status },
            AckKind::RemoveAid => Self::RemoveAid { status },
            AckKind::Updated => Self::Updated { status },
            AckKind::RoutingTable => Self::RoutingTable {
                status,
                tlvs: Vec::new(),
            },
            AckKind::UiccListenConfigured => Self::UiccListenConfigured { status },
            AckKind::HostAidRegistered => Self::HostAidRegistered { status },
            AckKind::DiscoveryStarted => Self::DiscoveryStarted { status },
            AckKind::DiscoveryStopped => Self::DiscoveryStopped { status },
            AckKind::PollingEnabled => Self::PollingEnabled { status },
            AckKind::PollingDisabled => Self::PollingDisabled { status },
            AckKind::CeRegistered => Self::CeRegistered { status, handle: 0 },
            AckKind::CeDeregistered => Self::CeDeregistered { status, handle: 0 },
            AckKind::ScreenStateSet => Self::ScreenStateSet { status },
        }
    }
}
