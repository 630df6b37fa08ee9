// libnfcee/src/transport/command.rs

use crate::transport::AckKind;
use crate::types::{
    Aid, EeHandle, EeMode, Nfcid2, PowerMask, PowerTable, ProtoMask, ScreenState, SystemCode,
    TechMask,
};

/// Commands submitted to the controller stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NfaCommand {
    GetEeInfo,
    RegisterEeCallback,
    DeregisterEeCallback,
    ModeSet {
        handle: EeHandle,
        mode: EeMode,
    },
    SetDefaultTechRouting {
        handle: EeHandle,
        routing: PowerTable<TechMask>,
    },
    SetDefaultProtoRouting {
        handle: EeHandle,
        routing: PowerTable<ProtoMask>,
    },
    AddAidRouting {
        handle: EeHandle,
        aid: Aid,
        power: PowerMask,
        prefix: bool,
    },
    RemoveAidRouting {
        aid: Aid,
    },
    /// Commit pending routing changes to the controller table
    UpdateNow,
    GetRouting,
    ConfigureUiccListenTech {
        handle: EeHandle,
        tech: TechMask,
    },
    RegisterAidWildcardOnHost,
    StartRfDiscovery,
    StopRfDiscovery,
    EnablePolling {
        tech: TechMask,
        reader_mode: bool,
    },
    DisablePolling,
    RegisterFelicaSystemCodeOnHost {
        system_code: SystemCode,
        nfcid2: Nfcid2,
    },
    DeregisterFelicaSystemCodeOnHost {
        handle: u16,
    },
    SetScreenState(ScreenState),
}

impl NfaCommand {
    /// Short name used in logs and error values.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetEeInfo => "GetEeInfo",
            Self::RegisterEeCallback => "RegisterEeCallback",
            Self::DeregisterEeCallback => "DeregisterEeCallback",
            Self::ModeSet { .. } => "ModeSet",
            Self::SetDefaultTechRouting { .. } => "SetDefaultTechRouting",
            Self::SetDefaultProtoRouting { .. } => "SetDefaultProtoRouting",
            Self::AddAidRouting { .. } => "AddAidRouting",
            Self::RemoveAidRouting { .. } => "RemoveAidRouting",
            Self::UpdateNow => "UpdateNow",
            Self::GetRouting => "GetRouting",
            Self::ConfigureUiccListenTech { .. } => "ConfigureUiccListenTech",
            Self::RegisterAidWildcardOnHost => "RegisterAidWildcardOnHost",
            Self::StartRfDiscovery => "StartRfDiscovery",
            Self::StopRfDiscovery => "StopRfDiscovery",
            Self::EnablePolling { .. } => "EnablePolling",
            Self::DisablePolling => "DisablePolling",
            Self::RegisterFelicaSystemCodeOnHost { .. } => "RegisterFelicaSystemCodeOnHost",
            Self::DeregisterFelicaSystemCodeOnHost { .. } => "DeregisterFelicaSystemCodeOnHost",
            Self::SetScreenState(_) => "SetScreenState",
        }
    }

    /// Acknowledgement event that completes this command.
    pub fn ack_kind(&self) -> AckKind {
        match self {
            Self::GetEeInfo => AckKind::EeInfo,
            Self::RegisterEeCallback => AckKind::EeRegistered,
            Self::DeregisterEeCallback => AckKind::EeDeregistered,
            Self::ModeSet { .. } => AckKind::ModeSet,
            Self::SetDefaultTechRouting { .. } => AckKind::SetTech,
            Self::SetDefaultProtoRouting { .. } => AckKind::SetProto,
            Self::AddAidRouting { .. } => AckKind::AddAid,
            Self::RemoveAidRouting { .. } => AckKind::RemoveAid,
            Self::UpdateNow => AckKind::Updated,
            Self::GetRouting => AckKind::RoutingTable,
            Self::ConfigureUiccListenTech { .. } => AckKind::UiccListenConfigured,
            Self::RegisterAidWildcardOnHost => AckKind::HostAidRegistered,
            Self::StartRfDiscovery => AckKind::DiscoveryStarted,
            Self::StopRfDiscovery => AckKind::DiscoveryStopped,
            Self::EnablePolling { .. } => AckKind::PollingEnabled,
            Self::DisablePolling => AckKind::PollingDisabled,
            Self::RegisterFelicaSystemCodeOnHost { .. } => AckKind::CeRegistered,
            Self::DeregisterFelicaSystemCodeOnHost { .. } => AckKind::CeDeregistered,
            Self::SetScreenState(_) => AckKind::ScreenStateSet,
        }
    }

    /// Whether the command changes the listen-mode routing table and must
    /// therefore be issued with RF discovery stopped.
    pub fn is_routing_mutation(&self) -> bool {
        matches!(
            self,
            Self::SetDefaultTechRouting { .. }
                | Self::SetDefaultProtoRouting { .. }
                | Self::AddAidRouting { .. }
                | Self::RemoveAidRouting { .. }
                | Self::UpdateNow
                | Self::ConfigureUiccListenTech { .. }
        )
    }
}
