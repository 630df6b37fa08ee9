// libnfcee/src/reader/state.rs

use crate::constants::{PROTOCOL_ISO_DEP, PROTOCOL_REMOVE};
use crate::transport::{DiscoverOp, DiscoverRequest};
use crate::types::{EeHandle, TechMask};

/// Reader-mode-over-SWP session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderState {
    #[default]
    Stopped,
    StartConfig,
    StartInProgress,
    Started,
    Activated,
    StopConfig,
    StopInProgress,
}

/// Bookkeeping for the secure element that asked for reader mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderSwp {
    pub state: ReaderState,
    pub source: Option<EeHandle>,
    /// Technologies requested by the source EE
    pub requested: TechMask,
    /// Technologies currently polled for the source EE
    pub current: TechMask,
}

fn tech_for(request: &DiscoverRequest, protocol: u8) -> TechMask {
    let mut mask = TechMask::NONE;
    if request.pa_protocol == protocol {
        mask = mask | TechMask::A;
    }
    if request.pb_protocol == protocol {
        mask = mask | TechMask::B;
    }
    mask
}

impl ReaderSwp {
    /// Apply one discover-request entry. Returns `true` if the request was
    /// taken and the coalescing timer must be re-armed.
    pub fn apply(&mut self, request: &DiscoverRequest) -> bool {
        match request.op {
            DiscoverOp::Add => {
                if !matches!(self.state, ReaderState::Stopped | ReaderState::StartConfig) {
                    return false;
                }
                let tech = tech_for(request, PROTOCOL_ISO_DEP);
                if tech.is_empty() {
                    return false;
                }
                self.source = Some(request.handle);
                self.requested = self.requested | tech;
                self.state = ReaderState::StartConfig;
                true
            }
            DiscoverOp::Remove => {
                if !matches!(
                    self.state,
                    ReaderState::Started
                        | ReaderState::StartConfig
                        | ReaderState::StopConfig
                        | ReaderState::Activated
                ) {
                    return false;
                }
                let tech = tech_for(request, PROTOCOL_REMOVE);
                if tech.is_empty() || self.source != Some(request.handle) {
                    return false;
                }
                self.requested = self.requested.without(tech);
                self.state = ReaderState::StopConfig;
                true
            }
        }
    }

    /// Back to idle; forgets the source and masks.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(op: DiscoverOp, handle: EeHandle, pa: u8, pb: u8) -> DiscoverRequest {
        DiscoverRequest {
            handle,
            op,
            pa_protocol: pa,
            pb_protocol: pb,
        }
    }

    #[test]
    fn add_records_source_and_mask() {
        let mut s = ReaderSwp::default();
        assert!(s.apply(&req(DiscoverOp::Add, EeHandle::UICC, 0x04, 0x00)));
        assert!(s.apply(&req(DiscoverOp::Add, EeHandle::UICC, 0x00, 0x04)));
        assert_eq!(s.state, ReaderState::StartConfig);
        assert_eq!(s.source, Some(EeHandle::UICC));
        assert_eq!(s.requested, TechMask::A | TechMask::B);
    }

    #[test]
    fn add_ignored_for_other_protocols_or_states() {
        let mut s = ReaderSwp::default();
        assert!(!s.apply(&req(DiscoverOp::Add, EeHandle::UICC, 0x02, 0x00)));
        s.state = ReaderState::Started;
        assert!(!s.apply(&req(DiscoverOp::Add, EeHandle::UICC, 0x04, 0x04)));
        assert_eq!(s.requested, TechMask::NONE);
    }

    #[test]
    fn remove_only_from_recorded_source() {
        let mut s = ReaderSwp::default();
        s.apply(&req(DiscoverOp::Add, EeHandle::UICC, 0x04, 0x04));
        s.state = ReaderState::Started;
        assert!(!s.apply(&req(DiscoverOp::Remove, EeHandle::ESE, 0xFF, 0x00)));
        assert!(!s.apply(&req(DiscoverOp::Remove, EeHandle::UICC, 0x04, 0x00)));
        assert!(s.apply(&req(DiscoverOp::Remove, EeHandle::UICC, 0xFF, 0x00)));
        assert_eq!(s.state, ReaderState::StopConfig);
        assert_eq!(s.requested, TechMask::B);
    }

    #[test]
    fn remove_while_stopped_dropped() {
        let mut s = ReaderSwp::default();
        assert!(!s.apply(&req(DiscoverOp::Remove, EeHandle::UICC, 0xFF, 0xFF)));
        assert_eq!(s.state, ReaderState::Stopped);
    }
}
