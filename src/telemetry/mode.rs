//! Telemetry announcement modes (§3.3): the full ~45-value enum, each one a
//! distinct spoken/toned announcement the scheduler knows how to execute.

/// One announcement kind. Variants map 1:1 onto §3.3's enumerated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Id,
    Id1,
    Proc,
    Term,
    Complete,
    Unkey,
    RemDisc,
    RemAlready,
    RemNotFound,
    RemGo,
    Connected,
    ConnFail,
    Status,
    Timeout,
    StatsTime,
    Playback,
    LocalPlay,
    StatsVersion,
    IdTalkover,
    ArbAlpha,
    TestTone,
    RevPatch,
    TailMsg,
    MacroNotFound,
    MacroBusy,
    LastNodeKey,
    FullStatus,
    MemNotFound,
    InvFreq,
    RemMode,
    RemLogin,
    RemXxx,
    RemShortStatus,
    RemLongStatus,
    LoginReq,
    Scan,
    ScanStat,
    Tune,
    SetRemote,
    TopKey,
    TimeoutWarning,
    ActTimeoutWarning,
    LinkUnkey,
    UnauthTx,
    Parrot,
    StatsTimeLocal,
    VarCmd,
    LocUnkey,
    Meter,
    UserOut,
    Page,
    StatsGps,
    StatsGpsLegacy,
    Mdc1200,
    LastUser,
    RemComplete,
    PfxTone,
}

impl Mode {
    /// Modes that bypass FIFO serialization and preempt whatever is
    /// currently playing (§4.4 step 1: "SETREMOTE and a few status
    /// variants").
    pub fn is_immediate(self) -> bool {
        matches!(
            self,
            Mode::SetRemote | Mode::RemShortStatus | Mode::RemLongStatus | Mode::RemMode | Mode::RemLogin
        )
    }

    /// ID-family modes are exempt from `holdofftelem`'s live-audio holdoff
    /// (§4.4 step 2: "...(`remrx` and mode != ID)...").
    pub fn is_id_family(self) -> bool {
        matches!(self, Mode::Id | Mode::Id1 | Mode::IdTalkover)
    }

    /// Which of the eight pre-delay classes `get_wait_interval` keys off of
    /// (§4.4 step 3). Everything not named explicitly in §4.4 falls back to
    /// the generic `Telem` class.
    pub fn wait_kind(self) -> WaitKind {
        match self {
            Mode::Id | Mode::Id1 | Mode::IdTalkover => WaitKind::Id,
            Mode::Unkey | Mode::LocUnkey => WaitKind::Unkey,
            Mode::LinkUnkey => WaitKind::LinkUnkey,
            Mode::Term | Mode::RemDisc => WaitKind::CallTerm,
            Mode::Complete | Mode::RemComplete => WaitKind::Comp,
            Mode::Parrot => WaitKind::Parrot,
            Mode::Mdc1200 => WaitKind::Mdc1200,
            _ => WaitKind::Telem,
        }
    }
}

/// The eight pre-delay classes `get_wait_interval(type)` distinguishes
/// (§4.4 step 3): `TELEM, ID, UNKEY, CALLTERM, COMP, LINKUNKEY, PARROT,
/// MDC1200`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitKind {
    Telem,
    Id,
    Unkey,
    CallTerm,
    Comp,
    LinkUnkey,
    Parrot,
    Mdc1200,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setremote_is_immediate() {
        assert!(Mode::SetRemote.is_immediate());
        assert!(!Mode::Id.is_immediate());
    }

    #[test]
    fn id_family_recognized() {
        assert!(Mode::Id.is_id_family());
        assert!(Mode::Id1.is_id_family());
        assert!(Mode::IdTalkover.is_id_family());
        assert!(!Mode::Unkey.is_id_family());
    }

    #[test]
    fn wait_kind_groups_match_the_four_ununique_classes() {
        assert_eq!(Mode::Id.wait_kind(), WaitKind::Id);
        assert_eq!(Mode::Unkey.wait_kind(), WaitKind::Unkey);
        assert_eq!(Mode::LinkUnkey.wait_kind(), WaitKind::LinkUnkey);
        assert_eq!(Mode::Parrot.wait_kind(), WaitKind::Parrot);
        assert_eq!(Mode::Mdc1200.wait_kind(), WaitKind::Mdc1200);
        assert_eq!(Mode::Status.wait_kind(), WaitKind::Telem);
    }
}
