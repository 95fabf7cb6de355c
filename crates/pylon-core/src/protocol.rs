//! The tagged binary wire protocol.
//!
//! Every frame is a non-empty byte sequence whose first byte is the opcode:
//!
//! | Opcode | Meaning | Fan-out |
//! |--------|---------|---------|
//! | `0x05` | Room control (`0x00` close, `0x01` open) | 2-byte notice to all peers on a valid transition |
//! | `0x06` | Presence notice (server → peer only) | n/a |
//! | `0x07` | Latency probe | echoed to the sender only |
//! | `0x08` | Drift | discarded |
//! | `0x09` | Identity announcement | full frame to all peers, sender included |
//! | other  | Opaque peer payload | all peers except the sender |
//!
//! An unknown opcode is never an error — it is an opaque payload. Inbound
//! `0x06` frames get no special treatment and fall through to the opaque
//! case as well.

use bytes::Bytes;

/// Opcode byte values.
pub mod opcode {
    /// Room control command.
    pub const ROOM_CONTROL: u8 = 0x05;
    /// Presence notice (outbound only).
    pub const NOTICE: u8 = 0x06;
    /// Latency probe, echoed verbatim.
    pub const LATENCY: u8 = 0x07;
    /// Drift frame, accepted and discarded.
    pub const DRIFT: u8 = 0x08;
    /// Identity announcement.
    pub const IDENTITY: u8 = 0x09;
}

/// A room control sub-command (second byte of a `0x05` frame).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomCommand {
    /// Close the room (`0x00`) — suppresses join/leave notices.
    Close,
    /// Open the room (`0x01`) — admits join/leave notices.
    Open,
}

/// A presence notice the hub pushes to peers as a 2-byte `0x06` frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The room was closed (`0x00`).
    RoomClosed,
    /// The room was opened (`0x01`).
    RoomOpened,
    /// A peer joined (`0x02`).
    PeerJoined,
    /// A peer left (`0x03`).
    PeerLeft,
}

impl Notice {
    /// The notice code byte.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::RoomClosed => 0x00,
            Self::RoomOpened => 0x01,
            Self::PeerJoined => 0x02,
            Self::PeerLeft => 0x03,
        }
    }

    /// Encode as a complete 2-byte wire frame.
    #[must_use]
    pub fn frame(self) -> Bytes {
        Bytes::from(vec![opcode::NOTICE, self.code()])
    }
}

/// Classification of one inbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Valid `0x05` frame carrying a room command.
    RoomControl(RoomCommand),
    /// `0x07` — echo the exact frame back to the sender.
    LatencyProbe,
    /// `0x08` — no side effect.
    Drift,
    /// `0x09` — the body (everything after the opcode) is the identity.
    Identity,
    /// Anything else — relay to every peer except the sender.
    Opaque,
}

impl Inbound {
    /// Classify a raw inbound frame.
    ///
    /// Returns `None` when the frame must be silently ignored: it is empty,
    /// or it is a room-control frame that is too short or carries an
    /// unknown sub-command.
    #[must_use]
    pub fn classify(frame: &[u8]) -> Option<Self> {
        let (&op, body) = frame.split_first()?;
        match op {
            opcode::ROOM_CONTROL => match body.first() {
                Some(0x00) => Some(Self::RoomControl(RoomCommand::Close)),
                Some(0x01) => Some(Self::RoomControl(RoomCommand::Open)),
                _ => None,
            },
            opcode::LATENCY => Some(Self::LatencyProbe),
            opcode::DRIFT => Some(Self::Drift),
            opcode::IDENTITY => Some(Self::Identity),
            _ => Some(Self::Opaque),
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::RoomControl(_) => "room_control",
            Self::LatencyProbe => "latency_probe",
            Self::Drift => "drift",
            Self::Identity => "identity",
            Self::Opaque => "opaque",
        }
    }
}

/// Uppercase hex rendering of at most `max_bytes` bytes, with a trailing
/// `...` when truncated. Used for traffic logging only.
#[must_use]
pub fn hex_preview(data: &[u8], max_bytes: usize) -> String {
    let shown = &data[..data.len().min(max_bytes)];
    let mut out = String::with_capacity(shown.len() * 2 + 3);
    for b in shown {
        out.push_str(&format!("{b:02X}"));
    }
    if data.len() > max_bytes {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_frame_is_ignored() {
        assert_eq!(Inbound::classify(&[]), None);
    }

    #[test]
    fn room_close_command() {
        assert_eq!(
            Inbound::classify(&[0x05, 0x00]),
            Some(Inbound::RoomControl(RoomCommand::Close))
        );
    }

    #[test]
    fn room_open_command() {
        assert_eq!(
            Inbound::classify(&[0x05, 0x01]),
            Some(Inbound::RoomControl(RoomCommand::Open))
        );
    }

    #[test]
    fn short_room_control_is_ignored() {
        assert_eq!(Inbound::classify(&[0x05]), None);
    }

    #[test]
    fn unknown_room_subcommand_is_ignored() {
        assert_eq!(Inbound::classify(&[0x05, 0x7F]), None);
        assert_eq!(Inbound::classify(&[0x05, 0x02, 0xFF]), None);
    }

    #[test]
    fn latency_probe_any_payload() {
        assert_eq!(Inbound::classify(&[0x07]), Some(Inbound::LatencyProbe));
        assert_eq!(
            Inbound::classify(&[0x07, 0x01, 0x02]),
            Some(Inbound::LatencyProbe)
        );
    }

    #[test]
    fn drift_is_recognized() {
        assert_eq!(Inbound::classify(&[0x08, 0xAA]), Some(Inbound::Drift));
    }

    #[test]
    fn identity_is_recognized() {
        assert_eq!(
            Inbound::classify(&[0x09, 0xAB, 0xCD]),
            Some(Inbound::Identity)
        );
    }

    #[test]
    fn inbound_notice_falls_to_opaque() {
        // 0x06 is outbound-only; an inbound one is just another payload.
        assert_eq!(Inbound::classify(&[0x06, 0x02]), Some(Inbound::Opaque));
    }

    #[test]
    fn unknown_opcode_is_opaque() {
        assert_eq!(Inbound::classify(&[0x42, 0xFF]), Some(Inbound::Opaque));
        assert_eq!(Inbound::classify(&[0x00]), Some(Inbound::Opaque));
    }

    #[test]
    fn notice_frames() {
        assert_eq!(&Notice::RoomClosed.frame()[..], &[0x06, 0x00]);
        assert_eq!(&Notice::RoomOpened.frame()[..], &[0x06, 0x01]);
        assert_eq!(&Notice::PeerJoined.frame()[..], &[0x06, 0x02]);
        assert_eq!(&Notice::PeerLeft.frame()[..], &[0x06, 0x03]);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(Inbound::Opaque.kind(), "opaque");
        assert_eq!(
            Inbound::RoomControl(RoomCommand::Open).kind(),
            "room_control"
        );
    }

    #[test]
    fn hex_preview_truncates() {
        assert_eq!(hex_preview(&[0xAB, 0xCD], 8), "ABCD");
        assert_eq!(hex_preview(&[0x01, 0x02, 0x03], 2), "0102...");
        assert_eq!(hex_preview(&[], 8), "");
    }

    proptest! {
        #[test]
        fn non_empty_non_control_frames_always_classify(frame in proptest::collection::vec(any::<u8>(), 1..64)) {
            let classified = Inbound::classify(&frame);
            if frame[0] == opcode::ROOM_CONTROL {
                // Only well-formed control frames classify
                let ok = matches!(frame.get(1), Some(0x00 | 0x01));
                prop_assert_eq!(classified.is_some(), ok);
            } else {
                prop_assert!(classified.is_some());
            }
        }
    }
}
