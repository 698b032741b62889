//! Score events: channel voice messages, meta events and SysEx.
//!
//! Events are immutable once built. The playback engine only inspects meta
//! events (tempo and time signature); everything else is passed through to
//! sinks untouched.

use midly::{MetaMessage, MidiMessage, TrackEventKind};
use serde::{Deserialize, Serialize};

/// Standard MIDI File default tempo: 120 BPM.
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Number of logical MIDI 1.0 channels.
pub const CHANNEL_COUNT: u8 = 16;

/// Channel mode controller numbers.
pub mod cc {
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
}

/// MIDI 1.0 channel voice message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelVoice {
    /// Note Off: note number (0-127), release velocity (0-127)
    NoteOff { note: u8, velocity: u8 },

    /// Note On: note number (0-127), velocity (0-127)
    NoteOn { note: u8, velocity: u8 },

    /// Polyphonic key pressure
    PolyAftertouch { note: u8, pressure: u8 },

    /// Control Change: controller (0-127), value (0-127)
    ControlChange { controller: u8, value: u8 },

    /// Program Change: program (0-127)
    ProgramChange { program: u8 },

    /// Channel pressure
    ChannelPressure { pressure: u8 },

    /// Pitch Bend: value (-8192 to 8191)
    PitchBend { value: i16 },
}

/// A channel voice message addressed to one of the 16 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub channel: u8,
    pub message: ChannelVoice,
}

impl ChannelMessage {
    /// Only the low nibble of `channel` is kept, as in the status byte.
    pub fn new(channel: u8, message: ChannelVoice) -> Self {
        Self {
            channel: channel & 0x0F,
            message,
        }
    }

    /// Raw MIDI 1.0 wire bytes (status + data).
    pub fn to_bytes(&self) -> Vec<u8> {
        let channel = self.channel & 0x0F;
        match self.message {
            ChannelVoice::NoteOff { note, velocity } => {
                vec![0x80 | channel, note & 0x7F, velocity & 0x7F]
            }
            ChannelVoice::NoteOn { note, velocity } => {
                vec![0x90 | channel, note & 0x7F, velocity & 0x7F]
            }
            ChannelVoice::PolyAftertouch { note, pressure } => {
                vec![0xA0 | channel, note & 0x7F, pressure & 0x7F]
            }
            ChannelVoice::ControlChange { controller, value } => {
                vec![0xB0 | channel, controller & 0x7F, value & 0x7F]
            }
            ChannelVoice::ProgramChange { program } => vec![0xC0 | channel, program & 0x7F],
            ChannelVoice::ChannelPressure { pressure } => vec![0xD0 | channel, pressure & 0x7F],
            ChannelVoice::PitchBend { value } => {
                // Signed (-8192 to 8191) to unsigned 14-bit (0 to 16383)
                let unsigned = (value as i32 + 8192).clamp(0, 16383) as u16;
                vec![
                    0xE0 | channel,
                    (unsigned & 0x7F) as u8,
                    ((unsigned >> 7) & 0x7F) as u8,
                ]
            }
        }
    }
}

/// Meta event subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetaKind {
    Tempo,
    TimeSignature,
    KeySignature,
    EndOfTrack,
    Other(u8),
}

impl MetaKind {
    pub fn from_type_byte(byte: u8) -> Self {
        match byte {
            0x51 => MetaKind::Tempo,
            0x58 => MetaKind::TimeSignature,
            0x59 => MetaKind::KeySignature,
            0x2F => MetaKind::EndOfTrack,
            other => MetaKind::Other(other),
        }
    }

    pub fn type_byte(self) -> u8 {
        match self {
            MetaKind::Tempo => 0x51,
            MetaKind::TimeSignature => 0x58,
            MetaKind::KeySignature => 0x59,
            MetaKind::EndOfTrack => 0x2F,
            MetaKind::Other(byte) => byte,
        }
    }
}

/// A meta event: subtype plus its raw data bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEvent {
    kind: MetaKind,
    data: Vec<u8>,
}

impl MetaEvent {
    pub fn new(kind: MetaKind, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> MetaKind {
        self.kind
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Tempo in microseconds per quarter note.
    ///
    /// `None` unless this is a tempo event with exactly three data bytes.
    pub fn tempo(&self) -> Option<u32> {
        match (self.kind, self.data.as_slice()) {
            (MetaKind::Tempo, &[a, b, c]) => Some(u32::from_be_bytes([0, a, b, c])),
            _ => None,
        }
    }
}

/// An immutable score event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Channel(ChannelMessage),
    Meta(MetaEvent),
    SysEx(Vec<u8>),
}

impl Event {
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Event::Channel(ChannelMessage::new(
            channel,
            ChannelVoice::NoteOn { note, velocity },
        ))
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Event::Channel(ChannelMessage::new(
            channel,
            ChannelVoice::NoteOff { note, velocity },
        ))
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Event::Channel(ChannelMessage::new(
            channel,
            ChannelVoice::ControlChange { controller, value },
        ))
    }

    /// Tempo meta event. Values above 24 bits are truncated.
    pub fn tempo(micros_per_quarter: u32) -> Self {
        let [_, a, b, c] = (micros_per_quarter & 0x00FF_FFFF).to_be_bytes();
        Event::Meta(MetaEvent::new(MetaKind::Tempo, [a, b, c]))
    }

    /// Time signature meta event from its raw bytes
    /// (numerator, denominator power of two, clocks per click, 32nds per quarter).
    pub fn time_signature(bytes: impl Into<Vec<u8>>) -> Self {
        Event::Meta(MetaEvent::new(MetaKind::TimeSignature, bytes))
    }

    pub fn meta(kind: MetaKind, data: impl Into<Vec<u8>>) -> Self {
        Event::Meta(MetaEvent::new(kind, data))
    }

    #[inline]
    pub fn is_meta(&self) -> bool {
        matches!(self, Event::Meta(_))
    }

    #[inline]
    pub fn meta_kind(&self) -> Option<MetaKind> {
        self.as_meta().map(MetaEvent::kind)
    }

    #[inline]
    pub fn meta_data(&self) -> Option<&[u8]> {
        self.as_meta().map(MetaEvent::data)
    }

    #[inline]
    pub fn as_meta(&self) -> Option<&MetaEvent> {
        match self {
            Event::Meta(meta) => Some(meta),
            _ => None,
        }
    }

    #[inline]
    pub fn as_channel(&self) -> Option<&ChannelMessage> {
        match self {
            Event::Channel(msg) => Some(msg),
            _ => None,
        }
    }

    #[inline]
    pub fn is_tempo(&self) -> bool {
        self.meta_kind() == Some(MetaKind::Tempo)
    }

    #[inline]
    pub fn is_time_signature(&self) -> bool {
        self.meta_kind() == Some(MetaKind::TimeSignature)
    }

    /// Convert a midly track event. Returns `None` for events the score does not keep.
    pub(crate) fn from_midly(kind: &TrackEventKind) -> Option<Self> {
        match kind {
            TrackEventKind::Midi { channel, message } => {
                let message = match *message {
                    // Velocity 0 is a Note Off
                    MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => ChannelVoice::NoteOff {
                        note: key.as_int(),
                        velocity: 0,
                    },
                    MidiMessage::NoteOn { key, vel } => ChannelVoice::NoteOn {
                        note: key.as_int(),
                        velocity: vel.as_int(),
                    },
                    MidiMessage::NoteOff { key, vel } => ChannelVoice::NoteOff {
                        note: key.as_int(),
                        velocity: vel.as_int(),
                    },
                    MidiMessage::Aftertouch { key, vel } => ChannelVoice::PolyAftertouch {
                        note: key.as_int(),
                        pressure: vel.as_int(),
                    },
                    MidiMessage::Controller { controller, value } => ChannelVoice::ControlChange {
                        controller: controller.as_int(),
                        value: value.as_int(),
                    },
                    MidiMessage::ProgramChange { program } => ChannelVoice::ProgramChange {
                        program: program.as_int(),
                    },
                    MidiMessage::ChannelAftertouch { vel } => ChannelVoice::ChannelPressure {
                        pressure: vel.as_int(),
                    },
                    MidiMessage::PitchBend { bend } => ChannelVoice::PitchBend {
                        // u14 centered on 8192
                        value: bend.0.as_int() as i16 - 8192,
                    },
                };
                Some(Event::Channel(ChannelMessage::new(channel.as_int(), message)))
            }
            TrackEventKind::Meta(meta) => Self::from_midly_meta(meta).map(Event::Meta),
            TrackEventKind::SysEx(data) => Some(Event::SysEx(data.to_vec())),
            TrackEventKind::Escape(_) => None,
        }
    }

    fn from_midly_meta(meta: &MetaMessage) -> Option<MetaEvent> {
        let event = match *meta {
            MetaMessage::Tempo(tempo) => {
                let [_, a, b, c] = tempo.as_int().to_be_bytes();
                MetaEvent::new(MetaKind::Tempo, [a, b, c])
            }
            MetaMessage::TimeSignature(num, den, clocks, n32) => {
                MetaEvent::new(MetaKind::TimeSignature, [num, den, clocks, n32])
            }
            MetaMessage::KeySignature(sharps, minor) => {
                MetaEvent::new(MetaKind::KeySignature, [sharps as u8, minor as u8])
            }
            MetaMessage::EndOfTrack => MetaEvent::new(MetaKind::EndOfTrack, Vec::new()),
            MetaMessage::TrackNumber(number) => MetaEvent::new(
                MetaKind::Other(0x00),
                number.map(|n| n.to_be_bytes().to_vec()).unwrap_or_default(),
            ),
            MetaMessage::Text(text) => MetaEvent::new(MetaKind::Other(0x01), text),
            MetaMessage::Copyright(text) => MetaEvent::new(MetaKind::Other(0x02), text),
            MetaMessage::TrackName(text) => MetaEvent::new(MetaKind::Other(0x03), text),
            MetaMessage::InstrumentName(text) => MetaEvent::new(MetaKind::Other(0x04), text),
            MetaMessage::Lyric(text) => MetaEvent::new(MetaKind::Other(0x05), text),
            MetaMessage::Marker(text) => MetaEvent::new(MetaKind::Other(0x06), text),
            MetaMessage::CuePoint(text) => MetaEvent::new(MetaKind::Other(0x07), text),
            MetaMessage::ProgramName(text) => MetaEvent::new(MetaKind::Other(0x08), text),
            MetaMessage::DeviceName(text) => MetaEvent::new(MetaKind::Other(0x09), text),
            MetaMessage::MidiChannel(channel) => {
                MetaEvent::new(MetaKind::Other(0x20), [channel.as_int()])
            }
            MetaMessage::MidiPort(port) => MetaEvent::new(MetaKind::Other(0x21), [port.as_int()]),
            MetaMessage::SequencerSpecific(data) => MetaEvent::new(MetaKind::Other(0x7F), data),
            MetaMessage::Unknown(kind, data) => MetaEvent::new(MetaKind::from_type_byte(kind), data),
            // Absolute-time offsets have no meaning for tick-relative playback
            MetaMessage::SmpteOffset(_) => return None,
        };
        Some(event)
    }
}

/// An event paired with the ticks elapsed since the previous event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub delta: u32,
    pub event: Event,
}

impl TimedEvent {
    pub fn new(delta: u32, event: Event) -> Self {
        Self { delta, event }
    }
}
