//! Message-type enumeration and wire codes.

use std::fmt;

/// Every frame kind exchanged between the server and its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Presentation, sent once by the client before its role is fixed.
    IAmController,
    IAmViewer,
    IAmBoth,

    // Client to server.
    Bye,
    Init,
    Play,
    Step,
    Pause,
    Stop,
    AddProbe,
    RemoveProbe,
    SetSimulationDelay,
    KillSimulator,

    // Server to viewer.
    Start,
    End,
    Action,
    Idle,
    Addition,
    Deletion,
    Probe,
    Killed,
}

impl MessageType {
    pub const ALL: [MessageType; 21] = [
        MessageType::IAmController,
        MessageType::IAmViewer,
        MessageType::IAmBoth,
        MessageType::Bye,
        MessageType::Init,
        MessageType::Play,
        MessageType::Step,
        MessageType::Pause,
        MessageType::Stop,
        MessageType::AddProbe,
        MessageType::RemoveProbe,
        MessageType::SetSimulationDelay,
        MessageType::KillSimulator,
        MessageType::Start,
        MessageType::End,
        MessageType::Action,
        MessageType::Idle,
        MessageType::Addition,
        MessageType::Deletion,
        MessageType::Probe,
        MessageType::Killed,
    ];

    /// One-byte tag written at the head of every frame.
    pub fn code(self) -> u8 {
        match self {
            MessageType::IAmController => 0x01,
            MessageType::IAmViewer => 0x02,
            MessageType::IAmBoth => 0x03,
            MessageType::Bye => 0x04,
            MessageType::Init => 0x10,
            MessageType::Play => 0x11,
            MessageType::Step => 0x12,
            MessageType::Pause => 0x13,
            MessageType::Stop => 0x14,
            MessageType::AddProbe => 0x15,
            MessageType::RemoveProbe => 0x16,
            MessageType::SetSimulationDelay => 0x17,
            MessageType::KillSimulator => 0x18,
            MessageType::Start => 0x30,
            MessageType::End => 0x31,
            MessageType::Action => 0x32,
            MessageType::Idle => 0x33,
            MessageType::Addition => 0x34,
            MessageType::Deletion => 0x35,
            MessageType::Probe => 0x36,
            MessageType::Killed => 0x37,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// `true` for the three handshake messages.
    pub fn is_presentation(self) -> bool {
        matches!(
            self,
            MessageType::IAmController | MessageType::IAmViewer | MessageType::IAmBoth
        )
    }

    /// `true` for frames the server only ever writes to viewers.
    pub fn is_viewer_bound(self) -> bool {
        matches!(
            self,
            MessageType::Start
                | MessageType::End
                | MessageType::Action
                | MessageType::Idle
                | MessageType::Addition
                | MessageType::Deletion
                | MessageType::Probe
                | MessageType::Killed
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::IAmController => "IAMCONTROLLER",
            MessageType::IAmViewer => "IAMVIEWER",
            MessageType::IAmBoth => "IAMBOTH",
            MessageType::Bye => "BYE",
            MessageType::Init => "INIT",
            MessageType::Play => "PLAY",
            MessageType::Step => "STEP",
            MessageType::Pause => "PAUSE",
            MessageType::Stop => "STOP",
            MessageType::AddProbe => "ADD_PROBE",
            MessageType::RemoveProbe => "REMOVE_PROBE",
            MessageType::SetSimulationDelay => "SET_SIMULATION_DELAY",
            MessageType::KillSimulator => "KILL_SIMULATOR",
            MessageType::Start => "START",
            MessageType::End => "END",
            MessageType::Action => "ACTION",
            MessageType::Idle => "IDLE",
            MessageType::Addition => "ADDITION",
            MessageType::Deletion => "DELETION",
            MessageType::Probe => "PROBE",
            MessageType::Killed => "KILLED",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
