/// Control byte marking a bus acknowledgment.
pub const CONTROL_ACK: u8 = 0x06;

/// Shortest frame that carries a header and a checksum.
pub const MIN_FRAME_LEN: usize = 4;

/// Shortest frame that carries an opcode at index 9.
pub const MIN_PAYLOAD_LEN: usize = 10;

const OPCODE_INDEX: usize = 9;

// DeviceAddress {{{
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DeviceAddress {
    IndoorController,
    OutdoorUnit,
}

impl DeviceAddress {
    /// Anything that isn't the configured indoor controller is treated as the outdoor unit.
    pub fn classify(source_address: u8, indoor_addr: u8) -> Self {
        if source_address == indoor_addr {
            Self::IndoorController
        } else {
            Self::OutdoorUnit
        }
    }

    /// Topic prefix used for readings belonging to this device.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndoorController => "indoor",
            Self::OutdoorUnit => "outdoor",
        }
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
} // }}}

// Frame {{{
/// Read-only view over one H-NET bus message.
///
/// Layout: `[src, ctrl, len, type, .. , opcode @ 9, payload .., checksum]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn source_address(&self) -> Option<u8> {
        self.field(0)
    }

    pub fn control_byte(&self) -> Option<u8> {
        self.field(1)
    }

    pub fn declared_length(&self) -> Option<u8> {
        self.field(2)
    }

    pub fn message_type(&self) -> Option<u8> {
        self.field(3)
    }

    pub fn opcode(&self) -> Option<u8> {
        self.field(OPCODE_INDEX)
    }

    pub fn checksum(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    pub fn is_ack(&self) -> bool {
        self.control_byte() == Some(CONTROL_ACK)
    }

    /// Byte at `index`, or None when the frame is too short to hold it.
    pub fn field(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Same as `field` but treats 0 as "not reported".
    pub fn nonzero_field(&self, index: usize) -> Option<u8> {
        self.field(index).filter(|v| *v != 0)
    }

    /// Checksum this frame ought to carry, or None below the minimum length.
    pub fn expected_checksum(&self) -> Option<u8> {
        if self.len() < MIN_FRAME_LEN {
            return None;
        }

        Some(Self::compute_checksum(self.bytes))
    }

    pub fn checksum_valid(&self) -> bool {
        match (self.expected_checksum(), self.checksum()) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }

    /// XOR of every byte but the last, XORed once more with the source address.
    ///
    /// The source address therefore contributes twice; controllers on the bus
    /// compute it the same way.
    pub fn compute_checksum(bytes: &[u8]) -> u8 {
        let Some((_, data)) = bytes.split_last() else {
            return 0;
        };
        let src = data.first().copied().unwrap_or(0);

        data.iter().fold(0u8, |acc, b| acc ^ b) ^ src
    }

    /// Space separated upper-case hex, as written to logs and the archive.
    pub fn hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
} // }}}
