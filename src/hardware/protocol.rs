//! Control protocol multiplexed over the beacon link
//!
//! Every message is one id byte followed by an optional payload.

use thiserror::Error;

/// Message identifiers understood by the accessory firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageId {
    // From the accessory
    AccessoryConfigurationData = 0x01,
    AccessoryUwbDidStart = 0x02,
    AccessoryUwbDidStop = 0x03,

    // To the accessory
    Initialize = 0x0A,
    ConfigureAndStart = 0x0B,
    Stop = 0x0C,

    // User defined / notification
    GetReserved = 0x20,
    SetReserved = 0x21,
    IosNotify = 0x2F,
}

impl TryFrom<u8> for MessageId {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(MessageId::AccessoryConfigurationData),
            0x02 => Ok(MessageId::AccessoryUwbDidStart),
            0x03 => Ok(MessageId::AccessoryUwbDidStop),
            0x0A => Ok(MessageId::Initialize),
            0x0B => Ok(MessageId::ConfigureAndStart),
            0x0C => Ok(MessageId::Stop),
            0x20 => Ok(MessageId::GetReserved),
            0x21 => Ok(MessageId::SetReserved),
            0x2F => Ok(MessageId::IosNotify),
            other => Err(ProtocolError::UnknownMessageId { id: other }),
        }
    }
}

/// Malformed traffic from the accessory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("0x{id:02X} is not a valid message id")]
    UnknownMessageId { id: u8 },
    #[error("configuration data message carries no payload")]
    MissingConfiguration,
}

/// Decoded message sent by the accessory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessoryMessage {
    /// Accessory configuration for the ranging subsystem
    ConfigurationData(Vec<u8>),
    UwbDidStart,
    UwbDidStop,
    /// Recognised id with no meaning on this side of the link
    Ignored(MessageId),
}

impl AccessoryMessage {
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let (&first, payload) = data.split_first().ok_or(ProtocolError::Empty)?;

        match MessageId::try_from(first)? {
            MessageId::AccessoryConfigurationData => {
                if payload.is_empty() {
                    return Err(ProtocolError::MissingConfiguration);
                }
                Ok(AccessoryMessage::ConfigurationData(payload.to_vec()))
            }
            MessageId::AccessoryUwbDidStart => Ok(AccessoryMessage::UwbDidStart),
            MessageId::AccessoryUwbDidStop => Ok(AccessoryMessage::UwbDidStop),
            other => Ok(AccessoryMessage::Ignored(other)),
        }
    }
}

/// Control message sent to the accessory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Initialize,
    /// Shareable configuration produced by the local ranging subsystem
    ConfigureAndStart(Vec<u8>),
    Stop,
}

impl ControlMessage {
    pub fn id(&self) -> MessageId {
        match self {
            ControlMessage::Initialize => MessageId::Initialize,
            ControlMessage::ConfigureAndStart(_) => MessageId::ConfigureAndStart,
            ControlMessage::Stop => MessageId::Stop,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![self.id() as u8];
        if let ControlMessage::ConfigureAndStart(payload) = self {
            data.extend_from_slice(payload);
        }
        data
    }
}
