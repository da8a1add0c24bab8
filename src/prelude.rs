pub use anyhow::{anyhow, bail, Error, Result};
pub use log::{debug, error, info, trace, warn};
pub use std::io::Write;
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::config::{self, Config, ConfigWrapper};
pub use crate::hnet::{
    decoder::{Decoded, DecodeIssue, Decoder},
    frame::{DeviceAddress, Frame},
    reading::{ArchiveReason, ArchiveRecord, Reading, ReadingValue},
    sink::{ArchiveSink, ReadingSink},
    tables::{Opcode, Tables},
};
pub use crate::{archive, coordinator, hnet, home_assistant, mqtt};
