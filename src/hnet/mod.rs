//! H-NET heat-pump bus decoding.
//!
//! Raw frame -> checksum check -> opcode dispatch -> one extractor -> `Reading`s.
//! Nothing in here does I/O; results go out through `sink::ReadingSink` and
//! `sink::ArchiveSink`.

pub mod decoder;
pub mod frame;
pub mod payload;
pub mod reading;
pub mod sensor;
pub mod sink;
pub mod status;
pub mod system_info;
pub mod tables;
