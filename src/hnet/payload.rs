//! Turn an inbound MQTT payload into frame bytes.
//!
//! Sniffers publish either a JSON array (`[33,0,48,...]`) or a hex string
//! (`2100300100...`), sometimes prefixed with a timestamp; only the trailing
//! array, or else the last whitespace-separated token, is looked at.

use nom::{
    bytes::complete::take_while_m_n,
    combinator::{all_consuming, map_res},
    multi::many0,
    IResult,
};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("empty payload")]
    Empty,
    #[error("unrecognized payload format: {0}")]
    UnrecognizedFormat(String),
    #[error("hex payload has odd length {0}")]
    OddLength(usize),
    #[error("invalid JSON frame: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub fn parse(payload: &str) -> Result<Vec<u8>, PayloadError> {
    let payload = payload.trim();

    // a trailing JSON array may itself contain spaces, eg `[33, 0, 48]`
    if payload.ends_with(']') {
        if let Some(start) = payload.rfind('[') {
            return Ok(serde_json::from_str(&payload[start..])?);
        }
    }

    let token = payload.split_whitespace().last().ok_or(PayloadError::Empty)?;

    if !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PayloadError::UnrecognizedFormat(token.to_owned()));
    }
    if token.len() % 2 != 0 {
        return Err(PayloadError::OddLength(token.len()));
    }

    match all_consuming(many0(hex_byte))(token) {
        Ok((_, bytes)) => Ok(bytes),
        Err(_) => Err(PayloadError::UnrecognizedFormat(token.to_owned())),
    }
}

fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()), |pair| {
        u8::from_str_radix(pair, 16)
    })(input)
}
