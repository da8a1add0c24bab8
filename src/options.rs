use clap::Parser;

/// hnet-bridge - decodes Hisense H-NET bus frames from MQTT
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Decode a single payload (hex string or JSON array) and exit
    #[clap(short = 'd', long = "decode")]
    pub decode: Option<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}
