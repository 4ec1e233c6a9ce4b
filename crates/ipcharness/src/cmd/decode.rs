use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use ipcharness_frame::{FrameConfig, FrameReader};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, stream_error, CliResult, SUCCESS};
use crate::output::{print_payloads, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let source = args.file.unwrap_or_else(|| PathBuf::from("-"));
    let input: Box<dyn Read> = if source == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&source)
            .map_err(|err| io_error(&format!("failed opening {}", source.display()), err))?;
        Box::new(file)
    };

    let config = FrameConfig {
        max_payload_size: args.max_payload,
        ..FrameConfig::default()
    };
    let payloads = FrameReader::with_config(input, config)
        .read_session()
        .map_err(|err| stream_error("decode failed", err))?;
    print_payloads(&payloads, &source, format);

    Ok(SUCCESS)
}
