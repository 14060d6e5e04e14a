use crate::upload::limits::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENCY, MIN_PART_SIZE_BYTES};
use bytesize::ByteSize;
use clap::{
    Arg, ColorChoice, Command,
    builder::ValueParser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub fn validator_is_num() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<usize, String> {
        s.parse::<usize>()
            .map_err(|_| String::from("Not a valid number"))
    })
}

pub fn validator_chunk_size() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<u64, String> {
        let size = s
            .parse::<u64>()
            .map_err(|_| String::from("Not a valid number"))?;

        if size < MIN_PART_SIZE_BYTES {
            return Err(format!(
                "part size must be at least {MIN_PART_SIZE_BYTES} bytes ({})",
                ByteSize(MIN_PART_SIZE_BYTES)
            ));
        }

        Ok(size)
    })
}

pub fn validator_is_file() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<PathBuf, String> {
        if let Ok(metadata) = fs::metadata(s) {
            if metadata.is_file() {
                return Ok(PathBuf::from(s));
            }
        }

        Err(format!("Invalid file path or file does not exist: '{s}'"))
    })
}

pub fn new(config_path: &Path) -> Command {
    // get config file path (default: ~/.config/partup/config.yml)
    let config_file_path = config_path.join("config.yml");

    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("partup")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("file")
            .help("/path/to/file")
            .required_unless_present("show")
            .value_parser(validator_is_file())
            .num_args(1)
        )
        .arg(
            Arg::new("host")
            .help("Host defined in the config file")
            .required_unless_present("show")
            .num_args(1)
        )
        .arg(
            Arg::new("name")
            .help("Name of the uploaded file, defaults to the file name without extension")
            .long("name")
            .num_args(1)
        )
        .arg(
            Arg::new("chunk-size")
            .default_value(DEFAULT_CHUNK_SIZE.to_string())
            .help("Part size in bytes, minimum 5 MiB")
            .long("chunk-size")
            .short('s')
            .num_args(1)
            .value_parser(validator_chunk_size())
        )
        .arg(
            Arg::new("concurrency")
            .help("Number of max concurrent part uploads, 0 for the default, capped at 15")
            .long("concurrency")
            .short('n')
            .default_value(DEFAULT_MAX_CONCURRENCY.to_string())
            .value_parser(validator_is_num())
            .num_args(1)
        )
        .arg(
            Arg::new("retries")
            .help("Number of attempts per part")
            .long("retries")
            .short('r')
            .default_value("1")
            .value_parser(validator_is_num())
            .num_args(1)
        )
        .arg(
            Arg::new("quiet")
            .long("quiet")
            .short('q')
            .help("Don't show progress bar")
            .num_args(0)
        )
        .arg(
            Arg::new("config")
            .default_value(config_file_path.into_os_string())
            .long("config")
            .num_args(1)
            .short('c')
            .value_parser(validator_is_file())
            .value_name("config.yml")
        )
        .arg(
            Arg::new("show")
            .help("List the hosts defined in the config file")
            .long("show")
            .num_args(0)
        )
        .arg(
            Arg::new("verbose")
            .help("Verbosity level")
            .short('v')
            .long("verbose")
            .global(true)
            .action(clap::ArgAction::Count)
        )
}
