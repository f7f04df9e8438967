use anyhow::Context;
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use huffpack::config::CodecConfig;
use huffpack::{Codec, CompressionStats};
use std::path::PathBuf;

fn file_args(command: Command, about: &'static str) -> Command {
    command
        .about(about)
        .arg(
            Arg::new("path")
                .value_name("PATH")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("File to operate on"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUT")
                .value_parser(value_parser!(PathBuf))
                .help("Write here instead of the derived sibling path"),
        )
}

fn cli() -> Command {
    Command::new("huffpack")
        .version(crate_version!())
        .about("Compresses UTF-8 text files with a per-file Huffman code")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log more (repeat for trace output)"),
        )
        .subcommand(file_args(
            Command::new("compress"),
            "Compress PATH into PATH_compressed",
        ))
        .subcommand(file_args(
            Command::new("uncompress").visible_alias("decompress"),
            "Restore a compressed PATH into PATH_uncompressed",
        ))
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<CodecConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => CodecConfig::from_json_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(CodecConfig::default()),
    }
}

fn run_file(
    codec: &Codec,
    matches: &ArgMatches,
    compress: bool,
) -> anyhow::Result<(PathBuf, CompressionStats)> {
    let source = matches
        .get_one::<PathBuf>("path")
        .expect("PATH is required by clap");
    let action = if compress { "compress" } else { "uncompress" };
    let result = match (matches.get_one::<PathBuf>("output"), compress) {
        (Some(target), true) => codec
            .compress_file_to(source, target)
            .map(|stats| (target.clone(), stats)),
        (Some(target), false) => codec
            .decompress_file_to(source, target)
            .map(|stats| (target.clone(), stats)),
        (None, true) => codec.compress_file(source),
        (None, false) => codec.decompress_file(source),
    };
    result.with_context(|| format!("failed to {} {}", action, source.display()))
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"));

    let codec = Codec::new(load_config(&matches)?);
    tracing::debug!(config = ?codec.config(), "loaded configuration");
    let (target, stats) = match matches.subcommand() {
        Some(("compress", sub)) => run_file(&codec, sub, true)?,
        Some(("uncompress", sub)) => run_file(&codec, sub, false)?,
        _ => unreachable!("subcommand_required is set"),
    };
    tracing::info!("stats {}", stats_json(&stats)?);
    println!("{}", target.display());
    Ok(())
}

fn stats_json(stats: &CompressionStats) -> anyhow::Result<String> {
    serde_json::to_string(stats).context("failed to serialize stats")
}
