//! Parsing Options.
//! `pn-synth [-p PROPS] [-c CONFIG] [-o OUT] [--format dot|json|ron] INPUT`,
//! 也可以通过环境变量 `PN_FLAGS` 传入.

use clap::{Arg, ArgAction, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use crate::separation::PnProperties;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Dot,
    Json,
    Ron,
}

fn make_options_parser() -> clap::Command {
    Command::new("pn-synth")
        .no_binary_name(true)
        .version("v0.1.0")
        .about("Synthesizes a Petri net from a labelled transition system")
        .arg(
            Arg::new("properties")
                .short('p')
                .long("properties")
                .value_name("PROPS")
                .help("Net class, e.g. `pure,plain`, `safe`, `3-bounded`, `tnet`, `cf`"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Where to write the net; stdout when omitted"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .default_value("dot")
                .value_parser(["dot", "json", "ron"]),
        )
        .arg(
            Arg::new("quick-fail")
                .long("quick-fail")
                .action(ArgAction::SetTrue)
                .help("Stop at the first unsolvable separation problem"),
        )
        .arg(
            Arg::new("minimize")
                .long("minimize")
                .action(ArgAction::SetTrue)
                .help("Drop redundant places"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("LTS description (.json or .ron)"),
        )
}

#[derive(Debug, Default)]
pub struct Options {
    /// Overrides the `[properties]` table of the config file.
    pub properties: Option<PnProperties>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub quick_fail: bool,
    pub minimize: bool,
    pub timeout: Option<Duration>,
    pub input: PathBuf,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;

        let properties = matches
            .get_one::<String>("properties")
            .map(|props| props.parse::<PnProperties>())
            .transpose()?;
        let format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("json") => OutputFormat::Json,
            Some("ron") => OutputFormat::Ron,
            Some("dot") | None => OutputFormat::Dot,
            Some(other) => return Err(format!("unsupported output format `{}`", other))?,
        };
        let input = matches
            .get_one::<PathBuf>("input")
            .cloned()
            .ok_or("missing INPUT")?;

        Ok(Options {
            properties,
            config: matches.get_one::<PathBuf>("config").cloned(),
            output: matches.get_one::<PathBuf>("output").cloned(),
            format,
            quick_fail: matches.get_flag("quick-fail"),
            minimize: matches.get_flag("minimize"),
            timeout: matches
                .get_one::<u64>("timeout")
                .map(|secs| Duration::from_secs(*secs)),
            input,
        })
    }
}
