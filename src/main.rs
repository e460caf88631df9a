use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result, anyhow};
use log::debug;

use pn_synth::cancel::CancellationToken;
use pn_synth::config::SynthConfig;
use pn_synth::lts::{Lts, LtsDescription};
use pn_synth::net::io;
use pn_synth::options::{Options, OutputFormat};
use pn_synth::synthesize::{SynthesisError, SynthesisOutcome, Synthesizer};

const EXIT_UNSYNTHESIZABLE: u8 = 1;
const EXIT_TIMEOUT: u8 = 2;
const EXIT_ERROR: u8 = 3;

fn main() -> ExitCode {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let options = match parse_options() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    debug!("PN options: {:?}", options);

    match run(&options) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_UNSYNTHESIZABLE),
        Err(err) if is_timeout(&err) => {
            eprintln!("synthesis aborted: timeout");
            ExitCode::from(EXIT_TIMEOUT)
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Flags from `PN_FLAGS` come first, command-line arguments after them.
fn parse_options() -> Result<Options> {
    let mut flags = shellwords::split(&std::env::var("PN_FLAGS").unwrap_or_default())
        .map_err(|err| anyhow!("invalid PN_FLAGS: {}", err))?;
    flags.extend(std::env::args().skip(1));
    Options::parse_from_args(&flags).map_err(|err| anyhow!("{}", err))
}

/// Returns whether the LTS was synthesizable.
fn run(options: &Options) -> Result<bool> {
    let config = match &options.config {
        Some(path) => SynthConfig::load_from_file(path)?,
        None => SynthConfig::default(),
    };
    let properties = options
        .properties
        .clone()
        .unwrap_or_else(|| config.properties());
    let mut synthesis = config.synthesis();
    synthesis.quick_fail |= options.quick_fail;
    synthesis.minimize |= options.minimize;

    let description: LtsDescription = io::read_file(&options.input)
        .with_context(|| format!("Failed to read LTS: {:?}", options.input))?;
    let lts = Lts::from_description(&description)
        .with_context(|| format!("Invalid LTS: {:?}", options.input))?;

    let cancel = CancellationToken::new();
    if let Some(timeout) = options.timeout {
        let watchdog = cancel.clone();
        thread::spawn(move || {
            thread::sleep(timeout);
            watchdog.cancel();
        });
    }

    let outcome = Synthesizer::new(&lts, properties, synthesis, cancel).synthesize()?;
    if outcome.is_success() {
        write_net(options, &outcome, lts.name())?;
    } else {
        report_failures(&lts, &outcome);
    }
    Ok(outcome.is_success())
}

fn write_net(options: &Options, outcome: &SynthesisOutcome, name: &str) -> Result<()> {
    let net = outcome.to_net(name);
    let Some(path) = &options.output else {
        let rendered = match options.format {
            OutputFormat::Dot => net.to_dot(),
            OutputFormat::Json => io::to_json_string(&net)?,
            OutputFormat::Ron => io::to_ron_string(&net)?,
        };
        println!("{}", rendered);
        return Ok(());
    };
    match options.format {
        OutputFormat::Dot => net.write_dot(path).map_err(io::IoError::from),
        OutputFormat::Json => io::write_json(path, &net),
        OutputFormat::Ron => io::write_ron(path, &net),
    }
    .with_context(|| format!("Failed to write net: {:?}", path))
}

fn report_failures(lts: &Lts, outcome: &SynthesisOutcome) {
    eprintln!("`{}` is not synthesizable", lts.name());
    for (state, other) in &outcome.failed_state_separation {
        eprintln!(
            "  cannot separate states {} and {}",
            lts.state_name(*state),
            lts.state_name(*other)
        );
    }
    for (state, event) in &outcome.failed_event_separation {
        eprintln!(
            "  cannot disable event {} at state {}",
            event,
            lts.state_name(*state)
        );
    }
}

fn is_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<SynthesisError>()
        .is_some_and(SynthesisError::is_cancelled)
}
