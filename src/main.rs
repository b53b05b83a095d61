use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use is_terminal::IsTerminal;

use spinx::infrastructure::Interrupt;
use spinx::presentation::{create_deployer, create_renderer, format_error, Cli, Operation, OutputFormat};
use spinx::{logging, SpinxError};

/// Exit status for a run cancelled with Ctrl+C
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::from_json_flag(cli.json);

    if let Err(err) = logging::init_tracing(cli.verbose) {
        eprintln!("[ERROR] failed to initialise logging: {}", err);
    }

    match run(&cli, format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<SpinxError>() {
            Some(spinx_err) => {
                eprintln!("{}", format_error(spinx_err, format));
                if spinx_err.is_interrupted() {
                    ExitCode::from(EXIT_INTERRUPTED)
                } else {
                    ExitCode::FAILURE
                }
            }
            None => {
                eprintln!("[ERROR] {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: &Cli, format: OutputFormat) -> Result<()> {
    let interrupt = Interrupt::install_ctrlc();
    let (deployer, _warnings) = create_deployer(&cli.config, cli.backend, interrupt)?;

    let unicode = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let renderer = create_renderer(format, unicode, cli.verbose);

    match cli.operation {
        Operation::Setup => {
            let report = deployer.setup()?;
            println!("{}", renderer.setup(&report));
        }
        Operation::Deploy => {
            let report = deployer.deploy()?;
            println!("{}", renderer.deploy(&report));
        }
        Operation::Destroy => {
            // Leftovers are reported, never turned into a failing exit status
            let report = deployer.destroy();
            println!("{}", renderer.teardown(&report));
        }
        Operation::Logs => deployer.logs()?,
    }
    Ok(())
}
