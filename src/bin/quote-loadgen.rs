use quote_loadgen::config::{self, Command, FormatArg, HarnessConfig};
use quote_loadgen::coordinate::Coordinate;
use quote_loadgen::engine;
use quote_loadgen::error::{Error, Result};
use quote_loadgen::fixtures::FixtureRegistry;
use quote_loadgen::logging;
use quote_loadgen::output;
use quote_loadgen::protocol::Prepared;
use quote_loadgen::transport::{HttpTransport, OfflineTarget, Transport};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = config::parse_args()?;
    let command = cli.command.unwrap_or(Command::Run);
    let (config, format) = config::build_config(cli.args)?;
    match command {
        Command::Run => run_load(&config, format),
        Command::Preview(preview) => {
            let prepared = Prepared::new(config.protocol())?;
            let plans = (0..preview.count.max(1))
                .map(|offset| {
                    let iter = preview.iter.wrapping_add(offset);
                    prepared.plan(Coordinate::new(preview.vu, iter))
                })
                .collect::<Result<Vec<_>>>()?;
            print!("{}", output::render_preview(&plans, format)?);
            Ok(())
        }
        Command::ShowConfig => {
            print!("{}", output::render_config(&config, format)?);
            Ok(())
        }
        Command::Fixtures => {
            let fixtures = FixtureRegistry::new(config.generated_at)?;
            print!("{}", output::render_fixtures(&fixtures, format)?);
            Ok(())
        }
    }
}

fn run_load(config: &HarnessConfig, format: FormatArg) -> Result<()> {
    logging::init(config.debug);

    let transport: Box<dyn Transport> = if config.offline {
        Box::new(OfflineTarget::new())
    } else {
        Box::new(HttpTransport::new()?)
    };
    let report = engine::run_load(config, transport.as_ref())?;

    let formatter = output::formatter_for(format);
    print!("{}", formatter.write(&report)?);

    if !report.passed() {
        return Err(Error::ThresholdsBreached(report.thresholds.breached()));
    }
    Ok(())
}
