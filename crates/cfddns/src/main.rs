// # cfddns - Cloudflare DDNS helper
//
// This binary is a THIN integration layer:
// 1. Parsing and validating command-line flags
// 2. Initializing logging and the runtime
// 3. Wiring the reqwest transport into a reconciliation session
// 4. Dispatching the selected action and printing its results
//
// Reconciliation, caching and retry logic all live in cfddns-core.
//
// ## Output
//
// Results go to stdout as one JSON object per line (zones, records, or
// applied actions). Logs go to stderr.
//
// ## Example
//
// ```bash
// export CF_API_TOKEN=your_token
//
// cfddns --update-record -d home.example.com -4 203.0.113.7 --ttl 120
// cfddns --add-record -z example.com -a www --cname-alias home
// cfddns --delete-record -z example.com -a old --dns-type AAAA
// cfddns --update-record -d home.example.com --detect-ipv4 --detect-ipv6
// ```

mod cli;
mod plan;

use clap::Parser;
use clap::error::ErrorKind;
use cfddns_core::{CloudflareClient, Error, Session};
use cfddns_http::ReqwestTransport;
use cfddns_ip_http::{IpVersion, PublicIpFinder};
use cli::{Cli, Command};
use plan::Plan;
use serde::Serialize;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible outcomes of a run
///
/// - 0: Success, help or version
/// - 1: Invalid input or configuration (nothing was changed)
/// - 2: Runtime failure (remote errors, failed groups)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CfddnsExitCode {
    /// Everything requested was done
    Success = 0,
    /// Flags, files, zones or domains were rejected
    InvalidInput = 1,
    /// A remote call or reconciliation group failed
    RuntimeError = 2,
}

impl From<CfddnsExitCode> for ExitCode {
    fn from(code: CfddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&Error> for CfddnsExitCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::Validation(_) | Error::ZoneNotFound(_) | Error::Config(_) => CfddnsExitCode::InvalidInput,
            _ => CfddnsExitCode::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CfddnsExitCode::Success,
                _ => CfddnsExitCode::InvalidInput,
            }
            .into();
        }
    };

    let command = match cli.validate() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return CfddnsExitCode::InvalidInput.into();
        }
    };

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to set up logging: {:#}", e);
        return CfddnsExitCode::InvalidInput.into();
    }

    info!("cfddns {} starting ({:?})", env!("CARGO_PKG_VERSION"), command);

    let mut plan = match Plan::from_cli(&cli, command) {
        Ok(plan) => plan,
        Err(e) => {
            error!("{:#}", e);
            return CfddnsExitCode::InvalidInput.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CfddnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(&cli, &mut plan).await {
            Ok(code) => code,
            Err(e) => {
                error!("{}", e);
                CfddnsExitCode::from(&e)
            }
        }
    });

    code.into()
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level()?)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Print one result line
fn emit<T: Serialize>(value: &T) -> cfddns_core::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Connect and carry out the selected action
async fn run(cli: &Cli, plan: &mut Plan) -> cfddns_core::Result<CfddnsExitCode> {
    let client_config = cli.client_config();

    if cli.detect_ipv4 || cli.detect_ipv6 {
        let finder = PublicIpFinder::new(Box::new(ReqwestTransport::new(&client_config)?));
        for (wanted, version) in [(cli.detect_ipv4, IpVersion::V4), (cli.detect_ipv6, IpVersion::V6)] {
            if wanted {
                plan.add_address(finder.detect(version).await?);
            }
        }
    }

    let transport = ReqwestTransport::new(&client_config)?;
    let client = CloudflareClient::new(Box::new(transport), cli.credentials()?, &client_config)?;
    let mut session = Session::connect(client, cli.session_config()).await?;

    let target = match plan.command {
        Command::ListZones => {
            for zone in session.list_zones() {
                emit(&zone)?;
            }
            return Ok(CfddnsExitCode::Success);
        }
        _ => plan.build_target(session.resolver())?,
    };

    let report = match plan.command {
        Command::Update => session.update_records(&target).await?,
        Command::Create => session.create_records(&target).await?,
        Command::Delete => session.delete_records(&target).await?,
        Command::ListZones | Command::ListRecords => {
            for record in session.list_records(&target).await? {
                emit(&record)?;
            }
            return Ok(CfddnsExitCode::Success);
        }
    };

    for applied in &report.applied {
        emit(applied)?;
    }
    info!(
        "{} change(s) applied, {} record(s) kept, {} group(s) skipped, {} group(s) failed",
        report.mutation_count(),
        report.kept.len(),
        report.skipped.len(),
        report.failed.len()
    );

    if report.is_success() {
        Ok(CfddnsExitCode::Success)
    } else {
        Ok(CfddnsExitCode::RuntimeError)
    }
}
