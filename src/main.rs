//! exitswitch binary: resolves the VPN backend, then serves the HTTP
//! control surface or runs a one-shot command.

use std::io;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::{info, warn};

use exitswitch::backend::resolver::{self, Refresh};
use exitswitch::catalog::{HttpRelaySource, RelaySource};
use exitswitch::cli::args::{Args, Commands};
use exitswitch::cli::commands;
use exitswitch::config::Settings;
use exitswitch::constants;
use exitswitch::restart::SystemRunner;
use exitswitch::{server, utils};

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = Settings::load(args.config.as_deref()).wrap_err("loading settings")?;
    args.apply(&mut settings);

    if !utils::is_root() {
        warn!("not running as root: restarting the tunnel will likely fail");
    }

    let command = args.command();
    let refresh = if command == Commands::Serve {
        Refresh::Background
    } else {
        Refresh::Once
    };

    // The blocking HTTP client must be created and dropped outside the
    // async runtime, so the backend is resolved before it starts.
    let source: Arc<dyn RelaySource> = Arc::new(HttpRelaySource::new(
        &settings.mullvad.relays_v1_url,
        &settings.mullvad.relays_v2_url,
        settings.mullvad.http_timeout(),
    )?);
    let restarter = settings.restart.restarter(Arc::new(SystemRunner));
    let backend = resolver::resolve(&settings, &restarter, &source, refresh)?;
    drop(source);

    if command != Commands::Serve {
        commands::run(&backend, &command, &mut io::stdout().lock())?;
        return Ok(());
    }

    info!(
        "{} {} serving {}",
        constants::APP_NAME,
        constants::APP_VERSION,
        backend.kind()
    );
    let backend = Arc::new(backend);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("starting async runtime")?;
    runtime
        .block_on(server::serve(&settings.listen, Arc::clone(&backend)))
        .wrap_err_with(|| format!("serving on {}", settings.listen))?;
    drop(runtime);
    Ok(())
}
