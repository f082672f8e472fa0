use clap::Parser;
use simplepad::cli::Cli;
use simplepad::config::{RC_FILE_NAME, RcLoader};
use simplepad::log::{self, LogConfig};
use simplepad::platform::{Capabilities, native};
use simplepad::session::EditorSession;
use simplepad::ui::{App, Assets};
use simplepad::worker::cache::DiskCacheStorage;
use simplepad::worker::fetch::LocalOrigin;
use simplepad::worker::{CacheController, Registration, WORKER_SCRIPT_PATH};
use std::path::Path;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.generate_rc {
        std::fs::write(RC_FILE_NAME, RcLoader::generate_sample_rc())?;
        println!("Wrote {RC_FILE_NAME}");
        return Ok(());
    }

    let _log_guard = log::init(LogConfig {
        log_file_path: cli.log_file.clone(),
    })
    .map_err(|e| e.to_string())?;

    let mut config = RcLoader::load_config();
    cli.apply(&mut config);
    info!(?config, "starting");

    let capabilities = Capabilities::detect(config.persistence);
    let base_dir = Path::new(".");
    let persistence = native::persistence(capabilities, base_dir, &config.resolved_download_dir());
    let mut session = EditorSession::new(
        persistence,
        Box::new(native::PromptFileSelector::new(base_dir)),
    );

    let mut startup_message = None;
    if let Some(path) = &cli.file {
        match native::read_file(path).await {
            Ok(file) => {
                session.load(file);
            }
            Err(err) => {
                error!(%err, path = %path.display(), "file reading error");
                startup_message = Some(format!("Error reading file: {err}"));
            }
        }
    }

    let assets = if config.offline_cache {
        let controller = CacheController::new(
            Box::new(DiskCacheStorage::new(config.resolved_cache_dir())),
            Box::new(LocalOrigin::new(&config.asset_root)),
        );
        let registration = Registration::register(
            WORKER_SCRIPT_PATH,
            controller,
            Box::new(LocalOrigin::new(&config.asset_root)),
        )
        .await;
        Assets::Registered(registration)
    } else {
        Assets::Direct(Box::new(LocalOrigin::new(&config.asset_root)))
    };

    let mut app = App::new(session, assets, config.line_numbers);
    if let Some(message) = startup_message {
        app.set_message(message);
    }
    app.run().await
}
