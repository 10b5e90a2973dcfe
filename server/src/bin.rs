use hyper::{
    service::{make_service_fn, service_fn},
    Server,
};
use lib::{
    auth::{resolve_jwt_secret, DEFAULT_JWT_SECRET, JWT_SECRET_ALIAS},
    AppSettings, Webserver,
};
use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;

#[macro_use]
extern crate log;

#[tokio::main]
async fn main() {
    let env = std::env::var("WEBSERVER_ENV").unwrap_or_else(|_| "test".to_string());

    let env_file_name = format!("{}.env", env);

    let env_file_result = dotenv::from_filename(&env_file_name);

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    if let Err(e) = env_file_result {
        warn!(
            "environment file not found: {}, error: {}",
            env_file_name, e
        );
    }

    let settings = AppSettings::from(Opts::from_args());

    if settings.jwt_secret == DEFAULT_JWT_SECRET {
        warn!(
            "no JWT secret configured (WEBSERVER_JWT_SECRET or {}), using the development secret",
            JWT_SECRET_ALIAS
        );
    }

    let webserver = match Webserver::from_settings(&settings).await {
        Ok(webserver) => Arc::new(webserver),
        Err(e) => {
            error!(
                "failed to open data directory '{}': {}",
                settings.data_dir.display(),
                e
            );
            std::process::exit(1);
        }
    };

    let addr = ([0, 0, 0, 0], settings.port).into();

    let service = make_service_fn(|_| {
        let webserver = webserver.clone();
        async {
            Ok::<_, hyper::Error>(service_fn(move |request| {
                let webserver = webserver.clone();
                lib::entry_point(webserver, request)
            }))
        }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder.serve(service),
        Err(e) => {
            error!("failed to bind {:?}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!(
        "starting server on {:?}, serving assets from '{}'",
        addr,
        settings.asset_root.display()
    );
    if let Err(e) = server.with_graceful_shutdown(shutdown_signal()).await {
        error!("server error: {}", e);
    }
    info!("server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install ctrl-c handler: {}", e);
        // no handler, run until killed
        std::future::pending::<()>().await;
    }
}

#[derive(StructOpt, Debug, Clone)]
pub struct Opts {
    #[structopt(long, default_value = "3000", env = "WEBSERVER_LISTEN_PORT")]
    port: u16,
    #[structopt(
        long,
        default_value = "data",
        env = "WEBSERVER_DATA_DIR",
        parse(from_os_str)
    )]
    data_dir: PathBuf,
    #[structopt(
        long,
        default_value = "public",
        env = "WEBSERVER_ASSET_ROOT",
        parse(from_os_str)
    )]
    asset_root: PathBuf,
    /// Falls back to JWT_SECRET, then to a development secret
    #[structopt(long, env = "WEBSERVER_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

impl From<Opts> for AppSettings {
    fn from(
        Opts {
            port,
            data_dir,
            asset_root,
            jwt_secret,
        }: Opts,
    ) -> Self {
        AppSettings {
            port,
            data_dir,
            asset_root,
            jwt_secret: resolve_jwt_secret(jwt_secret, std::env::var(JWT_SECRET_ALIAS).ok()),
        }
    }
}
