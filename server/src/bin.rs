use std::sync::Arc;

use hyper::{
    service::{make_service_fn, service_fn},
    Server,
};
use server::{app::App, auth::TokenHandler, Webserver};
use structopt::StructOpt;

#[macro_use]
extern crate log;

#[tokio::main]
async fn main() {
    let env = std::env::var("KANBAN_ENV").unwrap_or_else(|_| "test".to_string());

    let env_file_name = format!("{}.env", env);

    let env_file = dotenv::from_filename(&env_file_name);

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    if let Err(e) = env_file {
        warn!(
            "environment file not found: {}, error: {}",
            env_file_name, e
        );
    }

    let opts = Opts::from_args();
    let tokens = TokenHandler::new(&opts.jwt_secret);
    let opts = server::Opts::from(opts);

    let pool = match database::connect(&opts.database_addr, opts.max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("failed to connect to database: '{}'", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = database::run_migrations(&pool).await {
        error!("failed to run migrations: '{}'", e);
        std::process::exit(1);
    }

    let app = Arc::new(App::new(pool, &opts, tokens.clone()));

    let webserver = Arc::new(Webserver::new(app, tokens));

    let addr = ([0, 0, 0, 0], opts.port).into();

    let service = make_service_fn(|_| {
        let webserver = webserver.clone();
        async {
            Ok::<_, hyper::Error>(service_fn(move |request| {
                let webserver = webserver.clone();
                server::entry_point(webserver, request)
            }))
        }
    });

    let http_server = Server::bind(&addr).serve(service);

    info!("starting server on {:?}", addr);
    if let Err(e) = http_server.await {
        error!("server error: '{}'", e);
    }
}

#[derive(StructOpt, Debug, Clone)]
pub struct Opts {
    #[structopt(long, default_value = "3000", env = "KANBAN_LISTEN_PORT")]
    port: u16,
    #[structopt(long, env = "KANBAN_DATABASE_ADDR")]
    database_addr: String,
    #[structopt(long, env = "KANBAN_JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,
    #[structopt(long, default_value = "5", env = "KANBAN_MAX_CONNECTIONS")]
    max_connections: u32,
    #[structopt(long, default_value = "3", env = "KANBAN_CONFLICT_RETRIES")]
    conflict_retries: u32,
}

impl From<Opts> for server::Opts {
    fn from(
        Opts {
            port,
            database_addr,
            jwt_secret: _,
            max_connections,
            conflict_retries,
        }: Opts,
    ) -> Self {
        server::Opts {
            port,
            database_addr,
            max_connections,
            conflict_retries,
        }
    }
}
