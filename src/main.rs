mod config;
mod handlers;
mod metadata;
mod quiz;

use std::sync::Arc;

use dotenv::dotenv;
use teloxide::prelude::*;

use config::Config;
use handlers::Command;
use quiz::session::SessionStore;

#[tokio::main]
async fn main() {
    // A missing .env is fine, the variables may come from the environment
    let _ = dotenv();

    pretty_env_logger::init();
    log::info!("Starting media quiz bot...");

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    log::info!(
        "Using {:?} for metadata, {} question(s) per quiz",
        config.ffprobe_path,
        config.questions_per_quiz
    );

    let bot = Bot::from_env();
    let store = Arc::new(SessionStore::new(config.questions_per_quiz));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handlers::handle_command),
        )
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![store, config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
