use std::error::Error;
use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use headshot_studio::config::{Config, LoggingConfig};
use headshot_studio::handlers::media::message_has_photo;
use headshot_studio::handlers::{callbacks, commands, media};
use headshot_studio::llm::GeminiImageClient;
use headshot_studio::state::AppState;
use headshot_studio::utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Headshot Studio commands:")]
enum Command {
    #[command(description = "show the welcome screen")]
    Start,
    #[command(description = "show usage")]
    Help,
    #[command(description = "generate the headshot from the uploaded photo")]
    Transform,
    #[command(description = "discard the photo and start over")]
    Reset,
    #[command(description = "choose a suit style")]
    Suit(String),
    #[command(description = "choose a background style")]
    Background(String),
    #[command(description = "show the current selection")]
    Status,
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging(&LoggingConfig::load());
    let config = Config::load()?;

    let bot = Bot::new(config.bot_token.clone());
    info!(
        model = %config.gemini_image_model,
        "Starting Headshot Studio bot"
    );

    let transformer = Arc::new(GeminiImageClient::from_config(&config));
    let state = AppState::new(
        transformer.clone(),
        transformer.model(),
        config.max_upload_bytes,
    );

    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {err}");
    }

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::filter(|msg: Message| message_has_photo(&msg)).endpoint(handle_upload))
        .endpoint(ignore_message);

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback_query);

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    match command {
        Command::Start => commands::start_handler(bot, message).await?,
        Command::Help => commands::help_handler(bot, message).await?,
        Command::Transform => {
            tokio::spawn(async move {
                if let Err(err) = commands::transform_handler(bot, state, message).await {
                    error!("transform handler failed: {err}");
                }
            });
        }
        Command::Reset => commands::reset_handler(bot, state, message).await?,
        Command::Suit(arg) => commands::suit_handler(bot, state, message, arg).await?,
        Command::Background(arg) => {
            commands::background_handler(bot, state, message, arg).await?
        }
        Command::Status => commands::status_handler(bot, state, message).await?,
    }
    Ok(())
}

async fn handle_upload(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    tokio::spawn(async move {
        if let Err(err) = media::upload_handler(bot, state, message).await {
            error!("upload handler failed: {err}");
        }
    });
    Ok(())
}

async fn handle_callback_query(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    tokio::spawn(async move {
        if let Err(err) = callbacks::configure_callback(bot, state, query).await {
            error!("configure callback failed: {err}");
        }
    });
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}
