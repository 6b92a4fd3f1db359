use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use teloxide::{
    net::Download,
    prelude::*,
    types::{ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
    utils::{command::BotCommands, html},
};
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::metadata::{probe, report, MetadataError};
use crate::quiz::session::{AnswerResult, Progress, QuestionView, SessionStore, Summary, Verdict};
use crate::quiz::QuizError;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

const START_QUIZ: &str = "quiz:start";
const ANSWER_PREFIX: &str = "answer:";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Доступні команди:")]
pub enum Command {
    #[command(description = "почати роботу з ботом")]
    Start,
    #[command(description = "показати довідку")]
    Help,
    #[command(description = "пройти квіз за останнім проаналізованим файлом")]
    Quiz,
}

const GREETING_TEXT: &str = "Привіт! Я -- бот, що розбирає медіафайли. Надішли мені відео або документ, \
і я розповім, що в нього всередині: контейнер, кодеки, роздільну здатність і не тільки. \
А потім можна перевірити себе у квізі!";

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: Arc<SessionStore>,
) -> HandlerResult {
    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, GREETING_TEXT).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Quiz => {
            let Some(user) = msg.from() else {
                return Ok(());
            };
            start_quiz(&bot, msg.chat.id, user.id.0, &store).await?;
        }
    }
    Ok(())
}

/// A video or document the user sent for analysis.
struct IncomingFile {
    id: String,
    name: String,
    size: u32,
}

fn incoming_file(msg: &Message) -> Option<IncomingFile> {
    if let Some(video) = msg.video() {
        return Some(IncomingFile {
            id: video.file.id.clone(),
            name: video.file_name.clone().unwrap_or_else(|| "video.mp4".to_string()),
            size: video.file.size,
        });
    }
    if let Some(animation) = msg.animation() {
        return Some(IncomingFile {
            id: animation.file.id.clone(),
            name: animation
                .file_name
                .clone()
                .unwrap_or_else(|| "animation.mp4".to_string()),
            size: animation.file.size,
        });
    }
    if let Some(doc) = msg.document() {
        return Some(IncomingFile {
            id: doc.file.id.clone(),
            name: doc.file_name.clone().unwrap_or_else(|| "document".to_string()),
            size: doc.file.size,
        });
    }
    None
}

pub async fn handle_message(
    bot: Bot,
    msg: Message,
    store: Arc<SessionStore>,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0;

    if let Some(file) = incoming_file(&msg) {
        return analyze(&bot, &msg, user_id, file, &store, &config).await;
    }

    // Typing one of the options counts the same as pressing its button
    if let Some(text) = msg.text() {
        if let Ok(view) = store.current_question(user_id) {
            let Some(option) = matching_option(&view, text) else {
                bot.send_message(msg.chat.id, "Обери один з варіантів відповіді 👇")
                    .await?;
                return send_question(&bot, msg.chat.id, &view).await;
            };
            return match store.submit_answer(user_id, option) {
                Ok(result) => send_answer_result(&bot, msg.chat.id, result).await,
                Err(err) => send_quiz_error(&bot, msg.chat.id, &err).await,
            };
        }
    }

    bot.send_message(
        msg.chat.id,
        "Надішли мені відео або документ, і я його проаналізую 🎬",
    )
    .await?;
    Ok(())
}

/// Finds the option of the shown question that the typed text names exactly.
fn matching_option<'a>(view: &'a QuestionView, text: &str) -> Option<&'a str> {
    let text = text.trim();
    view.question.options().find(|option| *option == text)
}

async fn analyze(
    bot: &Bot,
    msg: &Message,
    user_id: u64,
    file: IncomingFile,
    store: &SessionStore,
    config: &Config,
) -> HandlerResult {
    info!(
        "User {} sent {:?} ({} bytes) for analysis",
        user_id, file.name, file.size
    );

    if u64::from(file.size) > config.max_file_size_bytes() {
        bot.send_message(
            msg.chat.id,
            format!(
                "Файл завеликий. Я можу завантажити файли до {} МБ",
                config.max_file_size_mb
            ),
        )
        .await?;
        return Ok(());
    }

    // We don't really care if this one fails
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    // The directory and everything in it is removed once it goes out of scope
    let dir = tempfile::Builder::new().prefix("media_quiz").tempdir()?;
    let local_path = dir.path().join(local_file_name(&file.name));
    download(bot, &file.id, &local_path).await?;

    let record = match probe::probe_file(&config.ffprobe_path, &local_path, &file.name).await {
        Ok(record) => record,
        Err(err) => {
            warn!("Failed to extract metadata from {:?}: {}", file.name, err);
            bot.send_message(msg.chat.id, metadata_error_text(&err)).await?;
            return Ok(());
        }
    };

    info!("Extracted {} field(s) from {:?}", record.len(), file.name);
    let report = report::render_report(&record);
    store.set_record(user_id, record);

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Пройти квіз 🎯",
        START_QUIZ,
    )]]);
    bot.send_message(msg.chat.id, report)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn download(bot: &Bot, file_id: &str, dest: &Path) -> HandlerResult {
    let telegram_file = bot.get_file(file_id).await?;
    let mut file = tokio::fs::File::create(dest).await?;
    bot.download_file(&telegram_file.path, &mut file).await?;
    file.flush().await?;
    Ok(())
}

/// Keeps the extension so ffprobe gets a hint about the container, but never
/// trusts the rest of a user-supplied name.
fn local_file_name(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("input.{}", ext.to_ascii_lowercase()),
        None => "input".to_string(),
    }
}

fn metadata_error_text(err: &MetadataError) -> &'static str {
    match err {
        MetadataError::Spawn(_) => "Не вдалося запустити аналізатор медіа. Спробуй пізніше.",
        MetadataError::ProbeFailed { .. } | MetadataError::Parse(_) => {
            "Не вдалося прочитати файл. Можливо, він пошкоджений або це не медіафайл."
        }
        MetadataError::Empty => "У цьому файлі не знайшлося метаданих для аналізу.",
    }
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, store: Arc<SessionStore>) -> HandlerResult {
    let (Some(data), Some(message)) = (q.data.as_deref(), q.message.as_ref()) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let chat_id = message.chat.id;
    let user_id = q.from.id.0;

    if data == START_QUIZ {
        bot.answer_callback_query(q.id.clone()).await?;
        return start_quiz(&bot, chat_id, user_id, &store).await;
    }

    let Some((quiz_id, number, option)) = data.strip_prefix(ANSWER_PREFIX).and_then(parse_answer)
    else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    match store.answer_option(user_id, quiz_id, number, option) {
        Ok(result) => {
            bot.answer_callback_query(q.id.clone()).await?;
            let _ = bot.edit_message_reply_markup(chat_id, message.id).await;
            send_answer_result(&bot, chat_id, result).await
        }
        Err(err) => {
            // Buttons of an answered question or of a replaced quiz
            if err == QuizError::StaleQuestion {
                let _ = bot.edit_message_reply_markup(chat_id, message.id).await;
            }
            bot.answer_callback_query(q.id.clone())
                .text(quiz_error_text(&err))
                .await?;
            Ok(())
        }
    }
}

fn answer_data(view: &QuestionView, option: usize) -> String {
    format!("{}{}:{}:{}", ANSWER_PREFIX, view.quiz_id, view.number, option)
}

/// Parses "<quiz id>:<question number>:<option index>".
fn parse_answer(data: &str) -> Option<(u64, usize, usize)> {
    let mut parts = data.split(':');
    let quiz_id = parts.next()?.parse().ok()?;
    let number = parts.next()?.parse().ok()?;
    let option = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((quiz_id, number, option))
}

async fn start_quiz(bot: &Bot, chat_id: ChatId, user_id: u64, store: &SessionStore) -> HandlerResult {
    // ThreadRng must not live across an await point
    let started = store.start(user_id, &mut rand::thread_rng());
    let view = match started {
        Ok(view) => view,
        Err(err) => return send_quiz_error(bot, chat_id, &err).await,
    };
    info!("User {} started a quiz of {} question(s)", user_id, view.total);

    bot.send_message(chat_id, "Чудово! Почнемо квіз!").await?;
    send_question(bot, chat_id, &view).await
}

async fn send_question(bot: &Bot, chat_id: ChatId, view: &QuestionView) -> HandlerResult {
    let question_text = format!(
        "{}\n{}",
        html::bold(&format!("Питання №{} з {}:", view.number, view.total)),
        html::escape(&view.question.text)
    );

    let buttons = view
        .question
        .options()
        .enumerate()
        .map(|(idx, option)| {
            vec![InlineKeyboardButton::callback(
                option.to_string(),
                answer_data(view, idx),
            )]
        })
        .collect::<Vec<_>>();

    bot.send_message(chat_id, question_text)
        .parse_mode(ParseMode::Html)
        .reply_markup(InlineKeyboardMarkup::new(buttons))
        .await?;
    Ok(())
}

async fn send_answer_result(bot: &Bot, chat_id: ChatId, result: AnswerResult) -> HandlerResult {
    let feedback = match &result.verdict {
        Verdict::Correct => "Правильно! ✅".to_string(),
        Verdict::Incorrect { correct_answer } => format!(
            "Неправильно ❌ Правильна відповідь -- {}",
            html::bold(&html::escape(correct_answer))
        ),
    };
    bot.send_message(chat_id, feedback)
        .parse_mode(ParseMode::Html)
        .await?;

    match result.progress {
        Progress::Next(view) => send_question(bot, chat_id, &view).await,
        Progress::Finished(summary) => send_summary(bot, chat_id, &summary).await,
    }
}

async fn send_summary(bot: &Bot, chat_id: ChatId, summary: &Summary) -> HandlerResult {
    info!(
        "Quiz finished with {}/{} ({:?})",
        summary.score, summary.total, summary.tier
    );
    let text = format!(
        "Квіз закінчився! Ти відповів правильно на {} з {} питань\n{}",
        summary.score,
        summary.total,
        summary.tier.comment()
    );
    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "Пройти ще раз 🔁",
        START_QUIZ,
    )]]);
    bot.send_message(chat_id, text).reply_markup(keyboard).await?;
    Ok(())
}

fn quiz_error_text(err: &QuizError) -> &'static str {
    match err {
        QuizError::InsufficientData => "Спочатку надішли відео або документ для аналізу 📁",
        QuizError::NoActiveSession => "Квіз не розпочато. Почни новий командою /quiz",
        QuizError::StaleQuestion => "Це питання вже неактуальне",
    }
}

async fn send_quiz_error(bot: &Bot, chat_id: ChatId, err: &QuizError) -> HandlerResult {
    bot.send_message(chat_id, quiz_error_text(err)).await?;
    Ok(())
}
