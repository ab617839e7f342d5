use crate::{
    chat::Payload,
    entity::{AgeBracket, Gender, UserId},
    error::DeliveryError,
    session::ChatSessionController,
    transport::{InboundEvent, Menu, Outbound, OutboundMessage, ProfileAnswer, Rating, Transport},
};
use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{InputFile, KeyboardButton, KeyboardMarkup},
    utils::command::BotCommands,
    ApiError, RequestError,
};
use tracing::{debug, info};

pub const BTN_SEARCH: &str = "🟢 Find a partner";
pub const BTN_STATS: &str = "📊 My stats";
pub const BTN_HELP: &str = "ℹ️ Help";
pub const BTN_MALE: &str = "👨 Male";
pub const BTN_FEMALE: &str = "👩 Female";
pub const BTN_UNDER_18: &str = "🔞 Under 18";
pub const BTN_ADULT: &str = "✅ 18+";
pub const BTN_END: &str = "🔚 End chat";
pub const BTN_GOOD: &str = "👍 Good";
pub const BTN_BAD: &str = "👎 Bad";
pub const BTN_NEUTRAL: &str = "😐 Neutral";

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "Start over and fill in your profile.")]
    Start,
    #[command(description = "Find a partner.")]
    Search,
    #[command(description = "End the current chat.")]
    End,
    #[command(description = "Show your stats.")]
    Stats,
    #[command(description = "Display this text.")]
    Help,
}

impl From<Command> for InboundEvent {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Start => InboundEvent::Start,
            Command::Search => InboundEvent::SearchRequest,
            Command::End => InboundEvent::EndChatRequest,
            Command::Stats => InboundEvent::StatsRequest,
            Command::Help => InboundEvent::HelpRequest,
        }
    }
}

/// Maps a reply-keyboard button label to the event it stands for.
pub fn parse_button(text: &str) -> Option<InboundEvent> {
    let event = match text {
        BTN_SEARCH => InboundEvent::SearchRequest,
        BTN_STATS => InboundEvent::StatsRequest,
        BTN_HELP => InboundEvent::HelpRequest,
        BTN_END => InboundEvent::EndChatRequest,
        BTN_MALE => InboundEvent::ProfileAnswer(ProfileAnswer::Gender(Gender::Male)),
        BTN_FEMALE => InboundEvent::ProfileAnswer(ProfileAnswer::Gender(Gender::Female)),
        BTN_UNDER_18 => InboundEvent::ProfileAnswer(ProfileAnswer::Age(AgeBracket::Under18)),
        BTN_ADULT => InboundEvent::ProfileAnswer(ProfileAnswer::Age(AgeBracket::Adult)),
        BTN_GOOD => InboundEvent::RatingAnswer(Rating::Positive),
        BTN_BAD => InboundEvent::RatingAnswer(Rating::Negative),
        BTN_NEUTRAL => InboundEvent::RatingAnswer(Rating::Neutral),
        _ => return None,
    };
    Some(event)
}

/// Extracts relayable content, re-using Telegram file ids.
pub fn payload_from(msg: &Message) -> Payload {
    let caption = msg.caption().map(str::to_string);

    if let Some(text) = msg.text() {
        Payload::Text(text.to_string())
    } else if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        Payload::Photo {
            file_id: photo.file.id.clone(),
            caption,
        }
    } else if let Some(animation) = msg.animation() {
        Payload::Animation {
            file_id: animation.file.id.clone(),
            caption,
        }
    } else if let Some(document) = msg.document() {
        Payload::Document {
            file_id: document.file.id.clone(),
            caption,
        }
    } else if let Some(voice) = msg.voice() {
        Payload::Voice {
            file_id: voice.file.id.clone(),
        }
    } else if let Some(sticker) = msg.sticker() {
        Payload::Sticker {
            file_id: sticker.file.id.clone(),
        }
    } else if let Some(video) = msg.video() {
        Payload::Video {
            file_id: video.file.id.clone(),
            caption,
        }
    } else if let Some(audio) = msg.audio() {
        Payload::Audio {
            file_id: audio.file.id.clone(),
            caption,
        }
    } else if let Some(contact) = msg.contact() {
        Payload::Contact {
            phone_number: contact.phone_number.clone(),
            first_name: contact.first_name.clone(),
        }
    } else if let Some(venue) = msg.venue() {
        Payload::Venue {
            latitude: venue.location.latitude,
            longitude: venue.location.longitude,
            title: venue.title.clone(),
            address: venue.address.clone(),
        }
    } else if let Some(location) = msg.location() {
        Payload::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        }
    } else if let Some(note) = msg.video_note() {
        Payload::VideoNote {
            file_id: note.file.id.clone(),
        }
    } else {
        Payload::Unsupported
    }
}

fn keyboard(menu: Menu) -> KeyboardMarkup {
    let rows: Vec<Vec<&str>> = match menu {
        Menu::Main => vec![vec![BTN_SEARCH], vec![BTN_STATS], vec![BTN_HELP]],
        Menu::Gender => vec![vec![BTN_MALE, BTN_FEMALE]],
        Menu::Age => vec![vec![BTN_UNDER_18, BTN_ADULT]],
        Menu::Chat => vec![vec![BTN_END]],
        Menu::Rating => vec![vec![BTN_GOOD, BTN_BAD, BTN_NEUTRAL]],
    };
    let buttons = rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    KeyboardMarkup::new(buttons).resize_keyboard(true)
}

/// Delivers outbound messages through the Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send(&self, chat: ChatId, message: &OutboundMessage) -> Result<(), RequestError> {
        let bot = &self.bot;
        match message {
            OutboundMessage::Notice { notice, menu } => {
                bot.send_message(chat, notice.to_string())
                    .reply_markup(keyboard(*menu))
                    .await?;
            }
            OutboundMessage::Relay(payload) => match payload {
                Payload::Text(text) => {
                    bot.send_message(chat, text.clone()).await?;
                }
                Payload::Photo { file_id, caption } => {
                    let mut request = bot.send_photo(chat, InputFile::file_id(file_id.clone()));
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    request.await?;
                }
                Payload::Document { file_id, caption } => {
                    let mut request =
                        bot.send_document(chat, InputFile::file_id(file_id.clone()));
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    request.await?;
                }
                Payload::Voice { file_id } => {
                    bot.send_voice(chat, InputFile::file_id(file_id.clone())).await?;
                }
                Payload::Sticker { file_id } => {
                    bot.send_sticker(chat, InputFile::file_id(file_id.clone())).await?;
                }
                Payload::Video { file_id, caption } => {
                    let mut request = bot.send_video(chat, InputFile::file_id(file_id.clone()));
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    request.await?;
                }
                Payload::Audio { file_id, caption } => {
                    let mut request = bot.send_audio(chat, InputFile::file_id(file_id.clone()));
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    request.await?;
                }
                Payload::Contact {
                    phone_number,
                    first_name,
                } => {
                    bot.send_contact(chat, phone_number.clone(), first_name.clone())
                        .await?;
                }
                Payload::Location {
                    latitude,
                    longitude,
                } => {
                    bot.send_location(chat, *latitude, *longitude).await?;
                }
                Payload::Venue {
                    latitude,
                    longitude,
                    title,
                    address,
                } => {
                    bot.send_venue(chat, *latitude, *longitude, title.clone(), address.clone())
                        .await?;
                }
                Payload::Animation { file_id, caption } => {
                    let mut request =
                        bot.send_animation(chat, InputFile::file_id(file_id.clone()));
                    if let Some(caption) = caption {
                        request = request.caption(caption.clone());
                    }
                    request.await?;
                }
                Payload::VideoNote { file_id } => {
                    bot.send_video_note(chat, InputFile::file_id(file_id.clone()))
                        .await?;
                }
                // Filtered out by the controller before relaying.
                Payload::Unsupported => {}
            },
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn deliver(&self, outbound: &Outbound) -> Result<(), DeliveryError> {
        if let OutboundMessage::Relay(payload) = &outbound.message {
            if !payload.is_supported() {
                return Err(DeliveryError::Unsupported {
                    kind: payload.kind(),
                });
            }
        }

        let chat = chat_id(outbound.to)?;
        self.send(chat, &outbound.message)
            .await
            .map_err(|e| match e {
                RequestError::Api(ApiError::BotBlocked) => DeliveryError::Blocked { user: outbound.to },
                RequestError::Api(ApiError::ChatNotFound | ApiError::UserDeactivated) => {
                    DeliveryError::Unreachable {
                        user: outbound.to,
                        reason: e.to_string(),
                    }
                }
                other => DeliveryError::Transport(other.to_string()),
            })
    }
}

/// Private chats share their id with the user.
fn chat_id(user: UserId) -> Result<ChatId, DeliveryError> {
    i64::try_from(user.0)
        .map(ChatId)
        .map_err(|e| DeliveryError::Unreachable {
            user,
            reason: e.to_string(),
        })
}

/// Inbound side: decodes updates and hands them to the controller.
#[derive(Clone)]
pub struct TelegramInterface {
    controller: ChatSessionController,
}

impl TelegramInterface {
    pub fn new(controller: ChatSessionController) -> Self {
        Self { controller }
    }

    pub async fn run(&self, bot: Bot) -> anyhow::Result<()> {
        let interface = self.clone();

        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            info!("Could not publish the command menu: {}", e);
        }

        info!("Starting Telegram bot...");

        let handler = Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(answer_command),
            )
            .branch(dptree::endpoint(answer_message));

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![interface])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

fn sender(msg: &Message) -> Option<UserId> {
    if !msg.chat.is_private() {
        return None;
    }
    msg.from().map(|user| UserId(user.id.0))
}

async fn answer_command(
    msg: Message,
    cmd: Command,
    interface: TelegramInterface,
) -> ResponseResult<()> {
    if let Some(user) = sender(&msg) {
        interface.controller.handle(user, cmd.into()).await;
    }
    Ok(())
}

async fn answer_message(msg: Message, interface: TelegramInterface) -> ResponseResult<()> {
    let Some(user) = sender(&msg) else {
        debug!("Ignoring message from chat {} without a private sender", msg.chat.id);
        return Ok(());
    };

    let event = msg
        .text()
        .and_then(parse_button)
        .unwrap_or_else(|| InboundEvent::Content(payload_from(&msg)));
    interface.controller.handle(user, event).await;
    Ok(())
}
