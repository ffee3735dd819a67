//! Interaction handlers: slash commands, the event modal, and RSVP buttons.
//!
//! Every user-facing failure is a short ephemeral message, and the
//! in-progress event stays in the construction cache so the user can run the
//! command again and resume where they left off.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use serenity::all::{
    ActionRowComponent, ChannelId, ChannelType, CommandInteraction, ComponentInteraction, Context,
    CreateActionRow, CreateInputText, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateMessage,
    CreateModal, InputTextStyle, Interaction, Member, MessageCollector, ModalInteraction, UserId,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    config::{EventType, GuildConfig, RoleFilter},
    data::{EventRepository, GuildDirectory},
    error::AppError,
    format::{recurrence as recurrence_format, time},
    model::{
        event::{EntityKind, EventLocation, EventMonkeyEvent},
        recurrence::EventRecurrence,
    },
    service::{
        event::{AttendanceOutcome, ATTENDING_BUTTON, NOT_ATTENDING_BUTTON},
        EventService,
    },
    state::AppState,
};

const CREATE_MODAL: &str = "event_create";
const EDIT_MODAL: &str = "event_edit";

/// Minimum lead time for non-administrators.
const MIN_LEAD_TIME_MINUTES: i64 = 30;
/// How long the host has to reply with a cover image attachment.
const IMAGE_REPLY_TIMEOUT_SECS: u64 = 600;

pub async fn handle_interaction(state: &Arc<AppState>, ctx: Context, interaction: Interaction) {
    let result = match interaction {
        Interaction::Command(command) => handle_command(state, &ctx, command).await,
        Interaction::Modal(modal) => handle_modal(state, &ctx, modal).await,
        Interaction::Component(component) => handle_component(state, &ctx, component).await,
        _ => Ok(()),
    };

    if let Err(e) = result {
        error!("interaction handling failed: {e}");
    }
}

/// Role allow/deny gate. Guild administrators bypass both lists; a deny
/// match always wins; an empty allow list means everyone.
fn permitted(filter: &RoleFilter, member: Option<&Member>) -> bool {
    let Some(member) = member else {
        return false;
    };
    if member.permissions.is_some_and(|p| p.administrator()) {
        return true;
    }

    let roles: Vec<u64> = member.roles.iter().map(|role| role.get()).collect();
    if roles.iter().any(|role| filter.denied.contains(role)) {
        return false;
    }
    filter.allowed.is_empty() || roles.iter().any(|role| filter.allowed.contains(role))
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_str())
}

fn ephemeral(content: impl Into<String>) -> CreateInteractionResponse {
    CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true),
    )
}

fn followup(content: impl Into<String>) -> CreateInteractionResponseFollowup {
    CreateInteractionResponseFollowup::new()
        .content(content)
        .ephemeral(true)
}

async fn handle_command(
    state: &Arc<AppState>,
    ctx: &Context,
    command: CommandInteraction,
) -> Result<(), AppError> {
    let config = &state.config.guild;

    if !permitted(&config.roles, command.member.as_deref()) {
        command
            .create_response(&ctx.http, ephemeral("You're not allowed to manage events here."))
            .await?;
        return Ok(());
    }
    let Some(guild_id) = command.guild_id else {
        command
            .create_response(&ctx.http, ephemeral("Events can only be managed inside a server."))
            .await?;
        return Ok(());
    };

    if command.data.name == config.command_name {
        handle_create_command(state, ctx, &command, guild_id).await
    } else if command.data.name == format!("{}-edit", config.command_name) {
        handle_edit_command(state, ctx, &command, guild_id).await
    } else {
        Ok(())
    }
}

async fn handle_create_command(
    state: &Arc<AppState>,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: serenity::all::GuildId,
) -> Result<(), AppError> {
    let config = &state.config.guild;

    let type_name = string_option(command, "type").unwrap_or_default();
    let Some(event_type) = config.event_type(type_name) else {
        command
            .create_response(
                &ctx.http,
                ephemeral(format!("\"{type_name}\" is not a configured event type.")),
            )
            .await?;
        return Ok(());
    };

    let recurrence = match string_option(command, "frequency") {
        Some(text) => match recurrence_format::deserialize(text, Utc::now()) {
            // The anchor is provisional until the start time is known; the
            // modal submission re-anchors it.
            Ok(recurrence) => Some(recurrence),
            Err(_) => {
                command
                    .create_response(
                        &ctx.http,
                        ephemeral(format!(
                            "\"{text}\" is not a frequency I understand. Try \"every 2 weeks\"."
                        )),
                    )
                    .await?;
                return Ok(());
            }
        },
        None => None,
    };

    let directory = GuildDirectory::load(&ctx.http, guild_id).await?;
    let cached = state.events_under_construction.get(command.user.id).await;
    let event = match resume_draft(cached, &event_type.name, recurrence.as_ref()) {
        Some(event) => event,
        None => {
            let Some(event) =
                seed_event(event_type, &directory, command.user.id, &command.user.name, recurrence)
            else {
                command
                    .create_response(
                        &ctx.http,
                        ephemeral(format!(
                            "The configured channel for \"{}\" events could not be found.",
                            event_type.name
                        )),
                    )
                    .await?;
                return Ok(());
            };
            event
        }
    };

    let modal = event_modal(CREATE_MODAL, "Create a New Event", state, &event, &directory);
    state.events_under_construction.save(event).await;
    command
        .create_response(&ctx.http, CreateInteractionResponse::Modal(modal))
        .await?;
    Ok(())
}

async fn handle_edit_command(
    state: &Arc<AppState>,
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: serenity::all::GuildId,
) -> Result<(), AppError> {
    let config = &state.config.guild;
    let repository = EventRepository::new(ctx.http.clone(), config);

    let thread = match repository.thread(guild_id, command.channel_id).await {
        Ok(thread) => thread,
        Err(_) => {
            command
                .create_response(
                    &ctx.http,
                    ephemeral("Run this inside an event's discussion thread."),
                )
                .await?;
            return Ok(());
        }
    };
    let event = match repository.find_by_thread(&thread).await {
        Ok(event) => event,
        Err(e) => {
            error!("failed to read event from thread {}: {e}", thread.id);
            command
                .create_response(
                    &ctx.http,
                    ephemeral("I couldn't read this thread's event details."),
                )
                .await?;
            return Ok(());
        }
    };

    let is_admin = command
        .member
        .as_deref()
        .and_then(|member| member.permissions)
        .is_some_and(|p| p.administrator());
    if event.author_id != command.user.id && !is_admin {
        command
            .create_response(&ctx.http, ephemeral("Only the event's host can edit it."))
            .await?;
        return Ok(());
    }
    if event.scheduled_end_time() <= Utc::now() {
        command
            .create_response(&ctx.http, ephemeral("This event has already ended."))
            .await?;
        return Ok(());
    }

    let directory = GuildDirectory::load(&ctx.http, guild_id).await?;
    let modal = event_modal(EDIT_MODAL, "Edit Event", state, &event, &directory);
    state.events_under_construction.save(event).await;
    command
        .create_response(&ctx.http, CreateInteractionResponse::Modal(modal))
        .await?;
    Ok(())
}

/// A fresh event for the create flow. Returns `None` when a voice or stage
/// event type points at a channel that does not exist.
fn seed_event(
    event_type: &EventType,
    directory: &GuildDirectory,
    author_id: UserId,
    author_name: &str,
    recurrence: Option<EventRecurrence>,
) -> Option<EventMonkeyEvent> {
    let location = match event_type.entity_kind {
        EntityKind::External => EventLocation::External {
            location: String::new(),
        },
        EntityKind::Voice => EventLocation::Voice {
            channel: directory
                .resolve_of_kind(event_type.channel.as_deref()?, ChannelType::Voice)?,
        },
        EntityKind::Stage => EventLocation::Stage {
            channel: directory
                .resolve_of_kind(event_type.channel.as_deref()?, ChannelType::Stage)?,
        },
    };

    // Default to the same time tomorrow, on the hour.
    let start = (Utc::now() + Duration::days(1))
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or_else(|| Utc::now() + Duration::days(1));

    Some(EventMonkeyEvent {
        id: Uuid::new_v4().to_string(),
        name: String::new(),
        description: String::new(),
        author_id,
        author_name: author_name.to_string(),
        event_type: event_type.name.clone(),
        scheduled_start_time: start,
        duration_hours: 1,
        location,
        max_attendees: None,
        image_url: event_type.default_image_url.clone(),
        recurrence,
        attendees: Vec::new(),
        discussion_channel_id: None,
        thread_id: None,
        scheduled_event_id: None,
    })
}

/// Resumes the half-built event from an earlier attempt, provided it is for
/// the same event type. A frequency supplied on the rerun replaces the
/// draft's rather than being dropped.
fn resume_draft(
    cached: Option<EventMonkeyEvent>,
    event_type_name: &str,
    recurrence: Option<&EventRecurrence>,
) -> Option<EventMonkeyEvent> {
    let mut event = cached.filter(|event| event.event_type == event_type_name)?;
    if let Some(recurrence) = recurrence {
        event.recurrence = Some(recurrence.clone());
    }
    Some(event)
}

/// Gate on the entered start time. Administrators may schedule anything
/// still in the future; everyone else gives the guild some warning.
fn start_time_rejection(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    is_admin: bool,
) -> Option<String> {
    if start <= now {
        return Some("The start time has to be in the future.".to_string());
    }
    if !is_admin && start - now < Duration::minutes(MIN_LEAD_TIME_MINUTES) {
        return Some(format!(
            "The start time has to be at least {MIN_LEAD_TIME_MINUTES} minutes from now."
        ));
    }
    None
}

fn event_modal(
    custom_id: &str,
    title: &str,
    state: &AppState,
    event: &EventMonkeyEvent,
    directory: &GuildDirectory,
) -> CreateModal {
    let tz = state.config.guild.tz().unwrap_or(chrono_tz::UTC);

    let location_label = match event.location.kind() {
        EntityKind::External => "Location",
        EntityKind::Voice | EntityKind::Stage => "Channel",
    };
    let location_value = match &event.location {
        EventLocation::External { location } => location.clone(),
        EventLocation::Voice { channel } | EventLocation::Stage { channel } => directory
            .name_of(*channel)
            .unwrap_or_default()
            .to_string(),
    };

    let rows = vec![
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, "Name", "name")
                .value(event.name.clone())
                .required(true),
        ),
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Paragraph, "Description", "description")
                .value(event.description.clone())
                .required(true),
        ),
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, location_label, "location")
                .value(location_value)
                .required(true),
        ),
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, "Scheduled Start Time", "start_time")
                .value(time::format_time(event.scheduled_start_time, tz))
                .required(true),
        ),
        CreateActionRow::InputText(
            CreateInputText::new(InputTextStyle::Short, "Duration (hours)", "duration")
                .value(event.duration_hours.to_string())
                .required(true),
        ),
    ];

    CreateModal::new(custom_id, title).components(rows)
}

async fn handle_modal(
    state: &Arc<AppState>,
    ctx: &Context,
    modal: ModalInteraction,
) -> Result<(), AppError> {
    let mode = modal.data.custom_id.as_str();
    if mode != CREATE_MODAL && mode != EDIT_MODAL {
        return Ok(());
    }
    // Publishing touches several endpoints; acknowledge first and deliver
    // every outcome as an ephemeral follow-up.
    modal.defer_ephemeral(&ctx.http).await?;

    let config = &state.config.guild;
    let command_name = &config.command_name;

    let Some(guild_id) = modal.guild_id else {
        modal
            .create_followup(&ctx.http, followup("Events can only be managed inside a server."))
            .await?;
        return Ok(());
    };
    let draft = state
        .events_under_construction
        .get_recent(modal.user.id, config.editing_timeout(), Utc::now())
        .await;
    let Some(mut event) = draft else {
        modal
            .create_followup(
                &ctx.http,
                followup(format!(
                    "Sorry, you took too long. Run /{command_name} to start over."
                )),
            )
            .await?;
        return Ok(());
    };

    let directory = GuildDirectory::load(&ctx.http, guild_id).await?;
    match apply_modal_fields(config, &directory, &mut event, &modal) {
        Ok(()) => {}
        Err(message) => {
            state.events_under_construction.save(event).await;
            modal.create_followup(&ctx.http, followup(message)).await?;
            return Ok(());
        }
    }

    let is_admin = modal
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .is_some_and(|p| p.administrator());
    if let Some(message) = start_time_rejection(event.scheduled_start_time, Utc::now(), is_admin) {
        state.events_under_construction.save(event).await;
        modal.create_followup(&ctx.http, followup(message)).await?;
        return Ok(());
    }

    let service = EventService::new(ctx.http.clone(), config);
    let outcome = if mode == CREATE_MODAL {
        service.publish(guild_id, event.clone()).await
    } else {
        service.update(guild_id, event.clone()).await
    };

    match outcome {
        Ok(published) => {
            state.events_under_construction.delete(modal.user.id).await;
            let thread = published
                .thread_id
                .map(|id| format!(" Discussion: <#{id}>"))
                .unwrap_or_default();
            let verb = if mode == CREATE_MODAL { "created" } else { "updated" };
            modal
                .create_followup(&ctx.http, followup(format!("Event {verb}!{thread}")))
                .await?;

            if mode == CREATE_MODAL {
                if let Some(thread_id) = published.thread_id {
                    let ctx = ctx.clone();
                    let state = state.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            await_cover_image(&ctx, &state, guild_id, published, thread_id).await
                        {
                            error!("cover image prompt failed for thread {thread_id}: {e}");
                        }
                    });
                }
            }
            Ok(())
        }
        Err(e) => {
            error!("failed to publish event {}: {e}", event.id);
            state.events_under_construction.save(event).await;
            modal
                .create_followup(
                    &ctx.http,
                    followup(format!(
                        "Something went wrong saving your event. Run /{command_name} to resume it."
                    )),
                )
                .await?;
            Ok(())
        }
    }
}

/// Copies the modal's inputs onto the cached event, validating each field.
/// Returns a user-facing message on the first invalid field.
fn apply_modal_fields(
    config: &GuildConfig,
    directory: &GuildDirectory,
    event: &mut EventMonkeyEvent,
    modal: &ModalInteraction,
) -> Result<(), String> {
    let mut fields = std::collections::HashMap::new();
    for row in &modal.data.components {
        for component in &row.components {
            if let ActionRowComponent::InputText(input) = component {
                fields.insert(
                    input.custom_id.clone(),
                    input.value.clone().unwrap_or_default(),
                );
            }
        }
    }

    let name = fields.get("name").map(String::as_str).unwrap_or_default().trim();
    if name.is_empty() {
        return Err("Your event needs a name.".to_string());
    }
    event.name = name.to_string();
    event.description = fields
        .get("description")
        .map(String::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let tz = config.tz().map_err(|e| e.to_string())?;
    let start_text = fields.get("start_time").map(String::as_str).unwrap_or_default();
    let start = time::parse_time(start_text, tz)
        .map_err(|_| "Invalid date format. Try something like \"03/01/24 06:00 PM\".".to_string())?;

    let duration_text = fields.get("duration").map(String::as_str).unwrap_or_default();
    let duration_hours = duration_text
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|hours| *hours > 0)
        .ok_or_else(|| "The duration must be a whole number of hours.".to_string())?;

    let location_text = fields
        .get("location")
        .map(String::as_str)
        .unwrap_or_default()
        .trim();
    let location = match event.location.kind() {
        EntityKind::External => {
            if location_text.is_empty() {
                return Err("Your event needs a location.".to_string());
            }
            EventLocation::External {
                location: location_text.to_string(),
            }
        }
        EntityKind::Voice => EventLocation::Voice {
            channel: directory
                .resolve_of_kind(location_text, ChannelType::Voice)
                .ok_or_else(|| {
                    format!("Couldn't find a voice channel named \"{location_text}\".")
                })?,
        },
        EntityKind::Stage => EventLocation::Stage {
            channel: directory
                .resolve_of_kind(location_text, ChannelType::Stage)
                .ok_or_else(|| {
                    format!("Couldn't find a stage channel named \"{location_text}\".")
                })?,
        },
    };

    // A new or moved recurrence is re-anchored at the entered start time;
    // an unchanged recurring event keeps its original anchor and held count.
    if let Some(recurrence) = event.recurrence.as_mut() {
        if recurrence.times_held == 0 || start != event.scheduled_start_time {
            recurrence.first_start_time = start;
            recurrence.times_held = 0;
        }
    }
    event.scheduled_start_time = start;
    event.duration_hours = duration_hours;
    event.location = location;

    Ok(())
}

/// Invites the host to attach a cover image in the new thread, waiting up to
/// ten minutes for a reply carrying an attachment. The prompt and the reply
/// are removed afterwards either way, leaving the thread clean.
async fn await_cover_image(
    ctx: &Context,
    state: &Arc<AppState>,
    guild_id: serenity::all::GuildId,
    mut event: EventMonkeyEvent,
    thread_id: ChannelId,
) -> Result<(), AppError> {
    let prompt = thread_id
        .send_message(
            &ctx.http,
            CreateMessage::new().content(image_prompt_content(event.author_id)),
        )
        .await?;

    let reply = MessageCollector::new(&ctx.shard)
        .channel_id(thread_id)
        .author_id(event.author_id)
        .filter(|message| !message.attachments.is_empty())
        .timeout(std::time::Duration::from_secs(IMAGE_REPLY_TIMEOUT_SECS))
        .await;

    let saved = match &reply {
        Some(message) => match message.attachments.first() {
            Some(attachment) => {
                event.image_url = Some(attachment.url.clone());
                let repository = EventRepository::new(ctx.http.clone(), &state.config.guild);
                repository.save(Some(guild_id), &event).await
            }
            None => Ok(()),
        },
        None => Ok(()),
    };

    let _ = prompt.delete(&ctx.http).await;
    if let Some(message) = reply {
        let _ = message.delete(&ctx.http).await;
    }
    saved
}

fn image_prompt_content(author_id: UserId) -> String {
    format!(
        "<@{author_id}> Reply here with an attached image in the next 10 minutes \
         to give your event a cover image."
    )
}

async fn handle_component(
    state: &Arc<AppState>,
    ctx: &Context,
    component: ComponentInteraction,
) -> Result<(), AppError> {
    let attending = match component.data.custom_id.as_str() {
        ATTENDING_BUTTON => true,
        NOT_ATTENDING_BUTTON => false,
        _ => return Ok(()),
    };
    let Some(guild_id) = component.guild_id else {
        return Ok(());
    };

    component.defer_ephemeral(&ctx.http).await?;

    let config = &state.config.guild;
    let repository = EventRepository::new(ctx.http.clone(), config);
    let thread = repository.thread(guild_id, component.channel_id).await?;

    let service = EventService::new(ctx.http.clone(), config);
    let reply = match service
        .set_attendance(guild_id, &thread, component.user.id, attending)
        .await?
    {
        AttendanceOutcome::Full => "Sorry, this event is full.".to_string(),
        AttendanceOutcome::Updated(event) => {
            if attending {
                format!("You're on the list for {}!", event.name)
            } else {
                format!("You've been taken off the list for {}.", event.name)
            }
        }
    };

    component.create_followup(&ctx.http, followup(reply)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::model::recurrence::RecurrenceUnit;

    fn draft(event_type: &str) -> EventMonkeyEvent {
        EventMonkeyEvent {
            id: "d1".to_string(),
            name: "Game Night".to_string(),
            description: String::new(),
            author_id: UserId::new(1),
            author_name: "host".to_string(),
            event_type: event_type.to_string(),
            scheduled_start_time: Utc::now(),
            duration_hours: 1,
            location: EventLocation::External {
                location: String::new(),
            },
            max_attendees: None,
            image_url: None,
            recurrence: None,
            attendees: Vec::new(),
            discussion_channel_id: None,
            thread_id: None,
            scheduled_event_id: None,
        }
    }

    fn weekly(amount: u32) -> EventRecurrence {
        EventRecurrence {
            first_start_time: Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap(),
            times_held: 0,
            unit: RecurrenceUnit::Weeks,
            amount,
        }
    }

    /// Tests that rerunning the command with a frequency updates the resumed
    /// draft instead of keeping the draft's old one.
    #[test]
    fn resumed_draft_takes_new_frequency() {
        let mut cached = draft("Meetup");
        cached.recurrence = Some(weekly(1));

        let resumed = resume_draft(Some(cached), "Meetup", Some(&weekly(2))).unwrap();

        assert_eq!(resumed.recurrence, Some(weekly(2)));
    }

    /// Tests that omitting the frequency keeps the draft's recurrence.
    #[test]
    fn resumed_draft_keeps_frequency_when_none_supplied() {
        let mut cached = draft("Meetup");
        cached.recurrence = Some(weekly(1));

        let resumed = resume_draft(Some(cached), "Meetup", None).unwrap();

        assert_eq!(resumed.recurrence, Some(weekly(1)));
    }

    /// Tests that a draft for a different event type starts fresh instead of
    /// resuming.
    #[test]
    fn draft_for_other_type_is_not_resumed() {
        assert!(resume_draft(Some(draft("Meetup")), "Hangout", None).is_none());
        assert!(resume_draft(None, "Meetup", None).is_none());
    }

    /// Tests the 30 minute minimum lead time for non-administrators.
    ///
    /// Ten minutes out is rejected; exactly thirty minutes out is allowed.
    #[test]
    fn lead_time_gate_blocks_short_notice_events() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();

        assert!(start_time_rejection(now + Duration::minutes(10), now, false).is_some());
        assert!(start_time_rejection(now + Duration::minutes(30), now, false).is_none());
    }

    /// Tests that administrators skip the lead time but still need a start
    /// in the future.
    #[test]
    fn lead_time_gate_admins_only_need_a_future_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();

        assert!(start_time_rejection(now + Duration::minutes(5), now, true).is_none());
        assert!(start_time_rejection(now, now, true).is_some());
        assert!(start_time_rejection(now - Duration::minutes(5), now, true).is_some());
    }
}
