//! Main chat loop orchestration.
//!
//! Coordinates the conversation lifecycle: session identity, welcome
//! banner, the input loop with slash commands, dispatch to the
//! automation webhook, the per-turn poll, and the slow background poll
//! that picks up replies landing after a turn timed out. One select
//! loop owns both the prompt and the background timer, so there is
//! never more than one poll in flight.

use std::io::Write;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline_async::SharedWriter;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use quotewire_core::cadence::PollCadence;
use quotewire_core::cursor::PollCursor;
use quotewire_core::session::{new_session_id, session_matches_user};
use quotewire_core::turn::{poll_once, TurnOutcome, TurnRunner, TurnState};
use quotewire_infra::feed::HttpReplyFeed;
use quotewire_infra::webhook::WebhookDispatcher;
use quotewire_types::config::RelayConfig;
use quotewire_types::message::Message;
use quotewire_types::session::UserContext;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

/// Run the interactive chat loop against a relay server.
pub async fn run_chat(
    config: &RelayConfig,
    server_url: &str,
    user: Option<UserContext>,
) -> anyhow::Result<()> {
    let dispatcher = WebhookDispatcher::new(
        config.webhook.url.clone(),
        config.webhook.feedback_url.clone(),
        config.webhook.source.clone(),
    );
    let feed = HttpReplyFeed::new(server_url.to_string());
    let cadence = PollCadence::new(&config.poll);
    let runner = TurnRunner::new(
        cadence.clone(),
        Duration::from_secs(config.poll.turn_ceiling_secs),
    );

    let mut session_id = new_session_id(user.as_ref());
    let mut cursor = PollCursor::new(chrono::Utc::now());

    let company = config.branding.company_name.as_str();
    print_welcome_banner(company, server_url, &session_id, user.as_ref());
    println!(
        "  {} {}",
        style(format!("{company} >")).cyan().bold(),
        config.branding.welcome_message
    );
    println!();

    if !dispatcher.is_configured() {
        println!(
            "  {}",
            style("Automation is not configured; messages will not receive replies.").yellow()
        );
        println!();
    }

    // Replies land while the prompt is live, so they go through the
    // shared writer instead of stdout to avoid clobbering it.
    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, mut writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("failed to initialize input: {e}"))?;

    // Between turns the background cadence keeps watching for late
    // replies; the select below is the only place a poll can start.
    let mut background = tokio::time::interval(cadence.background_delay());
    background.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = chat_input.read_line() => match event {
                InputEvent::Eof => {
                    println!("\n  {}", style("Session ended.").dim());
                    break;
                }
                InputEvent::Interrupted => {
                    println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                    continue;
                }
                InputEvent::Message(text) => {
                    if text.is_empty() {
                        continue;
                    }

                    if let Some(cmd) = commands::parse(&text) {
                        match cmd {
                            ChatCommand::Help => commands::print_help(),
                            ChatCommand::Clear => chat_input.clear(),
                            ChatCommand::Exit => {
                                println!("\n  {}", style("Session ended.").dim());
                                break;
                            }
                            ChatCommand::New => {
                                session_id = new_session_id(user.as_ref());
                                cursor = PollCursor::new(chrono::Utc::now());
                                println!(
                                    "\n  {} New session: {}\n",
                                    style("*").cyan().bold(),
                                    style(&session_id).dim()
                                );
                            }
                            ChatCommand::Feedback(feedback) => {
                                let name = user
                                    .as_ref()
                                    .map(|u| u.handle.as_str())
                                    .unwrap_or("anonymous");
                                match dispatcher.send_feedback(name, &feedback).await {
                                    Ok(()) => println!(
                                        "\n  {} Feedback sent. Thank you!\n",
                                        style("*").cyan().bold()
                                    ),
                                    Err(e) => println!(
                                        "\n  {} Could not send feedback: {e}\n",
                                        style("!").red().bold()
                                    ),
                                }
                            }
                            ChatCommand::Unknown(cmd_name) => {
                                println!(
                                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                    style("?").yellow().bold(),
                                    style(cmd_name).dim()
                                );
                            }
                        }
                        continue;
                    }

                    // A held session id from before a user switch is
                    // stale; regenerate rather than mixing histories.
                    if let Some(u) = &user {
                        if !session_matches_user(&session_id, u) {
                            session_id = new_session_id(Some(u));
                            cursor = PollCursor::new(chrono::Utc::now());
                            println!(
                                "\n  {} User changed, new session: {}\n",
                                style("*").cyan().bold(),
                                style(&session_id).dim()
                            );
                        }
                    }

                    run_turn(
                        &dispatcher,
                        &feed,
                        &runner,
                        company,
                        &session_id,
                        &mut cursor,
                        &text,
                        user.as_ref(),
                        &mut writer,
                    )
                    .await;
                }
            },
            _ = background.tick() => {
                let late = poll_once(&feed, &session_id, &mut cursor).await;
                print_replies(&mut writer, company, &late);
            }
        }
    }

    Ok(())
}

/// One complete turn: dispatch the message, then poll until a reply
/// lands or the turn ceiling expires. A dispatch failure ends the turn
/// immediately with an inline apology; polling never starts for a
/// message the workflow did not receive.
#[allow(clippy::too_many_arguments)]
async fn run_turn(
    dispatcher: &WebhookDispatcher,
    feed: &HttpReplyFeed,
    runner: &TurnRunner,
    company: &str,
    session_id: &str,
    cursor: &mut PollCursor,
    text: &str,
    user: Option<&UserContext>,
    writer: &mut SharedWriter,
) {
    if !dispatcher.is_configured() {
        println!(
            "  {}",
            style("Automation is disabled; message not sent.").yellow()
        );
        return;
    }

    let event = dispatcher.build_event(session_id, text, user);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("static spinner template"),
    );
    spinner.set_message(state_label(TurnState::Dispatching));
    spinner.enable_steady_tick(Duration::from_millis(80));

    if let Err(e) = dispatcher.dispatch(&event).await {
        spinner.finish_and_clear();
        warn!(session_id, error = %e, "dispatch failed");
        let _ = writeln!(
            writer,
            "\n  {} Sorry, I couldn't send that. Please try again.\n",
            style("!").red().bold()
        );
        return;
    }

    spinner.set_message(state_label(TurnState::Polling));
    let cancel = CancellationToken::new();
    match runner.run(feed, session_id, cursor, &cancel).await {
        TurnOutcome::Delivered(replies) => {
            spinner.finish_and_clear();
            print_replies(writer, company, &replies);
        }
        TurnOutcome::TimedOut => {
            spinner.finish_and_clear();
            let _ = writeln!(
                writer,
                "\n  {} This is taking longer than usual. The reply will appear here when it lands.\n",
                style("!").yellow().bold()
            );
        }
        TurnOutcome::Cancelled => {
            spinner.finish_and_clear();
        }
    }
}

fn state_label(state: TurnState) -> &'static str {
    match state {
        TurnState::Dispatching => "sending...",
        TurnState::Polling => "thinking...",
        _ => "working...",
    }
}

fn print_replies<W: Write>(out: &mut W, company: &str, replies: &[Message]) {
    for msg in replies {
        let _ = writeln!(
            out,
            "\n  {} {}",
            style(format!("{company} >")).cyan().bold(),
            msg.text
        );
    }
    if !replies.is_empty() {
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quotewire_types::message::Sender;

    fn reply(text: &str) -> Message {
        Message {
            id: "a".to_string(),
            text: text.to_string(),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            session_id: "quote_session_1".to_string(),
            status: None,
        }
    }

    #[test]
    fn replies_render_through_the_writer() {
        let mut out = Vec::new();
        print_replies(&mut out, "TreeWorks", &[reply("your quote is ready")]);
        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.contains("your quote is ready"));
        assert!(rendered.contains("TreeWorks"));
    }

    #[test]
    fn empty_poll_renders_nothing() {
        let mut out = Vec::new();
        print_replies(&mut out, "TreeWorks", &[]);
        assert!(out.is_empty());
    }
}
