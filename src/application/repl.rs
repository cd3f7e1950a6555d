#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::InterruptRequest;
use crate::domain::models::Role;
use crate::domain::models::SessionEvent;
use crate::domain::models::SessionPhase;
use crate::domain::models::SlashCommand;
use crate::domain::models::Story;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /approve (/y) [CHAPTER_ID?] - Approves the paused action. For images, CHAPTER_ID is the chapter the image is attached to.
- /reject (/n) - Rejects the paused action and lets the story continue without it.
- /new - Starts a new conversation on a fresh thread.
- /story [STORY_ID] [TITLE?] - Switches to another story. Other story settings come from the config.
- /status (/s) - Shows whether a turn is running or waiting for approval.
- /quit /exit (/q) - Exit TaleMachine.
- /help (/h) - Provides this help menu.

Any other line is sent to the story writer.
        "#;

    return text.trim().to_string();
}

#[derive(Debug, PartialEq)]
pub enum Input {
    Action(Action),
    Print(String),
    Quit,
    Nothing,
}

/// What the terminal knows about the session, rebuilt from events.
pub struct Repl {
    phase: SessionPhase,
    interrupt: Option<InterruptRequest>,
    last_error: Option<String>,
}

impl Default for Repl {
    fn default() -> Repl {
        return Repl {
            phase: SessionPhase::Idle,
            interrupt: None,
            last_error: None,
        };
    }
}

/// Builds the story a `/story` command points at. Settings other than id and
/// title come from the loaded config, falling back to defaults.
pub fn story_from_command(command: &SlashCommand) -> Result<Story> {
    let id = match command.args.first() {
        Some(id) => id.to_string(),
        None => bail!("Usage: /story [STORY_ID] [TITLE?]"),
    };
    let title = command.args[1..].join(" ");

    let story = Story::from_lookup(|key| {
        if key == ConfigKey::StoryId {
            return id.to_string();
        }
        if key == ConfigKey::StoryTitle {
            return title.to_string();
        }

        let val = Config::get(key);
        if val.is_empty() {
            return Config::default(key);
        }
        return val;
    })?;

    match story {
        Some(story) => return Ok(story),
        None => bail!("Usage: /story [STORY_ID] [TITLE?]"),
    }
}

fn describe_interrupt(interrupt: &InterruptRequest) -> String {
    if interrupt.is_image_generation() {
        let prompt = interrupt
            .args
            .as_ref()
            .and_then(|args| return args.get("prompt"))
            .and_then(|prompt| return prompt.as_str());

        let mut text = "The story wants to generate an image".to_string();
        if let Some(prompt) = prompt {
            text = format!("{text}: {prompt}");
        }
        return format!("{text}\nApprove with /approve [CHAPTER_ID] or decline with /reject.");
    }

    let message = interrupt
        .message
        .clone()
        .unwrap_or_else(|| return format!("{} needs approval", interrupt.tool_name));

    return format!("{message}\nApprove with /approve or decline with /reject.");
}

impl Repl {
    pub fn translate(&self, line: &str) -> Input {
        let line = line.trim();
        if line.is_empty() {
            return Input::Nothing;
        }

        if let Some(command) = SlashCommand::parse(line) {
            if command.is_quit() {
                return Input::Quit;
            }
            if command.is_help() {
                return Input::Print(help_text());
            }
            if command.is_status() {
                return Input::Print(self.status());
            }
            if command.is_new() {
                return Input::Action(Action::NewConversation());
            }
            if command.is_story() {
                match story_from_command(&command) {
                    Ok(story) => return Input::Action(Action::OpenStory(story)),
                    Err(err) => return Input::Print(err.to_string()),
                }
            }
            if command.is_approve() {
                match command.chapter_id() {
                    Ok(chapter_id) => {
                        return Input::Action(Action::Resume {
                            approved: true,
                            chapter_id,
                        });
                    }
                    Err(err) => return Input::Print(err.to_string()),
                }
            }
            if command.is_reject() {
                return Input::Action(Action::Resume {
                    approved: false,
                    chapter_id: None,
                });
            }
        }

        return Input::Action(Action::Send(line.to_string()));
    }

    pub fn status(&self) -> String {
        let mut lines = vec![format!("Phase: {}", self.phase)];
        if let Some(interrupt) = &self.interrupt {
            lines.push(format!("Waiting for approval: {}", interrupt.tool_name));
        }
        if let Some(err) = &self.last_error {
            lines.push(format!("Last error: {err}"));
        }

        return lines.join("\n");
    }

    /// Text to write for an event, if any. Assistant text is written as it
    /// streams, without line breaks of its own.
    pub fn render(&mut self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::PhaseChanged(phase) => {
                self.phase = *phase;
                if *phase != SessionPhase::AwaitingApproval {
                    self.interrupt = None;
                }
                if *phase == SessionPhase::Sending {
                    self.last_error = None;
                }
                return None;
            }
            SessionEvent::MessageAppended(_, Role::Assistant) => {
                return Some(format!("\n{} ", Paint::cyan("Story:").bold()));
            }
            SessionEvent::MessageAppended(_, Role::User) => {
                return None;
            }
            SessionEvent::AssistantText(_, text) => {
                return Some(text.to_string());
            }
            SessionEvent::InterruptPending(interrupt) => {
                self.interrupt = Some(interrupt.clone());
                return Some(format!("\n\n{}\n", Paint::yellow(describe_interrupt(interrupt))));
            }
            SessionEvent::TurnComplete() => {
                return Some("\n".to_string());
            }
            SessionEvent::TurnFailed(err) => {
                self.last_error = Some(err.to_string());
                return Some(format!("\n{}\n", Paint::red(format!("Error: {err}"))));
            }
            SessionEvent::Rejected(reason) => {
                return Some(format!("{}\n", Paint::yellow(reason)));
            }
            SessionEvent::Closed() => {
                return Some("Goodbye.\n".to_string());
            }
        }
    }
}

async fn write(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;

    return Ok(());
}

/// Reads lines from stdin and prints session events until the session closes.
pub async fn start(
    story: Option<Story>,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    run(BufReader::new(tokio::io::stdin()), story, tx, rx).await?;
    return Ok(());
}

async fn run<R>(
    input: R,
    story: Option<Story>,
    tx: mpsc::UnboundedSender<Action>,
    mut rx: mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<Repl>
where
    R: AsyncBufRead + Unpin,
{
    let mut repl = Repl::default();
    let mut lines = input.lines();
    // Dropped at end of input so the service can finish the running turn.
    let mut tx = Some(tx);

    match &story {
        Some(story) => {
            write(&format!(
                "{} ({}, {})\nType /help for commands.\n",
                Paint::new(&story.title).bold(),
                story.genre,
                story.story_length
            ))
            .await?;
        }
        None => {
            write(&format!(
                "{}\n",
                Paint::yellow("No story selected. Set --story-id or story-id in the config file.")
            ))
            .await?;
        }
    }

    loop {
        tokio::select! {
            line = lines.next_line(), if tx.is_some() => {
                let line = match line? {
                    Some(line) => line,
                    None => {
                        tracing::debug!("End of input, waiting for the session to finish");
                        tx = None;
                        continue;
                    }
                };

                let sender = match &tx {
                    Some(sender) => sender,
                    None => continue,
                };
                match repl.translate(&line) {
                    Input::Action(action) => {
                        sender.send(action)?;
                    }
                    Input::Print(text) => {
                        write(&format!("{text}\n")).await?;
                    }
                    Input::Quit => {
                        sender.send(Action::Close())?;
                    }
                    Input::Nothing => {}
                }
            }
            event = rx.recv() => {
                let event = match event {
                    Some(event) => event,
                    None => return Ok(repl),
                };

                if let Some(text) = repl.render(&event) {
                    write(&text).await?;
                }
                if event == SessionEvent::Closed() {
                    return Ok(repl);
                }
            }
        }
    }
}
