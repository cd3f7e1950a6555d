#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .split_whitespace()
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }
        let prefix = args.remove(0);

        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_approve()
            || cmd.is_reject()
            || cmd.is_new()
            || cmd.is_status()
            || cmd.is_help()
            || cmd.is_story()
        {
            return Some(cmd);
        }

        return None;
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_approve(&self) -> bool {
        return ["/y", "/approve"].contains(&self.command.as_str());
    }

    pub fn is_reject(&self) -> bool {
        return ["/n", "/reject"].contains(&self.command.as_str());
    }

    pub fn is_new(&self) -> bool {
        return ["/new"].contains(&self.command.as_str());
    }

    pub fn is_status(&self) -> bool {
        return ["/s", "/status"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }

    pub fn is_story(&self) -> bool {
        return ["/story"].contains(&self.command.as_str());
    }

    /// Chapter an approved image should be attached to, if one was given.
    pub fn chapter_id(&self) -> Result<Option<i64>> {
        let arg = match self.args.first() {
            Some(arg) => arg,
            None => return Ok(None),
        };

        match arg.parse::<i64>() {
            Ok(id) => return Ok(Some(id)),
            Err(_) => bail!("Usage: /approve [CHAPTER_ID?] where CHAPTER_ID is a number, got {arg}"),
        }
    }
}
