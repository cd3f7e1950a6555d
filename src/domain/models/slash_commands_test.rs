use super::SlashCommand;

#[test]
fn it_parse_empty_string() {
    let text = "";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_space_only() {
    let text = " ";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_single_slash() {
    let text = "/";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_plain_prompt() {
    let text = "Write the next chapter please";
    assert!(SlashCommand::parse(text).is_none());
}

#[test]
fn it_parse_valid_prefix() {
    let cmd = SlashCommand::parse("/q");
    assert!(cmd.is_some());
    assert_eq!(cmd.unwrap().command, "/q");
}

#[test]
fn it_is_quit() {
    assert!(SlashCommand::parse("/quit").unwrap().is_quit());
    assert!(SlashCommand::parse("/exit").unwrap().is_quit());
    assert!(!SlashCommand::parse("/new").unwrap().is_quit());
}

#[test]
fn it_is_approve_without_chapter() {
    let cmd = SlashCommand::parse("/approve").unwrap();
    assert!(cmd.is_approve());
    assert_eq!(cmd.chapter_id().unwrap(), None);
}

#[test]
fn it_is_approve_with_chapter() {
    let cmd = SlashCommand::parse("/y 5").unwrap();
    assert!(cmd.is_approve());
    assert_eq!(cmd.chapter_id().unwrap(), Some(5));
}

#[test]
fn it_refuses_non_numeric_chapter() {
    let cmd = SlashCommand::parse("/approve five").unwrap();
    let err = cmd.chapter_id().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Usage: /approve [CHAPTER_ID?] where CHAPTER_ID is a number, got five"
    );
}

#[test]
fn it_is_reject() {
    assert!(SlashCommand::parse("/reject").unwrap().is_reject());
    assert!(SlashCommand::parse("/n").unwrap().is_reject());
}

#[test]
fn it_is_new_status_and_help() {
    assert!(SlashCommand::parse("/new").unwrap().is_new());
    assert!(SlashCommand::parse("/status").unwrap().is_status());
    assert!(SlashCommand::parse("/h").unwrap().is_help());
}

#[test]
fn it_is_story() {
    let cmd = SlashCommand::parse("/story 4 The Lighthouse").unwrap();
    assert!(cmd.is_story());
    assert_eq!(cmd.args, vec!["4", "The", "Lighthouse"]);
}
