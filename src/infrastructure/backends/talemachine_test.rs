use anyhow::Result;
use futures::stream::TryStreamExt;
use mockito::Matcher;
use serde_json::json;

use super::SendRequest;
use super::StoryParams;
use super::TaleMachine;
use crate::domain::models::Backend;
use crate::domain::models::ByteStream;
use crate::domain::models::Genre;
use crate::domain::models::Message;
use crate::domain::models::ResumeProtocol;
use crate::domain::models::ResumeRequest;
use crate::domain::models::Role;
use crate::domain::models::Story;
use crate::domain::models::StoryLength;
use crate::domain::models::TurnRequest;

impl TaleMachine {
    fn with_url(url: String, protocol: ResumeProtocol) -> TaleMachine {
        return TaleMachine {
            url,
            timeout: "200".to_string(),
            protocol,
        };
    }
}

fn story() -> Story {
    return Story {
        id: 7,
        title: "The Lighthouse".to_string(),
        story_length: StoryLength::Long,
        chapter_length: StoryLength::Short,
        genre: Genre::SciFi,
        additional_notes: None,
        main_characters: Some("Mara, a keeper".to_string()),
        plot_ideas: None,
    };
}

async fn collect(stream: ByteStream) -> Result<String> {
    let chunks = stream.try_collect::<Vec<Vec<u8>>>().await?;
    return Ok(String::from_utf8(chunks.concat())?);
}

#[tokio::test]
async fn it_successfully_health_checks() {
    let mut server = mockito::Server::new();
    let mock = server.mock("GET", "/health").with_status(200).create();

    let backend = TaleMachine::with_url(server.url(), ResumeProtocol::Approval);
    let res = backend.health_check().await;

    assert!(res.is_ok());
    mock.assert();
}

#[tokio::test]
async fn it_fails_health_checks() {
    let mut server = mockito::Server::new();
    let mock = server.mock("GET", "/health").with_status(500).create();

    let backend = TaleMachine::with_url(server.url(), ResumeProtocol::Approval);
    let res = backend.health_check().await;

    assert!(res.is_err());
    mock.assert();
}

#[tokio::test]
async fn it_fails_health_checks_without_url() {
    let backend = TaleMachine::with_url("".to_string(), ResumeProtocol::Approval);
    let res = backend.health_check().await;

    assert_eq!(res.unwrap_err().to_string(), "TaleMachine URL is not defined");
}

#[test]
fn it_serializes_send_request() -> Result<()> {
    let body = SendRequest {
        messages: vec![Message::new(Role::User, "Begin")],
        thread_id: "thread-1".to_string(),
        story: StoryParams::from(&story()),
    };

    insta::assert_snapshot!(serde_json::to_string(&body)?, @r###"{"messages":[{"role":"user","content":"Begin"}],"thread_id":"thread-1","story_name":"The Lighthouse","story_id":7,"story_length":"long","chapter_length":"short","genre":"sci-fi","additional_notes":null,"main_characters":"Mara, a keeper","plot_ideas":null}"###);

    return Ok(());
}

#[tokio::test]
async fn it_starts_turns() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/messages/send")
        .match_body(Matcher::Json(json!({
            "messages": [
                {"role": "user", "content": "Begin"},
                {"role": "assistant", "content": "The lamp flickered."},
                {"role": "user", "content": "Go on"}
            ],
            "thread_id": "thread-1",
            "story_name": "The Lighthouse",
            "story_id": 7,
            "story_length": "long",
            "chapter_length": "short",
            "genre": "sci-fi",
            "additional_notes": null,
            "main_characters": "Mara, a keeper",
            "plot_ideas": null
        })))
        .with_status(200)
        .with_body("The fog lifted. __interrupt__:{\"tool_name\":\"generate_image\"}")
        .create();

    let backend = TaleMachine::with_url(server.url(), ResumeProtocol::Approval);
    let stream = backend
        .start_turn(TurnRequest {
            messages: vec![
                Message::new(Role::User, "Begin"),
                Message::new(Role::Assistant, "The lamp flickered."),
                Message::new(Role::User, "Go on"),
            ],
            thread_id: "thread-1".to_string(),
            story: story(),
        })
        .await?;

    assert_eq!(
        collect(stream).await?,
        "The fog lifted. __interrupt__:{\"tool_name\":\"generate_image\"}"
    );
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_fails_turns_on_error_status() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/messages/send")
        .with_status(503)
        .create();

    let backend = TaleMachine::with_url(server.url(), ResumeProtocol::Approval);
    let res = backend
        .start_turn(TurnRequest {
            messages: vec![Message::new(Role::User, "Begin")],
            thread_id: "thread-1".to_string(),
            story: story(),
        })
        .await;

    assert_eq!(
        res.err().unwrap().to_string(),
        "TaleMachine returned status 503"
    );
    mock.assert();
}

#[tokio::test]
async fn it_resumes_with_chapter_approval() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/messages/resume_after_interrupt")
        .match_body(Matcher::PartialJson(json!({
            "thread_id": "thread-1",
            "story_name": "The Lighthouse",
            "story_id": 7,
            "approval": true,
            "chapter_id": 12,
            "genre": "sci-fi"
        })))
        .with_status(200)
        .with_body("Image saved.")
        .create();

    let backend = TaleMachine::with_url(server.url(), ResumeProtocol::Approval);
    let stream = backend
        .resume_turn(ResumeRequest {
            thread_id: "thread-1".to_string(),
            story: story(),
            approved: true,
            chapter_id: Some(12),
        })
        .await?;

    assert_eq!(collect(stream).await?, "Image saved.");
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_resumes_without_chapter() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/messages/resume_after_interrupt")
        .match_body(Matcher::PartialJson(json!({
            "approval": false,
            "chapter_id": -1
        })))
        .with_status(200)
        .with_body("")
        .create();

    let backend = TaleMachine::with_url(server.url(), ResumeProtocol::Approval);
    let stream = backend
        .resume_turn(ResumeRequest {
            thread_id: "thread-1".to_string(),
            story: story(),
            approved: false,
            chapter_id: None,
        })
        .await?;

    assert_eq!(collect(stream).await?, "");
    mock.assert();

    return Ok(());
}

#[tokio::test]
async fn it_resumes_with_user_approval() -> Result<()> {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/messages/resume_after_interrupt")
        .match_body(Matcher::Json(json!({
            "story_name": "The Lighthouse",
            "thread_id": "thread-1",
            "story_id": 7,
            "user_approval": true
        })))
        .with_status(200)
        .with_body("Continuing.")
        .create();

    let backend = TaleMachine::with_url(format!("{}/", server.url()), ResumeProtocol::UserApproval);
    let stream = backend
        .resume_turn(ResumeRequest {
            thread_id: "thread-1".to_string(),
            story: story(),
            approved: true,
            chapter_id: Some(3),
        })
        .await?;

    assert_eq!(collect(stream).await?, "Continuing.");
    mock.assert();

    return Ok(());
}
