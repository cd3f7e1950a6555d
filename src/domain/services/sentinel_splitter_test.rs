use anyhow::Result;
use test_utils::interrupted_story_fixture;
use test_utils::plain_story_fixture;
use test_utils::split_bytes;

use super::SentinelSplitter;
use super::SplitEvent;
use crate::domain::services::StreamDecoder;

struct Collected {
    text: String,
    payload: String,
    markers: usize,
}

fn run(chunks: &[Vec<u8>]) -> Result<Collected> {
    let mut decoder = StreamDecoder::default();
    let mut splitter = SentinelSplitter::default();
    let mut events = vec![];

    for chunk in chunks {
        let text = decoder.decode(chunk)?;
        if let Some(event) = splitter.push(&text) {
            events.push(event);
        }
    }
    decoder.finish()?;
    if let Some(event) = splitter.finish() {
        events.push(event);
    }

    let mut res = Collected {
        text: "".to_string(),
        payload: "".to_string(),
        markers: 0,
    };
    for event in events {
        match event {
            SplitEvent::PlainText(text) => res.text += &text,
            SplitEvent::MarkerFound { before, payload } => {
                res.markers += 1;
                res.text += &before;
                res.payload += &payload;
            }
            SplitEvent::Payload(payload) => res.payload += &payload,
        }
    }

    return Ok(res);
}

#[test]
fn it_passes_plain_text_through() {
    let mut splitter = SentinelSplitter::default();
    assert_eq!(
        splitter.push("Once upon a time, "),
        Some(SplitEvent::PlainText("Once upon a time, ".to_string()))
    );
    assert_eq!(splitter.finish(), None);
    assert!(!splitter.marker_found());
}

#[test]
fn it_finds_marker_inside_one_fragment() {
    let mut splitter = SentinelSplitter::default();
    let event = splitter.push(r#"The end. __interrupt__:{"tool_name":"save_story"}"#);
    assert_eq!(
        event,
        Some(SplitEvent::MarkerFound {
            before: "The end. ".to_string(),
            payload: r#"{"tool_name":"save_story"}"#.to_string(),
        })
    );
    assert!(splitter.marker_found());
}

#[test]
fn it_finds_marker_split_across_fragments() {
    let mut splitter = SentinelSplitter::default();
    assert_eq!(
        splitter.push("Once upon a time, "),
        Some(SplitEvent::PlainText("Once upon a time, ".to_string()))
    );
    assert_eq!(
        splitter.push("the cat wrote. __inter"),
        Some(SplitEvent::PlainText("the cat wrote. ".to_string()))
    );
    assert_eq!(
        splitter.push("rupt__:"),
        Some(SplitEvent::MarkerFound {
            before: "".to_string(),
            payload: "".to_string(),
        })
    );
    assert_eq!(
        splitter.push(r#"{"tool_name":"generate_image"}"#),
        Some(SplitEvent::Payload(
            r#"{"tool_name":"generate_image"}"#.to_string()
        ))
    );
    assert_eq!(splitter.finish(), None);
}

#[test]
fn it_flushes_false_marker_prefixes() {
    let mut splitter = SentinelSplitter::default();
    assert_eq!(
        splitter.push("a __inter"),
        Some(SplitEvent::PlainText("a ".to_string()))
    );
    assert_eq!(
        splitter.push("esting word"),
        Some(SplitEvent::PlainText("__interesting word".to_string()))
    );
}

#[test]
fn it_flushes_unfinished_prefix_at_end() {
    let mut splitter = SentinelSplitter::default();
    assert_eq!(
        splitter.push("trailing _"),
        Some(SplitEvent::PlainText("trailing ".to_string()))
    );
    assert_eq!(splitter.push("_"), None);
    assert_eq!(
        splitter.finish(),
        Some(SplitEvent::PlainText("__".to_string()))
    );
}

#[test]
fn it_stops_scanning_after_marker() {
    let mut splitter = SentinelSplitter::default();
    splitter.push("__interrupt__:first");
    assert_eq!(
        splitter.push(" __interrupt__:second"),
        Some(SplitEvent::Payload(" __interrupt__:second".to_string()))
    );
    assert_eq!(splitter.push(""), None);
}

#[test]
fn it_never_holds_more_than_marker_prefix() {
    let mut splitter = SentinelSplitter::new("<<stop>>");
    assert_eq!(splitter.push("<<sto"), None);
    assert_eq!(splitter.held, "<<sto");
    assert_eq!(
        splitter.push("ry"),
        Some(SplitEvent::PlainText("<<story".to_string()))
    );
    assert!(splitter.held.is_empty());
}

#[test]
fn it_finds_marker_for_every_two_way_split() -> Result<()> {
    let fixture = interrupted_story_fixture();
    let whole = run(&split_bytes(fixture, &[]))?;
    assert_eq!(whole.markers, 1);
    assert_eq!(
        whole.text,
        "Once upon a time, a café owner named Zoë opened her shutters. "
    );
    assert!(whole.payload.starts_with(r#"{"tool_name":"generate_image""#));

    for offset in 0..=fixture.len() {
        let res = run(&split_bytes(fixture, &[offset]))?;
        assert_eq!(res.markers, 1, "split at {offset}");
        assert_eq!(res.text, whole.text, "split at {offset}");
        assert_eq!(res.payload, whole.payload, "split at {offset}");
    }

    return Ok(());
}

#[test]
fn it_finds_marker_for_every_three_way_split_around_marker() -> Result<()> {
    let fixture = interrupted_story_fixture();
    let whole = run(&split_bytes(fixture, &[]))?;
    let marker_at = fixture.find("__interrupt__:").unwrap();

    // Every pair of cuts from before "Zoë" to just past the marker.
    let start = marker_at - 30;
    let end = marker_at + "__interrupt__:".len() + 2;
    for first in start..=end {
        for second in first..=end {
            let res = run(&split_bytes(fixture, &[first, second]))?;
            assert_eq!(res.markers, 1, "split at {first}, {second}");
            assert_eq!(res.text, whole.text, "split at {first}, {second}");
            assert_eq!(res.payload, whole.payload, "split at {first}, {second}");
        }
    }

    return Ok(());
}

#[test]
fn it_finds_marker_in_single_byte_fragments() -> Result<()> {
    let fixture = interrupted_story_fixture();
    let whole = run(&split_bytes(fixture, &[]))?;
    let offsets = (1..fixture.len()).collect::<Vec<usize>>();

    let res = run(&split_bytes(fixture, &offsets))?;
    assert_eq!(res.markers, 1);
    assert_eq!(res.text, whole.text);
    assert_eq!(res.payload, whole.payload);

    return Ok(());
}

#[test]
fn it_never_reports_marker_in_plain_stories() -> Result<()> {
    let fixture = plain_story_fixture();
    for offset in 0..=fixture.len() {
        let res = run(&split_bytes(fixture, &[offset]))?;
        assert_eq!(res.markers, 0);
        assert_eq!(res.text, fixture);
        assert!(res.payload.is_empty());
    }

    return Ok(());
}
