use super::Story;

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Send(String),
    Resume { approved: bool, chapter_id: Option<i64> },
    NewConversation(),
    OpenStory(Story),
    Close(),
}
