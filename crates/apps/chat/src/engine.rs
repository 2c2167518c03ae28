//! Pure chat state transitions.
//!
//! Every mutation of [`ChatState`] goes through [`ChatState::apply`], which takes the caller's
//! clock reading so transitions stay deterministic under test. The async store in
//! [`crate::store`] decides when to apply which action.

use platform_host::{ModelInfo, ProviderConfig};

use crate::model::{
    ChatError, ChatMessage, ChatSession, ChatState, MessageRole, ModelStatus, SystemStats,
};

/// Session length right after its first completed exchange (user prompt plus reply).
pub const FIRST_EXCHANGE_LEN: usize = 2;
/// Model used for title requests when none is selected.
pub const TITLE_FALLBACK_MODEL: &str = "gpt-3.5-turbo";
/// Completion ceiling for title requests.
pub const TITLE_MAX_TOKENS: u32 = 20;
/// Sampling temperature for title requests.
pub const TITLE_TEMPERATURE: f32 = 0.7;

/// Terminal state of a round as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEnd {
    /// Reply finished normally.
    Completed,
    /// Provider failed with the given message.
    Failed(String),
    /// Caller cancelled; partial text stays.
    Cancelled,
}

/// State transition applied by [`ChatState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    /// Append a new empty session and make it current.
    CreateChat {
        /// Session id.
        id: String,
    },
    /// Make a stored session current and copy its transcript.
    LoadChat {
        /// Session id.
        id: String,
    },
    /// Remove a stored session.
    DeleteChat {
        /// Session id.
        id: String,
    },
    /// Retitle a stored session; blank titles are ignored.
    RenameChat {
        /// Session id.
        id: String,
        /// Requested title, trimmed before commit.
        title: String,
    },
    /// Empty the current session's transcript.
    ClearCurrent,
    /// Select the model for new rounds.
    SetActiveModel(String),
    /// Record a successful model listing.
    ModelsLoaded(Vec<ModelInfo>),
    /// Record a failed model listing or provider setup.
    ModelsFailed(String),
    /// Record accepted provider settings.
    SetProvider(ProviderConfig),
    /// Replace the resource monitor snapshot.
    SetSystemStats(SystemStats),
    /// Start a round: user message plus an empty assistant placeholder.
    BeginRound(String),
    /// Append streamed text to the in-flight placeholder.
    AppendFragment(String),
    /// End the in-flight round.
    FinishRound(RoundEnd),
    /// Overwrite a session title with cleaned model output.
    ApplyGeneratedTitle {
        /// Session id.
        id: String,
        /// Raw model output.
        raw: String,
    },
}

impl ChatState {
    /// Applies `action` at time `now_ms` and reports whether anything changed.
    pub fn apply(&mut self, action: ChatAction, now_ms: u64) -> bool {
        match action {
            ChatAction::CreateChat { id } => {
                self.chat_history.push(ChatSession::new(id.clone(), now_ms));
                self.current_chat_id = Some(id);
                self.messages.clear();
                true
            }
            ChatAction::LoadChat { id } => {
                let Some(messages) = self.session(&id).map(|chat| chat.messages.clone()) else {
                    return false;
                };
                self.current_chat_id = Some(id);
                self.messages = messages;
                true
            }
            ChatAction::DeleteChat { id } => self.delete_chat(&id),
            ChatAction::RenameChat { id, title } => self.rename_chat(&id, &title, now_ms),
            ChatAction::ClearCurrent => self.clear_current(now_ms),
            ChatAction::SetActiveModel(model_id) => {
                self.active_model_id = Some(model_id);
                true
            }
            ChatAction::ModelsLoaded(models) => {
                self.available_models = models;
                self.model_status = ModelStatus::Ready;
                self.error = None;
                true
            }
            ChatAction::ModelsFailed(message) => {
                self.model_status = ModelStatus::Error;
                self.error = Some(message);
                true
            }
            ChatAction::SetProvider(config) => {
                self.provider_config = Some(config);
                true
            }
            ChatAction::SetSystemStats(stats) => {
                self.system_stats = stats;
                true
            }
            ChatAction::BeginRound(content) => self.begin_round(content, now_ms),
            ChatAction::AppendFragment(fragment) => self.append_fragment(&fragment, now_ms),
            ChatAction::FinishRound(end) => self.finish_round(end, now_ms),
            ChatAction::ApplyGeneratedTitle { id, raw } => {
                let title = clean_generated_title(&raw);
                self.rename_chat(&id, &title, now_ms)
            }
        }
    }

    /// Checks round preconditions and returns the model to use.
    ///
    /// # Errors
    ///
    /// Returns the first unmet precondition, checked in the order provider, model, session,
    /// in-flight round.
    pub fn check_round(&self, provider_configured: bool) -> Result<String, ChatError> {
        if !provider_configured {
            return Err(ChatError::NotConfigured);
        }
        let model = self
            .active_model_id
            .clone()
            .ok_or(ChatError::NoModelSelected)?;
        if self.current_session().is_none() {
            return Err(ChatError::NoActiveChat);
        }
        if self.is_generating {
            return Err(ChatError::GenerationInProgress);
        }
        Ok(model)
    }

    /// Session that just finished its first exchange and still needs a generated title.
    pub fn title_candidate(&self, chat_id: &str) -> Option<&ChatSession> {
        self.session(chat_id)
            .filter(|chat| chat.messages.len() == FIRST_EXCHANGE_LEN)
    }

    /// Session receiving the in-flight round.
    pub fn round_chat_id(&self) -> Option<&str> {
        self.round_chat_id.as_deref()
    }

    fn delete_chat(&mut self, id: &str) -> bool {
        let before = self.chat_history.len();
        self.chat_history.retain(|chat| chat.id != id);
        if self.chat_history.len() == before {
            return false;
        }
        if self.current_chat_id.as_deref() == Some(id) {
            self.current_chat_id = None;
            self.messages.clear();
        }
        if self.round_chat_id.as_deref() == Some(id) {
            self.round_chat_id = None;
        }
        true
    }

    fn rename_chat(&mut self, id: &str, title: &str, now_ms: u64) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        let Some(chat) = self.chat_history.iter_mut().find(|chat| chat.id == id) else {
            return false;
        };
        chat.title = title.to_string();
        chat.updated_at = now_ms;
        true
    }

    fn clear_current(&mut self, now_ms: u64) -> bool {
        let Some(current) = self.current_chat_id.clone() else {
            return false;
        };
        self.messages.clear();
        if let Some(chat) = self.chat_history.iter_mut().find(|chat| chat.id == current) {
            chat.messages.clear();
            chat.updated_at = now_ms;
        }
        true
    }

    fn begin_round(&mut self, content: String, now_ms: u64) -> bool {
        let Some(current) = self.current_chat_id.clone() else {
            return false;
        };
        self.round_chat_id = Some(current);
        self.is_generating = true;
        self.error = None;
        self.edit_round_transcript(now_ms, |messages| {
            messages.push(ChatMessage::new(MessageRole::User, content, now_ms));
            messages.push(ChatMessage::new(MessageRole::Assistant, String::new(), now_ms));
        });
        true
    }

    fn append_fragment(&mut self, fragment: &str, now_ms: u64) -> bool {
        if !self.is_generating || fragment.is_empty() {
            return false;
        }
        self.edit_round_transcript(now_ms, |messages| {
            if let Some(last) = messages
                .last_mut()
                .filter(|last| last.role == MessageRole::Assistant)
            {
                last.content.push_str(fragment);
                last.timestamp = Some(now_ms);
            }
        });
        true
    }

    fn finish_round(&mut self, end: RoundEnd, now_ms: u64) -> bool {
        if !self.is_generating {
            return false;
        }
        if let RoundEnd::Failed(message) = end {
            self.edit_round_transcript(now_ms, |messages| {
                messages.push(ChatMessage::new(MessageRole::Error, message.clone(), now_ms));
            });
            self.error = Some(message);
        }
        self.is_generating = false;
        self.round_chat_id = None;
        true
    }

    /// Applies `edit` to the round's stored session and mirrors it into the visible transcript
    /// when that session is current.
    fn edit_round_transcript(&mut self, now_ms: u64, edit: impl FnOnce(&mut Vec<ChatMessage>)) {
        let Some(round_id) = self.round_chat_id.clone() else {
            return;
        };
        let Some(chat) = self.chat_history.iter_mut().find(|chat| chat.id == round_id) else {
            return;
        };
        edit(&mut chat.messages);
        chat.updated_at = now_ms;
        if self.current_chat_id.as_deref() == Some(round_id.as_str()) {
            self.messages = chat.messages.clone();
        }
    }
}

/// Builds the summarization prompt for a session transcript.
pub fn title_prompt(chat: &ChatSession) -> String {
    let transcript = chat
        .messages
        .iter()
        .map(|message| format!("{}: {}", role_label(message.role), message.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Please provide a very brief title (maximum 4-5 words) for this conversation. \
Here's the chat history:\n{transcript}"
    )
}

/// Strips quote characters and surrounding whitespace from model output.
pub fn clean_generated_title(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !matches!(ch, '"' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn state_with_chat(id: &str) -> ChatState {
        let mut state = ChatState::default();
        state.apply(ChatAction::CreateChat { id: id.to_string() }, 1);
        state
    }

    fn contents(messages: &[ChatMessage]) -> Vec<(MessageRole, &str)> {
        messages
            .iter()
            .map(|message| (message.role, message.content.as_str()))
            .collect()
    }

    #[test]
    fn create_chat_becomes_current_with_empty_transcript() {
        let mut state = state_with_chat("a");
        state.messages.push(ChatMessage::new(MessageRole::User, "stale", 1));
        state.apply(ChatAction::CreateChat { id: "b".to_string() }, 2);

        assert_eq!(state.current_chat_id.as_deref(), Some("b"));
        assert!(state.messages.is_empty());
        assert_eq!(state.chat_history.len(), 2);
        assert_eq!(state.chat_history[1].title, "New Chat");
        assert_eq!(state.chat_history[1].created_at, 2);
    }

    #[test]
    fn rename_ignores_blank_titles_and_trims_others() {
        let mut state = state_with_chat("a");
        assert!(!state.apply(
            ChatAction::RenameChat {
                id: "a".to_string(),
                title: String::new()
            },
            5
        ));
        assert!(!state.apply(
            ChatAction::RenameChat {
                id: "a".to_string(),
                title: "   ".to_string()
            },
            5
        ));
        assert_eq!(state.chat_history[0].title, "New Chat");
        assert_eq!(state.chat_history[0].updated_at, 1);

        assert!(state.apply(
            ChatAction::RenameChat {
                id: "a".to_string(),
                title: " Foo ".to_string()
            },
            6
        ));
        assert_eq!(state.chat_history[0].title, "Foo");
        assert_eq!(state.chat_history[0].updated_at, 6);
    }

    #[test]
    fn load_copies_transcript_and_unknown_id_is_ignored() {
        let mut state = state_with_chat("a");
        state.apply(ChatAction::BeginRound("hi".to_string()), 2);
        state.apply(ChatAction::AppendFragment("yo".to_string()), 3);
        state.apply(ChatAction::FinishRound(RoundEnd::Completed), 4);
        state.apply(ChatAction::CreateChat { id: "b".to_string() }, 5);
        assert!(state.messages.is_empty());

        assert!(!state.apply(ChatAction::LoadChat { id: "zzz".to_string() }, 6));
        assert_eq!(state.current_chat_id.as_deref(), Some("b"));

        assert!(state.apply(ChatAction::LoadChat { id: "a".to_string() }, 6));
        assert_eq!(
            contents(&state.messages),
            vec![(MessageRole::User, "hi"), (MessageRole::Assistant, "yo")]
        );

        state.messages.clear();
        assert_eq!(state.session("a").map(|chat| chat.messages.len()), Some(2));
    }

    #[test]
    fn deleting_current_chat_clears_pointer_and_transcript() {
        let mut state = state_with_chat("a");
        state.apply(ChatAction::CreateChat { id: "b".to_string() }, 2);
        state.apply(ChatAction::BeginRound("hello".to_string()), 3);
        state.apply(ChatAction::FinishRound(RoundEnd::Completed), 3);

        assert!(state.apply(ChatAction::DeleteChat { id: "a".to_string() }, 4));
        assert_eq!(state.current_chat_id.as_deref(), Some("b"));
        assert_eq!(state.messages.len(), 2);

        assert!(state.apply(ChatAction::DeleteChat { id: "b".to_string() }, 5));
        assert_eq!(state.current_chat_id, None);
        assert!(state.messages.is_empty());
        assert!(!state.apply(ChatAction::DeleteChat { id: "b".to_string() }, 6));
    }

    #[test]
    fn streamed_fragments_fill_a_single_placeholder() {
        let mut state = state_with_chat("a");
        state.apply(ChatAction::BeginRound("count".to_string()), 10);
        for (offset, token) in ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]
            .iter()
            .enumerate()
        {
            state.apply(ChatAction::AppendFragment((*token).to_string()), 11 + offset as u64);
        }
        state.apply(ChatAction::FinishRound(RoundEnd::Completed), 30);

        let assistants = state
            .messages
            .iter()
            .filter(|message| message.role == MessageRole::Assistant)
            .collect::<Vec<_>>();
        assert_eq!(assistants.len(), 1);
        assert_eq!(assistants[0].content, "12345678910");
        assert_eq!(assistants[0].timestamp, Some(20));
        assert!(!state.is_generating);
        assert_eq!(state.current_session().map(|c| &c.messages), Some(&state.messages));
    }

    #[test]
    fn failed_round_appends_error_message_and_sets_error() {
        let mut state = state_with_chat("a");
        state.apply(ChatAction::BeginRound("hi".to_string()), 2);
        state.apply(ChatAction::AppendFragment("par".to_string()), 3);
        state.apply(
            ChatAction::FinishRound(RoundEnd::Failed("AI generation failed: boom".to_string())),
            4,
        );

        assert_eq!(
            contents(&state.messages),
            vec![
                (MessageRole::User, "hi"),
                (MessageRole::Assistant, "par"),
                (MessageRole::Error, "AI generation failed: boom"),
            ]
        );
        assert_eq!(state.error.as_deref(), Some("AI generation failed: boom"));
        assert!(!state.is_generating);
    }

    #[test]
    fn round_keeps_writing_to_its_session_after_switching_chats() {
        let mut state = state_with_chat("a");
        state.apply(ChatAction::BeginRound("hi".to_string()), 2);
        state.apply(ChatAction::CreateChat { id: "b".to_string() }, 3);
        state.apply(ChatAction::AppendFragment("late".to_string()), 4);
        state.apply(ChatAction::FinishRound(RoundEnd::Completed), 5);

        assert!(state.messages.is_empty());
        let first = state.session("a").expect("session a");
        assert_eq!(
            contents(&first.messages),
            vec![(MessageRole::User, "hi"), (MessageRole::Assistant, "late")]
        );
    }

    #[test]
    fn round_preconditions_are_checked_in_order() {
        let mut state = ChatState::default();
        assert_eq!(state.check_round(false), Err(ChatError::NotConfigured));
        assert_eq!(state.check_round(true), Err(ChatError::NoModelSelected));
        state.apply(ChatAction::SetActiveModel("m1".to_string()), 1);
        assert_eq!(state.check_round(true), Err(ChatError::NoActiveChat));
        state.apply(ChatAction::CreateChat { id: "a".to_string() }, 1);
        assert_eq!(state.check_round(true), Ok("m1".to_string()));
        state.apply(ChatAction::BeginRound("x".to_string()), 2);
        assert_eq!(state.check_round(true), Err(ChatError::GenerationInProgress));
    }

    #[test]
    fn clear_current_empties_both_transcripts() {
        let mut state = state_with_chat("a");
        state.apply(ChatAction::BeginRound("hi".to_string()), 2);
        state.apply(ChatAction::FinishRound(RoundEnd::Completed), 3);
        assert!(state.apply(ChatAction::ClearCurrent, 4));
        assert!(state.messages.is_empty());
        assert!(state.chat_history[0].messages.is_empty());

        state.apply(ChatAction::DeleteChat { id: "a".to_string() }, 5);
        assert!(!state.apply(ChatAction::ClearCurrent, 6));
    }

    #[test]
    fn generated_titles_are_cleaned_and_blank_output_is_ignored() {
        assert_eq!(clean_generated_title(" \"Greeting 'Exchange'\"\n"), "Greeting Exchange");

        let mut state = state_with_chat("a");
        assert!(!state.apply(
            ChatAction::ApplyGeneratedTitle {
                id: "a".to_string(),
                raw: "\"\"".to_string()
            },
            2
        ));
        assert_eq!(state.chat_history[0].title, "New Chat");
    }

    #[test]
    fn title_prompt_lists_roles_and_content() {
        let mut chat = ChatSession::new("a", 1);
        chat.messages.push(ChatMessage::new(MessageRole::User, "Hello", 1));
        chat.messages
            .push(ChatMessage::new(MessageRole::Assistant, "Hi there", 2));
        assert_eq!(
            title_prompt(&chat),
            "Please provide a very brief title (maximum 4-5 words) for this conversation. \
Here's the chat history:\nuser: Hello\nassistant: Hi there"
        );
    }
}
