use std::fmt;

// -----------------------------------------------------------------------------------------------

/// 流水线各阶段未完成的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnfinishedReason {
    InvalidUri,
    VideoNotFound,
    VideoDownloadError,
    VideoFileWritingError,
    VideoToAudioConversionError,
    AudioDownloadError,
    AudioSplitError,
    Cancelled,
}

impl UnfinishedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnfinishedReason::InvalidUri => "InvalidUri",
            UnfinishedReason::VideoNotFound => "VideoNotFound",
            UnfinishedReason::VideoDownloadError => "VideoDownloadError",
            UnfinishedReason::VideoFileWritingError => "VideoFileWritingError",
            UnfinishedReason::VideoToAudioConversionError => "VideoToAudioConversionError",
            UnfinishedReason::AudioDownloadError => "AudioDownloadError",
            UnfinishedReason::AudioSplitError => "AudioSplitError",
            UnfinishedReason::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for UnfinishedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Error,
    Warning,
    Information,
    Custom(String), // 调用方自定义的类别
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Error => f.write_str("Error"),
            MessageKind::Warning => f.write_str("Warning"),
            MessageKind::Information => f.write_str("Information"),
            MessageKind::Custom(kind) => f.write_str(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub content: String,
}

impl Message {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, content)
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Warning, content)
    }

    pub fn information(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Information, content)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.content)
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State<T> {
    Finished(T),
    Unfinished(UnfinishedReason),
}

/// 每个阶段返回的统一结果信封
///
/// 完成状态由 [`State`] 表达，因此"未完成当且仅当存在未完成原因"在类型上成立。
/// 警告和提示信息不会影响完成状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<T> {
    state: State<T>,
    messages: Vec<Message>,
}

impl<T> Response<T> {
    pub fn finished(value: T) -> Self {
        Self {
            state: State::Finished(value),
            messages: Vec::new(),
        }
    }

    pub fn unfinished(reason: UnfinishedReason, messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            state: State::Unfinished(reason),
            messages: messages.into_iter().collect(),
        }
    }

    pub fn cancelled(messages: impl IntoIterator<Item = Message>) -> Self {
        Self::unfinished(UnfinishedReason::Cancelled, messages)
    }

    /// 所有消息都是 Error 类型的未完成结果
    pub fn from_errors<S: Into<String>>(
        reason: UnfinishedReason,
        errors: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::unfinished(reason, errors.into_iter().map(Message::error))
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished(_))
    }

    pub fn is_cancelled(&self) -> bool {
        self.unfinished_reason() == Some(UnfinishedReason::Cancelled)
    }

    pub fn unfinished_reason(&self) -> Option<UnfinishedReason> {
        match &self.state {
            State::Finished(_) => None,
            State::Unfinished(reason) => Some(*reason),
        }
    }

    pub fn state(&self) -> &State<T> {
        &self.state
    }

    pub fn value(&self) -> Option<&T> {
        match &self.state {
            State::Finished(value) => Some(value),
            State::Unfinished(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self.state {
            State::Finished(value) => Some(value),
            State::Unfinished(_) => None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.kind == MessageKind::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.messages.iter().any(|m| m.kind == MessageKind::Warning)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        let state = match self.state {
            State::Finished(value) => State::Finished(f(value)),
            State::Unfinished(reason) => State::Unfinished(reason),
        };
        Response {
            state,
            messages: self.messages,
        }
    }

    /// 在已有消息之前插入上游阶段的消息
    pub fn prepend_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages.splice(0..0, messages);
        self
    }

    /// 拆出完成的值和消息；未完成时返回可直接交给上游的结果（保留原因和消息）
    pub fn into_finished<U>(self) -> Result<(T, Vec<Message>), Response<U>> {
        match self.state {
            State::Finished(value) => Ok((value, self.messages)),
            State::Unfinished(reason) => Err(Response {
                state: State::Unfinished(reason),
                messages: self.messages,
            }),
        }
    }
}
