//! Dispatch helper: records a [`Message`] around every outbound send.
//!
//! The dispatcher is the only component that creates or updates messages. It
//! talks to persistence through [`MessageStore`] and, when one is injected, to
//! an external [`TaskQueue`] for deferred sends.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::backend::{Backend, BackendError, ProviderResponse};
use crate::domain::{Message, MessageStatus, MessageText, NewMessage, RawPhoneNumber, SendOptions};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Extra JSON fields merged into a dispatched request body.
pub type DispatchOptions = Map<String, Value>;

/// Error produced by a [`TaskQueue`] implementation.
pub type QueueFailure = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("message {id} not found")]
    NotFound { id: u64 },

    #[error("no message for task {task_id}")]
    UnknownTask { task_id: Uuid },

    /// Failure inside a persistent store implementation.
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn StdError + Send + Sync>),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("message store error: {0}")]
    Store(#[from] StoreError),

    #[error("no task queue is configured")]
    NoTaskQueue,

    #[error("task queue error: {0}")]
    Queue(#[source] QueueFailure),
}

/// Persistence collaborator for [`Message`] records.
pub trait MessageStore: Send + Sync {
    /// Persist a new `pending` message and return it with its id and timestamps.
    fn create(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Move a message to `status`, refreshing `updated_at`.
    fn set_status(&self, id: u64, status: MessageStatus) -> Result<Message, StoreError>;

    fn get(&self, id: u64) -> Result<Option<Message>, StoreError>;

    fn find_by_task(&self, task_id: Uuid) -> Result<Option<Message>, StoreError>;
}

/// Process-local [`MessageStore`], suitable for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    state: Mutex<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    next_id: u64,
    messages: BTreeMap<u64, Message>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored message, in id order.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessageStore for InMemoryMessageStore {
    fn create(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut state = self.lock();
        state.next_id += 1;
        let now = Utc::now();
        let message = Message {
            id: state.next_id,
            backend: message.backend,
            task_id: message.task_id,
            status: MessageStatus::Pending,
            text: message.text,
            created_at: now,
            updated_at: now,
        };
        state.messages.insert(message.id, message.clone());
        Ok(message)
    }

    fn set_status(&self, id: u64, status: MessageStatus) -> Result<Message, StoreError> {
        let mut state = self.lock();
        let message = state
            .messages
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        message.status = status;
        message.updated_at = Utc::now();
        Ok(message.clone())
    }

    fn get(&self, id: u64) -> Result<Option<Message>, StoreError> {
        Ok(self.lock().messages.get(&id).cloned())
    }

    fn find_by_task(&self, task_id: Uuid) -> Result<Option<Message>, StoreError> {
        Ok(self
            .lock()
            .messages
            .values()
            .find(|message| message.task_id == Some(task_id))
            .cloned())
    }
}

/// A send handed to the task queue instead of being executed inline.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredSend {
    pub task_id: Uuid,
    pub message_id: u64,
    pub request: HttpRequest,
}

/// External task-queue collaborator. The queue runs `request` later and reports
/// back through [`Dispatcher::complete_task`].
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, job: DeferredSend) -> Result<(), QueueFailure>;
}

/// A message together with the provider's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub message: Message,
    pub response: ProviderResponse,
}

#[derive(Clone)]
pub struct Dispatcher {
    http: Arc<dyn HttpTransport>,
    store: Arc<dyn MessageStore>,
    queue: Option<Arc<dyn TaskQueue>>,
}

impl Dispatcher {
    pub fn new(http: Arc<dyn HttpTransport>, store: Arc<dyn MessageStore>) -> Self {
        Self {
            http,
            store,
            queue: None,
        }
    }

    /// Dispatcher over a default `reqwest` client.
    pub fn with_store(store: Arc<dyn MessageStore>) -> Self {
        Self::new(Arc::new(ReqwestTransport::default()), store)
    }

    /// Enable deferred sends through `queue`.
    pub fn with_task_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Whether [`Dispatcher::defer`] can be used.
    pub fn has_task_queue(&self) -> bool {
        self.queue.is_some()
    }

    /// POST `{text, to, ..options}` to `url` and record the outcome.
    ///
    /// A 2xx answer marks the message `success`, any other status `failed`.
    /// Transport failures mark it `failed` and are returned.
    pub async fn dispatch(
        &self,
        backend: &str,
        text: &MessageText,
        to: &RawPhoneNumber,
        url: &str,
        options: &DispatchOptions,
    ) -> Result<Message, DispatchError> {
        let message = self.store.create(NewMessage {
            backend: backend.to_owned(),
            task_id: None,
            text: text.as_str().to_owned(),
        })?;
        let request = HttpRequest::post_json(url, request_body(text, to, options));

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                Ok(self.finish(message.id, MessageStatus::Success)?)
            }
            Ok(response) => {
                log::debug!("message {}: HTTP {}", message.id, response.status);
                Ok(self.finish(message.id, MessageStatus::Failed)?)
            }
            Err(err) => {
                self.finish(message.id, MessageStatus::Failed)?;
                Err(BackendError::Transport(err).into())
            }
        }
    }

    /// Run [`Backend::send`] and record the outcome under the backend's identifier.
    pub async fn send_via(
        &self,
        backend: &dyn Backend,
        text: &MessageText,
        to: &RawPhoneNumber,
        options: &SendOptions,
    ) -> Result<Sent, DispatchError> {
        let message = self.store.create(NewMessage {
            backend: backend.identifier().to_owned(),
            task_id: None,
            text: text.as_str().to_owned(),
        })?;

        match backend.send(text, to, options).await {
            Ok(response) => Ok(Sent {
                message: self.finish(message.id, MessageStatus::Success)?,
                response,
            }),
            Err(err) => {
                self.finish(message.id, MessageStatus::Failed)?;
                Err(err.into())
            }
        }
    }

    /// Hand the send to the task queue; the returned message stays `pending`
    /// until [`Dispatcher::complete_task`] is called for its task id.
    pub fn defer(
        &self,
        backend: &str,
        text: &MessageText,
        to: &RawPhoneNumber,
        url: &str,
        options: &DispatchOptions,
    ) -> Result<Message, DispatchError> {
        let queue = self.queue.as_ref().ok_or(DispatchError::NoTaskQueue)?;
        let task_id = Uuid::new_v4();
        let message = self.store.create(NewMessage {
            backend: backend.to_owned(),
            task_id: Some(task_id),
            text: text.as_str().to_owned(),
        })?;

        let job = DeferredSend {
            task_id,
            message_id: message.id,
            request: HttpRequest::post_json(url, request_body(text, to, options)),
        };
        if let Err(err) = queue.enqueue(job) {
            self.finish(message.id, MessageStatus::Failed)?;
            return Err(DispatchError::Queue(err));
        }

        log::debug!("message {} deferred as task {task_id}", message.id);
        Ok(message)
    }

    /// Record the result a background task reported.
    pub fn complete_task(&self, task_id: Uuid, succeeded: bool) -> Result<Message, DispatchError> {
        let message = self
            .store
            .find_by_task(task_id)?
            .ok_or(StoreError::UnknownTask { task_id })?;
        let status = if succeeded {
            MessageStatus::Success
        } else {
            MessageStatus::Failed
        };
        Ok(self.finish(message.id, status)?)
    }

    fn finish(&self, id: u64, status: MessageStatus) -> Result<Message, StoreError> {
        let message = self.store.set_status(id, status)?;
        match status {
            MessageStatus::Failed => log::warn!("message {id} via {} failed", message.backend),
            _ => log::info!("message {id} via {} is {status}", message.backend),
        }
        Ok(message)
    }
}

fn request_body(text: &MessageText, to: &RawPhoneNumber, options: &DispatchOptions) -> Value {
    let mut body = options.clone();
    body.insert("text".to_owned(), Value::String(text.as_str().to_owned()));
    body.insert("to".to_owned(), Value::String(to.raw().to_owned()));
    Value::Object(body)
}
