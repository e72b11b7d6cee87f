//! Handler return values to responses.
//!
//! Handlers return anything implementing [`IntoReply`]. The compiled route
//! turns the reply into a [`Response`] with [`normalize`], which is also
//! where collected background tasks are attached as the post-send callback.

use serde::Serialize;
use serde_json::Value;
use tessera_core::{Json, PostSend, Response};
use tessera_tasks::BackgroundTasks;
use tracing::debug;

/// What a handler produced.
#[derive(Debug)]
pub enum Reply {
    /// A fully formed response, passed through unchanged.
    Response(Response),
    /// A JSON value, wrapped as a 200 response.
    Value(Value),
}

/// Conversion from a handler's return value into a [`Reply`].
pub trait IntoReply {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns the serialization error for values that cannot be encoded.
    fn into_reply(self) -> Result<Reply, serde_json::Error>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, serde_json::Error> {
        Ok(self)
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Reply, serde_json::Error> {
        Ok(Reply::Response(self))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Reply, serde_json::Error> {
        Ok(Reply::Value(self))
    }
}

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Reply, serde_json::Error> {
        self.to_value().map(Reply::Value)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, serde_json::Error> {
        Ok(Reply::Value(Value::Null))
    }
}

/// Builds the response for a reply.
///
/// Non-empty `tasks` are drained and attached as a post-send callback,
/// after any callback the handler attached itself. Empty or absent tasks
/// attach nothing.
pub fn normalize(reply: Reply, tasks: Option<&BackgroundTasks>) -> Response {
    let mut response = match reply {
        Reply::Response(response) => response,
        Reply::Value(body) => Response::new(body),
    };

    let Some(tasks) = tasks.filter(|tasks| !tasks.is_empty()) else {
        return response;
    };

    let batch = tasks.take();
    let run_tasks = PostSend::new(move || async move {
        let report = batch.run_all().await;
        debug!(
            completed = report.completed,
            failed = report.failed,
            "background tasks finished"
        );
    });

    let post_send = match response.take_post_send() {
        Some(existing) => existing.then(run_tasks),
        None => run_tasks,
    };
    response.with_post_send(post_send)
}
