//! Per-stream request handling.
//!
//! A [`Connection`] owns exactly one [`Session`] and answers requests in
//! the order they arrive: one response per request, errors included.
//! [`Connection::serve`] drives a connection from a pair of crossbeam
//! channels until the request side closes. [`ClientStream`] is the
//! client end of a connection running on its own thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use envlink_core::{ProtocolError, Request, Response, SessionId, SessionState};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::server::ServerShared;
use crate::session::Session;

/// One client stream's server side.
pub struct Connection {
    // Declared first so the session leaves its world before the shared
    // server state is released.
    session: Session,
    shared: Arc<ServerShared>,
}

impl Connection {
    pub(crate) fn new(shared: Arc<ServerShared>) -> Self {
        Self {
            session: Session::new(),
            shared,
        }
    }

    /// Id of the session this connection owns.
    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// The owned session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Answer one request.
    pub fn handle(&mut self, request: Request) -> Response {
        let kind = request.kind();
        let result = self.dispatch(request);
        if let Err(e) = &result {
            debug!(session = %self.session.id(), %kind, error = %e, "request failed");
        }
        Response::from(result)
    }

    fn dispatch(&mut self, request: Request) -> Result<Response, ProtocolError> {
        let shared = Arc::clone(&self.shared);
        let session = &mut self.session;
        Ok(match request {
            Request::CreateWorld { settings } => Response::CreateWorld {
                world_name: shared.registry.create_world(&settings)?,
            },
            Request::JoinWorld {
                world_name,
                settings,
            } => Response::JoinWorld {
                specs: session.join(&shared.registry, &world_name, settings)?,
            },
            Request::Step {
                actions,
                requested_observations,
            } => {
                let (state, observations) = session.step(&actions, &requested_observations)?;
                Response::Step { state, observations }
            }
            Request::Reset { settings } => Response::Reset {
                specs: session.reset(settings)?,
            },
            Request::ResetWorld {
                world_name,
                settings,
            } => {
                session.reset_world(&shared.registry, &world_name, settings)?;
                Response::ResetWorld
            }
            Request::LeaveWorld => {
                session.leave();
                Response::LeaveWorld
            }
            Request::DestroyWorld { world_name } => {
                session.destroy_world(&shared.registry, &world_name)?;
                Response::DestroyWorld
            }
            Request::ReadProperty { keys } => Response::ReadProperty {
                values: session.read_property(keys)?,
            },
            Request::WriteProperty { values } => {
                session.write_property(values)?;
                Response::WriteProperty
            }
            Request::ListProperty { keys } => Response::ListProperty {
                nodes: session.list_property(keys)?,
            },
            Request::Extension { tag, payload } => {
                let payload = session.extension(&shared.extensions, &tag, payload)?;
                Response::Extension { tag, payload }
            }
        })
    }

    /// Serve requests until `requests` closes. Returns the number of
    /// requests answered.
    ///
    /// The session leaves its world when the stream ends either way.
    ///
    /// # Errors
    ///
    /// [`TransportError::ResponseSinkClosed`] if `responses` disconnects.
    pub fn serve(
        &mut self,
        requests: &Receiver<Request>,
        responses: &Sender<Response>,
    ) -> Result<u64, TransportError> {
        let mut served = 0u64;
        while let Ok(request) = requests.recv() {
            let response = self.handle(request);
            if responses.send(response).is_err() {
                warn!(session = %self.session.id(), served, "response sink closed; dropping stream");
                self.session.leave();
                return Err(TransportError::ResponseSinkClosed);
            }
            served += 1;
        }
        debug!(session = %self.session.id(), served, "request stream closed");
        self.session.leave();
        Ok(served)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ── ClientStream ───────────────────────────────────────────────────

/// Client end of a connection served on its own thread.
///
/// Responses arrive in request order. Dropping the stream closes the
/// request side, which ends the connection and leaves its world.
pub struct ClientStream {
    requests: Option<Sender<Request>>,
    responses: Receiver<Response>,
    session: SessionId,
    thread: Option<JoinHandle<Result<u64, TransportError>>>,
}

impl ClientStream {
    pub(crate) fn new(
        requests: Sender<Request>,
        responses: Receiver<Response>,
        session: SessionId,
        thread: JoinHandle<Result<u64, TransportError>>,
    ) -> Self {
        Self {
            requests: Some(requests),
            responses,
            session,
            thread: Some(thread),
        }
    }

    /// Id of the server-side session.
    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Queue a request without waiting for its response.
    pub fn send(&self, request: Request) -> Result<(), TransportError> {
        self.requests
            .as_ref()
            .ok_or(TransportError::RequestStreamClosed)?
            .send(request)
            .map_err(|_| TransportError::RequestStreamClosed)
    }

    /// Wait for the next response.
    pub fn recv(&self) -> Result<Response, TransportError> {
        self.responses
            .recv()
            .map_err(|_| TransportError::RequestStreamClosed)
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Response, TransportError> {
        self.responses.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => TransportError::Timeout,
            RecvTimeoutError::Disconnected => TransportError::RequestStreamClosed,
        })
    }

    /// Send a request and wait for its response.
    pub fn request(&self, request: Request) -> Result<Response, TransportError> {
        self.send(request)?;
        self.recv()
    }

    /// Close the request side and wait for the connection thread.
    /// Returns the number of requests the connection answered.
    pub fn close(mut self) -> Result<u64, TransportError> {
        self.requests.take();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| TransportError::Panicked)?,
            None => Ok(0),
        }
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        self.requests.take();
    }
}

impl std::fmt::Debug for ClientStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStream")
            .field("session", &self.session)
            .field("open", &self.requests.is_some())
            .finish()
    }
}
