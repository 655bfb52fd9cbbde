//! The session state machine and perceive-act loop.
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Active -> Closed(Normal|Error)
//! ```
//!
//! There is no reconnection: once closed, a session stays closed.

use std::sync::Arc;

use chrono::Utc;
use herding_types::{Action, Perception, SimEnd, SimStart};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::codec::{Element, read_frame, write_frame};
use crate::error::SessionError;
use crate::protocol::{Inbound, action_reply, auth_request, check_auth_response, decode_inbound};
use crate::sink::{Direction, TrafficRecord, TrafficSink};

type FrameReader = Box<dyn AsyncBufRead + Send + Unpin>;
type FrameWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The simulator closed the channel.
    Normal,
    /// A fatal connection or authentication failure.
    Error,
}

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No channel yet.
    Disconnected,
    /// Channel open, handshake not started.
    Connecting,
    /// Authentication request sent, waiting for the response.
    Authenticating,
    /// Authenticated; the perceive-act loop may run.
    Active,
    /// Ended; terminal.
    Closed(CloseReason),
}

/// Callbacks invoked by [`Session::run_loop`].
pub trait SessionHandler: Send {
    /// The simulator accepted the credentials.
    fn on_authenticated(&mut self) {}

    /// A match begins. `timestamp` is the simulator clock in milliseconds.
    fn on_sim_start(&mut self, start: &SimStart, timestamp: i64);

    /// Decide this cycle's action. Called exactly once per request-action
    /// envelope; the returned action is the reply, due by `deadline`
    /// (simulator clock, milliseconds).
    fn on_request_action(
        &mut self,
        perception: &Perception,
        timestamp: i64,
        deadline: i64,
    ) -> Action;

    /// A match ended.
    fn on_sim_end(&mut self, end: &SimEnd, timestamp: i64);
}

/// One authenticated duplex channel to the simulator.
pub struct Session {
    agent: String,
    state: SessionState,
    reader: Option<FrameReader>,
    writer: Option<FrameWriter>,
    sink: Arc<dyn TrafficSink>,
    replies: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("agent", &self.agent)
            .field("state", &self.state)
            .field("replies", &self.replies)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a disconnected session for `agent`.
    pub fn new(agent: impl Into<String>, sink: Arc<dyn TrafficSink>) -> Self {
        Self {
            agent: agent.into(),
            state: SessionState::Disconnected,
            reader: None,
            writer: None,
            sink,
            replies: 0,
        }
    }

    /// Agent name this session speaks for.
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Number of action replies written so far.
    pub const fn replies_sent(&self) -> u64 {
        self.replies
    }

    /// Open a TCP channel to the simulator.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connection`] on any I/O failure, which closes
    /// the session, or [`SessionError::InvalidState`] if already connected.
    pub async fn connect(&mut self, addr: &str) -> Result<(), SessionError> {
        self.expect_state(SessionState::Disconnected)?;
        self.state = SessionState::Connecting;
        info!(agent = %self.agent, addr, "connecting to simulator");
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(agent = %self.agent, error = %e, "could not disable nagle");
                }
                self.install(stream);
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed(CloseReason::Error);
                Err(SessionError::Connection(format!("connect to {addr} failed: {e}")))
            }
        }
    }

    /// Use an already-open duplex stream as the channel.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] if already connected.
    pub fn attach<S>(&mut self, stream: S) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.expect_state(SessionState::Disconnected)?;
        self.install(stream);
        Ok(())
    }

    fn install<S>(&mut self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        self.reader = Some(Box::new(BufReader::new(read)));
        self.writer = Some(Box::new(write));
        self.state = SessionState::Connecting;
    }

    /// Send one authentication request and wait for exactly one response.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Auth`] if the response is absent, malformed,
    /// or negative, [`SessionError::Connection`] on I/O failure. Both close
    /// the session.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        self.expect_state(SessionState::Connecting)?;
        self.state = SessionState::Authenticating;

        let request = auth_request(username, password);
        let response = match self.send(&request).await {
            Ok(()) => self.receive().await,
            Err(e) => Err(e),
        };
        let outcome = match response {
            Ok(Some(frame)) => check_auth_response(&frame),
            Ok(None) => Err(SessionError::Auth(
                "channel closed before the authentication response".to_owned(),
            )),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.state = SessionState::Active;
                info!(agent = %self.agent, "authenticated");
                Ok(())
            }
            Err(e) => {
                self.close(CloseReason::Error);
                Err(e)
            }
        }
    }

    /// Run the perceive-act loop until the simulator closes the channel.
    ///
    /// Malformed envelopes are logged and skipped. Every request-action
    /// envelope is answered with exactly one reply; simulation start and end
    /// envelopes are never answered.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connection`] on I/O failure, which closes the
    /// session, or [`SessionError::InvalidState`] if not authenticated.
    pub async fn run_loop<H>(&mut self, handler: &mut H) -> Result<(), SessionError>
    where
        H: SessionHandler + ?Sized,
    {
        self.expect_state(SessionState::Active)?;
        handler.on_authenticated();

        loop {
            let frame = match self.receive().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!(agent = %self.agent, replies = self.replies, "simulator closed the channel");
                    self.close(CloseReason::Normal);
                    return Ok(());
                }
                Err(e) => {
                    self.close(CloseReason::Error);
                    return Err(e);
                }
            };

            let inbound = match decode_inbound(&frame) {
                Ok(Some(inbound)) => inbound,
                Ok(None) => {
                    debug!(agent = %self.agent, "ignoring envelope of unhandled type");
                    continue;
                }
                Err(e) => {
                    warn!(agent = %self.agent, error = %e, "skipping malformed envelope");
                    continue;
                }
            };

            if let Err(e) = self.dispatch(inbound, handler).await {
                self.close(CloseReason::Error);
                return Err(e);
            }
        }
    }

    async fn dispatch<H>(&mut self, inbound: Inbound, handler: &mut H) -> Result<(), SessionError>
    where
        H: SessionHandler + ?Sized,
    {
        match inbound {
            Inbound::SimStart { start, timestamp } => {
                info!(
                    agent = %self.agent,
                    timestamp,
                    width = start.grid_width,
                    height = start.grid_height,
                    "simulation started"
                );
                handler.on_sim_start(&start, timestamp);
            }
            Inbound::SimEnd { end, timestamp } => {
                info!(agent = %self.agent, timestamp, result = ?end.attributes, "simulation ended");
                handler.on_sim_end(&end, timestamp);
            }
            Inbound::RequestAction {
                perception,
                timestamp,
                deadline,
            } => {
                debug!(
                    agent = %self.agent,
                    step = perception.step,
                    timestamp,
                    deadline,
                    "action requested"
                );
                let action = handler.on_request_action(&perception, timestamp, deadline);
                self.send(&action_reply(&perception.id, action)).await?;
                self.replies = self.replies.saturating_add(1);

                let now = Utc::now().timestamp_millis();
                if now > deadline {
                    warn!(
                        agent = %self.agent,
                        step = perception.step,
                        late_by_ms = now.saturating_sub(deadline),
                        "reply sent after the deadline"
                    );
                }
            }
        }
        Ok(())
    }

    async fn send(&mut self, element: &Element) -> Result<(), SessionError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(SessionError::InvalidState(self.state));
        };
        let document = element.to_document();
        write_frame(writer, document.as_bytes()).await?;
        self.sink
            .record(TrafficRecord::now(&self.agent, Direction::Outbound, document.as_bytes()));
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(SessionError::InvalidState(self.state));
        };
        let frame = read_frame(reader).await?;
        if let Some(bytes) = &frame {
            self.sink
                .record(TrafficRecord::now(&self.agent, Direction::Inbound, bytes));
        }
        Ok(frame)
    }

    fn close(&mut self, reason: CloseReason) {
        self.reader = None;
        self.writer = None;
        self.state = SessionState::Closed(reason);
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState(self.state))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use tokio::io::{AsyncWriteExt, BufReader as TokioBufReader, DuplexStream, ReadHalf, WriteHalf};

    use super::*;
    use crate::codec::FRAME_TERMINATOR;
    use crate::sink::{ChannelSink, TracingSink};

    const AUTH_OK: &str = r#"<message type="auth-response"><authentication result="ok"/></message>"#;
    const AUTH_FAIL: &str = r#"<message type="auth-response"><authentication result="fail"/></message>"#;
    const SIM_START: &str = r#"<message type="sim-start" timestamp="1"><simulation gsizex="30" gsizey="30" lineOfSight="8"/></message>"#;
    const SIM_END: &str = r#"<message type="sim-end" timestamp="9"><sim-result result="win"/></message>"#;

    fn request(id: &str, step: u64) -> String {
        let deadline = step + 100;
        format!(
            r#"<message type="request-action" timestamp="{step}"><perception id="{id}" deadline="{deadline}" posx="3" posy="4" step="{step}"><cell x="0" y="0"><empty/></cell></perception></message>"#
        )
    }

    /// The simulator's end of the duplex pipe.
    struct Simulator {
        reader: TokioBufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Simulator {
        async fn send(&mut self, doc: &str) {
            self.writer.write_all(doc.as_bytes()).await.unwrap();
            self.writer.write_all(&[FRAME_TERMINATOR]).await.unwrap();
        }

        async fn recv(&mut self) -> Option<Element> {
            let frame = read_frame(&mut self.reader).await.unwrap()?;
            Some(Element::parse(std::str::from_utf8(&frame).unwrap()).unwrap())
        }
    }

    fn pair(sink: Arc<dyn TrafficSink>) -> (Session, Simulator) {
        let (agent_end, sim_end) = tokio::io::duplex(4096);
        let mut session = Session::new("b1", sink);
        session.attach(agent_end).unwrap();
        let (read, write) = tokio::io::split(sim_end);
        (
            session,
            Simulator {
                reader: TokioBufReader::new(read),
                writer: write,
            },
        )
    }

    #[derive(Default)]
    struct Recorder {
        starts: usize,
        ends: usize,
        steps: Vec<u64>,
        clocks: Vec<(i64, i64)>,
    }

    impl SessionHandler for Recorder {
        fn on_sim_start(&mut self, _start: &SimStart, timestamp: i64) {
            assert_eq!(timestamp, 1);
            self.starts += 1;
        }

        fn on_request_action(
            &mut self,
            perception: &Perception,
            timestamp: i64,
            deadline: i64,
        ) -> Action {
            self.steps.push(perception.step);
            self.clocks.push((timestamp, deadline));
            Action::East
        }

        fn on_sim_end(&mut self, _end: &SimEnd, timestamp: i64) {
            assert_eq!(timestamp, 9);
            self.ends += 1;
        }
    }

    #[tokio::test]
    async fn authenticates_with_ok_response() {
        let (mut session, mut sim) = pair(Arc::new(TracingSink));
        let simulator = tokio::spawn(async move {
            let request = sim.recv().await.unwrap();
            sim.send(AUTH_OK).await;
            request
        });
        session.authenticate("b1", "secret").await.unwrap();
        assert_eq!(session.state(), SessionState::Active);

        let request = simulator.await.unwrap();
        assert_eq!(request.attr("type"), Some("auth-request"));
        let auth = request.children_named("authentication").next().unwrap();
        assert_eq!(auth.attr("username"), Some("b1"));
        assert_eq!(auth.attr("password"), Some("secret"));
    }

    #[tokio::test]
    async fn negative_response_is_fatal() {
        let (mut session, mut sim) = pair(Arc::new(TracingSink));
        tokio::spawn(async move {
            sim.recv().await;
            sim.send(AUTH_FAIL).await;
        });
        let err = session.authenticate("b1", "wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::Auth(_)));
        assert_eq!(session.state(), SessionState::Closed(CloseReason::Error));
    }

    #[tokio::test]
    async fn absent_response_is_fatal() {
        let (mut session, mut sim) = pair(Arc::new(TracingSink));
        tokio::spawn(async move {
            sim.recv().await;
            drop(sim);
        });
        let err = session.authenticate("b1", "secret").await.unwrap_err();
        assert!(matches!(err, SessionError::Auth(_)));
        assert_eq!(session.state(), SessionState::Closed(CloseReason::Error));
    }

    #[tokio::test]
    async fn loop_requires_authentication() {
        let (mut session, _sim) = pair(Arc::new(TracingSink));
        let err = session.run_loop(&mut Recorder::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidState(SessionState::Connecting)));
    }

    #[tokio::test]
    async fn one_reply_per_request_none_for_start_or_end() {
        let (sink, mut traffic) = ChannelSink::new(64);
        let (mut session, mut sim) = pair(Arc::new(sink));

        let simulator = tokio::spawn(async move {
            sim.recv().await.unwrap();
            sim.send(AUTH_OK).await;
            sim.send(SIM_START).await;
            sim.send(&request("p1", 1)).await;
            sim.send("<message type=\"request-action\"><perception").await;
            sim.send(&request("p2", 2)).await;
            sim.send(r#"<message type="bye"/>"#).await;
            sim.send(SIM_END).await;
            sim.writer.shutdown().await.unwrap();

            let mut replies = Vec::new();
            while let Some(reply) = sim.recv().await {
                replies.push(reply);
            }
            replies
        });

        let mut handler = Recorder::default();
        session.authenticate("b1", "secret").await.unwrap();
        session.run_loop(&mut handler).await.unwrap();
        assert_eq!(session.state(), SessionState::Closed(CloseReason::Normal));
        drop(session);

        let replies = simulator.await.unwrap();
        let ids: Vec<_> = replies
            .iter()
            .map(|r| {
                let action = r.children_named("action").next().unwrap();
                (action.attr("id").unwrap().to_owned(), action.attr("type").unwrap().to_owned())
            })
            .collect();
        assert_eq!(
            ids,
            vec![
                ("p1".to_owned(), "east".to_owned()),
                ("p2".to_owned(), "east".to_owned()),
            ]
        );
        assert_eq!(handler.starts, 1);
        assert_eq!(handler.ends, 1);
        assert_eq!(handler.steps, vec![1, 2]);
        assert_eq!(handler.clocks, vec![(1, 101), (2, 102)]);

        let mut outbound = 0;
        let mut inbound = 0;
        while let Ok(record) = traffic.try_recv() {
            match record.direction {
                Direction::Outbound => outbound += 1,
                Direction::Inbound => inbound += 1,
            }
        }
        assert_eq!(outbound, 3);
        assert_eq!(inbound, 7);
    }

    #[tokio::test]
    async fn attach_twice_is_rejected() {
        let (mut session, _sim) = pair(Arc::new(TracingSink));
        let (other, _keep) = tokio::io::duplex(64);
        assert!(matches!(session.attach(other), Err(SessionError::InvalidState(_))));
    }

    #[tokio::test]
    async fn refused_connection_closes_session() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut session = Session::new("b1", Arc::new(TracingSink));
        let err = session.connect(&addr).await.unwrap_err();
        assert!(matches!(err, SessionError::Connection(_)));
        assert_eq!(session.state(), SessionState::Closed(CloseReason::Error));
    }
}
