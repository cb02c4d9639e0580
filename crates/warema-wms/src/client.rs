// WebControl HTTP client
//
// Wraps `reqwest::Client` with command composition and session-state
// bookkeeping. One typed method per protocol opcode; the topology scan
// lives in `discovery.rs` to keep this module focused on transport
// mechanics. No retries here -- retry policy belongs to the shade
// controller.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use url::Url;

use crate::config::WmsConfig;
use crate::error::Error;
use crate::protocol::{self, Response};

/// Rolling per-session command sequencing state.
///
/// The device expects every command to carry a fresh `(counter, timestamp)`
/// pair: the counter wraps at 256, the timestamp is a seconds-since-epoch
/// seed bumped by one per command. Allocation is a single atomic step so
/// two commands can never share a sequence number.
#[derive(Debug)]
struct Session {
    counter: u8,
    timestamp: u64,
}

impl Session {
    fn new(seed: u64) -> Self {
        Self { counter: 0, timestamp: seed }
    }

    /// Take the current pair and advance both fields.
    fn allocate(&mut self) -> (u8, u64) {
        let pair = (self.counter, self.timestamp);
        self.counter = self.counter.wrapping_add(1);
        self.timestamp += 1;
        pair
    }
}

/// Raw client for the WebControl server's `protocol.xml` endpoint.
///
/// Owns the session counter/timestamp; commands must reach the device in
/// the order their sequence numbers were allocated. The pair allocation
/// itself is atomic, but callers sharing one client across tasks must
/// serialize whole commands (or give each controller its own client --
/// the device's tolerance of multiple concurrent sessions is unverified).
///
/// Set the log level to DEBUG for a trace of sent commands and responses.
#[derive(Debug)]
pub struct WmsClient {
    http: reqwest::Client,
    endpoint: Url,
    session: Mutex<Session>,
}

impl WmsClient {
    /// Create a client from a [`WmsConfig`]. Performs no I/O; the session
    /// timestamp is seeded from the wall clock.
    pub fn new(config: &WmsConfig) -> Result<Self, Error> {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Ok(Self {
            http: config.build_client()?,
            endpoint: config.target.join("protocol.xml")?,
            session: Mutex::new(Session::new(seed)),
        })
    }

    /// The resolved command endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn allocate(&self) -> (u8, u64) {
        let mut session = self.session.lock().expect("session lock poisoned");
        session.allocate()
    }

    /// Send one command and parse the XML response.
    ///
    /// `GET {target}/protocol.xml?protocol=90<counter><opcode><payload>&_=<ts>`
    ///
    /// A non-2xx status is [`Error::Status`]; a body that is not the
    /// expected XML document is [`Error::MalformedResponse`] -- both are
    /// transport-level failures, distinct from a protocol-level not-ready
    /// feedback.
    pub async fn send_command(&self, opcode: &str, payload: &str) -> Result<Response, Error> {
        let (counter, ts) = self.allocate();
        let cmd = protocol::compose(counter, opcode, payload);
        let ts = ts.to_string();
        debug!(protocol = %cmd, ts = %ts, "sending command");

        let resp = self
            .http
            .get(self.endpoint.clone())
            .query(&[("protocol", cmd.as_str()), ("_", ts.as_str())])
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status { status: status.as_u16() });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        debug!(%body, "received response");
        Response::from_xml(&body)
    }

    // ── Typed commands ───────────────────────────────────────────────

    /// Query the configured language.
    pub async fn send_lang(&self) -> Result<Response, Error> {
        self.send_command(protocol::RX_LANG, "").await
    }

    /// Query a room name. An empty `raumname` in the response means this
    /// room id and everything beyond it do not exist.
    pub async fn send_room_name(&self, room: u8) -> Result<Response, Error> {
        self.send_command(protocol::RX_ROOM_NAME, &protocol::room_payload(room))
            .await
    }

    /// Query channel info for a room. An empty `kanalname` terminates the
    /// room's channel list.
    pub async fn send_channel_info(&self, room: u8, channel: u8) -> Result<Response, Error> {
        self.send_command(
            protocol::RX_CHANNEL_INFO,
            &protocol::channel_payload(room, channel),
        )
        .await
    }

    /// Poll whether the device is ready for the next command on this
    /// room/channel.
    pub async fn send_check_ready(&self, room: u8, channel: u8) -> Result<Response, Error> {
        self.send_command(
            protocol::RX_CHECK_READY,
            &protocol::ready_payload(room, channel),
        )
        .await
    }

    /// Query shade position and movement state.
    pub async fn send_shade_state(&self, room: u8, channel: u8) -> Result<Response, Error> {
        self.send_command(
            protocol::RX_SHADE_STATE,
            &protocol::state_payload(room, channel),
        )
        .await
    }

    /// Command a shade to move. `half_units` is the device-scale target
    /// position (user position times two).
    pub async fn send_move_shade(
        &self,
        room: u8,
        channel: u8,
        half_units: u8,
    ) -> Result<Response, Error> {
        self.send_command(
            protocol::TX_MOVE_SHADE,
            &protocol::move_payload(room, channel, half_units),
        )
        .await
    }
}
