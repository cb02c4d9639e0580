// WebControl wire protocol codec
//
// Pure encode/decode for the hex command strings and XML response
// documents the WMS WebControl server speaks. No I/O and no retries
// here -- the client owns the request cycle, the shade controller owns
// retry policy.

use serde::Deserialize;

use crate::error::Error;

/// Every command starts with this prefix, followed by the 2-hex-digit
/// session counter, the opcode, and an operation-specific payload.
pub const CMD_PREFIX: &str = "90";

/// Query the configured language.
pub const RX_LANG: &str = "023dff";
/// Query a room name by room id.
pub const RX_ROOM_NAME: &str = "0203";
/// Query channel info (name) by room and channel id.
pub const RX_CHANNEL_INFO: &str = "0347";
/// Poll whether the device is ready to accept the next command.
pub const RX_CHECK_READY: &str = "0323";
/// Query shade position and movement state.
pub const RX_SHADE_STATE: &str = "0431";
/// Move a shade to a new position.
pub const TX_MOVE_SHADE: &str = "0821";

/// Format a byte as 2 lowercase hex digits, the protocol's field width
/// for counters, room/channel ids, and positions.
pub fn hex2(v: u8) -> String {
    format!("{v:02x}")
}

/// Compose a full command string: `90` + counter + opcode + payload.
pub fn compose(counter: u8, opcode: &str, payload: &str) -> String {
    format!("{CMD_PREFIX}{}{opcode}{payload}", hex2(counter))
}

/// Payload for a room-name query.
pub fn room_payload(room: u8) -> String {
    hex2(room)
}

/// Payload for a channel-info query.
pub fn channel_payload(room: u8, channel: u8) -> String {
    format!("{}{}", hex2(room), hex2(channel))
}

/// Payload for a readiness check.
pub fn ready_payload(room: u8, channel: u8) -> String {
    format!("{}{}", hex2(room), hex2(channel))
}

/// Payload for a shade-state query. The trailing `01` selects the
/// state-bearing variant; the `00` variant is the post-move confirmation
/// the vendor app sends, whose feedback is always null.
pub fn state_payload(room: u8, channel: u8) -> String {
    format!("{}{}01", hex2(room), hex2(channel))
}

/// Payload for a move command. `half_units` is the device-scale target
/// (0-200, twice the user-facing 0-100 position).
pub fn move_payload(room: u8, channel: u8, half_units: u8) -> String {
    format!("{}{}03{}ffffff", hex2(room), hex2(channel), hex2(half_units))
}

// ── Response decoding ───────────────────────────────────────────────

/// Parsed XML response from the WebControl server.
///
/// Every field is optional on the wire; which ones are present depends on
/// the command sent. Use the typed accessors instead of reading fields
/// directly -- they make "absent", "empty", and "malformed" distinct
/// outcomes rather than collapsing them into one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    fahrt: Option<String>,
    #[serde(default)]
    raumname: Option<String>,
    #[serde(default)]
    kanalname: Option<String>,
}

/// Command acknowledgement decoded from the `feedback` field.
///
/// The device's feedback is an unreliable synchronous ack: many commands
/// answer without the field at all. Callers treat `Absent` the same as
/// `Acknowledged`; only an explicit non-"1" value means not-ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// `feedback == "1"`.
    Acknowledged,
    /// `feedback` present with any other value.
    NotReady,
    /// No `feedback` field in the response.
    Absent,
}

impl Feedback {
    /// Whether the response counts as accepted.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Acknowledged | Self::Absent)
    }
}

/// Shade state as carried on the wire: position in half-units (0-200)
/// and the raw movement flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawShadeState {
    pub position: u16,
    pub moving: bool,
}

impl Response {
    /// Parse a response body. A non-XML body (the device serves an HTML
    /// error page when flooded) is reported as [`Error::MalformedResponse`].
    pub fn from_xml(body: &str) -> Result<Self, Error> {
        quick_xml::de::from_str(body).map_err(|e| Error::MalformedResponse {
            message: e.to_string(),
            body: body.to_owned(),
        })
    }

    /// Decode the command acknowledgement.
    pub fn feedback(&self) -> Feedback {
        match self.feedback.as_deref() {
            None => Feedback::Absent,
            Some("1") => Feedback::Acknowledged,
            Some(_) => Feedback::NotReady,
        }
    }

    /// Decode position and movement flag from a shade-state response.
    ///
    /// The movement flag is false iff `fahrt` is the string `"0"` -- the
    /// device sends text, and any non-zero text means the shade is moving.
    pub fn shade_state(&self) -> Result<RawShadeState, Error> {
        let position = self
            .position
            .as_deref()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .ok_or(Error::MissingField("position"))?;
        let fahrt = self.fahrt.as_deref().ok_or(Error::MissingField("fahrt"))?;
        Ok(RawShadeState {
            position,
            moving: fahrt.trim() != "0",
        })
    }

    /// Room name from a discovery response. `None` when the field is
    /// absent or empty -- the device's way of signaling that this room id
    /// and everything beyond it do not exist.
    pub fn room_name(&self) -> Option<&str> {
        self.raumname.as_deref().filter(|n| !n.is_empty())
    }

    /// Channel name from a discovery response. `None` terminates the
    /// channel scan for the current room.
    pub fn channel_name(&self) -> Option<&str> {
        self.kanalname.as_deref().filter(|n| !n.is_empty())
    }
}
