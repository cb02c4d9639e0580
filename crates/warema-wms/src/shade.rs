// Shade controller
//
// The retry-and-poll state machine that compensates for the device's
// inconsistent readiness signaling: readiness check with bounded retry,
// mandatory inter-command spacing, then the actual command, and for moves
// a convergence poll until the shade reports movement or the target
// position. All waits are bounded by `num_retries` and
// `time_between_cmds`; nothing here recurses or blocks forever.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::client::WmsClient;
use crate::error::Error;
use crate::model::{Channel, Room, ShadeState};

/// Retry and spacing knobs for the controller.
///
/// Commands sent too quickly after one another make the WebControl server
/// answer with an error page, so every command is preceded by a
/// `time_between_cmds` pause once the readiness phase is done.
#[derive(Debug, Clone, Copy)]
pub struct ShadeTuning {
    /// Pause between consecutive commands and between retry attempts.
    pub time_between_cmds: Duration,
    /// Attempt budget, applied per phase: readiness checks, convergence
    /// polls, and outer move retries each get this many attempts.
    pub num_retries: u32,
}

impl Default for ShadeTuning {
    fn default() -> Self {
        Self {
            time_between_cmds: Duration::from_millis(100),
            num_retries: 3,
        }
    }
}

/// One motorized shade, addressed by its room and channel.
///
/// Holds the last observed state; `position` and `is_moving` are only as
/// fresh as `last_updated`, and stale values persist until the next
/// successful update -- a failed read never resets them. The client is
/// injected by the caller; see [`WmsClient`] for the sharing rules.
#[derive(Debug)]
pub struct Shade {
    client: Arc<WmsClient>,
    room: Room,
    channel: Channel,
    tuning: ShadeTuning,
    position: u8,
    is_moving: bool,
    last_updated: Option<DateTime<Utc>>,
}

impl Shade {
    pub fn new(client: Arc<WmsClient>, room: Room, channel: Channel, tuning: ShadeTuning) -> Self {
        Self {
            client,
            room,
            channel,
            tuning,
            position: 0,
            is_moving: false,
            last_updated: None,
        }
    }

    /// Discover the device topology and build one controller per channel.
    pub async fn discover_all(
        client: Arc<WmsClient>,
        tuning: ShadeTuning,
    ) -> Result<Vec<Self>, Error> {
        let rooms = client.discover().await?;
        let mut shades = Vec::new();
        for room in rooms {
            for channel in room.channels() {
                shades.push(Self::new(
                    Arc::clone(&client),
                    room.clone(),
                    channel.clone(),
                    tuning,
                ));
            }
        }
        Ok(shades)
    }

    pub fn room_name(&self) -> &str {
        self.room.name()
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    /// Cached position (0 = open, 100 = closed), as of [`last_updated`](Self::last_updated).
    pub fn position(&self) -> u8 {
        self.position
    }

    /// Cached movement flag, as of [`last_updated`](Self::last_updated).
    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    /// When the state was last successfully read, if ever.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Force a state read from the device and return the fresh snapshot.
    ///
    /// Runs the readiness phase (tolerating exhaustion -- the device is
    /// lenient about reads), pauses, then queries the shade state. A
    /// transport or parse failure is returned without touching the cached
    /// state.
    pub async fn update_state(&mut self) -> Result<ShadeState, Error> {
        self.await_ready().await;
        sleep(self.tuning.time_between_cmds).await;

        let result = match self
            .client
            .send_shade_state(self.room.id(), self.channel.id())
            .await
        {
            Ok(doc) => doc.shade_state(),
            Err(e) => Err(e),
        };

        match result {
            Ok(raw) => {
                #[allow(clippy::cast_possible_truncation)]
                let snapshot = ShadeState {
                    position: (raw.position / 2).min(100) as u8,
                    is_moving: raw.moving,
                    last_updated: Utc::now(),
                };
                self.position = snapshot.position;
                self.is_moving = snapshot.is_moving;
                self.last_updated = Some(snapshot.last_updated);
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    room = self.room.name(),
                    channel = self.channel.name(),
                    error = %e,
                    "could not update shade state"
                );
                Err(e)
            }
        }
    }

    /// State snapshot, read through the cache.
    ///
    /// Performs a device read only when `force_update` is set or the shade
    /// has never been read; otherwise the cached snapshot is returned with
    /// zero commands sent. There is no time-based expiry.
    pub async fn state(&mut self, force_update: bool) -> Result<ShadeState, Error> {
        if let (false, Some(last_updated)) = (force_update, self.last_updated) {
            return Ok(ShadeState {
                position: self.position,
                is_moving: self.is_moving,
                last_updated,
            });
        }
        self.update_state().await
    }

    /// Move the shade to `target` (0 = open, 100 = closed).
    ///
    /// Each outer attempt runs the readiness phase, pauses, sends the move
    /// command (encoded in device half-units), then polls until the shade
    /// either reports movement or is already at the target; a slow-start
    /// and an already-there race are both success. Exhausting every outer
    /// attempt returns [`Error::ConvergenceTimeout`]; the cached position
    /// keeps whatever the last poll observed.
    pub async fn set_position(&mut self, target: u8) -> Result<(), Error> {
        if target > 100 {
            return Err(Error::InvalidPosition(target));
        }

        for attempt in 0..self.tuning.num_retries {
            self.await_ready().await;
            sleep(self.tuning.time_between_cmds).await;

            if let Err(e) = self
                .client
                .send_move_shade(self.room.id(), self.channel.id(), target * 2)
                .await
            {
                debug!(attempt, error = %e, "move command failed");
                continue;
            }

            if self.verify_move(target).await {
                return Ok(());
            }
        }

        warn!(
            room = self.room.name(),
            channel = self.channel.name(),
            target_position = target,
            "shade could not be set to target position"
        );
        Err(Error::ConvergenceTimeout {
            room: self.room.name().to_owned(),
            channel: self.channel.name().to_owned(),
            target,
        })
    }

    /// Readiness phase: poll the device up to `num_retries` times until it
    /// acknowledges (or answers without a feedback field). Exhaustion is
    /// tolerated -- the caller proceeds regardless.
    async fn await_ready(&self) {
        for attempt in 0..self.tuning.num_retries {
            match self
                .client
                .send_check_ready(self.room.id(), self.channel.id())
                .await
            {
                Ok(doc) if doc.feedback().is_ok() => return,
                Ok(_) => debug!(attempt, "device not ready"),
                Err(e) => debug!(attempt, error = %e, "readiness check failed"),
            }
            sleep(self.tuning.time_between_cmds).await;
        }
    }

    /// Convergence poll after a move command: success on the first state
    /// read showing `is_moving` or the target position.
    async fn verify_move(&mut self, target: u8) -> bool {
        sleep(self.tuning.time_between_cmds).await;
        for _ in 0..self.tuning.num_retries {
            if self.update_state().await.is_ok()
                && (self.is_moving || self.position == target)
            {
                return true;
            }
            sleep(self.tuning.time_between_cmds).await;
        }
        false
    }
}
