// Topology discovery
//
// Walks the device's room and channel indices once, at startup, to build
// the static catalog. The device has no "list rooms" command; the scan
// probes ascending ids until a name comes back empty.

use tracing::{debug, warn};

use crate::client::WmsClient;
use crate::error::Error;
use crate::model::{Channel, Room};

impl WmsClient {
    /// Enumerate the rooms and channels configured on the WebControl
    /// server, in discovery order with ids assigned from 0.
    ///
    /// Whether the scan succeeds or fails partway, one trailing readiness
    /// check is always issued to leave the device session in a clean
    /// state; a scan error propagates only after that cleanup attempt.
    pub async fn discover(&self) -> Result<Vec<Room>, Error> {
        let result = self.scan_rooms().await;
        if let Err(e) = self.send_check_ready(0, 0).await {
            match result {
                Ok(_) => return Err(e),
                Err(_) => warn!(error = %e, "post-discovery readiness check failed"),
            }
        }
        result
    }

    async fn scan_rooms(&self) -> Result<Vec<Room>, Error> {
        let mut rooms = Vec::new();
        // ids are one wire byte, so the scan is bounded even on a device
        // that never returns an empty name
        for room_id in 0..=u8::MAX {
            let doc = self.send_room_name(room_id).await?;
            let Some(room_name) = doc.room_name() else {
                break;
            };
            let room_name = room_name.to_owned();

            let mut channels = Vec::new();
            for channel_id in 0..=u8::MAX {
                let doc = self.send_channel_info(room_id, channel_id).await?;
                let Some(channel_name) = doc.channel_name() else {
                    break;
                };
                channels.push(Channel::new(channel_name, channel_id));
            }

            debug!(room = %room_name, channels = channels.len(), "discovered room");
            rooms.push(Room::new(room_name, room_id, channels));
        }
        Ok(rooms)
    }
}
