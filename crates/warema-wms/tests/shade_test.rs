#![allow(clippy::unwrap_used)]
// State-machine tests for the `Shade` controller against a wiremock
// WebControl server. Retry delays are zeroed so the bounded retry/poll
// budgets drive the scenarios, verified through wiremock's expected
// request counts.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

use warema_wms::{Channel, Error, Room, Shade, ShadeTuning, WmsClient, WmsConfig};

// ── Helpers ─────────────────────────────────────────────────────────

const ACK: &str = "<response><feedback>1</feedback></response>";
const BUSY: &str = "<response><feedback>0</feedback></response>";

// room 0 / channel 0 probes, minus the varying prefix+counter bytes
const READY: &str = "03230000";
const STATE: &str = "0431000001";
// move to user position 25 = 50 half-units (0x32)
const MOVE_TO_25: &str = "082100000332ffffff";

async fn setup() -> (MockServer, Arc<WmsClient>) {
    let server = MockServer::start().await;
    let config = WmsConfig::with_target(&server.uri()).unwrap();
    let client = Arc::new(WmsClient::new(&config).unwrap());
    (server, client)
}

fn make_shade(client: Arc<WmsClient>, num_retries: u32) -> Shade {
    let channel = Channel::new("Left", 0);
    let room = Room::new("Living", 0, vec![channel.clone()]);
    Shade::new(
        client,
        room,
        channel,
        ShadeTuning {
            time_between_cmds: Duration::ZERO,
            num_retries,
        },
    )
}

fn mock(probe: &str, body: &str) -> Mock {
    Mock::given(method("GET"))
        .and(path("/protocol.xml"))
        .and(query_param_contains("protocol", probe.to_owned()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_owned()))
}

fn state_body(position: u16, fahrt: &str) -> String {
    format!("<response><position>{position}</position><fahrt>{fahrt}</fahrt></response>")
}

// ── Read-through cache ──────────────────────────────────────────────

#[tokio::test]
async fn test_state_is_cached_until_forced() {
    let (server, client) = setup().await;

    // exactly one update cycle for two unforced reads
    mock(READY, ACK).expect(1).mount(&server).await;
    mock(STATE, &state_body(50, "0")).expect(1).mount(&server).await;

    let mut shade = make_shade(client, 3);
    let first = shade.state(false).await.unwrap();
    assert_eq!(first.position, 25);
    assert!(!first.is_moving);

    let second = shade.state(false).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_forced_read_bypasses_cache() {
    let (server, client) = setup().await;

    mock(READY, ACK).expect(2).mount(&server).await;
    mock(STATE, &state_body(50, "0")).expect(2).mount(&server).await;

    let mut shade = make_shade(client, 3);
    shade.state(false).await.unwrap();
    shade.state(true).await.unwrap();
}

#[tokio::test]
async fn test_persistent_not_ready_is_tolerated_for_reads() {
    let (server, client) = setup().await;

    // the readiness budget is exhausted, the read proceeds anyway
    mock(READY, BUSY).expect(3).mount(&server).await;
    mock(STATE, &state_body(120, "0")).expect(1).mount(&server).await;

    let mut shade = make_shade(client, 3);
    let state = shade.update_state().await.unwrap();
    assert_eq!(state.position, 60);
}

#[tokio::test]
async fn test_malformed_response_preserves_cached_state() {
    let (server, client) = setup().await;

    mock(READY, ACK).mount(&server).await;
    mock(STATE, &state_body(50, "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mock(STATE, "<<< device busy >>>").mount(&server).await;

    let mut shade = make_shade(client, 3);
    shade.update_state().await.unwrap();
    let before = shade.last_updated().unwrap();

    let result = shade.update_state().await;
    assert!(result.unwrap_err().is_parse_failure());
    assert_eq!(shade.position(), 25);
    assert!(!shade.is_moving());
    assert_eq!(shade.last_updated().unwrap(), before);
}

// ── set_position ────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_position_succeeds_on_first_poll() {
    let (server, client) = setup().await;

    // one readiness check before the move, one inside the single poll
    mock(READY, ACK).expect(2).mount(&server).await;
    mock(MOVE_TO_25, ACK).expect(1).mount(&server).await;
    mock(STATE, &state_body(10, "1")).expect(1).mount(&server).await;

    let mut shade = make_shade(client, 3);
    shade.set_position(25).await.unwrap();
    assert!(shade.is_moving());
    assert_eq!(shade.position(), 5);
}

#[tokio::test]
async fn test_set_position_exhausts_retries() {
    let (server, client) = setup().await;

    // the shade never moves and never reaches the target: 2 outer
    // attempts, each with 1 pre-move readiness check and 2 polls
    mock(READY, ACK).expect(6).mount(&server).await;
    mock(MOVE_TO_25, ACK).expect(2).mount(&server).await;
    mock(STATE, &state_body(40, "0")).expect(4).mount(&server).await;

    let mut shade = make_shade(client, 2);
    let result = shade.set_position(25).await;

    match result {
        Err(Error::ConvergenceTimeout { room, channel, target }) => {
            assert_eq!(room, "Living");
            assert_eq!(channel, "Left");
            assert_eq!(target, 25);
        }
        other => panic!("expected ConvergenceTimeout, got: {other:?}"),
    }
    // the cache keeps the last observed position, not a reverted one
    assert_eq!(shade.position(), 20);
}

#[tokio::test]
async fn test_set_position_rejects_out_of_range_target() {
    let config = WmsConfig::with_target("http://127.0.0.1:9").unwrap();
    let client = Arc::new(WmsClient::new(&config).unwrap());

    let mut shade = make_shade(client, 3);
    let result = shade.set_position(101).await;
    assert!(matches!(result, Err(Error::InvalidPosition(101))));
}

// ── Discovery convenience ───────────────────────────────────────────

#[tokio::test]
async fn test_discover_all_builds_one_shade_per_channel() {
    let (server, client) = setup().await;

    mock("020300", "<response><raumname>Living</raumname></response>")
        .mount(&server)
        .await;
    mock("020301", "<response><raumname></raumname></response>")
        .mount(&server)
        .await;
    mock("03470000", "<response><kanalname>Left</kanalname></response>")
        .mount(&server)
        .await;
    mock("03470001", "<response><kanalname></kanalname></response>")
        .mount(&server)
        .await;
    mock(READY, ACK).mount(&server).await;

    let shades = Shade::discover_all(client, ShadeTuning::default()).await.unwrap();
    assert_eq!(shades.len(), 1);
    assert_eq!(shades[0].room_name(), "Living");
    assert_eq!(shades[0].channel_name(), "Left");
}
