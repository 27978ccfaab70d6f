//! Mount/unmount adapter behavior.

mod common;

use common::{Open, Recorder, ScriptedTransport, config, elapse, heartbeat, price, settle};
use signal_stream::{SignalBinding, SignalStreamClient};
use std::time::Duration;

fn mount(transport: &ScriptedTransport, recorder: &Recorder) -> SignalBinding {
    let config = recorder.attach(config("https://signals.example/stream"));
    SignalBinding::mount(SignalStreamClient::with_transport(config, transport.clone()).unwrap())
}

#[tokio::test(start_paused = true)]
async fn mount_connects_once() {
    let transport = ScriptedTransport::new();
    let recorder = Recorder::new();
    let binding = mount(&transport, &recorder);
    settle().await;

    assert!(binding.is_connected());
    assert_eq!(transport.opens(), 1);
    assert_eq!(recorder.connected(), 1);
    assert_eq!(binding.last_message(), None);
}

#[tokio::test(start_paused = true)]
async fn changed_wakes_on_connection_and_messages() {
    let transport = ScriptedTransport::new();
    let recorder = Recorder::new();
    let mut binding = mount(&transport, &recorder);

    let opened = binding.changed().await.expect("client alive");
    assert!(opened.is_connected);

    transport.push(price("AAPL", 190.0, "m-1"));
    let update = binding.changed().await.expect("client alive");
    assert_eq!(update.message_seq, 1);
    assert_eq!(
        update.last_message.map(|m| m.message_id),
        Some("m-1".to_string())
    );

    // identical payloads still count as new messages
    transport.push(heartbeat("hb-1"));
    binding.changed().await.expect("client alive");
    transport.push(heartbeat("hb-1"));
    let update = binding.changed().await.expect("client alive");
    assert_eq!(update.message_seq, 3);
    assert_eq!(binding.state().message_seq, 3);
}

#[tokio::test(start_paused = true)]
async fn changed_ignores_retry_bookkeeping() {
    let transport =
        ScriptedTransport::with_script([Open::Accept, Open::Refuse, Open::Refuse, Open::Accept]);
    let recorder = Recorder::new();
    let mut binding = mount(&transport, &recorder);
    binding.changed().await.expect("client alive");

    transport.fail(signal_stream::SignalError::ConnectionClosed);
    let lost = binding.changed().await.expect("client alive");
    assert!(!lost.is_connected);

    // two refused reopens change phase and attempts but not connectivity
    let back = binding.changed().await.expect("client alive");
    assert!(back.is_connected);
    assert_eq!(transport.opens(), 4);
}

#[tokio::test(start_paused = true)]
async fn unmount_disconnects_open_stream() {
    let transport = ScriptedTransport::new();
    let recorder = Recorder::new();
    let binding = mount(&transport, &recorder);
    settle().await;

    binding.unmount();
    settle().await;

    assert_eq!(recorder.disconnected(), 1);
    assert_eq!(transport.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn unmount_tolerates_a_stream_that_never_opened() {
    let transport = ScriptedTransport::with_script(std::iter::repeat_n(Open::Refuse, 50));
    let recorder = Recorder::new();
    let binding = mount(&transport, &recorder);
    settle().await;
    assert!(!binding.is_connected());

    drop(binding);
    let opens = transport.opens();
    elapse(Duration::from_secs(120)).await;

    assert_eq!(transport.opens(), opens);
    assert_eq!(recorder.disconnected(), 0);
    assert_eq!(recorder.connected(), 0);
}
