//! Fan-out Integration Tests
//!
//! End-to-end tests of the viewer lifecycle and price broadcast across the
//! registry, the stream service, and the supervisor command channel.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use price_gateway::infrastructure::kraken::SupervisorCommand;
use price_gateway::{
    PriceCache, StreamService, SubscriptionRegistry, UpstreamController, ViewerHandle,
    ViewerMessage, supervisor_channel,
};

/// Records every upstream signal in order.
#[derive(Default)]
struct RecordingController {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingController {
    fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

impl UpstreamController for RecordingController {
    fn start(&self) {
        self.events.lock().unwrap().push("start");
    }
    fn symbol_set_changed(&self) {
        self.events.lock().unwrap().push("symbol_set_changed");
    }
    fn stop(&self) {
        self.events.lock().unwrap().push("stop");
    }
}

fn service_with_recorder() -> (Arc<StreamService>, Arc<RecordingController>) {
    let controller = Arc::new(RecordingController::default());
    let service = Arc::new(StreamService::new(
        Arc::new(SubscriptionRegistry::new()),
        Arc::new(PriceCache::new()),
        Arc::clone(&controller) as Arc<dyn UpstreamController>,
    ));
    (service, controller)
}

fn viewer(id: u64, capacity: usize) -> (ViewerHandle, mpsc::Receiver<ViewerMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ViewerHandle::new(id, tx), rx)
}

#[test]
fn full_session_lifecycle_signals_upstream_exactly_once_per_transition() {
    let (service, controller) = service_with_recorder();

    // First viewer brings the gateway out of idle.
    let (a, mut a_rx) = viewer(1, 8);
    assert_eq!(service.on_viewer_connect(a, "BTC"), "BTC/USD");
    assert_eq!(controller.events(), vec!["start"]);

    // A second symbol grows the live set without restarting.
    let (b, mut b_rx) = viewer(2, 8);
    assert_eq!(service.on_viewer_connect(b, "ETH"), "ETH/USD");
    assert_eq!(controller.events(), vec!["start", "symbol_set_changed"]);

    // Ticks route by symbol only.
    service.publish("BTC/USD", 50_000.5);
    service.publish("ETH/USD", 3_000.25);
    assert_eq!(
        a_rx.try_recv().unwrap(),
        ViewerMessage::price_update("BTC/USD", 50_000.5)
    );
    assert!(a_rx.try_recv().is_err());
    assert_eq!(
        b_rx.try_recv().unwrap(),
        ViewerMessage::price_update("ETH/USD", 3_000.25)
    );

    // ETH empties but BTC remains: shrink, don't stop.
    service.on_viewer_disconnect(2);
    assert_eq!(
        controller.events(),
        vec!["start", "symbol_set_changed", "symbol_set_changed"]
    );

    // Last viewer gone: stop, exactly once.
    service.on_viewer_disconnect(1);
    assert_eq!(
        controller.events(),
        vec!["start", "symbol_set_changed", "symbol_set_changed", "stop"]
    );
}

#[test]
fn shared_symbol_churn_is_quiet() {
    let (service, controller) = service_with_recorder();
    let (a, _a_rx) = viewer(1, 8);
    let (b, _b_rx) = viewer(2, 8);

    service.on_viewer_connect(a, "BTC");
    service.on_viewer_connect(b, "BTC");
    service.on_viewer_disconnect(2);

    // Joining and leaving a still-live symbol never signals upstream.
    assert_eq!(controller.events(), vec!["start"]);
}

#[test]
fn tick_reaches_every_viewer_of_the_symbol() {
    let (service, _controller) = service_with_recorder();
    let mut receivers = Vec::new();
    for id in 1..=3 {
        let (handle, rx) = viewer(id, 8);
        service.on_viewer_connect(handle, "BTC");
        receivers.push(rx);
    }
    let (other, mut other_rx) = viewer(4, 8);
    service.on_viewer_connect(other, "ETH");

    service.publish("BTC/USD", 42_000.0);

    for rx in &mut receivers {
        assert_eq!(
            rx.try_recv().unwrap(),
            ViewerMessage::price_update("BTC/USD", 42_000.0)
        );
    }
    assert!(other_rx.try_recv().is_err());
}

#[test]
fn slow_viewer_is_pruned_without_blocking_the_rest() {
    let (service, controller) = service_with_recorder();

    // Capacity 1: the second undrained tick overflows this viewer.
    let (slow, mut slow_rx) = viewer(1, 1);
    let (healthy, mut healthy_rx) = viewer(2, 8);
    service.on_viewer_connect(slow, "BTC");
    service.on_viewer_connect(healthy, "BTC");

    service.publish("BTC/USD", 1.0);
    service.publish("BTC/USD", 2.0);

    // The healthy viewer saw both ticks.
    assert_eq!(
        healthy_rx.try_recv().unwrap(),
        ViewerMessage::price_update("BTC/USD", 1.0)
    );
    assert_eq!(
        healthy_rx.try_recv().unwrap(),
        ViewerMessage::price_update("BTC/USD", 2.0)
    );

    // The slow viewer kept its first tick, then was dropped; its channel
    // closes once the registry releases the handle.
    assert_eq!(
        slow_rx.try_recv().unwrap(),
        ViewerMessage::price_update("BTC/USD", 1.0)
    );
    assert!(slow_rx.try_recv().is_err());
    assert_eq!(service.registry().viewer_count(), 1);

    // The symbol stayed live, so pruning caused no upstream traffic.
    assert_eq!(controller.events(), vec!["start"]);
}

#[test]
fn pruning_the_last_viewer_stops_the_upstream() {
    let (service, controller) = service_with_recorder();
    let (only, rx) = viewer(1, 8);
    service.on_viewer_connect(only, "BTC");
    drop(rx);

    service.publish("BTC/USD", 10.0);

    assert!(service.registry().is_empty());
    assert_eq!(controller.events(), vec!["start", "stop"]);
}

#[test]
fn late_joiner_gets_cached_price_before_live_ticks() {
    let (service, _controller) = service_with_recorder();
    let (first, _first_rx) = viewer(1, 8);
    service.on_viewer_connect(first, "BTC");
    service.publish("BTC/USD", 99.5);

    let (late, mut late_rx) = viewer(2, 8);
    service.on_viewer_connect(late, "BTC");
    service.publish("BTC/USD", 100.5);

    // Snapshot first, then the live tick, in order.
    assert_eq!(
        late_rx.try_recv().unwrap(),
        ViewerMessage::price_update("BTC/USD", 99.5)
    );
    assert_eq!(
        late_rx.try_recv().unwrap(),
        ViewerMessage::price_update("BTC/USD", 100.5)
    );
}

#[test]
fn unusable_prices_never_reach_viewers_or_the_cache() {
    let (service, _controller) = service_with_recorder();
    let (handle, mut rx) = viewer(1, 8);
    service.on_viewer_connect(handle, "BTC");

    service.publish("BTC/USD", 0.0);
    service.publish("BTC/USD", -1.0);
    service.publish("BTC/USD", f64::NAN);

    assert!(rx.try_recv().is_err());
    assert!(service.prices().last("BTC/USD").is_none());
}

#[tokio::test]
async fn supervisor_handle_serializes_lifecycle_commands() {
    let (handle, mut commands) = supervisor_channel();
    let service = Arc::new(StreamService::new(
        Arc::new(SubscriptionRegistry::new()),
        Arc::new(PriceCache::new()),
        Arc::new(handle) as Arc<dyn UpstreamController>,
    ));

    let (a, _a_rx) = viewer(1, 8);
    let (b, _b_rx) = viewer(2, 8);
    service.on_viewer_connect(a, "BTC");
    service.on_viewer_connect(b, "ETH");
    service.on_viewer_disconnect(2);
    service.on_viewer_disconnect(1);

    assert_eq!(commands.recv().await, Some(SupervisorCommand::Start));
    assert_eq!(
        commands.recv().await,
        Some(SupervisorCommand::SymbolSetChanged)
    );
    assert_eq!(
        commands.recv().await,
        Some(SupervisorCommand::SymbolSetChanged)
    );
    assert_eq!(commands.recv().await, Some(SupervisorCommand::Stop));
}

#[test]
fn viewer_switching_symbols_keeps_exactly_one_subscription() {
    let (service, controller) = service_with_recorder();
    let (first, _first_rx) = viewer(1, 8);
    service.on_viewer_connect(first, "BTC");

    // The same viewer id re-requests a different symbol.
    let (again, mut again_rx) = viewer(1, 8);
    service.on_viewer_connect(again, "ETH");

    assert!(service.registry().viewers_of("BTC/USD").is_empty());
    assert_eq!(service.registry().viewers_of("ETH/USD").len(), 1);

    service.publish("BTC/USD", 1.0);
    service.publish("ETH/USD", 2.0);
    assert_eq!(
        again_rx.try_recv().unwrap(),
        ViewerMessage::price_update("ETH/USD", 2.0)
    );
    assert!(again_rx.try_recv().is_err());

    // BTC emptied while ETH went live: one resubscribe, no stop.
    assert_eq!(controller.events(), vec!["start", "symbol_set_changed"]);
}
