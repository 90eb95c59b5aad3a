use gantry_core::messaging::{Event, EventBus, QosLevel};
use gantry_core::Result;
use serde_json::json;

// Helper to create a test event
fn make_event(kind: &str) -> Event {
    Event::new(kind, json!({"n": 1}), "test")
}

#[tokio::test]
async fn subscribe_and_publish_basic() -> Result<()> {
    let bus = EventBus::new().await?;
    let (_sub_id, mut rx) = bus
        .subscribe("topic.test".to_string(), vec![], QosLevel::Batched)
        .await?;

    let evt = make_event("unit");
    let id = evt.id.clone();
    bus.publish("topic.test", evt).await?;

    let received = tokio::time::timeout(std::time::Duration::from_millis(500), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed");
    assert_eq!(received.id, id);
    assert_eq!(received.path, "topic.test", "bus stamps the topic path");
    Ok(())
}

#[tokio::test]
async fn unsubscribe_stops_receiving_events() -> Result<()> {
    let bus = EventBus::new().await?;
    let (sub_id, mut rx) = bus
        .subscribe("topic.unsub".to_string(), vec![], QosLevel::Batched)
        .await?;

    // Publish before unsubscribe
    let before = make_event("unit");
    let before_id = before.id.clone();
    bus.publish("topic.unsub", before).await?;

    // Unsubscribe
    bus.unsubscribe(&sub_id).await?;

    // Publish after unsubscribe
    bus.publish("topic.unsub", make_event("unit")).await?;

    // Should receive the first event
    let first = tokio::time::timeout(std::time::Duration::from_millis(500), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed");
    assert_eq!(first.id, before_id);

    // Should NOT receive the second event (channel should close or timeout)
    let second = tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await;
    assert!(
        second.is_err() || second.unwrap().is_none(),
        "should not receive after unsubscribe"
    );
    Ok(())
}

#[tokio::test]
async fn event_kind_filtering_works() -> Result<()> {
    let bus = EventBus::new().await?;
    let (_sub_id, mut rx) = bus
        .subscribe(
            "topic.filter".to_string(),
            vec!["kind_a".to_string()],
            QosLevel::Batched,
        )
        .await?;

    bus.publish("topic.filter", make_event("kind_b")).await?;
    bus.publish("topic.filter", make_event("kind_a")).await?;

    let received = tokio::time::timeout(std::time::Duration::from_millis(500), rx.recv())
        .await
        .expect("timeout")
        .expect("channel closed");
    assert_eq!(received.kind, "kind_a");
    Ok(())
}

#[tokio::test]
async fn publish_without_subscribers_delivers_zero() -> Result<()> {
    let bus = EventBus::new().await?;
    let delivered = bus.publish("topic.empty", make_event("unit")).await?;
    assert_eq!(delivered, 0);
    Ok(())
}

#[tokio::test]
async fn realtime_overflow_is_shed_while_batched_still_delivers() -> Result<()> {
    let bus = EventBus::new().await?;
    let (_rt_id, mut rt_rx) = bus
        .subscribe("topic.pressure".to_string(), vec![], QosLevel::Realtime)
        .await?;
    let (_batch_id, mut batch_rx) = bus
        .subscribe("topic.pressure".to_string(), vec![], QosLevel::Batched)
        .await?;

    // Realtime queues hold 64 events; publish past that without draining
    for _ in 0..70 {
        bus.publish("topic.pressure", make_event("unit")).await?;
    }

    let stats = bus.get_stats("topic.pressure").expect("stats exist");
    assert_eq!(stats.dropped_events, 6, "overflow past realtime capacity is shed");
    assert_eq!(stats.total_delivered, 64 + 70);
    assert_eq!(stats.total_published, 70);

    // The batched subscriber saw every event
    for _ in 0..70 {
        assert!(batch_rx.recv().await.is_some());
    }
    // The realtime subscriber kept the first 64
    let mut kept = 0;
    while rt_rx.try_recv().is_ok() {
        kept += 1;
    }
    assert_eq!(kept, 64);
    Ok(())
}

#[tokio::test]
async fn stats_track_published_and_delivered() -> Result<()> {
    let bus = EventBus::new().await?;
    let (_sub_id, mut rx) = bus
        .subscribe("topic.stats".to_string(), vec![], QosLevel::Batched)
        .await?;

    bus.publish("topic.stats", make_event("unit")).await?;
    bus.publish("topic.stats", make_event("unit")).await?;
    rx.recv().await;
    rx.recv().await;

    let stats = bus.get_stats("topic.stats").expect("stats exist");
    assert_eq!(stats.total_published, 2);
    assert_eq!(stats.total_delivered, 2);
    assert_eq!(stats.active_subscriptions, 1);
    Ok(())
}
