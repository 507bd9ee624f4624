//! End-to-end session flows against the in-memory gateway

use std::sync::Arc;

use coe_core::{Channel, ExposedEntitiesConfig, Slot};
use coe_panel::{ConfigSession, MemoryGateway, SaveOutcome, SessionEvent, SAVED_NOTICE};

fn kitchen_gateway() -> Arc<MemoryGateway> {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.add_entry("e1", "Kitchen");
    gateway.set_config(
        "e1",
        ExposedEntitiesConfig::new(vec![Slot::new(2, "sensor.temp")], vec![]),
    );
    gateway
}

#[tokio::test]
async fn test_edit_and_save_kitchen_entry() {
    let gateway = kitchen_gateway();
    let mut session = ConfigSession::new(gateway.clone());

    assert_eq!(session.load_entries().await, 1);
    assert_eq!(session.selected_entry(), Some("e1"));
    assert_eq!(
        session.config(),
        &ExposedEntitiesConfig::new(vec![Slot::empty(1), Slot::new(2, "sensor.temp")], vec![])
    );

    session.update_slot(Channel::Analog, Slot::new(1, "sensor.humidity"));
    assert_eq!(session.save().await.unwrap(), SaveOutcome::Saved);

    assert_eq!(
        gateway.persisted(),
        vec![(
            "e1".to_string(),
            ExposedEntitiesConfig::new(
                vec![Slot::new(1, "sensor.humidity"), Slot::new(2, "sensor.temp")],
                vec![]
            )
        )]
    );
}

#[tokio::test]
async fn test_cleared_interior_slot_is_not_persisted() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.add_entry("e1", "Boiler");
    gateway.set_config(
        "e1",
        ExposedEntitiesConfig::new(
            vec![],
            vec![
                Slot::new(1, "binary_sensor.a"),
                Slot::new(2, "binary_sensor.b"),
                Slot::new(3, "input_boolean.c"),
            ],
        ),
    );
    let mut session = ConfigSession::new(gateway.clone());
    session.load_entries().await;

    session.update_slot(Channel::Digital, Slot::empty(2));
    session.save().await.unwrap();

    let stored = gateway.stored_config("e1").unwrap();
    assert_eq!(
        stored.digital,
        vec![Slot::new(1, "binary_sensor.a"), Slot::new(3, "input_boolean.c")]
    );

    // Reloading refills the gap
    session.select_entry(Some("e1".into())).await;
    assert_eq!(
        session.slots(Channel::Digital),
        &[
            Slot::new(1, "binary_sensor.a"),
            Slot::empty(2),
            Slot::new(3, "input_boolean.c"),
        ]
    );
}

#[tokio::test]
async fn test_no_entries_leaves_session_unselected() {
    let mut session = ConfigSession::new(MemoryGateway::new());
    assert_eq!(session.load_entries().await, 0);
    assert_eq!(session.selected_entry(), None);
    assert_eq!(session.save().await.unwrap(), SaveOutcome::NoSelection);
}

#[tokio::test]
async fn test_events_follow_operations() {
    let gateway = kitchen_gateway();
    let mut session = ConfigSession::new(gateway);
    let mut rx = session.subscribe();

    session.load_entries().await;
    session.add_slot(Channel::Digital);
    session.save().await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events[0], SessionEvent::EntriesLoaded { count: 1 });
    assert_eq!(
        events[1],
        SessionEvent::EntrySelected {
            entry_id: Some("e1".into())
        }
    );
    assert_eq!(
        events[2],
        SessionEvent::ConfigLoaded {
            entry_id: "e1".into()
        }
    );
    assert_eq!(
        events[3],
        SessionEvent::SlotsChanged {
            channel: Channel::Digital
        }
    );
    assert_eq!(
        events[4],
        SessionEvent::Saved {
            entry_id: "e1".into()
        }
    );
    assert!(matches!(
        &events[5],
        SessionEvent::Notice { message, .. } if message == SAVED_NOTICE
    ));
}

#[tokio::test]
async fn test_entity_choices_by_channel() {
    let gateway = kitchen_gateway();
    gateway.set_state("sensor.temp", "21.5", Some("°C"));
    gateway.set_state("input_number.setpoint", "45", Some("°C"));
    gateway.set_state("binary_sensor.pump", "on", None);
    gateway.set_state("switch.heater", "off", None);

    let mut session = ConfigSession::new(gateway);
    session.refresh_entity_choices().await;

    assert_eq!(
        session.entity_choices(Channel::Analog),
        &["input_number.setpoint".to_string(), "sensor.temp".to_string()]
    );
    assert_eq!(
        session.entity_choices(Channel::Digital),
        &["binary_sensor.pump".to_string()]
    );
}
