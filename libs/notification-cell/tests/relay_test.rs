use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use notification_cell::{LifecycleEvent, NotificationRelay, Room};
use shared_models::records::{Appointment, AppointmentStatus};

fn appointment(status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        appointment_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        status,
        description: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn event(status: AppointmentStatus) -> LifecycleEvent {
    LifecycleEvent {
        appointment_id: Uuid::new_v4(),
        new_status: status,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_announce_reaches_whole_audience() {
    let relay = NotificationRelay::new();
    let appt = appointment(AppointmentStatus::Approved);

    let mut patient = relay.subscribe([Room::Patient(appt.patient_id)]).await;
    let mut doctor = relay.subscribe([Room::Doctor(appt.doctor_id)]).await;
    let mut admin = relay.subscribe([Room::Admins]).await;

    let delivered = relay.announce(&appt).await;
    assert_eq!(delivered, 3);

    for subscription in [&mut patient, &mut doctor, &mut admin] {
        let received = subscription.receiver.try_recv().unwrap();
        assert_eq!(received.appointment_id, appt.id);
        assert_eq!(received.new_status, AppointmentStatus::Approved);
    }
}

#[tokio::test]
async fn test_subscribers_outside_audience_receive_nothing() {
    let relay = NotificationRelay::new();
    let appt = appointment(AppointmentStatus::Rejected);

    let mut other_patient = relay.subscribe([Room::Patient(Uuid::new_v4())]).await;
    let mut other_doctor = relay.subscribe([Room::Doctor(Uuid::new_v4())]).await;

    assert_eq!(relay.announce(&appt).await, 0);
    assert!(other_patient.receiver.try_recv().is_err());
    assert!(other_doctor.receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_subscriber_in_two_matching_rooms_gets_one_copy() {
    let relay = NotificationRelay::new();
    let appt = appointment(AppointmentStatus::Discharged);

    let mut both = relay
        .subscribe([Room::Admins, Room::Doctor(appt.doctor_id)])
        .await;

    assert_eq!(relay.announce(&appt).await, 1);
    assert!(both.receiver.try_recv().is_ok());
    assert!(both.receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_dropped_subscriber_is_pruned_without_failing_publish() {
    let relay = NotificationRelay::new();

    let gone = relay.subscribe([Room::Admins]).await;
    let mut alive = relay.subscribe([Room::Admins]).await;
    drop(gone);

    assert_eq!(relay.active_subscribers().await, 2);
    let delivered = relay.publish(Room::Admins, event(AppointmentStatus::Approved)).await;

    assert_eq!(delivered, 1);
    assert_eq!(relay.active_subscribers().await, 1);
    assert!(alive.receiver.try_recv().is_ok());
}

#[tokio::test]
async fn test_full_buffer_drops_instead_of_blocking() {
    let relay = NotificationRelay::with_buffer(1);
    let mut slow = relay.subscribe([Room::Admins]).await;

    assert_eq!(relay.publish(Room::Admins, event(AppointmentStatus::Approved)).await, 1);
    assert_eq!(relay.publish(Room::Admins, event(AppointmentStatus::Discharged)).await, 0);

    let first = slow.receiver.try_recv().unwrap();
    assert_eq!(first.new_status, AppointmentStatus::Approved);
    assert!(slow.receiver.try_recv().is_err());
    assert_eq!(relay.active_subscribers().await, 1);
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let relay = NotificationRelay::new();
    let subscription = relay.subscribe([Room::Admins]).await;

    relay.unsubscribe(subscription.id).await;

    assert_eq!(relay.active_subscribers().await, 0);
    assert_eq!(relay.publish(Room::Admins, event(AppointmentStatus::Pending)).await, 0);
}

#[tokio::test]
async fn test_clones_share_subscribers() {
    let relay = NotificationRelay::new();
    let publisher = relay.clone();
    let mut subscription = relay.subscribe([Room::Admins]).await;

    publisher.publish(Room::Admins, event(AppointmentStatus::Approved)).await;
    assert!(subscription.receiver.try_recv().is_ok());
}
