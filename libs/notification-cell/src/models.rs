use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::records::{Appointment, AppointmentStatus};

/// Audience partition. Doctor and patient rooms are keyed by directory record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Room {
    Admins,
    Doctor(Uuid),
    Patient(Uuid),
}

impl Room {
    /// Everyone who cares about a change to `appointment`.
    pub fn audience(appointment: &Appointment) -> [Room; 3] {
        [
            Room::Patient(appointment.patient_id),
            Room::Doctor(appointment.doctor_id),
            Room::Admins,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub appointment_id: Uuid,
    pub new_status: AppointmentStatus,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn for_appointment(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            new_status: appointment.status,
            timestamp: appointment.updated_at,
        }
    }
}

/// Wire frame sent to websocket clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayFrame {
    AppointmentUpdated(LifecycleEvent),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelayStats {
    pub active_subscribers: usize,
}
