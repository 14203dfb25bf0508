//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Identifier of a clinic tenant.
    TenantId
);
uuid_id!(
    /// Identifier of a patient record in the clinic directory.
    PatientId
);
uuid_id!(
    /// Identifier of a doctor in the clinic directory.
    DoctorId
);
uuid_id!(
    /// Identifier of a bookable clinic service.
    ServiceId
);
uuid_id!(
    /// Identifier of an appointment created by the directory service.
    AppointmentId
);
uuid_id!(
    /// Internal identifier of a payment order row.
    PaymentOrderId
);
uuid_id!(
    /// Internal identifier of a tenant subscription.
    SubscriptionId
);
uuid_id!(
    /// Identifier of a billing audit log entry.
    AuditEntryId
);
uuid_id!(
    /// Identifier of a payment transaction ledger row.
    TransactionId
);
