use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no-show",
});

impl AppointmentStatus {
    /// Completed, cancelled and no-show appointments no longer take part in
    /// next-visit ordering.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

str_enum!(LesionClass {
    ActinicKeratosis => "Actinic Keratosis",
    BasalCellCarcinoma => "Basal Cell Carcinoma",
    BenignKeratosis => "Benign Keratosis",
    Dermatofibroma => "Dermatofibroma",
    Melanoma => "Melanoma",
    MelanocyticNevus => "Melanocytic Nevus",
    VascularLesion => "Vascular Lesion",
});

impl LesionClass {
    /// Classes that warrant an expedited follow-up visit.
    pub fn is_malignant(&self) -> bool {
        matches!(self, Self::Melanoma | Self::BasalCellCarcinoma)
    }
}

str_enum!(ScreeningModel {
    MobileNetV2 => "MobileNetV2",
    NasNetMobile => "NASNetMobile",
});

str_enum!(RefreshTrigger {
    StatusCompleted => "status_completed",
    StatusCancelled => "status_cancelled",
    StatusNoShow => "status_no_show",
    StatusRescheduled => "status_rescheduled",
    DateEdited => "date_edited",
    AppointmentCreated => "appointment_created",
    AppointmentDeleted => "appointment_deleted",
});

impl RefreshTrigger {
    pub const ALL: [RefreshTrigger; 7] = [
        Self::StatusCompleted,
        Self::StatusCancelled,
        Self::StatusNoShow,
        Self::StatusRescheduled,
        Self::DateEdited,
        Self::AppointmentCreated,
        Self::AppointmentDeleted,
    ];

    /// The trigger raised when an appointment moves into `status`.
    pub fn for_status(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Completed => Self::StatusCompleted,
            AppointmentStatus::Cancelled => Self::StatusCancelled,
            AppointmentStatus::NoShow => Self::StatusNoShow,
            AppointmentStatus::Scheduled => Self::StatusRescheduled,
        }
    }
}
