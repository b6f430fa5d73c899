use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Readings taken at one end of a charge or drive, normalized across both
/// event kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub time: DateTime<Utc>,
    pub range_km: f64,
    pub battery_level: Option<i32>,
    pub usable_battery_level: Option<i32>,
    pub odometer_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeEnd {
    pub time: DateTime<Utc>,
    pub range_km: f64,
    pub battery_level: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeEvent {
    pub start_time: DateTime<Utc>,
    pub start_range_km: f64,
    pub start_battery_level: Option<i32>,
    pub usable_battery_level: Option<i32>,
    pub odometer_km: f64,
    pub position: Position,
    /// `None` while the charge is still in progress.
    pub end: Option<ChargeEnd>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriveEvent {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_range_km: f64,
    pub end_range_km: f64,
    pub start_battery_level: Option<i32>,
    pub end_battery_level: Option<i32>,
    pub start_usable_battery_level: Option<i32>,
    pub end_usable_battery_level: Option<i32>,
    pub start_odometer_km: f64,
    pub end_odometer_km: f64,
    pub end_position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Charge,
    Drive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Charge(ChargeEvent),
    Drive(DriveEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Charge(_) => EventKind::Charge,
            Self::Drive(_) => EventKind::Drive,
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        match self {
            Self::Charge(charge) => charge.start_time,
            Self::Drive(drive) => drive.start_time,
        }
    }

    pub fn opening(&self) -> Boundary {
        match self {
            Self::Charge(charge) => Boundary {
                time: charge.start_time,
                range_km: charge.start_range_km,
                battery_level: charge.start_battery_level,
                usable_battery_level: charge.usable_battery_level,
                odometer_km: charge.odometer_km,
            },
            Self::Drive(drive) => Boundary {
                time: drive.start_time,
                range_km: drive.start_range_km,
                battery_level: drive.start_battery_level,
                usable_battery_level: drive.start_usable_battery_level,
                odometer_km: drive.start_odometer_km,
            },
        }
    }

    /// Readings at the end of the event, or `None` for a charge that has
    /// not finished yet.
    pub fn closing(&self) -> Option<Boundary> {
        match self {
            Self::Charge(charge) => charge.end.map(|end| Boundary {
                time: end.time,
                range_km: end.range_km,
                battery_level: end.battery_level,
                usable_battery_level: None,
                odometer_km: charge.odometer_km,
            }),
            Self::Drive(drive) => Some(Boundary {
                time: drive.end_time,
                range_km: drive.end_range_km,
                battery_level: drive.end_battery_level,
                usable_battery_level: drive.end_usable_battery_level,
                odometer_km: drive.end_odometer_km,
            }),
        }
    }

    /// Where the vehicle was left once the event was over.
    pub fn position(&self) -> Position {
        match self {
            Self::Charge(charge) => charge.position,
            Self::Drive(drive) => drive.end_position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    Online,
    Asleep,
    Offline,
    Unknown,
}

impl VehicleState {
    pub fn from_db(value: &str) -> Self {
        match value {
            "online" => Self::Online,
            "asleep" => Self::Asleep,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Asleep => "asleep",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_standby(&self) -> bool {
        matches!(self, Self::Asleep | Self::Offline)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateInterval {
    pub state: VehicleState,
    pub start_time: DateTime<Utc>,
    /// `None` while the vehicle is still in this state.
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarProfile {
    pub id: i64,
    pub name: Option<String>,
    /// kWh per km of range.
    pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    #[default]
    Km,
    Mi,
}

impl LengthUnit {
    pub fn from_db(value: &str) -> Self {
        match value {
            "mi" => Self::Mi,
            _ => Self::Km,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Km => "km",
            Self::Mi => "mi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn from_db(value: &str) -> Self {
        match value {
            "F" => Self::Fahrenheit,
            _ => Self::Celsius,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreferredRange {
    Ideal,
    #[default]
    Rated,
}

impl PreferredRange {
    pub fn from_db(value: &str) -> Self {
        match value {
            "ideal" => Self::Ideal,
            _ => Self::Rated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ideal => "ideal",
            Self::Rated => "rated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplaySettings {
    pub unit_of_length: LengthUnit,
    pub unit_of_temperature: TemperatureUnit,
    pub preferred_range: PreferredRange,
}
