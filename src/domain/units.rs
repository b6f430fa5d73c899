use crate::domain::models::LengthUnit;

const KM_PER_MILE: f64 = 1.609_344;

/// Converts a distance (or distance rate) measured in km into `unit`.
pub fn convert_km(value_km: f64, unit: LengthUnit) -> f64 {
    match unit {
        LengthUnit::Km => value_km,
        LengthUnit::Mi => value_km / KM_PER_MILE,
    }
}
