use crate::models::PermitRecord;
use crate::normalize::normalize_whitespace;

/// Geocoding result. Coordinates are always `None` for now: the provider
/// call is stubbed out so runs never make geocoding requests.
// TODO: wire a real geocoding provider behind `geocode.api_key`.
#[derive(Debug, Clone, PartialEq)]
pub struct Geocoded {
    pub full_address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

pub fn geocode_address(record: &PermitRecord) -> Geocoded {
    let full = format!(
        "{} {} {} {}",
        record.address, record.city, record.state, record.zip
    );
    Geocoded {
        full_address: normalize_whitespace(&full),
        lat: None,
        lng: None,
    }
}
