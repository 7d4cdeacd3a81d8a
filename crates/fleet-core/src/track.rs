//! Historical patrol track parsing.

use crate::models::LatLon;

/// Parse `id,lat,lon` rows into an ordered track.
///
/// Header rows, rows without exactly three columns and rows with unparsable
/// coordinates are skipped.
pub fn parse_track_csv(text: &str) -> Vec<LatLon> {
    text.lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split(',').collect();
            let [id, lat, lon] = cols.as_slice() else {
                return None;
            };
            if matches!(id.trim(), "id" | "squadId") {
                return None;
            }
            let lat = lat.trim().parse::<f64>().ok()?;
            let lon = lon.trim().parse::<f64>().ok()?;
            Some(LatLon::new(lat, lon))
        })
        .collect()
}
