use crate::prelude::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A single detected photon: energy in MeV, Galactic coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotonEvent {
    pub energy: f64,
    #[serde(alias = "L")]
    pub lon: f64,
    #[serde(alias = "B")]
    pub lat: f64,
}

impl PhotonEvent {
    pub fn new(energy: f64, lon: f64, lat: f64) -> Self {
        Self { energy, lon, lat }
    }
}

/// Provider of the raw photon event list.
pub trait EventSource {
    fn load_photon_events(&self) -> AnalysisResult<Vec<PhotonEvent>>;
}

impl EventSource for [PhotonEvent] {
    fn load_photon_events(&self) -> AnalysisResult<Vec<PhotonEvent>> {
        Ok(self.to_vec())
    }
}

impl EventSource for Vec<PhotonEvent> {
    fn load_photon_events(&self) -> AnalysisResult<Vec<PhotonEvent>> {
        Ok(self.clone())
    }
}

/// Event list stored as a JSON array of `{energy, lon, lat}` records.
#[derive(Debug, Clone)]
pub struct JsonEventFile {
    path: PathBuf,
}

impl JsonEventFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn write(path: &Path, events: &[PhotonEvent]) -> AnalysisResult<()> {
        let payload = serde_json::to_string(events).map_err(|err| {
            AnalysisError::UpstreamData(format!("serialising events: {}", err))
        })?;
        fs::write(path, payload).map_err(|err| {
            AnalysisError::UpstreamData(format!("writing {}: {}", path.display(), err))
        })
    }
}

impl EventSource for JsonEventFile {
    fn load_photon_events(&self) -> AnalysisResult<Vec<PhotonEvent>> {
        let contents = fs::read_to_string(&self.path).map_err(|err| {
            AnalysisError::UpstreamData(format!("reading {}: {}", self.path.display(), err))
        })?;
        let events: Vec<PhotonEvent> = serde_json::from_str(&contents).map_err(|err| {
            AnalysisError::UpstreamData(format!("parsing {}: {}", self.path.display(), err))
        })?;

        if let Some(bad) = events
            .iter()
            .find(|e| !(e.energy.is_finite() && e.lon.is_finite() && e.lat.is_finite()))
        {
            return Err(AnalysisError::UpstreamData(format!(
                "malformed event record {:?} in {}",
                bad,
                self.path.display()
            )));
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn json_file_round_trips_events() {
        let temp = NamedTempFile::new().unwrap();
        let events = vec![
            PhotonEvent::new(150.0, 10.0, -5.0),
            PhotonEvent::new(2500.0, 359.5, 42.0),
        ];
        JsonEventFile::write(temp.path(), &events).unwrap();
        let loaded = JsonEventFile::new(temp.path()).load_photon_events().unwrap();
        assert_eq!(loaded, events);
    }

    #[test]
    fn json_file_accepts_upper_case_coordinate_columns() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(br#"[{"energy": 812.0, "L": 1.5, "B": -0.5}]"#)
            .unwrap();
        let loaded = JsonEventFile::new(temp.path()).load_photon_events().unwrap();
        assert_eq!(loaded, vec![PhotonEvent::new(812.0, 1.5, -0.5)]);
    }

    #[test]
    fn missing_file_is_upstream_error() {
        let err = JsonEventFile::new("/nonexistent/events.json")
            .load_photon_events()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamData(_)));
    }

    #[test]
    fn malformed_record_is_upstream_error() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(br#"[{"energy": 1.0, "lon": 2.0}]"#).unwrap();
        let err = JsonEventFile::new(temp.path())
            .load_photon_events()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamData(_)));
    }
}
