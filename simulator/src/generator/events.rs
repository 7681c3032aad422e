use anyhow::{ensure, Context};
use gammacore::interface::PhotonEvent;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A synthetic point source: position in degrees and injected photon count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedSource {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub photons: usize,
}

/// Configuration for generating a synthetic photon sky.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub isotropic_photons: usize,
    pub disk_photons: usize,
    pub disk_scale_height_deg: f64,
    pub spectral_index: f64,
    /// Angular scatter applied to point-source photons.
    pub point_source_spread_deg: f64,
    pub point_sources: Vec<InjectedSource>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            isotropic_photons: 20_000,
            disk_photons: 30_000,
            disk_scale_height_deg: 5.0,
            spectral_index: 2.2,
            point_source_spread_deg: 0.5,
            point_sources: vec![
                InjectedSource {
                    name: "GC".into(),
                    lon: 0.0,
                    lat: 0.0,
                    photons: 2_000,
                },
                InjectedSource {
                    name: "Crab".into(),
                    lon: 184.56,
                    lat: -5.78,
                    photons: 1_500,
                },
            ],
        }
    }
}

impl GeneratorConfig {
    pub fn total_photons(&self) -> usize {
        self.isotropic_photons
            + self.disk_photons
            + self
                .point_sources
                .iter()
                .map(|src| src.photons)
                .sum::<usize>()
    }
}

/// Draws an energy from `E^-index` restricted to `[e_low, e_high]`.
pub fn sample_power_law<R: Rng>(rng: &mut R, e_low: f64, e_high: f64, index: f64) -> f64 {
    let u: f64 = rng.gen();
    if (index - 1.0).abs() < 1e-9 {
        return e_low * (e_high / e_low).powf(u);
    }
    let k = 1.0 - index;
    let (a, b) = (e_low.powf(k), e_high.powf(k));
    (a + u * (b - a)).powf(1.0 / k)
}

fn wrap_lon(lon: f64) -> f64 {
    lon.rem_euclid(360.0)
}

/// Photon list with an isotropic component, an exponential Galactic disk
/// and the configured point sources, all sharing one power-law spectrum.
pub fn generate_events(
    config: &GeneratorConfig,
    e_low: f64,
    e_high: f64,
) -> anyhow::Result<Vec<PhotonEvent>> {
    ensure!(
        e_low > 0.0 && e_high > e_low,
        "invalid generator energy range [{}, {}]",
        e_low,
        e_high
    );
    ensure!(
        config.disk_scale_height_deg > 0.0,
        "disk scale height must be positive"
    );

    let capacity = config.total_photons();
    let mut events = Vec::new();
    events
        .try_reserve(capacity)
        .context("reserving photon list for generator")?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    for _ in 0..config.isotropic_photons {
        let z: f64 = rng.gen_range(-1.0..1.0);
        let lon = rng.gen_range(0.0..360.0);
        let energy = sample_power_law(&mut rng, e_low, e_high, config.spectral_index);
        events.push(PhotonEvent::new(energy, lon, z.asin().to_degrees()));
    }

    for _ in 0..config.disk_photons {
        // Laplace-distributed latitude
        let u: f64 = rng.gen_range(-0.5..0.5);
        let lat = -config.disk_scale_height_deg * u.signum() * (1.0 - 2.0 * u.abs()).ln();
        let lat = lat.clamp(-89.9, 89.9);
        let lon = rng.gen_range(0.0..360.0);
        let energy = sample_power_law(&mut rng, e_low, e_high, config.spectral_index);
        events.push(PhotonEvent::new(energy, lon, lat));
    }

    let spread = config.point_source_spread_deg;
    for source in &config.point_sources {
        for _ in 0..source.photons {
            let (dl, db) = if spread > 0.0 {
                (rng.gen_range(-spread..spread), rng.gen_range(-spread..spread))
            } else {
                (0.0, 0.0)
            };
            let energy = sample_power_law(&mut rng, e_low, e_high, config.spectral_index);
            let lat = (source.lat + db).clamp(-90.0, 90.0);
            events.push(PhotonEvent::new(energy, wrap_lon(source.lon + dl), lat));
        }
    }

    Ok(events)
}
