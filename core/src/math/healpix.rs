//! HEALPix RING-scheme pixelization (Górski et al. 2005).
//!
//! Pixel `p` of `12 * nside^2` is numbered ring by ring from the north pole,
//! increasing in longitude within each ring.

use crate::interface::Pixelization;
use crate::prelude::{AnalysisError, AnalysisResult};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingPixelization {
    nside: usize,
}

impl RingPixelization {
    pub fn new(nside: usize) -> AnalysisResult<Self> {
        // 12 * nside^2 must fit comfortably in an index
        if nside == 0 || nside > (1 << 29) {
            return Err(AnalysisError::Configuration(format!(
                "nside must be in 1..=2^29, got {}",
                nside
            )));
        }
        Ok(Self { nside })
    }

    fn ang2pix(&self, lon_deg: f64, lat_deg: f64) -> AnalysisResult<usize> {
        if !lon_deg.is_finite() || !lat_deg.is_finite() || lat_deg.abs() > 90.0 {
            return Err(AnalysisError::UpstreamData(format!(
                "invalid sky position (lon {}, lat {})",
                lon_deg, lat_deg
            )));
        }

        let nside = self.nside as i64;
        let z = lat_deg.to_radians().sin();
        let za = z.abs();
        let phi = lon_deg.to_radians().rem_euclid(TAU);
        let tt = phi / FRAC_PI_2;

        let pix = if za <= 2.0 / 3.0 {
            let temp1 = nside as f64 * (0.5 + tt);
            let temp2 = nside as f64 * z * 0.75;
            let jp = (temp1 - temp2) as i64;
            let jm = (temp1 + temp2) as i64;
            let ir = nside + 1 + jp - jm;
            let kshift = 1 - (ir & 1);
            let ip = ((jp + jm - nside + kshift + 1) / 2).rem_euclid(4 * nside);
            let ncap = 2 * nside * (nside - 1);
            ncap + (ir - 1) * 4 * nside + ip
        } else {
            let tp = tt - tt.floor();
            let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
            let jp = (tp * tmp) as i64;
            let jm = ((1.0 - tp) * tmp) as i64;
            let ir = jp + jm + 1;
            let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);
            if z > 0.0 {
                2 * ir * (ir - 1) + ip
            } else {
                self.npix() as i64 - 2 * ir * (ir + 1) + ip
            }
        };
        Ok(pix as usize)
    }

    fn pix2ang(&self, pix: usize) -> AnalysisResult<(f64, f64)> {
        let npix = self.npix();
        if pix >= npix {
            return Err(AnalysisError::UpstreamData(format!(
                "pixel {} out of range for nside {}",
                pix, self.nside
            )));
        }

        let nside = self.nside as i64;
        let npix = npix as i64;
        let pix = pix as i64;
        let ncap = 2 * nside * (nside - 1);
        let fact2 = 4.0 / npix as f64;

        let (z, phi) = if pix < ncap {
            let iring = (1 + isqrt(1 + 2 * pix)) >> 1;
            let iphi = pix + 1 - 2 * iring * (iring - 1);
            let z = 1.0 - (iring * iring) as f64 * fact2;
            (z, (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64)
        } else if pix < npix - ncap {
            let ip = pix - ncap;
            let iring = ip / (4 * nside) + nside;
            let iphi = ip % (4 * nside) + 1;
            let fodd = if (iring + nside) & 1 == 1 { 1.0 } else { 0.5 };
            let z = (2 * nside - iring) as f64 * 2.0 / (3.0 * nside as f64);
            (z, (iphi as f64 - fodd) * PI / (2.0 * nside as f64))
        } else {
            let ip = npix - pix;
            let iring = (1 + isqrt(2 * ip - 1)) >> 1;
            let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
            let z = -1.0 + (iring * iring) as f64 * fact2;
            (z, (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64)
        };

        let lat = z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = phi.to_degrees().rem_euclid(360.0);
        Ok((lon, lat))
    }
}

fn isqrt(value: i64) -> i64 {
    let mut root = (value as f64).sqrt() as i64;
    while root * root > value {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}

impl Pixelization for RingPixelization {
    fn nside(&self) -> usize {
        self.nside
    }

    fn angle_to_pixel(&self, lon: &[f64], lat: &[f64]) -> AnalysisResult<Vec<usize>> {
        if lon.len() != lat.len() {
            return Err(AnalysisError::UpstreamData(format!(
                "{} longitudes but {} latitudes",
                lon.len(),
                lat.len()
            )));
        }
        lon.iter()
            .zip(lat)
            .map(|(&l, &b)| self.ang2pix(l, b))
            .collect()
    }

    fn pixel_to_angle(&self, pixels: &[usize]) -> AnalysisResult<(Vec<f64>, Vec<f64>)> {
        let mut lon = Vec::with_capacity(pixels.len());
        let mut lat = Vec::with_capacity(pixels.len());
        for &pix in pixels {
            let (l, b) = self.pix2ang(pix)?;
            lon.push(l);
            lat.push(b);
        }
        Ok((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pixel_count_follows_nside() {
        assert_eq!(RingPixelization::new(1).unwrap().npix(), 12);
        assert_eq!(RingPixelization::new(4).unwrap().npix(), 192);
    }

    #[test]
    fn zero_nside_is_rejected() {
        assert!(matches!(
            RingPixelization::new(0),
            Err(AnalysisError::Configuration(_))
        ));
    }

    #[test]
    fn nside_one_pixel_centres() {
        let pix = RingPixelization::new(1).unwrap();
        let (lon, lat) = pix.pixel_to_angle(&[0, 4, 7, 11]).unwrap();
        let cap_lat = (2.0f64 / 3.0).asin().to_degrees();

        assert_relative_eq!(lon[0], 45.0, epsilon = 1e-9);
        assert_relative_eq!(lat[0], cap_lat, epsilon = 1e-9);
        assert_relative_eq!(lon[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(lat[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(lon[2], 270.0, epsilon = 1e-9);
        assert_relative_eq!(lon[3], 315.0, epsilon = 1e-9);
        assert_relative_eq!(lat[3], -cap_lat, epsilon = 1e-9);
    }

    #[test]
    fn pixel_centres_round_trip() {
        for nside in [1, 2, 4, 8] {
            let pix = RingPixelization::new(nside).unwrap();
            let (lon, lat) = pix.pixel_centres().unwrap();
            let back = pix.angle_to_pixel(&lon, &lat).unwrap();
            let expected: Vec<usize> = (0..pix.npix()).collect();
            assert_eq!(back, expected, "nside {}", nside);
        }
    }

    #[test]
    fn poles_and_wraparound_map_inside_range() {
        let pix = RingPixelization::new(4).unwrap();
        let found = pix
            .angle_to_pixel(&[0.0, 0.0, -10.0, 370.0], &[90.0, -90.0, 5.0, 5.0])
            .unwrap();
        assert!(found.iter().all(|&p| p < pix.npix()));
        assert_eq!(found[2], pix.angle_to_pixel(&[350.0], &[5.0]).unwrap()[0]);
        assert_eq!(found[3], pix.angle_to_pixel(&[10.0], &[5.0]).unwrap()[0]);
    }

    #[test]
    fn invalid_latitude_is_upstream_error() {
        let pix = RingPixelization::new(2).unwrap();
        let err = pix.angle_to_pixel(&[0.0], &[91.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::UpstreamData(_)));
    }

    #[test]
    fn pixels_are_equal_area() {
        // Every ring pixel is the same area, so uniformly spaced sample
        // points in z and phi land roughly evenly across pixels.
        let pix = RingPixelization::new(2).unwrap();
        let mut counts = vec![0usize; pix.npix()];
        let steps = 240;
        let mut lon = Vec::new();
        let mut lat = Vec::new();
        for i in 0..steps {
            let z = -1.0 + (i as f64 + 0.5) * 2.0 / steps as f64;
            for j in 0..steps {
                lon.push((j as f64 + 0.5) * 360.0 / steps as f64);
                lat.push(z.asin().to_degrees());
            }
        }
        for p in pix.angle_to_pixel(&lon, &lat).unwrap() {
            counts[p] += 1;
        }
        let mean = (steps * steps) as f64 / pix.npix() as f64;
        assert!(counts
            .iter()
            .all(|&c| (c as f64 - mean).abs() < 0.1 * mean));
    }
}
