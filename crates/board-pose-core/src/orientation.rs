//! Orientation clustering for ChESS-style angles defined modulo π.
//!
//! A chessboard seen under moderate perspective produces corners whose
//! diagonal orientations fall into two dominant modes. This module finds the
//! two modes on the π-periodic circle and assigns every corner to mode 0, 1 or
//! `None` (outlier). Purely angular; no geometry here.

use crate::Corner;
use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Parameters for orientation clustering.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OrientationClusteringParams {
    /// Number of histogram bins on [0, π).
    pub num_bins: usize,
    /// Max circular 2-means iterations.
    pub max_iters: usize,
    /// Minimal separation between the two seed peaks (degrees).
    pub peak_min_separation_deg: f32,
    /// Max distance from the nearest center before a corner is an outlier (degrees).
    pub outlier_threshold_deg: f32,
    /// Minimal weight of a peak, as a fraction of the total weight.
    pub min_peak_weight_fraction: f32,
    /// Weight corners by detector strength.
    pub use_weights: bool,
}

impl Default for OrientationClusteringParams {
    fn default() -> Self {
        Self {
            num_bins: 90,
            max_iters: 10,
            peak_min_separation_deg: 10.0,
            outlier_threshold_deg: 30.0,
            min_peak_weight_fraction: 0.05,
            use_weights: true,
        }
    }
}

/// Result of orientation clustering.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrientationClusteringResult {
    /// Cluster centers in [0, π).
    pub centers: [f32; 2],
    /// Per-corner cluster label, `None` for outliers.
    pub labels: Vec<Option<usize>>,
    /// Total weight per cluster (outliers excluded).
    pub cluster_weights: [f32; 2],
}

impl OrientationClusteringParams {
    #[inline]
    fn weight(&self, c: &Corner) -> f32 {
        if self.use_weights {
            c.strength.max(0.0)
        } else {
            1.0
        }
    }
}

/// Cluster corner orientations into two dominant directions on [0, π).
pub fn cluster_orientations(
    corners: &[Corner],
    params: &OrientationClusteringParams,
) -> Option<OrientationClusteringResult> {
    if corners.is_empty() || params.num_bins < 4 {
        debug!(
            "orientation clustering skipped: {} corners, {} bins",
            corners.len(),
            params.num_bins
        );
        return None;
    }

    let hist = Histogram::build(corners, params)?;
    let mut peaks: Vec<Peak> = find_local_maxima(&hist.values)
        .into_iter()
        .map(|bin| Peak::grow(&hist, bin))
        .collect();

    let min_peak_weight = hist.total_weight * params.min_peak_weight_fraction;
    peaks.retain(|p| p.weight >= min_peak_weight);
    peaks.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    if peaks.len() < 2 {
        debug!(
            "only {} orientation peaks above {min_peak_weight:.2}",
            peaks.len()
        );
        return None;
    }

    let first = peaks[0].mean_angle(corners, &hist.corner_bins, params);
    let min_sep = params.peak_min_separation_deg.to_radians();
    let second = peaks[1..]
        .iter()
        .map(|p| p.mean_angle(corners, &hist.corner_bins, params))
        .find(|&cand| angular_dist_pi(first, cand) >= min_sep)?;

    let mut centers = [first, second];
    let mut labels: Vec<Option<usize>> = vec![None; corners.len()];
    let outlier_threshold = params.outlier_threshold_deg.to_radians();

    for _ in 0..params.max_iters {
        let mut changed = false;
        for (label, c) in labels.iter_mut().zip(corners) {
            let t = wrap_angle_pi(c.orientation);
            let d0 = angular_dist_pi(t, centers[0]);
            let d1 = angular_dist_pi(t, centers[1]);
            let (cluster, dist) = if d0 <= d1 { (0, d0) } else { (1, d1) };
            let new_label = (dist <= outlier_threshold).then_some(cluster);
            if *label != new_label {
                *label = new_label;
                changed = true;
            }
        }

        let mut sums = [Vector2::<f32>::zeros(); 2];
        for (label, c) in labels.iter().zip(corners) {
            if let Some(k) = label {
                sums[*k] += params.weight(c) * doubled(c.orientation);
            }
        }
        for (center, sum) in centers.iter_mut().zip(sums.iter()) {
            if sum.norm_squared() > 0.0 {
                *center = wrap_angle_pi(0.5 * sum.y.atan2(sum.x));
            }
        }

        if !changed {
            break;
        }
    }

    let mut cluster_weights = [0.0f32; 2];
    for (label, c) in labels.iter().zip(corners) {
        if let Some(k) = label {
            cluster_weights[*k] += params.weight(c);
        }
    }

    Some(OrientationClusteringResult {
        centers,
        labels,
        cluster_weights,
    })
}

struct Histogram {
    values: Vec<f32>,
    total_weight: f32,
    corner_bins: Vec<usize>,
}

impl Histogram {
    fn build(corners: &[Corner], params: &OrientationClusteringParams) -> Option<Self> {
        let n = params.num_bins;
        let mut raw = vec![0.0f32; n];
        let mut total_weight = 0.0f32;
        let mut corner_bins = Vec::with_capacity(corners.len());

        for c in corners {
            let bin = angle_to_bin(c.orientation, n);
            let w = params.weight(c);
            raw[bin] += w;
            total_weight += w;
            corner_bins.push(bin);
        }
        if total_weight <= 0.0 {
            return None;
        }

        // Circular [1, 4, 6, 4, 1] / 16 smoothing.
        const K: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
        let values = (0..n)
            .map(|i| {
                K.iter()
                    .enumerate()
                    .map(|(k, &w)| {
                        let j = (i as isize + k as isize - 2).rem_euclid(n as isize) as usize;
                        w * raw[j]
                    })
                    .sum::<f32>()
                    / 16.0
            })
            .collect();

        Some(Self {
            values,
            total_weight,
            corner_bins,
        })
    }

    fn bin_center(&self, bin: usize) -> f32 {
        (bin as f32 + 0.5) * PI / self.values.len() as f32
    }
}

/// A histogram mode together with the monotonically decreasing bins around it.
struct Peak {
    bins: Vec<usize>,
    weight: f32,
    fallback_angle: f32,
}

impl Peak {
    fn grow(hist: &Histogram, peak_bin: usize) -> Self {
        let h = &hist.values;
        let n = h.len();
        let mut bins = vec![peak_bin];

        let mut i = (peak_bin + n - 1) % n;
        while i != peak_bin && h[i] > 0.0 && h[i] <= h[(i + 1) % n] {
            bins.push(i);
            i = (i + n - 1) % n;
        }
        let mut i = (peak_bin + 1) % n;
        while i != peak_bin && h[i] > 0.0 && h[i] <= h[(i + n - 1) % n] {
            bins.push(i);
            i = (i + 1) % n;
        }
        bins.sort_unstable();
        bins.dedup();

        let mut weight = 0.0f32;
        let mut sum = Vector2::<f32>::zeros();
        for &b in &bins {
            let t = hist.bin_center(b);
            weight += h[b];
            sum += h[b] * Vector2::new(t.cos(), t.sin());
        }

        Self {
            bins,
            weight,
            fallback_angle: wrap_angle_pi(sum.y.atan2(sum.x)),
        }
    }

    /// Weighted circular mean of the raw corner angles falling into this peak.
    fn mean_angle(
        &self,
        corners: &[Corner],
        corner_bins: &[usize],
        params: &OrientationClusteringParams,
    ) -> f32 {
        let mut sum = Vector2::<f32>::zeros();
        for (c, bin) in corners.iter().zip(corner_bins) {
            if self.bins.binary_search(bin).is_ok() {
                sum += params.weight(c) * doubled(c.orientation);
            }
        }
        if sum.norm_squared() > 0.0 {
            wrap_angle_pi(0.5 * sum.y.atan2(sum.x))
        } else {
            self.fallback_angle
        }
    }
}

/// Unit vector at twice the angle; averaging these respects the π period.
#[inline]
fn doubled(theta: f32) -> Vector2<f32> {
    let t = 2.0 * theta;
    Vector2::new(t.cos(), t.sin())
}

/// Wrap an angle to [0, π).
fn wrap_angle_pi(theta: f32) -> f32 {
    let t = theta.rem_euclid(PI);
    if t >= PI {
        0.0
    } else {
        t
    }
}

/// Smallest distance on the π-periodic circle, in [0, π/2].
fn angular_dist_pi(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(PI);
    if d > FRAC_PI_2 {
        PI - d
    } else {
        d
    }
}

fn angle_to_bin(theta: f32, num_bins: usize) -> usize {
    let x = wrap_angle_pi(theta) / PI * num_bins as f32;
    (x.floor().max(0.0) as usize).min(num_bins - 1)
}

/// Indices of local maxima on a circular array.
fn find_local_maxima(hist: &[f32]) -> Vec<usize> {
    let n = hist.len();
    (0..n)
        .filter(|&i| {
            let prev = hist[(i + n - 1) % n];
            let next = hist[(i + 1) % n];
            hist[i] > 0.0 && hist[i] >= prev && hist[i] >= next
        })
        .collect()
}
