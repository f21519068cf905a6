//! Speaker-count selection via agglomerative clustering.
//!
//! Every candidate speaker count is produced by average-linkage
//! agglomerative clustering over cosine distances and scored with a cosine
//! silhouette. Selection is asymmetric: two speakers win on any
//! improvement, while a larger count must clear a margin over the running
//! best. Silhouette alone favors larger counts spuriously on noisy
//! embeddings; the margin keeps the model parsimonious for small-group
//! conversations.

use ndarray::Array2;
use tracing::debug;

use crate::config::ClusteringConfig;
use crate::cosine_distance;

/// A chosen partition of the embedding set
#[derive(Debug, Clone)]
pub struct SpeakerPartition {
    /// Chosen number of speakers
    pub num_speakers: usize,
    /// Cluster label per embedding, in `0..num_speakers`
    pub labels: Vec<usize>,
    /// Cosine silhouette of the winning partition, when one was scored
    pub silhouette: Option<f32>,
}

/// Pick the speaker count and partition for `embeddings` (at least 2).
///
/// Candidates `k` in `2..=min(max_speakers, n - 1)` are clustered on the
/// raw embeddings; scoring runs on per-dimension standardized copies. With
/// exactly two embeddings no candidate can be scored and each embedding
/// becomes its own speaker.
pub fn select_speaker_count(
    embeddings: &[Vec<f32>],
    config: &ClusteringConfig,
) -> SpeakerPartition {
    let n = embeddings.len();
    debug_assert!(n >= 2, "speaker selection needs at least two embeddings");

    let raw_distances = distance_matrix(embeddings);

    // Silhouette needs k < n, so with n == 2 the candidate range is empty
    let upper = config.max_speakers.min(n.saturating_sub(1));
    if upper < 2 {
        let labels = cluster_labels(&raw_distances, 2);
        return SpeakerPartition {
            num_speakers: 2,
            labels,
            silhouette: None,
        };
    }

    let standardized = standardize(embeddings);
    let scored_distances = distance_matrix(&standardized);

    let mut best: Option<(f32, usize, Vec<usize>)> = None;
    let mut first: Option<(f32, usize, Vec<usize>)> = None;
    let mut best_score = -1.0f32;

    for k in 2..=upper {
        let labels = cluster_labels(&raw_distances, k);
        let score = silhouette_score(&scored_distances, &labels, k);
        debug!("Candidate k={}: silhouette {:.3}", k, score);

        if first.is_none() {
            first = Some((score, k, labels.clone()));
        }
        if accepts(best_score, score, k, config.score_margin) {
            best_score = score;
            best = Some((score, k, labels));
        }
    }

    // If nothing ever beat the sentinel, fall back to the first candidate
    let (score, num_speakers, labels) = best
        .or(first)
        .expect("candidate range 2..=upper is non-empty");

    SpeakerPartition {
        num_speakers,
        labels,
        silhouette: Some(score),
    }
}

/// Asymmetric acceptance policy: two speakers win on any strict
/// improvement, more speakers must exceed the best by more than `margin`.
fn accepts(best_score: f32, score: f32, k: usize, margin: f32) -> bool {
    if k > 2 {
        score > best_score + margin
    } else {
        score > best_score
    }
}

/// Pairwise cosine distance matrix
fn distance_matrix(embeddings: &[Vec<f32>]) -> Array2<f32> {
    let n = embeddings.len();
    let mut distances = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = cosine_distance(&embeddings[i], &embeddings[j]);
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }
    distances
}

/// Standardize each dimension to zero mean and unit variance.
///
/// Dimensions with zero variance collapse to zero rather than dividing by
/// zero. Returns row vectors matching the input order.
fn standardize(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = embeddings.len();
    let dim = embeddings[0].len();

    let mut matrix = Array2::zeros((n, dim));
    for (i, embedding) in embeddings.iter().enumerate() {
        for (j, &v) in embedding.iter().enumerate() {
            matrix[[i, j]] = v;
        }
    }

    for j in 0..dim {
        let mut column = matrix.column_mut(j);
        let mean = column.sum() / n as f32;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32;
        let std = variance.sqrt();
        for v in column.iter_mut() {
            *v = if std > 0.0 { (*v - mean) / std } else { 0.0 };
        }
    }

    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

/// Average-linkage agglomerative clustering cut at exactly `k` clusters.
///
/// Bottom-up: repeatedly merge the pair of clusters with the smallest mean
/// inter-cluster distance until `k` remain. Labels are arbitrary integers
/// in `0..k`; the identity stage remaps them chronologically.
fn cluster_labels(distances: &Array2<f32>, k: usize) -> Vec<usize> {
    let n = distances.nrows();
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    while clusters.len() > k {
        let mut min_dist = f32::MAX;
        let mut pair = (0, 1);

        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let mut sum = 0.0;
                for &u in &clusters[i] {
                    for &v in &clusters[j] {
                        sum += distances[[u, v]];
                    }
                }
                let avg = sum / (clusters[i].len() * clusters[j].len()) as f32;
                if avg < min_dist {
                    min_dist = avg;
                    pair = (i, j);
                }
            }
        }

        let (i, j) = pair;
        let absorbed = clusters.swap_remove(j); // j > i, i unaffected
        clusters[i].extend(absorbed);
    }

    let mut labels = vec![0usize; n];
    for (cluster_id, members) in clusters.iter().enumerate() {
        for &member in members {
            labels[member] = cluster_id;
        }
    }
    labels
}

/// Mean silhouette coefficient over all samples.
///
/// For each sample: `a` is the mean distance to its own cluster (excluding
/// itself), `b` the smallest mean distance to any other cluster,
/// `s = (b - a) / max(a, b)`. Members of singleton clusters score zero.
fn silhouette_score(distances: &Array2<f32>, labels: &[usize], k: usize) -> f32 {
    let n = labels.len();
    let mut sizes = vec![0usize; k];
    for &label in labels {
        sizes[label] += 1;
    }

    let mut total = 0.0f32;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }

        let mut sums = vec![0.0f32; k];
        for j in 0..n {
            if j != i {
                sums[labels[j]] += distances[[i, j]];
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f32;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f32)
            .fold(f32::MAX, f32::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    total / n as f32
}
