//! Integration tests: structural properties of the dendrograms on randomly
//! generated sharing data.
//!
//! Sharing values are drawn from a handful of discrete levels so that many
//! pairs tie exactly, and roughly a third of the pairs inside each network
//! are left unobserved.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use ibd_dendrogram_core::data::{NetworkRow, PairwiseRow};
use ibd_dendrogram_core::{
    build_dendrograms, DendrogramConfig, DendrogramRequest, DistanceTransform, Linkage, RunOutput,
};

const LEVELS: [f64; 4] = [0.05, 0.1, 0.2, 0.4];

/// Random dataset: `sizes[k]` individuals in network `k`, plus a few
/// cross-network edges.
fn random_dataset(seed: u64, sizes: &[usize]) -> (Vec<PairwiseRow>, Vec<NetworkRow>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairwise = Vec::new();
    let mut networks = Vec::new();
    let mut all = Vec::new();

    for (k, &size) in sizes.iter().enumerate() {
        let ids: Vec<String> = (0..size).map(|i| format!("N{}_{:03}", k, i)).collect();
        for id in &ids {
            networks.push(NetworkRow::new(id.as_str(), k.to_string()));
        }
        for i in 0..size {
            for j in (i + 1)..size {
                if rng.gen_bool(0.65) {
                    let s = *LEVELS.choose(&mut rng).unwrap_or(&0.1);
                    pairwise.push(PairwiseRow::new(ids[i].as_str(), ids[j].as_str(), s));
                }
            }
        }
        all.push(ids);
    }

    let n_cross = if all.len() > 1 { 3 } else { 0 };
    for _ in 0..n_cross {
        let a = &all[0][rng.gen_range(0..all[0].len())];
        let b = &all[1][rng.gen_range(0..all[1].len())];
        pairwise.push(PairwiseRow::new(a.as_str(), b.as_str(), 0.05));
    }

    (pairwise, networks)
}

fn shuffled(
    seed: u64,
    pairwise: &[PairwiseRow],
    networks: &[NetworkRow],
) -> (Vec<PairwiseRow>, Vec<NetworkRow>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairwise: Vec<PairwiseRow> = pairwise
        .iter()
        .map(|row| {
            if rng.gen_bool(0.5) {
                PairwiseRow::new(row.id2.as_str(), row.id1.as_str(), row.sharing)
            } else {
                row.clone()
            }
        })
        .collect();
    let mut networks = networks.to_vec();
    pairwise.shuffle(&mut rng);
    networks.shuffle(&mut rng);
    (pairwise, networks)
}

fn run(
    pairwise: Vec<PairwiseRow>,
    networks: Vec<NetworkRow>,
    config: DendrogramConfig,
) -> RunOutput {
    build_dendrograms(&DendrogramRequest::new(pairwise, networks).config(config)).unwrap()
}

#[test]
fn test_merge_count_and_monotonic_heights() {
    let sizes = [12, 7, 1, 25];
    let (pairwise, networks) = random_dataset(7, &sizes);

    for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average, Linkage::Ward] {
        let output = run(
            pairwise.clone(),
            networks.clone(),
            DendrogramConfig::new().linkage(linkage),
        );
        assert!(output.is_complete());
        // Three random cross-network edges, possibly repeating a pair.
        assert!((1..=3).contains(&output.anomalies.len()));
        assert_eq!(output.set.len(), sizes.len());
        assert_eq!(output.set.n_individuals(), sizes.iter().sum::<usize>());

        for (k, &size) in sizes.iter().enumerate() {
            let layout = &output.set.get(&k.to_string()).unwrap().layout;
            assert_eq!(layout.n_leaves(), size);
            assert_eq!(layout.linkage().len(), size - 1);
            assert!(layout.is_monotonic(), "{} linkage not monotonic", linkage);
            if let Some(root) = layout.linkage().last() {
                assert_eq!(root.size, size);
            }

            let mut order = layout.leaf_order().to_vec();
            order.sort_unstable();
            assert_eq!(order, (0..size).collect::<Vec<_>>());
        }
    }
}

#[test]
fn test_shuffled_input_gives_identical_dendrograms() {
    let (pairwise, networks) = random_dataset(42, &[15, 9, 30]);

    for linkage in [Linkage::Single, Linkage::Average, Linkage::Ward] {
        let config = DendrogramConfig::new()
            .linkage(linkage)
            .transform(DistanceTransform::negative_log());
        let reference = run(pairwise.clone(), networks.clone(), config.clone());

        for seed in 0..5 {
            let (p, n) = shuffled(seed, &pairwise, &networks);
            let output = run(p, n, config.clone());
            for (network_id, expected) in reference.set.iter() {
                let actual = output.set.get(network_id).unwrap();
                assert_eq!(actual.layout, expected.layout, "network {} differs", network_id);
            }
        }
    }
}

#[test]
fn test_parallel_matches_serial() {
    let (pairwise, networks) = random_dataset(3, &[10, 10, 6, 8, 4, 12]);

    let serial = run(
        pairwise.clone(),
        networks.clone(),
        DendrogramConfig::new().parallel(false),
    );
    let parallel = run(pairwise, networks, DendrogramConfig::new().parallel(true));

    assert_eq!(serial.set, parallel.set);
    assert_eq!(serial.anomalies, parallel.anomalies);
    assert_eq!(
        serial.set.network_ids().collect::<Vec<_>>(),
        vec!["0", "1", "2", "3", "4", "5"]
    );
}

#[test]
fn test_cut_and_cophenetic_agree() {
    let (pairwise, networks) = random_dataset(11, &[20]);
    let output = run(pairwise, networks, DendrogramConfig::new());
    let layout = &output.set.get("0").unwrap().layout;

    for row in layout.linkage() {
        let clusters = layout.cut(row.distance);
        let n_clusters = clusters.iter().max().map_or(0, |m| m + 1);
        assert_eq!(n_clusters, layout.n_clusters_at(row.distance));

        for a in 0..layout.n_leaves() {
            for b in 0..layout.n_leaves() {
                let joined = layout.cophenetic(a, b).unwrap() <= row.distance;
                assert_eq!(joined, clusters[a] == clusters[b]);
            }
        }
    }
}
