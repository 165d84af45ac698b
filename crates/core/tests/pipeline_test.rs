//! Integration tests: end-to-end dendrogram runs over small hand-checked
//! datasets.
//!
//! Dataset used by most tests (sharing fractions, linear transform):
//!   A-B 0.5  -> distance 0.5
//!   B-C 0.3  -> distance 0.7
//!   A-C 0.1  -> distance 0.9
//!
//! Single linkage merges (A,B) at 0.5, then C at min(0.9, 0.7) = 0.7.
//! Complete linkage joins C at max(0.9, 0.7) = 0.9, average at 0.8.

use approx::assert_relative_eq;

use ibd_dendrogram_core::data::{
    read_networks_from, read_pairwise_from, NetworkRow, NetworkSchema, PairwiseRow,
    PairwiseSchema,
};
use ibd_dendrogram_core::network::Anomaly;
use ibd_dendrogram_core::{
    build_dendrograms, DendroError, DendrogramConfig, DendrogramRequest, DistanceTransform,
    DuplicatePolicy, Linkage, LinkageRow, MissingDistance,
};

fn pairs(edges: &[(&str, &str, f64)]) -> Vec<PairwiseRow> {
    edges
        .iter()
        .map(|&(a, b, s)| PairwiseRow::new(a, b, s))
        .collect()
}

fn networks(assignments: &[(&str, &str)]) -> Vec<NetworkRow> {
    assignments
        .iter()
        .map(|&(i, n)| NetworkRow::new(i, n))
        .collect()
}

fn abc_request(linkage: Linkage) -> DendrogramRequest {
    DendrogramRequest::new(
        pairs(&[("A", "B", 0.5), ("B", "C", 0.3), ("A", "C", 0.1)]),
        networks(&[("A", "1"), ("B", "1"), ("C", "1")]),
    )
    .config(DendrogramConfig::new().linkage(linkage))
}

#[test]
fn test_single_linkage_scenario() {
    let output = build_dendrograms(&abc_request(Linkage::Single)).unwrap();
    let result = output.set.get("1").unwrap();

    assert_eq!(result.leaf_count, 3);
    assert_eq!(result.layout.labels(), &["A", "B", "C"]);
    assert_eq!(
        result.layout.linkage(),
        &[
            LinkageRow { left: 0, right: 1, distance: 0.5, size: 2 },
            LinkageRow { left: 2, right: 3, distance: 0.7, size: 3 },
        ]
    );
    assert_eq!(result.layout.ordered_labels(), vec!["C", "A", "B"]);
}

#[test]
fn test_linkage_heights() {
    for (linkage, root) in [
        (Linkage::Single, 0.7),
        (Linkage::Complete, 0.9),
        (Linkage::Average, 0.8),
    ] {
        let output = build_dendrograms(&abc_request(linkage)).unwrap();
        let layout = &output.set.get("1").unwrap().layout;
        assert_relative_eq!(layout.linkage()[0].distance, 0.5);
        assert_relative_eq!(layout.height(), root, epsilon = 1e-12);
    }
}

#[test]
fn test_ward_merges_closest_pair_first() {
    let output = build_dendrograms(&abc_request(Linkage::Ward)).unwrap();
    let layout = &output.set.get("1").unwrap().layout;
    assert_eq!((layout.linkage()[0].left, layout.linkage()[0].right), (0, 1));
    assert_relative_eq!(layout.linkage()[0].distance, 0.5);
    // sqrt((2 * 0.9^2 + 2 * 0.7^2 - 0.5^2) / 3)
    assert_relative_eq!(layout.height(), (2.35f64 / 3.0).sqrt(), epsilon = 1e-12);
    assert!(layout.is_monotonic());
}

#[test]
fn test_singleton_network() {
    let request = DendrogramRequest::new(
        pairs(&[("A", "B", 0.5)]),
        networks(&[("A", "1"), ("B", "1"), ("D", "2")]),
    );
    let output = build_dendrograms(&request).unwrap();

    let single = output.set.get("2").unwrap();
    assert_eq!(single.leaf_count, 1);
    assert!(single.layout.linkage().is_empty());
    assert_eq!(single.layout.ordered_labels(), vec!["D"]);
    assert_eq!(single.layout.to_newick(), "D;");
}

#[test]
fn test_duplicate_max_policy() {
    let rows = pairs(&[("A", "B", 0.4), ("B", "A", 0.6)]);
    let members = networks(&[("A", "1"), ("B", "1")]);

    let request = DendrogramRequest::new(rows.clone(), members.clone())
        .config(DendrogramConfig::new().duplicate_policy(DuplicatePolicy::Max));
    let output = build_dendrograms(&request).unwrap();
    let layout = &output.set.get("1").unwrap().layout;
    assert_relative_eq!(layout.height(), 0.4, epsilon = 1e-12);

    let request = DendrogramRequest::new(rows, members);
    let err = build_dendrograms(&request).unwrap_err();
    assert!(matches!(err, DendroError::DuplicateConflict { .. }));
}

#[test]
fn test_cross_network_edge_is_reported() {
    let request = DendrogramRequest::new(
        pairs(&[("A", "B", 0.5), ("A", "C", 0.2)]),
        networks(&[("A", "1"), ("B", "1"), ("C", "2")]),
    );
    let output = build_dendrograms(&request).unwrap();

    assert_eq!(output.set.len(), 2);
    assert_eq!(output.anomalies.len(), 1);
    match &output.anomalies[0] {
        Anomaly::CrossNetworkEdge {
            a,
            b,
            network_a,
            network_b,
            sharing,
        } => {
            assert_eq!((a.as_str(), b.as_str()), ("A", "C"));
            assert_eq!((network_a.as_str(), network_b.as_str()), ("1", "2"));
            assert_eq!(*sharing, 0.2);
        }
        other => panic!("unexpected anomaly {:?}", other),
    }
    // Network 1 only sees A-B.
    assert_relative_eq!(output.set.get("1").unwrap().layout.height(), 0.5);
}

#[test]
fn test_conflicting_network_assignment() {
    let request = DendrogramRequest::new(
        pairs(&[("A", "B", 0.5)]),
        networks(&[("A", "1"), ("B", "1"), ("A", "2")]),
    );
    let err = build_dendrograms(&request).unwrap_err();
    assert!(matches!(
        err,
        DendroError::NetworkConflict { individual, .. } if individual == "A"
    ));
}

#[test]
fn test_missing_pair_uses_sentinel() {
    // C has no observed pair; it joins at the linear ceiling.
    let request = DendrogramRequest::new(
        pairs(&[("A", "B", 0.5)]),
        networks(&[("A", "1"), ("B", "1"), ("C", "1")]),
    );
    let output = build_dendrograms(&request).unwrap();
    let layout = &output.set.get("1").unwrap().layout;
    assert_relative_eq!(layout.height(), 1.0);

    // Half of a 0.2 detection threshold: sharing 0.1, distance 0.9.
    let request = request.config(
        DendrogramConfig::new().missing(MissingDistance::HalfThreshold { threshold: 0.2 }),
    );
    let output = build_dendrograms(&request).unwrap();
    let layout = &output.set.get("1").unwrap().layout;
    assert_relative_eq!(layout.height(), 0.9, epsilon = 1e-12);
}

#[test]
fn test_insufficient_data_is_isolated() {
    let transform = DistanceTransform::custom("inverse", |s| {
        if s <= 0.0 {
            f64::INFINITY
        } else {
            1.0 / s - 1.0
        }
    });
    let request = DendrogramRequest::new(
        pairs(&[("A", "B", 0.5), ("C", "D", 0.25)]),
        networks(&[("A", "1"), ("B", "1"), ("C", "2"), ("D", "2"), ("E", "2")]),
    )
    .config(DendrogramConfig::new().transform(transform));

    let output = build_dendrograms(&request).unwrap();
    assert!(!output.is_complete());
    assert_eq!(output.set.len(), 1);
    assert_relative_eq!(output.set.get("1").unwrap().layout.height(), 1.0);

    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].network_id, "2");
    assert_eq!(output.failures[0].members, vec!["C", "D", "E"]);
}

#[test]
fn test_transforms_change_heights_not_topology() {
    let base = build_dendrograms(&abc_request(Linkage::Single)).unwrap();
    for transform in [DistanceTransform::negative_log(), DistanceTransform::reciprocal()] {
        let request = abc_request(Linkage::Single)
            .config(DendrogramConfig::new().linkage(Linkage::Single).transform(transform));
        let output = build_dendrograms(&request).unwrap();
        let layout = &output.set.get("1").unwrap().layout;
        let expected = &base.set.get("1").unwrap().layout;
        assert_eq!(layout.ordered_labels(), expected.ordered_labels());
        for (row, other) in layout.linkage().iter().zip(expected.linkage()) {
            assert_eq!((row.left, row.right, row.size), (other.left, other.right, other.size));
        }
    }
}

#[test]
fn test_tables_to_dendrograms() {
    let pair_table = "pair_1\tpair_2\tlength\nA\tB\t1772.5\nB\tC\t1063.5\nA\tC\t354.5\n";
    let network_table = "individual\tnetwork\nA,B,C\t5\n";

    let pairwise = read_pairwise_from(pair_table.as_bytes(), &PairwiseSchema::default()).unwrap();
    let members = read_networks_from(network_table.as_bytes(), &NetworkSchema::default()).unwrap();
    let request = DendrogramRequest::new(pairwise, members)
        .config(DendrogramConfig::new().linkage(Linkage::Single));

    let output = build_dendrograms(&request).unwrap();
    let layout = &output.set.get("5").unwrap().layout;
    assert_relative_eq!(layout.linkage()[0].distance, 0.5, epsilon = 1e-12);
    assert_relative_eq!(layout.height(), 0.7, epsilon = 1e-12);

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["set"]["5"]["leaf_count"], 3);
    assert!(json["anomalies"].as_array().unwrap().is_empty());
}
