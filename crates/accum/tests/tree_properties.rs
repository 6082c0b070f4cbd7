use accum::{root_from_leaves, CommitmentTree, EmptyDigests, TreeError};
use primitives::{hash_node, Commitment, Digest};
use rand::{rngs::StdRng, RngCore, SeedableRng};

fn rand_cm(rng: &mut StdRng) -> Commitment {
    let mut b = [0u8; 32];
    rng.fill_bytes(&mut b);
    Commitment(b)
}

fn rand_log(seed: u64, n: usize) -> Vec<Commitment> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rand_cm(&mut rng)).collect()
}

#[test]
fn incremental_root_matches_log_reconstruction() {
    for depth in 1..=6u8 {
        let cap = 1usize << depth;
        let log = rand_log(depth as u64, cap);
        let mut tree = CommitmentTree::new(depth).unwrap();
        assert_eq!(tree.root(), root_from_leaves(depth, &[]).unwrap());
        for (i, cm) in log.iter().enumerate() {
            assert_eq!(tree.insert(*cm).unwrap(), i as u64);
            assert_eq!(tree.root(), root_from_leaves(depth, &log[..=i]).unwrap(), "depth {depth} after {} leaves", i + 1);
        }
    }
}

#[test]
fn every_path_reproduces_root() {
    let log = rand_log(7, 23);
    let tree = CommitmentTree::from_commitments(5, log.iter().copied()).unwrap();
    let root = tree.root();
    for (i, cm) in log.iter().enumerate() {
        let path = tree.path_for(i as u64).unwrap();
        assert_eq!(path.depth(), 5);
        assert_eq!(path.compute_root(cm), root);
        assert!(path.verify(cm, &root));
    }
}

#[test]
fn paths_are_stable_until_next_insert() {
    let mut tree = CommitmentTree::from_commitments(4, rand_log(3, 5)).unwrap();
    let first = tree.path_for(4).unwrap();
    assert_eq!(tree.path_for(4).unwrap(), first);
    assert_eq!(tree.path_for(4).unwrap(), first);

    // Leaf 5 is the right sibling of leaf 4, so its path must change.
    tree.insert(Commitment([0xaa; 32])).unwrap();
    let after = tree.path_for(4).unwrap();
    assert_ne!(after, first);
    assert_eq!(after.siblings[0], Digest([0xaa; 32]));
}

#[test]
fn full_tree_and_out_of_range() {
    let mut tree = CommitmentTree::from_commitments(3, rand_log(1, 8)).unwrap();
    assert!(tree.is_full());
    assert_eq!(tree.insert(Commitment([1; 32])), Err(TreeError::TreeFull { capacity: 8 }));
    assert!(tree.path_for(7).is_ok());
    assert_eq!(tree.path_for(8), Err(TreeError::IndexOutOfRange { index: 8, filled: 8 }));

    let partial = CommitmentTree::from_commitments(3, rand_log(1, 3)).unwrap();
    assert_eq!(partial.path_for(3), Err(TreeError::IndexOutOfRange { index: 3, filled: 3 }));
    assert!(CommitmentTree::from_commitments(3, rand_log(1, 9)).is_err());
    assert!(root_from_leaves(3, &rand_log(1, 9)).is_err());
}

#[test]
fn identical_logs_give_identical_trees() {
    let log = rand_log(99, 13);
    let mut a = CommitmentTree::new(6).unwrap();
    let mut b = CommitmentTree::new(6).unwrap();
    for cm in &log {
        a.insert(*cm).unwrap();
    }
    // Interleave reads on b; they must not influence state.
    for cm in &log {
        let _ = b.root();
        b.insert(*cm).unwrap();
        let _ = b.path_for(0);
    }
    assert_eq!(a.root(), b.root());
    for i in 0..log.len() as u64 {
        assert_eq!(a.path_for(i).unwrap(), b.path_for(i).unwrap());
    }
}

#[test]
fn depth_three_scenario() {
    // c0..c4 in a capacity-8 tree; slots 5..7 stay empty.
    let c: Vec<Commitment> = (0..5u8).map(|i| Commitment([i + 1; 32])).collect();
    let mut tree = CommitmentTree::new(3).unwrap();
    for cm in &c {
        tree.insert(*cm).unwrap();
    }

    let e = EmptyDigests::new(3);
    let d = |cm: &Commitment| Digest::from(*cm);
    let n01 = hash_node(&d(&c[0]), &d(&c[1]));
    let n23 = hash_node(&d(&c[2]), &d(&c[3]));
    let n45 = hash_node(&d(&c[4]), &e.at(0).unwrap());
    let n67 = e.at(1).unwrap();
    let n0123 = hash_node(&n01, &n23);
    let n4567 = hash_node(&n45, &n67);
    let expected_root = hash_node(&n0123, &n4567);
    assert_eq!(tree.root(), expected_root);

    let path = tree.path_for(2).unwrap();
    assert_eq!(path.siblings, vec![d(&c[3]), n01, n4567]);
    assert_eq!(path.compute_root(&c[2]), expected_root);
}
