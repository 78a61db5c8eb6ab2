use amr_meta::prelude::*;

mod util;

#[test]
fn every_rank_holds_the_same_boxes() {
    let replicas = util::run_ranks(3, |comm| {
        let rank = comm.rank();
        let mut h: Hierarchy = Hierarchy::new(rank);
        let x0 = 4.0 * rank as f64;
        h.add_grid(0, util::grid([x0, 0.0, 0.0], 1.0, [4, 4, 4]));
        if rank != 1 {
            h.add_grid(1, util::grid([x0 + 1.0, 1.0, 1.0], 0.5, [2, 2, 2]));
        }
        generate_metadata(&mut h, &comm, None).unwrap();
        h.debug_assert_invariants();
        (util::box_list(&h), h.refinement_ratio(0), h.bounds())
    });
    for replica in &replicas {
        assert_eq!(replica, &replicas[0]);
    }
    let (boxes, ratio, bounds) = &replicas[0];
    assert_eq!(boxes.len(), 5);
    assert_eq!(*ratio, Some(2));
    assert_eq!(bounds, &[0.0, 0.0, 0.0, 12.0, 4.0, 4.0]);
    // rank-major order on every level
    let level1: Vec<usize> = boxes
        .iter()
        .filter(|(_, b)| b.level() == 1)
        .map(|(k, _)| k.rank)
        .collect();
    assert_eq!(level1, vec![0, 2]);
    assert!(boxes.iter().all(|(k, b)| k.rank == b.rank()));
}

#[test]
fn regenerating_replaces_remote_boxes() {
    let counts = util::run_ranks(2, |comm| {
        let mut h: Hierarchy = Hierarchy::new(comm.rank());
        h.add_grid(0, util::grid([4.0 * comm.rank() as f64, 0.0, 0.0], 1.0, [4, 4, 4]));
        generate_metadata(&mut h, &comm, None).unwrap();
        generate_metadata(&mut h, &comm, None).unwrap();
        h.number_of_boxes()
    });
    assert_eq!(counts, vec![2, 2]);
}

#[test]
fn stale_remote_box_is_a_duplicate() {
    let results = util::run_ranks(2, |comm| {
        let rank = comm.rank();
        let mut h: Hierarchy = Hierarchy::new(rank);
        h.add_grid(0, util::grid([4.0 * rank as f64, 0.0, 0.0], 1.0, [4, 4, 4]));
        if rank == 0 {
            let stale = AmrBox::new(0, [4, 0, 0], [7, 3, 3], [1.0; 3], 1).unwrap();
            h.insert_box(BlockKey::new(1, 0), stale).unwrap();
        }
        compute_local_metadata([0.0; 3], &mut h, rank).unwrap();
        distribute_metadata(&mut h, &comm)
    });
    assert_eq!(
        results[0],
        Err(AmrError::DuplicateBox {
            level: 0,
            rank: 1,
            index: 0
        })
    );
    assert_eq!(results[1], Ok(()));
}

#[test]
fn box_claiming_another_owner_is_rejected() {
    let results = util::run_ranks(2, |comm| {
        let rank = comm.rank();
        let mut h: Hierarchy = Hierarchy::new(rank);
        if rank == 1 {
            let forged = AmrBox::new(0, [0; 3], [3; 3], [1.0; 3], 0).unwrap();
            h.insert_box(BlockKey::new(1, 0), forged).unwrap();
        }
        distribute_metadata(&mut h, &comm)
    });
    assert_eq!(
        results[0],
        Err(AmrError::OwnershipMismatch {
            sender: 1,
            declared: 0
        })
    );
    assert_eq!(results[1], Ok(()));
}

#[test]
fn serial_collect_matches_local_build() {
    let mut h: Hierarchy = Hierarchy::new(0);
    h.add_grid(0, util::grid([0.0; 3], 1.0, [4, 4, 4]));
    h.add_grid(1, util::grid([1.0; 3], 0.5, [2, 2, 2]));
    collect_amr_metadata(&mut h, &NoComm, None).unwrap();
    let key = BlockKey::new(0, 0);
    let grid = h.grid(1, key).unwrap();
    let expected = create_amr_box_for_grid([0.0; 3], grid.as_ref(), 1, 0).unwrap();
    assert_eq!(h.amr_box(1, key), Some(&expected));
}
