//! Properties of the host-side arithmetic that must hold for any input.

use proptest::prelude::*;
use vecadd_cl::{global_work_size, init_vectors, RunOutcome};

proptest! {
    #[test]
    fn global_size_is_smallest_covering_multiple(
        n in 0_usize..=1 << 24,
        local in 1_usize..=1024,
    ) {
        let global = global_work_size(n, local);
        prop_assert!(global >= n);
        prop_assert_eq!(global % local, 0);
        // one group less would not cover n
        prop_assert!(global < local || global - local < n);
    }

    #[test]
    fn exact_multiples_need_no_padding(groups in 0_usize..=4096, local in 1_usize..=512) {
        prop_assert_eq!(global_work_size(groups * local, local), groups * local);
    }

    #[test]
    fn vectors_are_index_and_successor(n in 0_usize..=8192) {
        let (a, b) = init_vectors(n).unwrap();
        prop_assert_eq!(a.len(), n);
        prop_assert_eq!(b.len(), n);
        for i in 0..n {
            prop_assert_eq!(a[i], i as i32);
            prop_assert_eq!(b[i], i as i32 + 1);
        }
    }

    #[test]
    fn host_side_sum_never_mismatches(n in 1_usize..=4096) {
        let (a, b) = init_vectors(n).unwrap();
        let c: Vec<i32> = a.iter().zip(&b).map(|(x, y)| x + y).collect();
        let outcome = RunOutcome { a, b, c };
        prop_assert!(outcome.mismatches().is_empty());
    }
}

#[test]
fn default_launch_is_sixteen_groups() {
    assert_eq!(global_work_size(2048, 128), 2048);
    assert_eq!(global_work_size(2048, 128) / 128, 16);
}
