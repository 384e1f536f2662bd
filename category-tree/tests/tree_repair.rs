//! Repair pass against partial writes and randomized operation sequences

mod common;

use category_tree::{ConsistencyFault, DeletePolicy, TreeError};
use common::{assert_invariants, memory_tree};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::models::{Category, CategoryCreate, CategoryUpdate};

fn category(id: i64, parent: Option<i64>, children: Vec<i64>, path: Vec<i64>) -> Category {
    Category {
        id,
        name: format!("Category {id}"),
        slug: format!("category-{id}"),
        description: None,
        parent,
        is_leaf: children.is_empty(),
        children,
        level: path.len() as i32 - 1,
        path,
        can_be_parent: true,
        is_active: true,
        is_featured: false,
        sort_order: 0,
        created_at: 0,
        updated_at: 0,
    }
}

#[tokio::test]
async fn test_create_failing_after_first_write_is_repaired() {
    let (store, tree) = memory_tree(DeletePolicy::Reject);
    let root = tree.create(CategoryCreate::new("Garden")).await.unwrap();

    store.fail_saves_after(1);
    let err = tree
        .create(CategoryCreate::under("Tools", root.id))
        .await
        .unwrap_err();
    assert!(matches!(err, TreeError::Store(_)));
    store.clear_faults();

    // The child exists but its parent does not list it
    let faults = tree.verify().await.unwrap();
    assert!(faults
        .iter()
        .any(|f| matches!(f, ConsistencyFault::MissingChildEntry { id, .. } if *id == root.id)));

    let report = tree.repair().await.unwrap();
    assert_eq!(report.updated, vec![root.id]);
    assert_invariants(&store.snapshot());
    assert_eq!(tree.get(root.id).await.unwrap().children.len(), 1);
}

#[tokio::test]
async fn test_reparent_interrupted_at_every_step_is_repaired() {
    // Saves performed by a successful reparent of `mid` with two descendants:
    // old parent, new parent, two descendants, the node itself.
    // A budget of 0 fails before anything is written.
    for budget in 1..5 {
        let (store, tree) = memory_tree(DeletePolicy::Reject);
        let old_root = tree.create(CategoryCreate::new("Electronics")).await.unwrap();
        let new_root = tree.create(CategoryCreate::new("Home")).await.unwrap();
        let mid = tree
            .create(CategoryCreate::under("Appliances", old_root.id))
            .await
            .unwrap();
        let leaf = tree
            .create(CategoryCreate::under("Kettles", mid.id))
            .await
            .unwrap();
        tree.create(CategoryCreate::under("Glass Kettles", leaf.id))
            .await
            .unwrap();

        store.fail_saves_after(budget);
        let result = tree.reparent(mid.id, Some(new_root.id)).await;
        assert!(result.is_err(), "budget {budget} should interrupt the move");
        store.clear_faults();

        let report = tree.repair().await.unwrap();
        assert!(!report.is_clean(), "budget {budget} left no trace");
        let repaired = store.snapshot();
        assert_invariants(&repaired);

        // The node's own parent write never happened: it stays where it was
        let mid = tree.get(mid.id).await.unwrap();
        assert_eq!(mid.parent, Some(old_root.id));

        let second = tree.repair().await.unwrap();
        assert!(second.is_clean());
        assert!(second.updated.is_empty());
        assert_eq!(store.snapshot(), repaired);
    }
}

#[tokio::test]
async fn test_repair_fixes_seeded_corruption() {
    let (store, tree) = memory_tree(DeletePolicy::Reject);
    // 1 ─ 2 ─ 3 with stale paths, 4 pointing at a missing parent,
    // 5 and 6 parenting each other, 7 sharing a slug with 1
    store.insert_raw(category(1, None, vec![2, 99], vec![1]));
    store.insert_raw(category(2, Some(1), vec![], vec![2]));
    store.insert_raw(category(3, Some(2), vec![], vec![8, 3]));
    store.insert_raw(category(4, Some(42), vec![], vec![42, 4]));
    store.insert_raw(category(5, Some(6), vec![6], vec![6, 5]));
    store.insert_raw(category(6, Some(5), vec![5], vec![5, 6]));
    let mut dup = category(7, None, vec![], vec![7]);
    dup.slug = "category-1".into();
    store.insert_raw(dup);

    let faults = tree.verify().await.unwrap();
    assert!(faults.contains(&ConsistencyFault::DanglingParent { id: 4, parent: 42 }));
    assert!(faults.contains(&ConsistencyFault::Cycle { ids: vec![5, 6] }));
    assert!(faults.contains(&ConsistencyFault::OrphanChildEntry { id: 1, child: 99 }));
    assert!(faults.contains(&ConsistencyFault::MissingChildEntry { id: 2, child: 3 }));
    assert!(faults.contains(&ConsistencyFault::DuplicateSlug {
        slug: "category-1".into(),
        ids: vec![1, 7]
    }));

    let err = tree.ensure_consistent().await.unwrap_err();
    assert!(matches!(err, TreeError::Consistency(_)));
    assert_eq!(err.code(), shared::error::ErrorCode::CategoryConsistencyFault);

    let report = tree.repair().await.unwrap();
    assert_eq!(report.scanned, 7);
    assert_eq!(report.faults, faults);
    let repaired = store.snapshot();
    assert_invariants(&repaired);

    let three = tree.get(3).await.unwrap();
    assert_eq!(three.path, vec![1, 2, 3]);
    let four = tree.get(4).await.unwrap();
    assert_eq!((four.parent, four.level), (None, 0));
    let five = tree.get(5).await.unwrap();
    assert_eq!(five.parent, None);
    assert_eq!(tree.get(6).await.unwrap().path, vec![5, 6]);
    assert_eq!(tree.get(7).await.unwrap().slug, "category-1-7");

    tree.ensure_consistent().await.unwrap();
    assert!(tree.repair().await.unwrap().updated.is_empty());
    assert_eq!(store.snapshot(), repaired);
}

#[tokio::test]
async fn test_random_operations_preserve_invariants() {
    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let policy = match seed % 3 {
            0 => DeletePolicy::Reject,
            1 => DeletePolicy::ReassignToParent,
            _ => DeletePolicy::Cascade,
        };
        let (store, tree) = memory_tree(policy);
        let names = ["Audio", "Video", "Garden", "Tools", "Books", "Toys"];

        for _ in 0..120 {
            let existing: Vec<i64> = store.snapshot().iter().map(|c| c.id).collect();
            let pick = |rng: &mut StdRng| existing[rng.gen_range(0..existing.len())];
            let name = names[rng.gen_range(0..names.len())];

            let outcome = match (existing.is_empty(), rng.gen_range(0..10)) {
                (true, _) | (false, 0..=3) => {
                    let parent = if existing.is_empty() || rng.gen_bool(0.2) {
                        None
                    } else {
                        Some(pick(&mut rng))
                    };
                    let data = CategoryCreate {
                        parent,
                        can_be_parent: Some(rng.gen_bool(0.9)),
                        ..CategoryCreate::new(name)
                    };
                    tree.create(data).await.map(|_| ())
                }
                (false, 4..=6) => {
                    let id = pick(&mut rng);
                    let target = if rng.gen_bool(0.25) {
                        None
                    } else {
                        Some(pick(&mut rng))
                    };
                    tree.reparent(id, target).await.map(|_| ())
                }
                (false, 7 | 8) => {
                    let id = pick(&mut rng);
                    let update = CategoryUpdate {
                        name: Some(name.into()),
                        ..Default::default()
                    };
                    tree.update(id, update).await.map(|_| ())
                }
                (false, _) => {
                    let id = pick(&mut rng);
                    tree.delete(id).await.map(|_| ())
                }
            };

            match outcome {
                Ok(()) | Err(TreeError::InvalidOperation(..)) => {}
                Err(e) => panic!("seed {seed}: unexpected error {e}"),
            }
            assert_invariants(&store.snapshot());
        }

        assert!(tree.repair().await.unwrap().updated.is_empty());
    }
}

#[tokio::test]
async fn test_random_faults_then_repair_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    let (store, tree) = memory_tree(DeletePolicy::ReassignToParent);
    let names = ["Kitchen", "Bath", "Bedroom", "Office"];

    for _ in 0..80 {
        let existing: Vec<i64> = store.snapshot().iter().map(|c| c.id).collect();
        if rng.gen_bool(0.3) {
            store.fail_saves_after(rng.gen_range(0..3));
        }
        let name = names[rng.gen_range(0..names.len())];
        if existing.len() < 3 || rng.gen_bool(0.5) {
            let parent = (!existing.is_empty() && rng.gen_bool(0.7))
                .then(|| existing[rng.gen_range(0..existing.len())]);
            let data = CategoryCreate {
                parent,
                ..CategoryCreate::new(name)
            };
            let _ = tree.create(data).await;
        } else {
            let id = existing[rng.gen_range(0..existing.len())];
            let target = existing[rng.gen_range(0..existing.len())];
            let _ = tree.reparent(id, Some(target)).await;
        }
        store.clear_faults();
    }

    tree.repair().await.unwrap();
    let once = store.snapshot();
    assert_invariants(&once);

    let again = tree.repair().await.unwrap();
    assert!(again.is_clean());
    assert!(again.updated.is_empty());
    assert_eq!(store.snapshot(), once);
}
