//! Property tests for the in-memory vector store: ordering and idempotent upserts.

use std::collections::BTreeMap;

use persona_rag::{ChunkMetadata, EmbeddedChunk, InMemoryVectorStore, VectorStore};
use proptest::prelude::*;

const DIM: usize = 16;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate items with unique ids.
fn arb_items(dim: usize) -> impl Strategy<Value = Vec<EmbeddedChunk>> {
    proptest::collection::btree_map("[a-z]{3,8}", ("[a-z ]{5,30}", arb_normalized_embedding(dim)), 1..20)
        .prop_map(|items: BTreeMap<String, (String, Vec<f32>)>| {
            items
                .into_iter()
                .map(|(id, (content, vector))| EmbeddedChunk {
                    id,
                    vector,
                    metadata: ChunkMetadata { content },
                })
                .collect()
        })
}

fn block_on<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::runtime::Runtime::new().unwrap().block_on(future)
}

/// *For any* stored items, a query returns at most `top_k` results (or all
/// items when fewer exist) ordered by non-increasing cosine score.
mod prop_search_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            items in arb_items(DIM),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let results = block_on(async {
                let store = InMemoryVectorStore::new();
                store.upsert(&items).await.unwrap();
                store.query(&query, top_k, true).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(items.len()));
            for window in results.matches().windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

/// *For any* items, upserting them twice leaves query results identical to
/// upserting them once.
mod prop_idempotent_upsert {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn double_upsert_matches_single_upsert(
            items in arb_items(DIM),
            query in arb_normalized_embedding(DIM),
        ) {
            let (once, twice, ids_once, ids_twice) = block_on(async {
                let single = InMemoryVectorStore::new();
                single.upsert(&items).await.unwrap();

                let double = InMemoryVectorStore::new();
                double.upsert(&items).await.unwrap();
                double.upsert(&items).await.unwrap();

                (
                    single.query(&query, items.len(), true).await.unwrap(),
                    double.query(&query, items.len(), true).await.unwrap(),
                    single.ids().await,
                    double.ids().await,
                )
            });

            prop_assert_eq!(ids_once, ids_twice);
            prop_assert_eq!(once, twice);
        }
    }
}
