use super::*;
use tempfile::TempDir;

fn normalized(mut v: Vec<f32>) -> Vec<f32> {
    l2_normalize(&mut v);
    v
}

fn sample_vectors() -> Vec<Vec<f32>> {
    vec![
        normalized(vec![1.0, 0.0, 0.0]),
        normalized(vec![0.6, 0.8, 0.0]),
        normalized(vec![0.0, 0.0, 1.0]),
    ]
}

#[test]
fn build_rejects_empty_batch() {
    let result = FlatIndex::build(Vec::new());
    assert!(matches!(result, Err(RagError::IndexIntegrity(_))));
}

#[test]
fn build_rejects_mixed_dimensions() {
    let result = FlatIndex::build(vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]);
    assert!(matches!(result, Err(RagError::IndexIntegrity(_))));
}

#[test]
fn search_rejects_wrong_query_dimension() {
    let index = FlatIndex::build(sample_vectors()).expect("should build index");
    let result = index.search(&[1.0, 0.0], 3);
    assert!(matches!(
        result,
        Err(RagError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[test]
fn search_returns_at_most_k_bounded_by_best_match() {
    let index = FlatIndex::build(sample_vectors()).expect("should build index");
    let query = normalized(vec![0.9, 0.1, 0.0]);

    let hits = index.search(&query, 2).expect("should search");
    assert_eq!(hits.len(), 2);

    let all_hits = index.search(&query, 3).expect("should search");
    let best = all_hits[0].1;
    for (_, score) in &hits {
        assert!(*score <= best + f32::EPSILON);
    }
    // Sorted by descending similarity.
    assert!(hits[0].1 >= hits[1].1);
}

#[test]
fn identical_vector_is_top_hit_with_unit_similarity() {
    let vector = normalized(vec![0.3, 0.5, 0.2]);
    let index = FlatIndex::build(vec![vector.clone()]).expect("should build index");

    let hits = index.search(&vector, 1).expect("should search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, 0);
    assert!((hits[0].1 - 1.0).abs() < 1e-5);
}

#[test]
fn k_larger_than_index_returns_index_len_results() {
    let index = FlatIndex::build(sample_vectors()).expect("should build index");
    let query = normalized(vec![1.0, 1.0, 1.0]);

    let hits = index.search(&query, 50).expect("should search");
    assert_eq!(hits.len(), index.len());
}

#[test]
fn ties_break_by_ascending_position() {
    let duplicate = normalized(vec![1.0, 0.0]);
    let index = FlatIndex::build(vec![duplicate.clone(), duplicate.clone(), duplicate.clone()])
        .expect("should build index");

    let hits = index.search(&duplicate, 3).expect("should search");
    let positions: Vec<usize> = hits.iter().map(|(p, _)| *p).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn l2_normalize_produces_unit_norm() {
    let mut v = vec![3.0, 4.0];
    l2_normalize(&mut v);
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-6);
}

#[test]
fn l2_normalize_leaves_zero_vector_unchanged() {
    let mut v = vec![0.0, 0.0, 0.0];
    l2_normalize(&mut v);
    assert_eq!(v, vec![0.0, 0.0, 0.0]);
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("kb.index");
    let meta_path = temp_dir.path().join("kb.index.meta.json");

    let index = FlatIndex::build(sample_vectors()).expect("should build index");
    index.save(&index_path).expect("should save index");

    let records = vec![
        MetadataRecord {
            chunk_id: "chunk_0000".to_string(),
            text: "first".to_string(),
        },
        MetadataRecord {
            chunk_id: "chunk_0001".to_string(),
            text: "second".to_string(),
        },
        MetadataRecord {
            chunk_id: "chunk_0002".to_string(),
            text: "third".to_string(),
        },
    ];
    save_metadata(&records, &meta_path).expect("should save metadata");

    let (loaded, metadata) = load_artifacts(&index_path, &meta_path).expect("should load artifacts");
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.dimension(), 3);
    assert_eq!(metadata, records);
}

#[test]
fn loading_index_without_metadata_is_an_integrity_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("kb.index");
    let meta_path = temp_dir.path().join("kb.index.meta.json");

    let index = FlatIndex::build(sample_vectors()).expect("should build index");
    index.save(&index_path).expect("should save index");

    let result = load_artifacts(&index_path, &meta_path);
    assert!(matches!(result, Err(RagError::IndexIntegrity(_))));
}

#[test]
fn metadata_length_mismatch_is_an_integrity_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("kb.index");
    let meta_path = temp_dir.path().join("kb.index.meta.json");

    let index = FlatIndex::build(sample_vectors()).expect("should build index");
    index.save(&index_path).expect("should save index");

    let records = vec![MetadataRecord {
        chunk_id: "chunk_0000".to_string(),
        text: "only one".to_string(),
    }];
    save_metadata(&records, &meta_path).expect("should save metadata");

    let result = load_artifacts(&index_path, &meta_path);
    assert!(matches!(result, Err(RagError::IndexIntegrity(_))));
}
