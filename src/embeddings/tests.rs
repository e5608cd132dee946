use super::*;

#[test]
fn normalize_produces_unit_length() {
    let mut v = vec![3.0, 4.0];
    normalize(&mut v);

    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-6);
    assert!((v[0] - 0.6).abs() < 1e-6);
    assert!((v[1] - 0.8).abs() < 1e-6);
}

#[test]
fn normalize_leaves_zero_vector_untouched() {
    let mut v = vec![0.0, 0.0, 0.0];
    normalize(&mut v);
    assert_eq!(v, vec![0.0, 0.0, 0.0]);
}

#[test]
fn cosine_works_for_unit_vectors() {
    let a = vec![1.0, 0.0, 0.0];
    let b = vec![1.0, 0.0, 0.0];
    let c = vec![0.0, 1.0, 0.0];

    assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    assert!((cosine_similarity(&a, &c) - 0.0).abs() < 1e-6);
}

#[test]
fn cosine_handles_mismatched_or_empty_input() {
    assert_eq!(cosine_similarity(&[], &[]), 0.0);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
}

#[test]
fn inner_product_of_normalized_vectors_equals_cosine() {
    let mut a = vec![2.0, 5.0, 1.0];
    let mut b = vec![4.0, 0.5, 3.0];
    let expected = cosine_similarity(&a, &b);

    normalize(&mut a);
    normalize(&mut b);
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();

    assert!((dot - expected).abs() < 1e-5);
}
