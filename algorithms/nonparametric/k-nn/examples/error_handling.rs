//! Example demonstrating error handling with the k-NN classifier.
//!
//! Each failure mode of the classifier is provoked once and matched on, then a
//! successful classification is run with the error propagated through `?`.

use k_nn::{KnnClassifier, KnnError};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tabknn_helpers::{Dataset, DistanceKind, Instance, Qualitative, Quantitative};

fn training_data() -> Result<Dataset, KnnError> {
    Ok(Dataset::from_attributes(vec![
        Quantitative::with_values("x", vec![1.0, 2.0, 1.0, 8.0, 9.0, 8.0]).into(),
        Quantitative::with_values("y", vec![1.0, 2.0, 2.0, 8.0, 8.0, 9.0]).into(),
        Qualitative::with_values(
            "class",
            ["Class A", "Class A", "Class A", "Class B", "Class B", "Class B"]
                .map(String::from)
                .to_vec(),
        )
        .into(),
    ])?)
}

fn main() {
    println!("k-NN Classifier Error Handling Examples");
    println!("=======================================");
    let mut rng = ChaCha20Rng::seed_from_u64(7);

    println!("\n1. Handling invalid k value (k=0):");
    match KnnClassifier::new(0, DistanceKind::Euclidean) {
        Ok(_) => println!("   Classifier created successfully"),
        Err(e @ KnnError::InvalidK) => println!("   ✓ Caught expected error: {e}"),
        Err(e) => println!("   ✗ Unexpected error: {e}"),
    }

    println!("\n2. Handling empty training set:");
    let empty = match training_data() {
        Ok(data) => data.empty_like(),
        Err(e) => {
            println!("   ✗ Could not build training data: {e}");
            return;
        }
    };
    let query = Instance::from_numbers(&[1.0, 1.0], None);
    match KnnClassifier::new(3, DistanceKind::Euclidean)
        .and_then(|c| c.classify(&empty, &query, &mut rng))
    {
        Ok(label) => println!("   Predicted label: {label}"),
        Err(e @ KnnError::EmptyTrainingSet) => println!("   ✓ Caught expected error: {e}"),
        Err(e) => println!("   ✗ Unexpected error: {e}"),
    }

    println!("\n3. Handling k larger than the training set:");
    let result = training_data().and_then(|train| {
        KnnClassifier::new(10, DistanceKind::Manhattan)?.classify(&train, &query, &mut rng)
    });
    match result {
        Err(e @ KnnError::KTooLarge { .. }) => println!("   ✓ Caught expected error: {e}"),
        other => println!("   ✗ Unexpected outcome: {other:?}"),
    }

    println!("\n4. Successful classification with error propagation:");
    fn classify_points(rng: &mut ChaCha20Rng) -> Result<Vec<String>, KnnError> {
        let train = training_data()?;
        let classifier = KnnClassifier::new(3, DistanceKind::Euclidean)?;
        [[2.5, 2.5], [7.5, 8.5]]
            .iter()
            .map(|p| classifier.classify(&train, &Instance::from_numbers(p, None), &mut *rng))
            .collect()
    }

    match classify_points(&mut rng) {
        Ok(labels) => println!("   ✓ Classification results: {labels:?}"),
        Err(e) => println!("   ✗ Classification failed: {e}"),
    }

    println!("\n5. Error types and their meanings:");
    println!("   - InvalidK: k cannot be zero");
    println!("   - EmptyTrainingSet: the training dataset has no rows");
    println!("   - KTooLarge: k exceeds the number of training rows");
    println!("   - InvalidDistance: a distance was NaN");
    println!("   - Distance / Data: shape or data errors from the helpers crate");
}
