#![allow(missing_docs)]

use std::sync::Arc;

use phenomena::{
    partitioned::{
        io::Scatter, ops, PartitionLayout, PartitionedArray, Runtime, TaskError,
    },
    raster::{read_raster, write_raster, MemoryRasterBand},
};

#[test]
fn elementwise_addition_over_partitions() {
    let runtime = Runtime::new(2, 2).unwrap();
    let layout = PartitionLayout::new(vec![60, 40], vec![10, 10]);
    let lhs = PartitionedArray::filled(&runtime, layout.clone(), 5.0f64);
    let rhs = PartitionedArray::filled(&runtime, layout.clone(), 3.0f64);
    let sum = ops::add(&lhs, &rhs);
    assert_eq!(sum.layout(), &layout);
    assert_eq!(sum.layout().nr_partitions(), 24);
    assert_eq!(sum.to_elements().unwrap(), vec![8.0; 2400]);
}

#[test]
fn operations_chain_without_blocking() {
    let runtime = Runtime::new(3, 1).unwrap();
    let layout = PartitionLayout::new(vec![17, 11], vec![5, 4]);
    let elements: Vec<i64> = (0..17 * 11).collect();
    let base = PartitionedArray::from_elements(&runtime, layout, &elements);
    // Build a small expression tree before asking for any result.
    let doubled = ops::unary(&base, |value| value * 2);
    let difference = ops::subtract(&doubled, &base);
    let shifted = ops::binary_with_scalar(&difference, ops::Scalar::Value(1i64), |value, one| {
        value + one
    });
    let expected: Vec<i64> = elements.iter().map(|value| value + 1).collect();
    assert_eq!(shifted.to_elements().unwrap(), expected);
}

#[test]
fn scatter_feeds_operations() {
    let runtime = Runtime::new(2, 2).unwrap();
    let layout = PartitionLayout::new(vec![4, 4], vec![2, 2]);
    let scatter = Scatter::new(&runtime, layout.clone());
    // Consume the array before all cells have been produced.
    let negated = ops::unary(&scatter.array(), |value: i32| -value);
    for row in 0..4u64 {
        for column in 0..4u64 {
            scatter.insert(vec![row, column], i32::try_from(row * 4 + column).unwrap());
        }
    }
    let expected: Vec<i32> = (0..16).map(|value| -value).collect();
    assert_eq!(negated.to_elements().unwrap(), expected);
}

#[test]
fn scatter_accepts_contributions_from_many_threads() {
    let runtime = Runtime::new(2, 2).unwrap();
    let layout = PartitionLayout::new(vec![8, 8], vec![3, 3]);
    let scatter = Arc::new(Scatter::new(&runtime, layout));
    let array = scatter.array();
    std::thread::scope(|scope| {
        for thread in 0..4u64 {
            let scatter = Arc::clone(&scatter);
            scope.spawn(move || {
                for row in (thread * 2)..(thread * 2 + 2) {
                    for column in 0..8u64 {
                        scatter.insert(vec![row, column], row * 8 + column);
                    }
                }
            });
        }
    });
    let expected: Vec<u64> = (0..64).collect();
    assert_eq!(array.to_elements().unwrap(), expected);
}

#[test]
fn masked_blend_with_scalar_fallback() {
    let runtime = Runtime::new(2, 1).unwrap();
    let layout = PartitionLayout::new(vec![6, 6], vec![4, 4]);
    let elements: Vec<f64> = (0..36).map(f64::from).collect();
    let values = PartitionedArray::from_elements(&runtime, layout.clone(), &elements);
    let mask: Vec<u8> = (0..36).map(|cell| u8::from(cell % 2 == 0)).collect();
    let condition = PartitionedArray::from_elements(&runtime, layout, &mask);
    let blended = ops::ternary_with_scalar(
        &condition,
        &values,
        ops::Scalar::Value(-1.0f64),
        |condition, value, fallback| if condition != 0 { value } else { fallback },
    );
    let expected: Vec<f64> = elements
        .iter()
        .enumerate()
        .map(|(cell, &value)| if cell % 2 == 0 { value } else { -1.0 })
        .collect();
    assert_eq!(blended.to_elements().unwrap(), expected);
}

#[test]
fn task_failure_reaches_every_consumer() {
    let runtime = Runtime::new(1, 1).unwrap();
    let layout = PartitionLayout::new(vec![2, 2], vec![2, 2]);
    let scatter = Scatter::<f64>::new(&runtime, layout);
    let array = scatter.array();
    let downstream_a = ops::unary(&array, |value| value + 1.0);
    let downstream_b = ops::unary(&array, |value| value * 2.0);
    scatter.fail(&TaskError::new("input unavailable"));
    assert!(downstream_a.to_elements().is_err());
    assert!(downstream_b.to_elements().is_err());
}

#[test]
fn raster_algebra_round_trip() {
    let runtime = Runtime::new(2, 2).unwrap();
    // The band's native block grid (4x4) does not align with the partition
    // grid (5x3).
    let elements: Vec<f64> = (0..12 * 9).map(f64::from).collect();
    let band = Arc::new(MemoryRasterBand::from_elements(
        [12, 9],
        [4, 4],
        elements.clone(),
    ));
    let array = read_raster(&runtime, band, [5, 3]);
    let scaled = ops::binary_with_scalar(&array, ops::Scalar::Value(10.0), |value, factor| {
        value * factor
    });

    let mut target = MemoryRasterBand::<f64>::new([12, 9], [6, 6]);
    write_raster(&scaled, &mut target).unwrap();
    let expected: Vec<f64> = elements.iter().map(|value| value * 10.0).collect();
    assert_eq!(target.elements(), &expected[..]);
}
