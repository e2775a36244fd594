//! Elementwise operations on partitioned arrays.
//!
//! Each operation dispatches one task per partition to the partition's
//! locality and returns immediately; the resulting array's partitions resolve
//! as the tasks finish. Operands may be arrays, plain scalars, or scalar
//! futures (for example an aggregate still being computed), so operations
//! chain without blocking.

use std::{
    ops::{Add, Div, Mul, Sub},
    sync::Arc,
};

use futures::future::{self, FutureExt};

use super::{Partition, PartitionedArray, TaskError, TaskResult};

/// A scalar operand: a plain value or the pending result of a task.
#[derive(Debug)]
pub enum Scalar<T> {
    /// A plain value.
    Value(T),
    /// The pending result of a task.
    Future(TaskResult<T>),
}

impl<T> Clone for Scalar<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Future(future) => Self::Future(future.clone()),
        }
    }
}

impl<T> From<T> for Scalar<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Clone + Send + 'static> Scalar<T> {
    /// Resolve the operand to its value.
    ///
    /// # Errors
    /// Returns a [`TaskError`] if the producing task failed.
    pub async fn resolve(self) -> Result<T, TaskError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Future(future) => future.await,
        }
    }

    /// A resolved handle to the operand, for passing to [`Scalar::Future`].
    #[must_use]
    pub fn ready(value: T) -> TaskResult<T> {
        future::ready(Ok(value)).boxed().shared()
    }
}

/// Apply `op` to every element of `input`.
pub fn unary<T, U, F>(input: &PartitionedArray<T>, op: F) -> PartitionedArray<U>
where
    T: Copy + Default + Send + Sync + 'static,
    U: Copy + Default + Send + Sync + 'static,
    F: Fn(T) -> U + Copy + Send + Sync + 'static,
{
    let partitions = input
        .partitions()
        .iter()
        .map(|partition| {
            let data = partition.data();
            let task = async move {
                let elements = data.await?;
                Ok(Arc::new(elements.iter().map(|&value| op(value)).collect()))
            };
            Partition::pending(
                partition.offset().to_vec(),
                partition.shape().to_vec(),
                Arc::clone(partition.locality()),
                partition.locality().dispatch(task),
            )
        })
        .collect();
    PartitionedArray::from_partitions(input.layout().clone(), partitions)
}

/// Apply `op` to corresponding elements of `lhs` and `rhs`.
///
/// # Panics
/// Panics if the operands have different layouts.
pub fn binary<T, U, W, F>(
    lhs: &PartitionedArray<T>,
    rhs: &PartitionedArray<U>,
    op: F,
) -> PartitionedArray<W>
where
    T: Copy + Default + Send + Sync + 'static,
    U: Copy + Default + Send + Sync + 'static,
    W: Copy + Default + Send + Sync + 'static,
    F: Fn(T, U) -> W + Copy + Send + Sync + 'static,
{
    assert_eq!(lhs.layout(), rhs.layout());
    let partitions = lhs
        .partitions()
        .iter()
        .zip(rhs.partitions())
        .map(|(lhs, rhs)| {
            let lhs_data = lhs.data();
            let rhs_data = rhs.data();
            let task = async move {
                let (lhs, rhs) = future::try_join(lhs_data, rhs_data).await?;
                Ok(Arc::new(
                    lhs.iter()
                        .zip(rhs.iter())
                        .map(|(&lhs, &rhs)| op(lhs, rhs))
                        .collect(),
                ))
            };
            Partition::pending(
                lhs.offset().to_vec(),
                lhs.shape().to_vec(),
                Arc::clone(lhs.locality()),
                lhs.locality().dispatch(task),
            )
        })
        .collect();
    PartitionedArray::from_partitions(lhs.layout().clone(), partitions)
}

/// Apply `op` to every element of `lhs` and the scalar `rhs`.
pub fn binary_with_scalar<T, U, W, F>(
    lhs: &PartitionedArray<T>,
    rhs: Scalar<U>,
    op: F,
) -> PartitionedArray<W>
where
    T: Copy + Default + Send + Sync + 'static,
    U: Copy + Send + Sync + 'static,
    W: Copy + Default + Send + Sync + 'static,
    F: Fn(T, U) -> W + Copy + Send + Sync + 'static,
{
    let partitions = lhs
        .partitions()
        .iter()
        .map(|partition| {
            let data = partition.data();
            let rhs = rhs.clone();
            let task = async move {
                let elements = data.await?;
                let rhs = rhs.resolve().await?;
                Ok(Arc::new(
                    elements.iter().map(|&value| op(value, rhs)).collect(),
                ))
            };
            Partition::pending(
                partition.offset().to_vec(),
                partition.shape().to_vec(),
                Arc::clone(partition.locality()),
                partition.locality().dispatch(task),
            )
        })
        .collect();
    PartitionedArray::from_partitions(lhs.layout().clone(), partitions)
}

/// Apply `op` to the scalar `lhs` and every element of `rhs`.
pub fn scalar_with_array<T, U, W, F>(
    lhs: Scalar<T>,
    rhs: &PartitionedArray<U>,
    op: F,
) -> PartitionedArray<W>
where
    T: Copy + Send + Sync + 'static,
    U: Copy + Default + Send + Sync + 'static,
    W: Copy + Default + Send + Sync + 'static,
    F: Fn(T, U) -> W + Copy + Send + Sync + 'static,
{
    binary_with_scalar(rhs, lhs, move |rhs, lhs| op(lhs, rhs))
}

/// Apply `op` to corresponding elements of `first`, `second` and `third`.
///
/// # Panics
/// Panics if the operands have different layouts.
pub fn ternary<T, U, V, W, F>(
    first: &PartitionedArray<T>,
    second: &PartitionedArray<U>,
    third: &PartitionedArray<V>,
    op: F,
) -> PartitionedArray<W>
where
    T: Copy + Default + Send + Sync + 'static,
    U: Copy + Default + Send + Sync + 'static,
    V: Copy + Default + Send + Sync + 'static,
    W: Copy + Default + Send + Sync + 'static,
    F: Fn(T, U, V) -> W + Copy + Send + Sync + 'static,
{
    assert_eq!(first.layout(), second.layout());
    assert_eq!(first.layout(), third.layout());
    let partitions = first
        .partitions()
        .iter()
        .zip(second.partitions().iter().zip(third.partitions()))
        .map(|(first, (second, third))| {
            let first_data = first.data();
            let second_data = second.data();
            let third_data = third.data();
            let task = async move {
                let (first, second, third) =
                    future::try_join3(first_data, second_data, third_data).await?;
                Ok(Arc::new(
                    first
                        .iter()
                        .zip(second.iter().zip(third.iter()))
                        .map(|(&first, (&second, &third))| op(first, second, third))
                        .collect(),
                ))
            };
            Partition::pending(
                first.offset().to_vec(),
                first.shape().to_vec(),
                Arc::clone(first.locality()),
                first.locality().dispatch(task),
            )
        })
        .collect();
    PartitionedArray::from_partitions(first.layout().clone(), partitions)
}

/// Apply `op` to corresponding elements of `first` and `second` and the
/// scalar `third`.
///
/// # Panics
/// Panics if the array operands have different layouts.
pub fn ternary_with_scalar<T, U, V, W, F>(
    first: &PartitionedArray<T>,
    second: &PartitionedArray<U>,
    third: Scalar<V>,
    op: F,
) -> PartitionedArray<W>
where
    T: Copy + Default + Send + Sync + 'static,
    U: Copy + Default + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
    W: Copy + Default + Send + Sync + 'static,
    F: Fn(T, U, V) -> W + Copy + Send + Sync + 'static,
{
    assert_eq!(first.layout(), second.layout());
    let partitions = first
        .partitions()
        .iter()
        .zip(second.partitions())
        .map(|(first, second)| {
            let first_data = first.data();
            let second_data = second.data();
            let third = third.clone();
            let task = async move {
                let (first, second) = future::try_join(first_data, second_data).await?;
                let third = third.resolve().await?;
                Ok(Arc::new(
                    first
                        .iter()
                        .zip(second.iter())
                        .map(|(&first, &second)| op(first, second, third))
                        .collect(),
                ))
            };
            Partition::pending(
                first.offset().to_vec(),
                first.shape().to_vec(),
                Arc::clone(first.locality()),
                first.locality().dispatch(task),
            )
        })
        .collect();
    PartitionedArray::from_partitions(first.layout().clone(), partitions)
}

/// Elementwise `lhs + rhs`.
pub fn add<T>(lhs: &PartitionedArray<T>, rhs: &PartitionedArray<T>) -> PartitionedArray<T>
where
    T: Copy + Default + Send + Sync + Add<Output = T> + 'static,
{
    binary(lhs, rhs, |lhs, rhs| lhs + rhs)
}

/// Elementwise `lhs - rhs`.
pub fn subtract<T>(lhs: &PartitionedArray<T>, rhs: &PartitionedArray<T>) -> PartitionedArray<T>
where
    T: Copy + Default + Send + Sync + Sub<Output = T> + 'static,
{
    binary(lhs, rhs, |lhs, rhs| lhs - rhs)
}

/// Elementwise `lhs * rhs`.
pub fn multiply<T>(lhs: &PartitionedArray<T>, rhs: &PartitionedArray<T>) -> PartitionedArray<T>
where
    T: Copy + Default + Send + Sync + Mul<Output = T> + 'static,
{
    binary(lhs, rhs, |lhs, rhs| lhs * rhs)
}

/// Elementwise `lhs / rhs`.
pub fn divide<T>(lhs: &PartitionedArray<T>, rhs: &PartitionedArray<T>) -> PartitionedArray<T>
where
    T: Copy + Default + Send + Sync + Div<Output = T> + 'static,
{
    binary(lhs, rhs, |lhs, rhs| lhs / rhs)
}

/// Select elementwise from `true_array` where `condition` is non-zero, from
/// `false_array` elsewhere.
pub fn where_<T>(
    condition: &PartitionedArray<u8>,
    true_array: &PartitionedArray<T>,
    false_array: &PartitionedArray<T>,
) -> PartitionedArray<T>
where
    T: Copy + Default + Send + Sync + 'static,
{
    ternary(
        condition,
        true_array,
        false_array,
        |condition, true_value, false_value| {
            if condition != 0 {
                true_value
            } else {
                false_value
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use crate::partitioned::{PartitionLayout, Runtime};

    use super::*;

    fn runtime() -> Runtime {
        Runtime::new(2, 2).unwrap()
    }

    #[test]
    fn chained_elementwise() {
        let runtime = runtime();
        let layout = PartitionLayout::new(vec![60, 40], vec![10, 10]);
        let lhs = PartitionedArray::filled(&runtime, layout.clone(), 5i64);
        let rhs = PartitionedArray::filled(&runtime, layout.clone(), 3i64);
        let sum = add(&lhs, &rhs);
        // Chaining does not block on the intermediate result.
        let halved = binary_with_scalar(&sum, Scalar::Value(2i64), |value, divisor| {
            value / divisor
        });
        assert_eq!(sum.layout(), &layout);
        assert_eq!(sum.to_elements().unwrap(), vec![8; 2400]);
        assert_eq!(halved.to_elements().unwrap(), vec![4; 2400]);
    }

    #[test]
    fn scalar_future_operand() {
        let runtime = runtime();
        let layout = PartitionLayout::new(vec![4], vec![2]);
        let array = PartitionedArray::filled(&runtime, layout, 10i32);
        let pending = runtime
            .locality(0)
            .dispatch(async { Ok::<_, TaskError>(7i32) });
        let result =
            binary_with_scalar(&array, Scalar::Future(pending), |value, rhs| value + rhs);
        assert_eq!(result.to_elements().unwrap(), vec![17; 4]);
    }

    #[test]
    fn reflected_scalar() {
        let runtime = runtime();
        let layout = PartitionLayout::new(vec![3], vec![2]);
        let array = PartitionedArray::from_elements(&runtime, layout, &[1i32, 2, 3]);
        let result = scalar_with_array(Scalar::Value(10i32), &array, |lhs, rhs| lhs - rhs);
        assert_eq!(result.to_elements().unwrap(), vec![9, 8, 7]);
    }

    #[test]
    fn where_selects() {
        let runtime = runtime();
        let layout = PartitionLayout::new(vec![4], vec![3]);
        let condition = PartitionedArray::from_elements(&runtime, layout.clone(), &[1u8, 0, 0, 1]);
        let ones = PartitionedArray::filled(&runtime, layout.clone(), 1.0f64);
        let zeros = PartitionedArray::filled(&runtime, layout, 0.0f64);
        let selected = where_(&condition, &ones, &zeros);
        assert_eq!(selected.to_elements().unwrap(), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn failure_propagates_through_chain() {
        let runtime = runtime();
        let layout = PartitionLayout::new(vec![2], vec![2]);
        let failed = runtime
            .locality(0)
            .dispatch(async { Err::<std::sync::Arc<Vec<i32>>, _>(TaskError::new("boom")) });
        let source = PartitionedArray::from_partitions(
            layout,
            vec![Partition::pending(
                vec![0],
                vec![2],
                std::sync::Arc::clone(runtime.locality(0)),
                failed,
            )],
        );
        let doubled = unary(&source, |value: i32| value * 2);
        assert!(doubled.to_elements().is_err());
    }
}
