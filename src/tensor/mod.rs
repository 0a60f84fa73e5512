use crate::backend::Float;
use crate::error::{GroupNormError, Result};
use ndarray::{Array, ArrayD, Axis, IxDyn, Zip};
use rand::Rng;
use rand_distr::StandardNormal;


// Tensor wrapper to handle dynamic arrays more elegantly.
// It is deliberately minimal: shape handling, element access, broadcasting
// arithmetic and axis reductions are all the normalization code needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T>
where
    T: Float,
{
    // Main data storage of the tensor. Always owned, never a view, so that the
    // reshape into group layout can rely on a contiguous standard layout.
    pub data: ArrayD<T>,
}

// Computes the shape both operands broadcast to, numpy style: dimensions are
// aligned from the right and a 1 stretches to match the other side.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let rank = a.len().max(b.len());
    let pad_a = rank - a.len();
    let pad_b = rank - b.len();

    let mut out = Vec::with_capacity(rank);
    for i in 0..rank {
        let da = if i >= pad_a { a[i - pad_a] } else { 1 };
        let db = if i >= pad_b { b[i - pad_b] } else { 1 };
        let dim = if da == db {
            da
        } else if da == 1 {
            db
        } else if db == 1 {
            da
        } else {
            return None;
        };
        out.push(dim);
    }
    Some(out)
}

// Folds the given axes away one by one. Axes are processed from the highest
// index down so that removing one does not shift the ones still pending.
fn fold_axes<A>(data: &ArrayD<A>, axes: &[usize], keep_dims: bool, zero: A) -> ArrayD<A>
where
    A: Copy + std::ops::Add<Output = A>,
{
    let mut sorted_axes = axes.to_vec();
    sorted_axes.sort_unstable();
    sorted_axes.dedup();

    let mut result = data.clone();
    for &ax in sorted_axes.iter().rev() {
        result = result.fold_axis(Axis(ax), zero, |acc, &v| *acc + v);
    }

    if keep_dims {
        for &ax in &sorted_axes {
            result = result.insert_axis(Axis(ax));
        }
    }
    result
}

impl<T> Tensor<T>
where
    T: Float,
{
    pub fn new(data: ArrayD<T>) -> Self {
        Self { data }
    }

    // Creates a tensor from a Rust vector laid out in row-major order.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let total_elements: usize = shape.iter().product();
        if data.len() != total_elements {
            return Err(GroupNormError::shape(format!(
                "Data length {} doesn't match shape {:?} (expected {})",
                data.len(),
                shape,
                total_elements
            )));
        }

        Array::from_shape_vec(IxDyn(shape), data)
            .map(Self::new)
            .map_err(|e| GroupNormError::shape(format!("Failed to create tensor: {}", e)))
    }

    pub fn full(shape: &[usize], value: T) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(shape), value))
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, T::zero())
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, T::one())
    }

    // Standard normal samples. The rng is passed in so callers can seed it.
    pub fn randn<R>(shape: &[usize], rng: &mut R) -> Self
    where
        R: Rng,
    {
        Self::new(ArrayD::from_shape_simple_fn(IxDyn(shape), || {
            T::from_f64(rng.sample::<f64, _>(StandardNormal))
        }))
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    pub fn get(&self, index: &[usize]) -> Option<T> {
        self.data.get(index).copied()
    }

    // Row-major copy of the elements, whatever the memory layout is.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().copied().collect()
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().map(|v| v.to_f64()).collect()
    }

    /// Converts every element to another float type.
    pub fn cast<U: Float>(&self) -> Tensor<U> {
        Tensor::new(self.data.mapv(|v| U::from_f64(v.to_f64())))
    }

    // Reshape always materializes a standard layout copy first, so a tensor
    // produced by broadcasting or slicing can be regrouped safely.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Tensor<T>> {
        let total_elements: usize = new_shape.iter().product();
        if total_elements != self.size() {
            return Err(GroupNormError::shape(format!(
                "Cannot reshape tensor with {} elements into {:?}",
                self.size(),
                new_shape
            )));
        }

        let data = self.data.as_standard_layout().into_owned();
        data.into_shape_with_order(IxDyn(new_shape))
            .map(Tensor::new)
            .map_err(|e| GroupNormError::shape(format!("Failed to reshape: {}", e)))
    }

    // As can be seen on Ndarray's docs, broadcast returns None if the shapes of the
    // tensors cannot be broadcasted together.
    pub fn broadcast_to(&self, target_shape: &[usize]) -> Result<Tensor<T>> {
        match self.data.broadcast(IxDyn(target_shape)) {
            Some(broadcasted) => Ok(Tensor::new(broadcasted.to_owned())),
            None => Err(GroupNormError::shape(format!(
                "Cannot broadcast {:?} to {:?}",
                self.shape(),
                target_shape
            ))),
        }
    }

    fn zip_with<F>(&self, other: &Tensor<T>, op_name: &str, f: F) -> Result<Tensor<T>>
    where
        F: Fn(T, T) -> T,
    {
        let shape = broadcast_shape(self.shape(), other.shape()).ok_or_else(|| {
            GroupNormError::shape(format!(
                "Shape mismatch in {}: {:?} vs {:?}",
                op_name,
                self.shape(),
                other.shape()
            ))
        })?;

        let lhs = self.data.broadcast(IxDyn(&shape)).ok_or_else(|| {
            GroupNormError::shape(format!("Cannot broadcast {:?} to {:?}", self.shape(), shape))
        })?;
        let rhs = other.data.broadcast(IxDyn(&shape)).ok_or_else(|| {
            GroupNormError::shape(format!("Cannot broadcast {:?} to {:?}", other.shape(), shape))
        })?;

        let data = Zip::from(lhs).and(rhs).map_collect(|&a, &b| f(a, b));
        Ok(Tensor::new(data))
    }

    // Element-wise operations. All of them broadcast.
    pub fn add(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    pub fn div(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    pub fn map<F>(&self, f: F) -> Tensor<T>
    where
        F: Fn(T) -> T,
    {
        Tensor::new(self.data.mapv(f))
    }

    pub fn add_scalar(&self, scalar: T) -> Tensor<T> {
        self.map(|x| x + scalar)
    }

    pub fn mul_scalar(&self, scalar: T) -> Tensor<T> {
        self.map(|x| x * scalar)
    }

    pub fn negate(&self) -> Tensor<T> {
        self.map(|x| -x)
    }

    pub fn square(&self) -> Tensor<T> {
        self.map(|x| x * x)
    }

    pub fn sqrt(&self) -> Tensor<T> {
        self.map(|x| x.sqrt())
    }

    pub fn powi(&self, exp: i32) -> Tensor<T> {
        self.map(|x| x.powi(exp))
    }

    fn check_axes(&self, axes: &[usize]) -> Result<()> {
        for &ax in axes {
            if ax >= self.ndim() {
                return Err(GroupNormError::shape(format!(
                    "Axis {} is out of bounds for tensor with {} dimensions",
                    ax,
                    self.ndim()
                )));
            }
        }
        Ok(())
    }

    // Number of elements collapsed by a reduction over `axes`.
    fn reduced_count(&self, axes: &[usize]) -> usize {
        let mut sorted_axes = axes.to_vec();
        sorted_axes.sort_unstable();
        sorted_axes.dedup();
        sorted_axes.iter().map(|&ax| self.shape()[ax]).product()
    }

    pub fn sum_axes(&self, axes: &[usize], keep_dims: bool) -> Result<Tensor<T>> {
        self.check_axes(axes)?;
        Ok(Tensor::new(fold_axes(&self.data, axes, keep_dims, T::zero())))
    }

    pub fn mean_axes(&self, axes: &[usize], keep_dims: bool) -> Result<Tensor<T>> {
        let summed = self.sum_axes(axes, keep_dims)?;
        let count = T::from_usize(self.reduced_count(axes));
        Ok(summed.map(|s| s / count))
    }

    /// Mean accumulated in f64 and rounded back to `T` at the end.
    ///
    /// For half precision inputs this avoids the cancellation and overflow a
    /// long f16 running sum would suffer.
    pub fn mean_axes_wide(&self, axes: &[usize], keep_dims: bool) -> Result<Tensor<T>> {
        self.check_axes(axes)?;
        let count = self.reduced_count(axes) as f64;
        let wide = self.data.mapv(|v| v.to_f64());
        let summed = fold_axes(&wide, axes, keep_dims, 0.0f64);
        Ok(Tensor::new(summed.mapv(|s| T::from_f64(s / count))))
    }

    pub fn sum_all(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &v| acc + v)
    }

    // Reverse of broadcasting: sums over every axis that was stretched so that the
    // result has `target_shape`. This is what the gradient of a broadcasting
    // binary op needs.
    pub fn sum_to_shape(&self, target_shape: &[usize]) -> Result<Tensor<T>> {
        if self.shape() == target_shape {
            return Ok(self.clone());
        }
        if target_shape.len() > self.ndim() {
            return Err(GroupNormError::shape(format!(
                "Cannot reduce {:?} to higher rank shape {:?}",
                self.shape(),
                target_shape
            )));
        }

        let lead = self.ndim() - target_shape.len();
        let leading_axes: Vec<usize> = (0..lead).collect();
        let reduced = self.sum_axes(&leading_axes, false)?;

        let stretched: Vec<usize> = target_shape
            .iter()
            .enumerate()
            .filter(|&(i, &dim)| dim == 1 && reduced.shape()[i] != 1)
            .map(|(i, _)| i)
            .collect();
        let reduced = reduced.sum_axes(&stretched, true)?;

        if reduced.shape() != target_shape {
            return Err(GroupNormError::shape(format!(
                "Cannot reduce {:?} to {:?}",
                self.shape(),
                target_shape
            )));
        }
        Ok(reduced)
    }

    /// Largest absolute element-wise difference, computed in f64.
    pub fn max_abs_diff(&self, other: &Tensor<T>) -> Result<f64> {
        if self.shape() != other.shape() {
            return Err(GroupNormError::shape(format!(
                "Shape mismatch: {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| (a.to_f64() - b.to_f64()).abs())
            .fold(0.0, f64::max))
    }
}
