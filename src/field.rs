//! Batched per-quadrature-point data.
use nalgebra::Matrix3;

/// Values stored per realization, element and quadrature point.
///
/// Data is laid out in row-major order `[realization][element][quadrature point]`.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadratureField<V> {
    num_realizations: usize,
    num_elements: usize,
    num_quadrature_points: usize,
    data: Vec<V>,
}

/// Batched 3x3 tensors, e.g. deformation gradients or stresses.
pub type TensorField<T> = QuadratureField<Matrix3<T>>;

/// Batched scalars, e.g. energy densities.
pub type ScalarField<T> = QuadratureField<T>;

impl<V: Clone> QuadratureField<V> {
    pub fn from_element(
        num_realizations: usize,
        num_elements: usize,
        num_quadrature_points: usize,
        value: V,
    ) -> Self {
        Self {
            num_realizations,
            num_elements,
            num_quadrature_points,
            data: vec![value; num_realizations * num_elements * num_quadrature_points],
        }
    }
}

impl<V> QuadratureField<V> {
    /// # Panics
    ///
    /// Panics if the length of `data` does not match the given shape.
    pub fn from_vec(num_realizations: usize, num_elements: usize, num_quadrature_points: usize, data: Vec<V>) -> Self {
        assert_eq!(
            data.len(),
            num_realizations * num_elements * num_quadrature_points,
            "data length must match field shape"
        );
        Self {
            num_realizations,
            num_elements,
            num_quadrature_points,
            data,
        }
    }

    pub fn num_realizations(&self) -> usize {
        self.num_realizations
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.num_quadrature_points
    }

    /// Number of values stored for a single realization.
    pub fn realization_len(&self) -> usize {
        self.num_elements * self.num_quadrature_points
    }

    pub fn as_slice(&self) -> &[V] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.data
    }

    pub fn get(&self, realization: usize, element: usize, quadrature_point: usize) -> &V {
        &self.data[self.linear_index(realization, element, quadrature_point)]
    }

    pub fn get_mut(&mut self, realization: usize, element: usize, quadrature_point: usize) -> &mut V {
        let index = self.linear_index(realization, element, quadrature_point);
        &mut self.data[index]
    }

    /// Values of all quadrature points of one element in one realization.
    pub fn element_values(&self, realization: usize, element: usize) -> &[V] {
        let start = self.linear_index(realization, element, 0);
        &self.data[start..start + self.num_quadrature_points]
    }

    /// Maps each value to a new field of the same shape.
    pub fn map<W>(&self, f: impl FnMut(&V) -> W) -> QuadratureField<W> {
        QuadratureField {
            num_realizations: self.num_realizations,
            num_elements: self.num_elements,
            num_quadrature_points: self.num_quadrature_points,
            data: self.data.iter().map(f).collect(),
        }
    }

    fn linear_index(&self, realization: usize, element: usize, quadrature_point: usize) -> usize {
        assert!(realization < self.num_realizations, "realization index out of bounds");
        assert!(element < self.num_elements, "element index out of bounds");
        assert!(quadrature_point < self.num_quadrature_points, "quadrature point index out of bounds");
        (realization * self.num_elements + element) * self.num_quadrature_points + quadrature_point
    }
}
