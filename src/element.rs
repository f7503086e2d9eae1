//! Registry of supported element types and their reference shape functions.
//!
//! Reference coordinates of lower-dimensional elements occupy the leading components of a
//! [`Point3`], the remaining components are ignored. Likewise, basis gradients of surface and
//! line elements have zeros in the trailing components.
use crate::Real;
use nalgebra::{convert, Point3, Vector3};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Geometric shape of a reference element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceShape {
    Segment,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Hexahedron,
}

impl ReferenceShape {
    /// Topological dimension of the shape.
    pub fn dim(&self) -> usize {
        match self {
            Self::Segment => 1,
            Self::Triangle | Self::Quadrilateral => 2,
            Self::Tetrahedron | Self::Hexahedron => 3,
        }
    }
}

/// Metadata associated with a Gmsh element type tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GmshElementInfo {
    pub dim: usize,
    pub num_nodes: usize,
    /// `None` for shapes without a counterpart in [`ReferenceShape`] (points, prisms, pyramids).
    pub shape: Option<ReferenceShape>,
}

/// Looks up the dimension, node count and shape of a Gmsh element type.
///
/// This covers more types than [`ElementType`] so that meshes containing e.g. higher-order
/// elements can still be parsed.
pub fn gmsh_element_info(gmsh_tag: usize) -> Option<GmshElementInfo> {
    use ReferenceShape::*;
    let (dim, num_nodes, shape) = match gmsh_tag {
        1 => (1, 2, Some(Segment)),
        2 => (2, 3, Some(Triangle)),
        3 => (2, 4, Some(Quadrilateral)),
        4 => (3, 4, Some(Tetrahedron)),
        5 => (3, 8, Some(Hexahedron)),
        6 => (3, 6, None),
        7 => (3, 5, None),
        8 => (1, 3, Some(Segment)),
        9 => (2, 6, Some(Triangle)),
        10 => (2, 9, Some(Quadrilateral)),
        11 => (3, 10, Some(Tetrahedron)),
        12 => (3, 27, Some(Hexahedron)),
        15 => (0, 1, None),
        16 => (2, 8, Some(Quadrilateral)),
        17 => (3, 20, Some(Hexahedron)),
        _ => return None,
    };
    Some(GmshElementInfo { dim, num_nodes, shape })
}

/// Element types that can be used for fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Segment2,
    Tri3,
    Quad4,
    Tet4,
    Hex8,
    Tri6,
    Tet10,
}

const IDENTITY_PERMUTATION: [usize; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
// Gmsh places the (2, 3) edge node before the (1, 3) edge node
const TET10_PERMUTATION: [usize; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 9, 8];

const TRI6_EDGES: [(usize, usize); 3] = [(0, 1), (1, 2), (2, 0)];
const TET10_EDGES: [(usize, usize); 6] = [(0, 1), (1, 2), (0, 2), (0, 3), (1, 3), (2, 3)];

const QUAD4_CORNERS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
#[rustfmt::skip]
const HEX8_CORNERS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
    [-1.0, -1.0,  1.0], [1.0, -1.0,  1.0], [1.0, 1.0,  1.0], [-1.0, 1.0,  1.0],
];

impl ElementType {
    pub const ALL: [ElementType; 7] = [
        Self::Segment2,
        Self::Tri3,
        Self::Quad4,
        Self::Tet4,
        Self::Hex8,
        Self::Tri6,
        Self::Tet10,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Segment2 => "Segment2",
            Self::Tri3 => "Tri3",
            Self::Quad4 => "Quad4",
            Self::Tet4 => "Tet4",
            Self::Hex8 => "Hex8",
            Self::Tri6 => "Tri6",
            Self::Tet10 => "Tet10",
        }
    }

    /// Resolves a (case-insensitive) element type name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|element_type| element_type.name().eq_ignore_ascii_case(name))
    }

    pub fn gmsh_tag(&self) -> usize {
        match self {
            Self::Segment2 => 1,
            Self::Tri3 => 2,
            Self::Quad4 => 3,
            Self::Tet4 => 4,
            Self::Hex8 => 5,
            Self::Tri6 => 9,
            Self::Tet10 => 11,
        }
    }

    pub fn from_gmsh_tag(tag: usize) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|element_type| element_type.gmsh_tag() == tag)
    }

    pub fn shape(&self) -> ReferenceShape {
        match self {
            Self::Segment2 => ReferenceShape::Segment,
            Self::Tri3 | Self::Tri6 => ReferenceShape::Triangle,
            Self::Quad4 => ReferenceShape::Quadrilateral,
            Self::Tet4 | Self::Tet10 => ReferenceShape::Tetrahedron,
            Self::Hex8 => ReferenceShape::Hexahedron,
        }
    }

    pub fn reference_dim(&self) -> usize {
        self.shape().dim()
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            Self::Segment2 => 2,
            Self::Tri3 => 3,
            Self::Quad4 => 4,
            Self::Tet4 => 4,
            Self::Hex8 => 8,
            Self::Tri6 => 6,
            Self::Tet10 => 10,
        }
    }

    /// Polynomial degree of the basis along an edge of the element.
    pub fn polynomial_degree(&self) -> usize {
        match self {
            Self::Tri6 | Self::Tet10 => 2,
            _ => 1,
        }
    }

    /// The element type that discretizes the boundary of this element type.
    pub fn boundary_companion(&self) -> Option<Self> {
        match self {
            Self::Tet4 => Some(Self::Tri3),
            Self::Tet10 => Some(Self::Tri6),
            Self::Hex8 => Some(Self::Quad4),
            Self::Tri3 | Self::Quad4 => Some(Self::Segment2),
            Self::Segment2 | Self::Tri6 => None,
        }
    }

    /// Permutation from Gmsh node order to the canonical node order of this element type.
    ///
    /// The canonical local node `i` is the Gmsh local node `permutation[i]`.
    pub fn gmsh_permutation(&self) -> &'static [usize] {
        match self {
            Self::Tet10 => &TET10_PERMUTATION,
            _ => &IDENTITY_PERMUTATION[..self.num_nodes()],
        }
    }

    /// Reorders a row of Gmsh-ordered node indices into canonical order.
    ///
    /// Rows of higher-order elements of the same shape are accepted, since Gmsh always lists
    /// vertices first.
    ///
    /// # Panics
    ///
    /// Panics if the row has fewer entries than [`num_nodes`](Self::num_nodes).
    pub fn reorder_gmsh_nodes<'a>(&self, gmsh_nodes: &'a [usize]) -> impl Iterator<Item = usize> + 'a {
        assert!(
            gmsh_nodes.len() >= self.num_nodes(),
            "connectivity row has too few nodes for {}",
            self.name()
        );
        self.gmsh_permutation().iter().map(move |&i| gmsh_nodes[i])
    }

    /// Evaluates all basis functions at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `basis` does not have exactly one entry per node.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn populate_basis<T: Real>(&self, basis: &mut [T], xi: &Point3<T>) {
        assert_eq!(basis.len(), self.num_nodes(), "basis buffer must have one entry per node");
        let (x, y, z) = (xi[0], xi[1], xi[2]);
        match self {
            Self::Segment2 => {
                basis[0] = 0.5 * (1.0 - x);
                basis[1] = 0.5 * (1.0 + x);
            }
            Self::Tri3 => basis.copy_from_slice(&[1.0 - x - y, x, y]),
            Self::Tet4 => basis.copy_from_slice(&[1.0 - x - y - z, x, y, z]),
            Self::Quad4 => {
                for (phi, corner) in basis.iter_mut().zip(&QUAD4_CORNERS) {
                    let (cx, cy): (T, T) = (convert(corner[0]), convert(corner[1]));
                    *phi = 0.25 * (1.0 + cx * x) * (1.0 + cy * y);
                }
            }
            Self::Hex8 => {
                for (phi, corner) in basis.iter_mut().zip(&HEX8_CORNERS) {
                    let (cx, cy, cz): (T, T, T) = (convert(corner[0]), convert(corner[1]), convert(corner[2]));
                    *phi = 0.125 * (1.0 + cx * x) * (1.0 + cy * y) * (1.0 + cz * z);
                }
            }
            Self::Tri6 => quadratic_simplex_basis(&[1.0 - x - y, x, y], &TRI6_EDGES, basis),
            Self::Tet10 => quadratic_simplex_basis(&[1.0 - x - y - z, x, y, z], &TET10_EDGES, basis),
        }
    }

    /// Evaluates the reference gradients of all basis functions at the given reference coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `gradients` does not have exactly one entry per node.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn populate_basis_gradients<T: Real>(&self, gradients: &mut [Vector3<T>], xi: &Point3<T>) {
        assert_eq!(
            gradients.len(),
            self.num_nodes(),
            "gradient buffer must have one entry per node"
        );
        let (x, y, z) = (xi[0], xi[1], xi[2]);
        match self {
            Self::Segment2 => {
                gradients[0] = Vector3::new(-0.5, 0.0, 0.0);
                gradients[1] = Vector3::new(0.5, 0.0, 0.0);
            }
            Self::Tri3 => gradients.copy_from_slice(&triangle_barycentric_gradients()),
            Self::Tet4 => gradients.copy_from_slice(&tetrahedron_barycentric_gradients()),
            Self::Quad4 => {
                for (grad, corner) in gradients.iter_mut().zip(&QUAD4_CORNERS) {
                    let (cx, cy): (T, T) = (convert(corner[0]), convert(corner[1]));
                    *grad = Vector3::new(
                        0.25 * cx * (1.0 + cy * y),
                        0.25 * cy * (1.0 + cx * x),
                        0.0,
                    );
                }
            }
            Self::Hex8 => {
                for (grad, corner) in gradients.iter_mut().zip(&HEX8_CORNERS) {
                    let (cx, cy, cz): (T, T, T) = (convert(corner[0]), convert(corner[1]), convert(corner[2]));
                    *grad = Vector3::new(
                        0.125 * cx * (1.0 + cy * y) * (1.0 + cz * z),
                        0.125 * cy * (1.0 + cx * x) * (1.0 + cz * z),
                        0.125 * cz * (1.0 + cx * x) * (1.0 + cy * y),
                    );
                }
            }
            Self::Tri6 => quadratic_simplex_gradients(
                &[1.0 - x - y, x, y],
                &triangle_barycentric_gradients(),
                &TRI6_EDGES,
                gradients,
            ),
            Self::Tet10 => quadratic_simplex_gradients(
                &[1.0 - x - y - z, x, y, z],
                &tetrahedron_barycentric_gradients(),
                &TET10_EDGES,
                gradients,
            ),
        }
    }
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
fn triangle_barycentric_gradients<T: Real>() -> [Vector3<T>; 3] {
    [
        Vector3::new(-1.0, -1.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ]
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
fn tetrahedron_barycentric_gradients<T: Real>() -> [Vector3<T>; 4] {
    [
        Vector3::new(-1.0, -1.0, -1.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    ]
}

/// Quadratic Lagrange basis on a simplex: vertex functions first, then one function per edge.
#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
fn quadratic_simplex_basis<T: Real>(lambda: &[T], edges: &[(usize, usize)], basis: &mut [T]) {
    let n_vertices = lambda.len();
    for (phi, &l) in basis.iter_mut().zip(lambda) {
        *phi = l * (2.0 * l - 1.0);
    }
    for (phi, &(i, j)) in basis[n_vertices..].iter_mut().zip(edges) {
        *phi = 4.0 * lambda[i] * lambda[j];
    }
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
fn quadratic_simplex_gradients<T: Real>(
    lambda: &[T],
    lambda_gradients: &[Vector3<T>],
    edges: &[(usize, usize)],
    gradients: &mut [Vector3<T>],
) {
    let n_vertices = lambda.len();
    for (grad, (&l, dl)) in gradients.iter_mut().zip(lambda.iter().zip(lambda_gradients)) {
        *grad = dl * (4.0 * l - 1.0);
    }
    for (grad, &(i, j)) in gradients[n_vertices..].iter_mut().zip(edges) {
        *grad = (lambda_gradients[j] * lambda[i] + lambda_gradients[i] * lambda[j]) * 4.0;
    }
}
