use hyperbatch::element::{gmsh_element_info, ElementType, ReferenceShape};
use hyperbatch::quadrature::QuadratureRule;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;

/// Reference coordinates of the nodes of an element type in canonical order.
fn reference_nodes(element_type: ElementType) -> Vec<Point3<f64>> {
    let p = |x, y, z| Point3::new(x, y, z);
    let midpoints = |vertices: &[Point3<f64>], edges: &[(usize, usize)]| {
        edges
            .iter()
            .map(|&(i, j)| nalgebra::center(&vertices[i], &vertices[j]))
            .collect::<Vec<_>>()
    };
    match element_type {
        ElementType::Segment2 => vec![p(-1.0, 0.0, 0.0), p(1.0, 0.0, 0.0)],
        ElementType::Tri3 => vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
        ElementType::Quad4 => vec![
            p(-1.0, -1.0, 0.0),
            p(1.0, -1.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(-1.0, 1.0, 0.0),
        ],
        ElementType::Tet4 => vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
        ],
        ElementType::Hex8 => vec![
            p(-1.0, -1.0, -1.0),
            p(1.0, -1.0, -1.0),
            p(1.0, 1.0, -1.0),
            p(-1.0, 1.0, -1.0),
            p(-1.0, -1.0, 1.0),
            p(1.0, -1.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(-1.0, 1.0, 1.0),
        ],
        ElementType::Tri6 => {
            let mut nodes = reference_nodes(ElementType::Tri3);
            let edges = midpoints(&nodes, &[(0, 1), (1, 2), (2, 0)]);
            nodes.extend(edges);
            nodes
        }
        ElementType::Tet10 => {
            let mut nodes = reference_nodes(ElementType::Tet4);
            let edges = midpoints(&nodes, &[(0, 1), (1, 2), (0, 2), (0, 3), (1, 3), (2, 3)]);
            nodes.extend(edges);
            nodes
        }
    }
}

fn basis(element_type: ElementType, xi: &Point3<f64>) -> Vec<f64> {
    let mut values = vec![0.0; element_type.num_nodes()];
    element_type.populate_basis(&mut values, xi);
    values
}

fn basis_gradients(element_type: ElementType, xi: &Point3<f64>) -> Vec<Vector3<f64>> {
    let mut gradients = vec![Vector3::zeros(); element_type.num_nodes()];
    element_type.populate_basis_gradients(&mut gradients, xi);
    gradients
}

fn reference_volume(shape: ReferenceShape) -> f64 {
    match shape {
        ReferenceShape::Segment => 2.0,
        ReferenceShape::Triangle => 0.5,
        ReferenceShape::Quadrilateral => 4.0,
        ReferenceShape::Tetrahedron => 1.0 / 6.0,
        ReferenceShape::Hexahedron => 8.0,
    }
}

#[test]
fn basis_is_nodal() {
    for element_type in ElementType::ALL {
        for (i, xi) in reference_nodes(element_type).iter().enumerate() {
            let values = basis(element_type, xi);
            for (j, &value) in values.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_scalar_eq!(value, expected, comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn element_type_names_and_tags_round_trip() {
    for element_type in ElementType::ALL {
        assert_eq!(ElementType::from_name(element_type.name()), Some(element_type));
        assert_eq!(ElementType::from_gmsh_tag(element_type.gmsh_tag()), Some(element_type));
        let info = gmsh_element_info(element_type.gmsh_tag()).unwrap();
        assert_eq!(info.num_nodes, element_type.num_nodes());
        assert_eq!(info.dim, element_type.reference_dim());
        assert_eq!(info.shape, Some(element_type.shape()));
    }
    assert_eq!(ElementType::from_name(" tet10 "), Some(ElementType::Tet10));
    assert_eq!(ElementType::from_name("Prism6"), None);
    assert_eq!(ElementType::from_gmsh_tag(6), None);
}

#[test]
fn boundary_companions() {
    assert_eq!(ElementType::Tet4.boundary_companion(), Some(ElementType::Tri3));
    assert_eq!(ElementType::Tet10.boundary_companion(), Some(ElementType::Tri6));
    assert_eq!(ElementType::Hex8.boundary_companion(), Some(ElementType::Quad4));
    assert_eq!(ElementType::Segment2.boundary_companion(), None);
}

#[test]
fn tet10_gmsh_nodes_are_permuted() {
    let gmsh_row: Vec<usize> = (10..20).collect();
    let canonical: Vec<usize> = ElementType::Tet10.reorder_gmsh_nodes(&gmsh_row).collect();
    assert_eq!(canonical, vec![10, 11, 12, 13, 14, 15, 16, 17, 19, 18]);

    // Linear types only take the leading vertices of a higher-order row
    let tet4: Vec<usize> = ElementType::Tet4.reorder_gmsh_nodes(&gmsh_row).collect();
    assert_eq!(tet4, vec![10, 11, 12, 13]);
}

#[test]
fn quadrature_weights_sum_to_reference_volume() -> eyre::Result<()> {
    for element_type in ElementType::ALL {
        let shape = element_type.shape();
        for strength in 1..=4 {
            let rule = QuadratureRule::<f64>::for_shape(shape, strength)?;
            let sum: f64 = rule.weights().iter().sum();
            assert_scalar_eq!(sum, reference_volume(shape), comp = abs, tol = 1e-13);
        }
    }
    Ok(())
}

#[test]
fn quadrature_integrates_basis_products_on_tetrahedron() -> eyre::Result<()> {
    // Two Tet10 vertex functions have a mass matrix entry of 1/420 of the element volume
    let rule = QuadratureRule::<f64>::for_shape(ReferenceShape::Tetrahedron, 4)?;
    let integral: f64 = rule
        .weights()
        .iter()
        .zip(rule.points())
        .map(|(w, xi)| {
            let values = basis(ElementType::Tet10, xi);
            w * values[0] * values[1]
        })
        .sum();
    assert_scalar_eq!(integral, 1.0 / 420.0 / 6.0, comp = abs, tol = 1e-14);
    Ok(())
}

fn reference_point(element_type: ElementType) -> impl Strategy<Value = Point3<f64>> {
    let unit = 0.0..1.0;
    (unit.clone(), unit.clone(), unit).prop_map(move |(x, y, z)| match element_type.shape() {
        ReferenceShape::Segment => Point3::new(2.0 * x - 1.0, 0.0, 0.0),
        ReferenceShape::Quadrilateral => Point3::new(2.0 * x - 1.0, 2.0 * y - 1.0, 0.0),
        ReferenceShape::Hexahedron => Point3::new(2.0 * x - 1.0, 2.0 * y - 1.0, 2.0 * z - 1.0),
        ReferenceShape::Triangle => Point3::new(x * (1.0 - y), y, 0.0),
        ReferenceShape::Tetrahedron => Point3::new(x * (1.0 - y) * (1.0 - z), y * (1.0 - z), z),
    })
}

fn element_and_point() -> impl Strategy<Value = (ElementType, Point3<f64>)> {
    proptest::sample::select(ElementType::ALL.to_vec())
        .prop_flat_map(|element_type| (Just(element_type), reference_point(element_type)))
}

proptest! {
    #[test]
    fn basis_is_partition_of_unity((element_type, xi) in element_and_point()) {
        let sum: f64 = basis(element_type, &xi).iter().sum();
        assert_scalar_eq!(sum, 1.0, comp = abs, tol = 1e-13);

        let gradient_sum = basis_gradients(element_type, &xi)
            .iter()
            .fold(Vector3::zeros(), |acc, grad| acc + grad);
        assert_matrix_eq!(gradient_sum, Vector3::<f64>::zeros(), comp = abs, tol = 1e-13);
    }

    #[test]
    fn basis_gradients_match_finite_differences((element_type, xi) in element_and_point()) {
        let h = 1e-6;
        let gradients = basis_gradients(element_type, &xi);
        for d in 0..element_type.reference_dim() {
            let mut forward = xi;
            let mut backward = xi;
            forward[d] += h;
            backward[d] -= h;
            let plus = basis(element_type, &forward);
            let minus = basis(element_type, &backward);
            for (grad, (p, m)) in gradients.iter().zip(plus.iter().zip(&minus)) {
                let fd = (p - m) / (2.0 * h);
                assert_scalar_eq!(grad[d], fd, comp = abs, tol = 1e-8);
            }
        }
        for grad in &gradients {
            for d in element_type.reference_dim()..3 {
                prop_assert_eq!(grad[d], 0.0);
            }
        }
    }
}
