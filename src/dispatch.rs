//! Per-field element data built from a parsed mesh.
//!
//! For every declared field, the dispatcher walks the connectivity of all domain groups, numbers
//! degrees of freedom on first encounter and caches shape function data per physical group.
//! Boundary groups are then instantiated with the boundary companion of the field's element
//! type, reusing the degrees of freedom of the domain.
use crate::config::FieldDeclaration;
use crate::dofs::{DofAllocator, DofMap};
use crate::element::{gmsh_element_info, ElementType};
use crate::mesh::{GroupConnectivity, ParsedMesh, PhysicalGroupMap, RegionKind};
use crate::quadrature::QuadratureRule;
use crate::{Error, Real, Result};
use itertools::izip;
use log::{debug, info, warn};
use nalgebra::{convert, Matrix3, Point3, Scalar, Vector3};
use std::collections::BTreeMap;

/// Shape function data of an element type evaluated at the points of a quadrature rule.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceElement<T: Scalar> {
    element_type: ElementType,
    quadrature: QuadratureRule<T>,
    basis_values: Vec<T>,
    basis_gradients: Vec<Vector3<T>>,
}

impl<T: Real> ReferenceElement<T> {
    pub fn new(element_type: ElementType, quadrature_strength: usize) -> Result<Self> {
        let quadrature = QuadratureRule::for_shape(element_type.shape(), quadrature_strength)?;
        let n = element_type.num_nodes();
        let mut basis_values = vec![T::zero(); n * quadrature.len()];
        let mut basis_gradients = vec![Vector3::zeros(); n * quadrature.len()];
        for (values, gradients, xi) in izip!(
            basis_values.chunks_exact_mut(n),
            basis_gradients.chunks_exact_mut(n),
            quadrature.points()
        ) {
            element_type.populate_basis(values, xi);
            element_type.populate_basis_gradients(gradients, xi);
        }
        Ok(Self {
            element_type,
            quadrature,
            basis_values,
            basis_gradients,
        })
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn quadrature(&self) -> &QuadratureRule<T> {
        &self.quadrature
    }

    pub fn num_nodes(&self) -> usize {
        self.element_type.num_nodes()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.quadrature.len()
    }

    /// Basis function values at the given quadrature point.
    pub fn basis_values(&self, quadrature_point: usize) -> &[T] {
        let n = self.num_nodes();
        &self.basis_values[n * quadrature_point..n * (quadrature_point + 1)]
    }

    /// Reference basis gradients at the given quadrature point.
    pub fn basis_gradients(&self, quadrature_point: usize) -> &[Vector3<T>] {
        let n = self.num_nodes();
        &self.basis_gradients[n * quadrature_point..n * (quadrature_point + 1)]
    }
}

fn gather_element_dofs(group: &str, connectivity: &[usize], dof_map: &DofMap) -> Result<Vec<usize>> {
    let mut dofs = Vec::with_capacity(connectivity.len() * dof_map.dofs_per_node());
    for &node in connectivity {
        let node_dofs = dof_map.node_dofs(node).ok_or_else(|| {
            Error::PhysicalGroup(format!(
                "physical group '{}' contains node {} which has no degrees of freedom assigned",
                group, node
            ))
        })?;
        dofs.extend_from_slice(node_dofs);
    }
    Ok(dofs)
}

/// Domain elements of one physical group with cached physical basis gradients and measures.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeElements<T: Scalar> {
    name: String,
    tag: usize,
    reference: ReferenceElement<T>,
    dofs_per_node: usize,
    connectivity: Vec<usize>,
    dofs: Vec<usize>,
    gradients: Vec<Vector3<T>>,
    measures: Vec<T>,
}

impl<T: Real> VolumeElements<T> {
    /// Builds element data for elements given by canonically ordered connectivity.
    ///
    /// Fails with [`Error::DegenerateElement`] if the reference Jacobian of an element is singular
    /// at a quadrature point.
    pub fn new(
        name: &str,
        tag: usize,
        reference: ReferenceElement<T>,
        vertices: &[Point3<T>],
        connectivity: Vec<usize>,
        dof_map: &DofMap,
    ) -> Result<Self> {
        let n = reference.num_nodes();
        let num_elements = connectivity.len() / n;
        let num_qp = reference.num_quadrature_points();
        let mut gradients = Vec::with_capacity(num_elements * num_qp * n);
        let mut measures = Vec::with_capacity(num_elements * num_qp);

        for (element, nodes) in connectivity.chunks_exact(n).enumerate() {
            for (q, &weight) in reference.quadrature().weights().iter().enumerate() {
                let reference_gradients = reference.basis_gradients(q);
                let jacobian = nodes
                    .iter()
                    .zip(reference_gradients)
                    .fold(Matrix3::zeros(), |j: Matrix3<T>, (&node, grad)| {
                        j + vertices[node].coords * grad.transpose()
                    });
                let det = jacobian.determinant();
                let inverse = jacobian
                    .try_inverse()
                    .filter(|_| det != T::zero())
                    .ok_or_else(|| Error::DegenerateElement {
                        group: name.to_string(),
                        element,
                    })?;
                let inverse_transpose = inverse.transpose();
                gradients.extend(reference_gradients.iter().map(|grad| inverse_transpose * grad));
                measures.push(weight * det.abs());
            }
        }

        let dofs = gather_element_dofs(name, &connectivity, dof_map)?;
        Ok(Self {
            name: name.to_string(),
            tag,
            reference,
            dofs_per_node: dof_map.dofs_per_node(),
            connectivity,
            dofs,
            gradients,
            measures,
        })
    }

    /// Returns a group consisting of the given subset of elements, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an element index is out of bounds.
    pub fn select(&self, elements: &[usize]) -> Self {
        let n = self.nodes_per_element();
        let num_qp = self.num_quadrature_points();
        let dofs_per_element = n * self.dofs_per_node;
        let mut selected = Self {
            name: self.name.clone(),
            tag: self.tag,
            reference: self.reference.clone(),
            dofs_per_node: self.dofs_per_node,
            connectivity: Vec::with_capacity(elements.len() * n),
            dofs: Vec::with_capacity(elements.len() * dofs_per_element),
            gradients: Vec::with_capacity(elements.len() * num_qp * n),
            measures: Vec::with_capacity(elements.len() * num_qp),
        };
        for &e in elements {
            assert!(e < self.num_elements(), "element index out of bounds");
            selected.connectivity.extend_from_slice(self.element_nodes(e));
            selected.dofs.extend_from_slice(self.element_dofs(e));
            selected
                .gradients
                .extend_from_slice(&self.gradients[e * num_qp * n..(e + 1) * num_qp * n]);
            selected.measures.extend_from_slice(self.element_measures(e));
        }
        selected
    }
}

impl<T: Scalar> VolumeElements<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn reference(&self) -> &ReferenceElement<T> {
        &self.reference
    }

    pub fn element_type(&self) -> ElementType {
        self.reference.element_type
    }

    pub fn nodes_per_element(&self) -> usize {
        self.reference.element_type.num_nodes()
    }

    pub fn dofs_per_node(&self) -> usize {
        self.dofs_per_node
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.len() / self.nodes_per_element()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.reference.quadrature.len()
    }

    /// Canonically ordered node indices of an element.
    pub fn element_nodes(&self, element: usize) -> &[usize] {
        let n = self.nodes_per_element();
        &self.connectivity[n * element..n * (element + 1)]
    }

    /// Global degrees of freedom of an element, node-major.
    pub fn element_dofs(&self, element: usize) -> &[usize] {
        let m = self.nodes_per_element() * self.dofs_per_node;
        &self.dofs[m * element..m * (element + 1)]
    }

    /// The element DOF index array, laid out as `[element][node][component]`.
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    /// Physical basis gradients of an element at a quadrature point.
    pub fn gradients(&self, element: usize, quadrature_point: usize) -> &[Vector3<T>] {
        let n = self.nodes_per_element();
        let start = (element * self.num_quadrature_points() + quadrature_point) * n;
        &self.gradients[start..start + n]
    }

    /// Quadrature weights multiplied by the Jacobian determinant at all quadrature points of an
    /// element.
    pub fn element_measures(&self, element: usize) -> &[T] {
        let num_qp = self.num_quadrature_points();
        &self.measures[num_qp * element..num_qp * (element + 1)]
    }
}

/// Boundary elements of one physical group with cached normals and surface measures.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceElements<T: Scalar> {
    name: String,
    tag: usize,
    reference: ReferenceElement<T>,
    dofs_per_node: usize,
    connectivity: Vec<usize>,
    dofs: Vec<usize>,
    normals: Vec<Vector3<T>>,
    measures: Vec<T>,
}

impl<T: Real> SurfaceElements<T> {
    /// Builds surface data for elements given by canonically ordered connectivity.
    ///
    /// Normals follow the orientation of the element, i.e. counter-clockwise node ordering
    /// seen from outside yields outward normals.
    pub fn new(
        name: &str,
        tag: usize,
        reference: ReferenceElement<T>,
        vertices: &[Point3<T>],
        connectivity: Vec<usize>,
        dof_map: &DofMap,
    ) -> Result<Self> {
        let n = reference.num_nodes();
        let num_elements = connectivity.len() / n;
        let num_qp = reference.num_quadrature_points();
        let mut normals = Vec::with_capacity(num_elements * num_qp);
        let mut measures = Vec::with_capacity(num_elements * num_qp);

        for (element, nodes) in connectivity.chunks_exact(n).enumerate() {
            for (q, &weight) in reference.quadrature().weights().iter().enumerate() {
                let (tangent1, tangent2) = nodes.iter().zip(reference.basis_gradients(q)).fold(
                    (Vector3::zeros(), Vector3::zeros()),
                    |(t1, t2): (Vector3<T>, Vector3<T>), (&node, grad)| {
                        let x = &vertices[node].coords;
                        (t1 + x * grad[0], t2 + x * grad[1])
                    },
                );
                let cross = tangent1.cross(&tangent2);
                let area_density = cross.norm();
                if area_density == T::zero() {
                    return Err(Error::DegenerateElement {
                        group: name.to_string(),
                        element,
                    });
                }
                normals.push(cross / area_density);
                measures.push(weight * area_density);
            }
        }

        let dofs = gather_element_dofs(name, &connectivity, dof_map)?;
        Ok(Self {
            name: name.to_string(),
            tag,
            reference,
            dofs_per_node: dof_map.dofs_per_node(),
            connectivity,
            dofs,
            normals,
            measures,
        })
    }
}

impl<T: Scalar> SurfaceElements<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn reference(&self) -> &ReferenceElement<T> {
        &self.reference
    }

    pub fn element_type(&self) -> ElementType {
        self.reference.element_type
    }

    pub fn nodes_per_element(&self) -> usize {
        self.reference.element_type.num_nodes()
    }

    pub fn dofs_per_node(&self) -> usize {
        self.dofs_per_node
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.len() / self.nodes_per_element()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.reference.quadrature.len()
    }

    pub fn element_nodes(&self, element: usize) -> &[usize] {
        let n = self.nodes_per_element();
        &self.connectivity[n * element..n * (element + 1)]
    }

    pub fn element_dofs(&self, element: usize) -> &[usize] {
        let m = self.nodes_per_element() * self.dofs_per_node;
        &self.dofs[m * element..m * (element + 1)]
    }

    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    /// Unit normals at all quadrature points of an element.
    pub fn element_normals(&self, element: usize) -> &[Vector3<T>] {
        let num_qp = self.num_quadrature_points();
        &self.normals[num_qp * element..num_qp * (element + 1)]
    }

    /// Surface quadrature weights at all quadrature points of an element.
    pub fn element_measures(&self, element: usize) -> &[T] {
        let num_qp = self.num_quadrature_points();
        &self.measures[num_qp * element..num_qp * (element + 1)]
    }
}

/// Degrees of freedom and element data of a single field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpace<T: Scalar> {
    name: String,
    element_type: ElementType,
    dof_map: DofMap,
    domain: BTreeMap<String, VolumeElements<T>>,
    boundary: BTreeMap<String, SurfaceElements<T>>,
}

impl<T: Scalar> FieldSpace<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn dofs_per_node(&self) -> usize {
        self.dof_map.dofs_per_node()
    }

    pub fn dof_map(&self) -> &DofMap {
        &self.dof_map
    }

    /// Domain element groups keyed by physical group name.
    pub fn domain(&self) -> &BTreeMap<String, VolumeElements<T>> {
        &self.domain
    }

    /// Boundary element groups keyed by physical group name.
    pub fn boundary(&self) -> &BTreeMap<String, SurfaceElements<T>> {
        &self.boundary
    }

    pub fn volume_group(&self, name: &str) -> Option<&VolumeElements<T>> {
        self.domain.get(name)
    }

    pub fn surface_group(&self, name: &str) -> Option<&SurfaceElements<T>> {
        self.boundary.get(name)
    }
}

/// Collects the canonically ordered connectivity of all blocks in a group that are compatible
/// with the given element type.
fn collect_group_connectivity(
    group: &str,
    region: RegionKind,
    connectivity: Option<&GroupConnectivity>,
    element_type: ElementType,
) -> Result<Vec<usize>> {
    let mut canonical = Vec::new();
    let mut found = false;
    for (&gmsh_type, block) in connectivity.into_iter().flatten() {
        let shape = gmsh_element_info(gmsh_type).and_then(|info| info.shape);
        if shape != Some(element_type.shape()) {
            warn!(
                "{:?} group '{}': skipping {} elements of gmsh type {} not declared for {}",
                region,
                group,
                block.num_elements(),
                gmsh_type,
                element_type.name()
            );
            continue;
        }
        if block.nodes_per_element() < element_type.num_nodes() {
            return Err(Error::ElementType(format!(
                "{:?} group '{}' has elements with {} nodes, but {} requires {}",
                region,
                group,
                block.nodes_per_element(),
                element_type.name(),
                element_type.num_nodes()
            )));
        }
        found = true;
        for row in block.rows() {
            canonical.extend(element_type.reorder_gmsh_nodes(row));
        }
    }
    if !found {
        return Err(Error::ElementType(format!(
            "{:?} group '{}' contains no elements compatible with {}",
            region,
            group,
            element_type.name()
        )));
    }
    Ok(canonical)
}

/// Groups of a region sorted by ascending tag.
fn groups_by_tag(groups: &PhysicalGroupMap) -> Vec<(&str, usize)> {
    let mut sorted: Vec<_> = groups.iter().map(|(name, &tag)| (name.as_str(), tag)).collect();
    sorted.sort_by_key(|&(_, tag)| tag);
    sorted
}

/// Dispatched element data of one mesh for all declared fields.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData<T: Scalar> {
    vertices: Vec<Point3<T>>,
    domain_groups: PhysicalGroupMap,
    boundary_groups: PhysicalGroupMap,
    fields: BTreeMap<String, FieldSpace<T>>,
    num_dofs: usize,
}

impl<T: Real> MeshData<T> {
    /// Numbers degrees of freedom and builds element data for the given field declarations.
    ///
    /// Fields are processed in name order. For each field, domain groups are processed in order
    /// of ascending tag before any boundary group.
    pub fn from_parsed_mesh(mesh: &ParsedMesh, fields: &BTreeMap<String, FieldDeclaration>) -> Result<Self> {
        let vertices: Vec<Point3<T>> = mesh
            .vertices()
            .iter()
            .map(|v| Point3::new(convert(v.x), convert(v.y), convert(v.z)))
            .collect();
        let mut allocator = DofAllocator::new();
        let mut field_groups = Vec::new();

        for (field_name, declaration) in fields {
            let element_type = declaration.element_type()?;
            if element_type.reference_dim() != 3 {
                return Err(Error::ElementType(format!(
                    "field '{}' uses {}, but only volumetric element types are supported for fields",
                    field_name,
                    element_type.name()
                )));
            }
            if declaration.dofs_per_node == 0 {
                return Err(Error::ConfigValidation(format!(
                    "field '{}' must have at least one degree of freedom per node",
                    field_name
                )));
            }
            let companion = element_type.boundary_companion().ok_or_else(|| {
                Error::ElementType(format!("{} has no boundary element type", element_type.name()))
            })?;
            let strength = declaration.quadrature_strength_for(element_type);
            let volume_reference = ReferenceElement::new(element_type, strength)?;
            let surface_reference = ReferenceElement::new(companion, strength)?;

            allocator.declare_field(field_name, vertices.len(), declaration.dofs_per_node);

            let mut domain = BTreeMap::new();
            for (group, tag) in groups_by_tag(mesh.domain_groups()) {
                let region = RegionKind::Domain;
                let connectivity =
                    collect_group_connectivity(group, region, mesh.group_connectivity(region, tag), element_type)?;
                let new_dofs = allocator.allocate_nodes(field_name, &connectivity);
                debug!(
                    "field '{}': domain group '{}' ({}) numbered {} new nodes",
                    field_name, group, tag, new_dofs
                );
                let dof_map = allocator
                    .dof_map(field_name)
                    .ok_or_else(|| Error::ConfigValidation(format!("field '{}' was not declared", field_name)))?;
                let elements =
                    VolumeElements::new(group, tag, volume_reference.clone(), &vertices, connectivity, dof_map)?;
                domain.insert(group.to_string(), elements);
            }

            let mut boundary = BTreeMap::new();
            let dof_map = allocator
                .dof_map(field_name)
                .ok_or_else(|| Error::ConfigValidation(format!("field '{}' was not declared", field_name)))?;
            for (group, tag) in groups_by_tag(mesh.boundary_groups()) {
                let region = RegionKind::Boundary;
                let connectivity =
                    collect_group_connectivity(group, region, mesh.group_connectivity(region, tag), companion)?;
                debug!(
                    "field '{}': boundary group '{}' ({}) with {} elements",
                    field_name,
                    group,
                    tag,
                    connectivity.len() / companion.num_nodes()
                );
                let elements =
                    SurfaceElements::new(group, tag, surface_reference.clone(), &vertices, connectivity, dof_map)?;
                boundary.insert(group.to_string(), elements);
            }
            field_groups.push((field_name.clone(), element_type, domain, boundary));
        }

        let (mut dof_maps, num_dofs) = allocator.into_dof_maps();
        let mut spaces = BTreeMap::new();
        for (name, element_type, domain, boundary) in field_groups {
            let dof_map = dof_maps
                .remove(&name)
                .ok_or_else(|| Error::ConfigValidation(format!("field '{}' was not declared", name)))?;
            spaces.insert(
                name.clone(),
                FieldSpace {
                    name,
                    element_type,
                    dof_map,
                    domain,
                    boundary,
                },
            );
        }
        info!("dispatched {} fields with {} DOFs in total", spaces.len(), num_dofs);

        Ok(Self {
            vertices,
            domain_groups: mesh.domain_groups().clone(),
            boundary_groups: mesh.boundary_groups().clone(),
            fields: spaces,
            num_dofs,
        })
    }
}

impl<T: Scalar> MeshData<T> {
    pub fn vertices(&self) -> &[Point3<T>] {
        &self.vertices
    }

    pub fn domain_groups(&self) -> &PhysicalGroupMap {
        &self.domain_groups
    }

    pub fn boundary_groups(&self) -> &PhysicalGroupMap {
        &self.boundary_groups
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldSpace<T>> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpace<T>> {
        self.fields.get(name)
    }

    /// Total number of degrees of freedom of all fields.
    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }
}

/// Layout shared by volume and surface element groups.
pub trait ElementGroup {
    fn name(&self) -> &str;
    fn num_elements(&self) -> usize;
    fn nodes_per_element(&self) -> usize;
    fn dofs_per_node(&self) -> usize;
    fn num_quadrature_points(&self) -> usize;
    fn dofs(&self) -> &[usize];
}

impl<T: Scalar> ElementGroup for VolumeElements<T> {
    fn name(&self) -> &str {
        VolumeElements::name(self)
    }

    fn num_elements(&self) -> usize {
        VolumeElements::num_elements(self)
    }

    fn nodes_per_element(&self) -> usize {
        VolumeElements::nodes_per_element(self)
    }

    fn dofs_per_node(&self) -> usize {
        VolumeElements::dofs_per_node(self)
    }

    fn num_quadrature_points(&self) -> usize {
        VolumeElements::num_quadrature_points(self)
    }

    fn dofs(&self) -> &[usize] {
        VolumeElements::dofs(self)
    }
}

impl<T: Scalar> ElementGroup for SurfaceElements<T> {
    fn name(&self) -> &str {
        SurfaceElements::name(self)
    }

    fn num_elements(&self) -> usize {
        SurfaceElements::num_elements(self)
    }

    fn nodes_per_element(&self) -> usize {
        SurfaceElements::nodes_per_element(self)
    }

    fn dofs_per_node(&self) -> usize {
        SurfaceElements::dofs_per_node(self)
    }

    fn num_quadrature_points(&self) -> usize {
        SurfaceElements::num_quadrature_points(self)
    }

    fn dofs(&self) -> &[usize] {
        SurfaceElements::dofs(self)
    }
}

/// Element groups of all realizations, either shared or one per realization.
#[derive(Clone, Debug)]
pub enum RealizationGroups<'a, G> {
    Shared(&'a G),
    PerRealization(Vec<&'a G>),
}

impl<'a, G> RealizationGroups<'a, G> {
    /// The group used by the given realization.
    ///
    /// # Panics
    ///
    /// Panics if the realization index is out of bounds for per-realization groups. Assembly
    /// routines rule this out with [`check_batch`](Self::check_batch).
    pub fn get(&self, realization: usize) -> &'a G {
        match self {
            Self::Shared(group) => group,
            Self::PerRealization(groups) => groups[realization],
        }
    }

    /// The group of the first realization, which determines the shape of element data.
    pub fn first(&self) -> Option<&'a G> {
        match self {
            Self::Shared(group) => Some(group),
            Self::PerRealization(groups) => groups.first().copied(),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

impl<'a, G: ElementGroup> RealizationGroups<'a, G> {
    /// Checks that the groups can be assembled against `num_realizations x num_dofs` arrays of a
    /// three-component field.
    pub fn check_batch(&self, num_realizations: usize, num_dofs: usize) -> Result<()> {
        let groups = match self {
            Self::Shared(group) => std::slice::from_ref(group),
            Self::PerRealization(groups) => {
                if groups.len() != num_realizations {
                    return Err(Error::RealizationConsistency(format!(
                        "{} per-realization element groups given for {} realizations",
                        groups.len(),
                        num_realizations
                    )));
                }
                groups.as_slice()
            }
        };
        let Some(reference) = groups.first() else {
            return Ok(());
        };
        let layout = |group: &G| {
            (
                group.num_elements(),
                group.nodes_per_element(),
                group.num_quadrature_points(),
            )
        };
        for group in groups {
            if group.dofs_per_node() != 3 {
                return Err(Error::ConfigValidation(format!(
                    "group '{}' has {} DOFs per node, but displacements need 3",
                    group.name(),
                    group.dofs_per_node()
                )));
            }
            if layout(*group) != layout(*reference) {
                return Err(Error::RealizationConsistency(format!(
                    "element layout of group '{}' differs between realizations",
                    group.name()
                )));
            }
            if let Some(&max_dof) = group.dofs().iter().max() {
                if max_dof >= num_dofs {
                    return Err(Error::RealizationConsistency(format!(
                        "group '{}' refers to DOF {}, but the batched arrays have {} columns",
                        group.name(),
                        max_dof,
                        num_dofs
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The meshes used by a batch of realizations.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshSet<T: Scalar> {
    /// One mesh shared by all realizations.
    Single(MeshData<T>),
    /// One mesh per realization, all with identical topology and DOF numbering.
    RealizationMeshes(Vec<MeshData<T>>),
}

impl<T: Scalar> MeshSet<T> {
    /// Verifies that the mesh set can be used with the given number of realizations and field.
    pub fn validate(&self, num_realizations: usize, field: &str) -> Result<()> {
        let meshes = match self {
            Self::Single(mesh) => std::slice::from_ref(mesh),
            Self::RealizationMeshes(meshes) => {
                if meshes.len() != num_realizations {
                    return Err(Error::RealizationConsistency(format!(
                        "expected one mesh per realization ({}), but got {} meshes",
                        num_realizations,
                        meshes.len()
                    )));
                }
                meshes.as_slice()
            }
        };

        for (r, mesh) in meshes.iter().enumerate() {
            if mesh.field(field).is_none() {
                return Err(Error::ConfigValidation(format!(
                    "field '{}' is not declared for the mesh of realization {}",
                    field, r
                )));
            }
        }

        if let [reference, rest @ ..] = meshes {
            for (r, mesh) in rest.iter().enumerate().map(|(i, mesh)| (i + 1, mesh)) {
                check_consistent_meshes(reference, mesh, r)?;
            }
        }
        Ok(())
    }

    pub fn num_meshes(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::RealizationMeshes(meshes) => meshes.len(),
        }
    }

    /// The first mesh, which determines DOF numbering and physical groups for all realizations.
    ///
    /// # Panics
    ///
    /// Panics if the set holds no meshes.
    pub fn reference_mesh(&self) -> &MeshData<T> {
        match self {
            Self::Single(mesh) => mesh,
            Self::RealizationMeshes(meshes) => &meshes[0],
        }
    }

    pub fn mesh_for_realization(&self, realization: usize) -> &MeshData<T> {
        match self {
            Self::Single(mesh) => mesh,
            Self::RealizationMeshes(meshes) => &meshes[realization],
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.reference_mesh().num_dofs()
    }

    /// Domain elements of a group for all realizations.
    pub fn volume_groups(&self, field: &str, group: &str) -> Option<RealizationGroups<'_, VolumeElements<T>>> {
        match self {
            Self::Single(mesh) => Some(RealizationGroups::Shared(mesh.field(field)?.volume_group(group)?)),
            Self::RealizationMeshes(meshes) => meshes
                .iter()
                .map(|mesh| mesh.field(field)?.volume_group(group))
                .collect::<Option<Vec<_>>>()
                .map(RealizationGroups::PerRealization),
        }
    }

    /// Boundary elements of a group for all realizations.
    pub fn surface_groups(&self, field: &str, group: &str) -> Option<RealizationGroups<'_, SurfaceElements<T>>> {
        match self {
            Self::Single(mesh) => Some(RealizationGroups::Shared(mesh.field(field)?.surface_group(group)?)),
            Self::RealizationMeshes(meshes) => meshes
                .iter()
                .map(|mesh| mesh.field(field)?.surface_group(group))
                .collect::<Option<Vec<_>>>()
                .map(RealizationGroups::PerRealization),
        }
    }
}

fn check_consistent_meshes<T: Scalar>(reference: &MeshData<T>, mesh: &MeshData<T>, realization: usize) -> Result<()> {
    let inconsistent = |what: &str| {
        Err(Error::RealizationConsistency(format!(
            "mesh of realization {} differs from the mesh of realization 0 in {}",
            realization, what
        )))
    };

    if mesh.domain_groups != reference.domain_groups || mesh.boundary_groups != reference.boundary_groups {
        return Err(Error::PhysicalGroup(format!(
            "physical groups of the mesh of realization {} differ from those of realization 0",
            realization
        )));
    }
    if mesh.num_dofs != reference.num_dofs {
        return inconsistent("DOF count");
    }
    if mesh.vertices.len() != reference.vertices.len() {
        return inconsistent("node count");
    }
    if !mesh.fields.keys().eq(reference.fields.keys()) {
        return inconsistent("declared fields");
    }
    for (field, space) in &mesh.fields {
        let reference_space = &reference.fields[field];
        if space.element_type != reference_space.element_type {
            return inconsistent(&format!("element type of field '{}'", field));
        }
        for (group, elements) in &space.domain {
            let consistent = reference_space
                .domain
                .get(group)
                .map_or(false, |other| other.dofs == elements.dofs && other.reference == elements.reference);
            if !consistent {
                return inconsistent(&format!("elements of domain group '{}'", group));
            }
        }
        for (group, elements) in &space.boundary {
            let consistent = reference_space
                .boundary
                .get(group)
                .map_or(false, |other| other.dofs == elements.dofs && other.reference == elements.reference);
            if !consistent {
                return inconsistent(&format!("elements of boundary group '{}'", group));
            }
        }
    }
    Ok(())
}
