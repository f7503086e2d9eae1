//! Raw mesh data as read from a mesh file.
use crate::element::gmsh_element_info;
use crate::{Error, Result};
use log::{info, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Whether a physical group belongs to the domain or to its boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegionKind {
    Domain,
    Boundary,
}

/// A named physical group as declared in a mesh file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalGroup {
    pub dim: usize,
    pub tag: usize,
    pub name: String,
}

/// A single element record: Gmsh element type, the physical group it belongs to and its
/// 0-based node indices in Gmsh order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawElement {
    pub gmsh_type: usize,
    pub physical_tag: usize,
    pub nodes: Vec<usize>,
}

/// Maps physical group names to tags.
pub type PhysicalGroupMap = BTreeMap<String, usize>;

/// Connectivity of all elements of one type in one physical group, stored row by row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityBlock {
    nodes_per_element: usize,
    indices: Vec<usize>,
}

impl ConnectivityBlock {
    pub fn new(nodes_per_element: usize) -> Self {
        Self {
            nodes_per_element,
            indices: Vec::new(),
        }
    }

    /// Appends an element.
    ///
    /// # Panics
    ///
    /// Panics if the row length differs from the block width.
    pub fn push_row(&mut self, nodes: &[usize]) {
        assert_eq!(nodes.len(), self.nodes_per_element, "row length must match block width");
        self.indices.extend_from_slice(nodes);
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    pub fn num_elements(&self) -> usize {
        self.indices.len() / self.nodes_per_element.max(1)
    }

    pub fn row(&self, element: usize) -> &[usize] {
        let n = self.nodes_per_element;
        &self.indices[n * element..n * (element + 1)]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        self.indices.chunks_exact(self.nodes_per_element.max(1))
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// Connectivity of one physical group, keyed by Gmsh element type tag.
pub type GroupConnectivity = BTreeMap<usize, ConnectivityBlock>;

/// Node coordinates, physical groups and per-group connectivity of a mesh.
///
/// Physical groups are split into two regions by their topological dimension: groups of the
/// higher dimension form the domain, groups of the lower dimension its boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedMesh {
    vertices: Vec<Point3<f64>>,
    domain_dim: usize,
    boundary_dim: usize,
    domain_groups: PhysicalGroupMap,
    boundary_groups: PhysicalGroupMap,
    domain_connectivity: BTreeMap<usize, GroupConnectivity>,
    boundary_connectivity: BTreeMap<usize, GroupConnectivity>,
}

impl ParsedMesh {
    /// Assembles a mesh from vertices, physical group declarations and element records.
    ///
    /// Elements whose dimension and physical tag do not match a declared group are skipped.
    pub fn from_physical_groups(
        vertices: Vec<Point3<f64>>,
        groups: &[PhysicalGroup],
        elements: impl IntoIterator<Item = RawElement>,
    ) -> Result<Self> {
        let dims: BTreeSet<usize> = groups.iter().map(|group| group.dim).collect();
        if dims.len() != 2 {
            return Err(Error::PhysicalGroup(format!(
                "physical group dimensions must form exactly two classes (domain and boundary), found {:?}",
                dims
            )));
        }
        let boundary_dim = *dims.iter().next().unwrap_or(&0);
        let domain_dim = *dims.iter().next_back().unwrap_or(&0);

        let mut mesh = Self {
            vertices,
            domain_dim,
            boundary_dim,
            domain_groups: PhysicalGroupMap::new(),
            boundary_groups: PhysicalGroupMap::new(),
            domain_connectivity: BTreeMap::new(),
            boundary_connectivity: BTreeMap::new(),
        };

        for group in groups {
            let region = mesh.region_for_dim(group.dim).unwrap_or(RegionKind::Domain);
            let map = match region {
                RegionKind::Domain => &mut mesh.domain_groups,
                RegionKind::Boundary => &mut mesh.boundary_groups,
            };
            if map.values().any(|&tag| tag == group.tag) {
                return Err(Error::PhysicalGroup(format!(
                    "physical tag {} is declared more than once for dimension {}",
                    group.tag, group.dim
                )));
            }
            if map.insert(group.name.clone(), group.tag).is_some() {
                return Err(Error::PhysicalGroup(format!(
                    "physical group name '{}' is declared more than once for dimension {}",
                    group.name, group.dim
                )));
            }
        }

        let mut num_skipped = 0;
        for element in elements {
            let info = gmsh_element_info(element.gmsh_type).ok_or_else(|| {
                Error::ElementType(format!("unsupported Gmsh element type {}", element.gmsh_type))
            })?;
            if element.nodes.len() != info.num_nodes {
                return Err(Error::MeshFormat(format!(
                    "element of Gmsh type {} must have {} nodes, but has {}",
                    element.gmsh_type,
                    info.num_nodes,
                    element.nodes.len()
                )));
            }
            if let Some(&node) = element.nodes.iter().find(|&&node| node >= mesh.vertices.len()) {
                return Err(Error::MeshFormat(format!(
                    "element references node index {} but the mesh only has {} nodes",
                    node,
                    mesh.vertices.len()
                )));
            }

            let region = mesh.region_for_dim(info.dim);
            let declared = match region {
                Some(RegionKind::Domain) => mesh.domain_groups.values().any(|&t| t == element.physical_tag),
                Some(RegionKind::Boundary) => mesh.boundary_groups.values().any(|&t| t == element.physical_tag),
                None => false,
            };
            let connectivity = match region {
                Some(RegionKind::Domain) if declared => &mut mesh.domain_connectivity,
                Some(RegionKind::Boundary) if declared => &mut mesh.boundary_connectivity,
                _ => {
                    num_skipped += 1;
                    continue;
                }
            };
            connectivity
                .entry(element.physical_tag)
                .or_default()
                .entry(element.gmsh_type)
                .or_insert_with(|| ConnectivityBlock::new(info.num_nodes))
                .push_row(&element.nodes);
        }

        if num_skipped > 0 {
            warn!(
                "skipped {} elements that do not belong to a declared physical group",
                num_skipped
            );
        }
        info!(
            "mesh with {} nodes, {} domain groups and {} boundary groups",
            mesh.vertices.len(),
            mesh.domain_groups.len(),
            mesh.boundary_groups.len()
        );
        Ok(mesh)
    }

    fn region_for_dim(&self, dim: usize) -> Option<RegionKind> {
        if dim == self.domain_dim {
            Some(RegionKind::Domain)
        } else if dim == self.boundary_dim {
            Some(RegionKind::Boundary)
        } else {
            None
        }
    }

    /// Returns a copy of this mesh with replaced vertex coordinates.
    pub fn with_vertices(&self, vertices: Vec<Point3<f64>>) -> Result<Self> {
        if vertices.len() != self.vertices.len() {
            return Err(Error::MeshFormat(format!(
                "replacement vertices must have the same count as the mesh ({} != {})",
                vertices.len(),
                self.vertices.len()
            )));
        }
        Ok(Self {
            vertices,
            ..self.clone()
        })
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn domain_dim(&self) -> usize {
        self.domain_dim
    }

    pub fn boundary_dim(&self) -> usize {
        self.boundary_dim
    }

    pub fn domain_groups(&self) -> &PhysicalGroupMap {
        &self.domain_groups
    }

    pub fn boundary_groups(&self) -> &PhysicalGroupMap {
        &self.boundary_groups
    }

    pub fn groups(&self, region: RegionKind) -> &PhysicalGroupMap {
        match region {
            RegionKind::Domain => &self.domain_groups,
            RegionKind::Boundary => &self.boundary_groups,
        }
    }

    /// Connectivity of all domain groups, keyed by physical tag.
    pub fn domain_connectivity(&self) -> &BTreeMap<usize, GroupConnectivity> {
        &self.domain_connectivity
    }

    /// Connectivity of all boundary groups, keyed by physical tag.
    pub fn boundary_connectivity(&self) -> &BTreeMap<usize, GroupConnectivity> {
        &self.boundary_connectivity
    }

    /// Connectivity of a group in the given region, or `None` if the group has no elements.
    pub fn group_connectivity(&self, region: RegionKind, tag: usize) -> Option<&GroupConnectivity> {
        match region {
            RegionKind::Domain => self.domain_connectivity.get(&tag),
            RegionKind::Boundary => self.boundary_connectivity.get(&tag),
        }
    }

    /// Physical groups of both regions, ordered by dimension and tag.
    pub fn physical_groups(&self) -> Vec<PhysicalGroup> {
        let mut groups: Vec<_> = [
            (self.boundary_dim, &self.boundary_groups),
            (self.domain_dim, &self.domain_groups),
        ]
        .into_iter()
        .flat_map(|(dim, map)| {
            map.iter().map(move |(name, &tag)| PhysicalGroup {
                dim,
                tag,
                name: name.clone(),
            })
        })
        .collect();
        groups.sort_by_key(|group| (group.dim, group.tag));
        groups
    }
}
