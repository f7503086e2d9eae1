//! Structured box meshes.
//!
//! The generated meshes have a single domain group `"domain"` (tag 1) and six boundary groups
//! `"x_min"`, `"x_max"`, `"y_min"`, `"y_max"`, `"z_min"`, `"z_max"` (tags 1 to 6) whose elements
//! are oriented with outward normals.
use crate::element::ElementType;
use crate::mesh::{ParsedMesh, PhysicalGroup, RawElement};
use crate::Result;
use nalgebra::{Point3, Vector3};

/// Names of the boundary groups in order of their tags.
pub const BOX_BOUNDARY_GROUPS: [&str; 6] = ["x_min", "x_max", "y_min", "y_max", "z_min", "z_max"];

/// Name of the domain group.
pub const BOX_DOMAIN_GROUP: &str = "domain";

struct BoxGrid {
    cells: [usize; 3],
    extents: [f64; 3],
}

impl BoxGrid {
    fn new(cells: [usize; 3], extents: [f64; 3]) -> Self {
        assert!(cells.iter().all(|&n| n > 0), "box must have at least one cell along each axis");
        Self { cells, extents }
    }

    fn vertex_index(&self, i: usize, j: usize, k: usize) -> usize {
        let [nx, ny, _] = self.cells;
        i + (nx + 1) * (j + (ny + 1) * k)
    }

    fn vertices(&self) -> Vec<Point3<f64>> {
        let [nx, ny, nz] = self.cells;
        let [lx, ly, lz] = self.extents;
        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    vertices.push(Point3::new(
                        lx * i as f64 / nx as f64,
                        ly * j as f64 / ny as f64,
                        lz * k as f64 / nz as f64,
                    ));
                }
            }
        }
        vertices
    }

    /// Hexahedral cells in Gmsh order.
    fn hexahedra(&self) -> Vec<[usize; 8]> {
        let [nx, ny, nz] = self.cells;
        let mut cells = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let v = |di, dj, dk| self.vertex_index(i + di, j + dj, k + dk);
                    cells.push([
                        v(0, 0, 0),
                        v(1, 0, 0),
                        v(1, 1, 0),
                        v(0, 1, 0),
                        v(0, 0, 1),
                        v(1, 0, 1),
                        v(1, 1, 1),
                        v(0, 1, 1),
                    ]);
                }
            }
        }
        cells
    }

    /// Boundary quadrilaterals with outward orientation, per boundary group tag (1 to 6).
    ///
    /// The first and third node of every quadrilateral are its corners with the smallest and
    /// largest coordinates.
    fn boundary_quads(&self) -> Vec<(usize, [usize; 4])> {
        let [nx, ny, nz] = self.cells;
        let v = |i, j, k| self.vertex_index(i, j, k);
        let mut quads = Vec::new();
        for x_face in [0, nx] {
            let tag = if x_face == 0 { 1 } else { 2 };
            for k in 0..nz {
                for j in 0..ny {
                    let quad = if x_face == 0 {
                        [v(0, j, k), v(0, j, k + 1), v(0, j + 1, k + 1), v(0, j + 1, k)]
                    } else {
                        [v(nx, j, k), v(nx, j + 1, k), v(nx, j + 1, k + 1), v(nx, j, k + 1)]
                    };
                    quads.push((tag, quad));
                }
            }
        }
        for y_face in [0, ny] {
            let tag = if y_face == 0 { 3 } else { 4 };
            for k in 0..nz {
                for i in 0..nx {
                    let quad = if y_face == 0 {
                        [v(i, 0, k), v(i + 1, 0, k), v(i + 1, 0, k + 1), v(i, 0, k + 1)]
                    } else {
                        [v(i, ny, k), v(i, ny, k + 1), v(i + 1, ny, k + 1), v(i + 1, ny, k)]
                    };
                    quads.push((tag, quad));
                }
            }
        }
        for z_face in [0, nz] {
            let tag = if z_face == 0 { 5 } else { 6 };
            for j in 0..ny {
                for i in 0..nx {
                    let quad = if z_face == 0 {
                        [v(i, j, 0), v(i, j + 1, 0), v(i + 1, j + 1, 0), v(i + 1, j, 0)]
                    } else {
                        [v(i, j, nz), v(i + 1, j, nz), v(i + 1, j + 1, nz), v(i, j + 1, nz)]
                    };
                    quads.push((tag, quad));
                }
            }
        }
        quads
    }
}

fn box_physical_groups() -> Vec<PhysicalGroup> {
    let mut groups = vec![PhysicalGroup {
        dim: 3,
        tag: 1,
        name: BOX_DOMAIN_GROUP.to_string(),
    }];
    groups.extend(BOX_BOUNDARY_GROUPS.iter().enumerate().map(|(i, name)| PhysicalGroup {
        dim: 2,
        tag: i + 1,
        name: name.to_string(),
    }));
    groups
}

/// Creates a box `[0, extents[0]] x [0, extents[1]] x [0, extents[2]]` of Hex8 cells with
/// Quad4 boundary elements.
///
/// # Panics
///
/// Panics if any cell count is zero.
pub fn create_box_hex_mesh(cells: [usize; 3], extents: [f64; 3]) -> Result<ParsedMesh> {
    let grid = BoxGrid::new(cells, extents);
    let volume = grid.hexahedra().into_iter().map(|hex| RawElement {
        gmsh_type: ElementType::Hex8.gmsh_tag(),
        physical_tag: 1,
        nodes: hex.to_vec(),
    });
    let boundary = grid.boundary_quads().into_iter().map(|(tag, quad)| RawElement {
        gmsh_type: ElementType::Quad4.gmsh_tag(),
        physical_tag: tag,
        nodes: quad.to_vec(),
    });
    ParsedMesh::from_physical_groups(grid.vertices(), &box_physical_groups(), boundary.chain(volume))
}

/// Creates a unit cube with the given number of Hex8 cells along each axis.
pub fn create_unit_cube_hex_mesh(cells_per_dim: usize) -> Result<ParsedMesh> {
    create_box_hex_mesh([cells_per_dim; 3], [1.0; 3])
}

/// Local vertex paths from the minimal to the maximal corner of a hexahedron (in Gmsh order),
/// one per tetrahedron of the Kuhn subdivision.
const KUHN_TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 1, 5, 6],
    [0, 3, 2, 6],
    [0, 3, 7, 6],
    [0, 4, 5, 6],
    [0, 4, 7, 6],
];

/// Creates a box `[0, extents[0]] x [0, extents[1]] x [0, extents[2]]` by splitting every
/// hexahedral cell into six Tet4 cells. Boundary faces are split into Tri3 elements conforming
/// with the tetrahedra.
///
/// # Panics
///
/// Panics if any cell count is zero.
pub fn create_box_tet_mesh(cells: [usize; 3], extents: [f64; 3]) -> Result<ParsedMesh> {
    let grid = BoxGrid::new(cells, extents);
    let vertices = grid.vertices();

    let mut elements = Vec::new();
    for (tag, [p0, p1, p2, p3]) in grid.boundary_quads() {
        for triangle in [[p0, p1, p2], [p0, p2, p3]] {
            elements.push(RawElement {
                gmsh_type: ElementType::Tri3.gmsh_tag(),
                physical_tag: tag,
                nodes: triangle.to_vec(),
            });
        }
    }
    for hex in grid.hexahedra() {
        for local in KUHN_TETRAHEDRA {
            let mut tet = local.map(|i| hex[i]);
            let [a, b, c, d] = tet.map(|i| vertices[i]);
            let signed_volume = (b - a).cross(&(c - a)).dot(&(d - a));
            if signed_volume < 0.0 {
                tet.swap(1, 2);
            }
            elements.push(RawElement {
                gmsh_type: ElementType::Tet4.gmsh_tag(),
                physical_tag: 1,
                nodes: tet.to_vec(),
            });
        }
    }
    ParsedMesh::from_physical_groups(vertices, &box_physical_groups(), elements)
}

/// Outward unit normal of a box boundary group.
pub fn box_boundary_normal(group: &str) -> Option<Vector3<f64>> {
    let index = BOX_BOUNDARY_GROUPS.iter().position(|&name| name == group)?;
    let mut normal = Vector3::zeros();
    normal[index / 2] = if index % 2 == 0 { -1.0 } else { 1.0 };
    Some(normal)
}
