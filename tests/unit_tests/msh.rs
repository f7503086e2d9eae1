use super::TWO_TETS_MSH;
use hyperbatch::element::ElementType;
use hyperbatch::io::msh::{load_msh_from_file, parse_msh_str, write_msh};
use hyperbatch::mesh::RegionKind;
use hyperbatch::procedural::{create_box_hex_mesh, create_box_tet_mesh};
use hyperbatch::Error;
use nalgebra::Point3;

const HEADER: &str = "$MeshFormat\n2.2 0 8\n$EndMeshFormat\n";

const SINGLE_TET_BODY: &str = r#"$PhysicalNames
2
2 7 "face"
3 3 "solid"
$EndPhysicalNames
$Nodes
4
2 1 0 0
1 0 0 0
3 0 1 0
4 0 0 1
$EndNodes
$Elements
2
1 2 2 7 1 1 3 2
2 4 2 3 1 1 2 3 4
$EndElements
"#;

fn single_tet() -> String {
    format!("{}{}", HEADER, SINGLE_TET_BODY)
}

#[test]
fn load_two_tets_from_file() -> eyre::Result<()> {
    let mesh = load_msh_from_file(TWO_TETS_MSH)?;

    assert_eq!(mesh.vertices().len(), 5);
    assert_eq!(mesh.vertices()[4], Point3::new(1.0, 1.0, 1.0));
    assert_eq!(mesh.domain_dim(), 3);
    assert_eq!(mesh.boundary_dim(), 2);
    assert_eq!(mesh.domain_groups().get("left"), Some(&1));
    assert_eq!(mesh.domain_groups().get("right"), Some(&2));
    assert_eq!(mesh.boundary_groups().get("bottom"), Some(&1));
    assert_eq!(mesh.boundary_groups().get("top"), Some(&2));

    let tet4 = ElementType::Tet4.gmsh_tag();
    let tri3 = ElementType::Tri3.gmsh_tag();
    let left = &mesh.group_connectivity(RegionKind::Domain, 1).unwrap()[&tet4];
    let right = &mesh.group_connectivity(RegionKind::Domain, 2).unwrap()[&tet4];
    let bottom = &mesh.group_connectivity(RegionKind::Boundary, 1).unwrap()[&tri3];
    assert_eq!(left.row(0), &[0, 1, 2, 3]);
    assert_eq!(right.row(0), &[1, 2, 3, 4]);
    assert_eq!(bottom.row(0), &[0, 2, 1]);
    Ok(())
}

#[test]
fn missing_file_is_reported() {
    assert!(load_msh_from_file("assets/meshes/does_not_exist.msh").is_err());
}

#[test]
fn connectivity_plus_one_equals_input_ids() -> eyre::Result<()> {
    let text = std::fs::read_to_string(TWO_TETS_MSH)?;
    let mesh = parse_msh_str(&text)?;

    // Node ids in the file are 1..=5 in order, so 0-based indices are ids minus one
    let mut expected: Vec<Vec<usize>> = vec![vec![1, 3, 2], vec![3, 4, 5], vec![1, 2, 3, 4], vec![2, 3, 4, 5]];
    let mut parsed: Vec<Vec<usize>> = mesh
        .boundary_connectivity()
        .values()
        .chain(mesh.domain_connectivity().values())
        .flat_map(|group| group.values())
        .flat_map(|block| block.rows().map(|row| row.iter().map(|i| i + 1).collect::<Vec<usize>>()))
        .collect();
    expected.sort();
    parsed.sort();
    assert_eq!(parsed, expected);
    Ok(())
}

#[test]
fn node_ids_map_to_zero_based_indices_regardless_of_listing_order() -> eyre::Result<()> {
    let mesh = parse_msh_str(&single_tet())?;
    assert_eq!(mesh.vertices().len(), 4);
    assert_eq!(mesh.vertices()[0], Point3::new(0.0, 0.0, 0.0));
    assert_eq!(mesh.vertices()[1], Point3::new(1.0, 0.0, 0.0));
    let solid = &mesh.group_connectivity(RegionKind::Domain, 3).unwrap()[&4];
    let face = &mesh.group_connectivity(RegionKind::Boundary, 7).unwrap()[&2];
    assert_eq!(solid.row(0), &[0, 1, 2, 3]);
    assert_eq!(face.row(0), &[0, 2, 1]);
    Ok(())
}

#[test]
fn writer_round_trip() -> eyre::Result<()> {
    for mesh in [
        create_box_hex_mesh([2, 1, 3], [1.0, 0.5, 2.25])?,
        create_box_tet_mesh([1, 2, 1], [0.1, 0.3, 0.7])?,
        load_msh_from_file(TWO_TETS_MSH)?,
        parse_msh_str(&single_tet())?,
    ] {
        let text = write_msh(&mesh);
        let reparsed = parse_msh_str(&text)?;
        assert_eq!(reparsed, mesh);
    }
    Ok(())
}

#[test]
fn unsupported_version_is_rejected() {
    let text = single_tet().replace("2.2 0 8", "4.1 0 8");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));
}

#[test]
fn binary_files_are_rejected() {
    let text = single_tet().replace("2.2 0 8", "2.2 1 8");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));
}

#[test]
fn missing_sections_are_rejected() {
    assert!(matches!(parse_msh_str(SINGLE_TET_BODY), Err(Error::MeshFormat(_))));

    let without_names = single_tet().replace(
        "$PhysicalNames\n2\n2 7 \"face\"\n3 3 \"solid\"\n$EndPhysicalNames\n",
        "",
    );
    assert!(matches!(parse_msh_str(&without_names), Err(Error::MeshFormat(_))));
}

#[test]
fn node_count_mismatch_is_rejected() {
    let text = single_tet().replace("$Nodes\n4\n", "$Nodes\n5\n");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));
}

#[test]
fn undeclared_node_id_is_rejected() {
    let text = single_tet().replace("1 2 2 7 1 1 3 2", "1 2 2 7 1 1 3 5");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));
}

#[test]
fn node_ids_outside_declared_range_are_rejected() {
    let text = single_tet().replace("\n4 0 0 1\n", "\n5 0 0 1\n");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));

    let text = single_tet().replace("\n4 0 0 1\n", "\n0 0 0 1\n");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));
}

#[test]
fn duplicate_node_ids_are_rejected() {
    let text = single_tet().replace("\n4 0 0 1\n", "\n3 0 0 1\n");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));
}

#[test]
fn malformed_number_is_rejected() {
    let text = single_tet().replace("\n1 0 0 0\n", "\n1 0 zero 0\n");
    let err = parse_msh_str(&text).unwrap_err();
    assert!(matches!(err, Error::MeshFormat(_)));
    assert!(err.to_string().contains("line 12"));
}

#[test]
fn unterminated_section_is_rejected() {
    let text = single_tet().replace("$EndElements\n", "");
    assert!(matches!(parse_msh_str(&text), Err(Error::MeshFormat(_))));
}

#[test]
fn unknown_element_type_is_rejected() {
    let text = single_tet().replace("1 2 2 7 1 1 3 2", "1 99 2 7 1 1 3 2");
    assert!(matches!(parse_msh_str(&text), Err(Error::ElementType(_))));
}

#[test]
fn physical_groups_must_form_two_dimension_classes() {
    let one_class = single_tet().replace("2 7 \"face\"", "3 7 \"face\"");
    assert!(matches!(parse_msh_str(&one_class), Err(Error::PhysicalGroup(_))));

    let three_classes = single_tet()
        .replace("$PhysicalNames\n2\n", "$PhysicalNames\n3\n")
        .replace("3 3 \"solid\"\n", "3 3 \"solid\"\n1 1 \"edge\"\n");
    assert!(matches!(parse_msh_str(&three_classes), Err(Error::PhysicalGroup(_))));
}

#[test]
fn duplicate_group_names_are_rejected() {
    let text = single_tet()
        .replace("$PhysicalNames\n2\n", "$PhysicalNames\n3\n")
        .replace("3 3 \"solid\"\n", "3 3 \"solid\"\n3 4 \"solid\"\n");
    assert!(matches!(parse_msh_str(&text), Err(Error::PhysicalGroup(_))));
}

#[test]
fn elements_without_declared_group_are_skipped() -> eyre::Result<()> {
    let text = single_tet()
        .replace("$Elements\n2\n", "$Elements\n3\n")
        .replace("$EndElements", "3 2 2 99 1 1 2 4\n$EndElements");
    let mesh = parse_msh_str(&text)?;
    assert_eq!(mesh.boundary_connectivity().len(), 1);
    assert!(mesh.group_connectivity(RegionKind::Boundary, 99).is_none());
    Ok(())
}
