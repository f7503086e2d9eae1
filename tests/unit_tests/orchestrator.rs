use super::neo_hookean_box_config;
use hyperbatch::config::{
    BoundaryConditionConfig, FieldDeclaration, MaterialConfig, MaterialModel, ParameterValues, ProblemConfig,
    TractionConfig,
};
use hyperbatch::dispatch::{MeshData, MeshSet};
use hyperbatch::element::ElementType;
use hyperbatch::load_curve::LoadCurve;
use hyperbatch::mesh::ParsedMesh;
use hyperbatch::orchestrator::ResidualOrchestrator;
use hyperbatch::procedural::{create_box_tet_mesh, create_unit_cube_hex_mesh};
use hyperbatch::Error;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DMatrix;

fn fixed(field: &str) -> BoundaryConditionConfig<f64> {
    BoundaryConditionConfig::FixedSupportDirichletBC {
        field: field.to_string(),
        realizations: None,
    }
}

fn pull_x(value: f64) -> BoundaryConditionConfig<f64> {
    BoundaryConditionConfig::PrescribedDisplacementDirichletBC {
        field: "u".to_string(),
        components: vec![0],
        values: ParameterValues::Uniform(vec![value]),
        end_time: 1.0,
        load_curve: None,
        realizations: None,
    }
}

fn single_mesh(mesh: &ParsedMesh, config: &ProblemConfig<f64>) -> eyre::Result<MeshSet<f64>> {
    Ok(MeshSet::Single(MeshData::from_parsed_mesh(mesh, &config.fields)?))
}

#[test]
fn fixed_cube_at_rest_has_zero_residual() -> eyre::Result<()> {
    let zero_traction = TractionConfig::ConstantTraction {
        traction: [0.0; 3],
        load_curve: None,
        end_time: None,
    };
    let config = neo_hookean_box_config(2, ElementType::Hex8)
        .with_boundary_condition("x_min", fixed("u"))
        .with_traction("x_max", zero_traction);
    let meshes = single_mesh(&create_unit_cube_hex_mesh(2)?, &config)?;
    let mut orchestrator = ResidualOrchestrator::new(meshes, &config)?;
    assert_eq!(orchestrator.num_realizations(), 2);
    assert_eq!(orchestrator.num_dofs(), 81);
    assert_eq!(orchestrator.field(), "u");
    assert_eq!(orchestrator.constrained_dofs().len(), 2 * 9 * 3);

    orchestrator.apply_boundary_conditions();
    let residual = orchestrator.evaluate_residual_vector()?;
    assert_eq!(residual.shape(), (2, 81));
    assert_matrix_eq!(residual, DMatrix::zeros(2, 81), comp = abs, tol = 1e-9);
    Ok(())
}

#[test]
fn realizations_differ_only_through_their_materials() -> eyre::Result<()> {
    let base = ProblemConfig::new(3, "u", FieldDeclaration::new(3, ElementType::Tet4))
        .with_boundary_condition("x_min", fixed("u"))
        .with_boundary_condition("x_max", pull_x(0.1));
    let young = ParameterValues::PerRealization(vec![1e3, 1e3, 2e3]);
    let config = base.with_material(
        "domain",
        MaterialConfig::young_poisson(MaterialModel::NeoHookean, young, 0.3),
    );
    let meshes = single_mesh(&create_box_tet_mesh([2, 1, 1], [2.0, 1.0, 1.0])?, &config)?;
    let mut orchestrator = ResidualOrchestrator::new(meshes, &config)?;

    // At rest every realization is in equilibrium
    orchestrator.evaluate_residual_vector()?;
    assert_matrix_eq!(orchestrator.residual(), DMatrix::zeros(3, orchestrator.num_dofs()), comp = abs, tol = 1e-9);

    orchestrator.update_boundary_conditions(1.0);
    assert_eq!(orchestrator.time(), 1.0);
    orchestrator.apply_boundary_conditions();
    let residual = orchestrator.evaluate_residual_vector()?.clone();
    assert_matrix_eq!(residual.row(0), residual.row(1), comp = abs, tol = 1e-12);
    assert_matrix_eq!(residual.row(0) * 2.0, residual.row(2), comp = abs, tol = 1e-9);
    assert!(residual.row(0).norm() > 1.0);
    Ok(())
}

#[test]
fn residual_is_gradient_of_total_energy() -> eyre::Result<()> {
    let config = ProblemConfig::new(2, "u", FieldDeclaration::new(3, ElementType::Hex8))
        .with_material(
            "domain",
            MaterialConfig::lame(
                MaterialModel::StVenantKirchhoff,
                ParameterValues::PerRealization(vec![1.0, 2.0]),
                1.5,
            ),
        )
        .with_traction(
            "z_max",
            TractionConfig::ConstantTraction {
                traction: [0.1, 0.0, -0.3],
                load_curve: None,
                end_time: None,
            },
        )
        .with_traction(
            "y_min",
            TractionConfig::PressureTraction {
                pressure: ParameterValues::PerRealization(vec![0.2, -0.1]),
                load_curve: Some(LoadCurve::Smoothstep),
                end_time: Some(2.0),
            },
        );
    let meshes = single_mesh(&create_unit_cube_hex_mesh(1)?, &config)?;
    let mut orchestrator = ResidualOrchestrator::new(meshes, &config)?;
    orchestrator.update_boundary_conditions(1.0);
    let n = orchestrator.num_dofs();
    orchestrator.set_parameters(DMatrix::from_fn(2, n, |r, i| 0.03 * ((2 * i + 5 * r) as f64).sin()))?;
    let residual = orchestrator.evaluate_residual_vector()?.clone();

    let h = 1e-6;
    for i in 0..n {
        let original = orchestrator.parameters().column(i).into_owned();
        orchestrator.parameters_mut().column_mut(i).add_scalar_mut(h);
        let energy_plus = orchestrator.evaluate_total_energy()?;
        orchestrator.parameters_mut().column_mut(i).add_scalar_mut(-2.0 * h);
        let energy_minus = orchestrator.evaluate_total_energy()?;
        orchestrator.parameters_mut().set_column(i, &original);
        for r in 0..2 {
            let derivative = (energy_plus[r] - energy_minus[r]) / (2.0 * h);
            assert_scalar_eq!(residual[(r, i)], derivative, comp = abs, tol = 1e-7);
        }
    }
    Ok(())
}

#[test]
fn per_realization_meshes_are_supported() -> eyre::Result<()> {
    let config = neo_hookean_box_config(2, ElementType::Tet4).with_boundary_condition("z_min", fixed("u"));
    let mesh = create_box_tet_mesh([1, 1, 2], [1.0, 1.0, 1.0])?;
    let scaled = mesh.with_vertices(mesh.vertices().iter().map(|p| p * 2.0).collect())?;
    let meshes = MeshSet::RealizationMeshes(vec![
        MeshData::from_parsed_mesh(&mesh, &config.fields)?,
        MeshData::from_parsed_mesh(&scaled, &config.fields)?,
    ]);
    let mut orchestrator = ResidualOrchestrator::new(meshes, &config)?;

    // A homogeneous stretch u = 0.1 X along z
    let dof_map = orchestrator.meshes().reference_mesh().field("u").unwrap().dof_map().clone();
    let mut parameters = DMatrix::zeros(2, orchestrator.num_dofs());
    for r in 0..2 {
        let vertices = orchestrator.meshes().mesh_for_realization(r).vertices().to_vec();
        for node in dof_map.assigned_nodes() {
            parameters[(r, dof_map.node_dofs(node).unwrap()[2])] = 0.1 * vertices[node].z;
        }
    }
    orchestrator.set_parameters(parameters)?;
    let residual = orchestrator.evaluate_residual_vector()?.clone();

    // Same stress, internal forces scale with the face area
    assert_matrix_eq!(residual.row(0) * 4.0, residual.row(1), comp = abs, tol = 1e-6);

    let energy = orchestrator.evaluate_total_energy()?;
    assert_scalar_eq!(energy[0] * 8.0, energy[1], comp = abs, tol = 1e-6);
    Ok(())
}

#[test]
fn construction_errors() -> eyre::Result<()> {
    let mesh = create_unit_cube_hex_mesh(1)?;
    let config = neo_hookean_box_config(2, ElementType::Hex8);
    let meshes = single_mesh(&mesh, &config)?;

    let unknown_material_group = config
        .clone()
        .with_material("elsewhere", MaterialConfig::lame(MaterialModel::LinearElastic, 1.0, 1.0));
    assert!(matches!(
        ResidualOrchestrator::new(meshes.clone(), &unknown_material_group),
        Err(Error::PhysicalGroup(_))
    ));

    let unknown_traction_group = config.clone().with_traction(
        "domain",
        TractionConfig::ConstantTraction {
            traction: [1.0, 0.0, 0.0],
            load_curve: None,
            end_time: None,
        },
    );
    assert!(matches!(
        ResidualOrchestrator::new(meshes.clone(), &unknown_traction_group),
        Err(Error::PhysicalGroup(_))
    ));

    let unknown_bc_group = config.clone().with_boundary_condition("top", fixed("u"));
    assert!(matches!(
        ResidualOrchestrator::new(meshes.clone(), &unknown_bc_group),
        Err(Error::PhysicalGroup(_))
    ));

    let mut undeclared_field = config.clone();
    undeclared_field.field = "v".to_string();
    undeclared_field
        .fields
        .insert("v".to_string(), FieldDeclaration::new(3, ElementType::Hex8));
    assert!(matches!(
        ResidualOrchestrator::new(meshes.clone(), &undeclared_field),
        Err(Error::ConfigValidation(_))
    ));

    let wrong_mesh_count = MeshSet::RealizationMeshes(vec![meshes.reference_mesh().clone(); 3]);
    assert!(matches!(
        ResidualOrchestrator::new(wrong_mesh_count, &config),
        Err(Error::RealizationConsistency(_))
    ));

    let mut orchestrator = ResidualOrchestrator::new(meshes, &config)?;
    assert!(matches!(
        orchestrator.set_parameters(DMatrix::zeros(3, 24)),
        Err(Error::RealizationConsistency(_))
    ));
    *orchestrator.parameters_mut() = DMatrix::zeros(2, 23);
    assert!(matches!(
        orchestrator.evaluate_residual_vector(),
        Err(Error::RealizationConsistency(_))
    ));
    Ok(())
}

#[test]
fn domain_groups_without_material_do_not_contribute() -> eyre::Result<()> {
    let config = ProblemConfig::new(1, "u", FieldDeclaration::new(3, ElementType::Hex8));
    let meshes = single_mesh(&create_unit_cube_hex_mesh(1)?, &config)?;
    let mut orchestrator = ResidualOrchestrator::new(meshes, &config)?;
    orchestrator.set_parameters(DMatrix::from_element(1, 24, 0.1))?;
    orchestrator.parameters_mut()[(0, 0)] = 0.3;
    let residual = orchestrator.evaluate_residual_vector()?;
    assert!(residual.iter().all(|&v| v == 0.0));
    Ok(())
}
