use super::dispatch_displacement;
use hyperbatch::boundary::{DirichletBoundaryCondition, DirichletEnforcer};
use hyperbatch::config::{BoundaryConditionConfig, ParameterValues};
use hyperbatch::dispatch::MeshSet;
use hyperbatch::element::ElementType;
use hyperbatch::load_curve::LoadCurve;
use hyperbatch::procedural::create_unit_cube_hex_mesh;
use hyperbatch::Error;
use nalgebra::DMatrix;
use std::collections::BTreeMap;

fn unit_cube() -> eyre::Result<MeshSet<f64>> {
    Ok(MeshSet::Single(dispatch_displacement(&create_unit_cube_hex_mesh(1)?, ElementType::Hex8)?))
}

fn fixed_support() -> BoundaryConditionConfig<f64> {
    BoundaryConditionConfig::FixedSupportDirichletBC {
        field: "u".to_string(),
        realizations: None,
    }
}

fn prescribed(components: Vec<usize>, values: ParameterValues<Vec<f64>>) -> BoundaryConditionConfig<f64> {
    BoundaryConditionConfig::PrescribedDisplacementDirichletBC {
        field: "u".to_string(),
        components,
        values,
        end_time: 2.0,
        load_curve: None,
        realizations: None,
    }
}

fn node_dof(meshes: &MeshSet<f64>, node: usize, component: usize) -> usize {
    meshes.reference_mesh().field("u").unwrap().dof_map().node_dofs(node).unwrap()[component]
}

#[test]
fn fixed_support_constrains_all_components() -> eyre::Result<()> {
    let meshes = unit_cube()?;
    let condition = DirichletBoundaryCondition::new("x_min", &fixed_support(), &meshes, 2)?;
    assert_eq!(condition.group(), "x_min");
    assert_eq!(condition.field(), "u");
    assert_eq!(condition.components(), &[0, 1, 2]);
    assert_eq!(condition.positions().len(), 2 * 4 * 3);
    assert!(condition.values().iter().all(|&v| v == 0.0));

    // Positions are ordered by realization, node and component
    let x_min_nodes = [0, 2, 4, 6];
    let expected: Vec<_> = (0..2)
        .flat_map(|r| {
            let meshes = &meshes;
            x_min_nodes
                .iter()
                .flat_map(move |&node| (0..3).map(move |c| (r, node_dof(meshes, node, c))))
        })
        .collect();
    assert_eq!(condition.positions(), expected.as_slice());

    let mut parameters = DMatrix::from_element(2, meshes.num_dofs(), 1.0);
    condition.apply(&mut parameters);
    let once = parameters.clone();
    condition.apply(&mut parameters);
    assert_eq!(parameters, once);
    for &(r, dof) in condition.positions() {
        assert_eq!(parameters[(r, dof)], 0.0);
    }
    let num_ones = parameters.iter().filter(|&&v| v == 1.0).count();
    assert_eq!(num_ones, 2 * meshes.num_dofs() - 24);
    Ok(())
}

#[test]
fn prescribed_displacement_follows_load_curve() -> eyre::Result<()> {
    let meshes = unit_cube()?;
    let config = prescribed(vec![0, 2], ParameterValues::Uniform(vec![0.1, -0.4]));
    let mut condition = DirichletBoundaryCondition::new("x_max", &config, &meshes, 1)?;
    assert_eq!(condition.positions().len(), 8);
    assert!(condition.values().iter().all(|&v| v == 0.0));

    condition.update_load_curve(1.0);
    assert_eq!(&condition.values()[..2], &[0.05, -0.2]);

    condition.update_load_curve(5.0);
    assert_eq!(&condition.values()[..2], &[0.1, -0.4]);

    let mut parameters = DMatrix::zeros(1, meshes.num_dofs());
    condition.apply(&mut parameters);
    // Node 1 is the first node on x_max
    assert_eq!(parameters[(0, node_dof(&meshes, 1, 0))], 0.1);
    assert_eq!(parameters[(0, node_dof(&meshes, 1, 1))], 0.0);
    assert_eq!(parameters[(0, node_dof(&meshes, 1, 2))], -0.4);
    Ok(())
}

#[test]
fn prescribed_displacement_with_constant_curve_and_per_realization_values() -> eyre::Result<()> {
    let meshes = unit_cube()?;
    let config = BoundaryConditionConfig::PrescribedDisplacementDirichletBC {
        field: "u".to_string(),
        components: vec![1],
        values: ParameterValues::PerRealization(vec![vec![0.3], vec![-0.3]]),
        end_time: 1.0,
        load_curve: Some(LoadCurve::Constant),
        realizations: Some(vec![2, 0]),
    };
    let condition = DirichletBoundaryCondition::new("z_max", &config, &meshes, 3)?;
    // Values belong to the realizations in listed order, positions are sorted by realization
    assert_eq!(condition.positions().len(), 2 * 4);
    assert!(condition.positions()[..4].iter().all(|&(r, _)| r == 0));
    assert!(condition.positions()[4..].iter().all(|&(r, _)| r == 2));
    assert_eq!(&condition.values()[..4], &[-0.3; 4]);
    assert_eq!(&condition.values()[4..], &[0.3; 4]);

    let mut parameters = DMatrix::zeros(3, meshes.num_dofs());
    condition.apply(&mut parameters);
    assert!(parameters.row(1).iter().all(|&v| v == 0.0));
    Ok(())
}

#[test]
fn realization_subset_leaves_other_rows_untouched() -> eyre::Result<()> {
    let meshes = unit_cube()?;
    let config = BoundaryConditionConfig::FixedComponentsDirichletBC {
        field: "u".to_string(),
        components: vec![2],
        realizations: Some(vec![1]),
    };
    let condition = DirichletBoundaryCondition::new("z_min", &config, &meshes, 3)?;
    let mut parameters = DMatrix::from_element(3, meshes.num_dofs(), 2.0);
    condition.apply(&mut parameters);
    assert!(parameters.row(0).iter().all(|&v| v == 2.0));
    assert!(parameters.row(2).iter().all(|&v| v == 2.0));
    assert_eq!(parameters.row(1).iter().filter(|&&v| v == 0.0).count(), 4);
    Ok(())
}

#[test]
fn invalid_conditions_are_rejected() -> eyre::Result<()> {
    let meshes = unit_cube()?;
    let build = |group: &str, config: BoundaryConditionConfig<f64>| {
        DirichletBoundaryCondition::new(group, &config, &meshes, 2).map(|_| ())
    };

    let undeclared_field = BoundaryConditionConfig::FixedSupportDirichletBC {
        field: "temperature".to_string(),
        realizations: None,
    };
    assert!(matches!(build("x_min", undeclared_field), Err(Error::ConfigValidation(_))));
    assert!(matches!(build("w_min", fixed_support()), Err(Error::PhysicalGroup(_))));
    // Domain groups cannot carry Dirichlet conditions
    assert!(matches!(build("domain", fixed_support()), Err(Error::PhysicalGroup(_))));

    let bad_component = BoundaryConditionConfig::FixedComponentsDirichletBC {
        field: "u".to_string(),
        components: vec![3],
        realizations: None,
    };
    assert!(matches!(build("x_min", bad_component), Err(Error::ConfigValidation(_))));
    let duplicate_component = BoundaryConditionConfig::FixedComponentsDirichletBC {
        field: "u".to_string(),
        components: vec![1, 0, 1],
        realizations: None,
    };
    assert!(matches!(build("x_min", duplicate_component), Err(Error::ConfigValidation(_))));

    let bad_realization = BoundaryConditionConfig::FixedSupportDirichletBC {
        field: "u".to_string(),
        realizations: Some(vec![0, 2]),
    };
    assert!(matches!(build("x_min", bad_realization), Err(Error::RealizationConsistency(_))));
    let repeated_realization = BoundaryConditionConfig::FixedSupportDirichletBC {
        field: "u".to_string(),
        realizations: Some(vec![1, 1]),
    };
    assert!(matches!(build("x_min", repeated_realization), Err(Error::ConfigValidation(_))));

    let zero_end_time = BoundaryConditionConfig::PrescribedDisplacementDirichletBC {
        field: "u".to_string(),
        components: vec![0],
        values: ParameterValues::Uniform(vec![1.0]),
        end_time: 0.0,
        load_curve: None,
        realizations: None,
    };
    assert!(matches!(build("x_min", zero_end_time), Err(Error::ConfigValidation(_))));

    let value_count = prescribed(vec![0, 1], ParameterValues::Uniform(vec![1.0]));
    assert!(matches!(build("x_min", value_count), Err(Error::ConfigValidation(_))));

    let realization_count = prescribed(vec![0], ParameterValues::PerRealization(vec![vec![1.0]; 3]));
    assert!(matches!(build("x_min", realization_count), Err(Error::RealizationConsistency(_))));
    Ok(())
}

#[test]
fn enforcer_applies_conditions_in_group_order() -> eyre::Result<()> {
    let meshes = unit_cube()?;
    let mut configs = BTreeMap::new();
    configs.insert("y_min".to_string(), prescribed(vec![1], ParameterValues::Uniform(vec![0.5])));
    configs.insert("x_min".to_string(), fixed_support());
    let mut enforcer = DirichletEnforcer::from_configs(&configs, &meshes, 1)?;
    assert_eq!(enforcer.conditions().len(), 2);
    assert_eq!(enforcer.conditions()[0].group(), "x_min");

    // x_min has 4 nodes with 3 components, y_min adds 4 nodes with one component, 2 of which
    // are shared with x_min
    let constrained = enforcer.constrained_dofs();
    assert_eq!(constrained.len(), 14);
    assert!(constrained.windows(2).all(|pair| pair[0] < pair[1]));

    enforcer.update_load_curve(2.0);
    let mut parameters = DMatrix::from_element(1, meshes.num_dofs(), 9.0);
    enforcer.apply_boundary_conditions(&mut parameters);
    // Node 0 lies on both groups, the later y_min condition wins for component 1
    assert_eq!(parameters[(0, node_dof(&meshes, 0, 0))], 0.0);
    assert_eq!(parameters[(0, node_dof(&meshes, 0, 1))], 0.5);
    assert_eq!(parameters[(0, node_dof(&meshes, 0, 2))], 0.0);
    // Node 1 is only on y_min
    assert_eq!(parameters[(0, node_dof(&meshes, 1, 0))], 9.0);
    assert_eq!(parameters[(0, node_dof(&meshes, 1, 1))], 0.5);
    // Node 7 is on neither
    assert_eq!(parameters[(0, node_dof(&meshes, 7, 1))], 9.0);

    let unconstrained = parameters.iter().filter(|&&v| v == 9.0).count();
    assert_eq!(unconstrained, meshes.num_dofs() - constrained.len());
    Ok(())
}
