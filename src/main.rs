//! Contact Search CLI Application

use clap::Parser;
use contact_search::config::{AnalysisConfig, ProjectionParameters, SearchParameters};
use contact_search::contact::{BeamContactManager, ContactMetrics, GlobalSystem};
use contact_search::io::{
    read_json_mesh, write_beam_mesh_to_vtu, write_contact_points_to_vtu, SearchMetadata,
};
use contact_search::mesh::{CurveShape, Discretization};
use contact_search::search::BinaryTree;
use contact_search::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Info { input } => cmd_info(input),
        Commands::Search {
            input,
            slave,
            master,
            eps,
            update_type,
            dop,
            output,
        } => cmd_search(input, slave, master, eps, update_type, dop, output),
        Commands::Evaluate {
            input,
            config,
            output,
        } => cmd_evaluate(input, config, output),
    }
}

fn cmd_info(input: PathBuf) -> Result<()> {
    println!("Reading mesh file: {}", input.display());
    let mesh = read_json_mesh(&input)?;

    let mut shapes: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut min_length = f64::MAX;
    let mut max_length = 0.0f64;
    let mut max_radius = 0.0f64;
    for element in mesh.elements() {
        *shapes.entry(element.shape.name()).or_default() += 1;
        min_length = min_length.min(element.ref_length);
        max_length = max_length.max(element.ref_length);
        max_radius = max_radius.max(element.radius);
    }

    println!("\n{}", "=".repeat(60));
    println!("MESH INFORMATION");
    println!("{}", "=".repeat(60));
    println!();
    println!("  Nodes:        {}", mesh.num_nodes());
    println!("  Elements:     {}", mesh.num_elements());
    println!("  DOFs:         {}", mesh.num_dofs());
    println!();

    if !shapes.is_empty() {
        println!("Element Shapes:");
        for (name, count) in &shapes {
            println!("  - {}: {} elements", name, count);
        }
        println!();
        println!("  Element Length: {:.6} .. {:.6}", min_length, max_length);
        println!("  Max Radius:     {:.6}", max_radius);
        println!();
    }

    if shapes.contains_key(CurveShape::Hermite2.name()) {
        println!("  Hermite elements use nodal tangents");
        println!();
    }

    println!("{}", "=".repeat(60));

    Ok(())
}

fn cmd_search(
    input: PathBuf,
    slave: String,
    master: String,
    eps: f64,
    update_type: String,
    dop: String,
    output: PathBuf,
) -> Result<()> {
    let mesh = read_json_mesh(&input)?;
    let search = SearchParameters {
        eps,
        update_type: update_type.parse()?,
        dop: dop.parse()?,
    };
    let config = AnalysisConfig::from_element_ranges(
        input.display().to_string(),
        output.display().to_string(),
        &slave,
        &master,
        search,
    )?;

    let mut tree = BinaryTree::new(
        config.slave_elements.clone(),
        config.master_elements.clone(),
        config.search.clone(),
    )?;
    tree.init(&mesh)?;
    tree.evaluate_search(&mesh)?;
    let candidate_pairs = tree.candidate_pairs();

    println!(
        "Found {} candidate pairs between {} slave and {} master elements",
        candidate_pairs.len(),
        config.slave_elements.len(),
        config.master_elements.len()
    );

    let metadata = SearchMetadata::new(
        config.mesh_file.clone(),
        &config.search,
        &ProjectionParameters::default(),
        &candidate_pairs,
    );
    metadata.export(&output)?;
    println!("Wrote candidate pairs to {}", output.display());

    Ok(())
}

fn cmd_evaluate(input: PathBuf, config: PathBuf, output: PathBuf) -> Result<()> {
    let mut config = AnalysisConfig::from_file(&config)?;
    config.mesh_file = input.display().to_string();
    config.output_dir = output.display().to_string();

    let mesh = read_json_mesh(&input)?;
    let mut manager = BeamContactManager::from_config(&mesh, &config)?;
    let mut system = GlobalSystem::new(mesh.num_dofs());
    let results = manager.evaluate(&mesh, &mut system)?;

    results.print_summary();
    let metrics = ContactMetrics::compute(&results.contact_points, config.contact.penalty_parameter);
    metrics.print_summary();

    std::fs::create_dir_all(&output)?;

    let mut metadata = SearchMetadata::new(
        config.mesh_file.clone(),
        &config.search,
        &config.projection,
        &results.candidate_pairs,
    );
    metadata.add_contact_results(&config.contact, &results);
    let metadata_path = output.join("contact_metadata.json");
    metadata.export(&metadata_path)?;

    write_beam_mesh_to_vtu(&mesh, &output.join("beams.vtu"), None)?;
    write_contact_points_to_vtu(&results.contact_points, &output.join("contact_points.vtu"), None)?;

    println!(
        "Assembled {} nonzero stiffness entries, |f| = {:.6e}",
        system.stiffness_csr().nnz(),
        system.force.norm()
    );
    println!("Wrote results to {}", output.display());

    Ok(())
}
