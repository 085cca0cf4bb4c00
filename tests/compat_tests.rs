//! Compatible interface property checks over manifests.

use anyhow::{Context, Result, ensure};
use rstest::rstest;
use test_support::graph_from_yaml;
use tsunagi::graph::{Configuration, TargetGraph};
use tsunagi::manifest;
use tsunagi::resolve::{CompatibilityError, CompatibleKind, Resolver};

#[rstest]
fn position_independent_code_conflict_names_the_dependency() -> Result<()> {
    let manifest = manifest::from_path("tests/data/conflict.yml")?;
    let graph = TargetGraph::from_manifest(&manifest)?;
    let resolver = Resolver::new(&graph);
    let app = graph.find_global("app").context("app")?;
    let conflicts = resolver.check_property_compatibility(app, &Configuration::named("Release"));
    let [CompatibilityError::IncompatibleInterfaceProperty {
        property,
        contributor,
        ..
    }] = conflicts.as_slice()
    else {
        anyhow::bail!("expected one incompatible property, got {conflicts:?}");
    };
    ensure!(property == "POSITION_INDEPENDENT_CODE", "property {property}");
    ensure!(contributor == "pic", "contributor {contributor}");
    ensure!(resolver.diagnostics().has_errors(), "conflict must be reported");
    Ok(())
}

#[rstest]
fn string_property_flows_to_consumer() -> Result<()> {
    let graph = graph_from_yaml(
        "policies:\n\
         \x20 implicit_link_interface: new\n\
         targets:\n\
         \x20 - name: abi\n\
         \x20   type: shared_library\n\
         \x20   properties:\n\
         \x20     COMPATIBLE_INTERFACE_STRING: ABI\n\
         \x20     INTERFACE_ABI: v2\n\
         \x20 - name: app\n\
         \x20   type: executable\n\
         \x20   link_libraries: abi\n",
    )?;
    let resolver = Resolver::new(&graph);
    let app = graph.find_global("app").context("app")?;
    let config = Configuration::none();
    let value = resolver
        .compatible_value(app, &config, "ABI")
        .context("ABI is compatible")?;
    ensure!(value.kind == CompatibleKind::String, "kind {}", value.kind);
    ensure!(value.value.as_deref() == Some("v2"), "value {:?}", value.value);
    ensure!(value.origin.as_deref() == Some("abi"), "origin {:?}", value.origin);
    let through_genex = resolver.evaluate("$<TARGET_PROPERTY:ABI>", &config, Some(app), None, false);
    ensure!(through_genex.value == "v2", "evaluated {:?}", through_genex.value);
    ensure!(
        resolver.check_property_compatibility(app, &config).is_empty(),
        "no conflicts expected"
    );
    Ok(())
}
