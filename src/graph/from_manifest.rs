//! Manifest-to-graph conversion helpers.

use crate::ast::{PolicySettings, ProjectManifest, TargetDecl};

use super::{
    Configuration, GraphError, GraphSettings, Policies, TargetGraph, TargetSpec,
};

impl TargetGraph {
    /// Build a [`TargetGraph`] from a parsed manifest.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] when a target name is empty or declared twice in
    /// the same scope.
    pub fn from_manifest(manifest: &ProjectManifest) -> Result<Self, GraphError> {
        let mut builder = Self::builder();
        let project_policies = apply_policies(Policies::default(), manifest.policies);
        configure(builder.settings_mut(), manifest, project_policies);
        for decl in &manifest.targets {
            builder.add(target_spec(decl, project_policies))?;
        }
        Ok(builder.build())
    }
}

fn configure(settings: &mut GraphSettings, manifest: &ProjectManifest, policies: Policies) {
    settings.configurations = manifest
        .configurations
        .iter()
        .map(Configuration::named)
        .collect();
    if let Some(debug) = &manifest.debug_configurations {
        settings.debug_configurations.clone_from(debug);
    }
    settings
        .debug_properties
        .extend(manifest.debug_properties.iter().cloned());
    settings.linker_preferences.extend(
        manifest
            .linker_preferences
            .iter()
            .map(|(lang, pref)| (lang.clone(), *pref)),
    );
    settings.variables.clone_from(&manifest.variables);
    settings.policies = policies;
}

fn apply_policies(base: Policies, overrides: PolicySettings) -> Policies {
    Policies {
        stray_config_libraries: overrides
            .stray_config_libraries
            .unwrap_or(base.stray_config_libraries),
        implicit_link_interface: overrides
            .implicit_link_interface
            .unwrap_or(base.implicit_link_interface),
        bool_compatibility: overrides
            .bool_compatibility
            .unwrap_or(base.bool_compatibility),
    }
}

fn target_spec(decl: &TargetDecl, project_policies: Policies) -> TargetSpec {
    let mut spec = TargetSpec::new(decl.name.clone(), decl.kind)
        .imported(decl.imported)
        .global(decl.global)
        .directory(decl.directory.clone())
        .languages(decl.languages.iter().cloned())
        .policies(apply_policies(project_policies, decl.policies));
    if !decl.link_libraries.is_empty() {
        spec = spec.property("LINK_LIBRARIES", decl.link_libraries.to_list_string());
    }
    if let Some(interface) = &decl.interface_link_libraries {
        spec = spec.property("INTERFACE_LINK_LIBRARIES", interface.to_list_string());
    }
    for (name, value) in &decl.properties {
        spec = spec.property(name.clone(), value.to_property_string());
    }
    spec
}
