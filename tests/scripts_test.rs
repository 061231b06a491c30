// tests/scripts_test.rs — Integration test: Rhai extension modules through the catalog

use std::collections::BTreeMap;
use std::path::Path;

use pretty_assertions::assert_eq;

use switchgear::infra::errors::SwitchgearError;
use switchgear::model::assembler::assemble;
use switchgear::modules::ModuleCatalog;

fn write_script(dir: &Path, relative: &str, body: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const GENERATORS: &str = r#"
fn prerequisites() { ["objective"] }

fn declare_components(model) {
    model.add_set("GENS");
    model.add_param("cost", #{ index: "GENS" });
    model.add_var("output", #{ index: "GENS" });
    model.add_expression("gen_cost", ["output", "cost"]);
    model.register("objective_terms", "gen_cost");
    model.require_data("cost");
}
"#;

const CARBON: &str = r#"
fn declare_components(model) {
    let price = model.option("carbon_price");
    if price.type_of() != "()" {
        model.add_param("carbon_price", #{ "default": parse_float(price) });
    }
}
"#;

#[test]
fn test_package_members_and_builtin_objective() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        "power.rhai",
        r#"fn members() { ["power.generators", "power.carbon"] }"#,
    );
    write_script(dir.path(), "power/generators.rhai", GENERATORS);
    write_script(dir.path(), "power/carbon.rhai", CARBON);

    let catalog = ModuleCatalog::new(vec![dir.path().to_path_buf()]);
    let mut modules = catalog
        .load(&names(&["objective", "power", "power.carbon"]))
        .unwrap();
    assert_eq!(
        modules.names(),
        names(&["objective", "power", "power.generators", "power.carbon"])
    );

    let mut options = BTreeMap::new();
    options.insert("carbon_price".to_string(), "40".to_string());
    let model = assemble(&mut modules, options).unwrap();

    assert_eq!(
        model.component("total_objective").unwrap().terms,
        names(&["gen_cost"])
    );
    assert_eq!(model.component("carbon_price").unwrap().default, Some(40.0));
    assert_eq!(model.component("gen_cost").unwrap().owner, "power.generators");
}

#[test]
fn test_missing_prerequisite_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "generators.rhai", GENERATORS);

    let catalog = ModuleCatalog::empty(vec![dir.path().to_path_buf()]);
    let err = catalog.load(&names(&["generators"])).unwrap_err();
    assert!(matches!(
        err,
        SwitchgearError::MissingPrerequisite { ref module, ref prerequisite }
            if module == "generators" && prerequisite == "objective"
    ));
    assert!(err.terminates_run());
}

#[test]
fn test_unknown_module_suggests_close_names() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "generators.rhai", GENERATORS);

    let catalog = ModuleCatalog::new(vec![dir.path().to_path_buf()]);
    let err = catalog.load(&names(&["generator"])).unwrap_err();
    match err {
        SwitchgearError::UnknownModule { name, suggestions } => {
            assert_eq!(name, "generator");
            assert!(suggestions.contains(&"generators".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_script_compile_error_names_module() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), "broken.rhai", "fn declare_components(model) {");

    let catalog = ModuleCatalog::empty(vec![dir.path().to_path_buf()]);
    let err = catalog.load(&names(&["broken"])).unwrap_err();
    assert!(err.to_string().contains("broken"));
}
