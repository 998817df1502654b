//! Integration tests for EDM
//!
//! These tests load definition files from disk and drive the registry, the
//! loader and the property cache together.

use edm_core::{
    ClassCatalog, EdmError, EntitySet, FieldAccessor, PropertyCacheRecord, load_model_cache, outline,
    save_model_cache,
};
use edm_loader::ModelLoader;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const COMMON: &str = r#"
namespace = "Common"

[[entity_types]]
name = "Customer"
class = "common::Customer"
properties = [{ name = "Id", type = "Int32", nullable = false }]

[[containers]]
name = "C1"
entity_sets = [{ name = "Customers", entity_type = "Customer" }]
"#;

const SALES: &str = r#"
namespace = "Sales"

[[complex_types]]
name = "Address"
class = "sales::Address"
properties = [
    { name = "Street", type = "String" },
    { name = "Tags", type = "String", collection = true },
]

[[entity_types]]
name = "Account"
class = "sales::Account"
properties = [
    { name = "Id", type = "Guid", nullable = false },
    { name = "Stamp", type = "Binary", kind = "etag", nullable = true },
    { name = "Billing", type = "Address", field = "billing_address" },
    { name = "Owner", type = "Common.Customer", kind = "navigation" },
]

[[containers]]
name = "C2"
parent = "Common.C1"
entity_sets = [{ name = "Accounts", entity_type = "Account" }]
"#;

fn write_definitions(dir: &Path) -> Vec<PathBuf> {
    let common = dir.join("common.toml");
    let sales = dir.join("sales.toml");
    std::fs::write(&common, COMMON).unwrap();
    std::fs::write(&sales, SALES).unwrap();
    vec![sales, common]
}

fn load_from(files: &[PathBuf]) -> edm_loader::LoadedModels {
    let mut loader = ModelLoader::new();
    for file in files {
        loader.add_file(file).unwrap();
    }
    loader.load().unwrap()
}

#[test]
fn test_entity_set_lookup_walks_parent_containers() {
    let dir = TempDir::new().unwrap();
    let mut loaded = load_from(&write_definitions(dir.path()));

    let c1 = loaded.registry.container_by_full_name("Common.C1").unwrap();
    let c2 = loaded.registry.container_by_full_name("Sales.C2").unwrap();
    let parent_set = loaded.registry.own_entity_set(c1, "Customers").unwrap();

    assert_eq!(loaded.registry.entity_set_by_name(c2, "Customers"), Some(parent_set));
    assert_eq!(loaded.registry.entity_set_by_name(c1, "Accounts"), None);
    assert_eq!(loaded.registry.entity_set_by_name(c2, "Unknown"), None);

    // Shadowing the parent's set from the child.
    let customer = loaded.registry.type_by_full_name("Common.Customer").unwrap();
    let own = loaded
        .registry
        .add_entity_set(c2, EntitySet::new("Customers", customer).unwrap())
        .unwrap();
    assert_eq!(loaded.registry.entity_set_by_name(c2, "Customers"), Some(own));
    assert_eq!(loaded.registry.entity_set_by_name(c1, "Customers"), Some(parent_set));

    let err = loaded
        .registry
        .add_entity_set(c2, EntitySet::new("Customers", customer).unwrap())
        .unwrap_err();
    assert!(matches!(err, EdmError::DuplicateEntitySet { .. }));
}

#[test]
fn test_etag_ignores_nullable_intent() {
    let dir = TempDir::new().unwrap();
    let loaded = load_from(&write_definitions(dir.path()));
    let registry = &loaded.registry;

    let account = registry.type_by_full_name("Sales.Account").unwrap();
    let stamp = registry.etag_property(account).unwrap();
    let stamp = registry.property(stamp).unwrap();
    assert_eq!(stamp.name(), "Stamp");
    assert!(!stamp.is_nullable());
}

#[test]
fn test_cache_round_trip_rebinds_fields() {
    let dir = TempDir::new().unwrap();
    let loaded = load_from(&write_definitions(dir.path()));
    let sales = loaded.model("Sales").unwrap();

    save_model_cache(&loaded.registry, sales, dir.path()).unwrap();
    let cache = load_model_cache(dir.path(), "Sales").unwrap().unwrap();
    assert_eq!(cache.properties.len(), 6);

    let billing = cache
        .properties
        .iter()
        .find(|r| r.name == "Billing")
        .unwrap();
    let field = billing.bind(&loaded.catalog).unwrap();
    assert_eq!(field.class, "sales::Account");
    assert_eq!(field.field, "billing_address");
    assert!(loaded.catalog.has_field(&field.class, &field.field));

    let account = loaded.registry.type_by_full_name("Sales.Account").unwrap();
    let original = loaded.registry.property_by_name(account, "Billing").unwrap();
    assert_eq!(loaded.registry.property(original).unwrap().field(), &field);

    let owner = cache.properties.iter().find(|r| r.name == "Owner").unwrap();
    assert_eq!(owner.value_type, "Common.Customer");
    assert!(owner.is_entity_reference);
    assert!(!owner.is_bag);
}

#[test]
fn test_cache_binding_fails_when_class_changes() {
    let dir = TempDir::new().unwrap();
    let loaded = load_from(&write_definitions(dir.path()));
    let sales = loaded.model("Sales").unwrap();
    save_model_cache(&loaded.registry, sales, dir.path()).unwrap();
    let cache = load_model_cache(dir.path(), "Sales").unwrap().unwrap();

    let mut renamed = ClassCatalog::new();
    renamed.declare("sales::Account", ["Id", "Stamp", "billing", "Owner"]);
    renamed.declare("sales::Address", ["Street", "Tags"]);

    assert_eq!(
        cache.bind_all(&renamed).unwrap_err(),
        EdmError::UnknownField {
            class: "sales::Account".to_string(),
            field: "billing_address".to_string(),
        }
    );
}

#[test]
fn test_cache_file_with_bad_flag_is_rejected() {
    let dir = TempDir::new().unwrap();
    let loaded = load_from(&write_definitions(dir.path()));
    let sales = loaded.model("Sales").unwrap();
    let path = save_model_cache(&loaded.registry, sales, dir.path()).unwrap();

    let mut json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["properties"][0]["is_collection"] = serde_json::json!(1);
    std::fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

    let err = load_model_cache(dir.path(), "Sales").unwrap_err();
    assert_eq!(
        err.downcast_ref::<EdmError>(),
        Some(&EdmError::NotBoolean {
            field: "is_collection".to_string()
        })
    );

    let record = PropertyCacheRecord::from_json(&json["properties"][1]).unwrap();
    assert_eq!(record.name, "Tags");
    assert!(record.is_collection);
}

#[test]
fn test_describe_outline() {
    let dir = TempDir::new().unwrap();
    let loaded = load_from(&write_definitions(dir.path()));

    insta::assert_snapshot!(outline(&loaded.registry), @r"
    model Common
      entity type Common.Customer
        Id: Edm.Int32 not null
      container Common.C1
        Customers: Common.Customer
    model Sales (references: Common)
      complex type Sales.Address
        Street: Edm.String
        Tags: Collection(Edm.String)
      entity type Sales.Account
        Id: Edm.Guid not null
        Stamp: Edm.Binary etag not null
        Billing: Sales.Address
        Owner: Common.Customer navigation
      container Sales.C2 (parent: Common.C1)
        Accounts: Sales.Account
    ");
}
